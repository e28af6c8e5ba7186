use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::{Dataset, EntityRecord};
use crate::util::write_json_pretty;

/// Environments scanned on the read side. `special` datasets are generated on
/// demand and submitted explicitly via `--dataset-path`.
pub const DISCOVERY_ENVIRONMENTS: [&str; 2] = ["development", "production"];

pub fn dataset_file_path(root: &Path, environment: &str, filename: &str) -> PathBuf {
    root.join(environment).join(format!("{filename}.json"))
}

/// Writes the dataset as an ordered array of entity records. An existing file
/// at the same path is overwritten without warning; callers that need
/// versioning must vary the filename.
pub fn save_dataset(dataset: &Dataset, root: &Path) -> Result<PathBuf> {
    let path = dataset_file_path(root, &dataset.environment, &dataset.filename);
    write_json_pretty(&path, &dataset.to_records())?;
    Ok(path)
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<EntityRecord> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let environment = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let filename = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    Ok(Dataset::from_records(records, environment, filename))
}

/// Enumerates `*.json` dataset files under the discovery environments, sorted
/// for a deterministic evaluation order. Missing environment directories are
/// skipped silently.
pub fn discover_dataset_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for environment in DISCOVERY_ENVIRONMENTS {
        let dir = root.join(environment);
        if !dir.exists() {
            continue;
        }

        let entries =
            fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))?;
        for entry in entries {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
            let path = entry.path();

            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);

            if path.is_file() && is_json {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
