use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use crate::cli::RunArgs;
use crate::dataset::{discover_dataset_files, load_dataset};
use crate::model::{
    ClassTallies, Dataset, EvaluationReport, FileSummary, LabeledQuery, QueryPayload,
    ReconciliationResult, SampleSet, Verdict, VerdictOutcome, VerdictTally,
};
use crate::perturb::perturbation_class;
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: RunArgs) -> Result<()> {
    let files = match &args.dataset_path {
        Some(path) => vec![path.clone()],
        None => discover_dataset_files(&args.dataset_root)?,
    };

    if files.is_empty() {
        println!("No test dataset files found. Please run the generate command first.");
        return Ok(());
    }

    println!("Starting reconciliation service test suite...");
    println!("------------------------------------------");
    info!(files = files.len(), endpoint = %args.endpoint, "starting evaluation");

    let mut summaries = Vec::with_capacity(files.len());
    let mut totals = VerdictTally::default();

    // Files are evaluated serially; a failed file is reported and skipped
    // without touching the others.
    for path in &files {
        let summary = match evaluate_file(path, &args) {
            Ok(summary) => summary,
            Err(err) => {
                error!(path = %path.display(), error = %err, "dataset evaluation failed");
                failed_file_summary(path, &err)
            }
        };
        totals.merge(&summary.tally);
        summaries.push(summary);
    }

    let report = EvaluationReport {
        manifest_version: 1,
        generated_at: now_utc_string(),
        endpoint: args.endpoint.clone(),
        files: summaries,
        totals,
    };

    if let Some(report_path) = &args.report_path {
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "evaluation report written");
    }

    info!(
        files = report.files.len(),
        success = totals.success,
        failed = totals.total() - totals.success,
        "evaluation completed"
    );

    Ok(())
}

fn evaluate_file(path: &Path, args: &RunArgs) -> Result<FileSummary> {
    let display_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    println!("\n--- Testing dataset: {display_name} ---");

    let dataset = load_dataset(path)?;
    let sha256 = sha256_file(path)?;

    let started = Instant::now();
    let results = submit(&dataset, &args.endpoint, args.timeout_ms)?;
    let batch_latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    let mut output = io::stdout().lock();
    let verdicts = score(&dataset, &results, |item, verdict| {
        writeln!(output, "{}", verdict_line(item, verdict))
            .context("failed to write verdict line")
    })?;
    output.flush().context("failed to flush verdict output")?;

    let mut tally = VerdictTally::default();
    let mut by_class = ClassTallies::default();
    for (index, verdict) in verdicts.iter().enumerate() {
        tally.record(verdict.outcome);
        by_class.record(perturbation_class(index), verdict.outcome);
    }

    let accuracy = tally.accuracy();
    info!(
        path = %path.display(),
        items = dataset.items.len(),
        success = tally.success,
        failed = tally.total() - tally.success,
        latency_ms = batch_latency_ms,
        "dataset evaluated"
    );

    if let (Some(samples_path), Some(accuracy)) = (&args.samples_path, accuracy) {
        append_sample(samples_path, &args.strategy, batch_latency_ms, accuracy)?;
    }

    Ok(FileSummary {
        path: path.display().to_string(),
        sha256: Some(sha256),
        item_count: dataset.items.len(),
        batch_latency_ms: Some(batch_latency_ms),
        accuracy,
        tally,
        by_class,
        error: None,
    })
}

fn failed_file_summary(path: &Path, err: &anyhow::Error) -> FileSummary {
    FileSummary {
        path: path.display().to_string(),
        sha256: None,
        item_count: 0,
        batch_latency_ms: None,
        accuracy: None,
        tally: VerdictTally::default(),
        by_class: ClassTallies::default(),
        error: Some(format!("{err:#}")),
    }
}

/// One batch, one request, one response: the whole dataset travels as a single
/// JSON-encoded id-to-query mapping in one form field. A transport failure or
/// an unparseable body fails the entire file; missing ids and empty result
/// lists are per-query outcomes for the scorer.
pub fn submit(
    dataset: &Dataset,
    endpoint: &str,
    timeout_ms: u64,
) -> Result<BTreeMap<String, ReconciliationResult>> {
    let queries = build_query_batch(dataset);
    let encoded = serde_json::to_string(&queries).context("failed to encode query batch")?;

    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_millis(timeout_ms))
        .build();

    let response = agent
        .post(endpoint)
        .send_form(&[("queries", encoded.as_str())])
        .with_context(|| format!("reconciliation request to {endpoint} failed"))?;

    let body = response
        .into_string()
        .with_context(|| format!("failed to read response body from {endpoint}"))?;

    serde_json::from_str(&body).with_context(|| format!("invalid JSON response from {endpoint}"))
}

fn build_query_batch(dataset: &Dataset) -> BTreeMap<&str, QueryPayload> {
    dataset
        .items
        .iter()
        .map(|item| {
            (
                item.id.as_str(),
                QueryPayload {
                    query: item.query.clone(),
                },
            )
        })
        .collect()
}

/// Scores every dataset item in order. Each verdict is handed to the sink as
/// it is computed, before the next item is scored, so a report can be observed
/// in progress rather than only after the full pass.
pub fn score<S>(
    dataset: &Dataset,
    results: &BTreeMap<String, ReconciliationResult>,
    mut sink: S,
) -> Result<Vec<Verdict>>
where
    S: FnMut(&LabeledQuery, &Verdict) -> Result<()>,
{
    let mut verdicts = Vec::with_capacity(dataset.items.len());
    for item in &dataset.items {
        let verdict = score_query(item, results);
        sink(item, &verdict)?;
        verdicts.push(verdict);
    }
    Ok(verdicts)
}

fn score_query(
    item: &LabeledQuery,
    results: &BTreeMap<String, ReconciliationResult>,
) -> Verdict {
    let Some(candidates) = results.get(&item.id).and_then(|entry| entry.result.as_ref()) else {
        return Verdict {
            query_id: item.id.clone(),
            outcome: VerdictOutcome::FailNoResult,
            expected_name: item.expected_name.clone(),
            actual_name: None,
        };
    };

    let Some(top_candidate) = candidates.first() else {
        return Verdict {
            query_id: item.id.clone(),
            outcome: VerdictOutcome::FailEmpty,
            expected_name: item.expected_name.clone(),
            actual_name: None,
        };
    };

    // Exact, case-sensitive equality on the canonical name; the query text
    // plays no part in the match.
    let outcome = if top_candidate.name == item.expected_name {
        VerdictOutcome::Success
    } else {
        VerdictOutcome::FailMismatch
    };

    Verdict {
        query_id: item.id.clone(),
        outcome,
        expected_name: item.expected_name.clone(),
        actual_name: Some(top_candidate.name.clone()),
    }
}

fn verdict_line(item: &LabeledQuery, verdict: &Verdict) -> String {
    match verdict.outcome {
        VerdictOutcome::Success => format!(
            "SUCCESS: '{}' -> '{}'",
            item.query,
            verdict.actual_name.as_deref().unwrap_or_default()
        ),
        VerdictOutcome::FailNoResult => format!(
            "FAIL: '{}' - No result found for query key '{}'",
            item.query, item.id
        ),
        VerdictOutcome::FailEmpty => {
            format!("FAIL: '{}' - Result list is empty", item.query)
        }
        VerdictOutcome::FailMismatch => format!(
            "FAIL: '{}' - Expected '{}', got '{}'",
            item.query,
            verdict.expected_name,
            verdict.actual_name.as_deref().unwrap_or_default()
        ),
    }
}

fn append_sample(path: &Path, strategy: &str, latency_ms: f64, accuracy: f64) -> Result<()> {
    let mut samples = if path.exists() {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let samples: SampleSet = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if samples.strategy_name != strategy {
            bail!(
                "samples file {} belongs to strategy '{}', not '{}'",
                path.display(),
                samples.strategy_name,
                strategy
            );
        }
        samples
    } else {
        SampleSet::new(strategy)
    };

    samples.latencies.push(latency_ms);
    samples.accuracies.push(accuracy);
    write_json_pretty(path, &samples)?;

    info!(
        path = %path.display(),
        strategy = strategy,
        trials = samples.latencies.len(),
        "trial appended to sample set"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{append_sample, build_query_batch, score, verdict_line};
    use crate::model::{Dataset, EntityRecord, ReconciliationResult, SampleSet, VerdictOutcome};

    fn dataset_from(pairs: &[(&str, &str)]) -> Dataset {
        let records = pairs
            .iter()
            .map(|(name, query)| EntityRecord {
                name: name.to_string(),
                query: query.to_string(),
                category: None,
            })
            .collect();
        Dataset::from_records(records, "development", "scorer-test")
    }

    fn results_from(raw: &str) -> BTreeMap<String, ReconciliationResult> {
        serde_json::from_str(raw).expect("results fixture should parse")
    }

    #[test]
    fn scorer_classifies_the_canonical_scenario_table() {
        let dataset = dataset_from(&[
            ("Apple Inc.", "Apple"),
            ("Microsoft Corp.", "Microsoft"),
            ("London", "London"),
        ]);
        let results = results_from(
            r#"{
              "q0": {"result": [{"name": "Apple Inc."}]},
              "q1": {"result": []},
              "q2": {}
            }"#,
        );

        let verdicts = score(&dataset, &results, |_, _| Ok(())).expect("scoring should succeed");
        let outcomes: Vec<VerdictOutcome> = verdicts.iter().map(|v| v.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                VerdictOutcome::Success,
                VerdictOutcome::FailEmpty,
                VerdictOutcome::FailNoResult,
            ]
        );
        assert_eq!(verdicts[0].query_id, "q0");
        assert_eq!(verdicts[2].expected_name, "London");
    }

    #[test]
    fn mismatch_records_the_actual_top_candidate() {
        let dataset = dataset_from(&[("Apple Inc.", "Apple")]);
        let results = results_from(r#"{"q0": {"result": [{"name": "Apple Computer"}]}}"#);

        let verdicts = score(&dataset, &results, |_, _| Ok(())).expect("scoring should succeed");
        assert_eq!(verdicts[0].outcome, VerdictOutcome::FailMismatch);
        assert_eq!(verdicts[0].actual_name.as_deref(), Some("Apple Computer"));
    }

    #[test]
    fn matching_is_case_sensitive_with_no_normalization() {
        let dataset = dataset_from(&[("Apple Inc.", "Apple")]);
        let results = results_from(r#"{"q0": {"result": [{"name": "apple inc."}]}}"#);

        let verdicts = score(&dataset, &results, |_, _| Ok(())).expect("scoring should succeed");
        assert_eq!(verdicts[0].outcome, VerdictOutcome::FailMismatch);
    }

    #[test]
    fn ranked_candidates_beyond_the_first_are_ignored() {
        let dataset = dataset_from(&[("Apple Inc.", "Apple")]);
        let results = results_from(
            r#"{"q0": {"result": [
                {"name": "Apple Records", "score": 0.9},
                {"name": "Apple Inc.", "score": 0.8}
            ]}}"#,
        );

        let verdicts = score(&dataset, &results, |_, _| Ok(())).expect("scoring should succeed");
        assert_eq!(verdicts[0].outcome, VerdictOutcome::FailMismatch);
        assert_eq!(verdicts[0].actual_name.as_deref(), Some("Apple Records"));
    }

    #[test]
    fn verdict_lines_match_the_report_format() {
        let dataset = dataset_from(&[
            ("Apple Inc.", "Apple"),
            ("Microsoft Corp.", "Microsoft"),
            ("London", "London"),
            ("Albert Einstein", "Einstein"),
        ]);
        let results = results_from(
            r#"{
              "q0": {"result": [{"name": "Apple Inc."}]},
              "q1": {"result": []},
              "q3": {"result": [{"name": "Einstein (crater)"}]}
            }"#,
        );

        let verdicts = score(&dataset, &results, |_, _| Ok(())).expect("scoring should succeed");
        let lines: Vec<String> = dataset
            .items
            .iter()
            .zip(&verdicts)
            .map(|(item, verdict)| verdict_line(item, verdict))
            .collect();

        assert_eq!(lines[0], "SUCCESS: 'Apple' -> 'Apple Inc.'");
        assert_eq!(lines[1], "FAIL: 'Microsoft' - Result list is empty");
        assert_eq!(lines[2], "FAIL: 'London' - No result found for query key 'q2'");
        assert_eq!(
            lines[3],
            "FAIL: 'Einstein' - Expected 'Albert Einstein', got 'Einstein (crater)'"
        );
    }

    #[test]
    fn query_batch_is_keyed_by_positional_id() {
        let dataset = dataset_from(&[("Apple Inc.", "Apple"), ("London", "London")]);
        let batch = build_query_batch(&dataset);
        let encoded = serde_json::to_string(&batch).expect("batch should encode");
        assert_eq!(
            encoded,
            r#"{"q0":{"query":"Apple"},"q1":{"query":"London"}}"#
        );
    }

    #[test]
    fn samples_accumulate_across_appends() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("reconcile-samples.json");

        append_sample(&path, "reconcile", 185.0, 0.92).expect("first append should succeed");
        append_sample(&path, "reconcile", 210.0, 0.88).expect("second append should succeed");

        let raw = std::fs::read(&path).expect("samples file should exist");
        let samples: SampleSet = serde_json::from_slice(&raw).expect("samples should parse");
        assert_eq!(samples.strategy_name, "reconcile");
        assert_eq!(samples.latencies, vec![185.0, 210.0]);
        assert_eq!(samples.accuracies, vec![0.92, 0.88]);
    }

    #[test]
    fn samples_file_rejects_a_different_strategy() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("samples.json");

        append_sample(&path, "reconcile", 185.0, 0.92).expect("first append should succeed");
        let error = append_sample(&path, "stream_chunk", 120.0, 0.85)
            .expect_err("strategy mismatch should fail");
        assert!(error.to_string().contains("belongs to strategy"));
    }
}
