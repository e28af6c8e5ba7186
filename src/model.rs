use serde::{Deserialize, Serialize};

use crate::perturb::PerturbationClass;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub name: String,
    pub query: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledQuery {
    pub id: String,
    pub query: String,
    pub expected_name: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub environment: String,
    pub filename: String,
    pub items: Vec<LabeledQuery>,
}

impl Dataset {
    /// Ids are positional ("q0".."qN-1") and regenerated on every load; they
    /// are correlation keys only and are never stored.
    pub fn from_records(records: Vec<EntityRecord>, environment: &str, filename: &str) -> Self {
        let items = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| LabeledQuery {
                id: format!("q{index}"),
                query: record.query,
                expected_name: record.name,
                category: record.category,
            })
            .collect();

        Self {
            environment: environment.to_string(),
            filename: filename.to_string(),
            items,
        }
    }

    pub fn to_records(&self) -> Vec<EntityRecord> {
        self.items
            .iter()
            .map(|item| EntityRecord {
                name: item.expected_name.clone(),
                query: item.query.clone(),
                category: item.category.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryPayload {
    pub query: String,
}

/// A present key with no `result` field at all reads as "no result", distinct
/// from a present-but-empty candidate list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconciliationResult {
    pub result: Option<Vec<Candidate>>,
}

/// Ranked candidates carry score and other ranking fields on the wire; only
/// the name is consulted, the rest is ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictOutcome {
    Success,
    FailNoResult,
    FailEmpty,
    FailMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub query_id: String,
    pub outcome: VerdictOutcome,
    pub expected_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSet {
    pub strategy_name: String,
    pub latencies: Vec<f64>,
    pub accuracies: Vec<f64>,
}

impl SampleSet {
    pub fn new(strategy_name: &str) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            latencies: Vec::new(),
            accuracies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictTally {
    pub success: usize,
    pub fail_no_result: usize,
    pub fail_empty: usize,
    pub fail_mismatch: usize,
}

impl VerdictTally {
    pub fn record(&mut self, outcome: VerdictOutcome) {
        match outcome {
            VerdictOutcome::Success => self.success += 1,
            VerdictOutcome::FailNoResult => self.fail_no_result += 1,
            VerdictOutcome::FailEmpty => self.fail_empty += 1,
            VerdictOutcome::FailMismatch => self.fail_mismatch += 1,
        }
    }

    pub fn merge(&mut self, other: &VerdictTally) {
        self.success += other.success;
        self.fail_no_result += other.fail_no_result;
        self.fail_empty += other.fail_empty;
        self.fail_mismatch += other.fail_mismatch;
    }

    pub fn total(&self) -> usize {
        self.success + self.fail_no_result + self.fail_empty + self.fail_mismatch
    }

    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(self.success as f64 / total as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ClassTallies {
    pub variant: VerdictTally,
    pub noise: VerdictTally,
    pub exact: VerdictTally,
}

impl ClassTallies {
    pub fn record(&mut self, class: PerturbationClass, outcome: VerdictOutcome) {
        match class {
            PerturbationClass::Variant => self.variant.record(outcome),
            PerturbationClass::Noise => self.noise.record(outcome),
            PerturbationClass::Exact => self.exact.record(outcome),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub sha256: Option<String>,
    pub item_count: usize,
    pub batch_latency_ms: Option<f64>,
    pub accuracy: Option<f64>,
    pub tally: VerdictTally,
    pub by_class: ClassTallies,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub endpoint: String,
    pub files: Vec<FileSummary>,
    pub totals: VerdictTally,
}
