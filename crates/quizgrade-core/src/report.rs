//! Batch reports with JSON persistence and summary statistics.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{GradingResult, Verdict};

/// Outcome of a batch operation, one entry per input in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport<T> {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the batch finished.
    pub created_at: DateTime<Utc>,
    pub entries: Vec<BatchEntry<T>>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// A single batch item: its key (usually the quiz id) and what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry<T> {
    pub key: String,
    pub outcome: BatchOutcome<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome<T> {
    Succeeded { value: T },
    Failed { error: String },
}

impl<T> BatchOutcome<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            BatchOutcome::Succeeded { value } => Some(value),
            BatchOutcome::Failed { .. } => None,
        }
    }
}

impl<T> BatchReport<T> {
    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.value().is_some())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    /// Successful values in input order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter_map(|e| e.outcome.value())
    }
}

impl<T: Serialize> BatchReport<T> {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }
}

impl<T: DeserializeOwned> BatchReport<T> {
    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }
}

/// Aggregate view over a grading batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingSummary {
    pub total: usize,
    pub failed: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Items that were already correct and skipped.
    pub already_graded: usize,
    /// Mean of the freshly computed scores.
    pub mean_score: Option<f64>,
}

impl BatchReport<GradingResult> {
    pub fn summary(&self) -> GradingSummary {
        let mut summary = GradingSummary {
            total: self.entries.len(),
            failed: self.failed(),
            correct: 0,
            incorrect: 0,
            already_graded: 0,
            mean_score: None,
        };
        let mut scores = Vec::new();
        for result in self.values() {
            match result.verdict {
                Verdict::Correct => summary.correct += 1,
                Verdict::Incorrect => summary.incorrect += 1,
            }
            if result.already_graded {
                summary.already_graded += 1;
            }
            scores.extend(result.score);
        }
        if !scores.is_empty() {
            summary.mean_score = Some(scores.iter().sum::<f64>() / scores.len() as f64);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(quiz_id: &str, verdict: Verdict, score: Option<f64>) -> BatchEntry<GradingResult> {
        BatchEntry {
            key: quiz_id.into(),
            outcome: BatchOutcome::Succeeded {
                value: GradingResult {
                    quiz_id: quiz_id.into(),
                    verdict,
                    score,
                    tries: 1,
                    already_graded: score.is_none(),
                },
            },
        }
    }

    fn report() -> BatchReport<GradingResult> {
        BatchReport {
            id: Uuid::nil(),
            created_at: Utc::now(),
            entries: vec![
                graded("q1", Verdict::Correct, Some(0.9)),
                graded("q2", Verdict::Incorrect, Some(0.3)),
                graded("q3", Verdict::Correct, None),
                BatchEntry {
                    key: "q4".into(),
                    outcome: BatchOutcome::Failed {
                        error: "quiz item not found: q4".into(),
                    },
                },
            ],
            duration_ms: 12,
        }
    }

    #[test]
    fn summary_counts() {
        let summary = report().summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.incorrect, 1);
        assert_eq!(summary.already_graded, 1);
        let mean = summary.mean_score.unwrap();
        assert!((mean - 0.6).abs() < 1e-12);
    }

    #[test]
    fn empty_report_has_no_mean() {
        let empty: BatchReport<GradingResult> = BatchReport {
            id: Uuid::nil(),
            created_at: Utc::now(),
            entries: vec![],
            duration_ms: 0,
        };
        assert_eq!(empty.summary().mean_score, None);
    }

    #[test]
    fn json_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        report().save_json(&path).unwrap();

        let loaded: BatchReport<GradingResult> = BatchReport::load_json(&path).unwrap();
        assert_eq!(loaded.entries.len(), 4);
        assert_eq!(loaded.failed(), 1);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"status\": \"failed\""));
    }
}
