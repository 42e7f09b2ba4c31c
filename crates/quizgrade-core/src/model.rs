//! Core data model types for quizgrade.
//!
//! These are the records the grader reads and writes: quiz items with their
//! reference embeddings, submissions, and grading outcomes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single quiz question generated for a student from one of their notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizItem {
    /// Unique identifier.
    pub id: String,
    /// The note this question was generated from.
    pub note_id: String,
    /// The student the question belongs to.
    pub student_id: String,
    /// Text shown to the student.
    pub question: String,
    /// The expected answer. Never modified after creation.
    pub reference_answer: String,
    /// Embedding of `reference_answer`, computed once at creation.
    pub reference_embedding: Vec<f32>,
    /// Model that produced `reference_embedding`.
    pub embedding_model: String,
    /// Grading state. Once `Correct` it never changes.
    #[serde(default)]
    pub graded: GradeState,
    /// Number of persisted grading attempts.
    #[serde(default)]
    pub tries: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub graded_at: Option<DateTime<Utc>>,
}

impl QuizItem {
    /// Whether the item has already been answered correctly.
    pub fn is_correct(&self) -> bool {
        self.graded == GradeState::Correct
    }
}

/// Input for creating a quiz item; the grader fills in id and embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuizItem {
    /// Optional caller-chosen id. A UUID is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub note_id: String,
    pub student_id: String,
    pub question: String,
    pub reference_answer: String,
}

/// A named collection of quiz items to import, usually one note's worth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub items: Vec<NewQuizItem>,
}

/// A free-text answer submitted for a quiz item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub quiz_id: String,
    pub answer: String,
}

/// Persisted grading state of a quiz item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeState {
    #[default]
    Ungraded,
    Correct,
    Incorrect,
}

impl fmt::Display for GradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeState::Ungraded => write!(f, "ungraded"),
            GradeState::Correct => write!(f, "correct"),
            GradeState::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// Binary grading outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Correct => write!(f, "correct"),
            Verdict::Incorrect => write!(f, "incorrect"),
        }
    }
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingResult {
    pub quiz_id: String,
    pub verdict: Verdict,
    /// Similarity score. `None` when the stored verdict was returned without
    /// recomputation.
    pub score: Option<f64>,
    /// Attempt count after this grading.
    pub tries: u32,
    /// The item was already correct; nothing was embedded or written.
    pub already_graded: bool,
}

/// How two embeddings are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Raw dot product. Sensitive to vector magnitude.
    #[default]
    Dot,
    /// Dot product of the L2-normalized vectors.
    Cosine,
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::Dot => write!(f, "dot"),
            SimilarityMetric::Cosine => write!(f, "cosine"),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dot" | "dot_product" => Ok(SimilarityMetric::Dot),
            "cosine" => Ok(SimilarityMetric::Cosine),
            other => Err(format!("unknown similarity metric: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_state_defaults_to_ungraded() {
        let json = r#"{
            "id": "q1",
            "note_id": "n1",
            "student_id": "s1",
            "question": "Capital of France?",
            "reference_answer": "Paris",
            "reference_embedding": [1.0, 0.0],
            "embedding_model": "mock-embed",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let item: QuizItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.graded, GradeState::Ungraded);
        assert_eq!(item.tries, 0);
        assert!(item.graded_at.is_none());
        assert!(!item.is_correct());
    }

    #[test]
    fn metric_parsing() {
        assert_eq!("dot".parse::<SimilarityMetric>(), Ok(SimilarityMetric::Dot));
        assert_eq!(
            "Cosine".parse::<SimilarityMetric>(),
            Ok(SimilarityMetric::Cosine)
        );
        assert!("euclid".parse::<SimilarityMetric>().is_err());
    }

    #[test]
    fn verdict_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Verdict::Correct).unwrap(),
            "\"correct\""
        );
    }
}
