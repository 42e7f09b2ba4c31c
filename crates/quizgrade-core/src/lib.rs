//! quizgrade-core: Similarity scoring, grading policy, and orchestration.
//!
//! This crate defines the quiz data model, the provider and store traits,
//! and the grader that ties them together.

pub mod error;
pub mod grader;
pub mod model;
pub mod parser;
pub mod policy;
pub mod report;
pub mod similarity;
pub mod store;
pub mod traits;

pub use error::{DimensionMismatch, GradingError, ProviderError, StoreError};
pub use grader::{Grader, GraderConfig};
pub use model::{GradeState, GradingResult, QuizItem, Verdict};
