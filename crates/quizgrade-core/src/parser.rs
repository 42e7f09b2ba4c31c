//! TOML quiz-set and submission parser.
//!
//! Loads quiz sets to import and submission lists to grade, and validates
//! quiz sets for common authoring mistakes.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{NewQuizItem, QuizSet, Submission};

/// Intermediate TOML structure for quiz-set files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz_set: TomlQuizSetHeader,
    #[serde(default)]
    items: Vec<TomlQuizItem>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizSetHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    /// Default note for items that do not name one.
    #[serde(default)]
    note_id: Option<String>,
    /// Default student for items that do not name one.
    #[serde(default)]
    student_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizItem {
    #[serde(default)]
    id: Option<String>,
    question: String,
    answer: String,
    #[serde(default)]
    note_id: Option<String>,
    #[serde(default)]
    student_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlSubmissionFile {
    #[serde(default)]
    submissions: Vec<Submission>,
}

/// Parse a single TOML file into a `QuizSet`.
pub fn parse_quiz_set(path: &Path) -> Result<QuizSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz set file: {}", path.display()))?;

    parse_quiz_set_str(&content, path)
}

/// Parse a TOML string into a `QuizSet`.
pub fn parse_quiz_set_str(content: &str, source_path: &Path) -> Result<QuizSet> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let header = parsed.quiz_set;
    let items = parsed
        .items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let note_id = item
                .note_id
                .or_else(|| header.note_id.clone())
                .with_context(|| format!("item #{index} has no note_id and no default is set"))?;
            let student_id = item
                .student_id
                .or_else(|| header.student_id.clone())
                .with_context(|| {
                    format!("item #{index} has no student_id and no default is set")
                })?;
            Ok(NewQuizItem {
                id: item.id,
                note_id,
                student_id,
                question: item.question,
                reference_answer: item.answer,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuizSet {
        id: header.id,
        name: header.name,
        description: header.description,
        items,
    })
}

/// Parse a TOML file of `[[submissions]]` entries.
pub fn parse_submissions(path: &Path) -> Result<Vec<Submission>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read submissions file: {}", path.display()))?;
    parse_submissions_str(&content, path)
}

pub fn parse_submissions_str(content: &str, source_path: &Path) -> Result<Vec<Submission>> {
    let parsed: TomlSubmissionFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    Ok(parsed.submissions)
}

/// A warning from quiz-set validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The item id or position (if applicable).
    pub item: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a quiz set for common issues.
pub fn validate_quiz_set(set: &QuizSet) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if set.items.is_empty() {
        warnings.push(ValidationWarning {
            item: None,
            message: "quiz set has no items".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for (index, item) in set.items.iter().enumerate() {
        let label = item.id.clone().unwrap_or_else(|| format!("#{index}"));

        if let Some(id) = &item.id {
            if !seen_ids.insert(id) {
                warnings.push(ValidationWarning {
                    item: Some(label.clone()),
                    message: format!("duplicate item ID: {id}"),
                });
            }
        }
        if item.question.trim().is_empty() {
            warnings.push(ValidationWarning {
                item: Some(label.clone()),
                message: "question is empty".into(),
            });
        }
        if item.reference_answer.trim().is_empty() {
            warnings.push(ValidationWarning {
                item: Some(label),
                message: "answer is empty".into(),
            });
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[quiz_set]
id = "geography"
name = "European capitals"
description = "Generated from the geography note"
note_id = "note-geo"
student_id = "student-1"

[[items]]
id = "q-france"
question = "What is the capital of France?"
answer = "Paris"

[[items]]
question = "What is the capital of Italy?"
answer = "Rome"
student_id = "student-2"
"#;

    #[test]
    fn parse_valid_toml() {
        let set = parse_quiz_set_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(set.id, "geography");
        assert_eq!(set.items.len(), 2);
        assert_eq!(set.items[0].id.as_deref(), Some("q-france"));
        assert_eq!(set.items[0].note_id, "note-geo");
        assert_eq!(set.items[0].reference_answer, "Paris");
        assert_eq!(set.items[1].id, None);
        assert_eq!(set.items[1].student_id, "student-2");
        assert!(validate_quiz_set(&set).is_empty());
    }

    #[test]
    fn missing_note_id_is_an_error() {
        let toml = r#"
[quiz_set]
id = "x"
name = "X"
student_id = "s"

[[items]]
question = "Q"
answer = "A"
"#;
        let err = parse_quiz_set_str(toml, &PathBuf::from("test.toml")).unwrap_err();
        assert!(err.to_string().contains("note_id"));
    }

    #[test]
    fn validate_duplicates_and_blanks() {
        let toml = r#"
[quiz_set]
id = "dupes"
name = "Dupes"
note_id = "n"
student_id = "s"

[[items]]
id = "same"
question = "First?"
answer = "one"

[[items]]
id = "same"
question = "Second?"
answer = "  "
"#;
        let set = parse_quiz_set_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_quiz_set(&set);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate")));
        assert!(warnings.iter().any(|w| w.message == "answer is empty"));
    }

    #[test]
    fn parse_submission_list() {
        let toml = r#"
[[submissions]]
quiz_id = "q-france"
answer = "Paris"

[[submissions]]
quiz_id = "q-italy"
answer = "Milan"
"#;
        let subs = parse_submissions_str(toml, &PathBuf::from("subs.toml")).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[1].answer, "Milan");
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_quiz_set_str(bad, &PathBuf::from("bad.toml")).is_err());
        assert!(parse_submissions_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("set.toml");
        std::fs::write(&file_path, VALID_TOML).unwrap();

        let set = parse_quiz_set(&file_path).unwrap();
        assert_eq!(set.name, "European capitals");
    }
}
