//! The `quizgrade validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(quiz_set_path: PathBuf) -> Result<()> {
    let set = quizgrade_core::parser::parse_quiz_set(&quiz_set_path)?;
    println!("Quiz set: {} ({} items)", set.name, set.items.len());

    let warnings = quizgrade_core::parser::validate_quiz_set(&set);
    for w in &warnings {
        let prefix = w
            .item
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Quiz set valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
