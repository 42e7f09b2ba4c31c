//! The `quizgrade import` command.

use std::path::PathBuf;

use anyhow::Result;

use quizgrade_core::parser::{parse_quiz_set, validate_quiz_set};

use super::{ConsoleReporter, Context};

pub async fn execute(ctx: &Context, quiz_set_path: PathBuf) -> Result<()> {
    let set = parse_quiz_set(&quiz_set_path)?;
    for w in validate_quiz_set(&set) {
        eprintln!("  WARNING: {}", w.message);
    }

    let grader = ctx.grader()?;
    eprintln!(
        "quizgrade v{}: Importing {} items from '{}' with {}",
        env!("CARGO_PKG_VERSION"),
        set.items.len(),
        set.name,
        grader.config().model
    );

    let report = grader.create_batch(set.items, &ConsoleReporter).await;
    for item in report.values() {
        println!("Created {} ({} dims): {}", item.id, item.reference_embedding.len(), item.question);
    }

    let failed = report.failed();
    anyhow::ensure!(failed == 0, "{failed} item(s) failed to import");
    Ok(())
}
