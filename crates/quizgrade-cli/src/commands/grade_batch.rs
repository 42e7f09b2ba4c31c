//! The `quizgrade grade-batch` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizgrade_core::model::GradingResult;
use quizgrade_core::parser::parse_submissions;
use quizgrade_core::report::{BatchOutcome, BatchReport};

use super::{ConsoleReporter, Context};

pub async fn execute(ctx: &Context, submissions_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let submissions = parse_submissions(&submissions_path)?;
    anyhow::ensure!(!submissions.is_empty(), "no submissions in {}", submissions_path.display());

    let grader = ctx.grader()?;
    eprintln!(
        "quizgrade v{}: Grading {} submissions (threshold {}, {})",
        env!("CARGO_PKG_VERSION"),
        submissions.len(),
        grader.config().threshold,
        grader.config().metric
    );

    let report = grader.grade_batch(submissions, &ConsoleReporter).await;
    print_summary(&report);

    if let Some(path) = output {
        report.save_json(&path)?;
        eprintln!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn print_summary(report: &BatchReport<GradingResult>) {
    let mut table = Table::new();
    table.set_header(vec!["Quiz", "Verdict", "Score", "Tries"]);

    for entry in &report.entries {
        match &entry.outcome {
            BatchOutcome::Succeeded { value } => table.add_row(vec![
                Cell::new(&entry.key),
                Cell::new(value.verdict),
                Cell::new(
                    value
                        .score
                        .map(|s| format!("{s:.4}"))
                        .unwrap_or_else(|| "-".into()),
                ),
                Cell::new(value.tries),
            ]),
            BatchOutcome::Failed { error } => table.add_row(vec![
                Cell::new(&entry.key),
                Cell::new("error"),
                Cell::new(error),
                Cell::new("-"),
            ]),
        };
    }
    println!("{table}");

    let summary = report.summary();
    println!(
        "{} correct, {} incorrect, {} failed{}",
        summary.correct,
        summary.incorrect,
        summary.failed,
        summary
            .mean_score
            .map(|m| format!(", mean score {m:.4}"))
            .unwrap_or_default()
    );
}
