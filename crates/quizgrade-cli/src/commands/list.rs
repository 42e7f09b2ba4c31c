//! The `quizgrade list` command.

use anyhow::{Context as _, Result};
use comfy_table::{Cell, Table};

use quizgrade_core::store::JsonFileStore;
use quizgrade_core::traits::QuizStore;

use super::Context;

pub async fn execute(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let path = ctx.store_path.clone().unwrap_or(config.store);
    let store = JsonFileStore::open(&path)
        .with_context(|| format!("failed to open store: {}", path.display()))?;
    let items = store.list().await?;

    if items.is_empty() {
        println!("No quiz items in {}.", path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Student", "Question", "State", "Tries", "Model"]);
    for item in &items {
        table.add_row(vec![
            Cell::new(&item.id),
            Cell::new(&item.student_id),
            Cell::new(&item.question),
            Cell::new(item.graded),
            Cell::new(item.tries),
            Cell::new(&item.embedding_model),
        ]);
    }
    println!("{table}");
    println!("{} item(s)", items.len());
    Ok(())
}
