//! The `quizgrade regenerate` command.

use anyhow::Result;

use super::Context;

pub async fn execute(ctx: &Context, quiz_id: String) -> Result<()> {
    let grader = ctx.grader()?;
    let item = grader.regenerate_reference(&quiz_id).await?;
    println!(
        "Regenerated {} with {} ({} dims)",
        item.id,
        item.embedding_model,
        item.reference_embedding.len()
    );
    Ok(())
}
