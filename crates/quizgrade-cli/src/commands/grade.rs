//! The `quizgrade grade` command.

use anyhow::Result;

use quizgrade_core::model::GradingResult;

use super::Context;

pub async fn execute(ctx: &Context, quiz_id: String, answer: String, format: String) -> Result<()> {
    let grader = ctx.grader()?;
    let result = grader.grade_submission(&quiz_id, &answer).await?;

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => println!("{}", describe(&result)),
        other => anyhow::bail!("unknown format: {other}"),
    }
    Ok(())
}

fn describe(result: &GradingResult) -> String {
    let score = match result.score {
        Some(score) => format!("score {score:.4}"),
        None => "already graded".to_string(),
    };
    format!(
        "{}: {} ({}, tries {})",
        result.quiz_id, result.verdict, score, result.tries
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizgrade_core::model::Verdict;

    #[test]
    fn describe_fresh_and_cached() {
        let mut result = GradingResult {
            quiz_id: "q1".into(),
            verdict: Verdict::Incorrect,
            score: Some(0.25),
            tries: 1,
            already_graded: false,
        };
        assert_eq!(describe(&result), "q1: incorrect (score 0.2500, tries 1)");

        result.verdict = Verdict::Correct;
        result.score = None;
        assert_eq!(describe(&result), "q1: correct (already graded, tries 1)");
    }
}
