//! The `quizgrade init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create quizgrade.toml
    if std::path::Path::new("quizgrade.toml").exists() {
        println!("quizgrade.toml already exists, skipping.");
    } else {
        std::fs::write("quizgrade.toml", SAMPLE_CONFIG)?;
        println!("Created quizgrade.toml");
    }

    // Create example quiz set
    std::fs::create_dir_all("quiz-sets")?;
    let example_path = std::path::Path::new("quiz-sets/example.toml");
    if example_path.exists() {
        println!("quiz-sets/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ_SET)?;
        println!("Created quiz-sets/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit quizgrade.toml with your API key (or switch default_provider to \"offline\")");
    println!("  2. Run: quizgrade import --quiz-set quiz-sets/example.toml");
    println!("  3. Run: quizgrade grade --quiz-id capital-france --answer \"Paris\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizgrade configuration

default_provider = "openai"
default_model = "text-embedding-3-small"
# Scores strictly above the threshold are graded correct.
threshold = 0.6
# "dot" (raw dot product) or "cosine"
metric = "dot"
timeout_secs = 30
parallelism = 4
store = "./quizgrade-store.json"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

# Hashed bag-of-words embeddings, no network needed.
[providers.offline]
type = "mock"
dimensions = 64
"#;

const EXAMPLE_QUIZ_SET: &str = r#"[quiz_set]
id = "example"
name = "Example quiz"
description = "Questions generated from a geography note"
note_id = "note-geography"
student_id = "student-1"

[[items]]
id = "capital-france"
question = "What is the capital of France?"
answer = "Paris"

[[items]]
id = "largest-ocean"
question = "Which is the largest ocean on Earth?"
answer = "The Pacific Ocean"
"#;
