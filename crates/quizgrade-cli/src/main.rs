//! quizgrade CLI: the operator-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "quizgrade",
    version,
    about = "Semantic quiz answer grading with text embeddings"
)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Quiz store path (overrides the config)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create starter config and example quiz set
    Init,

    /// Embed and store the items of a quiz set
    Import {
        /// Path to the .toml quiz set
        #[arg(long)]
        quiz_set: PathBuf,
    },

    /// Grade a single answer
    Grade {
        /// Quiz item id
        #[arg(long)]
        quiz_id: String,

        /// The submitted answer
        #[arg(long)]
        answer: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Grade every submission in a file
    GradeBatch {
        /// Path to the .toml submissions file
        #[arg(long)]
        submissions: PathBuf,

        /// Write the batch report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Re-embed a quiz item's reference answer with the configured model
    Regenerate {
        /// Quiz item id
        #[arg(long)]
        quiz_id: String,
    },

    /// List the quiz items in the store
    List,

    /// Validate a quiz set TOML file
    Validate {
        /// Path to the .toml quiz set
        #[arg(long)]
        quiz_set: PathBuf,
    },

    /// List available embedding models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "quizgrade=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context {
        config_path: cli.config,
        store_path: cli.store,
    };

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Import { quiz_set } => commands::import::execute(&ctx, quiz_set).await,
        Commands::Grade {
            quiz_id,
            answer,
            format,
        } => commands::grade::execute(&ctx, quiz_id, answer, format).await,
        Commands::GradeBatch {
            submissions,
            output,
        } => commands::grade_batch::execute(&ctx, submissions, output).await,
        Commands::Regenerate { quiz_id } => commands::regenerate::execute(&ctx, quiz_id).await,
        Commands::List => commands::list::execute(&ctx).await,
        Commands::Validate { quiz_set } => commands::validate::execute(quiz_set),
        Commands::ListModels { provider } => commands::list_models::execute(&ctx, provider).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
