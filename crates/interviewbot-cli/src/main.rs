//! interviewbot CLI: run interviews, seed question banks, inspect results.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use interviewbot_core::scoring::PolicyKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "interviewbot",
    version,
    about = "Quiz candidates on programming basics and score their answers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive interview
    ///
    /// Type quit, exit or stop (or send end of input) to finish early. An
    /// empty line does not end the interview: it is recorded and scored as a
    /// blank answer.
    Interview {
        /// Candidate name (prompted for when omitted)
        #[arg(long)]
        candidate: Option<String>,

        /// Number of questions to ask (5-10)
        #[arg(long, default_value = "5", allow_negative_numbers = true)]
        questions: i64,

        /// Scoring policy: similarity or containment
        #[arg(long)]
        policy: Option<PolicyKind>,

        /// Similarity threshold (similarity policy only)
        #[arg(long)]
        threshold: Option<f64>,

        /// Database URL (sqlite://..., postgres://..., memory)
        #[arg(long)]
        database: Option<String>,

        /// Provider used to generate missing questions
        #[arg(long)]
        provider: Option<String>,

        /// Model used to generate missing questions
        #[arg(long)]
        model: Option<String>,

        /// Never ask a provider for questions
        #[arg(long)]
        no_generate: bool,

        /// Write the session transcript as JSON
        #[arg(long)]
        transcript: Option<PathBuf>,

        /// Write a markdown summary of the session
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Load question banks into the store
    Seed {
        /// Path to a .toml question bank or a directory of them
        #[arg(long)]
        bank: PathBuf,

        /// Database URL
        #[arg(long)]
        database: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a .toml question bank or a directory of them
        #[arg(long)]
        bank: PathBuf,
    },

    /// Show past interview reports
    History {
        /// Only show reports for this candidate
        #[arg(long)]
        candidate: Option<String>,

        /// Also list the candidate's recorded answers
        #[arg(long, requires = "candidate")]
        responses: bool,

        /// Database URL
        #[arg(long)]
        database: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Score a single answer against a reference
    Score {
        /// The candidate's answer
        #[arg(long)]
        response: String,

        /// The reference answer
        #[arg(long)]
        reference: String,

        /// Scoring policy: similarity or containment
        #[arg(long, default_value = "similarity")]
        policy: PolicyKind,

        /// Similarity threshold
        #[arg(long, default_value = "0.6")]
        threshold: f64,
    },

    /// List available generator models
    ListModels {
        /// Filter to specific provider
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("interviewbot=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Interview {
            candidate,
            questions,
            policy,
            threshold,
            database,
            provider,
            model,
            no_generate,
            transcript,
            markdown,
            config,
        } => {
            commands::interview::execute(commands::interview::InterviewArgs {
                candidate,
                questions,
                policy,
                threshold,
                database,
                provider,
                model,
                no_generate,
                transcript,
                markdown,
                config,
            })
            .await
        }
        Commands::Seed {
            bank,
            database,
            config,
        } => commands::seed::execute(bank, database, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::History {
            candidate,
            responses,
            database,
            config,
        } => commands::history::execute(candidate, responses, database, config).await,
        Commands::Score {
            response,
            reference,
            policy,
            threshold,
        } => commands::score::execute(&response, &reference, policy, threshold),
        Commands::ListModels { provider, config } => {
            commands::list_models::execute(provider, config).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
