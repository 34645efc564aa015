//! Lexiscope CLI: the main entry point.
//!
//! Commands:
//! - `query`    Compose the knowledge context for an utterance
//! - `quick`    Answer an utterance without an LLM, if possible
//! - `respond`  Look up a pre-written response
//! - `retrieve` Search the bundle's passages (memoized)
//! - `grade`    Check a spoken answer against the expected one
//! - `lessons`  List the curriculum units available to an avatar
//! - `stats`    Show what a session loaded
//! - `config`   Show, locate or validate the configuration

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "lexiscope",
    about = "Lexiscope: tiered knowledge retrieval for live language tutoring",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Where a session's knowledge comes from.
#[derive(Args, Clone)]
pub struct SessionArgs {
    /// JSON knowledge bundle (built-in defaults only when omitted)
    #[arg(short, long, env = "LEXISCOPE_BUNDLE")]
    pub bundle: Option<PathBuf>,

    /// Avatar whose topic knowledge and lessons are loaded
    #[arg(short, long, default_value = "default")]
    pub avatar: String,

    /// Config file (defaults to ~/.lexiscope/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose the knowledge context for an utterance
    Query {
        text: String,

        #[command(flatten)]
        session: SessionArgs,

        /// Skip grammar lookups
        #[arg(long)]
        no_grammar: bool,

        /// Skip vocabulary lookups
        #[arg(long)]
        no_vocabulary: bool,

        /// Skip mistake detection
        #[arg(long)]
        no_mistakes: bool,

        /// Skip curriculum matching
        #[arg(long)]
        no_curriculum: bool,

        /// Print the per-category breakdown as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer an utterance without an LLM, if possible
    Quick {
        text: String,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Look up a pre-written response for an utterance
    Respond {
        text: String,

        #[command(flatten)]
        session: SessionArgs,

        /// Load the cached responses and slide explanations of this unit first
        #[arg(short, long)]
        unit: Option<String>,

        /// Active scope tag (e.g. the current slide id)
        #[arg(short, long)]
        scope: Option<String>,
    },

    /// Search the bundle's passages, best first
    Retrieve {
        text: String,

        #[command(flatten)]
        session: SessionArgs,

        /// Restrict to these collections (repeatable; all when omitted)
        #[arg(short, long = "collection")]
        collections: Vec<String>,
    },

    /// Check a spoken answer against the expected one
    Grade {
        /// The expected answer
        #[arg(short, long)]
        expected: String,

        /// What the learner said
        #[arg(short, long)]
        given: String,

        /// Further acceptable answers (repeatable)
        #[arg(short = 'A', long = "accept")]
        acceptable: Vec<String>,
    },

    /// List the curriculum units available to an avatar
    Lessons {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Show what a session loaded
    Stats {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default config file path
    Path,
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query {
            text,
            session,
            no_grammar,
            no_vocabulary,
            no_mistakes,
            no_curriculum,
            json,
        } => {
            let options = lexiscope_knowledge::ComposeOptions {
                grammar: !no_grammar,
                vocabulary: !no_vocabulary,
                mistakes: !no_mistakes,
                curriculum: !no_curriculum,
            };
            commands::query::run(&session, &text, options, json).await?
        }
        Commands::Quick { text, session } => commands::query::quick(&session, &text).await?,
        Commands::Respond {
            text,
            session,
            unit,
            scope,
        } => commands::respond::run(&session, &text, unit.as_deref(), scope.as_deref()).await?,
        Commands::Retrieve {
            text,
            session,
            collections,
        } => commands::retrieve::run(&session, &text, &collections).await?,
        Commands::Grade {
            expected,
            given,
            acceptable,
        } => commands::grade::run(&expected, &acceptable, &given)?,
        Commands::Lessons { session } => commands::stats::lessons(&session).await?,
        Commands::Stats { session } => commands::stats::run(&session).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
