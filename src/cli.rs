use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "spamgate",
    version,
    about = "Spam-gated auto-publication for content repositories"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Checks an API key against the classification service.
    VerifyKey {
        #[arg(long, env = "CLASSIFIER_API_KEY")]
        key: String,
    },
    /// Classifies a comment read from a JSON file.
    Check(CommentArgs),
    /// Reports a comment as spam the classifier missed.
    ReportSpam(CommentArgs),
    /// Reports a comment as wrongly flagged.
    ReportHam(CommentArgs),
    /// Feeds recorded lifecycle events through the engine against a tree
    /// snapshot.
    Replay {
        /// Tree snapshot (JSON).
        #[arg(long)]
        tree: PathBuf,
        /// Lifecycle events, one JSON object per line.
        #[arg(long)]
        events: PathBuf,
        /// Where to write the resulting tree; nothing is written when absent.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct CommentArgs {
    #[arg(long, env = "CLASSIFIER_API_KEY")]
    pub key: String,
    /// Comment payload (JSON).
    #[arg(long)]
    pub comment: PathBuf,
}
