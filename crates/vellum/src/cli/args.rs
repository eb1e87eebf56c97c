use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vellum_core::backends::ComputeFormat;

/// Inspect and render the tool calls a language model embeds in its replies.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Namespace tool calls must be addressed to (defaults to the preference, then "default_api")
    #[arg(long, env = "VELLUM_NAMESPACE")]
    pub namespace: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Interpret a serialized parse tree and print the call descriptor of each statement
    Inspect {
        /// JSON file holding the parse tree ("-" reads stdin)
        path: PathBuf,
    },
    /// List the tool_code blocks of a chat message
    Blocks {
        /// Message file ("-" reads stdin)
        path: PathBuf,
        /// Also report an unterminated trailing block
        #[arg(long)]
        partial: bool,
    },
    /// Print the tool-call instructions given to the model
    Instructions,
    /// Run one Wolfram|Alpha query and print the formatted result
    Compute {
        /// Natural language or math query
        query: String,
        /// Only keep image pods
        #[arg(long)]
        image_only: bool,
        /// Output format (defaults to the preference)
        #[arg(long)]
        format: Option<ComputeFormat>,
        /// Gateway endpoint override
        #[arg(long, env = "VELLUM_COMPUTE_ENDPOINT")]
        endpoint: Option<String>,
    },
    /// Manage user preferences
    Preferences {
        /// Preferences file to use instead of the per-user one
        #[arg(long, env = "VELLUM_PREFERENCES")]
        file: Option<PathBuf>,
        #[command(subcommand)]
        action: PreferencesCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum PreferencesCommands {
    /// Show current preferences
    Show,
    /// Reset preferences to defaults
    Reset,
}
