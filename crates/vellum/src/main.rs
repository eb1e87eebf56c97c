use clap::Parser;
use eyre::Result;

use vellum::cli::{Cli, Commands, PreferencesCommands};
use vellum::commands::{
    Command, blocks::BlocksCommand, compute::ComputeCommand, inspect::InspectCommand,
    instructions::InstructionsCommand,
    preferences::{PreferencesAction, PreferencesCommand},
};
use vellum_core::preferences::Preferences;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Level configured via RUST_LOG
    vellum_core::utils::tracing::init_tracing()?;

    let preferences = Preferences::load().unwrap_or_default();
    let namespace = cli
        .namespace
        .clone()
        .unwrap_or_else(|| preferences.dispatch.namespace.clone());

    let command: Box<dyn Command> = match cli.command {
        Commands::Inspect { path } => Box::new(InspectCommand { path, namespace }),
        Commands::Blocks { path, partial } => Box::new(BlocksCommand { path, partial }),
        Commands::Instructions => Box::new(InstructionsCommand { namespace }),
        Commands::Compute {
            query,
            image_only,
            format,
            endpoint,
        } => Box::new(ComputeCommand {
            query,
            image_only,
            format: format.unwrap_or(preferences.compute.format),
            endpoint: endpoint.unwrap_or_else(|| preferences.compute.endpoint.clone()),
        }),
        Commands::Preferences { file, action } => {
            let action = match action {
                PreferencesCommands::Show => PreferencesAction::Show,
                PreferencesCommands::Reset => PreferencesAction::Reset,
            };
            Box::new(PreferencesCommand { action, path: file })
        }
    };

    command.execute().await
}
