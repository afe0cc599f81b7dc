use clap::Parser;
use eyre::Result;

use threadtrim::cli::{Cli, Commands, PreferencesCommands};
use threadtrim::commands::{
    Command,
    apply::ApplyCommand,
    preferences::{PreferenceChanges, PreferencesAction, PreferencesCommand},
    replay::ReplayCommand,
    restore::RestoreCommand,
    scan::ScanCommand,
};
use threadtrim::page::PageSources;

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre for better error reports
    color_eyre::install()?;

    let cli = Cli::parse();

    // Initialize tracing (level configured via RUST_LOG env var)
    threadtrim::logging::init_tracing()?;

    let sources = PageSources {
        config: cli.config,
        preferences: cli.preferences,
    };

    match cli.command {
        Commands::Scan { snapshot, json } => {
            ScanCommand {
                snapshot,
                json,
                sources,
            }
            .execute()
            .await
        }
        Commands::Apply {
            snapshot,
            budget,
            html,
            json,
        } => {
            ApplyCommand {
                snapshot,
                budget,
                html,
                json,
                sources,
            }
            .execute()
            .await
        }
        Commands::Restore {
            snapshot,
            batches,
            html,
        } => {
            RestoreCommand {
                snapshot,
                batches,
                html,
                sources,
            }
            .execute()
            .await
        }
        Commands::Replay { snapshot, script } => {
            ReplayCommand {
                snapshot,
                script,
                sources,
            }
            .execute()
            .await
        }
        Commands::Preferences { action } => {
            let store = sources.preference_store()?;
            let cmd = PreferencesCommand {
                action: match action {
                    PreferencesCommands::Show => PreferencesAction::Show,
                    PreferencesCommands::Set {
                        budget,
                        enabled,
                        conversations,
                        shared_transcripts,
                    } => PreferencesAction::Set(PreferenceChanges {
                        budget,
                        enabled,
                        conversations,
                        shared_transcripts,
                    }),
                    PreferencesCommands::Reset => PreferencesAction::Reset,
                },
                store,
            };
            cmd.execute().await
        }
    }
}
