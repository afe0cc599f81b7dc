use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Detects the conversation pane in a captured chat page and windows its
/// oldest messages out of the document.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Engine tuning overrides (TOML). Unset values keep their defaults.
    #[arg(long, env = "THREADTRIM_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Preferences file (defaults to the user config directory)
    #[arg(long, env = "THREADTRIM_PREFERENCES", global = true)]
    pub preferences: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Score every candidate container in a page snapshot
    Scan {
        /// Page snapshot (JSON)
        snapshot: PathBuf,
        /// Print the raw debug-scan response
        #[arg(long)]
        json: bool,
    },
    /// Window a page snapshot with the saved budget or an explicit one
    Apply {
        /// Page snapshot (JSON)
        snapshot: PathBuf,
        /// Target budget in pixels (saved to preferences, like the popup does)
        #[arg(long)]
        budget: Option<u32>,
        /// Print the windowed content parent as HTML
        #[arg(long)]
        html: bool,
        /// Print the raw command response
        #[arg(long)]
        json: bool,
    },
    /// Window a page snapshot, then bring hidden messages back
    Restore {
        /// Page snapshot (JSON)
        snapshot: PathBuf,
        /// Only restore this many batches, as scrolling to the top would
        #[arg(long)]
        batches: Option<usize>,
        /// Print the content parent as HTML afterwards
        #[arg(long)]
        html: bool,
    },
    /// Replay a JSON-lines script of host events against a page snapshot
    Replay {
        /// Page snapshot (JSON)
        snapshot: PathBuf,
        /// One event per line, e.g. {"at": 0, "event": "scroll", "scrollTop": 120}
        script: PathBuf,
    },
    /// Manage user preferences
    Preferences {
        #[command(subcommand)]
        action: PreferencesCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum PreferencesCommands {
    /// Show current preferences
    Show,
    /// Change one or more preferences
    Set {
        /// Target budget in pixels
        #[arg(long)]
        budget: Option<u32>,
        /// Master switch for windowing
        #[arg(long)]
        enabled: Option<bool>,
        /// Window live conversations
        #[arg(long)]
        conversations: Option<bool>,
        /// Window shared transcripts
        #[arg(long)]
        shared_transcripts: Option<bool>,
    },
    /// Reset preferences to defaults
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_nested_preference_flags() {
        let cli = Cli::parse_from([
            "threadtrim",
            "preferences",
            "set",
            "--budget",
            "8000",
            "--shared-transcripts",
            "false",
        ]);
        match cli.command {
            Commands::Preferences {
                action:
                    PreferencesCommands::Set {
                        budget,
                        shared_transcripts,
                        enabled,
                        ..
                    },
            } => {
                assert_eq!(budget, Some(8000));
                assert_eq!(shared_transcripts, Some(false));
                assert_eq!(enabled, None);
            }
            _ => panic!("expected preferences set"),
        }
    }
}
