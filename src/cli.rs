//! Command-line interface definition for Carelog
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for history maintenance, snapshot export/import,
//! and storage usage reporting.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Carelog - On-device conversation store for an AI care assistant
///
/// Inspect, search, and maintain the persisted conversation history,
/// and move whole-store snapshots in and out.
#[derive(Parser, Debug, Clone)]
#[command(name = "carelog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the data directory holding the conversation database
    #[arg(long, env = "CARELOG_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Carelog
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Inspect and maintain stored conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Export all conversations as a snapshot document
    Export {
        /// Write the snapshot to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a snapshot document, merging it into the store
    Import {
        /// Path to the snapshot file
        file: PathBuf,
    },

    /// Show storage usage against the byte quota
    Usage,
}

/// History maintenance subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored conversations
    List,

    /// Show one conversation (full id or prefix)
    Show {
        /// Conversation id or id prefix
        id: String,
    },

    /// Search conversations by title, summary, last message, or tags
    Search {
        /// Case-insensitive query; empty matches everything
        query: String,
    },

    /// Delete a conversation (full id or prefix)
    Delete {
        /// Conversation id or id prefix
        id: String,
    },

    /// Delete all conversations and the active session pointer
    Clear,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            data_dir: None,
            command: Commands::History {
                command: HistoryCommand::List,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(cli.data_dir.is_none());
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommand::List
            }
        ));
    }

    #[test]
    fn test_cli_parse_history_list() {
        let cli = Cli::try_parse_from(["carelog", "history", "list"]).expect("parse failed");
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommand::List
            }
        ));
    }

    #[test]
    fn test_cli_parse_history_search() {
        let cli = Cli::try_parse_from(["carelog", "history", "search", "diabetes"])
            .expect("parse failed");
        match cli.command {
            Commands::History {
                command: HistoryCommand::Search { query },
            } => assert_eq!(query, "diabetes"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_history_delete_with_prefix() {
        let cli =
            Cli::try_parse_from(["carelog", "history", "delete", "01ARZ3ND"]).expect("parse failed");
        match cli.command {
            Commands::History {
                command: HistoryCommand::Delete { id },
            } => assert_eq!(id, "01ARZ3ND"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_export_with_output() {
        let cli = Cli::try_parse_from(["carelog", "export", "--output", "backup.json"])
            .expect("parse failed");
        match cli.command {
            Commands::Export { output } => {
                assert_eq!(output, Some(PathBuf::from("backup.json")))
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_import() {
        let cli = Cli::try_parse_from(["carelog", "import", "backup.json"]).expect("parse failed");
        assert!(matches!(cli.command, Commands::Import { .. }));
    }

    #[test]
    fn test_cli_parse_usage() {
        let cli = Cli::try_parse_from(["carelog", "usage"]).expect("parse failed");
        assert!(matches!(cli.command, Commands::Usage));
    }

    #[test]
    fn test_cli_parse_data_dir_flag() {
        let cli = Cli::try_parse_from(["carelog", "--data-dir", "/tmp/carelog", "usage"])
            .expect("parse failed");
        assert_eq!(cli.data_dir, Some("/tmp/carelog".to_string()));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["carelog"]).is_err());
    }
}
