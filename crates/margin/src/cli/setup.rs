use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "margin",
    bin_name = "margin",
    version,
    disable_help_subcommand = true,
    after_help = "Logging: set MARGIN_LOG (e.g. MARGIN_LOG=marginapp=debug) to see engine diagnostics."
)]
#[command(about = "Keep suggestions on documents you do not own", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (defaults to MARGIN_DATA or the OS data dir)
    #[arg(long, global = true, value_name = "DIR", help_heading = "Options")]
    pub data: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover tools in a page capture, store them and restore highlights
    #[command(display_order = 1)]
    Scan {
        /// Page capture (JSON)
        capture: PathBuf,
    },

    /// Scan a page capture, then write its exposition as an export document
    #[command(display_order = 2)]
    Save {
        /// Page capture (JSON)
        capture: PathBuf,

        /// Output file (defaults to a timestamped name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Attach a suggestion to selected text of a tool
    #[command(alias = "s", display_order = 3)]
    Suggest {
        /// Page capture (JSON)
        capture: PathBuf,

        /// Tool (region) id
        #[arg(long)]
        tool: String,

        /// The selected text, as it reads on the page
        #[arg(long)]
        selection: String,

        /// The suggestion
        #[arg(long)]
        text: String,
    },

    /// List suggestions of an exposition
    #[command(alias = "ls", display_order = 4)]
    List {
        exposition: String,

        /// Only this weave
        #[arg(long)]
        weave: Option<String>,

        /// Only this tool
        #[arg(long)]
        tool: Option<String>,
    },

    /// Delete one suggestion
    #[command(alias = "rm", display_order = 5)]
    Delete {
        exposition: String,
        weave: String,
        tool: String,
        suggestion_id: String,
    },

    /// Write an exposition as an export document
    #[command(display_order = 10)]
    Export {
        exposition: String,

        /// Output file (defaults to a timestamped name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge an export document into the store
    #[command(display_order = 11)]
    Import {
        /// Export document (JSON)
        file: PathBuf,

        /// Merge into this exposition instead of the one the document names
        #[arg(long, value_name = "EXPOSITION")]
        into: Option<String>,
    },

    /// Print the text-only listing of a page capture
    #[command(display_order = 12)]
    Read {
        /// Page capture (JSON)
        capture: PathBuf,
    },

    /// Overview of stored expositions
    #[command(display_order = 20)]
    Status,

    /// Show or change configuration
    #[command(display_order = 30)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print a commented template of every setting
    Gen {
        /// Write the template to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the resolved value of one key
    Get { key: String },

    /// Persist a value in the data directory's margin.toml
    Set { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("margin").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["status", "--data", "/tmp/m", "-v"]);
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.data, Some(PathBuf::from("/tmp/m")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_suggest_requires_all_parts() {
        let cli = parse(&[
            "suggest",
            "page.json",
            "--tool",
            "tool-1",
            "--selection",
            "quick brown",
            "--text",
            "slow",
        ]);
        match cli.command {
            Commands::Suggest {
                capture,
                tool,
                selection,
                text,
            } => {
                assert_eq!(capture, PathBuf::from("page.json"));
                assert_eq!(tool, "tool-1");
                assert_eq!(selection, "quick brown");
                assert_eq!(text, "slow");
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let missing = Cli::try_parse_from(["margin", "suggest", "page.json", "--tool", "t"]);
        assert!(missing.is_err());
    }

    #[test]
    fn test_list_filters_are_optional() {
        let cli = parse(&["ls", "42"]);
        match cli.command {
            Commands::List {
                exposition,
                weave,
                tool,
            } => {
                assert_eq!(exposition, "42");
                assert!(weave.is_none());
                assert!(tool.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = parse(&["list", "42", "--weave", "7", "--tool", "t"]);
        assert!(matches!(
            cli.command,
            Commands::List { weave: Some(ref w), tool: Some(ref t), .. } if w == "7" && t == "t"
        ));
    }

    #[test]
    fn test_delete_takes_four_positionals() {
        let cli = parse(&["delete", "1", "2", "t", "abc"]);
        assert!(matches!(
            cli.command,
            Commands::Delete { ref suggestion_id, .. } if suggestion_id == "abc"
        ));
        assert!(Cli::try_parse_from(["margin", "delete", "1", "2", "t"]).is_err());
    }

    #[test]
    fn test_import_into_and_export_output() {
        let cli = parse(&["import", "doc.json", "--into", "9"]);
        assert!(matches!(
            cli.command,
            Commands::Import { into: Some(ref e), .. } if e == "9"
        ));

        let cli = parse(&["export", "9", "-o", "out.json"]);
        assert!(matches!(
            cli.command,
            Commands::Export { output: Some(ref p), .. } if p == &PathBuf::from("out.json")
        ));
    }

    #[test]
    fn test_config_actions() {
        assert!(matches!(
            parse(&["config"]).command,
            Commands::Config { action: None }
        ));
        assert!(matches!(
            parse(&["config", "set", "highlight_class", "note"]).command,
            Commands::Config {
                action: Some(ConfigCommands::Set { .. })
            }
        ));
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Cli::try_parse_from(["margin"]).is_err());
    }
}
