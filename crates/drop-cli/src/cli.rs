//! Command-line definition

use crate::dispatch::{Channel, Operation};
use crate::transfer::Selection;
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Parsed command line
#[derive(Debug, Parser)]
#[command(
    name = "drop",
    version,
    about = "Keep small notes and secrets under short keys",
    long_about = None,
    disable_help_subcommand = true,
    after_help = r#"If only KEY is given, the matching value is printed to stdout.
With no arguments, the list of keys is printed.

For xadd and xprint, the trailing 'c' variants use the CLIPBOARD selection;
otherwise PRIMARY is used."#
)]
pub struct Cli {
    /// Key to print
    #[arg(value_name = "KEY")]
    pub key: Option<String>,

    /// Database file (default: first drop.* file in the data directory)
    #[arg(long, env = "DROP_DB", global = true, value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to this file (rotated daily)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Command to run; without one, KEY is printed or the keys are listed
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Named commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all keys
    #[command(visible_alias = "l")]
    List,
    /// List all keys with their values
    #[command(name = "fulllist", visible_alias = "f")]
    FullList,
    /// Add an item at KEY
    #[command(visible_alias = "a")]
    Add {
        /// Key to add; text after the first space is ignored
        key: String,
    },
    /// Delete the item at KEY
    #[command(visible_alias = "d")]
    Delete {
        /// Key to delete
        key: String,
    },
    /// Add an item at KEY from the PRIMARY selection
    #[command(name = "xadd", visible_alias = "xa")]
    XAdd {
        /// Key to add
        key: String,
    },
    /// Add an item at KEY from the CLIPBOARD selection
    #[command(name = "xaddc", visible_alias = "xac")]
    XAddClipboard {
        /// Key to add
        key: String,
    },
    /// Put the item at KEY into the PRIMARY selection
    #[command(name = "xprint", visible_alias = "xp")]
    XPrint {
        /// Key to print
        key: String,
    },
    /// Put the item at KEY into the CLIPBOARD selection
    #[command(name = "xprintc", visible_alias = "xpc")]
    XPrintClipboard {
        /// Key to print
        key: String,
    },
    /// Print this message
    #[command(visible_alias = "h")]
    Help,
}

impl Cli {
    /// Operation requested on the command line. `None` means help.
    pub fn operation(&self) -> Option<Operation> {
        let add = |key: &String, channel| Operation::Add {
            key: key.clone(),
            channel,
        };
        let print = |key: &String, channel| Operation::Print {
            key: Some(key.clone()),
            channel,
        };

        let op = match &self.command {
            None => match &self.key {
                Some(key) => print(key, Channel::Console),
                None => Operation::List,
            },
            Some(Command::List) => Operation::List,
            Some(Command::FullList) => Operation::FullList,
            Some(Command::Add { key }) => add(key, Channel::Console),
            Some(Command::Delete { key }) => Operation::Delete { key: key.clone() },
            Some(Command::XAdd { key }) => add(key, Channel::Selection(Selection::Primary)),
            Some(Command::XAddClipboard { key }) => {
                add(key, Channel::Selection(Selection::Clipboard))
            }
            Some(Command::XPrint { key }) => print(key, Channel::Selection(Selection::Primary)),
            Some(Command::XPrintClipboard { key }) => {
                print(key, Channel::Selection(Selection::Clipboard))
            }
            Some(Command::Help) => return None,
        };
        Some(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn op(args: &[&str]) -> Option<Operation> {
        Cli::try_parse_from(std::iter::once("drop").chain(args.iter().copied()))
            .unwrap()
            .operation()
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments_lists() {
        assert_eq!(op(&[]), Some(Operation::List));
        assert_eq!(op(&["l"]), Some(Operation::List));
        assert_eq!(op(&["f"]), Some(Operation::FullList));
        assert_eq!(op(&["fulllist"]), Some(Operation::FullList));
    }

    #[test]
    fn test_bare_key_prints() {
        assert_eq!(
            op(&["github"]),
            Some(Operation::Print {
                key: Some("github".to_string()),
                channel: Channel::Console
            })
        );
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            op(&["a", "k"]),
            Some(Operation::Add {
                key: "k".to_string(),
                channel: Channel::Console
            })
        );
        assert_eq!(op(&["d", "k"]), Some(Operation::Delete { key: "k".to_string() }));
        assert_eq!(
            op(&["xac", "k"]),
            Some(Operation::Add {
                key: "k".to_string(),
                channel: Channel::Selection(Selection::Clipboard)
            })
        );
        assert_eq!(
            op(&["xprint", "k"]),
            Some(Operation::Print {
                key: Some("k".to_string()),
                channel: Channel::Selection(Selection::Primary)
            })
        );
        assert_eq!(op(&["h"]), None);
    }

    #[test]
    fn test_add_requires_key() {
        assert!(Cli::try_parse_from(["drop", "add"]).is_err());
        assert!(Cli::try_parse_from(["drop", "delete"]).is_err());
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from(["drop", "-vv", "--file", "/tmp/x.tcb", "list"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.file, Some(PathBuf::from("/tmp/x.tcb")));
    }
}
