use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// Config file to use instead of `<root>/.dirtrack.yaml`
    #[clap(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print every directory tracked under the root
    List { root: PathBuf },
    /// Print whether a root-relative path is a tracked directory
    Contains { root: PathBuf, path: String },
    /// Print the listing, then the directories created and removed over time
    Watch { root: PathBuf },
    /// Print the target relative to the base, resolving symlinks on the way
    Relsym { base: PathBuf, target: PathBuf },
}

impl Command {
    /// The tracked root, if the command watches one.
    pub fn root(&self) -> Option<&PathBuf> {
        match self {
            Command::List { root } | Command::Contains { root, .. } | Command::Watch { root } => {
                Some(root)
            }
            Command::Relsym { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dirtrack",
            "contains",
            "/srv",
            "/a/b",
            "--log-level",
            "debug",
            "--config",
            "custom.yaml",
        ])
        .unwrap();

        assert!(matches!(cli.log_level, LogLevel::Debug));
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        assert!(matches!(
            cli.command,
            Command::Contains { ref root, ref path } if root == &PathBuf::from("/srv") && path == "/a/b"
        ));
    }

    #[test]
    fn cli_relsym_has_no_root() {
        let cli = Cli::try_parse_from(["dirtrack", "relsym", "a", "a/b"]).unwrap();
        assert!(matches!(cli.log_level, LogLevel::Warn));
        assert_eq!(cli.command.root(), None);
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["dirtrack"]).is_err());
    }
}
