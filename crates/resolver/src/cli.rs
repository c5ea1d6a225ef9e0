//! Command line interface

use clap::{Parser, Subcommand, ValueEnum};
use config::SearchPath;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "superset-config", version, about = "Resolve the analytics deployment configuration")]
pub struct Cli {
    /// Directory probed for the override file; repeat to probe several in order.
    /// Must precede the subcommand.
    #[arg(long = "search-path")]
    pub search_path: Vec<PathBuf>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "json", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the resolved configuration
    Show {
        #[arg(long, value_enum, default_value = "yaml")]
        format: OutputFormat,
        /// Print secrets and connection passwords in clear text
        #[arg(long)]
        reveal_secrets: bool,
    },
    /// Validate the resolved configuration
    Check,
    /// Write an override file pre-filled with the defaults
    Example {
        /// Destination file
        #[arg(default_value = "superset_config_docker.yaml")]
        path: PathBuf,
        /// Replace the file if it already exists
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Cli {
    /// Search path from the flags, else from `env_value`, else the default
    pub fn search_path(&self, env_value: Option<OsString>) -> SearchPath {
        if !self.search_path.is_empty() {
            return SearchPath::new(self.search_path.iter().cloned());
        }
        match env_value {
            Some(list) if !list.is_empty() => SearchPath::parse(list),
            _ => SearchPath::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("superset-config").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_take_precedence_over_environment() {
        let cli = parse(&["--search-path", "/etc/a", "--search-path", "/etc/b", "check"]);
        let search_path = cli.search_path(Some(OsString::from("/ignored")));
        assert_eq!(search_path.dirs(), &[PathBuf::from("/etc/a"), PathBuf::from("/etc/b")]);
    }

    #[test]
    fn test_search_path_after_subcommand_is_rejected() {
        let result = Cli::try_parse_from(["superset-config", "--search-path", "/etc/a", "check", "--search-path", "/etc/b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_then_default() {
        let cli = parse(&["check"]);
        assert_eq!(
            cli.search_path(Some(OsString::from("/etc/superset"))).dirs(),
            &[PathBuf::from("/etc/superset")]
        );
        assert_eq!(cli.search_path(None), SearchPath::default());
        assert_eq!(cli.search_path(Some(OsString::new())), SearchPath::default());
    }

    #[test]
    fn test_show_options() {
        let cli = parse(&["show", "--format", "json", "--reveal-secrets"]);
        match cli.command {
            Command::Show { format, reveal_secrets } => {
                assert_eq!(format, OutputFormat::Json);
                assert!(reveal_secrets);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_example_default_path() {
        let cli = parse(&["example"]);
        assert!(matches!(
            cli.command,
            Command::Example { ref path, force: false } if path == &PathBuf::from("superset_config_docker.yaml")
        ));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let result = Cli::try_parse_from(["superset-config", "--log-format", "xml", "check"]);
        assert!(result.is_err());
    }
}
