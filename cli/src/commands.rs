//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for consilium
#[derive(Parser, Debug)]
#[command(name = "consilium")]
#[command(author, version, about = "Collaborative decisions and resource scheduling")]
#[command(long_about = r#"
consilium asks a panel of independent participants to vote on a decision and
reduces their votes to one recommendation, or matches scheduling requests to
capacity-limited resources.

Configuration files are loaded from (in priority order):
1. CONSILIUM_* environment variables (e.g. CONSILIUM_SCHEDULER__STRATEGY)
2. --config <path>       Explicit config file
3. ./consilium.toml      Project-level config
4. ~/.config/consilium/config.toml   Global config

Example:
  consilium decide diagnosis.json
  consilium -v schedule --strategy load_balanced bookings.json
  consilium show-config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one collaborative decision described by a JSON file
    Decide {
        /// Decision input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Override the voting policy
        #[arg(long, value_name = "POLICY")]
        policy: Option<String>,

        /// Override the overall timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Schedule the requests in a JSON file against the resource catalog
    Schedule {
        /// Scheduling input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Override the scheduling strategy
        #[arg(long, value_name = "STRATEGY")]
        strategy: Option<String>,

        /// Run one rebalancing sweep after matching
        #[arg(long)]
        rebalance: bool,
    },

    /// Show configuration sources, the effective configuration and any issues
    ShowConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decide() {
        let cli = Cli::parse_from(["consilium", "-vv", "decide", "in.json", "--policy", "majority"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Decide { input, policy, timeout } => {
                assert_eq!(input, PathBuf::from("in.json"));
                assert_eq!(policy.as_deref(), Some("majority"));
                assert!(timeout.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_schedule_with_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "consilium",
            "schedule",
            "bookings.json",
            "--rebalance",
            "--config",
            "custom.toml",
            "--pretty",
        ]);
        assert!(cli.pretty);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Command::Schedule { rebalance: true, .. }));
    }
}
