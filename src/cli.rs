//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "feedhits")]
#[command(author, version, about = "Blocklist feed normalization and per-IP hit aggregation")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "/etc/feedhits/config.yaml", global = true)]
    pub config: PathBuf,

    /// Quiet mode (for cron/systemd timer)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan all feeds and write the per-IP aggregation as JSON
    Run {
        /// Feed directory (overrides feeds_dir from config)
        #[arg(long)]
        feeds_dir: Option<PathBuf>,

        /// Output file (overrides output from config, "-" for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Classify a token and tell whether it would be accepted
    Check {
        /// IP address or CIDR network
        token: String,
    },

    /// List the usable hosts of a CIDR network
    Expand {
        /// CIDR network, e.g. 203.0.113.0/30
        network: String,

        /// Print at most this many hosts
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show version
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::parse_from([
            "feedhits",
            "run",
            "--feeds-dir",
            "/srv/feeds",
            "-o",
            "hits.json",
        ]);
        match cli.command {
            Commands::Run { feeds_dir, output } => {
                assert_eq!(feeds_dir, Some(PathBuf::from("/srv/feeds")));
                assert_eq!(output, Some(PathBuf::from("hits.json")));
            }
            _ => panic!("expected run"),
        }
        assert_eq!(cli.config, PathBuf::from("/etc/feedhits/config.yaml"));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["feedhits", "check", "8.8.8.8", "-v", "-c", "/tmp/c.yaml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("/tmp/c.yaml"));
    }

    #[test]
    fn test_parse_expand_limit() {
        let cli = Cli::parse_from(["feedhits", "expand", "8.8.8.0/24", "--limit", "5"]);
        match cli.command {
            Commands::Expand { network, limit } => {
                assert_eq!(network, "8.8.8.0/24");
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected expand"),
        }
    }
}
