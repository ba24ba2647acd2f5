use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "debtbomb")]
#[command(version, about = "Time-bound technical debt that explodes on schedule", long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every debt bomb, ordered by expiry date
    List(ListArgs),

    /// Fail when any debt bomb has expired
    Check(CheckArgs),

    /// Aggregate statistics by owner, folder, reason and urgency
    Report(ReportArgs),

    /// Open, keep and close tickets and send notifications
    Notify(NotifyArgs),
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only show expired items
    #[arg(long)]
    pub expired: bool,

    /// Only show items expired or expiring within a window (e.g., "14d", "2w", "3m")
    #[arg(long, conflicts_with = "expired")]
    pub expiring_within: Option<String>,

    /// Only show items whose owner contains this text
    #[arg(long)]
    pub owner: Option<String>,

    /// Add git blame author and age to each item
    #[arg(long)]
    pub blame: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    pub format: OutputFormat,

    /// Output file (if not specified, writes to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Also list items expiring within this many days
    #[arg(long)]
    pub warn_in_days: Option<i64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    pub format: OutputFormat,

    /// Output file (if not specified, writes to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Only process expired items (no warnings)
    #[arg(long)]
    pub expired: bool,

    /// Warn for items expiring within this many days (0 = any future date)
    #[arg(long, default_value_t = 0)]
    pub expire_in_days: i64,

    /// Path to custom config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl NotifyArgs {
    pub fn warn_within_days(&self) -> Option<i64> {
        (self.expire_in_days > 0).then_some(self.expire_in_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Formatted table output for terminal
    Terminal,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let cli = Cli::parse_from(["debtbomb", "list", "src", "--expired", "-f", "json", "-v"]);
        assert!(cli.verbose);
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.path, PathBuf::from("src"));
        assert!(args.expired);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_expired_conflicts_with_window() {
        let result = Cli::try_parse_from(["debtbomb", "list", "--expired", "--expiring-within", "2w"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_notify_horizon() {
        let cli = Cli::parse_from(["debtbomb", "notify", "--expire-in-days", "7"]);
        let Commands::Notify(args) = cli.command else {
            panic!("expected notify");
        };
        assert_eq!(args.warn_within_days(), Some(7));
        assert_eq!(args.path, PathBuf::from("."));

        let cli = Cli::parse_from(["debtbomb", "notify"]);
        let Commands::Notify(args) = cli.command else {
            panic!("expected notify");
        };
        assert_eq!(args.warn_within_days(), None);
    }
}
