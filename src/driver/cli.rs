//! CLI Argument Parsing
//!
//! CLIの引数解析

use clap::Parser;

use crate::adapter::config::DEFAULT_CONFIG_PATH;
use crate::domain::entities::dataset::SlugMethod;

/// スラグ試験データから透水係数を一括推定するCLI
#[derive(Parser, Debug, Clone)]
#[command(name = "slugfit")]
#[command(about = "Estimate hydraulic conductivity from batches of slug tests", long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Batch definition file (CSV, one test per row or one field per row)
    #[arg(short, long)]
    pub batch: Option<String>,

    /// Directory containing the test data files
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Output directory for estimated parameters
    #[arg(short, long)]
    pub output: Option<String>,

    /// Solution method for tests that do not name one (bouwer-rice, hvorslev, butler)
    #[arg(short, long)]
    pub method: Option<SlugMethod>,

    /// Analyse only these test ids
    #[arg(long = "select", num_args = 1..)]
    pub select: Vec<String>,

    /// Isolate the recovery segment from raw level records
    #[arg(long)]
    pub extract_recovery: bool,

    /// Dry run mode - analyse but don't write results
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_config() {
        let args = Args::parse_from(["slugfit"]);
        assert_eq!(args.config, "./slugfit.json");
        assert!(args.batch.is_none());
        assert!(args.method.is_none());
        assert!(args.select.is_empty());
        assert!(!args.dry_run);
        assert!(!args.extract_recovery);
    }

    #[test]
    fn test_args_dry_run() {
        let args = Args::parse_from(["slugfit", "--dry-run"]);
        assert!(args.dry_run);
    }

    #[test]
    fn test_args_method() {
        let args = Args::parse_from(["slugfit", "--method", "hvorslev"]);
        assert_eq!(args.method, Some(SlugMethod::Hvorslev));

        let args = Args::parse_from(["slugfit", "-m", "bouwer_rice"]);
        assert_eq!(args.method, Some(SlugMethod::BouwerRice));
    }

    #[test]
    fn test_args_unknown_method() {
        assert!(Args::try_parse_from(["slugfit", "--method", "theis"]).is_err());
    }

    #[test]
    fn test_args_select_many() {
        let args = Args::parse_from(["slugfit", "--select", "MW-1", "MW-2", "--dry-run"]);
        assert_eq!(args.select, vec!["MW-1", "MW-2"]);
        assert!(args.dry_run);
    }

    #[test]
    fn test_args_paths() {
        let args = Args::parse_from([
            "slugfit",
            "-c",
            "/custom/slugfit.json",
            "-b",
            "batch.csv",
            "--data-dir",
            "data",
            "-o",
            "out",
        ]);
        assert_eq!(args.config, "/custom/slugfit.json");
        assert_eq!(args.batch.as_deref(), Some("batch.csv"));
        assert_eq!(args.data_dir.as_deref(), Some("data"));
        assert_eq!(args.output.as_deref(), Some("out"));
    }
}
