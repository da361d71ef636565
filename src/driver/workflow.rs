//! Workflow Orchestration
//!
//! ワークフローのオーケストレーション

use anyhow::Result;
use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::adapter::config::Config;
use crate::adapter::repositories::csv_dataset_repository::CsvDatasetRepository;
use crate::adapter::repositories::csv_result_repository::CsvResultRepository;
use crate::application::dto::analysis_config::AnalysisConfig;
use crate::application::session::AnalysisSession;
use crate::application::use_cases::discover_datasets::DiscoverDatasetsUseCase;
use crate::application::use_cases::load_datasets::LoadDatasetsUseCase;
use crate::application::use_cases::run_batch::{BatchReport, RunBatchUseCase};
use crate::domain::entities::batch_run::BatchOutcome;
use crate::domain::entities::dataset::SlugTestDataset;
use crate::domain::services::slug_models::AnalysisOptions;

use super::cli::Args;

/// 設定ファイルとコマンドライン引数から解析設定を解決する
///
/// コマンドライン引数が設定ファイルの値より優先される
pub fn resolve_config(config: &Config, args: &Args) -> (Option<String>, AnalysisConfig) {
    let batch_file = args.batch.clone().or_else(|| config.batch_file.clone());

    let mut options = config.analysis_options();
    options.extract_recovery |= args.extract_recovery;

    let analysis = AnalysisConfig::new(
        args.data_dir.clone().unwrap_or_else(|| config.data_dir.clone()),
        args.output.clone().unwrap_or_else(|| config.output_dir.clone()),
        args.method.unwrap_or(config.method),
        config.length_unit,
        config.time_unit,
        options,
    )
    .with_columns(config.time_column.clone(), config.head_column.clone())
    .with_selection(args.select.clone())
    .with_dry_run(args.dry_run);

    (batch_file, analysis)
}

/// Slug Analysis Workflow
pub struct SlugAnalysisWorkflow {
    config: Config,
    discover_use_case: Arc<DiscoverDatasetsUseCase<CsvDatasetRepository>>,
    load_use_case: Arc<LoadDatasetsUseCase<CsvDatasetRepository>>,
    run_use_case: Arc<RunBatchUseCase<CsvResultRepository>>,
    session: AnalysisSession,
}

impl SlugAnalysisWorkflow {
    /// Create a new workflow instance with dependency injection
    pub fn new(config: Config) -> Self {
        // Repository implementations
        let dataset_repo = Arc::new(CsvDatasetRepository::new());
        let result_repo = Arc::new(CsvResultRepository::new());

        // Use Cases construction
        let discover_use_case = Arc::new(DiscoverDatasetsUseCase::new(dataset_repo.clone()));
        let load_use_case = Arc::new(LoadDatasetsUseCase::new(dataset_repo));
        let run_use_case = Arc::new(RunBatchUseCase::new(result_repo));

        Self {
            config,
            discover_use_case,
            load_use_case,
            run_use_case,
            session: AnalysisSession::new(),
        }
    }

    /// 直近の解析結果
    pub fn session(&self) -> &AnalysisSession {
        &self.session
    }

    /// Execute the analysis workflow
    ///
    /// バッチ定義ファイルが無い場合はデータファイルの一覧を表示して終了する
    pub async fn execute(&mut self, args: Args) -> Result<Option<BatchReport>> {
        info!("Starting slug test analysis...");
        info!("Dry run: {}", args.dry_run);

        let (batch_file, analysis) = resolve_config(&self.config, &args);

        println!("✓ Using configuration:");
        println!("  Method: {}", analysis.method);
        println!("  Data directory: {}", analysis.data_dir);
        println!("  Output directory: {}", analysis.output_dir);
        println!("  Units: {} / {}", analysis.length_unit, analysis.time_unit);

        let Some(batch_file) = batch_file else {
            let files = self.discover_use_case.execute(&analysis.data_dir).await?;
            println!("⚠ No batch file given (use --batch or set batch_file in the config)");
            println!("  Found {} data files in {}:", files.len(), analysis.data_dir);
            for file in &files {
                println!("    - {}", file.display());
            }
            return Ok(None);
        };

        // Load datasets using Use Case
        let loads = self
            .load_use_case
            .execute(Path::new(&batch_file), &analysis)
            .await?;
        println!("✓ Loaded {} test definitions from {}", loads.len(), batch_file);

        for load in &loads {
            if let Err(e) = &load.result {
                println!("⚠ {}: {}", load.dataset_id, e);
            }
        }

        let datasets: Vec<SlugTestDataset> = loads
            .iter()
            .filter_map(|load| load.result.as_ref().ok().cloned())
            .collect();

        // Analyse using Use Case
        let report = self.run_use_case.execute(loads, &analysis).await?;
        let run = &report.run;
        println!(
            "✓ Analysed {} datasets ({} fitted, {} failed)",
            run.len(),
            run.success_count(),
            run.failure_count()
        );

        self.session.record(run);
        print_result_table(&report, &datasets, &self.session, &analysis.options);

        match &report.saved {
            Some(saved) => {
                println!("✓ Saved {} rows to {}", saved.rows_written, saved.table_path.display());
                println!("✓ Saved batch details to {}", saved.run_path.display());
            }
            None => println!("✓ Dry-run mode (results not saved)"),
        }

        println!("✓ Analysis complete!");

        Ok(Some(report))
    }
}

fn print_result_table(
    report: &BatchReport,
    datasets: &[SlugTestDataset],
    session: &AnalysisSession,
    options: &AnalysisOptions,
) {
    println!(
        "  {:<16} {:<12} {:>12} {:>12} {:>8}  {}",
        "Test ID", "Method", "K", "T", "R²", "Quality"
    );

    for entry in report.run.entries() {
        let current = datasets
            .iter()
            .find(|ds| ds.id == entry.dataset_id)
            .and_then(|ds| session.current_fit(ds, options));

        match (&entry.outcome, current) {
            (BatchOutcome::Fitted(_), Some(fit)) => println!(
                "  {:<16} {:<12} {:>12.4e} {:>12.4e} {:>8.4}  {} [{}]",
                entry.dataset_id,
                fit.method.as_str(),
                fit.parameters.hydraulic_conductivity,
                fit.parameters.transmissivity,
                fit.statistics.r_squared,
                fit.quality,
                fit.conductivity_unit()
            ),
            (BatchOutcome::Fitted(_), None) => {
                println!("  {:<16} (result is out of date)", entry.dataset_id)
            }
            (BatchOutcome::Failed(e), _) => {
                println!("  {:<16} ✗ {} ({})", entry.dataset_id, e, e.kind())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::domain::entities::dataset::SlugMethod;

    #[test]
    fn test_resolve_config_defaults() {
        let config = Config::default();
        let args = Args::parse_from(["slugfit"]);

        let (batch_file, analysis) = resolve_config(&config, &args);

        assert!(batch_file.is_none());
        assert_eq!(analysis.data_dir, ".");
        assert_eq!(analysis.output_dir, "./output");
        assert_eq!(analysis.method, SlugMethod::BouwerRice);
        assert!(!analysis.options.extract_recovery);
    }

    #[test]
    fn test_resolve_config_args_override() {
        let config = Config {
            batch_file: Some("from_config.csv".to_string()),
            data_dir: "config_data".to_string(),
            method: SlugMethod::Butler,
            time_column: "Elapsed".to_string(),
            ..Config::default()
        };
        let args = Args::parse_from([
            "slugfit",
            "--batch",
            "from_args.csv",
            "--method",
            "hvorslev",
            "--extract-recovery",
            "--select",
            "MW-1",
            "--dry-run",
        ]);

        let (batch_file, analysis) = resolve_config(&config, &args);

        assert_eq!(batch_file.as_deref(), Some("from_args.csv"));
        assert_eq!(analysis.data_dir, "config_data");
        assert_eq!(analysis.method, SlugMethod::Hvorslev);
        assert_eq!(analysis.time_column, "Elapsed");
        assert!(analysis.options.extract_recovery);
        assert_eq!(analysis.selected_ids, vec!["MW-1"]);
        assert!(analysis.dry_run);
    }

    #[test]
    fn test_resolve_config_uses_config_batch_file() {
        let config = Config {
            batch_file: Some("batch.csv".to_string()),
            ..Config::default()
        };
        let (batch_file, _) = resolve_config(&config, &Args::parse_from(["slugfit"]));
        assert_eq!(batch_file.as_deref(), Some("batch.csv"));
    }
}
