//! CSV Result Repository Implementation
//!
//! ResultRepositoryのファイル実装（パラメータ一覧をCSV、バッチ全体をJSONで出力）

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::entities::batch_run::{BatchEntry, BatchOutcome, BatchRun};
use crate::domain::repositories::result_repository::{ResultRepository, SaveResult};

pub const PARAMETERS_FILE: &str = "estimated_parameters.csv";
pub const RUN_FILE: &str = "batch_run.json";

/// ファイルベースの結果リポジトリ
pub struct CsvResultRepository;

/// パラメータ一覧の1行（CSV出力用の内部表現）
#[derive(Debug, Serialize)]
struct ParameterRow<'a> {
    test_id: &'a str,
    status: &'static str,
    method: Option<&'static str>,
    hydraulic_conductivity: Option<f64>,
    transmissivity: Option<f64>,
    storativity: Option<f64>,
    r_squared: Option<f64>,
    rmse: Option<f64>,
    slope: Option<f64>,
    intercept: Option<f64>,
    num_points: Option<usize>,
    quality: Option<String>,
    conductivity_unit: Option<String>,
    error: Option<String>,
}

impl<'a> From<&'a BatchEntry> for ParameterRow<'a> {
    fn from(entry: &'a BatchEntry) -> Self {
        match &entry.outcome {
            BatchOutcome::Fitted(fit) => ParameterRow {
                test_id: &entry.dataset_id,
                status: "fitted",
                method: Some(fit.method.as_str()),
                hydraulic_conductivity: Some(fit.parameters.hydraulic_conductivity),
                transmissivity: Some(fit.parameters.transmissivity),
                storativity: fit.parameters.storativity,
                r_squared: Some(fit.statistics.r_squared),
                rmse: Some(fit.statistics.rmse),
                slope: Some(fit.statistics.slope),
                intercept: Some(fit.statistics.intercept),
                num_points: Some(fit.statistics.num_points),
                quality: Some(fit.quality.to_string()),
                conductivity_unit: Some(fit.conductivity_unit()),
                error: None,
            },
            BatchOutcome::Failed(err) => ParameterRow {
                test_id: &entry.dataset_id,
                status: "failed",
                method: None,
                hydraulic_conductivity: None,
                transmissivity: None,
                storativity: None,
                r_squared: None,
                rmse: None,
                slope: None,
                intercept: None,
                num_points: None,
                quality: None,
                conductivity_unit: None,
                error: Some(err.to_string()),
            },
        }
    }
}

impl CsvResultRepository {
    /// 新しいリポジトリを作成
    pub fn new() -> Self {
        Self
    }

    /// 結果をファイルに保存する（同期処理）
    fn save_sync(run: &BatchRun, output_dir: &Path) -> Result<SaveResult> {
        fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;

        let table_path = output_dir.join(PARAMETERS_FILE);
        let mut writer = csv::Writer::from_path(&table_path)
            .with_context(|| format!("Failed to create {}", table_path.display()))?;
        for entry in run.entries() {
            writer
                .serialize(ParameterRow::from(entry))
                .context("Failed to write parameter row")?;
        }
        writer.flush().context("Failed to flush parameter table")?;

        let run_path = output_dir.join(RUN_FILE);
        let json = serde_json::to_string_pretty(run).context("Failed to serialize batch run")?;
        fs::write(&run_path, json)
            .with_context(|| format!("Failed to write {}", run_path.display()))?;

        info!(
            "Saved {} results to {}",
            run.len(),
            output_dir.display()
        );

        Ok(SaveResult::new(table_path, run_path, run.len()))
    }
}

#[async_trait]
impl ResultRepository for CsvResultRepository {
    async fn save_run(&self, run: &BatchRun, output_dir: &str) -> Result<SaveResult> {
        let output_dir = PathBuf::from(shellexpand::tilde(output_dir).as_ref());
        let run = run.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&run, &output_dir))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }
}

impl Default for CsvResultRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::domain::entities::dataset::fixtures::dataset;
    use crate::domain::entities::dataset::SlugMethod;
    use crate::domain::entities::fit_result::fixtures::fit_for;
    use crate::domain::errors::{DatasetError, ValidationError};

    fn create_test_run() -> BatchRun {
        let mut run = BatchRun::new("batch-001".to_string(), Utc::now(), "test-host".to_string());
        run.push(BatchEntry::fitted(fit_for(&dataset("MW-1", SlugMethod::BouwerRice), 2.5e-5)));
        run.push(BatchEntry::failed(
            "MW-2",
            DatasetError::Validation(ValidationError::EmptyDataset),
        ));
        run
    }

    #[test]
    fn test_save_creates_files() {
        let temp_dir = TempDir::new().unwrap();
        let output_dir = temp_dir.path().join("nested").join("output");

        let saved = CsvResultRepository::save_sync(&create_test_run(), &output_dir).unwrap();

        assert_eq!(saved.rows_written, 2);
        assert!(saved.table_path.exists());
        assert!(saved.run_path.exists());
    }

    #[test]
    fn test_parameter_table_contents() {
        let temp_dir = TempDir::new().unwrap();
        let saved = CsvResultRepository::save_sync(&create_test_run(), temp_dir.path()).unwrap();

        let mut reader = csv::Reader::from_path(&saved.table_path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "test_id");
        assert_eq!(&headers[3], "hydraulic_conductivity");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);

        assert_eq!(&rows[0][0], "MW-1");
        assert_eq!(&rows[0][1], "fitted");
        assert_eq!(&rows[0][2], "bouwer-rice");
        assert_eq!(rows[0][3].parse::<f64>().unwrap(), 2.5e-5);
        assert_eq!(&rows[0][11], "good");
        assert_eq!(&rows[0][12], "m/s");

        assert_eq!(&rows[1][0], "MW-2");
        assert_eq!(&rows[1][1], "failed");
        assert_eq!(&rows[1][3], "");
        assert_eq!(&rows[1][13], "dataset is empty");
    }

    #[test]
    fn test_run_json_contents() {
        let temp_dir = TempDir::new().unwrap();
        let saved = CsvResultRepository::save_sync(&create_test_run(), temp_dir.path()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(saved.run_path).unwrap()).unwrap();
        assert_eq!(json["batch_id"], "batch-001");
        assert_eq!(json["hostname"], "test-host");
        assert_eq!(json["entries"].as_array().unwrap().len(), 2);
        assert_eq!(json["entries"][1]["outcome"]["kind"], "empty_dataset");
    }

    #[tokio::test]
    async fn test_save_run_async() {
        let temp_dir = TempDir::new().unwrap();
        let repo = CsvResultRepository::new();

        let saved = repo
            .save_run(&create_test_run(), temp_dir.path().to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(saved.table_path, temp_dir.path().join(PARAMETERS_FILE));
    }
}
