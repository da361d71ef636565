//! # Run Batch Use Case
//!
//! バッチ解析ユースケース

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dto::analysis_config::AnalysisConfig;
use crate::domain::entities::batch_run::{BatchEntry, BatchRun, DatasetLoad};
use crate::domain::errors::DatasetError;
use crate::domain::repositories::result_repository::{ResultRepository, SaveResult};
use crate::domain::services::selection::SelectionService;
use crate::domain::services::slug_models::model_for;

/// バッチ解析の結果
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub run: BatchRun,
    /// 保存先（ドライランの場合は `None`）
    pub saved: Option<SaveResult>,
}

/// バッチ解析ユースケース
///
/// 各データセットを独立に解析する。1件の失敗がバッチ全体を止めることはない。
pub struct RunBatchUseCase<R: ResultRepository> {
    result_repository: Arc<R>,
}

impl<R: ResultRepository> RunBatchUseCase<R> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `result_repository` - 結果リポジトリ
    pub fn new(result_repository: Arc<R>) -> Self {
        Self { result_repository }
    }

    /// データセットを解析し、結果を保存する
    ///
    /// # Arguments
    ///
    /// * `loads` - 読み込み結果（失敗したものを含む）
    /// * `config` - 解析設定
    ///
    /// # Returns
    ///
    /// 入力1件につき1エントリを持つバッチ実行（入力順）
    ///
    /// # Errors
    ///
    /// 結果の保存に失敗した場合のみエラーを返す
    pub async fn execute(&self, loads: Vec<DatasetLoad>, config: &AnalysisConfig) -> Result<BatchReport> {
        let selected: HashSet<String> = config.selected_ids.iter().cloned().collect();
        let known: HashSet<String> = SelectionService::extract_ids(&loads).into_iter().collect();
        let mut unknown: Vec<&String> = selected.difference(&known).collect();
        unknown.sort();
        for id in unknown {
            warn!("Selected test {} is not in the batch file", id);
        }
        let loads = SelectionService::filter_selected(loads, &selected);

        let mut run = BatchRun::new(Uuid::new_v4().to_string(), Utc::now(), current_hostname());
        info!("Starting batch {} with {} datasets", run.batch_id, loads.len());

        for load in loads {
            let entry = match load.result {
                Ok(dataset) => {
                    let model = model_for(dataset.method);
                    match model.analyze(&dataset, &config.options) {
                        Ok(fit) => {
                            info!(
                                "{}: K = {:.3e} {} ({}, {})",
                                dataset.id,
                                fit.parameters.hydraulic_conductivity,
                                fit.conductivity_unit(),
                                fit.method,
                                fit.quality
                            );
                            BatchEntry::fitted(fit)
                        }
                        Err(e) => {
                            warn!("{}: analysis failed: {}", dataset.id, e);
                            BatchEntry::failed(dataset.id, DatasetError::Validation(e))
                        }
                    }
                }
                Err(e) => BatchEntry::failed(load.dataset_id, e),
            };
            run.push(entry);
        }

        if config.dry_run {
            info!("Dry run: results not saved");
            return Ok(BatchReport { run, saved: None });
        }

        let saved = self.result_repository.save_run(&run, &config.output_dir).await?;
        Ok(BatchReport {
            run,
            saved: Some(saved),
        })
    }
}

fn current_hostname() -> String {
    hostname::get()
        .unwrap_or_else(|_| "unknown".into())
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::application::dto::analysis_config::fixtures::config;
    use crate::domain::entities::batch_run::BatchOutcome;
    use crate::domain::entities::dataset::fixtures::{aquifer, dataset, geometry};
    use crate::domain::entities::dataset::{SlugMethod, SlugTestDataset};
    use crate::domain::entities::time_series::TimeSeries;
    use crate::domain::errors::ValidationError;
    use crate::domain::repositories::result_repository::MockResultRepository;

    fn saving_repository(times: usize) -> MockResultRepository {
        let mut mock = MockResultRepository::new();
        mock.expect_save_run().times(times).returning(|run, output_dir| {
            Ok(SaveResult::new(
                PathBuf::from(output_dir).join("estimated_parameters.csv"),
                PathBuf::from(output_dir).join("batch_run.json"),
                run.len(),
            ))
        });
        mock
    }

    fn create_loads() -> Vec<DatasetLoad> {
        let two_points = TimeSeries::from_pairs(&[(0.0, 1.0), (1.0, 0.5)]).unwrap();
        let short = SlugTestDataset::new(
            "short".to_string(),
            two_points,
            geometry(),
            aquifer(),
            SlugMethod::Hvorslev,
        )
        .unwrap();

        vec![
            DatasetLoad::loaded(dataset("t1", SlugMethod::BouwerRice)),
            DatasetLoad::failed(
                "broken",
                DatasetError::MalformedFile {
                    path: "broken.csv".to_string(),
                    line: 3,
                    reason: "bad".to_string(),
                },
            ),
            DatasetLoad::loaded(dataset("t2", SlugMethod::Hvorslev)),
            DatasetLoad::loaded(short),
            DatasetLoad::loaded(dataset("t3", SlugMethod::Butler)),
        ]
    }

    #[tokio::test]
    async fn test_run_batch_isolates_failures() {
        let use_case = RunBatchUseCase::new(Arc::new(saving_repository(1)));

        let report = use_case.execute(create_loads(), &config()).await.unwrap();
        let run = report.run;

        let ids: Vec<&str> = run.entries().iter().map(|e| e.dataset_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "broken", "t2", "short", "t3"]);
        assert_eq!(run.success_count(), 3);
        assert_eq!(run.failure_count(), 2);

        match &run.entries()[3].outcome {
            BatchOutcome::Failed(DatasetError::Validation(ValidationError::InsufficientPoints {
                required,
                actual,
                ..
            })) => {
                assert_eq!(*required, 3);
                assert_eq!(*actual, 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let saved = report.saved.unwrap();
        assert_eq!(saved.rows_written, 5);
        assert_eq!(saved.table_path, PathBuf::from("/output/estimated_parameters.csv"));
    }

    #[tokio::test]
    async fn test_run_batch_selection() {
        let use_case = RunBatchUseCase::new(Arc::new(saving_repository(1)));
        let config = config().with_selection(vec!["t2".to_string(), "broken".to_string()]);

        let report = use_case.execute(create_loads(), &config).await.unwrap();

        assert_eq!(report.run.len(), 2);
        assert!(report.run.fit_for("t2").is_some());
        assert!(report.run.fit_for("t1").is_none());
    }

    #[tokio::test]
    async fn test_run_batch_selection_ignores_unknown_ids() {
        let use_case = RunBatchUseCase::new(Arc::new(saving_repository(1)));
        let config = config().with_selection(vec!["t2".to_string(), "not-in-batch".to_string()]);

        let report = use_case.execute(create_loads(), &config).await.unwrap();

        let ids: Vec<&str> = report.run.entries().iter().map(|e| e.dataset_id.as_str()).collect();
        assert_eq!(ids, vec!["t2"]);
    }

    #[tokio::test]
    async fn test_run_batch_dry_run_does_not_save() {
        let use_case = RunBatchUseCase::new(Arc::new(saving_repository(0)));
        let config = config().with_dry_run(true);

        let report = use_case.execute(create_loads(), &config).await.unwrap();

        assert!(report.saved.is_none());
        assert_eq!(report.run.len(), 5);
    }

    #[tokio::test]
    async fn test_run_batch_empty() {
        let use_case = RunBatchUseCase::new(Arc::new(saving_repository(1)));

        let report = use_case.execute(vec![], &config()).await.unwrap();

        assert!(report.run.is_empty());
        assert_eq!(report.saved.unwrap().rows_written, 0);
    }

    #[tokio::test]
    async fn test_run_batch_save_failure() {
        let mut mock = MockResultRepository::new();
        mock.expect_save_run()
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));
        let use_case = RunBatchUseCase::new(Arc::new(mock));

        let result = use_case.execute(create_loads(), &config()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_batch_is_repeatable() {
        let use_case = RunBatchUseCase::new(Arc::new(saving_repository(2)));

        let first = use_case.execute(create_loads(), &config()).await.unwrap().run;
        let second = use_case.execute(create_loads(), &config()).await.unwrap().run;

        assert_ne!(first.batch_id, second.batch_id);
        assert_eq!(first.entries(), second.entries());
    }
}
