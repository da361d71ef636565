//! # BatchRun Value Object
//!
//! 1回のバッチ解析の結果（データセットごとの成功・失敗）

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::dataset::SlugTestDataset;
use super::fit_result::FitResult;
use crate::domain::errors::DatasetError;

/// データセット1件分の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Fitted(FitResult),
    Failed(DatasetError),
}

/// バッチ内のエントリ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub dataset_id: String,
    pub outcome: BatchOutcome,
}

impl BatchEntry {
    pub fn fitted(fit: FitResult) -> Self {
        Self {
            dataset_id: fit.dataset_id.clone(),
            outcome: BatchOutcome::Fitted(fit),
        }
    }

    pub fn failed(dataset_id: impl Into<String>, error: DatasetError) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            outcome: BatchOutcome::Failed(error),
        }
    }

    pub fn fit(&self) -> Option<&FitResult> {
        match &self.outcome {
            BatchOutcome::Fitted(fit) => Some(fit),
            BatchOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&DatasetError> {
        match &self.outcome {
            BatchOutcome::Fitted(_) => None,
            BatchOutcome::Failed(err) => Some(err),
        }
    }
}

/// 読み込み段階の結果（読み込みに失敗したデータセットもIDを保持する）
#[derive(Debug, Clone)]
pub struct DatasetLoad {
    pub dataset_id: String,
    pub result: Result<SlugTestDataset, DatasetError>,
}

impl DatasetLoad {
    pub fn loaded(dataset: SlugTestDataset) -> Self {
        Self {
            dataset_id: dataset.id.clone(),
            result: Ok(dataset),
        }
    }

    pub fn failed(dataset_id: impl Into<String>, error: DatasetError) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            result: Err(error),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.result.is_ok()
    }
}

/// バッチ実行
///
/// セッション中のみ保持される。エントリは入力順を保つ。
#[derive(Debug, Clone, Serialize)]
pub struct BatchRun {
    pub batch_id: String,
    pub started_at: DateTime<Utc>,
    pub hostname: String,
    entries: Vec<BatchEntry>,
}

impl BatchRun {
    /// 新しい空のバッチ実行を作成
    ///
    /// # Arguments
    ///
    /// * `batch_id` - バッチID
    /// * `started_at` - 開始時刻
    /// * `hostname` - 解析を実行したホスト名
    pub fn new(batch_id: String, started_at: DateTime<Utc>, hostname: String) -> Self {
        Self {
            batch_id,
            started_at,
            hostname,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: BatchEntry) {
        self.entries.push(entry);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// 成功した結果
    pub fn succeeded(&self) -> impl Iterator<Item = &FitResult> {
        self.entries.iter().filter_map(BatchEntry::fit)
    }

    /// 失敗したデータセット（ID, エラー）
    pub fn failed(&self) -> impl Iterator<Item = (&str, &DatasetError)> {
        self.entries
            .iter()
            .filter_map(|e| e.error().map(|err| (e.dataset_id.as_str(), err)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// 指定IDの結果を探す
    pub fn fit_for(&self, dataset_id: &str) -> Option<&FitResult> {
        self.entries
            .iter()
            .find(|e| e.dataset_id == dataset_id)
            .and_then(BatchEntry::fit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::dataset::fixtures::dataset;
    use crate::domain::entities::dataset::SlugMethod;
    use crate::domain::entities::fit_result::fixtures::fit_for;
    use crate::domain::errors::ValidationError;

    fn create_test_run() -> BatchRun {
        let mut run = BatchRun::new("batch-001".to_string(), Utc::now(), "test-host".to_string());
        run.push(BatchEntry::fitted(fit_for(&dataset("t1", SlugMethod::Hvorslev), 1e-4)));
        run.push(BatchEntry::failed(
            "t2",
            DatasetError::Validation(ValidationError::EmptyDataset),
        ));
        run.push(BatchEntry::fitted(fit_for(&dataset("t3", SlugMethod::Hvorslev), 2e-4)));
        run
    }

    #[test]
    fn test_batch_run_new() {
        let run = BatchRun::new("batch-001".to_string(), Utc::now(), "host".to_string());
        assert!(run.is_empty());
        assert_eq!(run.len(), 0);
        assert_eq!(run.success_count(), 0);
    }

    #[test]
    fn test_counts() {
        let run = create_test_run();
        assert_eq!(run.len(), 3);
        assert_eq!(run.success_count(), 2);
        assert_eq!(run.failure_count(), 1);
    }

    #[test]
    fn test_entries_keep_input_order() {
        let run = create_test_run();
        let ids: Vec<&str> = run.entries().iter().map(|e| e.dataset_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_failed_iter() {
        let run = create_test_run();
        let failed: Vec<_> = run.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "t2");
        assert_eq!(failed[0].1.kind(), "validation");
    }

    #[test]
    fn test_fit_for() {
        let run = create_test_run();
        assert_eq!(run.fit_for("t3").unwrap().parameters.hydraulic_conductivity, 2e-4);
        assert!(run.fit_for("t2").is_none());
        assert!(run.fit_for("missing").is_none());
    }

    #[test]
    fn test_serialization_tags_status() {
        let run = create_test_run();
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["batch_id"], "batch-001");
        assert_eq!(json["entries"][0]["outcome"]["status"], "fitted");
        assert_eq!(json["entries"][1]["outcome"]["status"], "failed");
        assert_eq!(json["entries"][1]["outcome"]["type"], "validation");
    }

    #[test]
    fn test_dataset_load() {
        let ok = DatasetLoad::loaded(dataset("t1", SlugMethod::Butler));
        assert_eq!(ok.dataset_id, "t1");
        assert!(ok.is_loaded());

        let err = DatasetLoad::failed("t2", DatasetError::Validation(ValidationError::EmptyDataset));
        assert_eq!(err.dataset_id, "t2");
        assert!(!err.is_loaded());
    }
}
