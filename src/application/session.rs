//! # Analysis Session
//!
//! プロセス内で保持する最新の解析結果

use std::collections::HashMap;

use crate::domain::entities::batch_run::{BatchOutcome, BatchRun};
use crate::domain::entities::dataset::SlugTestDataset;
use crate::domain::entities::fit_result::FitResult;
use crate::domain::services::selection::SelectionService;
use crate::domain::services::slug_models::AnalysisOptions;

/// 解析セッション
///
/// データセットIDごとに最新の結果を1つだけ持つ。
/// 入力が変わった後の古い結果は返さない。
#[derive(Debug, Default)]
pub struct AnalysisSession {
    fits: HashMap<String, FitResult>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// バッチ実行の結果を取り込む
    ///
    /// 成功した結果は同じIDの以前の結果を置き換え、失敗したIDの結果は削除する
    pub fn record(&mut self, run: &BatchRun) {
        for entry in run.entries() {
            match &entry.outcome {
                BatchOutcome::Fitted(fit) => {
                    self.fits.insert(entry.dataset_id.clone(), fit.clone());
                }
                BatchOutcome::Failed(_) => {
                    self.fits.remove(&entry.dataset_id);
                }
            }
        }
    }

    /// データセットの現在の入力と解析オプションに対応する結果
    pub fn current_fit(&self, dataset: &SlugTestDataset, options: &AnalysisOptions) -> Option<&FitResult> {
        self.fits
            .get(&dataset.id)
            .filter(|fit| fit.is_current_for(dataset, options))
    }

    /// 保存済みの結果が入力と一致しなくなったデータセットID
    pub fn stale_ids(&self, datasets: &[SlugTestDataset], options: &AnalysisOptions) -> Vec<String> {
        SelectionService::stale_ids(&self.fits, datasets, options)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fits.is_empty()
    }
}
