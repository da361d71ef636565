//! # Selection Service
//!
//! 解析対象の選択と古くなった結果の検出

use std::collections::{HashMap, HashSet};

use crate::domain::entities::batch_run::DatasetLoad;
use crate::domain::entities::dataset::SlugTestDataset;
use crate::domain::entities::fit_result::FitResult;
use crate::domain::services::slug_models::AnalysisOptions;

/// 選択サービス
///
/// どのデータセットを解析し、どの結果がまだ有効かを決めるビジネスロジック
pub struct SelectionService;

impl SelectionService {
    /// 選択されたIDのデータセットだけを残す
    ///
    /// # Arguments
    ///
    /// * `loads` - 読み込み結果（失敗したものを含む）
    /// * `selected_ids` - 解析対象の試験ID
    ///
    /// # Returns
    ///
    /// 入力順を保ったまま絞り込んだリスト。`selected_ids` が空なら全件
    pub fn filter_selected(loads: Vec<DatasetLoad>, selected_ids: &HashSet<String>) -> Vec<DatasetLoad> {
        if selected_ids.is_empty() {
            return loads;
        }

        loads
            .into_iter()
            .filter(|load| selected_ids.contains(&load.dataset_id))
            .collect()
    }

    /// 保存済みの結果が入力と一致しなくなったデータセットIDを返す
    ///
    /// # Arguments
    ///
    /// * `fits` - データセットIDごとの最新の結果
    /// * `datasets` - 現在の入力
    /// * `options` - 現在の解析オプション
    pub fn stale_ids(
        fits: &HashMap<String, FitResult>,
        datasets: &[SlugTestDataset],
        options: &AnalysisOptions,
    ) -> Vec<String> {
        datasets
            .iter()
            .filter(|ds| fits.get(&ds.id).is_some_and(|fit| !fit.is_current_for(ds, options)))
            .map(|ds| ds.id.clone())
            .collect()
    }

    /// 読み込み結果のIDリストを抽出
    pub fn extract_ids(loads: &[DatasetLoad]) -> Vec<String> {
        loads.iter().map(|load| load.dataset_id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::dataset::fixtures::dataset;
    use crate::domain::entities::dataset::SlugMethod;
    use crate::domain::entities::fit_result::fixtures::fit_for;
    use crate::domain::errors::{DatasetError, ValidationError};

    fn create_test_loads() -> Vec<DatasetLoad> {
        vec![
            DatasetLoad::loaded(dataset("t1", SlugMethod::Hvorslev)),
            DatasetLoad::failed("t2", DatasetError::Validation(ValidationError::EmptyDataset)),
            DatasetLoad::loaded(dataset("t3", SlugMethod::Hvorslev)),
        ]
    }

    #[test]
    fn test_filter_selected_empty_selection_keeps_all() {
        let filtered = SelectionService::filter_selected(create_test_loads(), &HashSet::new());
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn test_filter_selected_keeps_order() {
        let selected: HashSet<String> = ["t3", "t2"].iter().map(|s| s.to_string()).collect();
        let filtered = SelectionService::filter_selected(create_test_loads(), &selected);
        assert_eq!(SelectionService::extract_ids(&filtered), vec!["t2", "t3"]);
    }

    #[test]
    fn test_filter_selected_unknown_id() {
        let selected: HashSet<String> = ["nope".to_string()].into_iter().collect();
        let filtered = SelectionService::filter_selected(create_test_loads(), &selected);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_stale_ids() {
        let ds1 = dataset("t1", SlugMethod::Hvorslev);
        let ds2 = dataset("t2", SlugMethod::Hvorslev);
        let ds3 = dataset("t3", SlugMethod::Hvorslev);

        let mut fits = HashMap::new();
        fits.insert("t1".to_string(), fit_for(&ds1, 1e-4));
        fits.insert("t2".to_string(), fit_for(&ds2, 1e-4));

        let mut edited = ds2.clone();
        edited.aquifer.anisotropy = 0.5;

        let stale = SelectionService::stale_ids(&fits, &[ds1, edited, ds3], &AnalysisOptions::default());
        assert_eq!(stale, vec!["t2"]);
    }
}
