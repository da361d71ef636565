//! # Discover Datasets Use Case
//!
//! 試験データファイル発見ユースケース

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::repositories::dataset_repository::DatasetRepository;

/// 試験データファイル発見ユースケース
///
/// 指定されたディレクトリから試験データファイルを発見する
pub struct DiscoverDatasetsUseCase<R: DatasetRepository> {
    dataset_repository: Arc<R>,
}

impl<R: DatasetRepository> DiscoverDatasetsUseCase<R> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `dataset_repository` - データセットリポジトリ
    pub fn new(dataset_repository: Arc<R>) -> Self {
        Self { dataset_repository }
    }

    /// 試験データファイルを発見する
    ///
    /// # Arguments
    ///
    /// * `data_dir` - データディレクトリのパス
    ///
    /// # Returns
    ///
    /// 発見されたファイルのパスのリスト
    ///
    /// # Errors
    ///
    /// ディレクトリの読み取りに失敗した場合にエラーを返す
    pub async fn execute(&self, data_dir: &str) -> Result<Vec<PathBuf>> {
        self.dataset_repository.discover_data_files(data_dir).await
    }
}
