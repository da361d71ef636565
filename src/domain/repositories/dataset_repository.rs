//! # Dataset Repository Trait
//!
//! バッチ定義ファイルと試験データファイルの読み込みを抽象化

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::entities::time_series::TimeSeries;
use crate::domain::entities::units::TimeUnit;
use crate::domain::errors::DatasetError;

/// バッチ定義ファイルの1試験分のレコード
///
/// フィールド名は小文字・前後空白除去済み。値が空のフィールドは含まれない。
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRecord {
    pub test_id: String,
    /// 定義ファイル上の位置（行番号または列番号、1始まり）
    pub position: usize,
    pub fields: BTreeMap<String, String>,
}

impl ManifestRecord {
    pub fn new(test_id: String, position: usize, fields: BTreeMap<String, String>) -> Self {
        Self {
            test_id,
            position,
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// 試験データファイルの列指定
#[derive(Debug, Clone, PartialEq)]
pub struct DataFileSpec {
    pub time_column: String,
    pub head_column: String,
    /// 数値の時間列の単位（タイムスタンプ列はこの単位に換算される）
    pub time_unit: TimeUnit,
}

impl Default for DataFileSpec {
    fn default() -> Self {
        Self {
            time_column: "Time".to_string(),
            head_column: "Head".to_string(),
            time_unit: TimeUnit::S,
        }
    }
}

/// データセットリポジトリ
#[async_trait]
pub trait DatasetRepository: Send + Sync {
    /// ディレクトリ内の試験データファイルを発見する
    ///
    /// # Arguments
    ///
    /// * `data_dir` - データディレクトリのパス（`~` 展開可）
    async fn discover_data_files(&self, data_dir: &str) -> Result<Vec<PathBuf>>;

    /// バッチ定義ファイルを読み込む
    ///
    /// # Errors
    ///
    /// ファイルが読めない場合、`test_id` が定義されていない場合にエラーを返す
    async fn load_manifest(&self, manifest_path: &Path) -> Result<Vec<ManifestRecord>>;

    /// 試験データファイルを時系列として読み込む
    ///
    /// # Errors
    ///
    /// 失敗はデータセット単位の `DatasetError` として返す
    async fn load_time_series(
        &self,
        file_path: &Path,
        spec: &DataFileSpec,
    ) -> std::result::Result<TimeSeries, DatasetError>;
}
