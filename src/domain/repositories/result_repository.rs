//! # Result Repository Trait
//!
//! バッチ解析結果の出力を抽象化

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

#[cfg(test)]
use mockall::automock;

use crate::domain::entities::batch_run::BatchRun;

/// 保存結果
#[derive(Debug, Clone)]
pub struct SaveResult {
    /// パラメータ一覧（CSV）のパス
    pub table_path: PathBuf,
    /// バッチ全体（JSON）のパス
    pub run_path: PathBuf,
    /// 書き出した行数
    pub rows_written: usize,
}

impl SaveResult {
    pub fn new(table_path: PathBuf, run_path: PathBuf, rows_written: usize) -> Self {
        Self {
            table_path,
            run_path,
            rows_written,
        }
    }
}

/// 結果リポジトリ
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// バッチ実行結果を保存する
    ///
    /// # Arguments
    ///
    /// * `run` - 保存するバッチ実行
    /// * `output_dir` - 出力ディレクトリ（存在しなければ作成）
    ///
    /// # Errors
    ///
    /// 書き込みに失敗した場合にエラーを返す
    async fn save_run(&self, run: &BatchRun, output_dir: &str) -> Result<SaveResult>;
}
