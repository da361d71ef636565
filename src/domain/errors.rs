//! # Domain Errors
//!
//! データセット単位で記録されるエラー型
//!
//! どちらのエラーもバッチ全体を中断させず、該当データセットの
//! `BatchEntry` に記録される。

use serde::Serialize;
use thiserror::Error;

/// 入力データの検証エラー
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error("{method} requires at least {required} usable points, got {actual}")]
    InsufficientPoints {
        method: String,
        required: usize,
        actual: usize,
    },

    #[error("time is not strictly increasing at sample {index}")]
    NonMonotonicTime { index: usize },

    #[error("non-finite value at sample {index}")]
    NonFiniteValue { index: usize },

    #[error("{field} must be positive")]
    NonPositiveGeometry { field: String },

    #[error("invalid aquifer: {reason}")]
    InvalidAquifer { reason: String },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("unsupported unit conversion: {from} to {to}")]
    UnsupportedConversion { from: String, to: String },
}

/// データセットの読み込み・解析エラー
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatasetError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("malformed file {path} (line {line}): {reason}")]
    MalformedFile {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("missing column '{column}' in {path}")]
    MissingColumn { path: String, column: String },

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl DatasetError {
    /// I/Oエラーをパス付きで記録する
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        DatasetError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// ユーザー向けの短い分類名
    pub fn kind(&self) -> &'static str {
        match self {
            DatasetError::Io { .. } => "io",
            DatasetError::MalformedFile { .. } => "malformed_file",
            DatasetError::MissingColumn { .. } => "missing_column",
            DatasetError::Validation(_) => "validation",
        }
    }
}
