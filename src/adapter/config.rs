//! Configuration
//!
//! JSON設定ファイルの読み込み（全項目にデフォルト値あり）

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::domain::entities::dataset::SlugMethod;
use crate::domain::entities::units::{LengthUnit, TimeUnit};
use crate::domain::services::recovery::DEFAULT_RECOVERY_WINDOW;
use crate::domain::services::regression::RegressionKind;
use crate::domain::services::slug_models::AnalysisOptions;

pub const DEFAULT_CONFIG_PATH: &str = "./slugfit.json";

/// 回復区間検出の移動窓の上限
pub const MAX_RECOVERY_WINDOW: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// バッチ定義ファイル
    pub batch_file: Option<String>,
    pub data_dir: String,
    pub output_dir: String,
    pub method: SlugMethod,
    pub length_unit: LengthUnit,
    pub time_unit: TimeUnit,
    pub time_column: String,
    pub head_column: String,
    pub extract_recovery: bool,
    pub recovery_window: usize,
    /// 静水位を一階差分の百分位で推定する場合の百分位
    pub static_level_percentile: Option<f64>,
    pub regression: RegressionKind,
    pub min_r_squared: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_file: None,
            data_dir: ".".to_string(),
            output_dir: "./output".to_string(),
            method: SlugMethod::default(),
            length_unit: LengthUnit::default(),
            time_unit: TimeUnit::default(),
            time_column: "Time".to_string(),
            head_column: "Head".to_string(),
            extract_recovery: false,
            recovery_window: DEFAULT_RECOVERY_WINDOW,
            static_level_percentile: None,
            regression: RegressionKind::default(),
            min_r_squared: 0.9,
        }
    }
}

impl Config {
    /// 設定ファイルを読み込む
    ///
    /// ファイルが存在しない場合はデフォルト値を使う。
    ///
    /// # Errors
    ///
    /// 読み込み・JSON解析に失敗した場合、値が範囲外の場合にエラーを返す
    pub fn load(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let path = Path::new(expanded.as_ref());

        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// 値の範囲を検証する
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_RECOVERY_WINDOW).contains(&self.recovery_window) {
            anyhow::bail!(
                "recovery_window must be between 1 and {}, got {}",
                MAX_RECOVERY_WINDOW,
                self.recovery_window
            );
        }
        if !(0.0..=1.0).contains(&self.min_r_squared) {
            anyhow::bail!("min_r_squared must be between 0 and 1, got {}", self.min_r_squared);
        }
        if let Some(percentile) = self.static_level_percentile {
            if !(0.0..=100.0).contains(&percentile) {
                anyhow::bail!(
                    "static_level_percentile must be between 0 and 100, got {}",
                    percentile
                );
            }
        }
        Ok(())
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            extract_recovery: self.extract_recovery,
            recovery_window: self.recovery_window,
            static_level_percentile: self.static_level_percentile,
            regression: self.regression,
            min_r_squared: self.min_r_squared,
        }
    }
}
