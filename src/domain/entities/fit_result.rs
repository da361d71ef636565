//! # FitResult Entity
//!
//! 1データセット・1回の解析から得られる不変の結果

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::dataset::{SlugMethod, SlugTestDataset};
use super::units::{LengthUnit, TimeUnit};
use crate::domain::services::slug_models::AnalysisOptions;

/// 推定された水理定数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HydraulicParameters {
    /// 透水係数 K [長さ/時間]
    pub hydraulic_conductivity: f64,
    /// 透水量係数 T = K·D [長さ²/時間]
    pub transmissivity: f64,
    /// 貯留係数 S（帯水層の物性値から求まる場合のみ）
    pub storativity: Option<f64>,
}

/// 当てはめの統計量
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitStatistics {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub adjusted_r_squared: Option<f64>,
    pub rmse: f64,
    pub mae: f64,
    pub ss_res: f64,
    pub ss_tot: f64,
    pub residual_mean: f64,
    pub residual_std: f64,
    pub num_points: usize,
}

/// 当てはめの品質フラグ
///
/// 数値的な非収束はエラーではなくこのフラグで報告する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitQuality {
    Good,
    Poor,
    NotConverged,
}

impl FitQuality {
    /// 推定値と決定係数から品質を判定
    pub fn classify(hydraulic_conductivity: f64, r_squared: f64, min_r_squared: f64) -> Self {
        if !hydraulic_conductivity.is_finite() || hydraulic_conductivity <= 0.0 {
            return FitQuality::NotConverged;
        }
        if !r_squared.is_finite() || r_squared < min_r_squared {
            return FitQuality::Poor;
        }
        FitQuality::Good
    }
}

impl fmt::Display for FitQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitQuality::Good => write!(f, "good"),
            FitQuality::Poor => write!(f, "poor"),
            FitQuality::NotConverged => write!(f, "not_converged"),
        }
    }
}

/// 解析結果
///
/// 生成後は変更されず、再解析によってのみ置き換えられる。
/// `input_fingerprint` と `options` は結果を生んだ入力そのものを指す。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitResult {
    pub dataset_id: String,
    pub input_fingerprint: Uuid,
    pub method: SlugMethod,
    pub parameters: HydraulicParameters,
    pub statistics: FitStatistics,
    /// 手法固有のパラメータ（T0, H0, alpha, beta など）
    pub model_parameters: BTreeMap<String, f64>,
    pub quality: FitQuality,
    pub length_unit: LengthUnit,
    pub time_unit: TimeUnit,
    /// 解析時のオプション
    pub options: AnalysisOptions,
}

impl FitResult {
    pub fn new(
        dataset: &SlugTestDataset,
        options: &AnalysisOptions,
        parameters: HydraulicParameters,
        statistics: FitStatistics,
        model_parameters: BTreeMap<String, f64>,
        quality: FitQuality,
    ) -> Self {
        Self {
            dataset_id: dataset.id.clone(),
            input_fingerprint: dataset.fingerprint(),
            method: dataset.method,
            parameters,
            statistics,
            model_parameters,
            quality,
            length_unit: dataset.length_unit,
            time_unit: dataset.time_unit,
            options: *options,
        }
    }

    /// この結果が現在のデータセット入力と解析オプションから得られたものかどうか
    pub fn is_current_for(&self, dataset: &SlugTestDataset, options: &AnalysisOptions) -> bool {
        self.dataset_id == dataset.id
            && self.input_fingerprint == dataset.fingerprint()
            && self.options == *options
    }

    /// 透水係数の単位表記（例: "m/s"）
    pub fn conductivity_unit(&self) -> String {
        format!("{}/{}", self.length_unit, self.time_unit)
    }
}
