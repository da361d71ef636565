//! # Slug Test Models
//!
//! 回復データから透水係数を推定する解析手法
//!
//! - Hvorslev (1951): 対数線形回帰と基本時間遅れ
//! - Bouwer & Rice (1976): 有効半径の経験式を用いた対数線形回帰
//! - Butler: 減衰振動モデルの非線形最小二乗
//!
//! 各モデルは純粋な計算のみを行い、I/O・時刻・乱数に依存しない。

pub mod bouwer_rice;
pub mod butler;
pub mod hvorslev;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::recovery::{isolate_recovery, static_level_by_percentile, DEFAULT_RECOVERY_WINDOW};
use super::regression::{fit_line, fit_statistics, RegressionKind};
use crate::domain::entities::dataset::{SlugMethod, SlugTestDataset};
use crate::domain::entities::fit_result::{
    FitQuality, FitResult, FitStatistics, HydraulicParameters,
};
use crate::domain::errors::ValidationError;

pub use bouwer_rice::BouwerRiceModel;
pub use butler::ButlerModel;
pub use hvorslev::HvorslevModel;

/// 解析オプション
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// 生の水位記録から回復区間を切り出す
    pub extract_recovery: bool,
    /// 回復区間検出の移動窓サイズ
    pub recovery_window: usize,
    /// 指定時は静水位を一階差分の百分位で推定する（未指定は窓平均）
    pub static_level_percentile: Option<f64>,
    pub regression: RegressionKind,
    /// これ未満の R² は `FitQuality::Poor`
    pub min_r_squared: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            extract_recovery: false,
            recovery_window: DEFAULT_RECOVERY_WINDOW,
            static_level_percentile: None,
            regression: RegressionKind::Ols,
            min_r_squared: 0.9,
        }
    }
}

/// スラグ試験モデル
pub trait SlugTestModel: Send + Sync {
    fn method(&self) -> SlugMethod;

    /// 解析に必要な最小点数
    fn min_points(&self) -> usize;

    /// データセットを解析する
    ///
    /// # Errors
    ///
    /// 点数不足などで解析できない場合に `ValidationError` を返す。
    /// 数値的な非収束はエラーではなく `FitQuality::NotConverged` になる。
    fn analyze(
        &self,
        dataset: &SlugTestDataset,
        options: &AnalysisOptions,
    ) -> Result<FitResult, ValidationError>;
}

/// 手法に対応するモデルを返す
pub fn model_for(method: SlugMethod) -> Box<dyn SlugTestModel> {
    match method {
        SlugMethod::BouwerRice => Box::new(BouwerRiceModel),
        SlugMethod::Hvorslev => Box::new(HvorslevModel),
        SlugMethod::Butler => Box::new(ButlerModel::default()),
    }
}

/// 前処理済みの回復データ（t = 0 開始の変位）
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Recovery {
    pub times: Vec<f64>,
    pub displacements: Vec<f64>,
    pub initial_displacement: f64,
    /// 回復区間を切り出した場合の静水位
    pub static_level: Option<f64>,
}

/// 全手法共通の前処理
///
/// 生の水位記録（`is_recovery_data = false`、または未指定で `extract_recovery`）は
/// 回復区間を切り出して静水位からの変位に直す。
pub(crate) fn prepare(
    dataset: &SlugTestDataset,
    options: &AnalysisOptions,
    method: SlugMethod,
    min_points: usize,
) -> Result<Recovery, ValidationError> {
    let (series, static_level) = if dataset.needs_recovery_isolation(options.extract_recovery) {
        let mut segment = isolate_recovery(&dataset.series, options.recovery_window)?;
        if let Some(percentile) = options.static_level_percentile {
            let levels = dataset.series.levels();
            let level = static_level_by_percentile(&levels[..segment.start_index], percentile)?;
            segment = segment.with_static_level(level);
        }
        (segment.displacement, Some(segment.static_level))
    } else {
        (dataset.series.clone(), None)
    };

    let series = series.rebase_time();
    if series.len() < min_points {
        return Err(ValidationError::InsufficientPoints {
            method: method.to_string(),
            required: min_points,
            actual: series.len(),
        });
    }

    let displacements = series.levels();
    let initial_displacement = dataset
        .geometry
        .initial_displacement
        .unwrap_or(displacements[0]);
    if initial_displacement == 0.0 {
        return Err(ValidationError::InvalidField {
            field: "initial_displacement".to_string(),
            reason: "initial displacement is zero".to_string(),
        });
    }

    Ok(Recovery {
        times: series.times(),
        displacements,
        initial_displacement,
        static_level,
    })
}

/// ln(H/H0) の t に対する直線回帰の結果
#[derive(Debug, Clone)]
pub(crate) struct LogLinearFit {
    /// 基本時間遅れ T0 = -1/slope
    pub basic_time_lag: f64,
    pub statistics: FitStatistics,
}

/// H/H0 > 0 の点だけを使って ln(H/H0) を回帰する
pub(crate) fn log_linear_fit(
    recovery: &Recovery,
    regression: RegressionKind,
    method: SlugMethod,
) -> Result<LogLinearFit, ValidationError> {
    const MIN_USABLE: usize = 3;

    let (times, log_ratios): (Vec<f64>, Vec<f64>) = recovery
        .times
        .iter()
        .zip(&recovery.displacements)
        .map(|(t, h)| (*t, h / recovery.initial_displacement))
        .filter(|(_, ratio)| *ratio > 0.0)
        .map(|(t, ratio)| (t, ratio.ln()))
        .unzip();

    if times.len() < MIN_USABLE {
        return Err(ValidationError::InsufficientPoints {
            method: method.to_string(),
            required: MIN_USABLE,
            actual: times.len(),
        });
    }

    let line = fit_line(regression, &times, &log_ratios)?;
    let predicted: Vec<f64> = times.iter().map(|t| line.predict(*t)).collect();
    let statistics = FitStatistics {
        slope: line.slope,
        intercept: line.intercept,
        ..fit_statistics(&log_ratios, &predicted, 1)
    };

    Ok(LogLinearFit {
        basic_time_lag: -1.0 / line.slope,
        statistics,
    })
}

/// 透水係数から結果を組み立てる（T = K·D, S は物性値から）
pub(crate) fn build_result(
    dataset: &SlugTestDataset,
    hydraulic_conductivity: f64,
    statistics: FitStatistics,
    mut model_parameters: BTreeMap<String, f64>,
    recovery: &Recovery,
    converged: bool,
    options: &AnalysisOptions,
) -> FitResult {
    model_parameters.insert("H0".to_string(), recovery.initial_displacement);
    if let Some(level) = recovery.static_level {
        model_parameters.insert("static_level".to_string(), level);
    }

    let quality = if converged {
        FitQuality::classify(hydraulic_conductivity, statistics.r_squared, options.min_r_squared)
    } else {
        FitQuality::NotConverged
    };

    let parameters = HydraulicParameters {
        hydraulic_conductivity,
        transmissivity: hydraulic_conductivity * dataset.aquifer.saturated_thickness,
        storativity: dataset.aquifer.storage_coefficient(),
    };

    FitResult::new(dataset, options, parameters, statistics, model_parameters, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::dataset::fixtures::{aquifer, dataset, geometry};
    use crate::domain::entities::time_series::TimeSeries;

    fn example_dataset(method: SlugMethod) -> SlugTestDataset {
        let series =
            TimeSeries::from_pairs(&[(0.0, 1.0), (1.0, 0.8), (2.0, 0.65), (5.0, 0.4)]).unwrap();
        SlugTestDataset::new("example".to_string(), series, geometry(), aquifer(), method).unwrap()
    }

    #[test]
    fn test_model_for_each_method() {
        for method in [SlugMethod::BouwerRice, SlugMethod::Hvorslev, SlugMethod::Butler] {
            assert_eq!(model_for(method).method(), method);
        }
    }

    #[test]
    fn test_example_series_gives_positive_conductivity() {
        for method in [SlugMethod::BouwerRice, SlugMethod::Hvorslev] {
            let ds = example_dataset(method);
            let fit = model_for(method).analyze(&ds, &AnalysisOptions::default()).unwrap();

            assert!(fit.parameters.hydraulic_conductivity > 0.0, "{}", method);
            assert!(fit.parameters.hydraulic_conductivity.is_finite());
            assert!(fit.statistics.rmse < 0.05);
            assert!(fit.statistics.r_squared > 0.95);
        }
    }

    #[test]
    fn test_analysis_is_deterministic() {
        for method in [SlugMethod::BouwerRice, SlugMethod::Hvorslev, SlugMethod::Butler] {
            let ds = dataset("t1", method);
            let model = model_for(method);
            let first = model.analyze(&ds, &AnalysisOptions::default()).unwrap();
            let second = model.analyze(&ds, &AnalysisOptions::default()).unwrap();
            assert_eq!(first, second);
            assert!(first.is_current_for(&ds, &AnalysisOptions::default()));
        }
    }

    #[test]
    fn test_prepare_rebases_time() {
        let series = TimeSeries::from_pairs(&[(10.0, 1.0), (11.0, 0.5), (12.0, 0.25)]).unwrap();
        let ds = SlugTestDataset::new("t".to_string(), series, geometry(), aquifer(), SlugMethod::Hvorslev)
            .unwrap();
        let recovery = prepare(&ds, &AnalysisOptions::default(), SlugMethod::Hvorslev, 3).unwrap();
        assert_eq!(recovery.times, vec![0.0, 1.0, 2.0]);
        assert_eq!(recovery.initial_displacement, 1.0);
        assert!(recovery.static_level.is_none());
    }

    #[test]
    fn test_prepare_uses_supplied_initial_displacement() {
        let mut ds = dataset("t", SlugMethod::Hvorslev);
        ds.geometry.initial_displacement = Some(1.2);
        let recovery = prepare(&ds, &AnalysisOptions::default(), SlugMethod::Hvorslev, 3).unwrap();
        assert_eq!(recovery.initial_displacement, 1.2);
    }

    #[test]
    fn test_prepare_insufficient_points() {
        let series = TimeSeries::from_pairs(&[(0.0, 1.0), (1.0, 0.5)]).unwrap();
        let ds = SlugTestDataset::new("t".to_string(), series, geometry(), aquifer(), SlugMethod::Hvorslev)
            .unwrap();
        let err = prepare(&ds, &AnalysisOptions::default(), SlugMethod::Hvorslev, 3).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientPoints {
                method: "hvorslev".to_string(),
                required: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_prepare_zero_initial_displacement() {
        let series = TimeSeries::from_pairs(&[(0.0, 0.0), (1.0, 0.5), (2.0, 0.2)]).unwrap();
        let ds = SlugTestDataset::new("t".to_string(), series, geometry(), aquifer(), SlugMethod::Hvorslev)
            .unwrap();
        assert!(prepare(&ds, &AnalysisOptions::default(), SlugMethod::Hvorslev, 3).is_err());
    }

    #[test]
    fn test_prepare_extracts_recovery_from_raw_record() {
        let mut pairs: Vec<(f64, f64)> = (0..12).map(|i| (i as f64, 4.0)).collect();
        for j in 0..30 {
            pairs.push(((12 + j) as f64, 4.0 + 0.8 * (-(j as f64) / 6.0).exp()));
        }
        let series = TimeSeries::from_pairs(&pairs).unwrap();
        let ds = SlugTestDataset::new("raw".to_string(), series, geometry(), aquifer(), SlugMethod::Hvorslev)
            .unwrap()
            .with_recovery_flag(false);

        let options = AnalysisOptions {
            extract_recovery: true,
            ..AnalysisOptions::default()
        };
        let recovery = prepare(&ds, &options, SlugMethod::Hvorslev, 3).unwrap();

        assert_eq!(recovery.times[0], 0.0);
        assert!((recovery.initial_displacement - 0.8).abs() < 1e-12);
        assert!((recovery.static_level.unwrap() - 4.0).abs() < 1e-12);

        let fit = HvorslevModel.analyze(&ds, &options).unwrap();
        assert_eq!(fit.model_parameters["static_level"], 4.0);
        assert!((fit.model_parameters["T0"] - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_log_linear_fit_skips_non_positive_ratios() {
        let recovery = Recovery {
            times: vec![0.0, 1.0, 2.0, 3.0, 4.0],
            displacements: vec![1.0, 0.5, 0.25, -0.01, 0.0],
            initial_displacement: 1.0,
            static_level: None,
        };
        let fit = log_linear_fit(&recovery, RegressionKind::Ols, SlugMethod::Hvorslev).unwrap();
        assert_eq!(fit.statistics.num_points, 3);
        assert!((fit.basic_time_lag - 1.0 / 2f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_log_linear_fit_too_few_usable_points() {
        let recovery = Recovery {
            times: vec![0.0, 1.0, 2.0, 3.0],
            displacements: vec![1.0, 0.5, -0.1, -0.2],
            initial_displacement: 1.0,
            static_level: None,
        };
        let err = log_linear_fit(&recovery, RegressionKind::Ols, SlugMethod::Hvorslev).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientPoints { actual: 2, .. }));
    }

    #[test]
    fn test_storativity_from_aquifer() {
        let mut ds = dataset("t", SlugMethod::Hvorslev);
        ds.aquifer = ds.aquifer.clone().with_storage(Some(0.2), None);
        let fit = HvorslevModel.analyze(&ds, &AnalysisOptions::default()).unwrap();
        assert_eq!(fit.parameters.storativity, ds.aquifer.storage_coefficient());
        assert!(fit.parameters.storativity.is_some());
    }

    /// 静水位 4.0 の区間の後に +0.8 の投入と T0 = 6 の指数回復が続く記録
    fn raw_dataset() -> SlugTestDataset {
        let mut pairs: Vec<(f64, f64)> = (0..12).map(|i| (i as f64, 4.0)).collect();
        for j in 0..30 {
            pairs.push(((12 + j) as f64, 4.0 + 0.8 * (-(j as f64) / 6.0).exp()));
        }
        let series = TimeSeries::from_pairs(&pairs).unwrap();
        SlugTestDataset::new("raw".to_string(), series, geometry(), aquifer(), SlugMethod::Hvorslev).unwrap()
    }

    #[test]
    fn test_raw_record_is_isolated_without_extract_option() {
        let ds = raw_dataset().with_recovery_flag(false);
        let options = AnalysisOptions::default();
        assert!(!options.extract_recovery);

        let fit = HvorslevModel.analyze(&ds, &options).unwrap();

        assert!((fit.model_parameters["H0"] - 0.8).abs() < 1e-12);
        assert!((fit.model_parameters["T0"] - 6.0).abs() < 1e-6);
        assert_eq!(fit.model_parameters["static_level"], 4.0);
        assert_eq!(fit.quality, FitQuality::Good);
    }

    #[test]
    fn test_recovery_flag_wins_over_extract_option() {
        let series = TimeSeries::from_pairs(&[(0.0, 1.0), (1.0, 0.8), (2.0, 0.65), (5.0, 0.4)]).unwrap();
        let ds = SlugTestDataset::new("t".to_string(), series, geometry(), aquifer(), SlugMethod::Hvorslev)
            .unwrap()
            .with_recovery_flag(true);
        let options = AnalysisOptions {
            extract_recovery: true,
            ..AnalysisOptions::default()
        };

        let recovery = prepare(&ds, &options, SlugMethod::Hvorslev, 3).unwrap();
        assert_eq!(recovery.displacements.len(), 4);
        assert!(recovery.static_level.is_none());
    }

    #[test]
    fn test_prepare_percentile_static_level() {
        let ds = raw_dataset().with_recovery_flag(false);
        let options = AnalysisOptions {
            static_level_percentile: Some(50.0),
            ..AnalysisOptions::default()
        };

        let recovery = prepare(&ds, &options, SlugMethod::Hvorslev, 3).unwrap();
        assert_eq!(recovery.static_level, Some(4.0));
        assert!((recovery.initial_displacement - 0.8).abs() < 1e-12);
    }
}
