//! # Regression Service
//!
//! 線形回帰（最小二乗・Huberロバスト回帰）と当てはめ統計量

use serde::{Deserialize, Serialize};

use crate::domain::entities::fit_result::FitStatistics;
use crate::domain::errors::ValidationError;

/// Huber tuning constant (95% efficiency under normal errors).
pub const HUBER_C: f64 = 1.345;
/// MAD to standard deviation for normally distributed residuals.
const MAD_SCALE: f64 = 0.6745;
const IRLS_MAX_ITERATIONS: usize = 50;
const IRLS_TOLERANCE: f64 = 1e-10;

/// 回帰の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegressionKind {
    #[default]
    Ols,
    Huber,
}

/// 直線 y = slope·x + intercept の当てはめ結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// 相関係数 r
    pub r_value: f64,
    /// 傾きの標準誤差
    pub stderr: f64,
    /// 実行したIRLSの反復回数（OLSは0）
    pub iterations: usize,
}

impl LinearFit {
    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// 指定した種類の回帰を実行
pub fn fit_line(kind: RegressionKind, x: &[f64], y: &[f64]) -> Result<LinearFit, ValidationError> {
    match kind {
        RegressionKind::Ols => linear_regression(x, y),
        RegressionKind::Huber => huber_regression(x, y),
    }
}

/// 通常の最小二乗法による直線回帰
///
/// # Errors
///
/// 点数が2未満、または x が全て同じ値の場合にエラーを返す
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<LinearFit, ValidationError> {
    let weights = vec![1.0; x.len()];
    let (slope, intercept) = weighted_line(x, y, &weights)?;

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    let syy: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();
    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();

    let r_value = if syy > 0.0 { sxy / (sxx * syy).sqrt() } else { 0.0 };

    let stderr = if x.len() > 2 {
        let ss_res: f64 = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| (yi - (slope * xi + intercept)).powi(2))
            .sum();
        (ss_res / (n - 2.0) / sxx).sqrt()
    } else {
        0.0
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_value,
        stderr,
        iterations: 0,
    })
}

/// Huber重み付きの反復再重み付け最小二乗法（IRLS）
///
/// 外れ値（スパイクや記録計のノイズ）の影響を抑える。
/// 残差のスケールは MAD / 0.6745 で推定する。
pub fn huber_regression(x: &[f64], y: &[f64]) -> Result<LinearFit, ValidationError> {
    let ols = linear_regression(x, y)?;
    let (mut slope, mut intercept) = (ols.slope, ols.intercept);
    let mut iterations = 0;

    for _ in 0..IRLS_MAX_ITERATIONS {
        let residuals: Vec<f64> = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| yi - (slope * xi + intercept))
            .collect();
        let abs_res: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
        let scale = median(&abs_res) / MAD_SCALE;
        if scale <= f64::EPSILON {
            break;
        }

        let weights: Vec<f64> = residuals
            .iter()
            .map(|r| {
                let u = (r / scale).abs();
                if u <= HUBER_C {
                    1.0
                } else {
                    HUBER_C / u
                }
            })
            .collect();

        let (new_slope, new_intercept) = weighted_line(x, y, &weights)?;
        iterations += 1;

        let change = (new_slope - slope).abs() + (new_intercept - intercept).abs();
        slope = new_slope;
        intercept = new_intercept;
        if change < IRLS_TOLERANCE * (1.0 + slope.abs() + intercept.abs()) {
            break;
        }
    }

    Ok(LinearFit {
        slope,
        intercept,
        iterations,
        ..ols
    })
}

fn weighted_line(x: &[f64], y: &[f64], w: &[f64]) -> Result<(f64, f64), ValidationError> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(ValidationError::InsufficientPoints {
            method: "linear regression".to_string(),
            required: 2,
            actual: x.len().min(y.len()),
        });
    }

    let sw: f64 = w.iter().sum();
    let mean_x = x.iter().zip(w).map(|(xi, wi)| xi * wi).sum::<f64>() / sw;
    let mean_y = y.iter().zip(w).map(|(yi, wi)| yi * wi).sum::<f64>() / sw;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for ((xi, yi), wi) in x.iter().zip(y).zip(w) {
        sxx += wi * (xi - mean_x).powi(2);
        sxy += wi * (xi - mean_x) * (yi - mean_y);
    }

    if sxx <= 0.0 {
        return Err(ValidationError::InsufficientPoints {
            method: "linear regression".to_string(),
            required: 2,
            actual: 1,
        });
    }

    let slope = sxy / sxx;
    Ok((slope, mean_y - slope * mean_x))
}

/// 観測値と予測値から当てはめ統計量を計算
///
/// `slope` と `intercept` は NaN で返るので、呼び出し側で埋める。
pub fn fit_statistics(observed: &[f64], predicted: &[f64], num_predictors: usize) -> FitStatistics {
    let n = observed.len().min(predicted.len());
    let residuals: Vec<f64> = observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| o - p)
        .collect();

    let nf = n as f64;
    let mean_obs = if n > 0 { observed[..n].iter().sum::<f64>() / nf } else { f64::NAN };
    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let ss_tot: f64 = observed[..n].iter().map(|o| (o - mean_obs).powi(2)).sum();

    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { f64::NAN };
    let mse = if n > 0 { ss_res / nf } else { f64::NAN };
    let mae = if n > 0 {
        residuals.iter().map(|r| r.abs()).sum::<f64>() / nf
    } else {
        f64::NAN
    };

    let residual_mean = if n > 0 { residuals.iter().sum::<f64>() / nf } else { f64::NAN };
    let residual_std = if n > 1 {
        (residuals
            .iter()
            .map(|r| (r - residual_mean).powi(2))
            .sum::<f64>()
            / (nf - 1.0))
            .sqrt()
    } else {
        0.0
    };

    let adjusted_r_squared = if n > num_predictors + 1 && r_squared.is_finite() {
        Some(1.0 - (1.0 - r_squared) * (nf - 1.0) / (nf - num_predictors as f64 - 1.0))
    } else {
        None
    };

    FitStatistics {
        slope: f64::NAN,
        intercept: f64::NAN,
        r_squared,
        adjusted_r_squared,
        rmse: mse.sqrt(),
        mae,
        ss_res,
        ss_tot,
        residual_mean,
        residual_std,
        num_points: n,
    }
}

/// 中央値（空の場合は NaN）
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
