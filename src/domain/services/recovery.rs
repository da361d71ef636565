//! # Recovery Isolation Service
//!
//! 生の水位記録からスラグ投入後の回復区間と静水位を取り出す

use crate::domain::entities::time_series::TimeSeries;
use crate::domain::errors::ValidationError;

/// 移動窓のデフォルトサンプル数
pub const DEFAULT_RECOVERY_WINDOW: usize = 10;

/// 切り出された回復区間
#[derive(Debug, Clone, PartialEq)]
pub struct RecoverySegment {
    /// 元の時系列における回復開始位置
    pub start_index: usize,
    /// 投入前の静水位
    pub static_level: f64,
    /// 回復開始以降の静水位からの変位
    pub displacement: TimeSeries,
}

impl RecoverySegment {
    /// 静水位を置き換え、変位を取り直す
    pub fn with_static_level(self, static_level: f64) -> Self {
        let displacement = self
            .displacement
            .displacement_from(static_level - self.static_level);
        Self {
            start_index: self.start_index,
            static_level,
            displacement,
        }
    }
}

/// 回復区間を検出する
///
/// 各分割位置 i について窓内の前後平均の差 |mean(after) - mean(before)| を求め、
/// 最大となる位置を水位変化点とする。変化点周辺の窓内で極値
/// （上昇なら最大、下降なら最小）を回復開始とし、変化前の窓平均を静水位とする。
///
/// # Errors
///
/// 時系列が `2 * window + 1` 点未満の場合は `InsufficientPoints`
pub fn isolate_recovery(series: &TimeSeries, window: usize) -> Result<RecoverySegment, ValidationError> {
    let window = window.max(1);
    let required = window.checked_mul(2).and_then(|w| w.checked_add(1)).unwrap_or(usize::MAX);
    if series.len() < required {
        return Err(ValidationError::InsufficientPoints {
            method: "recovery isolation".to_string(),
            required,
            actual: series.len(),
        });
    }

    let levels = series.levels();
    let n = levels.len();

    let mut jump_index = window;
    let mut jump = 0.0_f64;
    for i in window..=(n - window) {
        let before = mean(&levels[i - window..i]);
        let after = mean(&levels[i..i + window]);
        let diff = after - before;
        if diff.abs() > jump.abs() {
            jump = diff;
            jump_index = i;
        }
    }

    let static_level = mean(&levels[jump_index - window..jump_index]);

    let search_end = (jump_index + window).min(n);
    let candidates = &levels[jump_index - 1..search_end];
    let offset = if jump >= 0.0 {
        index_of_extreme(candidates, |a, b| a > b)
    } else {
        index_of_extreme(candidates, |a, b| a < b)
    };
    let start_index = jump_index - 1 + offset;

    let displacement = series.slice_from(start_index)?.displacement_from(static_level);

    Ok(RecoverySegment {
        start_index,
        static_level,
        displacement,
    })
}

/// 百分位による静水位の推定
///
/// 一階差分の絶対値が `percentile` 百分位以下のサンプル（水位が落ち着いている区間）
/// の平均を静水位とする。
pub fn static_level_by_percentile(levels: &[f64], percentile: f64) -> Result<f64, ValidationError> {
    if levels.len() < 2 {
        return Err(ValidationError::InsufficientPoints {
            method: "static level".to_string(),
            required: 2,
            actual: levels.len(),
        });
    }
    if !(0.0..=100.0).contains(&percentile) {
        return Err(ValidationError::InvalidField {
            field: "percentile".to_string(),
            reason: format!("{} is outside 0..=100", percentile),
        });
    }

    let diffs: Vec<f64> = levels.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let threshold = percentile_of(&diffs, percentile);

    let calm: Vec<f64> = diffs
        .iter()
        .zip(&levels[1..])
        .filter(|(d, _)| **d <= threshold)
        .map(|(_, level)| *level)
        .collect();

    Ok(mean(&calm))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn index_of_extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if better(v, values[best]) {
            best = i;
        }
    }
    best
}

/// 線形補間による百分位
fn percentile_of(values: &[f64], percentile: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
