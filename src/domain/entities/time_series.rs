//! # TimeSeries Entity
//!
//! 経過時間と水位の組からなる検証済み時系列

use serde::{Deserialize, Serialize};

use crate::domain::errors::ValidationError;

/// 1つの計測値（経過時間, 水位）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesSample {
    pub elapsed_time: f64,
    pub measured_level: f64,
}

impl TimeSeriesSample {
    pub fn new(elapsed_time: f64, measured_level: f64) -> Self {
        Self {
            elapsed_time,
            measured_level,
        }
    }
}

/// 検証済みの時系列
///
/// 生成時に以下が保証される：
///
/// - 1点以上のサンプルを持つ
/// - すべての値が有限
/// - 経過時間が厳密に単調増加（タイムスタンプは一意）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    samples: Vec<TimeSeriesSample>,
}

impl TimeSeries {
    /// サンプル列を検証して時系列を作成
    ///
    /// # Errors
    ///
    /// 空・非有限値・非単調な時間の場合に `ValidationError` を返す
    pub fn new(samples: Vec<TimeSeriesSample>) -> Result<Self, ValidationError> {
        if samples.is_empty() {
            return Err(ValidationError::EmptyDataset);
        }

        for (index, sample) in samples.iter().enumerate() {
            if !sample.elapsed_time.is_finite() || !sample.measured_level.is_finite() {
                return Err(ValidationError::NonFiniteValue { index });
            }
        }

        for (index, pair) in samples.windows(2).enumerate() {
            if pair[1].elapsed_time <= pair[0].elapsed_time {
                return Err(ValidationError::NonMonotonicTime { index: index + 1 });
            }
        }

        Ok(Self { samples })
    }

    /// (時間, 水位) のペアから作成
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ValidationError> {
        Self::new(
            pairs
                .iter()
                .map(|&(t, h)| TimeSeriesSample::new(t, h))
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// 検証済みの時系列は常に1点以上を持つ
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[TimeSeriesSample] {
        &self.samples
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.elapsed_time).collect()
    }

    pub fn levels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.measured_level).collect()
    }

    /// 最初のサンプルが t = 0 になるように時間をずらす
    pub fn rebase_time(&self) -> TimeSeries {
        let origin = self.samples[0].elapsed_time;
        TimeSeries {
            samples: self
                .samples
                .iter()
                .map(|s| TimeSeriesSample::new(s.elapsed_time - origin, s.measured_level))
                .collect(),
        }
    }

    /// `index` 以降のサンプルを切り出す
    ///
    /// 範囲外の場合は空データセットとして扱う
    pub fn slice_from(&self, index: usize) -> Result<TimeSeries, ValidationError> {
        if index >= self.samples.len() {
            return Err(ValidationError::EmptyDataset);
        }
        Ok(TimeSeries {
            samples: self.samples[index..].to_vec(),
        })
    }

    /// 静水位からの変位（水位 - 静水位）に変換
    pub fn displacement_from(&self, static_level: f64) -> TimeSeries {
        TimeSeries {
            samples: self
                .samples
                .iter()
                .map(|s| TimeSeriesSample::new(s.elapsed_time, s.measured_level - static_level))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid_series() {
        let series = TimeSeries::from_pairs(&[(0.0, 1.0), (1.0, 0.8), (2.0, 0.65)]).unwrap();
        assert_eq!(series.len(), 3);
        assert!(!series.is_empty());
        assert_eq!(series.times(), vec![0.0, 1.0, 2.0]);
        assert_eq!(series.levels(), vec![1.0, 0.8, 0.65]);
    }

    #[test]
    fn test_new_empty_is_rejected() {
        let result = TimeSeries::new(vec![]);
        assert_eq!(result.unwrap_err(), ValidationError::EmptyDataset);
    }

    #[test]
    fn test_duplicate_timestamp_is_rejected() {
        let result = TimeSeries::from_pairs(&[(0.0, 1.0), (1.0, 0.8), (1.0, 0.7)]);
        assert_eq!(
            result.unwrap_err(),
            ValidationError::NonMonotonicTime { index: 2 }
        );
    }

    #[test]
    fn test_decreasing_time_is_rejected() {
        let result = TimeSeries::from_pairs(&[(0.0, 1.0), (2.0, 0.8), (1.0, 0.7)]);
        assert!(matches!(
            result,
            Err(ValidationError::NonMonotonicTime { index: 2 })
        ));
    }

    #[test]
    fn test_nan_is_rejected() {
        let result = TimeSeries::from_pairs(&[(0.0, 1.0), (1.0, f64::NAN)]);
        assert_eq!(result.unwrap_err(), ValidationError::NonFiniteValue { index: 1 });
    }

    #[test]
    fn test_rebase_time() {
        let series = TimeSeries::from_pairs(&[(10.0, 1.0), (11.5, 0.8)]).unwrap();
        let rebased = series.rebase_time();
        assert_eq!(rebased.times(), vec![0.0, 1.5]);
        assert_eq!(rebased.levels(), series.levels());
    }

    #[test]
    fn test_slice_from() {
        let series = TimeSeries::from_pairs(&[(0.0, 1.0), (1.0, 0.8), (2.0, 0.6)]).unwrap();
        let tail = series.slice_from(1).unwrap();
        assert_eq!(tail.times(), vec![1.0, 2.0]);
        assert!(series.slice_from(3).is_err());
    }

    #[test]
    fn test_displacement_from() {
        let series = TimeSeries::from_pairs(&[(0.0, 11.0), (1.0, 10.5)]).unwrap();
        let disp = series.displacement_from(10.0);
        assert_eq!(disp.levels(), vec![1.0, 0.5]);
    }
}
