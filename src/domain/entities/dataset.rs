//! # SlugTestDataset Entity
//!
//! 1回のスラグ試験を解析するための入力一式

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::time_series::TimeSeries;
use super::units::{LengthUnit, TimeUnit};
use super::well_geometry::{AquiferProperties, WellGeometry};
use crate::domain::errors::ValidationError;

/// 解析手法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SlugMethod {
    #[default]
    BouwerRice,
    Hvorslev,
    Butler,
}

impl SlugMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlugMethod::BouwerRice => "bouwer-rice",
            SlugMethod::Hvorslev => "hvorslev",
            SlugMethod::Butler => "butler",
        }
    }
}

impl fmt::Display for SlugMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlugMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "bouwer-rice" | "bouwer-rice-1976" | "bouwerrice" | "br" => Ok(SlugMethod::BouwerRice),
            "hvorslev" | "hvorslev-1951" => Ok(SlugMethod::Hvorslev),
            "butler" | "butler-1998" => Ok(SlugMethod::Butler),
            _ => Err(ValidationError::InvalidField {
                field: "solution_method".to_string(),
                reason: format!("unknown method '{}'", s.trim()),
            }),
        }
    }
}

/// スラグ試験データセット
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlugTestDataset {
    /// 試験ID（バッチ内で一意）
    pub id: String,
    pub well_name: Option<String>,
    pub aquifer_name: Option<String>,
    pub series: TimeSeries,
    pub geometry: WellGeometry,
    pub aquifer: AquiferProperties,
    pub method: SlugMethod,
    /// 水位が既に静水位からの変位として記録されているか（未指定は `None`）
    pub is_recovery_data: Option<bool>,
    pub length_unit: LengthUnit,
    pub time_unit: TimeUnit,
}

impl SlugTestDataset {
    /// 新しいデータセットを作成
    ///
    /// # Errors
    ///
    /// IDが空の場合にエラーを返す
    pub fn new(
        id: String,
        series: TimeSeries,
        geometry: WellGeometry,
        aquifer: AquiferProperties,
        method: SlugMethod,
    ) -> Result<Self, ValidationError> {
        if id.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "test_id".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        Ok(Self {
            id,
            well_name: None,
            aquifer_name: None,
            series,
            geometry,
            aquifer,
            method,
            is_recovery_data: None,
            length_unit: LengthUnit::default(),
            time_unit: TimeUnit::default(),
        })
    }

    pub fn with_names(mut self, well_name: Option<String>, aquifer_name: Option<String>) -> Self {
        self.well_name = well_name;
        self.aquifer_name = aquifer_name;
        self
    }

    pub fn with_units(mut self, length_unit: LengthUnit, time_unit: TimeUnit) -> Self {
        self.length_unit = length_unit;
        self.time_unit = time_unit;
        self
    }

    pub fn with_recovery_flag(mut self, is_recovery_data: bool) -> Self {
        self.is_recovery_data = Some(is_recovery_data);
        self
    }

    /// 回復区間の切り出しが必要か
    ///
    /// 生の水位記録と明示された場合は常に切り出す。未指定の場合は
    /// `extract_recovery` に従う。
    pub fn needs_recovery_isolation(&self, extract_recovery: bool) -> bool {
        match self.is_recovery_data {
            Some(is_recovery) => !is_recovery,
            None => extract_recovery,
        }
    }

    /// 解析結果に影響する全ての入力から決定的なフィンガープリントを計算
    ///
    /// 同じ入力からは常に同じ値になり、時系列・形状・物性値・手法の
    /// いずれかが変わると値が変わる。
    pub fn fingerprint(&self) -> Uuid {
        let mut bytes = Vec::with_capacity(self.series.len() * 16 + 128);

        bytes.extend_from_slice(self.id.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(self.method.as_str().as_bytes());
        bytes.push(match self.is_recovery_data {
            None => 0,
            Some(false) => 1,
            Some(true) => 2,
        });
        bytes.extend_from_slice(self.length_unit.to_string().as_bytes());
        bytes.extend_from_slice(self.time_unit.to_string().as_bytes());

        for sample in self.series.samples() {
            bytes.extend_from_slice(&sample.elapsed_time.to_le_bytes());
            bytes.extend_from_slice(&sample.measured_level.to_le_bytes());
        }

        let g = &self.geometry;
        for value in [g.casing_radius, g.well_radius, g.screen_length, g.screen_top_depth] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        push_optional(&mut bytes, g.initial_displacement);

        let a = &self.aquifer;
        bytes.extend_from_slice(a.aquifer_type.to_string().as_bytes());
        for value in [a.saturated_thickness, a.water_table_depth, a.anisotropy] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        push_optional(&mut bytes, a.specific_yield);
        push_optional(&mut bytes, a.specific_storage);

        Uuid::new_v5(&Uuid::NAMESPACE_OID, &bytes)
    }
}

fn push_optional(bytes: &mut Vec<u8>, value: Option<f64>) {
    match value {
        Some(v) => {
            bytes.push(1);
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        None => bytes.push(0),
    }
}
