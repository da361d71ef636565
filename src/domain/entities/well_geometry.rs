//! # Well Geometry and Aquifer Properties
//!
//! 井戸の幾何形状と帯水層の物性値（データセット読み込み後は不変）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::ValidationError;

/// 井戸の幾何形状
///
/// 長さの単位はデータセット内で統一されている必要がある
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellGeometry {
    /// ケーシング半径 r_c
    pub casing_radius: f64,
    /// 井戸（掘削孔）半径 r_w
    pub well_radius: f64,
    /// スクリーン長 L_e
    pub screen_length: f64,
    /// 地表からスクリーン上端までの深さ
    pub screen_top_depth: f64,
    /// 初期変位 H0（未指定の場合は回復データの先頭値を使う）
    pub initial_displacement: Option<f64>,
}

impl WellGeometry {
    /// 幾何形状を検証して作成
    ///
    /// # Errors
    ///
    /// 半径・スクリーン長が正でない場合、スクリーン上端深度が負の場合、
    /// 初期変位が0の場合にエラーを返す
    pub fn new(
        casing_radius: f64,
        well_radius: f64,
        screen_length: f64,
        screen_top_depth: f64,
        initial_displacement: Option<f64>,
    ) -> Result<Self, ValidationError> {
        require_positive("casing_radius", casing_radius)?;
        require_positive("well_radius", well_radius)?;
        require_positive("screen_length", screen_length)?;
        if !screen_top_depth.is_finite() || screen_top_depth < 0.0 {
            return Err(ValidationError::NonPositiveGeometry {
                field: "screen_top_depth".to_string(),
            });
        }
        if let Some(h0) = initial_displacement {
            if !h0.is_finite() || h0 == 0.0 {
                return Err(ValidationError::NonPositiveGeometry {
                    field: "initial_displacement".to_string(),
                });
            }
        }

        Ok(Self {
            casing_radius,
            well_radius,
            screen_length,
            screen_top_depth,
            initial_displacement,
        })
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveGeometry {
            field: field.to_string(),
        })
    }
}

/// 帯水層の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AquiferType {
    #[default]
    Unconfined,
    Confined,
    SemiConfined,
}

impl FromStr for AquiferType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "unconfined" => Ok(AquiferType::Unconfined),
            "confined" => Ok(AquiferType::Confined),
            "semi-confined" | "semiconfined" | "leaky" => Ok(AquiferType::SemiConfined),
            other => Err(ValidationError::InvalidAquifer {
                reason: format!("unknown aquifer type '{}'", other),
            }),
        }
    }
}

impl fmt::Display for AquiferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AquiferType::Unconfined => write!(f, "unconfined"),
            AquiferType::Confined => write!(f, "confined"),
            AquiferType::SemiConfined => write!(f, "semi-confined"),
        }
    }
}

/// 帯水層の物性値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AquiferProperties {
    pub aquifer_type: AquiferType,
    /// 飽和層厚 D
    pub saturated_thickness: f64,
    /// 地表から地下水面までの深さ
    pub water_table_depth: f64,
    /// 異方性比 Kz/Kr
    pub anisotropy: f64,
    /// 比産出率 Sy（不圧帯水層）
    pub specific_yield: Option<f64>,
    /// 比貯留係数 Ss（被圧帯水層）
    pub specific_storage: Option<f64>,
}

impl AquiferProperties {
    /// 物性値を検証して作成
    pub fn new(
        aquifer_type: AquiferType,
        saturated_thickness: f64,
        water_table_depth: f64,
        anisotropy: f64,
    ) -> Result<Self, ValidationError> {
        if !saturated_thickness.is_finite() || saturated_thickness <= 0.0 {
            return Err(ValidationError::InvalidAquifer {
                reason: "saturated thickness must be positive".to_string(),
            });
        }
        if !water_table_depth.is_finite() || water_table_depth < 0.0 {
            return Err(ValidationError::InvalidAquifer {
                reason: "water table depth must not be negative".to_string(),
            });
        }
        if !anisotropy.is_finite() || anisotropy <= 0.0 {
            return Err(ValidationError::InvalidAquifer {
                reason: "anisotropy ratio must be positive".to_string(),
            });
        }

        Ok(Self {
            aquifer_type,
            saturated_thickness,
            water_table_depth,
            anisotropy,
            specific_yield: None,
            specific_storage: None,
        })
    }

    pub fn with_storage(mut self, specific_yield: Option<f64>, specific_storage: Option<f64>) -> Self {
        self.specific_yield = specific_yield;
        self.specific_storage = specific_storage;
        self
    }

    /// 貯留係数 S
    ///
    /// 不圧帯水層は Sy·D、被圧・半被圧帯水層は Ss·D。
    /// 必要な物性値が無い場合は `None`。
    pub fn storage_coefficient(&self) -> Option<f64> {
        match self.aquifer_type {
            AquiferType::Unconfined => self.specific_yield.map(|sy| sy * self.saturated_thickness),
            AquiferType::Confined | AquiferType::SemiConfined => self
                .specific_storage
                .map(|ss| ss * self.saturated_thickness),
        }
    }
}
