//! # Bouwer & Rice (1976)
//!
//! K = r_c² · ln(R_e/r_w) / (2 · b · T0)
//!
//! ln(R_e/r_w) は Van Rooy による A, B, C 係数の多項式近似から求める。

use std::collections::BTreeMap;

use super::{build_result, log_linear_fit, prepare, AnalysisOptions, SlugTestModel};
use crate::domain::entities::dataset::{SlugMethod, SlugTestDataset};
use crate::domain::entities::fit_result::FitResult;
use crate::domain::entities::well_geometry::{AquiferProperties, WellGeometry};
use crate::domain::errors::ValidationError;

const BETA_A: [f64; 5] = [1.353, 2.157, -4.027, 2.777, -0.460];
const BETA_B: [f64; 5] = [-0.401, 2.619, -3.267, 1.548, -0.210];
const BETA_C: [f64; 5] = [-1.605, 9.496, -12.317, 6.528, -0.986];

/// ln((D - H)/r_w) の上限
const MAX_LN_DEPTH_RATIO: f64 = 6.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct BouwerRiceModel;

/// ln(R_e/r_w) の計算に使った形状
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveRadius {
    /// 異方性補正後の井戸半径 r_w*
    pub corrected_radius: f64,
    /// 地下水面より下のスクリーン長 b
    pub saturated_screen: f64,
    /// 地下水面からスクリーン上端までの距離 d
    pub screen_offset: f64,
    pub fully_penetrating: bool,
    pub ln_re_rw: f64,
}

/// 有効半径 ln(R_e/r_w) を計算
///
/// スクリーンが地下水面をまたぐ場合（d < 0）は b を |d| だけ短くして d = 0 とする。
///
/// # Errors
///
/// スクリーン全体が地下水面より上にある場合
pub fn effective_radius(
    geometry: &WellGeometry,
    aquifer: &AquiferProperties,
) -> Result<EffectiveRadius, ValidationError> {
    let rw = geometry.well_radius * aquifer.anisotropy.sqrt();

    let mut d = geometry.screen_top_depth - aquifer.water_table_depth;
    let mut b = geometry.screen_length;
    if d < 0.0 {
        b -= d.abs();
        d = 0.0;
    }
    if b <= 0.0 {
        return Err(ValidationError::NonPositiveGeometry {
            field: "saturated_screen_length".to_string(),
        });
    }

    let thickness = aquifer.saturated_thickness;
    let depth_to_bottom = d + b;
    let x = (b / rw).log10();
    let part1 = 1.1 / (depth_to_bottom / rw).ln();

    let fully_penetrating = thickness <= depth_to_bottom;
    let part2 = if fully_penetrating {
        polynomial(&BETA_C, x) / (b / rw)
    } else {
        let a = polynomial(&BETA_A, x);
        let bb = polynomial(&BETA_B, x);
        let term = ((thickness - depth_to_bottom) / rw).ln().min(MAX_LN_DEPTH_RATIO);
        (a + bb * term) / (b / rw)
    };

    Ok(EffectiveRadius {
        corrected_radius: rw,
        saturated_screen: b,
        screen_offset: d,
        fully_penetrating,
        ln_re_rw: 1.0 / (part1 + part2),
    })
}

fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

impl SlugTestModel for BouwerRiceModel {
    fn method(&self) -> SlugMethod {
        SlugMethod::BouwerRice
    }

    fn min_points(&self) -> usize {
        3
    }

    fn analyze(
        &self,
        dataset: &SlugTestDataset,
        options: &AnalysisOptions,
    ) -> Result<FitResult, ValidationError> {
        let recovery = prepare(dataset, options, self.method(), self.min_points())?;
        let radius = effective_radius(&dataset.geometry, &dataset.aquifer)?;
        let fit = log_linear_fit(&recovery, options.regression, self.method())?;

        let k = dataset.geometry.casing_radius.powi(2) * radius.ln_re_rw
            / (2.0 * radius.saturated_screen * fit.basic_time_lag);

        let mut model_parameters = BTreeMap::new();
        model_parameters.insert("T0".to_string(), fit.basic_time_lag);
        model_parameters.insert("ln_re_rw".to_string(), radius.ln_re_rw);
        model_parameters.insert("rw_corrected".to_string(), radius.corrected_radius);
        model_parameters.insert("b".to_string(), radius.saturated_screen);
        model_parameters.insert("d".to_string(), radius.screen_offset);

        Ok(build_result(
            dataset,
            k,
            fit.statistics,
            model_parameters,
            &recovery,
            true,
            options,
        ))
    }
}
