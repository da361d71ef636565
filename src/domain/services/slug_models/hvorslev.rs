//! # Hvorslev (1951)
//!
//! K = r_c² · ln(L_e / R) / (2 · L_e · T0)

use std::collections::BTreeMap;

use super::{build_result, log_linear_fit, prepare, AnalysisOptions, SlugTestModel};
use crate::domain::entities::dataset::{SlugMethod, SlugTestDataset};
use crate::domain::entities::fit_result::FitResult;
use crate::domain::errors::ValidationError;

/// Hvorslev の基本時間遅れ法
///
/// L_e/R > 8 を前提とした式。L_e/R ≤ 1 では対数が非正になり、
/// 結果は `NotConverged` として報告される。
#[derive(Debug, Clone, Copy, Default)]
pub struct HvorslevModel;

impl SlugTestModel for HvorslevModel {
    fn method(&self) -> SlugMethod {
        SlugMethod::Hvorslev
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
        let fit = log_linear_fit(&recovery, options.regression, self.method())?;

        let geometry = &dataset.geometry;
        let shape_factor = (geometry.screen_length / geometry.well_radius).ln();
        let k = geometry.casing_radius.powi(2) * shape_factor
            / (2.0 * geometry.screen_length * fit.basic_time_lag);

        let mut model_parameters = BTreeMap::new();
        model_parameters.insert("T0".to_string(), fit.basic_time_lag);
        model_parameters.insert("ln_le_r".to_string(), shape_factor);

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::dataset::fixtures::{aquifer, exponential_series, geometry};
    use crate::domain::entities::fit_result::FitQuality;
    use crate::domain::entities::well_geometry::WellGeometry;

    fn dataset_with(geometry: WellGeometry, t0: f64) -> SlugTestDataset {
        SlugTestDataset::new(
            "hv".to_string(),
            exponential_series(0.5, t0, 30, 1.0),
            geometry,
            aquifer(),
            SlugMethod::Hvorslev,
        )
        .unwrap()
    }

    #[test]
    fn test_recovers_time_lag_and_conductivity() {
        let ds = dataset_with(geometry(), 8.0);
        let fit = HvorslevModel.analyze(&ds, &AnalysisOptions::default()).unwrap();

        let t0 = fit.model_parameters["T0"];
        assert!((t0 - 8.0).abs() < 1e-9);

        let expected = 0.05f64.powi(2) * (1.5f64 / 0.1).ln() / (2.0 * 1.5 * 8.0);
        assert!((fit.parameters.hydraulic_conductivity - expected).abs() < 1e-12);
        assert!((fit.parameters.transmissivity - expected * 30.0).abs() < 1e-10);
        assert_eq!(fit.quality, FitQuality::Good);
        assert_eq!(fit.method, SlugMethod::Hvorslev);
    }

    #[test]
    fn test_short_screen_is_not_converged() {
        let geometry = WellGeometry::new(0.05, 0.2, 0.1, 12.0, None).unwrap();
        let ds = dataset_with(geometry, 8.0);
        let fit = HvorslevModel.analyze(&ds, &AnalysisOptions::default()).unwrap();
        assert_eq!(fit.quality, FitQuality::NotConverged);
    }

    #[test]
    fn test_rising_head_is_not_converged() {
        let mut ds = dataset_with(geometry(), 8.0);
        ds.series = exponential_series(0.5, -8.0, 10, 1.0);
        let fit = HvorslevModel.analyze(&ds, &AnalysisOptions::default()).unwrap();
        assert!(fit.parameters.hydraulic_conductivity < 0.0);
        assert_eq!(fit.quality, FitQuality::NotConverged);
    }

    #[test]
    fn test_negative_slug_uses_ratio() {
        let mut ds = dataset_with(geometry(), 8.0);
        ds.series = exponential_series(-0.5, 8.0, 30, 1.0);
        let fit = HvorslevModel.analyze(&ds, &AnalysisOptions::default()).unwrap();
        assert!((fit.model_parameters["T0"] - 8.0).abs() < 1e-9);
        assert_eq!(fit.model_parameters["H0"], -0.5);
    }
}
