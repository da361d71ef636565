//! # Butler damped oscillation
//!
//! 高透水性帯水層で見られる振動する回復を
//! H(t) = H0·exp(-αt)·cos(βt) で表し、Levenberg–Marquardt 法で当てはめる。
//!
//! K = r_c²·α / (2·r_w·L) · (1 + (β/α)²)

use nalgebra::{SMatrix, SVector};
use std::collections::BTreeMap;

use super::{build_result, prepare, AnalysisOptions, SlugTestModel};
use crate::domain::entities::dataset::{SlugMethod, SlugTestDataset};
use crate::domain::entities::fit_result::{FitResult, FitStatistics};
use crate::domain::errors::ValidationError;
use crate::domain::services::regression::fit_statistics;

type Matrix3 = SMatrix<f64, 3, 3>;
type Vector3 = SVector<f64, 3>;

const INITIAL_ALPHA: f64 = 0.01;
const INITIAL_BETA: f64 = 0.1;
const MIN_ALPHA: f64 = 1e-12;

/// Levenberg–Marquardt の設定
#[derive(Debug, Clone, Copy)]
pub struct ButlerModel {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for ButlerModel {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

/// 当てはめたパラメータ [H0, α, β]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillationFit {
    pub initial_head: f64,
    pub alpha: f64,
    pub beta: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl OscillationFit {
    fn params(&self) -> Vector3 {
        Vector3::new(self.initial_head, self.alpha, self.beta)
    }
}

fn model_value(p: &Vector3, t: f64) -> f64 {
    p[0] * (-p[1] * t).exp() * (p[2] * t).cos()
}

fn cost(p: &Vector3, times: &[f64], heads: &[f64]) -> f64 {
    times
        .iter()
        .zip(heads)
        .map(|(t, h)| (h - model_value(p, *t)).powi(2))
        .sum::<f64>()
        * 0.5
}

/// 正規方程式 JᵀJ と勾配 Jᵀr を組み立てる
fn normal_equations(p: &Vector3, times: &[f64], heads: &[f64]) -> (Matrix3, Vector3) {
    let mut jtj = Matrix3::zeros();
    let mut jtr = Vector3::zeros();

    for (t, h) in times.iter().zip(heads) {
        let decay = (-p[1] * t).exp();
        let (sin, cos) = (p[2] * t).sin_cos();
        let row = Vector3::new(decay * cos, -t * p[0] * decay * cos, -t * p[0] * decay * sin);
        let residual = h - p[0] * decay * cos;

        jtj += row * row.transpose();
        jtr += row * residual;
    }

    (jtj, jtr)
}

impl ButlerModel {
    /// 減衰振動モデルを当てはめる
    ///
    /// 収束しなかった場合も最後の推定値を `converged = false` で返す。
    pub fn fit_oscillation(&self, times: &[f64], heads: &[f64], initial_head: f64) -> OscillationFit {
        let mut p = Vector3::new(initial_head, INITIAL_ALPHA, INITIAL_BETA);
        let mut current_cost = cost(&p, times, heads);
        let mut lambda = 1e-3;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;

            let (jtj, jtr) = normal_equations(&p, times, heads);
            if jtr.amax() < self.tolerance * self.tolerance || current_cost < f64::MIN_POSITIVE {
                converged = true;
                break;
            }

            let mut damped = jtj;
            for i in 0..3 {
                damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
            }

            let Some(step) = damped.lu().solve(&jtr) else {
                lambda *= 10.0;
                continue;
            };

            let candidate = p + step;
            let candidate_cost = cost(&candidate, times, heads);

            if candidate_cost.is_finite() && candidate_cost < current_cost {
                let step_small = step.norm() < self.tolerance * (p.norm() + self.tolerance);
                let cost_small = (current_cost - candidate_cost) < self.tolerance * current_cost;

                p = candidate;
                current_cost = candidate_cost;
                lambda = (lambda / 10.0).max(1e-15);

                if step_small && cost_small {
                    converged = true;
                    break;
                }
            } else {
                lambda *= 10.0;
                if lambda > 1e16 {
                    // 降下方向が無い: 数値的な停留点
                    converged = true;
                    break;
                }
            }
        }

        OscillationFit {
            initial_head: p[0],
            alpha: p[1],
            beta: p[2].abs(),
            iterations,
            converged,
        }
    }
}

impl SlugTestModel for ButlerModel {
    fn method(&self) -> SlugMethod {
        SlugMethod::Butler
    }

    fn min_points(&self) -> usize {
        4
    }

    fn analyze(
        &self,
        dataset: &SlugTestDataset,
        options: &AnalysisOptions,
    ) -> Result<FitResult, ValidationError> {
        let recovery = prepare(dataset, options, self.method(), self.min_points())?;
        let fit = self.fit_oscillation(
            &recovery.times,
            &recovery.displacements,
            recovery.initial_displacement,
        );

        let params = fit.params();
        let predicted: Vec<f64> = recovery
            .times
            .iter()
            .map(|t| model_value(&params, *t))
            .collect();
        let statistics = FitStatistics {
            slope: -fit.alpha,
            intercept: fit.initial_head,
            ..fit_statistics(&recovery.displacements, &predicted, 3)
        };

        let geometry = &dataset.geometry;
        let converged = fit.converged && fit.alpha > MIN_ALPHA;
        let k = if fit.alpha > MIN_ALPHA {
            geometry.casing_radius.powi(2) * fit.alpha
                / (2.0 * geometry.well_radius * geometry.screen_length)
                * (1.0 + (fit.beta / fit.alpha).powi(2))
        } else {
            0.0
        };

        let mut model_parameters = BTreeMap::new();
        model_parameters.insert("alpha".to_string(), fit.alpha);
        model_parameters.insert("beta".to_string(), fit.beta);
        model_parameters.insert("H0_fitted".to_string(), fit.initial_head);
        model_parameters.insert("iterations".to_string(), fit.iterations as f64);

        Ok(build_result(
            dataset,
            k,
            statistics,
            model_parameters,
            &recovery,
            converged,
            options,
        ))
    }
}
