//! # Domain Entities
//!
//! ビジネスエンティティとバリューオブジェクトを定義するモジュール
//!
//! ## エンティティ
//!
//! - **TimeSeries**: 検証済みの（経過時間, 水位）系列
//! - **WellGeometry / AquiferProperties**: 井戸の形状と帯水層の物性値
//! - **SlugTestDataset**: 1回の試験の解析入力一式
//! - **FitResult**: 解析結果（不変）
//! - **BatchRun**: バッチ解析の結果のバリューオブジェクト

pub mod batch_run;
pub mod dataset;
pub mod fit_result;
pub mod time_series;
pub mod units;
pub mod well_geometry;
