//! # Domain Layer
//!
//! スラグ試験解析の核心的なルールとエンティティを定義します。
//!
//! ## 特徴
//!
//! - ファイル形式やCLIについて何も知らない
//! - 解析モデルは純粋関数（I/O・時計・乱数を使わない）
//! - 同じ入力からは常に同じ結果を返す
//!
//! ## 構成要素
//!
//! - **entities**: ビジネスエンティティ（TimeSeries, WellGeometry, FitResult, BatchRunなど）
//! - **errors**: データセット単位のエラー型
//! - **repositories**: Repository trait（インターフェース定義のみ）
//! - **services**: Domain Service（回帰、回復区間抽出、スラグ試験モデル）

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;
