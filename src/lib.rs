//! # slugfit
//!
//! スラグ試験（slug test）の回復データから帯水層の透水係数 K、透水量係数 T、
//! 貯留係数 S を一括で推定するツール
//!
//! このプロジェクトはクリーンアーキテクチャを採用しており、以下の4層で構成されています：
//!
//! - **Domain層**: 時系列・井戸形状・解析モデルなどの純粋な計算（I/Oなし）
//! - **Application層**: データセットの読み込みとバッチ解析（ユースケース）
//! - **Adapter層**: 外部システムとの統合（CSVファイル、設定ファイル）
//! - **Driver層**: CLI、依存性注入
//!
//! 1件のデータセットの失敗はそのデータセットのエラーとして記録され、
//! バッチ全体は最後まで処理されます。

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// Domain層（純粋なビジネスロジック）
pub mod domain;

// Application層（ユースケース）
pub mod application;

// Adapter層（Infrastructure）
pub mod adapter;

// Driver層（Presentation）
pub mod driver;
