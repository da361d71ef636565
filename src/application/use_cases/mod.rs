//! # Use Cases
//!
//! アプリケーションのビジネスフロー（ユースケース）
//!
//! ## ユースケース
//!
//! - **DiscoverDatasetsUseCase**: 試験データファイルの発見
//! - **LoadDatasetsUseCase**: バッチ定義の読み込みとデータセットの組み立て
//! - **RunBatchUseCase**: バッチ解析と結果の保存

pub mod discover_datasets;
pub mod load_datasets;
pub mod run_batch;
