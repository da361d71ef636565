//! Repository Implementations
//!
//! Domain層のRepositoryトレイトの実装

pub mod csv_dataset_repository;
pub mod csv_result_repository;
