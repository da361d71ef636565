//! # Domain Services
//!
//! ドメインサービス（解析モデル・回帰・回復区間検出・選択）

pub mod recovery;
pub mod regression;
pub mod selection;
pub mod slug_models;
