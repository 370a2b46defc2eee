//! # ユースケース層
//!
//! Todo Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `todo`: To-Do アイテムの操作
//! - `permission`: テナントテーブルのシーケンス権限の付与

pub mod permission;
pub mod todo;

pub use permission::PermissionUseCaseImpl;
pub use todo::{TodoContent, TodoUseCaseImpl};
