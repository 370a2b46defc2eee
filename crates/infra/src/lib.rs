//! # TodoList インフラ層
//!
//! データベースと外部サービス（資格情報の発行元）との通信を担当する。
//!
//! ## 責務
//!
//! - **資格情報の発行**: 短命な DB パスワードをワークスペースから取得
//! - **コネクション管理**: 単一の共有コネクションを遅延作成し、期限前に作り直す
//! - **リポジトリ実装**: テナントテーブルへのクエリを組み立てて実行する
//!
//! ## 依存関係
//!
//! ```text
//! todo-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`credential`] - 資格情報の発行
//! - [`db`] - コネクションマネージャ
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use todolist_domain::clock::SystemClock;
//! use todolist_infra::{
//!     credential::StaticCredentialIssuer,
//!     db::{ConnectSettings, ConnectionManager, PgConnector},
//!     repository::PostgresTodoRepository,
//! };
//!
//! let issuer = Arc::new(StaticCredentialIssuer::new("localhost", "secret"));
//! let connector = PgConnector::new(issuer, ConnectSettings::new("todos", "app"));
//! let connections = Arc::new(ConnectionManager::new(connector, Arc::new(SystemClock)));
//! let repository = PostgresTodoRepository::new(connections);
//! ```

pub mod credential;
pub mod db;
pub mod error;
pub mod repository;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::{InfraError, InfraErrorKind};
