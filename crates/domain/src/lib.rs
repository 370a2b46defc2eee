//! # TodoList ドメイン層
//!
//! To-Do 管理の中核となる型を定義する。
//!
//! ## 設計方針
//!
//! - **値オブジェクト**: メールアドレスやテナントテーブル名は生成時に検証し、
//!   不正な値の存在を型レベルで排除する
//! - **エンティティ**: [`todo::Todo`] は識別子（テナントテーブル内で一意）を持つ
//! - **インフラ非依存**: DB やネットワークには一切依存しない
//!
//! ## 依存関係の方向
//!
//! ```text
//! todo-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`clock`] - 現在時刻の抽象化
//! - [`error`] - ドメインエラー
//! - [`tenant`] - メールアドレスから導出されるテナントテーブル
//! - [`todo`] - To-Do アイテムとステータス
//! - [`user`] - ユーザーのメールアドレス
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use todolist_domain::{tenant::TenantTable, user::UserEmail};
//!
//! let email = UserEmail::new("Jane.Doe@Example.com")?;
//! let table = TenantTable::from_email(&email)?;
//! assert_eq!(table.table_name(), "jane_doe_lists");
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod tenant;
pub mod todo;
pub mod user;

pub use error::DomainError;
