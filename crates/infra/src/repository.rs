//! # リポジトリ実装
//!
//! テナントテーブルへのクエリを組み立て、[`ConnectionManager`](crate::db::ConnectionManager)
//! 経由で実行する。
//!
//! ## 設計方針
//!
//! - **テーブル単位の分離**: テナントごとのテーブルが分離境界。加えて
//!   WHERE 句で `user_email` を必ず指定する
//! - **値は常にバインド**: SQL に埋め込むのは検証済みでクォートした識別子のみ
//! - **テスタビリティ**: トレイト経由でモック可能な設計

pub mod permission_repository;
pub mod todo_repository;

pub use permission_repository::{PermissionRepository, PostgresPermissionRepository};
pub use todo_repository::{PostgresTodoRepository, TodoRepository};
use todolist_domain::{tenant::TenantTable, user::UserEmail};

use crate::error::InfraError;

/// 識別子を二重引用符で囲む
///
/// 識別子中の `"` は `""` にエスケープする。
pub(crate) fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// スキーマ修飾・クォート済みの名前を返す（例: `"public"."jane_doe_lists"`）
pub(crate) fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(name))
}

/// メールアドレスからテナントテーブルを導出する
///
/// 導出できない場合は `InvalidInput` として扱う（原因はクライアント入力）。
/// 現在のスパンに `table` フィールドがあれば導出したテーブルを記録する。
pub(crate) fn tenant_table(email: &UserEmail) -> Result<TenantTable, InfraError> {
    let table =
        TenantTable::from_email(email).map_err(|e| InfraError::invalid_input(e.to_string()))?;
    tracing::Span::current().record("table", tracing::field::display(&table));
    Ok(table)
}
