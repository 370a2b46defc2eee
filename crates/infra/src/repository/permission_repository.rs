//! # PermissionRepository
//!
//! テナントテーブルの id シーケンスに対する権限付与を担当する。
//!
//! テーブルは管理者が事前に作成するため、接続ロールには
//! シーケンスの `USAGE` / `SELECT` が付いていないことがある。
//! その場合 `INSERT` が失敗するので、テーブル作成後に一度だけ付与する。

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;
use todolist_domain::user::UserEmail;

use super::{qualified_name, quote_identifier, tenant_table};
use crate::{
    db::{ConnectionManager, Connector, PgConnector},
    error::InfraError,
};

/// 権限付与リポジトリトレイト
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// ユーザーのテナントテーブルのシーケンスに権限を付与する
    ///
    /// 付与したシーケンス名を返す。
    async fn grant_sequence_access(&self, email: &UserEmail) -> Result<String, InfraError>;
}

/// PostgreSQL 実装の PermissionRepository
pub struct PostgresPermissionRepository<C = PgConnector>
where
    C: Connector<Connection = PgConnection>,
{
    connections: Arc<ConnectionManager<C>>,
    grantee:     String,
}

impl<C> PostgresPermissionRepository<C>
where
    C: Connector<Connection = PgConnection>,
{
    /// `grantee` は権限を受け取るロール名
    pub fn new(connections: Arc<ConnectionManager<C>>, grantee: impl Into<String>) -> Self {
        Self {
            connections,
            grantee: grantee.into(),
        }
    }
}

/// GRANT 文を組み立てる
fn grant_statement(schema: &str, sequence: &str, grantee: &str) -> Result<String, InfraError> {
    if grantee.is_empty() || grantee.chars().any(char::is_control) {
        return Err(InfraError::unexpected("権限付与先のロール名が不正です"));
    }
    Ok(format!(
        "GRANT USAGE, SELECT ON SEQUENCE {} TO {}",
        qualified_name(schema, sequence),
        quote_identifier(grantee)
    ))
}

#[async_trait]
impl<C> PermissionRepository for PostgresPermissionRepository<C>
where
    C: Connector<Connection = PgConnection>,
{
    #[tracing::instrument(skip_all, fields(%email, table = tracing::field::Empty, grantee = %self.grantee))]
    async fn grant_sequence_access(&self, email: &UserEmail) -> Result<String, InfraError> {
        let table = tenant_table(email)?;
        let sequence = table.sequence_name();
        let sql = grant_statement(table.schema(), &sequence, &self.grantee)?;

        self.connections.execute(sqlx::query(&sql)).await?;

        tracing::info!(%sequence, "シーケンスの権限を付与しました");
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_grant文はシーケンスとロールをクォートする() {
        let sql = grant_statement("public", "jane_doe_lists_id_seq", "2025_vibe_coding").unwrap();

        assert_eq!(
            sql,
            r#"GRANT USAGE, SELECT ON SEQUENCE "public"."jane_doe_lists_id_seq" TO "2025_vibe_coding""#
        );
    }

    #[test]
    fn test_空のロール名は拒否する() {
        assert!(grant_statement("public", "x_lists_id_seq", "").is_err());
    }
}
