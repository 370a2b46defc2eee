//! # TodoRepository
//!
//! To-Do アイテムの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **テナントテーブル**: クエリ先のテーブルはメールアドレスから導出した
//!   `"public"."<prefix>_lists"`。テーブルが存在しない場合はデータベースエラーになる
//! - **二重の絞り込み**: テーブルに加えて `user_email = $n` を必ず指定する
//! - **論理削除**: 削除はステータスを `deleted` にするだけで行は残る
//! - **自動コミット**: 各操作は単一のステートメントで完結する
//!
//! 日時はデータベースの `now()` で設定し、`RETURNING` で結果の行を受け取る。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use todolist_domain::{
    tenant::TenantTable,
    todo::{Todo, TodoId, TodoStatus},
    user::UserEmail,
};

use super::{qualified_name, tenant_table};
use crate::{
    db::{ConnectionManager, Connector, PgConnector},
    error::InfraError,
};

/// SELECT / RETURNING で取得する列
///
/// 列の型がテーブルごとに多少異なっても同じ Rust の型で受け取れるよう、
/// ここで型を揃える。
const TODO_COLUMNS: &str = "\
    id::bigint AS id, \
    user_email, \
    title, \
    COALESCE(description, '') AS description, \
    status::text AS status, \
    created_at::timestamptz AS created_at, \
    updated_at::timestamptz AS updated_at";

/// To-Do リポジトリトレイト
///
/// すべての操作はメールアドレスで決まるテナントテーブルに閉じる。
#[async_trait]
pub trait TodoRepository: Send + Sync {
    /// アイテムを `pending` で作成し、作成した行を返す
    async fn create(
        &self,
        email: &UserEmail,
        title: &str,
        description: &str,
    ) -> Result<Todo, InfraError>;

    /// 作成日時の新しい順に一覧を取得する
    ///
    /// `include_completed` が `false` の場合は `deleted` のアイテムのみを除外する。
    /// `completed` のアイテムは除外されない。
    async fn find_all(
        &self,
        email: &UserEmail,
        include_completed: bool,
    ) -> Result<Vec<Todo>, InfraError>;

    /// ID でアイテムを取得する（`deleted` のアイテムも返す）
    async fn find_by_id(&self, email: &UserEmail, id: TodoId) -> Result<Option<Todo>, InfraError>;

    /// タイトルと説明を更新する
    ///
    /// 該当するアイテムがない場合は `None` を返す。
    async fn update(
        &self,
        email: &UserEmail,
        id: TodoId,
        title: &str,
        description: &str,
    ) -> Result<Option<Todo>, InfraError>;

    /// ステータスを更新する（値は検証しない）
    async fn update_status(
        &self,
        email: &UserEmail,
        id: TodoId,
        status: &TodoStatus,
    ) -> Result<Option<Todo>, InfraError>;

    /// ステータスを `deleted` にする
    async fn soft_delete(&self, email: &UserEmail, id: TodoId) -> Result<Option<Todo>, InfraError>;
}

/// テナントテーブルの行
#[derive(Debug, sqlx::FromRow)]
struct TodoRow {
    id:          i64,
    user_email:  String,
    title:       String,
    description: String,
    status:      String,
    created_at:  DateTime<Utc>,
    updated_at:  DateTime<Utc>,
}

impl TryFrom<TodoRow> for Todo {
    type Error = InfraError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let user_email = UserEmail::new(row.user_email).map_err(|e| {
            InfraError::unexpected(format!("不正な user_email が格納されています: {e}"))
        })?;

        Ok(Todo::from_db(
            TodoId::from_i64(row.id),
            user_email,
            row.title,
            row.description,
            TodoStatus::from(row.status),
            row.created_at,
            row.updated_at,
        ))
    }
}

fn to_todo(row: Option<TodoRow>) -> Result<Option<Todo>, InfraError> {
    row.map(Todo::try_from).transpose()
}

/// クォート済みのテーブル名
fn table_ref(table: &TenantTable) -> String {
    qualified_name(table.schema(), &table.table_name())
}

/// PostgreSQL 実装の TodoRepository
pub struct PostgresTodoRepository<C = PgConnector>
where
    C: Connector<Connection = PgConnection>,
{
    connections: Arc<ConnectionManager<C>>,
}

impl<C> PostgresTodoRepository<C>
where
    C: Connector<Connection = PgConnection>,
{
    /// 新しいリポジトリインスタンスを作成
    pub fn new(connections: Arc<ConnectionManager<C>>) -> Self {
        Self { connections }
    }
}

#[async_trait]
impl<C> TodoRepository for PostgresTodoRepository<C>
where
    C: Connector<Connection = PgConnection>,
{
    #[tracing::instrument(skip_all, level = "debug", fields(%email, table = tracing::field::Empty))]
    async fn create(
        &self,
        email: &UserEmail,
        title: &str,
        description: &str,
    ) -> Result<Todo, InfraError> {
        let table = tenant_table(email)?;
        let sql = format!(
            "INSERT INTO {} (user_email, title, description, status, created_at, updated_at) \
             VALUES ($1, $2, $3, 'pending', now(), now()) \
             RETURNING {TODO_COLUMNS}",
            table_ref(&table)
        );

        let row = self
            .connections
            .fetch_optional(
                sqlx::query_as::<_, TodoRow>(&sql)
                    .bind(email.as_str())
                    .bind(title)
                    .bind(description),
            )
            .await?;

        to_todo(row)?.ok_or_else(|| InfraError::unexpected("INSERT が行を返しませんでした"))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%email, table = tracing::field::Empty, include_completed))]
    async fn find_all(
        &self,
        email: &UserEmail,
        include_completed: bool,
    ) -> Result<Vec<Todo>, InfraError> {
        let table = tenant_table(email)?;
        let status_filter = if include_completed {
            ""
        } else {
            " AND status <> 'deleted'"
        };
        let sql = format!(
            "SELECT {TODO_COLUMNS} FROM {} \
             WHERE user_email = $1{status_filter} \
             ORDER BY created_at DESC",
            table_ref(&table)
        );

        let rows = self
            .connections
            .fetch_all(sqlx::query_as::<_, TodoRow>(&sql).bind(email.as_str()))
            .await?;

        rows.into_iter().map(Todo::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%email, table = tracing::field::Empty, %id))]
    async fn find_by_id(&self, email: &UserEmail, id: TodoId) -> Result<Option<Todo>, InfraError> {
        let table = tenant_table(email)?;
        let sql = format!(
            "SELECT {TODO_COLUMNS} FROM {} WHERE id = $1 AND user_email = $2",
            table_ref(&table)
        );

        let row = self
            .connections
            .fetch_optional(
                sqlx::query_as::<_, TodoRow>(&sql)
                    .bind(id.as_i64())
                    .bind(email.as_str()),
            )
            .await?;

        to_todo(row)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%email, table = tracing::field::Empty, %id))]
    async fn update(
        &self,
        email: &UserEmail,
        id: TodoId,
        title: &str,
        description: &str,
    ) -> Result<Option<Todo>, InfraError> {
        let table = tenant_table(email)?;
        let sql = format!(
            "UPDATE {} SET title = $1, description = $2, updated_at = now() \
             WHERE id = $3 AND user_email = $4 \
             RETURNING {TODO_COLUMNS}",
            table_ref(&table)
        );

        let row = self
            .connections
            .fetch_optional(
                sqlx::query_as::<_, TodoRow>(&sql)
                    .bind(title)
                    .bind(description)
                    .bind(id.as_i64())
                    .bind(email.as_str()),
            )
            .await?;

        to_todo(row)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%email, table = tracing::field::Empty, %id, %status))]
    async fn update_status(
        &self,
        email: &UserEmail,
        id: TodoId,
        status: &TodoStatus,
    ) -> Result<Option<Todo>, InfraError> {
        let table = tenant_table(email)?;
        let sql = format!(
            "UPDATE {} SET status = $1, updated_at = now() \
             WHERE id = $2 AND user_email = $3 \
             RETURNING {TODO_COLUMNS}",
            table_ref(&table)
        );

        let row = self
            .connections
            .fetch_optional(
                sqlx::query_as::<_, TodoRow>(&sql)
                    .bind(status.as_str())
                    .bind(id.as_i64())
                    .bind(email.as_str()),
            )
            .await?;

        to_todo(row)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%email, table = tracing::field::Empty, %id))]
    async fn soft_delete(&self, email: &UserEmail, id: TodoId) -> Result<Option<Todo>, InfraError> {
        self.update_status(email, id, &TodoStatus::Deleted).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row(user_email: &str, status: &str) -> TodoRow {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        TodoRow {
            id: 7,
            user_email: user_email.to_string(),
            title: "牛乳を買う".to_string(),
            description: String::new(),
            status: status.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_行からアイテムに変換できる() {
        let todo = Todo::try_from(row("jane.doe@example.com", "archived")).unwrap();

        assert_eq!(todo.id(), TodoId::from_i64(7));
        assert_eq!(todo.user_email().as_str(), "jane.doe@example.com");
        assert_eq!(todo.status(), &TodoStatus::Other("archived".to_string()));
    }

    #[test]
    fn test_不正なuser_emailの行は予期しないエラーになる() {
        assert!(Todo::try_from(row("", "pending")).is_err());
    }

    #[test]
    fn test_テーブル参照はスキーマ付きでクォートされる() {
        let email = UserEmail::new("Jane.Doe@example.com").unwrap();
        let table = TenantTable::from_email(&email).unwrap();

        assert_eq!(table_ref(&table), r#""public"."jane_doe_lists""#);
    }

    #[test]
    fn test_postgres_todo_repositoryはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresTodoRepository>();
    }
}
