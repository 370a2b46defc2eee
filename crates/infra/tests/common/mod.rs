//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するヘルパー。
//! Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Connection, PgConnection, PgPool, postgres::PgConnectOptions};
use todolist_domain::{clock::SystemClock, tenant::TenantTable, user::UserEmail};
use todolist_infra::{
    InfraError,
    db::{ConnectionManager, Connector},
};

/// テスト用データベースの接続オプションをそのまま使う Connector
pub struct TestConnector {
    options: PgConnectOptions,
}

#[async_trait]
impl Connector for TestConnector {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection, InfraError> {
        PgConnection::connect_with(&self.options)
            .await
            .map_err(InfraError::connect)
    }

    async fn close(&self, connection: PgConnection) {
        let _ = connection.close().await;
    }
}

/// `#[sqlx::test]` が用意したデータベースに接続するマネージャを作る
pub fn connection_manager(pool: &PgPool) -> Arc<ConnectionManager<TestConnector>> {
    let connector = TestConnector {
        options: (*pool.connect_options()).clone(),
    };
    Arc::new(ConnectionManager::new(connector, Arc::new(SystemClock)))
}

pub fn email(value: &str) -> UserEmail {
    UserEmail::new(value).unwrap()
}

/// ユーザーのテナントテーブルを作成する
///
/// 本番では管理者が事前に作成するテーブルと同じ形にする。
/// テーブル名の `"` は `""` にエスケープする。
pub async fn create_tenant_table(pool: &PgPool, email: &UserEmail) {
    let table = TenantTable::from_email(email).unwrap();
    let sql = format!(
        r#"
        CREATE TABLE "public"."{}" (
            id          serial PRIMARY KEY,
            user_email  text NOT NULL,
            title       text NOT NULL,
            description text,
            status      text NOT NULL DEFAULT 'pending',
            created_at  timestamp NOT NULL DEFAULT now(),
            updated_at  timestamp NOT NULL DEFAULT now()
        )
        "#,
        table.table_name().replace('"', "\"\"")
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .expect("テナントテーブルの作成に失敗");
}
