//! # データベースコネクション管理
//!
//! プロセスで 1 本だけ持つ共有コネクションの作成・再作成・クローズを行う。
//!
//! ## 状態遷移
//!
//! ```text
//! {未接続} ──acquire──▶ 資格情報の発行 → 接続 ──▶ {接続済み, age=0}
//!                                                    │
//!     acquire 時に age > 59 分なら close ──▶ {未接続} ──▶ 再接続
//! ```
//!
//! 資格情報（パスワード）はおよそ 1 時間で失効するため、59 分を超えた
//! コネクションはクエリ実行前に作り直す。
//!
//! ## 排他制御
//!
//! コネクションは `tokio::sync::Mutex` の内側にある。期限判定・クローズ・
//! 再接続はロックを保持したまま行うため、同時リクエストが二重に作り直す
//! ことはない。クエリの実行もこのロックで直列化される。
//!
//! ## トランザクション
//!
//! 明示的なトランザクションは張らない。各ステートメントは PostgreSQL の
//! 自動コミットで確定する。
//!
//! ## 失敗時の挙動
//!
//! 資格情報の発行または接続に失敗した場合、呼び出しはエラーになり
//! クエリは実行されない。失敗したコネクションは保持しないため、
//! 次の呼び出しで再度作成を試みる。呼び出し内でのリトライはしない。
//!
//! クエリが通信エラー（`Io` / `Protocol`）で失敗した場合も同様に、
//! コネクションを閉じて手放す。その呼び出しはエラーを返し、次の呼び出しで
//! 作り直す。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::ExposeSecret;
use sqlx::{
    Connection,
    FromRow,
    PgConnection,
    Postgres,
    postgres::{PgArguments, PgConnectOptions, PgRow, PgSslMode},
    query::{Query, QueryAs},
};
use todolist_domain::clock::Clock;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::{credential::CredentialIssuer, error::InfraError};

/// コネクションの既定の寿命（分）
pub const DEFAULT_MAX_AGE_MINUTES: i64 = 59;

// =============================================================================
// Connector
// =============================================================================

/// コネクションの作成・クローズを担うトレイト
///
/// 本番では [`PgConnector`]、テストではフェイクを使う。
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Send;

    /// 新しいコネクションを作成する
    async fn connect(&self) -> Result<Self::Connection, InfraError>;

    /// コネクションを閉じる
    ///
    /// 失敗しても呼び出し元には返さない（捨てるコネクションのため）。
    async fn close(&self, connection: Self::Connection);
}

/// 資格情報以外の接続設定
#[derive(Debug, Clone)]
pub struct ConnectSettings {
    database: String,
    username: String,
    port:     u16,
    ssl_mode: PgSslMode,
}

impl ConnectSettings {
    /// ポート 5432、`sslmode=require` で設定を作成する
    pub fn new(database: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            username: username.into(),
            port:     5432,
            ssl_mode: PgSslMode::Require,
        }
    }

    pub fn with_port(self, port: u16) -> Self {
        Self { port, ..self }
    }

    pub fn with_ssl_mode(self, ssl_mode: PgSslMode) -> Self {
        Self { ssl_mode, ..self }
    }
}

/// PostgreSQL 用 Connector
///
/// 接続のたびに資格情報を発行し直す。
pub struct PgConnector {
    issuer:   Arc<dyn CredentialIssuer>,
    settings: ConnectSettings,
}

impl PgConnector {
    pub fn new(issuer: Arc<dyn CredentialIssuer>, settings: ConnectSettings) -> Self {
        Self { issuer, settings }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgConnection;

    #[tracing::instrument(skip_all, level = "debug", fields(database = %self.settings.database))]
    async fn connect(&self) -> Result<PgConnection, InfraError> {
        let credential = self.issuer.issue().await?;

        let options = PgConnectOptions::new()
            .host(&credential.host)
            .port(self.settings.port)
            .username(&self.settings.username)
            .password(credential.token.expose_secret())
            .database(&self.settings.database)
            .ssl_mode(self.settings.ssl_mode);

        PgConnection::connect_with(&options)
            .await
            .map_err(InfraError::connect)
    }

    async fn close(&self, connection: PgConnection) {
        if let Err(e) = connection.close().await {
            tracing::warn!(error = %e, "コネクションのクローズに失敗しました");
        }
    }
}

// =============================================================================
// ConnectionManager
// =============================================================================

/// 作成時刻付きのコネクション
struct ManagedConnection<T> {
    connection: T,
    created_at: DateTime<Utc>,
}

/// 共有コネクションの貸し出し
///
/// 生存中はマネージャのロックを保持する。クエリを終えたらすぐに手放すこと。
pub type ConnectionLease<'a, T> = MappedMutexGuard<'a, T>;

/// 単一の共有コネクションを管理する
///
/// プロセス全体のシングルトンではなく、`Arc` で明示的に受け渡す。
pub struct ConnectionManager<C: Connector> {
    connector: C,
    clock:     Arc<dyn Clock>,
    max_age:   TimeDelta,
    slot:      Mutex<Option<ManagedConnection<C::Connection>>>,
}

impl<C: Connector> ConnectionManager<C> {
    /// 未接続の状態でマネージャを作成する
    ///
    /// 最初の [`acquire`](Self::acquire) までは接続しない。
    pub fn new(connector: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            connector,
            clock,
            max_age: TimeDelta::minutes(DEFAULT_MAX_AGE_MINUTES),
            slot: Mutex::new(None),
        }
    }

    /// コネクションの寿命を変更する
    pub fn with_max_age(self, max_age: TimeDelta) -> Self {
        Self { max_age, ..self }
    }

    /// 共有コネクションを借りる
    ///
    /// 未接続なら接続し、寿命を超えていれば閉じて作り直してから返す。
    pub async fn acquire(&self) -> Result<ConnectionLease<'_, C::Connection>, InfraError> {
        let slot = self.lock_connected().await?;
        MutexGuard::try_map(slot, |slot| slot.as_mut().map(|m| &mut m.connection))
            .map_err(|_| not_connected())
    }

    /// 保持しているコネクションを閉じる
    ///
    /// グレースフルシャットダウン時に呼ぶ。閉じた後に `acquire` すると再接続する。
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(current) = slot.take() {
            self.connector.close(current.connection).await;
            tracing::info!("データベースコネクションを閉じました");
        }
    }

    /// ロックを取り、接続済みのスロットを返す
    async fn lock_connected(&self) -> Result<MutexGuard<'_, Slot<C::Connection>>, InfraError> {
        let mut slot = self.slot.lock().await;

        let now = self.clock.now();
        let expired = slot
            .as_ref()
            .is_some_and(|current| now - current.created_at > self.max_age);

        if expired && let Some(stale) = slot.take() {
            tracing::info!(
                age_minutes = (now - stale.created_at).num_minutes(),
                "コネクションの寿命を超えたため作り直します"
            );
            self.connector.close(stale.connection).await;
        }

        if slot.is_none() {
            let connection = self.connector.connect().await?;
            *slot = Some(ManagedConnection {
                connection,
                created_at: self.clock.now(),
            });
            tracing::info!("データベースコネクションを作成しました");
        }

        Ok(slot)
    }

    /// クエリ結果を確定する
    ///
    /// 通信エラーで失敗した場合はコネクションを破棄し、次の呼び出しで
    /// 作り直す。この呼び出しはエラーのまま返す。
    async fn settle<T>(
        &self,
        slot: &mut Slot<C::Connection>,
        result: Result<T, sqlx::Error>,
    ) -> Result<T, InfraError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connection_lost(&e)
                    && let Some(broken) = slot.take()
                {
                    tracing::warn!(error = %e, "コネクションが切断されたため破棄します");
                    self.connector.close(broken.connection).await;
                }
                Err(e.into())
            }
        }
    }
}

type Slot<T> = Option<ManagedConnection<T>>;

fn connection_mut<T>(slot: &mut Slot<T>) -> Result<&mut T, InfraError> {
    slot.as_mut()
        .map(|m| &mut m.connection)
        .ok_or_else(not_connected)
}

fn not_connected() -> InfraError {
    InfraError::unexpected("コネクションが確立されていません")
}

/// サーバーとの通信が途絶えたことを示すエラーか
fn is_connection_lost(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Io(_) | sqlx::Error::Protocol(_))
}

impl<C> ConnectionManager<C>
where
    C: Connector<Connection = PgConnection>,
{
    /// クエリを実行し、全行を返す
    pub async fn fetch_all<'q, O>(
        &self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Vec<O>, InfraError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        let mut slot = self.lock_connected().await?;
        let result = query.fetch_all(connection_mut(&mut slot)?).await;
        self.settle(&mut slot, result).await
    }

    /// クエリを実行し、先頭行を返す（0 行なら `None`）
    pub async fn fetch_optional<'q, O>(
        &self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Option<O>, InfraError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        let mut slot = self.lock_connected().await?;
        let result = query.fetch_optional(connection_mut(&mut slot)?).await;
        self.settle(&mut slot, result).await
    }

    /// 行を返さないステートメントを実行し、影響行数を返す
    pub async fn execute<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> Result<u64, InfraError> {
        let mut slot = self.lock_connected().await?;
        let result = query.execute(connection_mut(&mut slot)?).await;
        self.settle(&mut slot, result)
            .await
            .map(|done| done.rows_affected())
    }

    /// コネクションが生きているか確認する（Readiness Check 用）
    pub async fn ping(&self) -> Result<(), InfraError> {
        let mut slot = self.lock_connected().await?;
        let result = connection_mut(&mut slot)?.ping().await;
        self.settle(&mut slot, result).await
    }
}
