//! # Todo Service サーバー
//!
//! ユーザーごとの To-Do リストを管理する HTTP サービス。
//!
//! ## 構成
//!
//! ```text
//! ┌──────────────┐  X-Forwarded-Email  ┌──────────────┐     ┌──────────────┐
//! │ Reverse Proxy│────────────────────▶│ Todo Service │────▶│  PostgreSQL  │
//! └──────────────┘                     └──────────────┘     └──────────────┘
//!                                             │ 資格情報の発行
//!                                             ▼
//!                                      ┌──────────────┐
//!                                      │  Workspace   │
//!                                      └──────────────┘
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `TODO_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `TODO_PORT` | No | ポート番号（デフォルト: `8000`） |
//! | `MY_EMAIL` | No | ヘッダがない場合のメールアドレス |
//! | `STATIC_DIR` | No | フロントエンドの配信ディレクトリ |
//! | `DATABASE_NAME` | **Yes** | データベース名（`LAKEBASE_DB_NAME` でも可） |
//! | `DATABASE_USER` | No | 接続ロール（デフォルト: `2025_vibe_coding`） |
//! | `DATABASE_HOST` / `DATABASE_PASSWORD` | No | 両方あれば固定の資格情報で接続 |
//! | `DATABRICKS_HOST` ほか | 固定でない場合 | 資格情報の発行元 |
//!
//! 全項目は [`config`](todolist_service::config) を参照。
//!
//! ## 起動方法
//!
//! ```bash
//! DATABASE_NAME=todos DATABASE_HOST=localhost DATABASE_PASSWORD=postgres \
//!   DATABASE_SSL_MODE=disable cargo run -p todolist-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use secrecy::ExposeSecret;
use todolist_domain::clock::SystemClock;
use todolist_infra::{
    credential::{CredentialIssuer, StaticCredentialIssuer, WorkspaceCredentialIssuer},
    db::{ConnectSettings, ConnectionManager, PgConnector},
    repository::{PostgresPermissionRepository, PostgresTodoRepository},
};
use todolist_service::{
    app_builder::build_app,
    config::{CredentialConfig, TodoConfig},
    handler::{PermissionState, ReadinessState, TodoState},
    identity::IdentityResolver,
    usecase::{PermissionUseCaseImpl, TodoUseCaseImpl},
};
use todolist_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("todo-service"));

    let config = TodoConfig::from_env().context("設定の読み込みに失敗しました")?;

    let issuer: Arc<dyn CredentialIssuer> = match config.database.credentials {
        CredentialConfig::Static { host, password } => {
            tracing::info!(%host, "固定の資格情報で接続します");
            Arc::new(StaticCredentialIssuer::new(host, password.expose_secret()))
        }
        CredentialConfig::Workspace(settings) => {
            tracing::info!(instance = %settings.instance_name, "ワークスペースから資格情報を発行します");
            Arc::new(WorkspaceCredentialIssuer::new(settings))
        }
    };

    // コネクションは最初のクエリで作成される
    let settings = ConnectSettings::new(&config.database.name, &config.database.user)
        .with_port(config.database.port)
        .with_ssl_mode(config.database.ssl_mode);
    let connections = Arc::new(
        ConnectionManager::new(PgConnector::new(issuer, settings), Arc::new(SystemClock))
            .with_max_age(config.database.max_age),
    );

    // 依存コンポーネントを初期化
    let identity = IdentityResolver::new(config.my_email.clone());
    let todo_state = Arc::new(TodoState {
        usecase:  TodoUseCaseImpl::new(Arc::new(PostgresTodoRepository::new(connections.clone()))),
        identity: identity.clone(),
    });
    let permission_state = Arc::new(PermissionState {
        usecase: PermissionUseCaseImpl::new(Arc::new(PostgresPermissionRepository::new(
            connections.clone(),
            &config.database.user,
        ))),
        identity,
    });
    let readiness_state = Arc::new(ReadinessState {
        database: connections.clone(),
    });

    let app = build_app(
        todo_state,
        permission_state,
        readiness_state,
        config.static_dir.as_deref(),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("バインドアドレスが不正です")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("{addr} にバインドできません"))?;
    tracing::info!("Todo Service サーバーを起動します: {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("サーバーが異常終了しました")?;

    connections.close().await;
    tracing::info!("Todo Service サーバーを停止しました");
    Ok(())
}

/// Ctrl+C または SIGTERM を待つ
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C ハンドラを登録できません");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM ハンドラを登録できません");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Ctrl+C を受信しました"),
        () = terminate => tracing::info!("SIGTERM を受信しました"),
    }
}
