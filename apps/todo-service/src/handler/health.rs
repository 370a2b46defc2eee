//! # ヘルスチェックハンドラ
//!
//! ## エンドポイント
//!
//! ```text
//! GET /health        プロセスの生存確認
//! GET /health/ready  データベースに問い合わせできるかの確認
//! ```
//!
//! Readiness Check は共有コネクションを使うため、未接続なら資格情報の
//! 発行と接続を伴う。

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::PgConnection;
use todolist_infra::{
    InfraError,
    db::{ConnectionManager, Connector},
};
use todolist_shared::{CheckStatus, HealthResponse, ReadinessResponse};

/// 依存サービスの疎通確認
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self) -> Result<(), InfraError>;
}

#[async_trait]
impl<C> ReadinessProbe for ConnectionManager<C>
where
    C: Connector<Connection = PgConnection>,
{
    async fn check(&self) -> Result<(), InfraError> {
        self.ping().await
    }
}

/// Readiness Check の共有状態
pub struct ReadinessState {
    pub database: Arc<dyn ReadinessProbe>,
}

/// ヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

/// Readiness Check エンドポイント
///
/// 失敗時は 503 を返す。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let database = match state.database.check().await {
        Ok(()) => CheckStatus::Ok,
        Err(e) => {
            tracing::warn!(error = %e, "データベースの Readiness Check に失敗しました");
            CheckStatus::Error
        }
    };

    let response = ReadinessResponse::from_checks(BTreeMap::from([(
        "database".to_string(),
        database,
    )]));
    let status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;

    struct StubProbe {
        healthy: bool,
    }

    #[async_trait]
    impl ReadinessProbe for StubProbe {
        async fn check(&self) -> Result<(), InfraError> {
            if self.healthy {
                Ok(())
            } else {
                Err(InfraError::credential("発行元が応答しません"))
            }
        }
    }

    fn create_test_app(healthy: bool) -> Router {
        let state = Arc::new(ReadinessState {
            database: Arc::new(StubProbe { healthy }),
        });
        Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .with_state(state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_healthはhealthyとバージョンを返す() {
        let (status, body) = get_json(create_test_app(true), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_データベースに接続できればready() {
        let (status, body) = get_json(create_test_app(true), "/health/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({ "status": "ready", "checks": { "database": "ok" } })
        );
    }

    #[tokio::test]
    async fn test_データベースに接続できなければ503() {
        let (status, body) = get_json(create_test_app(false), "/health/ready").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["database"], "error");
    }
}
