//! # Todo Service エラー定義
//!
//! Todo Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! | エラー | HTTP ステータス |
//! |--------|----------------|
//! | 識別子なし・メールアドレス不正・リクエスト不正 | 400 |
//! | アイテムが存在しない（所有者が異なる場合を含む） | 404 |
//! | 接続・資格情報・クエリの失敗 | 500（詳細は返さない） |

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use todolist_domain::DomainError;
use todolist_infra::{InfraError, InfraErrorKind};
use todolist_shared::ErrorResponse;

/// Todo Service で発生するエラー
#[derive(Debug, Error)]
pub enum TodoError {
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 入力値の検証失敗
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// インフラ層のエラー
    #[error("インフラエラー: {0}")]
    Infra(#[from] InfraError),
}

impl From<DomainError> for TodoError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            e @ DomainError::NotFound { .. } => Self::NotFound(e.to_string()),
        }
    }
}

impl From<JsonRejection> for TodoError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for TodoError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for TodoError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for TodoError {
    fn into_response(self) -> Response {
        let body = match self {
            TodoError::BadRequest(msg) => ErrorResponse::bad_request(msg),
            TodoError::Validation(msg) => ErrorResponse::validation_error(msg),
            TodoError::NotFound(msg) => ErrorResponse::not_found(msg),
            TodoError::Infra(e) => {
                let connection_failure = e.is_connection_failure();
                let (kind, span_trace) = e.into_parts();
                match kind {
                    // テナントテーブルを導出できないメールアドレスはクライアント起因
                    InfraErrorKind::InvalidInput(msg) => ErrorResponse::validation_error(msg),
                    kind if connection_failure => {
                        tracing::error!(
                            error = %kind,
                            span_trace = %span_trace,
                            "データベースに接続できないためクエリを実行していません"
                        );
                        ErrorResponse::internal_error()
                    }
                    kind => {
                        tracing::error!(
                            error = %kind,
                            span_trace = %span_trace,
                            "リクエストの処理に失敗しました"
                        );
                        ErrorResponse::internal_error()
                    }
                }
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn render(err: TodoError) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_foundは404になる() {
        let (status, body) = render(TodoError::NotFound("Todo not found".to_string())).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, ErrorResponse::not_found("Todo not found"));
    }

    #[tokio::test]
    async fn test_ドメインのバリデーションエラーは400になる() {
        let err: TodoError = DomainError::Validation("メールアドレスの形式が不正です".to_string()).into();

        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.detail, "メールアドレスの形式が不正です");
    }

    #[tokio::test]
    async fn test_インフラ層の入力エラーは400になる() {
        let err = TodoError::from(InfraError::invalid_input("テナントテーブル名が長すぎます"));

        let (status, _body) = render(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_接続失敗は詳細を隠して500になる() {
        let err = TodoError::from(InfraError::credential("401 Unauthorized: token=abc"));

        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, ErrorResponse::internal_error());
    }

    #[tokio::test]
    async fn test_クエリ失敗は500になる() {
        let err = TodoError::from(InfraError::from(sqlx::Error::RowNotFound));

        let (status, _body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
