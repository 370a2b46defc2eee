//! # 権限設定ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/setup-permissions` - ユーザーのテナントテーブルのシーケンスに
//!   接続ロールの権限を付与する
//!
//! 管理者がテナントテーブルを作成した後に一度だけ呼ぶ。

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use todolist_shared::ApiResponse;

use crate::{error::TodoError, identity::IdentityResolver, usecase::PermissionUseCaseImpl};

/// 権限設定 API の共有状態
pub struct PermissionState {
    pub usecase:  PermissionUseCaseImpl,
    pub identity: IdentityResolver,
}

/// 権限設定レスポンス
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SetupPermissionsResponse {
    pub message:  String,
    pub sequence: String,
}

/// POST /api/setup-permissions
#[tracing::instrument(skip_all)]
pub async fn setup_permissions(
    State(state): State<Arc<PermissionState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, TodoError> {
    let email = state.identity.resolve(&headers)?;

    let sequence = state.usecase.setup_permissions(&email).await?;

    let response = ApiResponse::new(SetupPermissionsResponse {
        message: format!("Permissions granted on sequence {sequence}"),
        sequence,
    });
    Ok((StatusCode::OK, Json(response)))
}
