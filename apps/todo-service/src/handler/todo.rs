//! # To-Do ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/todos` - アイテム作成
//! - `GET /api/todos?include_completed=bool` - アイテム一覧
//! - `GET /api/todos/{todo_id}` - アイテム取得
//! - `PUT /api/todos/{todo_id}` - タイトルと説明の更新
//! - `PUT /api/todos/{todo_id}/status` - ステータス変更
//! - `DELETE /api/todos/{todo_id}` - 論理削除
//!
//! すべてのエンドポイントは `X-Forwarded-Email`（または `MY_EMAIL`）で
//! 特定したユーザーのアイテムのみを扱う。

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path,
        Query,
        State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use todolist_domain::todo::{Todo, TodoId, TodoStatus};
use todolist_shared::ApiResponse;

use crate::{
    error::TodoError,
    identity::IdentityResolver,
    usecase::{TodoContent, TodoUseCaseImpl},
};

/// To-Do API の共有状態
pub struct TodoState {
    pub usecase:  TodoUseCaseImpl,
    pub identity: IdentityResolver,
}

// --- リクエスト/レスポンス型 ---

/// 一覧のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct ListTodosQuery {
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub include_completed: bool,
}

/// クエリ文字列の真偽値
///
/// `true`/`false` に加えて `1`/`0`、`yes`/`no`、`on`/`off`、`t`/`f`、`y`/`n` を
/// 受け付ける（大文字小文字は区別しない）。それ以外は 400 になる。
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Ok(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Ok(false),
        _ => Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&value),
            &"a boolean",
        )),
    }
}

/// 作成・更新リクエスト
#[derive(Debug, Deserialize)]
pub struct TodoContentRequest {
    pub title:       String,
    #[serde(default)]
    pub description: String,
}

impl From<TodoContentRequest> for TodoContent {
    fn from(req: TodoContentRequest) -> Self {
        Self {
            title:       req.title,
            description: req.description,
        }
    }
}

/// ステータス変更リクエスト
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TodoStatus,
}

/// アイテム DTO
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TodoDto {
    pub id:          i64,
    pub user_email:  String,
    pub title:       String,
    pub description: String,
    pub status:      String,
    pub created_at:  String,
    pub updated_at:  String,
}

impl From<&Todo> for TodoDto {
    fn from(todo: &Todo) -> Self {
        Self {
            id:          todo.id().as_i64(),
            user_email:  todo.user_email().to_string(),
            title:       todo.title().to_string(),
            description: todo.description().to_string(),
            status:      todo.status().to_string(),
            created_at:  todo.created_at().to_rfc3339(),
            updated_at:  todo.updated_at().to_rfc3339(),
        }
    }
}

/// 削除レスポンス
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DeleteTodoResponse {
    pub message: String,
    pub todo:    TodoDto,
}

// --- ハンドラ ---

/// POST /api/todos
///
/// ## レスポンス
///
/// - `201 Created`: 作成されたアイテム
/// - `400 Bad Request`: ユーザーを特定できない、リクエスト不正
#[tracing::instrument(skip_all)]
pub async fn create_todo(
    State(state): State<Arc<TodoState>>,
    headers: HeaderMap,
    body: Result<Json<TodoContentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let email = state.identity.resolve(&headers)?;
    let Json(req) = body?;

    let todo = state.usecase.create_todo(&email, req.into()).await?;

    let response = ApiResponse::new(TodoDto::from(&todo));
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/todos
///
/// `include_completed=false`（既定）では `deleted` のアイテムを除外する。
#[tracing::instrument(skip_all)]
pub async fn list_todos(
    State(state): State<Arc<TodoState>>,
    headers: HeaderMap,
    query: Result<Query<ListTodosQuery>, QueryRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let email = state.identity.resolve(&headers)?;
    let Query(query) = query?;

    let todos = state
        .usecase
        .list_todos(&email, query.include_completed)
        .await?;

    let items: Vec<TodoDto> = todos.iter().map(TodoDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// GET /api/todos/{todo_id}
#[tracing::instrument(skip_all)]
pub async fn get_todo(
    State(state): State<Arc<TodoState>>,
    headers: HeaderMap,
    todo_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let email = state.identity.resolve(&headers)?;
    let Path(todo_id) = todo_id?;

    let todo = state
        .usecase
        .get_todo(&email, TodoId::from_i64(todo_id))
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(TodoDto::from(&todo)))))
}

/// PUT /api/todos/{todo_id}
///
/// ## レスポンス
///
/// - `200 OK`: 更新後のアイテム
/// - `404 Not Found`: アイテムが存在しない
#[tracing::instrument(skip_all)]
pub async fn update_todo(
    State(state): State<Arc<TodoState>>,
    headers: HeaderMap,
    todo_id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TodoContentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let email = state.identity.resolve(&headers)?;
    let Path(todo_id) = todo_id?;
    let Json(req) = body?;

    let todo = state
        .usecase
        .update_todo(&email, TodoId::from_i64(todo_id), req.into())
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(TodoDto::from(&todo)))))
}

/// PUT /api/todos/{todo_id}/status
#[tracing::instrument(skip_all)]
pub async fn change_todo_status(
    State(state): State<Arc<TodoState>>,
    headers: HeaderMap,
    todo_id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let email = state.identity.resolve(&headers)?;
    let Path(todo_id) = todo_id?;
    let Json(req) = body?;

    let todo = state
        .usecase
        .change_status(&email, TodoId::from_i64(todo_id), req.status)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(TodoDto::from(&todo)))))
}

/// DELETE /api/todos/{todo_id}
///
/// 論理削除。行は残り、ID での取得は引き続き可能。
#[tracing::instrument(skip_all)]
pub async fn delete_todo(
    State(state): State<Arc<TodoState>>,
    headers: HeaderMap,
    todo_id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, TodoError> {
    let email = state.identity.resolve(&headers)?;
    let Path(todo_id) = todo_id?;

    let todo = state
        .usecase
        .delete_todo(&email, TodoId::from_i64(todo_id))
        .await?;

    let response = ApiResponse::new(DeleteTodoResponse {
        message: "Todo deleted".to_string(),
        todo:    TodoDto::from(&todo),
    });
    Ok((StatusCode::OK, Json(response)))
}
