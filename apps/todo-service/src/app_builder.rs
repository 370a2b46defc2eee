//! # Todo Service アプリケーション構築
//!
//! State を受け取ってルーターを組み立てる。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::{path::Path, sync::Arc};

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::handler::{
    PermissionState,
    ReadinessState,
    TodoState,
    change_todo_status,
    create_todo,
    delete_todo,
    get_todo,
    health_check,
    list_todos,
    readiness_check,
    setup_permissions,
    update_todo,
};

/// ルーターを構築する
///
/// `static_dir` が指定されていれば `/` で `index.html` を、`/static` 配下で
/// ディレクトリ内のファイルを配信する。
pub fn build_app(
    todo_state: Arc<TodoState>,
    permission_state: Arc<PermissionState>,
    readiness_state: Arc<ReadinessState>,
    static_dir: Option<&Path>,
) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .merge(
            Router::new()
                .route("/health/ready", get(readiness_check))
                .with_state(readiness_state),
        )
        .merge(
            Router::new()
                .route("/api/setup-permissions", post(setup_permissions))
                .with_state(permission_state),
        )
        // To-Do API
        .route("/api/todos", get(list_todos).post(create_todo))
        .route(
            "/api/todos/{todo_id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/api/todos/{todo_id}/status", put(change_todo_status))
        .with_state(todo_state);

    let router = match static_dir {
        Some(dir) => router
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .nest_service("/static", ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}
