//! To-Do アイテム管理ユースケース
//!
//! 所有者以外のアイテムは存在しないものとして扱う（404）。

use std::sync::Arc;

use todolist_domain::{
    DomainError,
    todo::{Todo, TodoId, TodoStatus},
    user::UserEmail,
};
use todolist_infra::repository::TodoRepository;

use crate::error::TodoError;

/// アイテムのタイトルと説明
pub struct TodoContent {
    pub title:       String,
    pub description: String,
}

/// To-Do アイテム管理ユースケース
pub struct TodoUseCaseImpl {
    todo_repository: Arc<dyn TodoRepository>,
}

fn not_found(id: TodoId) -> TodoError {
    DomainError::NotFound {
        entity_type: "Todo",
        id:          id.to_string(),
    }
    .into()
}

impl TodoUseCaseImpl {
    pub fn new(todo_repository: Arc<dyn TodoRepository>) -> Self {
        Self { todo_repository }
    }

    /// アイテムを作成する（ステータスは `pending`）
    pub async fn create_todo(
        &self,
        email: &UserEmail,
        content: TodoContent,
    ) -> Result<Todo, TodoError> {
        let todo = self
            .todo_repository
            .create(email, &content.title, &content.description)
            .await?;
        Ok(todo)
    }

    /// アイテム一覧を取得する（作成日時の新しい順）
    pub async fn list_todos(
        &self,
        email: &UserEmail,
        include_completed: bool,
    ) -> Result<Vec<Todo>, TodoError> {
        let todos = self
            .todo_repository
            .find_all(email, include_completed)
            .await?;
        Ok(todos)
    }

    /// アイテムを取得する
    pub async fn get_todo(&self, email: &UserEmail, id: TodoId) -> Result<Todo, TodoError> {
        self.todo_repository
            .find_by_id(email, id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// タイトルと説明を更新する
    pub async fn update_todo(
        &self,
        email: &UserEmail,
        id: TodoId,
        content: TodoContent,
    ) -> Result<Todo, TodoError> {
        self.todo_repository
            .update(email, id, &content.title, &content.description)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// ステータスを変更する
    ///
    /// ステータスの値は検証しない。
    pub async fn change_status(
        &self,
        email: &UserEmail,
        id: TodoId,
        status: TodoStatus,
    ) -> Result<Todo, TodoError> {
        self.todo_repository
            .update_status(email, id, &status)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// アイテムを論理削除する
    pub async fn delete_todo(&self, email: &UserEmail, id: TodoId) -> Result<Todo, TodoError> {
        self.todo_repository
            .soft_delete(email, id)
            .await?
            .ok_or_else(|| not_found(id))
    }
}
