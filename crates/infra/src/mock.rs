//! # テスト用モックリポジトリ
//!
//! ユースケース・ハンドラのテストで使用するインメモリモックリポジトリ。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! todolist-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! テナントテーブルごとに行を保持し、`user_email` でも絞り込む。
//! ID はテーブルごとの連番で、PostgreSQL の `serial` と同じく 1 から振る。

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use todolist_domain::{
    clock::Clock,
    tenant::TenantTable,
    todo::{Todo, TodoId, TodoStatus},
    user::UserEmail,
};

use crate::{
    error::InfraError,
    repository::{PermissionRepository, TodoRepository, tenant_table},
};

// ===== MockTodoRepository =====

#[derive(Default)]
struct TenantRows {
    rows:    Vec<Todo>,
    last_id: i64,
}

#[derive(Clone)]
pub struct MockTodoRepository {
    tables: Arc<Mutex<HashMap<TenantTable, TenantRows>>>,
    clock:  Arc<dyn Clock>,
}

impl MockTodoRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// 一致する行を変更して返す
    fn modify(
        &self,
        email: &UserEmail,
        id: TodoId,
        f: impl FnOnce(Todo) -> Todo,
    ) -> Result<Option<Todo>, InfraError> {
        let table = tenant_table(email)?;
        let mut tables = self.tables.lock().unwrap();
        let Some(tenant) = tables.get_mut(&table) else {
            return Ok(None);
        };
        let Some(slot) = tenant
            .rows
            .iter_mut()
            .find(|t| t.id() == id && t.user_email() == email)
        else {
            return Ok(None);
        };

        let updated = f(slot.clone());
        *slot = updated.clone();
        Ok(Some(updated))
    }
}

#[async_trait]
impl TodoRepository for MockTodoRepository {
    async fn create(
        &self,
        email: &UserEmail,
        title: &str,
        description: &str,
    ) -> Result<Todo, InfraError> {
        let table = tenant_table(email)?;
        let mut tables = self.tables.lock().unwrap();
        let tenant = tables.entry(table).or_default();
        tenant.last_id += 1;

        let todo = Todo::new(
            TodoId::from_i64(tenant.last_id),
            email.clone(),
            title.to_string(),
            description.to_string(),
            self.clock.now(),
        );
        tenant.rows.push(todo.clone());
        Ok(todo)
    }

    async fn find_all(
        &self,
        email: &UserEmail,
        include_completed: bool,
    ) -> Result<Vec<Todo>, InfraError> {
        let table = tenant_table(email)?;
        let tables = self.tables.lock().unwrap();
        let Some(tenant) = tables.get(&table) else {
            return Ok(Vec::new());
        };

        let mut todos: Vec<Todo> = tenant
            .rows
            .iter()
            .filter(|t| t.user_email() == email)
            .filter(|t| include_completed || !t.status().is_deleted())
            .cloned()
            .collect();
        // 作成日時が同じ場合は新しい ID を先にする
        todos.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(todos)
    }

    async fn find_by_id(&self, email: &UserEmail, id: TodoId) -> Result<Option<Todo>, InfraError> {
        let table = tenant_table(email)?;
        Ok(self.tables.lock().unwrap().get(&table).and_then(|tenant| {
            tenant
                .rows
                .iter()
                .find(|t| t.id() == id && t.user_email() == email)
                .cloned()
        }))
    }

    async fn update(
        &self,
        email: &UserEmail,
        id: TodoId,
        title: &str,
        description: &str,
    ) -> Result<Option<Todo>, InfraError> {
        let now = self.clock.now();
        self.modify(email, id, |todo| {
            todo.with_content(title.to_string(), description.to_string(), now)
        })
    }

    async fn update_status(
        &self,
        email: &UserEmail,
        id: TodoId,
        status: &TodoStatus,
    ) -> Result<Option<Todo>, InfraError> {
        let now = self.clock.now();
        self.modify(email, id, |todo| todo.with_status(status.clone(), now))
    }

    async fn soft_delete(&self, email: &UserEmail, id: TodoId) -> Result<Option<Todo>, InfraError> {
        let now = self.clock.now();
        self.modify(email, id, |todo| todo.deleted(now))
    }
}

// ===== MockPermissionRepository =====

#[derive(Clone, Default)]
pub struct MockPermissionRepository {
    granted: Arc<Mutex<Vec<String>>>,
}

impl MockPermissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 権限を付与したシーケンス名の一覧
    pub fn granted(&self) -> Vec<String> {
        self.granted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PermissionRepository for MockPermissionRepository {
    async fn grant_sequence_access(&self, email: &UserEmail) -> Result<String, InfraError> {
        let sequence = tenant_table(email)?.sequence_name();
        self.granted.lock().unwrap().push(sequence.clone());
        Ok(sequence)
    }
}
