//! # To-Do アイテム
//!
//! ## ライフサイクル
//!
//! ```text
//! 作成 (pending) ──update──▶ タイトル/説明を変更
//!        │
//!        ├──change-status──▶ 任意のステータス文字列
//!        │
//!        └──delete──▶ deleted（論理削除、行は残る）
//! ```
//!
//! ステータスはこの層では列挙値に制限しない。既知の値（`pending`,
//! `completed`, `deleted`）以外も [`TodoStatus::Other`] として保持し、
//! そのまま永続化する。

use std::{convert::Infallible, str::FromStr};

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::user::UserEmail;

/// To-Do アイテムの ID
///
/// テナントテーブルの `serial` 列で採番されるため、一意なのはテナント内のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(transparent)]
#[display("{_0}")]
pub struct TodoId(i64);

impl TodoId {
    pub fn from_i64(value: i64) -> Self {
        Self(value)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// To-Do アイテムのステータス
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TodoStatus {
    /// 未完了（作成直後）
    Pending,
    /// 完了
    Completed,
    /// 論理削除済み
    Deleted,
    /// 上記以外の任意の値
    Other(String),
}

impl TodoStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
            Self::Other(s) => s,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl From<String> for TodoStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "deleted" => Self::Deleted,
            _ => Self::Other(value),
        }
    }
}

impl From<TodoStatus> for String {
    fn from(status: TodoStatus) -> Self {
        match status {
            TodoStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for TodoStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// To-Do アイテム（エンティティ）
///
/// 所有者のメールアドレスを持ち、所有者のテナントテーブルにのみ存在する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    id:          TodoId,
    user_email:  UserEmail,
    title:       String,
    description: String,
    status:      TodoStatus,
    created_at:  DateTime<Utc>,
    updated_at:  DateTime<Utc>,
}

impl Todo {
    /// 新しいアイテムを作成する（ステータスは `pending`）
    pub fn new(
        id: TodoId,
        user_email: UserEmail,
        title: String,
        description: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_email,
            title,
            description,
            status: TodoStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// データベースから復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: TodoId,
        user_email: UserEmail,
        title: String,
        description: String,
        status: TodoStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_email,
            title,
            description,
            status,
            created_at,
            updated_at,
        }
    }

    /// タイトルと説明を変更した新しいアイテムを返す
    pub fn with_content(self, title: String, description: String, now: DateTime<Utc>) -> Self {
        Self {
            title,
            description,
            updated_at: now,
            ..self
        }
    }

    /// ステータスを変更した新しいアイテムを返す
    pub fn with_status(self, status: TodoStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: now,
            ..self
        }
    }

    /// 論理削除した新しいアイテムを返す
    pub fn deleted(self, now: DateTime<Utc>) -> Self {
        self.with_status(TodoStatus::Deleted, now)
    }

    // Getter メソッド

    pub fn id(&self) -> TodoId {
        self.id
    }

    pub fn user_email(&self) -> &UserEmail {
        &self.user_email
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> &TodoStatus {
        &self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
