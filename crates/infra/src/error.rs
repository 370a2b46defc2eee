//! # インフラ層エラー定義
//!
//! データベースや資格情報の発行元との通信で発生するエラーを表現する。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別
//!
//! `From` 実装や convenience constructor でエラーを生成すると、その時点の
//! スパン情報が自動的にキャプチャされる。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// エラー種別に応じた処理には [`kind()`](InfraError::kind) を使用する:
///
/// ```ignore
/// match error.kind() {
///     InfraErrorKind::InvalidInput(msg) => { /* 400 */ }
///     _ => { /* 500 */ }
/// }
/// ```
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
///
/// `Connect` と `Credential` はコネクション確立前の失敗であり、
/// クエリは実行されていない。
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// クエリ実行時のデータベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// データベースへの接続失敗
    #[error("データベースに接続できません: {0}")]
    Connect(#[source] sqlx::Error),

    /// 資格情報の発行失敗
    ///
    /// ワークスペースへの HTTP 呼び出しの失敗や、想定外の応答を含む。
    #[error("資格情報の発行に失敗しました: {0}")]
    Credential(String),

    /// クライアント入力エラー
    ///
    /// インフラ層で検出されるが、原因はクライアント入力にある
    /// （テナントテーブル名を導出できないメールアドレスなど）。
    #[error("入力エラー: {0}")]
    InvalidInput(String),

    /// 予期しないエラー
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

// ===== InfraError のメソッド =====

impl InfraError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// InfraError を分解して InfraErrorKind と SpanTrace を取り出す
    pub fn into_parts(self) -> (InfraErrorKind, SpanTrace) {
        (self.kind, self.span_trace)
    }

    /// コネクション確立前の失敗かどうか
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self.kind,
            InfraErrorKind::Connect(_) | InfraErrorKind::Credential(_)
        )
    }

    // ===== Convenience constructors =====

    fn with_kind(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    /// 接続失敗エラーを生成する
    pub fn connect(source: sqlx::Error) -> Self {
        Self::with_kind(InfraErrorKind::Connect(source))
    }

    /// 資格情報の発行失敗エラーを生成する
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Credential(msg.into()))
    }

    /// クライアント入力エラーを生成する
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::InvalidInput(msg.into()))
    }

    /// 予期しないエラーを生成する
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Unexpected(msg.into()))
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self::with_kind(InfraErrorKind::Database(source))
    }
}

impl From<reqwest::Error> for InfraError {
    fn from(source: reqwest::Error) -> Self {
        Self::credential(source.to_string())
    }
}
