//! # Todo Service ライブラリ
//!
//! ユーザーごとの To-Do リストを提供する HTTP サービス。
//! ルーター構築・ユースケース・ハンドラを公開し、`main.rs` と
//! テストから利用する。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod identity;
pub mod usecase;
