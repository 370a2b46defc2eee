//! # テナント
//!
//! このシステムにおけるテナントは 1 ユーザーであり、ユーザーごとに専用の
//! テーブル（`public.<prefix>_lists`）を持つ。テーブルそのものが分離境界になる。
//!
//! ## テーブル名の導出規則
//!
//! 1. メールアドレスを小文字にする（[`UserEmail`] が保証）
//! 2. `@` より前を取り出す
//! 3. `.` を `_` に置き換える
//! 4. `_lists` を付ける
//!
//! ```text
//! Jane.Doe@example.com → jane_doe_lists
//! ```
//!
//! ## 識別子としての制約
//!
//! 導出した名前は SQL の識別子として埋め込まれるため、値のバインドでは
//! 守れない。ここでは PostgreSQL が受け付けない名前（長すぎる、制御文字を
//! 含む）を拒否し、クォートはインフラ層が必ず行う。
//!
//! `a.b@x` と `a_b@y` は同じテーブルに解決される。導出規則そのものが
//! 持つ衝突であり、この型では検出できない。

use crate::{DomainError, user::UserEmail};

/// テナントテーブルを置くスキーマ
pub const TENANT_SCHEMA: &str = "public";

/// テーブル名の接尾辞
const TABLE_SUFFIX: &str = "_lists";

/// id 列のシーケンス名の接尾辞（PostgreSQL の `serial` が生成する名前）
const SEQUENCE_SUFFIX: &str = "_id_seq";

/// PostgreSQL の識別子の最大バイト数（`NAMEDATALEN - 1`）
///
/// 超えた分は黙って切り詰められ、別テナントと衝突しうるため拒否する。
const MAX_IDENTIFIER_BYTES: usize = 63;

/// テナントテーブルの参照（値オブジェクト）
///
/// # 不変条件
///
/// - プレフィックスは空でない
/// - 制御文字を含まない
/// - シーケンス名（最も長い派生名）が 63 バイト以内
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantTable {
    prefix: String,
}

impl TenantTable {
    /// メールアドレスからテナントテーブルを導出する
    ///
    /// # エラー
    ///
    /// 導出した名前が識別子として使えない場合は `DomainError::Validation` を返す。
    pub fn from_email(email: &UserEmail) -> Result<Self, DomainError> {
        let prefix = email.local_part().replace('.', "_");

        if prefix.is_empty() {
            return Err(DomainError::Validation(
                "テナントテーブル名を導出できません".to_string(),
            ));
        }

        if prefix.chars().any(char::is_control) {
            return Err(DomainError::Validation(
                "メールアドレスに使用できない文字が含まれています".to_string(),
            ));
        }

        let table = Self { prefix };
        if table.sequence_name().len() > MAX_IDENTIFIER_BYTES {
            return Err(DomainError::Validation(format!(
                "テナントテーブル名が長すぎます（{MAX_IDENTIFIER_BYTES} バイト以内）"
            )));
        }

        Ok(table)
    }

    /// スキーマ名
    pub fn schema(&self) -> &'static str {
        TENANT_SCHEMA
    }

    /// テーブル名（例: `jane_doe_lists`）
    pub fn table_name(&self) -> String {
        format!("{}{TABLE_SUFFIX}", self.prefix)
    }

    /// id 列のシーケンス名（例: `jane_doe_lists_id_seq`）
    pub fn sequence_name(&self) -> String {
        format!("{}{TABLE_SUFFIX}{SEQUENCE_SUFFIX}", self.prefix)
    }
}

impl std::fmt::Display for TenantTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{TENANT_SCHEMA}.{}", self.table_name())
    }
}
