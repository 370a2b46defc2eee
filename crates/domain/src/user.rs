//! # ユーザー
//!
//! テナントを識別するメールアドレスを定義する。
//!
//! メールアドレスは上流（リバースプロキシ）が付与する `X-Forwarded-Email`
//! ヘッダ、または設定のフォールバック値から得る。ここでは検証と正規化のみを
//! 行い、ヘッダの真正性は扱わない。

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// メールアドレスの最大長
const MAX_EMAIL_LENGTH: usize = 255;

/// ユーザーのメールアドレス（値オブジェクト）
///
/// 生成時に前後の空白を除去し、小文字に正規化する。
/// 同じ人物が `Jane@Example.com` と `jane@example.com` のどちらで来ても
/// 同じテナントに解決される。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserEmail(String);

impl UserEmail {
    /// メールアドレスを作成する
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - `local@domain` の形式（どちらも空でない）
    /// - 最大 255 文字
    ///
    /// # エラー
    ///
    /// バリデーションに失敗した場合は `DomainError::Validation` を返す。
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_lowercase();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "ユーザーのメールアドレスは必須です".to_string(),
            ));
        }

        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        if value.chars().count() > MAX_EMAIL_LENGTH {
            return Err(DomainError::Validation(format!(
                "メールアドレスは{MAX_EMAIL_LENGTH}文字以内である必要があります"
            )));
        }

        Ok(Self(value))
    }

    /// `@` より前のローカル部分
    pub fn local_part(&self) -> &str {
        // new() で `@` を含むことを検証済み
        self.0.split('@').next().unwrap_or_default()
    }

    /// 文字列参照を取得する
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserEmail {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserEmail> for String {
    fn from(email: UserEmail) -> Self {
        email.0
    }
}

impl std::fmt::Display for UserEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
