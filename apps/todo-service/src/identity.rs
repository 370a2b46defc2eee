//! # リクエスト元ユーザーの特定
//!
//! 認証は上流のリバースプロキシが行い、検証済みのメールアドレスを
//! `X-Forwarded-Email` ヘッダで渡す。このサービスはヘッダを信頼する。
//!
//! ヘッダがない場合は設定の `MY_EMAIL` を使う（ローカル開発用）。
//! どちらもなければ 400 を返す。

use axum::http::HeaderMap;
use todolist_domain::user::UserEmail;

use crate::error::TodoError;

/// 上流から渡されるメールアドレスのヘッダ
pub const FORWARDED_EMAIL_HEADER: &str = "x-forwarded-email";

/// メールアドレスの解決
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    fallback: Option<String>,
}

impl IdentityResolver {
    pub fn new(fallback: Option<String>) -> Self {
        Self { fallback }
    }

    /// ヘッダまたはフォールバック値からメールアドレスを得る
    pub fn resolve(&self, headers: &HeaderMap) -> Result<UserEmail, TodoError> {
        let forwarded = headers
            .get(FORWARDED_EMAIL_HEADER)
            .map(|v| {
                v.to_str()
                    .map_err(|_| TodoError::BadRequest("X-Forwarded-Email が不正です".to_string()))
            })
            .transpose()?
            .filter(|v| !v.trim().is_empty());

        let raw = forwarded
            .or(self.fallback.as_deref())
            .ok_or_else(|| TodoError::BadRequest("User email not found".to_string()))?;

        Ok(UserEmail::new(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    use super::*;

    fn headers(email: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_EMAIL_HEADER, HeaderValue::from_str(email).unwrap());
        headers
    }

    #[test]
    fn test_ヘッダのメールアドレスを正規化して使う() {
        let sut = IdentityResolver::new(Some("me@example.com".to_string()));

        let email = sut.resolve(&headers("Jane.Doe@Example.com")).unwrap();

        assert_eq!(email.as_str(), "jane.doe@example.com");
    }

    #[test]
    fn test_ヘッダがなければフォールバックを使う() {
        let sut = IdentityResolver::new(Some("me@example.com".to_string()));

        let email = sut.resolve(&HeaderMap::new()).unwrap();

        assert_eq!(email.as_str(), "me@example.com");
    }

    #[test]
    fn test_空のヘッダはないものとして扱う() {
        let sut = IdentityResolver::new(Some("me@example.com".to_string()));

        let email = sut.resolve(&headers("")).unwrap();

        assert_eq!(email.as_str(), "me@example.com");
    }

    #[test]
    fn test_どちらもなければbad_request() {
        let sut = IdentityResolver::default();

        let err = sut.resolve(&HeaderMap::new()).unwrap_err();

        assert!(matches!(err, TodoError::BadRequest(_)));
    }

    #[test]
    fn test_形式が不正なメールアドレスはバリデーションエラー() {
        let sut = IdentityResolver::default();

        let err = sut.resolve(&headers("not-an-email")).unwrap_err();

        assert!(matches!(err, TodoError::Validation(_)));
    }
}
