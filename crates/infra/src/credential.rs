//! # 資格情報の発行
//!
//! データベース接続に使う短命なパスワードを取得する。
//!
//! ## 発行元
//!
//! - [`WorkspaceCredentialIssuer`]: ワークスペースの REST API から
//!   OAuth（client credentials）→ DB 資格情報の発行 → インスタンスのホスト名取得
//!   の順に呼び出す。発行されたトークンはおよそ 1 時間で失効する。
//! - [`StaticCredentialIssuer`]: 設定値のホストとパスワードをそのまま返す
//!   （ローカルの PostgreSQL 向け）。
//!
//! トークンは [`SecretString`] で保持し、ログには出さない。

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InfraError;

/// 接続に必要な資格情報
#[derive(Debug)]
pub struct DatabaseCredential {
    /// 接続先ホスト
    pub host:  String,
    /// パスワードとして使うトークン
    pub token: SecretString,
}

/// 資格情報の発行トレイト
///
/// コネクションを新規作成するたびに 1 回呼ばれる。
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// 新しい資格情報を発行する
    async fn issue(&self) -> Result<DatabaseCredential, InfraError>;
}

// =============================================================================
// StaticCredentialIssuer
// =============================================================================

/// 固定の資格情報を返す実装
pub struct StaticCredentialIssuer {
    host:     String,
    password: SecretString,
}

impl StaticCredentialIssuer {
    pub fn new(host: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host:     host.into(),
            password: SecretString::from(password.into()),
        }
    }
}

#[async_trait]
impl CredentialIssuer for StaticCredentialIssuer {
    async fn issue(&self) -> Result<DatabaseCredential, InfraError> {
        Ok(DatabaseCredential {
            host:  self.host.clone(),
            token: SecretString::from(self.password.expose_secret().to_owned()),
        })
    }
}

// =============================================================================
// WorkspaceCredentialIssuer
// =============================================================================

/// ワークスペース接続設定
#[derive(Debug)]
pub struct WorkspaceSettings {
    /// ワークスペースのベース URL（例: `https://example.cloud.databricks.com`）
    pub host:          String,
    /// サービスプリンシパルのクライアント ID
    pub client_id:     String,
    /// サービスプリンシパルのシークレット
    pub client_secret: SecretString,
    /// データベースインスタンス名
    pub instance_name: String,
}

/// OAuth トークンレスポンス
#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
}

/// DB 資格情報の発行リクエスト
#[derive(Debug, Serialize)]
struct GenerateCredentialRequest<'a> {
    request_id:     Uuid,
    instance_names: [&'a str; 1],
}

/// DB 資格情報の発行レスポンス
#[derive(Debug, Deserialize)]
struct GenerateCredentialResponse {
    token: String,
}

/// データベースインスタンス情報
#[derive(Debug, Deserialize)]
struct DatabaseInstanceResponse {
    read_write_dns: String,
}

/// ワークスペース API から資格情報を発行する実装
pub struct WorkspaceCredentialIssuer {
    settings: WorkspaceSettings,
    client:   reqwest::Client,
}

impl WorkspaceCredentialIssuer {
    pub fn new(settings: WorkspaceSettings) -> Self {
        Self {
            settings: WorkspaceSettings {
                host: settings.host.trim_end_matches('/').to_string(),
                ..settings
            },
            client:   reqwest::Client::new(),
        }
    }

    /// ワークスペースの URL にパスセグメントを追加する
    ///
    /// 各セグメントはパーセントエンコードされる。
    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = Url::parse(&self.settings.host).map_err(|e| {
            InfraError::credential(format!("ワークスペースの URL が不正です: {e}"))
        })?;
        url.path_segments_mut()
            .map_err(|()| InfraError::credential("ワークスペースの URL にパスを追加できません"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `POST /oidc/v1/token`
    async fn fetch_access_token(&self) -> Result<SecretString, InfraError> {
        let url = self.endpoint(&["oidc", "v1", "token"])?;
        let response = self
            .client
            .post(url)
            .basic_auth(
                &self.settings.client_id,
                Some(self.settings.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials"), ("scope", "all-apis")])
            .send()
            .await?;

        let body: OAuthTokenResponse = ensure_success(response, "OAuth トークン取得")
            .await?
            .json()
            .await?;
        Ok(SecretString::from(body.access_token))
    }

    /// `POST /api/2.0/database/credentials`
    async fn generate_credential(&self, access_token: &SecretString) -> Result<SecretString, InfraError> {
        let url = self.endpoint(&["api", "2.0", "database", "credentials"])?;
        let request = GenerateCredentialRequest {
            request_id:     Uuid::new_v4(),
            instance_names: [self.settings.instance_name.as_str()],
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(access_token.expose_secret())
            .json(&request)
            .send()
            .await?;

        let body: GenerateCredentialResponse = ensure_success(response, "DB 資格情報の発行")
            .await?
            .json()
            .await?;
        Ok(SecretString::from(body.token))
    }

    /// `GET /api/2.0/database/instances/{name}`
    async fn fetch_instance_host(&self, access_token: &SecretString) -> Result<String, InfraError> {
        let url = self.endpoint(&[
            "api",
            "2.0",
            "database",
            "instances",
            &self.settings.instance_name,
        ])?;

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        let body: DatabaseInstanceResponse = ensure_success(response, "インスタンス情報の取得")
            .await?
            .json()
            .await?;
        Ok(body.read_write_dns)
    }
}

#[async_trait]
impl CredentialIssuer for WorkspaceCredentialIssuer {
    #[tracing::instrument(skip_all, fields(instance = %self.settings.instance_name))]
    async fn issue(&self) -> Result<DatabaseCredential, InfraError> {
        let access_token = self.fetch_access_token().await?;
        let token = self.generate_credential(&access_token).await?;
        let host = self.fetch_instance_host(&access_token).await?;

        tracing::debug!(%host, "DB 資格情報を発行しました");
        Ok(DatabaseCredential { host, token })
    }
}

/// 2xx 以外のレスポンスを `Credential` エラーに変換する
async fn ensure_success(
    response: reqwest::Response,
    step: &str,
) -> Result<reqwest::Response, InfraError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(InfraError::credential(format!(
        "{step}: 予期しないステータス {status}: {body}"
    )))
}

#[cfg(test)]
mod tests {
    use axum::{
        Json,
        Router,
        extract::Path,
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        routing::{get, post},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::error::InfraErrorKind;

    const INSTANCE: &str = "todo-instance";

    fn bearer_is(headers: &HeaderMap, token: &str) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {token}"))
    }

    /// ワークスペース API を模したルーター
    fn workspace_router(credential_status: StatusCode) -> Router {
        Router::new()
            .route(
                "/oidc/v1/token",
                post(|headers: HeaderMap| async move {
                    let is_basic = headers
                        .get(AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|v| v.starts_with("Basic "));
                    if !is_basic {
                        return (StatusCode::UNAUTHORIZED, Json(json!({})));
                    }
                    (
                        StatusCode::OK,
                        Json(json!({ "access_token": "oauth-token", "token_type": "Bearer" })),
                    )
                }),
            )
            .route(
                "/api/2.0/database/credentials",
                post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                    if !bearer_is(&headers, "oauth-token") {
                        return (StatusCode::UNAUTHORIZED, Json(json!({})));
                    }
                    let one_instance = body["instance_names"]
                        .as_array()
                        .is_some_and(|names| names.len() == 1 && names[0].is_string());
                    if !one_instance || body["request_id"].is_null() {
                        return (StatusCode::BAD_REQUEST, Json(json!({})));
                    }
                    if !credential_status.is_success() {
                        return (credential_status, Json(json!({ "message": "denied" })));
                    }
                    (StatusCode::OK, Json(json!({ "token": "db-token" })))
                }),
            )
            .route(
                "/api/2.0/database/instances/{name}",
                get(|headers: HeaderMap, Path(name): Path<String>| async move {
                    if !bearer_is(&headers, "oauth-token") {
                        return (StatusCode::UNAUTHORIZED, Json(json!({})));
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "name": name,
                            "read_write_dns": format!("{name}.database.example.com"),
                        })),
                    )
                }),
            )
    }

    /// エフェメラルポートでルーターを起動し、ベース URL を返す
    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn issuer_for(host: String) -> WorkspaceCredentialIssuer {
        issuer_with_instance(host, INSTANCE)
    }

    fn issuer_with_instance(host: String, instance_name: &str) -> WorkspaceCredentialIssuer {
        WorkspaceCredentialIssuer::new(WorkspaceSettings {
            host,
            client_id:     "client-id".to_string(),
            client_secret: SecretString::from("client-secret".to_string()),
            instance_name: instance_name.to_string(),
        })
    }

    #[tokio::test]
    async fn test_static_issuerは設定値をそのまま返す() {
        let sut = StaticCredentialIssuer::new("localhost", "password");

        let credential = sut.issue().await.unwrap();

        assert_eq!(credential.host, "localhost");
        assert_eq!(credential.token.expose_secret(), "password");
    }

    #[tokio::test]
    async fn test_workspace_issuerはトークンとインスタンスのホストを返す() {
        let base_url = spawn(workspace_router(StatusCode::OK)).await;
        // 末尾スラッシュは取り除かれる
        let sut = issuer_for(format!("{base_url}/"));

        let credential = sut.issue().await.unwrap();

        assert_eq!(credential.host, "todo-instance.database.example.com");
        assert_eq!(credential.token.expose_secret(), "db-token");
    }

    #[tokio::test]
    async fn test_workspace_issuerは発行失敗をcredentialエラーにする() {
        let base_url = spawn(workspace_router(StatusCode::FORBIDDEN)).await;
        let sut = issuer_for(base_url);

        let err = sut.issue().await.unwrap_err();

        assert!(err.is_connection_failure());
        let InfraErrorKind::Credential(msg) = err.kind() else {
            panic!("Credential エラーであること: {err:?}");
        };
        assert!(msg.contains("403"), "ステータスを含むこと: {msg}");
        assert!(msg.contains("denied"), "レスポンス本文を含むこと: {msg}");
    }

    #[tokio::test]
    async fn test_workspace_issuerは接続できない場合credentialエラーにする() {
        // バインドしてすぐ閉じたポートには誰も待ち受けていない
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let sut = issuer_for(format!("http://{addr}"));

        let err = sut.issue().await.unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Credential(_)));
    }

    #[tokio::test]
    async fn test_インスタンス名はパスセグメントとしてエンコードされる() {
        // Given: `/` と空白を含むインスタンス名
        let base_url = spawn(workspace_router(StatusCode::OK)).await;
        let sut = issuer_with_instance(base_url, "team a/todo");

        // When
        let credential = sut.issue().await.unwrap();

        // Then: 1 つのセグメントとして届き、デコード後の名前が返る
        assert_eq!(credential.host, "team a/todo.database.example.com");
    }

    #[test]
    fn test_endpointはセグメントごとにエンコードする() {
        let sut = issuer_with_instance("https://workspace.example.com/".to_string(), "a/b c");

        let url = sut
            .endpoint(&["api", "2.0", "database", "instances", "a/b c"])
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://workspace.example.com/api/2.0/database/instances/a%2Fb%20c"
        );
    }

    #[test]
    fn test_urlとして解釈できないホストはcredentialエラー() {
        let sut = issuer_for("not a url".to_string());

        let err = sut.endpoint(&["oidc", "v1", "token"]).unwrap_err();

        assert!(matches!(err.kind(), InfraErrorKind::Credential(_)));
    }
}
