//! # Todo Service 設定
//!
//! 環境変数から Todo Service サーバーの設定を読み込む。
//!
//! ## 資格情報の取得方法
//!
//! `DATABASE_HOST` と `DATABASE_PASSWORD` の両方が設定されていれば固定の
//! 資格情報を使う（ローカルの PostgreSQL 向け）。それ以外はワークスペースの
//! API から接続のたびに短命なトークンを発行する。

use std::{env, path::PathBuf};

use chrono::TimeDelta;
use secrecy::SecretString;
use sqlx::postgres::PgSslMode;
use thiserror::Error;
use todolist_infra::{credential::WorkspaceSettings, db::DEFAULT_MAX_AGE_MINUTES};

/// 接続ロールの既定値（シーケンス権限の付与先も兼ねる）
const DEFAULT_DATABASE_USER: &str = "2025_vibe_coding";

/// 設定の読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Todo Service サーバーの設定
#[derive(Debug)]
pub struct TodoConfig {
    /// バインドアドレス
    pub host:       String,
    /// ポート番号
    pub port:       u16,
    /// `X-Forwarded-Email` がない場合に使うメールアドレス
    pub my_email:   Option<String>,
    /// フロントエンドの静的ファイルを置いたディレクトリ
    pub static_dir: Option<PathBuf>,
    /// データベース設定
    pub database:   DatabaseConfig,
}

/// データベース接続の設定
#[derive(Debug)]
pub struct DatabaseConfig {
    pub name:        String,
    pub user:        String,
    pub port:        u16,
    pub ssl_mode:    PgSslMode,
    /// コネクションの寿命
    pub max_age:     TimeDelta,
    pub credentials: CredentialConfig,
}

/// 資格情報の取得方法
#[derive(Debug)]
pub enum CredentialConfig {
    /// 固定のホストとパスワード
    Static { host: String, password: SecretString },
    /// ワークスペース API で発行する
    Workspace(WorkspaceSettings),
}

impl TodoConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列の値は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            host:       get("TODO_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port:       parse_or("TODO_PORT", get("TODO_PORT"), 8000)?,
            my_email:   get("MY_EMAIL"),
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            database:   DatabaseConfig::from_lookup(&get)?,
        })
    }
}

impl DatabaseConfig {
    fn from_lookup(get: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let name = get("DATABASE_NAME")
            .or_else(|| get("LAKEBASE_DB_NAME"))
            .ok_or(ConfigError::Missing("DATABASE_NAME"))?;

        let ssl_mode = match get("DATABASE_SSL_MODE") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "DATABASE_SSL_MODE",
                value,
            })?,
            None => PgSslMode::Require,
        };

        let max_age_minutes: i64 = parse_or(
            "DATABASE_MAX_AGE_MINUTES",
            get("DATABASE_MAX_AGE_MINUTES"),
            DEFAULT_MAX_AGE_MINUTES,
        )?;
        if max_age_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name:  "DATABASE_MAX_AGE_MINUTES",
                value: max_age_minutes.to_string(),
            });
        }

        let credentials = match (get("DATABASE_HOST"), get("DATABASE_PASSWORD")) {
            (Some(host), Some(password)) => CredentialConfig::Static {
                host,
                password: SecretString::from(password),
            },
            _ => CredentialConfig::Workspace(WorkspaceSettings {
                host:          require(get, "DATABRICKS_HOST")?,
                client_id:     require(get, "DATABRICKS_CLIENT_ID")?,
                client_secret: SecretString::from(require(get, "DATABRICKS_CLIENT_SECRET")?),
                instance_name: require(get, "LAKEBASE_INSTANCE_NAME")?,
            }),
        };

        Ok(Self {
            name,
            user: get("DATABASE_USER").unwrap_or_else(|| DEFAULT_DATABASE_USER.to_string()),
            port: parse_or("DATABASE_PORT", get("DATABASE_PORT"), 5432)?,
            ssl_mode,
            max_age: TimeDelta::minutes(max_age_minutes),
            credentials,
        })
    }
}

fn require(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    get(name).ok_or(ConfigError::Missing(name))
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<TodoConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TodoConfig::from_lookup(|name| vars.get(name).cloned())
    }

    const WORKSPACE: [(&str, &str); 5] = [
        ("LAKEBASE_DB_NAME", "todos"),
        ("DATABRICKS_HOST", "https://workspace.example.com"),
        ("DATABRICKS_CLIENT_ID", "client"),
        ("DATABRICKS_CLIENT_SECRET", "secret"),
        ("LAKEBASE_INSTANCE_NAME", "todo-instance"),
    ];

    #[test]
    fn test_未設定の項目はデフォルト値になる() {
        let config = load(&WORKSPACE).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.my_email, None);
        assert_eq!(config.static_dir, None);
        assert_eq!(config.database.name, "todos");
        assert_eq!(config.database.user, "2025_vibe_coding");
        assert_eq!(config.database.port, 5432);
        assert!(matches!(config.database.ssl_mode, PgSslMode::Require));
        assert_eq!(config.database.max_age, TimeDelta::minutes(59));
    }

    #[test]
    fn test_ワークスペースの資格情報設定を読み込む() {
        let config = load(&WORKSPACE).unwrap();

        let CredentialConfig::Workspace(settings) = config.database.credentials else {
            panic!("Workspace になること");
        };
        assert_eq!(settings.host, "https://workspace.example.com");
        assert_eq!(settings.client_id, "client");
        assert_eq!(settings.client_secret.expose_secret(), "secret");
        assert_eq!(settings.instance_name, "todo-instance");
    }

    #[test]
    fn test_ホストとパスワードがあれば固定の資格情報を使う() {
        let config = load(&[
            ("DATABASE_NAME", "todos"),
            ("DATABASE_HOST", "localhost"),
            ("DATABASE_PASSWORD", "postgres"),
            ("DATABASE_SSL_MODE", "disable"),
        ])
        .unwrap();

        let CredentialConfig::Static { host, password } = config.database.credentials else {
            panic!("Static になること");
        };
        assert_eq!(host, "localhost");
        assert_eq!(password.expose_secret(), "postgres");
        assert!(matches!(config.database.ssl_mode, PgSslMode::Disable));
    }

    #[test]
    fn test_データベース名がなければエラー() {
        let err = load(&WORKSPACE[1..]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_NAME")));
    }

    #[test]
    fn test_ワークスペース設定が欠けていればエラー() {
        let err = load(&WORKSPACE[..4]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("LAKEBASE_INSTANCE_NAME")));
    }

    #[test]
    fn test_空文字列は未設定として扱う() {
        let mut vars = WORKSPACE.to_vec();
        vars.push(("MY_EMAIL", ""));
        vars.push(("TODO_PORT", " "));

        let config = load(&vars).unwrap();

        assert_eq!(config.my_email, None);
        assert_eq!(config.port, 8000);
    }

    #[rstest::rstest]
    #[case("TODO_PORT", "eighty")]
    #[case("DATABASE_PORT", "70000")]
    #[case("DATABASE_SSL_MODE", "sometimes")]
    #[case("DATABASE_MAX_AGE_MINUTES", "0")]
    fn test_不正な値はエラー(#[case] name: &str, #[case] value: &str) {
        let mut vars = WORKSPACE.to_vec();
        vars.push((name, value));

        let err = load(&vars).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { name: n, .. } if n == name));
    }
}
