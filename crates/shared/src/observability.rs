//! # ログ出力の初期化
//!
//! `LOG_FORMAT` で出力形式（JSON / Pretty）を、`RUST_LOG` でレベルを切り替える。
//!
//! ```text
//! LOG_FORMAT=json RUST_LOG=info,todolist_infra=debug todo-service
//! ```

/// `RUST_LOG` が未設定の場合のフィルタ
pub const DEFAULT_LOG_FILTER: &str = "info,todolist=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 イベントの JSON（ログ収集基盤向け）
    Json,
    /// 端末向け
    #[default]
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT` の値を解釈する
    ///
    /// 大文字小文字と前後の空白は無視する。解釈できない値は `Pretty` とし、
    /// トレーシングの初期化前なので stderr に警告を出す。
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "" | "pretty" => Self::Pretty,
            _ => {
                eprintln!("WARNING: LOG_FORMAT={value:?} は解釈できないため pretty を使います");
                Self::Pretty
            }
        }
    }

    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// 起動ログに出すサービス名
    pub service_name: String,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }

    /// `LOG_FORMAT` から出力形式を読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }
}

/// グローバル subscriber を登録する
///
/// `tracing_error::ErrorLayer` も登録する。これがないと `InfraError` の
/// `SpanTrace` は空になる。プロセスで一度だけ呼ぶこと。
#[cfg(feature = "observability")]
pub fn init_tracing(config: &TracingConfig) {
    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::info!(
        service = %config.service_name,
        log_format = ?config.log_format,
        "ログ出力を初期化しました"
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("json", LogFormat::Json)]
    #[case(" JSON ", LogFormat::Json)]
    #[case("pretty", LogFormat::Pretty)]
    #[case("", LogFormat::Pretty)]
    #[case("yaml", LogFormat::Pretty)]
    fn test_log_formatの解釈(#[case] value: &str, #[case] expected: LogFormat) {
        assert_eq!(LogFormat::parse(value), expected);
    }

    #[test]
    fn test_newでサービス名と形式を保持する() {
        let config = TracingConfig::new("todo-service", LogFormat::Json);

        assert_eq!(config.service_name, "todo-service");
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
