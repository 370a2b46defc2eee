//! # ヘルスチェックのレスポンス型
//!
//! - `GET /health`: プロセスが応答できれば常に `healthy`
//! - `GET /health/ready`: 依存先ごとの結果と全体の判定

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// `GET /health` のレスポンス
///
/// ```
/// use todolist_shared::HealthResponse;
///
/// let response = HealthResponse::healthy("0.1.0");
/// assert_eq!(response.status, "healthy");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status:  String,
    /// パッケージのバージョン
    pub version: String,
}

impl HealthResponse {
    pub fn healthy(version: impl Into<String>) -> Self {
        Self {
            status:  "healthy".to_string(),
            version: version.into(),
        }
    }
}

/// 依存先 1 つ分の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

/// 全体の判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Ready,
    NotReady,
}

/// `GET /health/ready` のレスポンス
///
/// `checks` のキーは依存先の名前（`"database"`）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: ReadinessStatus,
    pub checks: BTreeMap<String, CheckStatus>,
}

impl ReadinessResponse {
    /// 依存先ごとの結果から全体の判定を決める
    ///
    /// 1 つでも `Error` があれば `NotReady`。
    pub fn from_checks(checks: BTreeMap<String, CheckStatus>) -> Self {
        let status = if checks.values().all(|c| *c == CheckStatus::Ok) {
            ReadinessStatus::Ready
        } else {
            ReadinessStatus::NotReady
        };
        Self { status, checks }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ReadinessStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn checks(entries: &[(&str, CheckStatus)]) -> BTreeMap<String, CheckStatus> {
        entries
            .iter()
            .map(|(name, status)| (name.to_string(), *status))
            .collect()
    }

    #[test]
    fn test_healthyのjson形状() {
        let json = serde_json::to_value(HealthResponse::healthy("0.1.0")).unwrap();

        assert_eq!(json, json!({ "status": "healthy", "version": "0.1.0" }));
    }

    #[test]
    fn test_すべてokならready() {
        let response = ReadinessResponse::from_checks(checks(&[("database", CheckStatus::Ok)]));

        assert!(response.is_ready());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "status": "ready", "checks": { "database": "ok" } })
        );
    }

    #[test]
    fn test_errorを1つでも含むとnot_ready() {
        let response = ReadinessResponse::from_checks(checks(&[
            ("credential", CheckStatus::Ok),
            ("database", CheckStatus::Error),
        ]));

        assert!(!response.is_ready());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "not_ready");
        assert_eq!(json["checks"]["database"], "error");
    }
}
