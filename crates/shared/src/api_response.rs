//! # 成功レスポンスのエンベロープ
//!
//! `/api` 配下の成功レスポンスは `{ "data": ... }` で包む。

use serde::{Deserialize, Serialize};

/// `{ "data": T }`
///
/// ```
/// use todolist_shared::ApiResponse;
///
/// let body = serde_json::to_string(&ApiResponse::new(vec![1, 2])).unwrap();
/// assert_eq!(body, r#"{"data":[1,2]}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id:    i64,
        title: String,
    }

    #[test]
    fn test_オブジェクトをdataで包む() {
        let response = ApiResponse::new(Item {
            id:    1,
            title: "牛乳を買う".to_string(),
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "data": { "id": 1, "title": "牛乳を買う" } })
        );
    }

    #[test]
    fn test_空の一覧もdataで包む() {
        let response: ApiResponse<Vec<Item>> = ApiResponse::new(Vec::new());

        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "data": [] }));
    }
}
