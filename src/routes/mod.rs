//! HTTP routes for faceoff
//!
//! Handlers take already-extracted request parts (query string, the
//! `Authorization` header and the body bytes) and return a complete JSON
//! response, so they run without a socket in tests.

pub mod content;
pub mod credits;
pub mod health;
pub mod preferences;
pub mod rankings;
pub mod referrals;
pub mod scores;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error};

use crate::types::{FaceoffError, Result};

pub use content::handle_content;
pub use credits::{handle_credits, handle_credits_reset, handle_scheduler_status, handle_scheduler_trigger};
pub use health::{health_check, version_info};
pub use preferences::{handle_get_preferences, handle_save_preferences};
pub use rankings::handle_rankings;
pub use referrals::handle_referrals_request;
pub use scores::handle_score;

type FullBody = Full<Bytes>;

/// Serialize `value` as a JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<FullBody> {
    let body = serde_json::to_string(value)
        .unwrap_or_else(|_| r#"{"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// `{ "error": ... }` with the status mapped from the error kind
pub fn error_response(err: FaceoffError) -> Response<FullBody> {
    let (status, message) = err.into_status_code_and_body();
    if status.is_server_error() {
        error!(status = status.as_u16(), "{}", message);
    } else {
        debug!(status = status.as_u16(), "{}", message);
    }
    json_response(status, &serde_json::json!({ "error": message }))
}

/// 200 with the value, or the mapped error
pub fn respond<T: Serialize>(result: Result<T>) -> Response<FullBody> {
    match result {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(e) => error_response(e),
    }
}

/// Decode a query string; a missing query decodes as empty
pub fn parse_query<T: DeserializeOwned>(query: Option<&str>) -> Result<T> {
    serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| FaceoffError::BadRequest(format!("Invalid query: {}", e)))
}

/// Decode a JSON request body
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return Err(FaceoffError::BadRequest("Request body is required".into()));
    }
    serde_json::from_slice(body)
        .map_err(|e| FaceoffError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Parse an optional numeric query value
pub(crate) fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<usize>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse::<usize>().map(Some).map_err(|_| {
            FaceoffError::BadRequest(format!("'{}' must be a non-negative integer", name))
        }),
    }
}

/// Treat an empty query value as absent
pub(crate) fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use http_body_util::BodyExt;

    /// Collect a response into its status and decoded JSON body
    pub async fn read_json(response: Response<FullBody>) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct Q {
        code: Option<String>,
    }

    #[test]
    fn test_parse_query() {
        let q: Q = parse_query(Some("code=AB12CD34")).unwrap();
        assert_eq!(q.code.as_deref(), Some("AB12CD34"));
        let q: Q = parse_query(None).unwrap();
        assert!(q.code.is_none());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("limit", Some("5")).unwrap(), Some(5));
        assert_eq!(parse_count("limit", Some("")).unwrap(), None);
        assert!(parse_count("limit", Some("-1")).is_err());
        assert!(parse_count("limit", Some("ten")).is_err());
    }

    #[test]
    fn test_parse_json_requires_body() {
        let err = parse_json::<serde_json::Value>(b"").unwrap_err();
        assert!(matches!(err, FaceoffError::BadRequest(_)));
        assert!(parse_json::<serde_json::Value>(b"{not json").is_err());
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let resp = error_response(FaceoffError::Database("boom".into()));
        let (status, body) = test_support::read_json(resp).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("boom"));
    }
}
