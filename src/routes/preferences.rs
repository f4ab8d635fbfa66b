//! `GET /preferences` and `POST /preferences` for the signed-in user

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde::Deserialize;
use serde_json::json;

use super::{non_empty, parse_json, respond};
use crate::models::WeightMap;
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavePreferencesRequest {
    #[serde(default, alias = "categoryPreferences")]
    category_weights: WeightMap,
    #[serde(default, alias = "tagPreferences")]
    tag_weights: WeightMap,
    #[serde(default)]
    username: Option<String>,
}

async fn load(state: &AppState, auth: Option<&str>) -> Result<serde_json::Value> {
    let caller = state.sessions.authenticate(auth)?;
    let lookup = state.preferences.get(&caller.sub).await?;
    let body = lookup.body();

    Ok(json!({
        "success": true,
        "data": body.data,
        "isDefault": body.is_default,
    }))
}

async fn save(state: &AppState, auth: Option<&str>, body: &[u8]) -> Result<serde_json::Value> {
    let caller = state.sessions.authenticate(auth)?;
    let request: SavePreferencesRequest = parse_json(body)?;

    // Fall back to the handle carried by the session
    let username = non_empty(request.username).or(caller.username);
    let saved = state
        .preferences
        .save(&caller.sub, request.category_weights, request.tag_weights, username)
        .await?;

    Ok(json!({
        "success": true,
        "message": "Preferences saved successfully",
        "data": saved,
    }))
}

pub async fn handle_get_preferences(state: &AppState, auth: Option<&str>) -> Response<Full<Bytes>> {
    respond(load(state, auth).await)
}

pub async fn handle_save_preferences(
    state: &AppState,
    auth: Option<&str>,
    body: &[u8],
) -> Response<Full<Bytes>> {
    respond(save(state, auth, body).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::read_json;
    use crate::server::test_state;
    use crate::store::MemoryContentStore;
    use hyper::StatusCode;

    fn bearer(state: &AppState, user: &str, username: Option<&str>) -> String {
        format!("Bearer {}", state.sessions.issue(user, username, 60).unwrap())
    }

    #[tokio::test]
    async fn test_get_without_profile_returns_default() {
        let state = test_state(MemoryContentStore::new());
        let auth = bearer(&state, "u1", None);

        let (status, body) = read_json(handle_get_preferences(&state, Some(&auth)).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isDefault"], true);
        assert_eq!(body["data"]["userId"], "u1");
        assert!(body["data"]["categoryWeights"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let state = test_state(MemoryContentStore::new());
        let auth = bearer(&state, "u1", Some("ferris"));

        let payload = br#"{"categoryPreferences":{"Tech":1.0},"tagWeights":{"Tech:rust":2.0}}"#;
        let (status, body) =
            read_json(handle_save_preferences(&state, Some(&auth), payload).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Preferences saved successfully");
        assert_eq!(body["data"]["username"], "ferris");

        let (_, body) = read_json(handle_get_preferences(&state, Some(&auth)).await).await;
        assert_eq!(body["isDefault"], false);
        assert_eq!(body["data"]["categoryWeights"]["Tech"], 1.0);
        assert_eq!(body["data"]["tagWeights"]["Tech:rust"], 2.0);
    }

    #[tokio::test]
    async fn test_requires_session() {
        let state = test_state(MemoryContentStore::new());
        let (status, _) = read_json(handle_get_preferences(&state, None).await).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) =
            read_json(handle_save_preferences(&state, None, br#"{"categoryWeights":{}}"#).await)
                .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_weights_are_400() {
        let state = test_state(MemoryContentStore::new());
        let auth = bearer(&state, "u1", None);

        let (status, _) = read_json(
            handle_save_preferences(&state, Some(&auth), br#"{"categoryWeights":{"Tech":-1}}"#)
                .await,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = read_json(
            handle_save_preferences(&state, Some(&auth), br#"{"categoryWeights":{"Tech":"a"}}"#)
                .await,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
