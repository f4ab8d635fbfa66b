//! `POST /scores`: record that the caller picked an author's content

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde_json::json;

use super::{parse_json, respond};
use crate::models::AuthorIdentity;
use crate::server::AppState;
use crate::types::Result;

async fn record(state: &AppState, body: &[u8]) -> Result<serde_json::Value> {
    let author: AuthorIdentity = parse_json(body)?;
    let entry = state.scores.increment(&author).await?;
    Ok(json!({ "success": true, "points": entry.points }))
}

pub async fn handle_score(state: &AppState, body: &[u8]) -> Response<Full<Bytes>> {
    respond(record(state, body).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::read_json;
    use crate::server::test_state;
    use crate::store::MemoryContentStore;
    use hyper::StatusCode;

    #[tokio::test]
    async fn test_score_increments_and_overwrites_display_fields() {
        let state = test_state(MemoryContentStore::new());
        let first = br#"{"authorId":"auth1","authorHandle":"H","authorName":"Name","authorAvatarUrl":"u"}"#;
        let second = br#"{"authorId":"auth1","authorHandle":"H2","authorName":"Name","authorAvatarUrl":"u"}"#;

        let (status, body) = read_json(handle_score(&state, first).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (_, body) = read_json(handle_score(&state, second).await).await;
        assert_eq!(body["points"], 2);

        let entry = state.scores.get("auth1").await.unwrap().into_inner();
        assert_eq!(entry.author_handle, "H2");
    }

    #[tokio::test]
    async fn test_missing_author_id_is_400() {
        let state = test_state(MemoryContentStore::new());
        let (status, _) = read_json(handle_score(&state, br#"{"authorHandle":"H"}"#).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = read_json(handle_score(&state, b"").await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
