//! `GET /content`: next batch of content for the swipe feed

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde::{Deserialize, Serialize};

use super::{non_empty, parse_count, parse_query, respond};
use crate::models::ContentItem;
use crate::selection::{ContentFilter, SelectionMode, SelectionRequest, DEFAULT_LIMIT};
use crate::server::AppState;
use crate::types::{FaceoffError, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentQuery {
    limit: Option<String>,
    skip: Option<String>,
    category: Option<String>,
    tag: Option<String>,
    mode: Option<String>,
    /// Comma-separated ids already shown to the caller, oldest first
    exclude_ids: Option<String>,
    random: Option<String>,
}

#[derive(Serialize)]
struct ContentResponse {
    tweets: Vec<ContentItem>,
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool> {
    match raw.map(str::trim) {
        None | Some("") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(_) => Err(FaceoffError::BadRequest(format!(
            "'{}' must be true or false",
            name
        ))),
    }
}

/// Build a selection request from the query string and the caller
fn selection_request(query: ContentQuery, user_id: Option<String>) -> Result<SelectionRequest> {
    let mode = match non_empty(query.mode) {
        Some(m) => m.parse::<SelectionMode>()?,
        None => SelectionMode::default(),
    };

    let exclude_ids = query
        .exclude_ids
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    Ok(SelectionRequest {
        user_id,
        mode,
        filter: ContentFilter {
            category: non_empty(query.category),
            tag: non_empty(query.tag),
        },
        exclude_ids,
        limit: parse_count("limit", query.limit.as_deref())?.unwrap_or(DEFAULT_LIMIT),
        skip: parse_count("skip", query.skip.as_deref())?.unwrap_or(0),
        randomize: parse_flag("random", query.random.as_deref())?,
    })
}

async fn select(state: &AppState, query: Option<&str>, auth: Option<&str>) -> Result<ContentResponse> {
    let params: ContentQuery = parse_query(query)?;
    let caller = state.sessions.authenticate_optional(auth)?;
    let request = selection_request(params, caller.map(|c| c.sub))?;

    let tweets = state.selector.select(&request).await?;
    Ok(ContentResponse { tweets })
}

/// Anonymous callers always get the explore feed
pub async fn handle_content(
    state: &AppState,
    query: Option<&str>,
    auth: Option<&str>,
) -> Response<Full<Bytes>> {
    respond(select(state, query, auth).await)
}
