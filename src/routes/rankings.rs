//! `GET /rankings`: leaderboard derived from the score ledger

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde::Deserialize;
use serde_json::json;

use super::{parse_count, parse_query, respond};
use crate::services::ranking::{DEFAULT_RANKING_LIMIT, RANKING_PAGE_SIZE};
use crate::services::RankingPage;
use crate::server::AppState;
use crate::types::Result;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankingsQuery {
    limit: Option<String>,
    page: Option<String>,
    per_page: Option<String>,
}

async fn rankings(state: &AppState, query: Option<&str>) -> Result<serde_json::Value> {
    let params: RankingsQuery = parse_query(query)?;
    let limit = parse_count("limit", params.limit.as_deref())?.unwrap_or(DEFAULT_RANKING_LIMIT);
    let ranked = state.rankings.ranked_authors(limit).await?;

    // Paged view when a page is requested
    match parse_count("page", params.page.as_deref())? {
        Some(page) => {
            let per_page =
                parse_count("perPage", params.per_page.as_deref())?.unwrap_or(RANKING_PAGE_SIZE);
            Ok(serde_json::to_value(RankingPage::slice(&ranked, page, per_page))?)
        }
        None => Ok(json!({ "rankings": ranked })),
    }
}

pub async fn handle_rankings(state: &AppState, query: Option<&str>) -> Response<Full<Bytes>> {
    respond(rankings(state, query).await)
}
