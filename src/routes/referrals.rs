//! `/referrals/*` endpoints
//!
//! Everything except `validate` acts on the signed-in user.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{non_empty, parse_json, parse_query, respond};
use crate::models::Referral;
use crate::server::AppState;
use crate::types::{FaceoffError, Result};

#[derive(Debug, Default, Deserialize)]
struct ValidateQuery {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RedeemRequest {
    #[serde(default, alias = "code")]
    referral_code: Option<String>,
}

/// History row as shown to the referrer
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntry {
    id: String,
    referred_id: String,
    referral_code: String,
    reward_credits: i64,
    status: &'static str,
    created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Referral> for HistoryEntry {
    fn from(r: Referral) -> Self {
        Self {
            status: if r.completed_at.is_some() {
                "completed"
            } else {
                "pending"
            },
            id: r.id,
            referred_id: r.referred_id,
            referral_code: r.referral_code,
            reward_credits: r.reward_credits,
            created_at: r.created_at,
            completed_at: r.completed_at,
        }
    }
}

async fn route(
    state: &AppState,
    method: &Method,
    action: &str,
    query: Option<&str>,
    auth: Option<&str>,
    body: &[u8],
) -> Result<serde_json::Value> {
    if (method, action) == (&Method::GET, "validate") {
        let params: ValidateQuery = parse_query(query)?;
        let code = non_empty(params.code).unwrap_or_default();
        return Ok(serde_json::to_value(state.referrals.validate(&code).await?)?);
    }

    let caller = state.sessions.authenticate(auth)?;
    let user_id = caller.sub.as_str();

    match (method, action) {
        (&Method::POST, "generate") => {
            let code = state.referrals.generate(user_id).await?;
            Ok(json!({ "success": true, "data": code }))
        }
        (&Method::GET, "code") => {
            let code = state.referrals.code(user_id).await?;
            Ok(json!({ "success": true, "data": code }))
        }
        (&Method::GET, "link") => {
            let link = state.referrals.link(user_id).await?;
            Ok(json!({ "success": true, "referralLink": link }))
        }
        (&Method::POST, "redeem") => {
            let request: RedeemRequest = parse_json(body)?;
            let code = non_empty(request.referral_code)
                .ok_or_else(|| FaceoffError::BadRequest("referralCode is required".into()))?;
            Ok(serde_json::to_value(state.referrals.redeem(user_id, &code).await?)?)
        }
        (&Method::GET, "history") => {
            let history: Vec<HistoryEntry> = state
                .referrals
                .history(user_id)
                .await?
                .into_iter()
                .map(HistoryEntry::from)
                .collect();
            Ok(json!({ "success": true, "data": history }))
        }
        (&Method::GET, "stats") => {
            let stats = state.referrals.stats(user_id).await?;
            Ok(json!({ "success": true, "data": stats }))
        }
        _ => Err(FaceoffError::NotFound(format!(
            "No referral endpoint {} /referrals/{}",
            method, action
        ))),
    }
}

/// Dispatch a request whose path starts with `/referrals/`
pub async fn handle_referrals_request(
    state: &AppState,
    method: &Method,
    path: &str,
    query: Option<&str>,
    auth: Option<&str>,
    body: &[u8],
) -> Response<Full<Bytes>> {
    let action = path
        .strip_prefix("/referrals/")
        .unwrap_or("")
        .trim_end_matches('/');
    respond(route(state, method, action, query, auth, body).await)
}
