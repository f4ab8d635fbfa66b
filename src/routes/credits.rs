//! Credit balances and the daily reset endpoints

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use super::{error_response, json_response, respond};
use crate::services::credits::local_date;
use crate::server::AppState;
use crate::types::Result;

async fn balance(state: &AppState, auth: Option<&str>) -> Result<serde_json::Value> {
    let caller = state.sessions.authenticate(auth)?;
    let lookup = state.credits.get(&caller.sub).await?;
    Ok(serde_json::to_value(lookup.body())?)
}

/// `GET /credits`
pub async fn handle_credits(state: &AppState, auth: Option<&str>) -> Response<Full<Bytes>> {
    respond(balance(state, auth).await)
}

/// `POST /credits/reset`, called by the scheduler or an external cron
pub async fn handle_credits_reset(state: &AppState, auth: Option<&str>) -> Response<Full<Bytes>> {
    if let Err(e) = state.check_cron_secret(auth) {
        return error_response(e);
    }

    let summary = state.credits.reset_all(&local_date(state.reset_offset)).await;
    let status = if summary.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    json_response(status, &summary)
}

/// `GET /credits/scheduler`
pub async fn handle_scheduler_status(state: &AppState) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &state.scheduler.status().await)
}

/// `POST /credits/scheduler/trigger`
pub async fn handle_scheduler_trigger(
    state: &AppState,
    auth: Option<&str>,
) -> Response<Full<Bytes>> {
    if let Err(e) = state.check_cron_secret(auth) {
        return error_response(e);
    }

    let outcome = state.scheduler.manual_reset().await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    json_response(status, &outcome)
}
