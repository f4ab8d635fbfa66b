//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Request parsing stops
//! at the edge: handlers receive the query string, the `Authorization`
//! header and the collected body, which keeps them testable without sockets.

use bytes::Bytes;
use chrono::FixedOffset;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{extract_token_from_header, SessionValidator};
use crate::config::{Args, ResetTriggerKind};
use crate::routes;
use crate::selection::ContentSelector;
use crate::services::{
    CreditResetScheduler, CreditService, HttpResetTrigger, LocalResetTrigger, PreferenceService,
    RankingMaterializer, ReferralService, ResetTrigger, ScoreService,
};
use crate::store::Stores;
use crate::types::{FaceoffError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest request body accepted
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Storage backend name ("mongodb" or "memory")
    pub backend: &'static str,
    pub sessions: SessionValidator,
    cron_secret: Option<String>,
    /// Offset whose local date stamps credit resets
    pub reset_offset: FixedOffset,
    pub selector: ContentSelector,
    pub preferences: PreferenceService,
    pub scores: ScoreService,
    pub rankings: RankingMaterializer,
    pub referrals: ReferralService,
    pub credits: CreditService,
    pub scheduler: CreditResetScheduler,
    pub started_at: Instant,
}

impl AppState {
    /// Build the state with the reset trigger selected by `RESET_TRIGGER`
    pub fn new(args: Args, stores: Stores) -> Result<Self> {
        let trigger: Arc<dyn ResetTrigger> = match args.scheduler.reset_trigger {
            ResetTriggerKind::Http => {
                let secret = args.cron_secret().ok_or_else(|| {
                    FaceoffError::Config("CRON_SECRET is required for the HTTP reset trigger".into())
                })?;
                Arc::new(HttpResetTrigger::new(&args.app_url, secret)?)
            }
            ResetTriggerKind::Local => Arc::new(LocalResetTrigger::new(
                CreditService::new(Arc::clone(&stores.credits)),
                reset_offset(&args)?,
            )),
        };
        Self::with_trigger(args, stores, trigger)
    }

    pub fn with_trigger(
        args: Args,
        stores: Stores,
        trigger: Arc<dyn ResetTrigger>,
    ) -> Result<Self> {
        let secret = args
            .jwt_secret()
            .ok_or_else(|| FaceoffError::Config("JWT_SECRET is required".into()))?;
        let sessions = SessionValidator::new(secret)?;
        let offset = reset_offset(&args)?;

        let preferences = PreferenceService::new(Arc::clone(&stores.preferences));
        let credits = CreditService::new(Arc::clone(&stores.credits));
        let scheduler =
            CreditResetScheduler::new(trigger, offset, args.scheduler.reset_max_failures);

        Ok(Self {
            backend: stores.backend,
            sessions,
            cron_secret: args.cron_secret(),
            reset_offset: offset,
            selector: ContentSelector::new(Arc::clone(&stores.content), preferences.clone()),
            preferences,
            scores: ScoreService::new(Arc::clone(&stores.ledger)),
            rankings: RankingMaterializer::new(Arc::clone(&stores.ledger)),
            referrals: ReferralService::new(
                Arc::clone(&stores.referrals),
                Arc::clone(&stores.credits),
                args.referral_link_base.clone(),
            ),
            credits,
            scheduler,
            started_at: Instant::now(),
            args,
        })
    }

    /// Check a `Bearer <CRON_SECRET>` header
    pub fn check_cron_secret(&self, auth_header: Option<&str>) -> Result<()> {
        let expected = self
            .cron_secret
            .as_deref()
            .ok_or_else(|| FaceoffError::Unauthorized("Cron secret not configured".into()))?;

        match extract_token_from_header(auth_header) {
            Some(token) if token == expected => Ok(()),
            _ => Err(FaceoffError::Unauthorized("Unauthorized".into())),
        }
    }
}

fn reset_offset(args: &Args) -> Result<FixedOffset> {
    args.scheduler.reset_offset().ok_or_else(|| {
        FaceoffError::Config("RESET_UTC_OFFSET_HOURS must be between -23 and 23".into())
    })
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "faceoff listening on {} (storage: {})",
        state.args.listen, state.backend
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - default secrets in use");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let auth = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let body = if method == Method::POST {
        match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!("[{}] {} {} body error: {}", addr, method, path, e);
                return Ok(to_boxed(bad_request_response(
                    "Request body too large or unreadable",
                )));
            }
        }
    } else {
        Bytes::new()
    };

    let response = dispatch(
        &state,
        &method,
        &path,
        query.as_deref(),
        auth.as_deref(),
        body,
    )
    .await;

    info!(
        "[{}] {} {} -> {} ({} ms)",
        addr,
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );

    Ok(to_boxed(response))
}

/// Route a parsed request to its handler
pub async fn dispatch(
    state: &AppState,
    method: &Method,
    path: &str,
    query: Option<&str>,
    auth: Option<&str>,
    body: Bytes,
) -> Response<Full<Bytes>> {
    if method == Method::OPTIONS {
        return preflight_response();
    }

    if path.starts_with("/referrals/") {
        return routes::handle_referrals_request(state, method, path, query, auth, &body).await;
    }

    match (method, path) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => routes::health_check(state).await,
        (&Method::GET, "/version") => routes::version_info(),

        (&Method::GET, "/content") => routes::handle_content(state, query, auth).await,
        (&Method::POST, "/scores") => routes::handle_score(state, &body).await,
        (&Method::GET, "/rankings") => routes::handle_rankings(state, query).await,

        (&Method::GET, "/preferences") => routes::handle_get_preferences(state, auth).await,
        (&Method::POST, "/preferences") => {
            routes::handle_save_preferences(state, auth, &body).await
        }

        (&Method::GET, "/credits") => routes::handle_credits(state, auth).await,
        (&Method::POST, "/credits/reset") => routes::handle_credits_reset(state, auth).await,
        (&Method::GET, "/credits/scheduler") => routes::handle_scheduler_status(state).await,
        (&Method::POST, "/credits/scheduler/trigger") => {
            routes::handle_scheduler_trigger(state, auth).await
        }

        _ => not_found_response(path),
    }
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Bad Request",
        "message": message
    });

    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

/// Dev-mode state over memory stores with an in-process reset trigger
#[cfg(test)]
pub(crate) fn test_state_with(stores: Stores) -> AppState {
    use clap::Parser;

    let mut args = Args::parse_from(["faceoff", "--dev-mode"]);
    args.scheduler.reset_trigger = ResetTriggerKind::Local;
    AppState::new(args, stores).unwrap()
}

#[cfg(test)]
pub(crate) fn test_state(content: crate::store::MemoryContentStore) -> AppState {
    test_state_with(Stores::memory_with_content(content))
}
