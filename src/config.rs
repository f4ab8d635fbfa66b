//! Configuration for faceoff
//!
//! CLI arguments and environment variable handling using clap.

use chrono::FixedOffset;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;

use crate::db::schemas::{
    CONTENT_COLLECTION, CREDITS_COLLECTION, RANKING_COLLECTION, REFERRALS_COLLECTION,
    REFERRAL_CODES_COLLECTION, USERPREF_COLLECTION,
};

/// Minimum length accepted for the session signing secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// faceoff - swipe between two pieces of content, pick a favorite
#[derive(Parser, Debug, Clone)]
#[command(name = "faceoff")]
#[command(about = "Preference-weighted content selection and author rankings")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (dev JWT secret, in-memory storage fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "faceoff")]
    pub mongodb_db: String,

    /// Collection names
    #[command(flatten)]
    pub collections: CollectionArgs,

    /// JWT secret for session token verification (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Public base URL of this service, used by the credit reset trigger
    #[arg(long, env = "APP_URL", default_value = "http://localhost:8080")]
    pub app_url: String,

    /// Bearer secret guarding the credit reset endpoints
    #[arg(long, env = "CRON_SECRET")]
    pub cron_secret: Option<String>,

    /// Credit reset scheduler settings
    #[command(flatten)]
    pub scheduler: SchedulerArgs,

    /// Base URL for shareable referral links
    #[arg(long, env = "REFERRAL_LINK_BASE", default_value = "http://localhost:3000")]
    pub referral_link_base: String,
}

/// MongoDB collection names
#[derive(Parser, Debug, Clone)]
pub struct CollectionArgs {
    /// Content items (tweets)
    #[arg(long, env = "CONTENT_COLLECTION", default_value = CONTENT_COLLECTION)]
    pub content_collection: String,

    /// Author score ledger
    #[arg(long, env = "RANKING_COLLECTION", default_value = RANKING_COLLECTION)]
    pub ranking_collection: String,

    /// User preference profiles
    #[arg(long, env = "USERPREF_COLLECTION", default_value = USERPREF_COLLECTION)]
    pub userpref_collection: String,

    /// Referral redemption records
    #[arg(long, env = "REFERRALS_COLLECTION", default_value = REFERRALS_COLLECTION)]
    pub referrals_collection: String,

    /// Referral codes
    #[arg(long, env = "REFERRAL_CODES_COLLECTION", default_value = REFERRAL_CODES_COLLECTION)]
    pub referral_codes_collection: String,

    /// Per-user credit balances
    #[arg(long, env = "CREDITS_COLLECTION", default_value = CREDITS_COLLECTION)]
    pub credits_collection: String,
}

/// Credit reset scheduler configuration
#[derive(Parser, Debug, Clone)]
pub struct SchedulerArgs {
    /// Start the daily credit reset scheduler
    #[arg(long, env = "CREDIT_SCHEDULER_ENABLED", default_value = "false")]
    pub credit_scheduler_enabled: bool,

    /// UTC offset (hours) whose local midnight triggers the reset
    #[arg(long, env = "RESET_UTC_OFFSET_HOURS", default_value = "8", allow_hyphen_values = true)]
    pub reset_utc_offset_hours: i32,

    /// Consecutive failures after which the scheduler disables itself
    #[arg(long, env = "RESET_MAX_FAILURES", default_value = "5")]
    pub reset_max_failures: u32,

    /// How the scheduler performs the reset
    #[arg(long, env = "RESET_TRIGGER", value_enum, default_value = "http")]
    pub reset_trigger: ResetTriggerKind,
}

/// Reset trigger selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetTriggerKind {
    /// POST `{APP_URL}/credits/reset` with the cron secret
    Http,
    /// Call the credit service in-process
    Local,
}

impl SchedulerArgs {
    /// Fixed offset used to compute local midnight
    pub fn reset_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.reset_utc_offset_hours * 3600)
    }
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some("dev-only-insecure-secret-faceoff-0000".to_string()),
            (None, false) => None,
        }
    }

    /// Get effective cron secret (uses default in dev mode)
    pub fn cron_secret(&self) -> Option<String> {
        match (&self.cron_secret, self.dev_mode) {
            (Some(secret), _) => Some(secret.clone()),
            (None, true) => Some("dev-secret".to_string()),
            (None, false) => None,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(s) if s.len() < MIN_JWT_SECRET_LEN => {
                    return Err(format!(
                        "JWT_SECRET must be at least {} characters",
                        MIN_JWT_SECRET_LEN
                    ))
                }
                Some(_) => {}
            }

            if self.cron_secret.is_none() {
                return Err("CRON_SECRET is required in production mode".to_string());
            }
        }

        if self.scheduler.reset_offset().is_none() {
            return Err("RESET_UTC_OFFSET_HOURS must be between -23 and 23".to_string());
        }

        if self.scheduler.reset_max_failures == 0 {
            return Err("RESET_MAX_FAILURES must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["faceoff"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_dev_mode_defaults_validate() {
        let args = parse(&["--dev-mode"]);
        assert!(args.validate().is_ok());
        assert!(args.jwt_secret().is_some());
        assert_eq!(args.cron_secret().as_deref(), Some("dev-secret"));
    }

    #[test]
    fn test_production_requires_secrets() {
        let args = parse(&[]);
        assert!(args.validate().is_err());

        let args = parse(&["--jwt-secret", "short", "--cron-secret", "c"]);
        assert!(args.validate().unwrap_err().contains("at least"));

        let args = parse(&[
            "--jwt-secret",
            "0123456789abcdef0123456789abcdef",
            "--cron-secret",
            "c",
        ]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_collection_defaults() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.collections.content_collection, "tweets");
        assert_eq!(args.collections.ranking_collection, "author_rankings");
        assert_eq!(args.scheduler.reset_trigger, ResetTriggerKind::Http);

        let args = parse(&["--dev-mode", "--reset-trigger", "local"]);
        assert_eq!(args.scheduler.reset_trigger, ResetTriggerKind::Local);
    }

    #[test]
    fn test_reset_offset_bounds() {
        let args = parse(&["--dev-mode", "--reset-utc-offset-hours", "-5"]);
        assert_eq!(args.scheduler.reset_offset().unwrap().local_minus_utc(), -5 * 3600);

        let args = parse(&["--dev-mode", "--reset-utc-offset-hours", "30"]);
        assert!(args.validate().is_err());
    }
}
