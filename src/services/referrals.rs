//! Referral codes: generation, lookup, validation and redemption

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::referral::{normalize_code, random_code, REWARD_CREDITS};
use crate::models::{Referral, ReferralCode, ReferralStats};
use crate::store::{CreditStore, ReferralStore};
use crate::types::{FaceoffError, Result};

/// Attempts at drawing an unused code before giving up
const MAX_CODE_ATTEMPTS: usize = 5;

/// Answer to "is this code usable?"
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeValidation {
    pub is_valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_id: Option<String>,
}

impl CodeValidation {
    fn invalid(message: &str) -> Self {
        Self {
            is_valid: false,
            message: message.to_string(),
            referrer_id: None,
        }
    }
}

/// Outcome of a redemption attempt. Business rejections are not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub success: bool,
    pub message: String,
    pub credits_awarded: i64,
}

impl Redemption {
    fn rejected(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            credits_awarded: 0,
        }
    }
}

#[derive(Clone)]
pub struct ReferralService {
    store: Arc<dyn ReferralStore>,
    credits: Arc<dyn CreditStore>,
    link_base: String,
}

impl ReferralService {
    pub fn new(
        store: Arc<dyn ReferralStore>,
        credits: Arc<dyn CreditStore>,
        link_base: impl Into<String>,
    ) -> Self {
        Self {
            store,
            credits,
            link_base: link_base.into(),
        }
    }

    /// Return the user's code, creating one on first call
    pub async fn generate(&self, user_id: &str) -> Result<ReferralCode> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            if let Some(existing) = self.store.code_for_user(user_id).await? {
                return Ok(existing);
            }

            let candidate = ReferralCode::new(user_id, random_code());
            if self.store.insert_code(&candidate).await? {
                info!(user_id = %user_id, code = %candidate.code, "Referral code created");
                return Ok(candidate);
            }
            warn!(user_id = %user_id, attempt, "Referral code insert collided, retrying");
        }

        Err(FaceoffError::Internal(format!(
            "Could not allocate a referral code after {} attempts",
            MAX_CODE_ATTEMPTS
        )))
    }

    pub async fn code(&self, user_id: &str) -> Result<ReferralCode> {
        self.store
            .code_for_user(user_id)
            .await?
            .ok_or_else(|| FaceoffError::NotFound("Referral code not found".into()))
    }

    /// Shareable link `{base}?ref={code}`
    pub async fn link(&self, user_id: &str) -> Result<String> {
        let code = self.code(user_id).await?;
        Ok(format!("{}?ref={}", self.link_base.trim_end_matches('/'), code.code))
    }

    pub async fn validate(&self, code: &str) -> Result<CodeValidation> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Ok(CodeValidation::invalid("No referral code provided"));
        }

        Ok(match self.store.find_code(&code).await? {
            Some(found) => CodeValidation {
                is_valid: true,
                message: "Valid referral code".to_string(),
                referrer_id: Some(found.user_id),
            },
            None => CodeValidation::invalid("Invalid referral code"),
        })
    }

    /// Redeem `code` on behalf of `user_id` and grant the reward
    pub async fn redeem(&self, user_id: &str, code: &str) -> Result<Redemption> {
        let code = normalize_code(code);
        let Some(record) = self.store.find_code(&code).await? else {
            return Ok(Redemption::rejected("Invalid referral code"));
        };

        if record.user_id == user_id {
            return Ok(Redemption::rejected("You cannot redeem your own referral code"));
        }
        if self.store.has_redeemed(user_id, &code).await? {
            return Ok(Redemption::rejected(
                "You have already redeemed this referral code",
            ));
        }

        let referral = Referral::completed(&record.user_id, user_id, &code);
        // The unique index decides concurrent redemptions of the same pair
        if !self.store.record_redemption(&referral).await? {
            return Ok(Redemption::rejected(
                "You have already redeemed this referral code",
            ));
        }

        // The record is only kept once the reward is granted, so a failed
        // grant can be retried
        if let Err(e) = self.credits.grant_bonus(user_id, REWARD_CREDITS).await {
            warn!(
                referred_id = %user_id,
                code = %code,
                error = %e,
                "Referral reward failed, removing redemption"
            );
            if let Err(undo) = self.store.remove_redemption(user_id, &code).await {
                error!(
                    referred_id = %user_id,
                    code = %code,
                    error = %undo,
                    "Failed to remove redemption record"
                );
            }
            return Err(e);
        }

        // Usage count is informational; the redemption stands without it
        if let Err(e) = self.store.increment_usage(&code).await {
            warn!(code = %code, error = %e, "Failed to bump referral code usage");
        }

        info!(
            referrer_id = %record.user_id,
            referred_id = %user_id,
            code = %code,
            "Referral redeemed"
        );

        Ok(Redemption {
            success: true,
            message: "Referral code redeemed successfully!".to_string(),
            credits_awarded: REWARD_CREDITS,
        })
    }

    pub async fn history(&self, user_id: &str) -> Result<Vec<Referral>> {
        self.store.history(user_id).await
    }

    pub async fn stats(&self, user_id: &str) -> Result<ReferralStats> {
        let history = self.store.history(user_id).await?;
        Ok(ReferralStats::from_history(&history))
    }
}
