//! Daily credit balances

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use std::sync::Arc;
use tracing::{error, info};

use super::scheduler::ResetTrigger;
use crate::models::{CreditTier, ResetSummary, UserCredits};
use crate::store::CreditStore;
use crate::types::{FaceoffError, Lookup, Result};

const ALL_TIERS: [CreditTier; 3] = [CreditTier::Free, CreditTier::Premium, CreditTier::Pro];

#[derive(Clone)]
pub struct CreditService {
    store: Arc<dyn CreditStore>,
}

impl CreditService {
    pub fn new(store: Arc<dyn CreditStore>) -> Self {
        Self { store }
    }

    /// Stored balance, or a free-tier balance at full allowance
    pub async fn get(&self, user_id: &str) -> Result<Lookup<UserCredits>> {
        let stored = self.store.get(user_id).await?;
        Ok(Lookup::from_option(stored, || UserCredits::new_free(user_id)))
    }

    /// Restore every balance to its tier's daily limit.
    ///
    /// Each tier is reset independently; a failing tier is reported in
    /// `errors` without stopping the others.
    pub async fn reset_all(&self, today: &str) -> ResetSummary {
        let mut summary = ResetSummary::default();

        for tier in ALL_TIERS {
            match self.store.reset_tier(tier, today).await {
                Ok(count) => summary.count += count,
                Err(e) => {
                    error!(tier = %tier, error = %e, "Credit reset failed for tier");
                    summary
                        .errors
                        .push(format!("Failed to reset credits for tier {}: {}", tier, e));
                }
            }
        }

        summary.success = summary.errors.is_empty();
        info!(
            date = today,
            count = summary.count,
            errors = summary.errors.len(),
            "Daily credit reset finished"
        );
        summary
    }
}

/// Reset trigger that calls the credit service directly
pub struct LocalResetTrigger {
    credits: CreditService,
    offset: FixedOffset,
}

impl LocalResetTrigger {
    pub fn new(credits: CreditService, offset: FixedOffset) -> Self {
        Self { credits, offset }
    }
}

#[async_trait]
impl ResetTrigger for LocalResetTrigger {
    async fn trigger(&self) -> Result<ResetSummary> {
        let summary = self.credits.reset_all(&local_date(self.offset)).await;
        if summary.success {
            Ok(summary)
        } else {
            Err(FaceoffError::Database(summary.errors.join("; ")))
        }
    }
}

/// `YYYY-MM-DD` for the current day at `offset`
pub fn local_date(offset: FixedOffset) -> String {
    Utc::now().with_timezone(&offset).format("%Y-%m-%d").to_string()
}
