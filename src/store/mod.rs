//! Storage seams
//!
//! Each concern sits behind an async trait so the services never see the
//! backend. `mongo` is the production implementation; `memory` serves dev
//! runs without a database and the test suite.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::CollectionArgs;
use crate::db::MongoClient;
use crate::models::{
    AuthorIdentity, AuthorScoreEntry, ContentItem, CreditTier, PreferenceProfile, Referral,
    ReferralCode, UserCredits,
};
use crate::selection::SelectionPlan;
use crate::types::Result;

pub use memory::{
    MemoryContentStore, MemoryCreditStore, MemoryPreferenceStore, MemoryReferralStore,
    MemoryScoreLedger,
};
pub use mongo::{
    MongoContentStore, MongoCreditStore, MongoPreferenceStore, MongoReferralStore,
    MongoScoreLedger,
};

/// Read access to the content catalog
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Execute a resolved selection plan
    async fn select(&self, plan: &SelectionPlan) -> Result<Vec<ContentItem>>;
}

/// Per-user preference profiles
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<PreferenceProfile>>;

    /// Replace the stored weight maps (upsert). `created_at` of an
    /// existing profile is kept.
    async fn save(&self, profile: PreferenceProfile) -> Result<PreferenceProfile>;
}

/// Monotonic per-author point counters
#[async_trait]
pub trait ScoreLedger: Send + Sync {
    /// Atomically add one point, creating the entry at zero if needed, and
    /// overwrite the display fields
    async fn increment(&self, author: &AuthorIdentity) -> Result<AuthorScoreEntry>;

    async fn get(&self, author_id: &str) -> Result<Option<AuthorScoreEntry>>;

    /// Entries by points descending, ties by author id ascending
    async fn top(&self, limit: usize) -> Result<Vec<AuthorScoreEntry>>;
}

/// Referral codes and redemption records
#[async_trait]
pub trait ReferralStore: Send + Sync {
    async fn code_for_user(&self, user_id: &str) -> Result<Option<ReferralCode>>;

    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>>;

    /// `false` when the user already owns a code or the code is taken
    async fn insert_code(&self, code: &ReferralCode) -> Result<bool>;

    async fn increment_usage(&self, code: &str) -> Result<()>;

    async fn has_redeemed(&self, referred_id: &str, code: &str) -> Result<bool>;

    /// `false` when this (user, code) pair was already redeemed
    async fn record_redemption(&self, referral: &Referral) -> Result<bool>;

    /// Undo a recorded redemption whose reward could not be granted
    async fn remove_redemption(&self, referred_id: &str, code: &str) -> Result<()>;

    /// Referrals made by `referrer_id`, newest first
    async fn history(&self, referrer_id: &str) -> Result<Vec<Referral>>;
}

/// Per-user credit balances
#[async_trait]
pub trait CreditStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserCredits>>;

    /// Add non-expiring credits, creating a free-tier balance if needed
    async fn grant_bonus(&self, user_id: &str, amount: i64) -> Result<UserCredits>;

    /// Restore the daily allowance for every user on `tier`; returns the
    /// number of balances touched
    async fn reset_tier(&self, tier: CreditTier, today: &str) -> Result<u64>;
}

/// One handle per storage concern
#[derive(Clone)]
pub struct Stores {
    pub content: Arc<dyn ContentStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub ledger: Arc<dyn ScoreLedger>,
    pub referrals: Arc<dyn ReferralStore>,
    pub credits: Arc<dyn CreditStore>,
    /// Backend name reported by `/health`
    pub backend: &'static str,
}

impl Stores {
    /// Fresh in-memory stores with an empty catalog
    pub fn memory() -> Self {
        Self::memory_with_content(MemoryContentStore::new())
    }

    pub fn memory_with_content(content: MemoryContentStore) -> Self {
        Self {
            content: Arc::new(content),
            preferences: Arc::new(MemoryPreferenceStore::new()),
            ledger: Arc::new(MemoryScoreLedger::new()),
            referrals: Arc::new(MemoryReferralStore::new()),
            credits: Arc::new(MemoryCreditStore::new()),
            backend: "memory",
        }
    }

    /// MongoDB stores; collections get their indexes on open
    pub async fn mongo(client: &MongoClient, names: &CollectionArgs) -> Result<Self> {
        Ok(Self {
            content: Arc::new(MongoContentStore::new(client, &names.content_collection).await?),
            preferences: Arc::new(
                MongoPreferenceStore::new(client, &names.userpref_collection).await?,
            ),
            ledger: Arc::new(MongoScoreLedger::new(client, &names.ranking_collection).await?),
            referrals: Arc::new(
                MongoReferralStore::new(
                    client,
                    &names.referral_codes_collection,
                    &names.referrals_collection,
                )
                .await?,
            ),
            credits: Arc::new(MongoCreditStore::new(client, &names.credits_collection).await?),
            backend: "mongodb",
        })
    }
}
