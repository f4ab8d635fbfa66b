//! In-memory stores
//!
//! Used when running in dev mode without MongoDB and as document-store
//! doubles in tests. Per-key updates run under the DashMap shard lock, so
//! ledger increments are atomic here as well.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{ContentStore, CreditStore, PreferenceStore, ReferralStore, ScoreLedger};
use crate::models::{
    AuthorIdentity, AuthorScoreEntry, ContentItem, CreditTier, PreferenceProfile, Referral,
    ReferralCode, UserCredits,
};
use crate::selection::SelectionPlan;
use crate::types::Result;

// =============================================================================
// Content
// =============================================================================

#[derive(Default)]
pub struct MemoryContentStore {
    items: DashMap<String, ContentItem>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the catalog
    pub fn insert(&self, item: ContentItem) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Small built-in catalog for dev mode without MongoDB
    pub fn demo() -> Self {
        const ITEMS: &[(&str, &str, &str, &str)] = &[
            ("ferris", "Tech", "rust", "Borrow checker says no, and honestly it was right."),
            ("gopher", "Tech", "go", "Shipped a single static binary before lunch."),
            ("adalove", "Science", "math", "Every proof is a program if you squint hard enough."),
            ("stargazer", "Science", "space", "Saturn's rings are younger than some dinosaurs."),
            ("goalline", "Sports", "football", "Stoppage time winners never get old."),
            ("courtside", "Sports", "basketball", "Three straight threes to close the quarter."),
            ("bassline", "Music", "jazz", "Modal jazz is just vibes with a music theory degree."),
            ("synthwave", "Music", "electronic", "Found an old drum machine at a flea market."),
        ];

        let now = Utc::now();
        ITEMS
            .iter()
            .enumerate()
            .map(|(i, (handle, category, tag, text))| ContentItem {
                id: format!("demo-{}", i + 1),
                author_id: format!("demo-author-{}", handle),
                author_name: handle.to_string(),
                author_handle: handle.to_string(),
                author_avatar_url: None,
                author_follower_count: 0,
                text: text.to_string(),
                category: category.to_string(),
                tag: tag.to_string(),
                categories: Vec::new(),
                tags: Vec::new(),
                created_at: now - chrono::Duration::minutes(i as i64),
                url: None,
            })
            .collect()
    }
}

impl FromIterator<ContentItem> for MemoryContentStore {
    fn from_iter<I: IntoIterator<Item = ContentItem>>(iter: I) -> Self {
        let store = Self::new();
        for item in iter {
            store.insert(item);
        }
        store
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn select(&self, plan: &SelectionPlan) -> Result<Vec<ContentItem>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let snapshot: Vec<ContentItem> = self.items.iter().map(|e| e.value().clone()).collect();
        Ok(plan.apply(snapshot))
    }
}

// =============================================================================
// Preferences
// =============================================================================

#[derive(Default)]
pub struct MemoryPreferenceStore {
    profiles: DashMap<String, PreferenceProfile>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn get(&self, user_id: &str) -> Result<Option<PreferenceProfile>> {
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    async fn save(&self, mut profile: PreferenceProfile) -> Result<PreferenceProfile> {
        let now = Utc::now();
        profile.updated_at = Some(now);

        match self.profiles.entry(profile.user_id.clone()) {
            Entry::Occupied(mut existing) => {
                profile.created_at = existing.get().created_at.or(Some(now));
                existing.insert(profile.clone());
            }
            Entry::Vacant(slot) => {
                profile.created_at = Some(now);
                slot.insert(profile.clone());
            }
        }
        Ok(profile)
    }
}

// =============================================================================
// Score ledger
// =============================================================================

#[derive(Default)]
pub struct MemoryScoreLedger {
    entries: DashMap<String, AuthorScoreEntry>,
}

impl MemoryScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreLedger for MemoryScoreLedger {
    async fn increment(&self, author: &AuthorIdentity) -> Result<AuthorScoreEntry> {
        let mut entry = self
            .entries
            .entry(author.author_id.clone())
            .or_insert_with(|| AuthorScoreEntry::zero(author.author_id.clone()));

        entry.points += 1;
        entry.author_name = author.author_name.clone();
        entry.author_handle = author.author_handle.clone();
        entry.author_avatar_url = author.author_avatar_url.clone();
        entry.last_updated = Utc::now();

        Ok(entry.clone())
    }

    async fn get(&self, author_id: &str) -> Result<Option<AuthorScoreEntry>> {
        Ok(self.entries.get(author_id).map(|e| e.value().clone()))
    }

    async fn top(&self, limit: usize) -> Result<Vec<AuthorScoreEntry>> {
        let mut all: Vec<AuthorScoreEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.author_id.cmp(&b.author_id))
        });
        all.truncate(limit);
        Ok(all)
    }
}

// =============================================================================
// Referrals
// =============================================================================

#[derive(Default)]
struct CodeIndex {
    by_code: HashMap<String, ReferralCode>,
    by_user: HashMap<String, String>,
}

#[derive(Default)]
pub struct MemoryReferralStore {
    codes: RwLock<CodeIndex>,
    /// Keyed by (referred user, code)
    referrals: DashMap<(String, String), Referral>,
}

impl MemoryReferralStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReferralStore for MemoryReferralStore {
    async fn code_for_user(&self, user_id: &str) -> Result<Option<ReferralCode>> {
        let index = self.codes.read().await;
        Ok(index
            .by_user
            .get(user_id)
            .and_then(|code| index.by_code.get(code))
            .cloned())
    }

    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>> {
        Ok(self.codes.read().await.by_code.get(code).cloned())
    }

    async fn insert_code(&self, code: &ReferralCode) -> Result<bool> {
        let mut index = self.codes.write().await;
        if index.by_user.contains_key(&code.user_id) || index.by_code.contains_key(&code.code) {
            return Ok(false);
        }
        index.by_user.insert(code.user_id.clone(), code.code.clone());
        index.by_code.insert(code.code.clone(), code.clone());
        Ok(true)
    }

    async fn increment_usage(&self, code: &str) -> Result<()> {
        if let Some(existing) = self.codes.write().await.by_code.get_mut(code) {
            existing.usage_count += 1;
        }
        Ok(())
    }

    async fn has_redeemed(&self, referred_id: &str, code: &str) -> Result<bool> {
        Ok(self
            .referrals
            .contains_key(&(referred_id.to_string(), code.to_string())))
    }

    async fn record_redemption(&self, referral: &Referral) -> Result<bool> {
        let key = (referral.referred_id.clone(), referral.referral_code.clone());
        match self.referrals.entry(key) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(referral.clone());
                Ok(true)
            }
        }
    }

    async fn remove_redemption(&self, referred_id: &str, code: &str) -> Result<()> {
        self.referrals
            .remove(&(referred_id.to_string(), code.to_string()));
        Ok(())
    }

    async fn history(&self, referrer_id: &str) -> Result<Vec<Referral>> {
        let mut made: Vec<Referral> = self
            .referrals
            .iter()
            .filter(|r| r.value().referrer_id == referrer_id)
            .map(|r| r.value().clone())
            .collect();
        made.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(made)
    }
}

// =============================================================================
// Credits
// =============================================================================

#[derive(Default)]
pub struct MemoryCreditStore {
    balances: DashMap<String, UserCredits>,
}

impl MemoryCreditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance
    pub fn insert(&self, credits: UserCredits) {
        self.balances.insert(credits.user_id.clone(), credits);
    }
}

#[async_trait]
impl CreditStore for MemoryCreditStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserCredits>> {
        Ok(self.balances.get(user_id).map(|c| c.value().clone()))
    }

    async fn grant_bonus(&self, user_id: &str, amount: i64) -> Result<UserCredits> {
        let mut balance = self
            .balances
            .entry(user_id.to_string())
            .or_insert_with(|| UserCredits::new_free(user_id));
        balance.total_credits += amount;
        Ok(balance.clone())
    }

    async fn reset_tier(&self, tier: CreditTier, today: &str) -> Result<u64> {
        let mut count = 0;
        for mut balance in self.balances.iter_mut() {
            if balance.tier == tier {
                balance.daily_credits = tier.daily_limit();
                balance.last_reset_date = today.to_string();
                count += 1;
            }
        }
        Ok(count)
    }
}
