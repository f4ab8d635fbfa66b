//! MongoDB-backed stores

use async_trait::async_trait;
use bson::{doc, DateTime};
use mongodb::options::FindOptions;
use tracing::debug;

use super::{ContentStore, CreditStore, PreferenceStore, ReferralStore, ScoreLedger};
use crate::db::schemas::{
    AuthorScoreDoc, ContentDoc, PreferenceDoc, ReferralCodeDoc, ReferralDoc, UserCreditsDoc,
};
use crate::db::{MongoClient, MongoCollection};
use crate::models::{
    AuthorIdentity, AuthorScoreEntry, ContentItem, CreditTier, PreferenceProfile, Referral,
    ReferralCode, UserCredits,
};
use crate::selection::SelectionPlan;
use crate::types::Result;

// =============================================================================
// Content
// =============================================================================

pub struct MongoContentStore {
    tweets: MongoCollection<ContentDoc>,
}

impl MongoContentStore {
    pub async fn new(mongo: &MongoClient, collection: &str) -> Result<Self> {
        Ok(Self {
            tweets: mongo.collection(collection).await?,
        })
    }
}

#[async_trait]
impl ContentStore for MongoContentStore {
    async fn select(&self, plan: &SelectionPlan) -> Result<Vec<ContentItem>> {
        let pipeline = plan.to_pipeline();
        debug!(stages = pipeline.len(), "Running content selection pipeline");

        let docs = self.tweets.aggregate(pipeline).await?;
        Ok(docs.into_iter().map(ContentItem::from).collect())
    }
}

// =============================================================================
// Preferences
// =============================================================================

pub struct MongoPreferenceStore {
    profiles: MongoCollection<PreferenceDoc>,
}

impl MongoPreferenceStore {
    pub async fn new(mongo: &MongoClient, collection: &str) -> Result<Self> {
        Ok(Self {
            profiles: mongo.collection(collection).await?,
        })
    }
}

#[async_trait]
impl PreferenceStore for MongoPreferenceStore {
    async fn get(&self, user_id: &str) -> Result<Option<PreferenceProfile>> {
        Ok(self
            .profiles
            .find_one(doc! { "user_id": user_id })
            .await?
            .map(PreferenceProfile::from))
    }

    async fn save(&self, profile: PreferenceProfile) -> Result<PreferenceProfile> {
        let now = DateTime::now();

        let mut set = doc! {
            "categoryPreferences": bson::to_bson(&profile.category_weights)?,
            "tagPreferences": bson::to_bson(&profile.tag_weights)?,
            "updatedAt": now,
        };
        if let Some(username) = &profile.username {
            set.insert("username", username.as_str());
        }

        let stored = self
            .profiles
            .upsert_returning(
                doc! { "user_id": profile.user_id.as_str() },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "createdAt": now },
                },
            )
            .await?;

        Ok(stored.into())
    }
}

// =============================================================================
// Score ledger
// =============================================================================

pub struct MongoScoreLedger {
    rankings: MongoCollection<AuthorScoreDoc>,
}

impl MongoScoreLedger {
    pub async fn new(mongo: &MongoClient, collection: &str) -> Result<Self> {
        Ok(Self {
            rankings: mongo.collection(collection).await?,
        })
    }
}

#[async_trait]
impl ScoreLedger for MongoScoreLedger {
    async fn increment(&self, author: &AuthorIdentity) -> Result<AuthorScoreEntry> {
        let updated = self
            .rankings
            .upsert_returning(
                doc! { "author_id": author.author_id.as_str() },
                doc! {
                    "$inc": { "points": 1_i64 },
                    "$set": {
                        "author_name": author.author_name.as_str(),
                        "author_username": author.author_handle.as_str(),
                        "author_pfp": author.author_avatar_url.clone(),
                        "last_updated": DateTime::now(),
                    },
                },
            )
            .await?;

        Ok(updated.into())
    }

    async fn get(&self, author_id: &str) -> Result<Option<AuthorScoreEntry>> {
        Ok(self
            .rankings
            .find_one(doc! { "author_id": author_id })
            .await?
            .map(AuthorScoreEntry::from))
    }

    async fn top(&self, limit: usize) -> Result<Vec<AuthorScoreEntry>> {
        let options = FindOptions::builder()
            .sort(doc! { "points": -1, "author_id": 1 })
            .limit(limit as i64)
            .build();

        let docs = self.rankings.find_many(doc! {}, Some(options)).await?;
        Ok(docs.into_iter().map(AuthorScoreEntry::from).collect())
    }
}

// =============================================================================
// Referrals
// =============================================================================

pub struct MongoReferralStore {
    codes: MongoCollection<ReferralCodeDoc>,
    referrals: MongoCollection<ReferralDoc>,
}

impl MongoReferralStore {
    pub async fn new(
        mongo: &MongoClient,
        codes_collection: &str,
        referrals_collection: &str,
    ) -> Result<Self> {
        Ok(Self {
            codes: mongo.collection(codes_collection).await?,
            referrals: mongo.collection(referrals_collection).await?,
        })
    }
}

#[async_trait]
impl ReferralStore for MongoReferralStore {
    async fn code_for_user(&self, user_id: &str) -> Result<Option<ReferralCode>> {
        Ok(self
            .codes
            .find_one(doc! { "user_id": user_id })
            .await?
            .map(ReferralCode::from))
    }

    async fn find_code(&self, code: &str) -> Result<Option<ReferralCode>> {
        Ok(self
            .codes
            .find_one(doc! { "code": code })
            .await?
            .map(ReferralCode::from))
    }

    async fn insert_code(&self, code: &ReferralCode) -> Result<bool> {
        self.codes.insert_unique(ReferralCodeDoc::from(code)).await
    }

    async fn increment_usage(&self, code: &str) -> Result<()> {
        self.codes
            .update_one(doc! { "code": code }, doc! { "$inc": { "usage_count": 1_i64 } })
            .await?;
        Ok(())
    }

    async fn has_redeemed(&self, referred_id: &str, code: &str) -> Result<bool> {
        Ok(self
            .referrals
            .find_one(doc! { "referred_id": referred_id, "referral_code": code })
            .await?
            .is_some())
    }

    async fn record_redemption(&self, referral: &Referral) -> Result<bool> {
        self.referrals.insert_unique(ReferralDoc::from(referral)).await
    }

    async fn remove_redemption(&self, referred_id: &str, code: &str) -> Result<()> {
        self.referrals
            .delete_one(doc! { "referred_id": referred_id, "referral_code": code })
            .await?;
        Ok(())
    }

    async fn history(&self, referrer_id: &str) -> Result<Vec<Referral>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let docs = self
            .referrals
            .find_many(doc! { "referrer_id": referrer_id }, Some(options))
            .await?;
        Ok(docs.into_iter().map(Referral::from).collect())
    }
}

// =============================================================================
// Credits
// =============================================================================

pub struct MongoCreditStore {
    balances: MongoCollection<UserCreditsDoc>,
}

impl MongoCreditStore {
    pub async fn new(mongo: &MongoClient, collection: &str) -> Result<Self> {
        Ok(Self {
            balances: mongo.collection(collection).await?,
        })
    }
}

#[async_trait]
impl CreditStore for MongoCreditStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserCredits>> {
        Ok(self
            .balances
            .find_one(doc! { "user_id": user_id })
            .await?
            .map(UserCredits::from))
    }

    async fn grant_bonus(&self, user_id: &str, amount: i64) -> Result<UserCredits> {
        let free = CreditTier::Free;
        let updated = self
            .balances
            .upsert_returning(
                doc! { "user_id": user_id },
                doc! {
                    "$inc": { "total_credits": amount },
                    "$setOnInsert": {
                        "tier": free.as_str(),
                        "daily_credits": free.daily_limit(),
                        "last_reset_date": "",
                    },
                },
            )
            .await?;

        Ok(updated.into())
    }

    async fn reset_tier(&self, tier: CreditTier, today: &str) -> Result<u64> {
        let result = self
            .balances
            .update_many(
                doc! { "tier": tier.as_str() },
                doc! {
                    "$set": {
                        "daily_credits": tier.daily_limit(),
                        "last_reset_date": today,
                    }
                },
            )
            .await?;

        Ok(result.matched_count)
    }
}
