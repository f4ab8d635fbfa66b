//! Referral code and redemption document schemas

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::models::{Referral, ReferralCode};

/// Collection name for referral codes
pub const REFERRAL_CODES_COLLECTION: &str = "referral_codes";

/// Collection name for redemption records
pub const REFERRALS_COLLECTION: &str = "referrals";

/// A user's shareable referral code
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReferralCodeDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub user_id: String,

    pub code: String,

    #[serde(default)]
    pub usage_count: i64,

    pub created_at: DateTime,
}

impl From<ReferralCodeDoc> for ReferralCode {
    fn from(doc: ReferralCodeDoc) -> Self {
        ReferralCode {
            id: doc.id,
            user_id: doc.user_id,
            code: doc.code,
            usage_count: doc.usage_count,
            created_at: doc.created_at.to_chrono(),
        }
    }
}

impl From<&ReferralCode> for ReferralCodeDoc {
    fn from(code: &ReferralCode) -> Self {
        ReferralCodeDoc {
            id: code.id.clone(),
            user_id: code.user_id.clone(),
            code: code.code.clone(),
            usage_count: code.usage_count,
            created_at: DateTime::from_chrono(code.created_at),
        }
    }
}

impl IntoIndexes for ReferralCodeDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("user_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "code": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("code_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

/// A redemption of someone's code
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReferralDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub referrer_id: String,

    pub referred_id: String,

    pub referral_code: String,

    pub reward_credits: i64,

    pub created_at: DateTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime>,
}

impl From<ReferralDoc> for Referral {
    fn from(doc: ReferralDoc) -> Self {
        Referral {
            id: doc.id,
            referrer_id: doc.referrer_id,
            referred_id: doc.referred_id,
            referral_code: doc.referral_code,
            reward_credits: doc.reward_credits,
            created_at: doc.created_at.to_chrono(),
            completed_at: doc.completed_at.map(|d| d.to_chrono()),
        }
    }
}

impl From<&Referral> for ReferralDoc {
    fn from(r: &Referral) -> Self {
        ReferralDoc {
            id: r.id.clone(),
            referrer_id: r.referrer_id.clone(),
            referred_id: r.referred_id.clone(),
            referral_code: r.referral_code.clone(),
            reward_credits: r.reward_credits,
            created_at: DateTime::from_chrono(r.created_at),
            completed_at: r.completed_at.map(DateTime::from_chrono),
        }
    }
}

impl IntoIndexes for ReferralDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One redemption per (user, code)
            (
                doc! { "referred_id": 1, "referral_code": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("referred_code_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "referrer_id": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("referrer_history".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
