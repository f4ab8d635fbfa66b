//! Per-user credit balance document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::models::{CreditTier, UserCredits};

/// Collection name for credit balances
pub const CREDITS_COLLECTION: &str = "user_credits";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserCreditsDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub user_id: String,

    #[serde(default)]
    pub tier: CreditTier,

    #[serde(default)]
    pub daily_credits: i64,

    #[serde(default)]
    pub total_credits: i64,

    #[serde(default)]
    pub last_reset_date: String,
}

impl From<UserCreditsDoc> for UserCredits {
    fn from(doc: UserCreditsDoc) -> Self {
        UserCredits {
            user_id: doc.user_id,
            tier: doc.tier,
            daily_credits: doc.daily_credits,
            total_credits: doc.total_credits,
            last_reset_date: doc.last_reset_date,
        }
    }
}

impl IntoIndexes for UserCreditsDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "user_id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}
