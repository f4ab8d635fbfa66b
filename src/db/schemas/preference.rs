//! User preference document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::models::{PreferenceProfile, WeightMap};

/// Collection name for preference profiles
pub const USERPREF_COLLECTION: &str = "user_preferences";

/// Preference profile stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PreferenceDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(rename = "categoryPreferences", default)]
    pub category_preferences: WeightMap,

    /// Keys are `category:tag`
    #[serde(rename = "tagPreferences", default)]
    pub tag_preferences: WeightMap,

    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    #[serde(rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl From<PreferenceDoc> for PreferenceProfile {
    fn from(doc: PreferenceDoc) -> Self {
        PreferenceProfile {
            user_id: doc.user_id,
            username: doc.username,
            category_weights: doc.category_preferences,
            tag_weights: doc.tag_preferences,
            created_at: doc.created_at.map(|d| d.to_chrono()),
            updated_at: doc.updated_at.map(|d| d.to_chrono()),
        }
    }
}

impl IntoIndexes for PreferenceDoc {
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
