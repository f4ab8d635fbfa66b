//! Author score ledger document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::models::AuthorScoreEntry;

/// Collection name for the score ledger
pub const RANKING_COLLECTION: &str = "author_rankings";

/// One author's accumulated points
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthorScoreDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    pub author_id: String,

    #[serde(default)]
    pub author_name: String,

    /// Handle, last writer wins
    #[serde(default)]
    pub author_username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_pfp: Option<String>,

    #[serde(default)]
    pub points: i64,

    pub last_updated: DateTime,
}

impl From<AuthorScoreDoc> for AuthorScoreEntry {
    fn from(doc: AuthorScoreDoc) -> Self {
        AuthorScoreEntry {
            author_id: doc.author_id,
            author_name: doc.author_name,
            author_handle: doc.author_username,
            author_avatar_url: doc.author_pfp,
            points: doc.points,
            last_updated: doc.last_updated.to_chrono(),
        }
    }
}

impl IntoIndexes for AuthorScoreDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "author_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("author_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "points": -1 },
                Some(
                    IndexOptions::builder()
                        .name("points_desc".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
