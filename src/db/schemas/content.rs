//! Content (tweet) document schema
//!
//! Field names follow the existing `tweets` collection.

use bson::{doc, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::models::ContentItem;

/// Collection name for content
pub const CONTENT_COLLECTION: &str = "tweets";

/// Content document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContentDoc {
    /// Tweet identifier
    #[serde(rename = "_id")]
    pub id: String,

    pub created_at: DateTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet_url: Option<String>,

    pub text: String,

    /// Primary category
    pub category: String,

    /// Primary tag
    pub tag: String,

    /// Secondary categories
    #[serde(default)]
    pub categories: Vec<String>,

    /// Secondary tags
    #[serde(default)]
    pub tags: Vec<String>,

    pub author_id: String,

    /// Author handle
    #[serde(rename = "author")]
    pub author_handle: String,

    pub author_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_pfp: Option<String>,

    #[serde(default)]
    pub author_followers: i64,
}

impl From<ContentDoc> for ContentItem {
    fn from(doc: ContentDoc) -> Self {
        ContentItem {
            id: doc.id,
            author_id: doc.author_id,
            author_name: doc.author_name,
            author_handle: doc.author_handle,
            author_avatar_url: doc.author_pfp,
            author_follower_count: doc.author_followers,
            text: doc.text,
            category: doc.category,
            tag: doc.tag,
            categories: doc.categories,
            tags: doc.tags,
            created_at: doc.created_at.to_chrono(),
            url: doc.tweet_url,
        }
    }
}

impl From<ContentItem> for ContentDoc {
    fn from(item: ContentItem) -> Self {
        ContentDoc {
            id: item.id,
            created_at: DateTime::from_chrono(item.created_at),
            tweet_url: item.url,
            text: item.text,
            category: item.category,
            tag: item.tag,
            categories: item.categories,
            tags: item.tags,
            author_id: item.author_id,
            author_handle: item.author_handle,
            author_name: item.author_name,
            author_pfp: item.author_avatar_url,
            author_followers: item.author_follower_count,
        }
    }
}

impl IntoIndexes for ContentDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "category": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("category_created_at".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "tag": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("tag_created_at".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_at_desc".to_string())
                        .build(),
                ),
            ),
        ]
    }
}
