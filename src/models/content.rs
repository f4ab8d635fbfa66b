//! Content items shown in the pick-a-favorite feed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single piece of content (a tweet) with denormalized author fields
///
/// Every item has exactly one primary `category` and `tag`; `categories`
/// and `tags` carry optional secondary memberships for cross-tagging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_handle: String,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    #[serde(default)]
    pub author_follower_count: i64,
    pub text: String,
    pub category: String,
    pub tag: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ContentItem {
    /// Primary category followed by any secondary categories
    pub fn all_categories(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.category.as_str()).chain(self.categories.iter().map(String::as_str))
    }

    /// Primary tag followed by any secondary tags
    pub fn all_tags(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.tag.as_str()).chain(self.tags.iter().map(String::as_str))
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.all_categories().any(|c| c == category)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.all_tags().any(|t| t == tag)
    }

    pub fn in_any_category(&self, categories: &HashSet<String>) -> bool {
        self.all_categories().any(|c| categories.contains(c))
    }

    pub fn has_any_tag(&self, tags: &HashSet<String>) -> bool {
        self.all_tags().any(|t| tags.contains(t))
    }
}
