//! User preference profiles
//!
//! Weights are non-negative; only strictly positive weights count as an
//! active preference. Tag keys are stored as `category:tag`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::types::{FaceoffError, Result};

/// Category or tag name mapped to its preference weight
pub type WeightMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceProfile {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub category_weights: WeightMap,
    #[serde(default)]
    pub tag_weights: WeightMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PreferenceProfile {
    /// Empty profile for a user who has never saved preferences
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: None,
            category_weights: WeightMap::new(),
            tag_weights: WeightMap::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Categories with a strictly positive weight
    pub fn preferred_categories(&self) -> HashSet<String> {
        active_keys(&self.category_weights).map(str::to_string).collect()
    }

    /// Tags with a strictly positive weight, `category:` prefix removed
    pub fn preferred_tags(&self) -> HashSet<String> {
        active_keys(&self.tag_weights)
            .map(|key| strip_category_prefix(key).to_string())
            .collect()
    }

    pub fn has_active_preferences(&self) -> bool {
        active_keys(&self.category_weights).next().is_some()
            || active_keys(&self.tag_weights).next().is_some()
    }
}

fn active_keys(weights: &WeightMap) -> impl Iterator<Item = &str> {
    weights
        .iter()
        .filter(|(_, w)| **w > 0.0)
        .map(|(k, _)| k.as_str())
}

/// `"Tech:rust"` → `"rust"`; keys without a prefix are returned unchanged
pub fn strip_category_prefix(key: &str) -> &str {
    key.split_once(':').map(|(_, tag)| tag).unwrap_or(key)
}

/// Reject negative or non-finite weights and empty keys
pub fn validate_weights(kind: &str, weights: &WeightMap) -> Result<()> {
    for (key, weight) in weights {
        if key.trim().is_empty() {
            return Err(FaceoffError::BadRequest(format!("Empty {} name", kind)));
        }
        if !weight.is_finite() || *weight < 0.0 {
            return Err(FaceoffError::BadRequest(format!(
                "Invalid weight {} for {} '{}': must be a non-negative number",
                weight, kind, key
            )));
        }
    }
    Ok(())
}
