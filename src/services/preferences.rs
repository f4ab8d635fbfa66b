//! Preference store accessor

use std::sync::Arc;
use tracing::info;

use crate::models::preference::validate_weights;
use crate::models::{PreferenceProfile, WeightMap};
use crate::store::PreferenceStore;
use crate::types::{FaceoffError, Lookup, Result};

#[derive(Clone)]
pub struct PreferenceService {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceService {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Stored profile, or an empty default when the user never saved one
    pub async fn get(&self, user_id: &str) -> Result<Lookup<PreferenceProfile>> {
        let stored = self.store.get(user_id).await?;
        Ok(Lookup::from_option(stored, || PreferenceProfile::empty(user_id)))
    }

    /// Replace both weight maps; the previous maps are discarded, not merged
    pub async fn save(
        &self,
        user_id: &str,
        category_weights: WeightMap,
        tag_weights: WeightMap,
        username: Option<String>,
    ) -> Result<PreferenceProfile> {
        if user_id.trim().is_empty() {
            return Err(FaceoffError::BadRequest("userId is required".into()));
        }
        validate_weights("category", &category_weights)?;
        validate_weights("tag", &tag_weights)?;

        let profile = PreferenceProfile {
            user_id: user_id.to_string(),
            username,
            category_weights,
            tag_weights,
            created_at: None,
            updated_at: None,
        };

        let saved = self.store.save(profile).await?;
        info!(
            user_id = %user_id,
            categories = saved.category_weights.len(),
            tags = saved.tag_weights.len(),
            "Preferences saved"
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPreferenceStore;

    fn service() -> PreferenceService {
        PreferenceService::new(Arc::new(MemoryPreferenceStore::new()))
    }

    fn weights(pairs: &[(&str, f64)]) -> WeightMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn test_missing_profile_is_default() {
        let lookup = service().get("nobody").await.unwrap();
        assert!(lookup.is_default());
        assert!(lookup.as_inner().category_weights.is_empty());
        assert_eq!(lookup.as_inner().user_id, "nobody");
    }

    #[tokio::test]
    async fn test_save_then_get_round_trips() {
        let svc = service();
        let cats = weights(&[("Tech", 1.0), ("Sports", 0.0)]);
        let tags = weights(&[("Tech:rust", 2.5)]);
        svc.save("u1", cats.clone(), tags.clone(), Some("ferris".into()))
            .await
            .unwrap();

        let lookup = svc.get("u1").await.unwrap();
        assert!(!lookup.is_default());
        let profile = lookup.into_inner();
        assert_eq!(profile.category_weights, cats);
        assert_eq!(profile.tag_weights, tags);
        assert_eq!(profile.username.as_deref(), Some("ferris"));
    }

    #[tokio::test]
    async fn test_save_replaces_instead_of_merging() {
        let svc = service();
        svc.save("u1", weights(&[("Tech", 1.0)]), WeightMap::new(), None)
            .await
            .unwrap();
        svc.save("u1", weights(&[("Art", 1.0)]), WeightMap::new(), None)
            .await
            .unwrap();

        let profile = svc.get("u1").await.unwrap().into_inner();
        assert_eq!(profile.category_weights, weights(&[("Art", 1.0)]));
    }

    #[tokio::test]
    async fn test_negative_weight_rejected() {
        let err = service()
            .save("u1", weights(&[("Tech", -0.5)]), WeightMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FaceoffError::BadRequest(_)));
    }
}
