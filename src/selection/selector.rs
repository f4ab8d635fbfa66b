//! Content selector
//!
//! Resolves a [`SelectionRequest`] into a [`SelectionPlan`] using the
//! caller's stored preferences and runs it against the content store.

use std::sync::Arc;
use tracing::debug;

use super::plan::{PreferenceSets, SelectionMode, SelectionPlan, SelectionRequest};
use crate::models::ContentItem;
use crate::services::PreferenceService;
use crate::store::ContentStore;
use crate::types::Result;

#[derive(Clone)]
pub struct ContentSelector {
    content: Arc<dyn ContentStore>,
    preferences: PreferenceService,
}

impl ContentSelector {
    pub fn new(content: Arc<dyn ContentStore>, preferences: PreferenceService) -> Self {
        Self {
            content,
            preferences,
        }
    }

    /// Resolve the plan for a request.
    ///
    /// Returns `None` when the request must yield an empty batch without
    /// touching the content store: a zero limit, or preference mode with no
    /// active preferences and no explicit filter.
    pub async fn plan(&self, request: &SelectionRequest) -> Result<Option<SelectionPlan>> {
        if request.limit == 0 {
            return Ok(None);
        }

        let preferences = match (request.effective_mode(), &request.user_id) {
            (SelectionMode::Preference, Some(user_id)) => {
                let lookup = self.preferences.get(user_id).await?;
                let profile = lookup.as_inner();

                if !profile.has_active_preferences() && request.filter.is_empty() {
                    debug!(user_id = %user_id, "No active preferences and no filter, empty batch");
                    return Ok(None);
                }
                Some(PreferenceSets::from_profile(profile))
            }
            _ => None,
        };

        Ok(Some(SelectionPlan::new(request, preferences)))
    }

    /// Select the next batch of content
    pub async fn select(&self, request: &SelectionRequest) -> Result<Vec<ContentItem>> {
        let Some(plan) = self.plan(request).await? else {
            return Ok(Vec::new());
        };

        let items = self.content.select(&plan).await?;
        debug!(
            user_id = ?request.user_id,
            mode = ?request.effective_mode(),
            returned = items.len(),
            "Selected content batch"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::fixtures::item;
    use crate::models::WeightMap;
    use crate::selection::plan::ContentFilter;
    use crate::store::{MemoryContentStore, MemoryPreferenceStore};
    use async_trait::async_trait;

    /// Content store that fails the test if it is ever queried
    struct UnreachableContent;

    #[async_trait]
    impl ContentStore for UnreachableContent {
        async fn select(&self, _plan: &SelectionPlan) -> Result<Vec<ContentItem>> {
            panic!("content store must not be queried");
        }
    }

    fn weights(pairs: &[(&str, f64)]) -> WeightMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn selector_with(content: Arc<dyn ContentStore>) -> (ContentSelector, PreferenceService) {
        let prefs = PreferenceService::new(Arc::new(MemoryPreferenceStore::new()));
        (ContentSelector::new(content, prefs.clone()), prefs)
    }

    fn catalog() -> Arc<MemoryContentStore> {
        Arc::new(
            [item("A", "Tech", "rust", 100), item("B", "Sports", "football", 200)]
                .into_iter()
                .collect(),
        )
    }

    fn ids(items: &[ContentItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty_preferences_without_filter_skip_the_store() {
        let (selector, _) = selector_with(Arc::new(UnreachableContent));
        let request = SelectionRequest {
            user_id: Some("new-user".into()),
            ..Default::default()
        };

        assert!(selector.select(&request).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_limit_skips_the_store() {
        let (selector, _) = selector_with(Arc::new(UnreachableContent));
        let request = SelectionRequest {
            limit: 0,
            ..Default::default()
        };

        assert!(selector.plan(&request).await.unwrap().is_none());
        assert!(selector.select(&request).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preference_mode_returns_only_matching_items() {
        let (selector, prefs) = selector_with(catalog());
        prefs
            .save("u1", weights(&[("Tech", 1.0)]), WeightMap::new(), None)
            .await
            .unwrap();

        let request = SelectionRequest {
            user_id: Some("u1".into()),
            ..Default::default()
        };
        assert_eq!(ids(&selector.select(&request).await.unwrap()), vec!["A"]);
    }

    #[tokio::test]
    async fn test_explore_mode_honors_exclusions() {
        let (selector, _) = selector_with(catalog());
        let request = SelectionRequest {
            user_id: Some("u1".into()),
            mode: SelectionMode::Explore,
            exclude_ids: vec!["A".into()],
            ..Default::default()
        };
        assert_eq!(ids(&selector.select(&request).await.unwrap()), vec!["B"]);
    }

    #[tokio::test]
    async fn test_anonymous_caller_gets_explore_feed() {
        let (selector, _) = selector_with(catalog());
        let out = selector.select(&SelectionRequest::default()).await.unwrap();
        // newest first
        assert_eq!(ids(&out), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_empty_preferences_with_filter_drop_preference_clause() {
        let (selector, _) = selector_with(catalog());
        let request = SelectionRequest {
            user_id: Some("new-user".into()),
            filter: ContentFilter {
                category: Some("Sports".into()),
                tag: None,
            },
            ..Default::default()
        };

        let plan = selector.plan(&request).await.unwrap().unwrap();
        assert!(plan.preferences.is_none());
        assert_eq!(ids(&selector.select(&request).await.unwrap()), vec!["B"]);
    }

    #[tokio::test]
    async fn test_zero_weights_count_as_no_preference() {
        let (selector, prefs) = selector_with(Arc::new(UnreachableContent));
        prefs
            .save(
                "u1",
                weights(&[("Tech", 0.0)]),
                weights(&[("Tech:rust", 0.0)]),
                None,
            )
            .await
            .unwrap();

        let request = SelectionRequest {
            user_id: Some("u1".into()),
            ..Default::default()
        };
        assert!(selector.plan(&request).await.unwrap().is_none());
    }
}
