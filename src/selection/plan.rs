//! Selection plans
//!
//! A [`SelectionPlan`] is the resolved form of a content request: the
//! filter, the priority flags, the ordering and the page window. The same
//! plan compiles to a MongoDB aggregation pipeline and evaluates directly
//! against in-memory items, so both store implementations order results
//! identically (apart from the random key).

use bson::{doc, Bson, Document};
use rand::Rng;
use serde::Deserialize;
use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;
use std::str::FromStr;

use crate::models::{ContentItem, PreferenceProfile};
use crate::types::FaceoffError;

/// Default batch size
pub const DEFAULT_LIMIT: usize = 10;

/// Largest batch a single request may ask for
pub const MAX_LIMIT: usize = 100;

/// Exclusion lists are truncated to this many most recent ids
pub const MAX_EXCLUDE_IDS: usize = 500;

const TAG_PREFERRED: &str = "tag_preferred";
const CATEGORY_PREFERRED: &str = "category_preferred";
const RANDOM_KEY: &str = "random_key";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Restrict to preferred categories/tags and rank by match strength
    #[default]
    Preference,
    /// Ignore preferences
    Explore,
}

impl FromStr for SelectionMode {
    type Err = FaceoffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preference" => Ok(SelectionMode::Preference),
            "explore" => Ok(SelectionMode::Explore),
            other => Err(FaceoffError::BadRequest(format!(
                "Invalid mode '{}': expected 'preference' or 'explore'",
                other
            ))),
        }
    }
}

/// Explicit category/tag filter supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
}

impl ContentFilter {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.tag.is_none()
    }

    /// Primary or secondary membership for each filter that is set
    pub fn matches(&self, item: &ContentItem) -> bool {
        self.category.as_deref().map_or(true, |c| item.in_category(c))
            && self.tag.as_deref().map_or(true, |t| item.has_tag(t))
    }
}

/// Active preference keys derived from a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceSets {
    pub categories: HashSet<String>,
    pub tags: HashSet<String>,
}

impl PreferenceSets {
    pub fn from_profile(profile: &PreferenceProfile) -> Self {
        Self {
            categories: profile.preferred_categories(),
            tags: profile.preferred_tags(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.tags.is_empty()
    }

    /// `(tagPreferred, categoryPreferred)` for an item
    pub fn priority(&self, item: &ContentItem) -> (u8, u8) {
        (
            item.has_any_tag(&self.tags) as u8,
            item.in_any_category(&self.categories) as u8,
        )
    }

    fn matches(&self, item: &ContentItem) -> bool {
        item.in_any_category(&self.categories) || item.has_any_tag(&self.tags)
    }

    fn sorted_categories(&self) -> Vec<String> {
        sorted(&self.categories)
    }

    fn sorted_tags(&self) -> Vec<String> {
        sorted(&self.tags)
    }
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut v: Vec<String> = set.iter().cloned().collect();
    v.sort();
    v
}

/// Raw content request after parameter parsing
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRequest {
    pub user_id: Option<String>,
    pub mode: SelectionMode,
    pub filter: ContentFilter,
    pub exclude_ids: Vec<String>,
    pub limit: usize,
    pub skip: usize,
    pub randomize: bool,
}

impl Default for SelectionRequest {
    fn default() -> Self {
        Self {
            user_id: None,
            mode: SelectionMode::Preference,
            filter: ContentFilter::default(),
            exclude_ids: Vec::new(),
            limit: DEFAULT_LIMIT,
            skip: 0,
            randomize: false,
        }
    }
}

impl SelectionRequest {
    /// Mode after applying the anonymous-caller rule
    pub fn effective_mode(&self) -> SelectionMode {
        if self.user_id.is_none() {
            SelectionMode::Explore
        } else {
            self.mode
        }
    }
}

/// Fully resolved selection, ready for a content store
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPlan {
    /// `None` in explore mode, or when preferences were empty and an
    /// explicit filter was given
    pub preferences: Option<PreferenceSets>,
    pub filter: ContentFilter,
    pub exclude_ids: Vec<String>,
    pub limit: usize,
    pub skip: usize,
    pub randomize: bool,
}

impl SelectionPlan {
    /// Resolve a request against the caller's preference sets
    pub fn new(request: &SelectionRequest, preferences: Option<PreferenceSets>) -> Self {
        let excluded = &request.exclude_ids;
        let start = excluded.len().saturating_sub(MAX_EXCLUDE_IDS);

        Self {
            preferences: preferences.filter(|p| !p.is_empty()),
            filter: request.filter.clone(),
            exclude_ids: excluded[start..].to_vec(),
            limit: request.limit.min(MAX_LIMIT),
            skip: if request.randomize { 0 } else { request.skip },
            randomize: request.randomize,
        }
    }

    /// Whether an item passes the filter stage
    pub fn matches(&self, item: &ContentItem) -> bool {
        self.preferences.as_ref().map_or(true, |p| p.matches(item))
            && self.filter.matches(item)
            && !self.exclude_ids.iter().any(|id| id == &item.id)
    }

    /// Evaluate the plan over an in-memory item set
    pub fn apply<I>(&self, items: I) -> Vec<ContentItem>
    where
        I: IntoIterator<Item = ContentItem>,
    {
        let mut rng = rand::thread_rng();

        let mut keyed: Vec<(SortKey, ContentItem)> = items
            .into_iter()
            .filter(|item| self.matches(item))
            .map(|item| {
                let (tag_preferred, category_preferred) = self
                    .preferences
                    .as_ref()
                    .map(|p| p.priority(&item))
                    .unwrap_or((0, 0));
                let key = SortKey {
                    tag_preferred,
                    category_preferred,
                    random: if self.randomize { rng.gen::<f64>() } else { 0.0 },
                };
                (key, item)
            })
            .collect();

        keyed.sort_by(|(ka, a), (kb, b)| {
            (Reverse(ka.tag_preferred), Reverse(ka.category_preferred))
                .cmp(&(Reverse(kb.tag_preferred), Reverse(kb.category_preferred)))
                .then_with(|| ka.random.partial_cmp(&kb.random).unwrap_or(Ordering::Equal))
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        keyed
            .into_iter()
            .map(|(_, item)| item)
            .skip(self.skip)
            .take(self.limit)
            .collect()
    }

    /// Compile the plan into an aggregation pipeline over the content
    /// collection
    pub fn to_pipeline(&self) -> Vec<Document> {
        let mut pipeline = vec![doc! { "$match": self.match_stage() }];
        let mut helper_fields: Vec<&str> = Vec::new();

        if let Some(prefs) = &self.preferences {
            let tags = prefs.sorted_tags();
            let categories = prefs.sorted_categories();
            pipeline.push(doc! {
                "$addFields": {
                    TAG_PREFERRED: membership_flag("tag", "tags", &tags),
                    CATEGORY_PREFERRED: membership_flag("category", "categories", &categories),
                }
            });
            helper_fields.extend([TAG_PREFERRED, CATEGORY_PREFERRED]);
        }

        if self.randomize {
            pipeline.push(doc! { "$addFields": { RANDOM_KEY: { "$rand": {} } } });
            helper_fields.push(RANDOM_KEY);
        }

        let mut sort = Document::new();
        if self.preferences.is_some() {
            sort.insert(TAG_PREFERRED, -1);
            sort.insert(CATEGORY_PREFERRED, -1);
        }
        if self.randomize {
            sort.insert(RANDOM_KEY, 1);
        }
        sort.insert("created_at", -1);
        sort.insert("_id", 1);
        pipeline.push(doc! { "$sort": sort });

        if self.skip > 0 {
            pipeline.push(doc! { "$skip": self.skip as i64 });
        }
        pipeline.push(doc! { "$limit": self.limit as i64 });

        if !helper_fields.is_empty() {
            let project: Document = helper_fields
                .into_iter()
                .map(|f| (f.to_string(), Bson::Int32(0)))
                .collect();
            pipeline.push(doc! { "$project": project });
        }

        pipeline
    }

    fn match_stage(&self) -> Document {
        let mut clauses: Vec<Document> = Vec::new();

        if let Some(prefs) = &self.preferences {
            let mut any_of: Vec<Document> = Vec::new();
            if !prefs.categories.is_empty() {
                let categories = prefs.sorted_categories();
                any_of.push(doc! { "category": { "$in": categories.clone() } });
                any_of.push(doc! { "categories": { "$in": categories.clone() } });
            }
            if !prefs.tags.is_empty() {
                let tags = prefs.sorted_tags();
                any_of.push(doc! { "tag": { "$in": tags.clone() } });
                any_of.push(doc! { "tags": { "$in": tags.clone() } });
            }
            clauses.push(doc! { "$or": any_of });
        }

        if let Some(category) = &self.filter.category {
            clauses.push(doc! { "$or": [ { "category": category.as_str() }, { "categories": category.as_str() } ] });
        }
        if let Some(tag) = &self.filter.tag {
            clauses.push(doc! { "$or": [ { "tag": tag.as_str() }, { "tags": tag.as_str() } ] });
        }
        if !self.exclude_ids.is_empty() {
            clauses.push(doc! { "_id": { "$nin": self.exclude_ids.clone() } });
        }

        if clauses.is_empty() {
            Document::new()
        } else {
            doc! { "$and": clauses }
        }
    }
}

/// `1` when the primary field is in `values` or the secondary array
/// intersects it, else `0`
fn membership_flag(primary: &str, secondary: &str, values: &[String]) -> Document {
    doc! {
        "$cond": [
            {
                "$or": [
                    { "$in": [ format!("${}", primary), values.to_vec() ] },
                    { "$gt": [
                        { "$size": { "$setIntersection": [
                            { "$ifNull": [ format!("${}", secondary), [] ] },
                            values.to_vec(),
                        ] } },
                        0,
                    ] },
                ]
            },
            1,
            0,
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct SortKey {
    tag_preferred: u8,
    category_preferred: u8,
    random: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::fixtures::item;

    fn prefs(categories: &[&str], tags: &[&str]) -> PreferenceSets {
        PreferenceSets {
            categories: categories.iter().map(|s| s.to_string()).collect(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn ids(items: &[ContentItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("explore".parse::<SelectionMode>().unwrap(), SelectionMode::Explore);
        assert_eq!(
            "preference".parse::<SelectionMode>().unwrap(),
            SelectionMode::Preference
        );
        assert!("random".parse::<SelectionMode>().is_err());
    }

    #[test]
    fn test_anonymous_request_is_explore() {
        let request = SelectionRequest::default();
        assert_eq!(request.effective_mode(), SelectionMode::Explore);

        let request = SelectionRequest {
            user_id: Some("u1".into()),
            ..Default::default()
        };
        assert_eq!(request.effective_mode(), SelectionMode::Preference);
    }

    #[test]
    fn test_plan_clamps_and_truncates() {
        let request = SelectionRequest {
            exclude_ids: (0..600).map(|i| format!("id{}", i)).collect(),
            limit: 1000,
            skip: 20,
            randomize: true,
            ..Default::default()
        };
        let plan = SelectionPlan::new(&request, None);

        assert_eq!(plan.exclude_ids.len(), MAX_EXCLUDE_IDS);
        assert_eq!(plan.exclude_ids.first().map(String::as_str), Some("id100"));
        assert_eq!(plan.exclude_ids.last().map(String::as_str), Some("id599"));
        assert_eq!(plan.limit, MAX_LIMIT);
        assert_eq!(plan.skip, 0, "skip is ignored when randomizing");

        let zero = SelectionRequest {
            limit: 0,
            ..Default::default()
        };
        let plan = SelectionPlan::new(&zero, None);
        assert_eq!(plan.limit, 0);
        assert!(plan.apply(vec![item("a", "Tech", "rust", 1)]).is_empty());
    }

    #[test]
    fn test_tag_preferred_sorts_before_everything() {
        // c matches only the category and is the newest item
        let a = item("a", "Sports", "rust", 100);
        let b = item("b", "Tech", "rust", 50);
        let c = item("c", "Tech", "go", 300);

        let request = SelectionRequest {
            user_id: Some("u".into()),
            ..Default::default()
        };
        let plan = SelectionPlan::new(&request, Some(prefs(&["Tech"], &["rust"])));
        let out = plan.apply(vec![c, a, b]);

        // b: tag+category, a: tag only, c: category only
        assert_eq!(ids(&out), vec!["b", "a", "c"]);
        assert_eq!(plan.preferences.as_ref().unwrap().priority(&out[0]), (1, 1));
        assert_eq!(plan.preferences.as_ref().unwrap().priority(&out[2]), (0, 1));
    }

    #[test]
    fn test_equal_priority_orders_by_recency() {
        let old = item("old", "Tech", "rust", 10);
        let new = item("new", "Tech", "rust", 20);

        let plan = SelectionPlan::new(
            &SelectionRequest::default(),
            Some(prefs(&["Tech"], &["rust"])),
        );
        assert_eq!(ids(&plan.apply(vec![old, new])), vec!["new", "old"]);
    }

    #[test]
    fn test_secondary_memberships_match() {
        let mut cross = item("x", "Sports", "football", 10);
        cross.categories = vec!["Tech".into()];
        let other = item("y", "Sports", "football", 20);

        let plan = SelectionPlan::new(&SelectionRequest::default(), Some(prefs(&["Tech"], &[])));
        assert_eq!(ids(&plan.apply(vec![cross, other])), vec!["x"]);
    }

    #[test]
    fn test_explicit_filter_and_skip() {
        let items = vec![
            item("a", "Tech", "rust", 1),
            item("b", "Tech", "go", 2),
            item("c", "Tech", "rust", 3),
            item("d", "Sports", "rust", 4),
        ];
        let request = SelectionRequest {
            filter: ContentFilter {
                category: Some("Tech".into()),
                tag: Some("rust".into()),
            },
            skip: 1,
            ..Default::default()
        };
        let plan = SelectionPlan::new(&request, None);
        assert_eq!(ids(&plan.apply(items)), vec!["a"]);
    }

    #[test]
    fn test_randomized_batch_respects_filter_and_limit() {
        let items: Vec<ContentItem> = (0..30)
            .map(|i| item(&format!("i{}", i), "Tech", "rust", i))
            .collect();
        let request = SelectionRequest {
            limit: 5,
            randomize: true,
            exclude_ids: vec!["i0".into()],
            ..Default::default()
        };
        let out = SelectionPlan::new(&request, None).apply(items);
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|i| i.id != "i0"));
    }

    #[test]
    fn test_pipeline_for_preference_plan() {
        let request = SelectionRequest {
            exclude_ids: vec!["seen".into()],
            limit: 7,
            skip: 3,
            ..Default::default()
        };
        let plan = SelectionPlan::new(&request, Some(prefs(&["Tech"], &["rust"])));
        let pipeline = plan.to_pipeline();

        let stages: Vec<&str> = pipeline
            .iter()
            .map(|s| s.keys().next().map(String::as_str).unwrap_or(""))
            .collect();
        assert_eq!(
            stages,
            vec!["$match", "$addFields", "$sort", "$skip", "$limit", "$project"]
        );

        let sort = pipeline[2].get_document("$sort").unwrap();
        let keys: Vec<&str> = sort.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![TAG_PREFERRED, CATEGORY_PREFERRED, "created_at", "_id"]);

        let and = pipeline[0]
            .get_document("$match")
            .unwrap()
            .get_array("$and")
            .unwrap();
        // preference clause + exclusion
        assert_eq!(and.len(), 2);
        assert_eq!(pipeline[4].get_i64("$limit").unwrap(), 7);
    }

    #[test]
    fn test_pipeline_for_random_explore_plan() {
        let request = SelectionRequest {
            skip: 40,
            randomize: true,
            ..Default::default()
        };
        let pipeline = SelectionPlan::new(&request, None).to_pipeline();

        assert_eq!(pipeline[0].get_document("$match").unwrap(), &Document::new());
        assert!(pipeline.iter().all(|s| !s.contains_key("$skip")));

        let sort = pipeline
            .iter()
            .find_map(|s| s.get_document("$sort").ok())
            .unwrap();
        let keys: Vec<&str> = sort.keys().map(String::as_str).collect();
        assert_eq!(keys, vec![RANDOM_KEY, "created_at", "_id"]);
    }

    #[test]
    fn test_random_preference_batch_keeps_priority_order() {
        let items: Vec<ContentItem> = (0..24)
            .map(|i| match i % 3 {
                0 => item(&format!("both{}", i), "Tech", "rust", i),
                1 => item(&format!("tag{}", i), "Sports", "rust", i),
                _ => item(&format!("cat{}", i), "Tech", "go", i),
            })
            .collect();
        let request = SelectionRequest {
            user_id: Some("u".into()),
            randomize: true,
            limit: MAX_LIMIT,
            ..Default::default()
        };
        let plan = SelectionPlan::new(&request, Some(prefs(&["Tech"], &["rust"])));
        let sets = plan.preferences.as_ref().unwrap();

        for _ in 0..20 {
            let out = plan.apply(items.clone());
            assert_eq!(out.len(), items.len());

            let priorities: Vec<(u8, u8)> = out.iter().map(|i| sets.priority(i)).collect();
            assert!(
                priorities.windows(2).all(|w| w[0] >= w[1]),
                "priority order broken: {:?}",
                priorities
            );
        }
    }

    #[test]
    fn test_pipeline_for_random_preference_plan() {
        let request = SelectionRequest {
            user_id: Some("u".into()),
            randomize: true,
            ..Default::default()
        };
        let plan = SelectionPlan::new(&request, Some(prefs(&["Tech"], &["rust"])));
        let pipeline = plan.to_pipeline();

        let sort = pipeline
            .iter()
            .find_map(|s| s.get_document("$sort").ok())
            .unwrap();
        let keys: Vec<&str> = sort.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![TAG_PREFERRED, CATEGORY_PREFERRED, RANDOM_KEY, "created_at", "_id"]
        );
        assert_eq!(sort.get_i32(TAG_PREFERRED).unwrap(), -1);
        assert_eq!(sort.get_i32(RANDOM_KEY).unwrap(), 1);
    }
}
