//! Ranking materializer
//!
//! Rankings are recomputed from the ledger on every read; nothing is cached.

use serde::Serialize;
use std::sync::Arc;

use crate::models::RankedAuthor;
use crate::store::ScoreLedger;
use crate::types::Result;

/// Default number of ranked authors returned
pub const DEFAULT_RANKING_LIMIT: usize = 50;

/// Upper bound on a single rankings read
pub const MAX_RANKING_LIMIT: usize = 500;

/// Page size used by the leaderboard view
pub const RANKING_PAGE_SIZE: usize = 8;

#[derive(Clone)]
pub struct RankingMaterializer {
    ledger: Arc<dyn ScoreLedger>,
}

impl RankingMaterializer {
    pub fn new(ledger: Arc<dyn ScoreLedger>) -> Self {
        Self { ledger }
    }

    /// Top `limit` authors by points with 1-based ranks. A zero limit
    /// yields an empty list without reading the ledger.
    pub async fn ranked_authors(&self, limit: usize) -> Result<Vec<RankedAuthor>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(MAX_RANKING_LIMIT);
        let entries = self.ledger.top(limit).await?;

        Ok(entries
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, e)| RankedAuthor {
                author_id: e.author_id,
                author_name: e.author_name,
                author_handle: e.author_handle,
                author_avatar_url: e.author_avatar_url,
                points: e.points,
                rank: i + 1,
            })
            .collect())
    }
}

/// One page of an already ranked list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingPage {
    pub rankings: Vec<RankedAuthor>,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl RankingPage {
    /// Slice page `page` (1-based) out of `ranked`. Out-of-range pages are
    /// clamped to the nearest valid page.
    pub fn slice(ranked: &[RankedAuthor], page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total_pages = ranked.len().div_ceil(per_page);
        let page = page.clamp(1, total_pages.max(1));

        let start = ((page - 1) * per_page).min(ranked.len());
        let end = (start + per_page).min(ranked.len());

        Self {
            rankings: ranked[start..end].to_vec(),
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuthorIdentity;
    use crate::store::MemoryScoreLedger;

    async fn ledger_with(points: &[(&str, usize)]) -> Arc<MemoryScoreLedger> {
        let ledger = Arc::new(MemoryScoreLedger::new());
        for (id, n) in points {
            let author = AuthorIdentity {
                author_id: id.to_string(),
                author_name: id.to_uppercase(),
                author_handle: format!("@{}", id),
                author_avatar_url: None,
            };
            for _ in 0..*n {
                ledger.increment(&author).await.unwrap();
            }
        }
        ledger
    }

    #[tokio::test]
    async fn test_ranked_authors_descending_with_ranks() {
        let ledger = ledger_with(&[("a", 1), ("b", 5), ("c", 3), ("d", 2)]).await;
        let ranked = RankingMaterializer::new(ledger)
            .ranked_authors(3)
            .await
            .unwrap();

        assert_eq!(ranked.len(), 3);
        let ids: Vec<&str> = ranked.iter().map(|r| r.author_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d"]);
        let ranks: Vec<usize> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(ranked.windows(2).all(|w| w[0].points > w[1].points));
    }

    #[tokio::test]
    async fn test_zero_limit_returns_nothing() {
        let ledger = ledger_with(&[("a", 1), ("b", 2)]).await;
        let materializer = RankingMaterializer::new(ledger);

        assert!(materializer.ranked_authors(0).await.unwrap().is_empty());
        assert_eq!(materializer.ranked_authors(1).await.unwrap().len(), 1);
        assert_eq!(
            materializer.ranked_authors(MAX_RANKING_LIMIT + 10).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_ties_ordered_by_author_id() {
        let ledger = ledger_with(&[("zed", 2), ("amy", 2)]).await;
        let ranked = RankingMaterializer::new(ledger)
            .ranked_authors(DEFAULT_RANKING_LIMIT)
            .await
            .unwrap();
        assert_eq!(ranked[0].author_id, "amy");
        assert_eq!(ranked[1].rank, 2);
    }

    #[tokio::test]
    async fn test_empty_ledger_yields_empty_ranking() {
        let ranked = RankingMaterializer::new(Arc::new(MemoryScoreLedger::new()))
            .ranked_authors(10)
            .await
            .unwrap();
        assert!(ranked.is_empty());

        let page = RankingPage::slice(&ranked, 3, RANKING_PAGE_SIZE);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.page, 1);
        assert!(page.rankings.is_empty());
    }

    #[tokio::test]
    async fn test_page_slicing() {
        let points: Vec<(String, usize)> =
            (0..19).map(|i| (format!("a{:02}", i), 20 - i)).collect();
        let refs: Vec<(&str, usize)> = points.iter().map(|(s, n)| (s.as_str(), *n)).collect();
        let ranked = RankingMaterializer::new(ledger_with(&refs).await)
            .ranked_authors(50)
            .await
            .unwrap();

        let page = RankingPage::slice(&ranked, 3, RANKING_PAGE_SIZE);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.rankings.len(), 3);
        assert_eq!(page.rankings[0].rank, 17);

        let past_end = RankingPage::slice(&ranked, 9, RANKING_PAGE_SIZE);
        assert_eq!(past_end.page, 3);
    }
}
