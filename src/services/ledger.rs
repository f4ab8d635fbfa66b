//! Author score ledger operations

use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{AuthorIdentity, AuthorScoreEntry};
use crate::store::ScoreLedger;
use crate::types::{Lookup, Result};

#[derive(Clone)]
pub struct ScoreService {
    ledger: Arc<dyn ScoreLedger>,
}

impl ScoreService {
    pub fn new(ledger: Arc<dyn ScoreLedger>) -> Self {
        Self { ledger }
    }

    /// Record one selection of `author`'s content.
    ///
    /// Display fields replace whatever the ledger held before. Storage
    /// failures are logged here and returned; callers report them without
    /// retrying.
    pub async fn increment(&self, author: &AuthorIdentity) -> Result<AuthorScoreEntry> {
        author.validate()?;

        match self.ledger.increment(author).await {
            Ok(entry) => {
                debug!(author_id = %entry.author_id, points = entry.points, "Author score incremented");
                Ok(entry)
            }
            Err(e) => {
                warn!(author_id = %author.author_id, error = %e, "Failed to increment author score");
                Err(e)
            }
        }
    }

    /// Current entry, or a zero-point default for unknown authors
    pub async fn get(&self, author_id: &str) -> Result<Lookup<AuthorScoreEntry>> {
        let stored = self.ledger.get(author_id).await?;
        Ok(Lookup::from_option(stored, || AuthorScoreEntry::zero(author_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryScoreLedger;
    use crate::types::FaceoffError;

    fn identity(id: &str, handle: &str) -> AuthorIdentity {
        AuthorIdentity {
            author_id: id.into(),
            author_name: "Name".into(),
            author_handle: handle.into(),
            author_avatar_url: Some("https://img/a.png".into()),
        }
    }

    #[tokio::test]
    async fn test_two_increments_keep_latest_handle() {
        let svc = ScoreService::new(Arc::new(MemoryScoreLedger::new()));
        svc.increment(&identity("auth1", "H")).await.unwrap();
        svc.increment(&identity("auth1", "H2")).await.unwrap();

        let entry = svc.get("auth1").await.unwrap();
        assert!(!entry.is_default());
        let entry = entry.into_inner();
        assert_eq!(entry.points, 2);
        assert_eq!(entry.author_handle, "H2");
    }

    #[tokio::test]
    async fn test_unknown_author_defaults_to_zero() {
        let svc = ScoreService::new(Arc::new(MemoryScoreLedger::new()));
        let entry = svc.get("ghost").await.unwrap();
        assert!(entry.is_default());
        assert_eq!(entry.as_inner().points, 0);
    }

    #[tokio::test]
    async fn test_empty_author_id_rejected_before_storage() {
        let svc = ScoreService::new(Arc::new(MemoryScoreLedger::new()));
        let err = svc.increment(&identity("", "H")).await.unwrap_err();
        assert!(matches!(err, FaceoffError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_concurrent_increments_from_initial_value() {
        let svc = ScoreService::new(Arc::new(MemoryScoreLedger::new()));
        for _ in 0..3 {
            svc.increment(&identity("auth1", "H")).await.unwrap();
        }

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.increment(&identity("auth1", "H")).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        assert_eq!(svc.get("auth1").await.unwrap().as_inner().points, 23);
    }
}
