//! Author score ledger entries and the derived ranking view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{FaceoffError, Result};

/// Author identity supplied with each selection event.
///
/// Display fields are denormalized into the ledger and overwritten on
/// every increment (last writer wins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorIdentity {
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_handle: String,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
}

impl AuthorIdentity {
    pub fn validate(&self) -> Result<()> {
        if self.author_id.trim().is_empty() {
            return Err(FaceoffError::BadRequest("authorId is required".into()));
        }
        Ok(())
    }
}

/// One row of the score ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorScoreEntry {
    pub author_id: String,
    pub author_name: String,
    pub author_handle: String,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    pub points: i64,
    pub last_updated: DateTime<Utc>,
}

impl AuthorScoreEntry {
    /// Zero-score entry for an author with no selections yet
    pub fn zero(author_id: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            author_name: String::new(),
            author_handle: String::new(),
            author_avatar_url: None,
            points: 0,
            last_updated: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Ledger entry with its position in a freshly sorted ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAuthor {
    pub author_id: String,
    pub author_name: String,
    pub author_handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_avatar_url: Option<String>,
    pub points: i64,
    /// 1-based position within the returned list
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_author_id() {
        let identity = AuthorIdentity {
            author_id: "  ".into(),
            author_name: "Name".into(),
            author_handle: "h".into(),
            author_avatar_url: None,
        };
        assert!(matches!(identity.validate(), Err(FaceoffError::BadRequest(_))));
    }

    #[test]
    fn test_identity_deserializes_camel_case() {
        let identity: AuthorIdentity = serde_json::from_str(
            r#"{"authorId":"a1","authorHandle":"h","authorName":"N","authorAvatarUrl":"u"}"#,
        )
        .unwrap();
        assert_eq!(identity.author_id, "a1");
        assert_eq!(identity.author_avatar_url.as_deref(), Some("u"));
    }
}
