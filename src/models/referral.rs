//! Referral codes and redemption records

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Referral code length
pub const CODE_LEN: usize = 8;

/// Credits granted to the redeemer per successful referral
pub const REWARD_CREDITS: i64 = 10;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCode {
    pub id: String,
    pub user_id: String,
    pub code: String,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

impl ReferralCode {
    /// New code owned by `user_id` with zero uses
    pub fn new(user_id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            code: code.into(),
            usage_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// A completed redemption of someone's referral code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    pub referred_id: String,
    pub referral_code: String,
    pub reward_credits: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Referral {
    pub fn completed(referrer_id: &str, referred_id: &str, code: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            referrer_id: referrer_id.to_string(),
            referred_id: referred_id.to_string(),
            referral_code: code.to_string(),
            reward_credits: REWARD_CREDITS,
            created_at: now,
            completed_at: Some(now),
        }
    }
}

/// Aggregate counters for a referrer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStats {
    pub total_referrals: usize,
    pub pending_referrals: usize,
    pub completed_referrals: usize,
    pub total_credits_earned: i64,
}

impl ReferralStats {
    pub fn from_history(history: &[Referral]) -> Self {
        let completed: Vec<&Referral> =
            history.iter().filter(|r| r.completed_at.is_some()).collect();
        Self {
            total_referrals: history.len(),
            pending_referrals: history.len() - completed.len(),
            completed_referrals: completed.len(),
            total_credits_earned: completed.iter().map(|r| r.reward_credits).sum(),
        }
    }
}

/// Random code drawn from `A-Z0-9`
pub fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Uppercase and trim user input before lookup
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Whether a code has the shape produced by `random_code`
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_code_shape() {
        for _ in 0..50 {
            let code = random_code();
            assert!(is_well_formed(&code), "bad code {}", code);
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  ab12cd34 "), "AB12CD34");
        assert!(is_well_formed(&normalize_code("ab12cd34")));
        assert!(!is_well_formed("AB12"));
        assert!(!is_well_formed("AB12CD3-"));
    }

    #[test]
    fn test_stats_from_history() {
        let done = Referral::completed("r", "a", "CODE0001");
        let mut pending = Referral::completed("r", "b", "CODE0001");
        pending.completed_at = None;

        let stats = ReferralStats::from_history(&[done, pending]);
        assert_eq!(stats.total_referrals, 2);
        assert_eq!(stats.completed_referrals, 1);
        assert_eq!(stats.pending_referrals, 1);
        assert_eq!(stats.total_credits_earned, REWARD_CREDITS);
    }
}
