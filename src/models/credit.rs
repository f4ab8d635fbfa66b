//! Daily credit allocation per subscription tier

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditTier {
    #[default]
    Free,
    Premium,
    Pro,
}

impl CreditTier {
    /// Credits restored by the daily reset
    pub fn daily_limit(self) -> i64 {
        match self {
            CreditTier::Free => 10,
            CreditTier::Premium => 50,
            CreditTier::Pro => 200,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CreditTier::Free => "free",
            CreditTier::Premium => "premium",
            CreditTier::Pro => "pro",
        }
    }
}

impl fmt::Display for CreditTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(CreditTier::Free),
            "premium" => Ok(CreditTier::Premium),
            "pro" => Ok(CreditTier::Pro),
            other => Err(format!("unknown credit tier '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredits {
    pub user_id: String,
    pub tier: CreditTier,
    /// Remaining credits for the current day
    pub daily_credits: i64,
    /// Bonus credits (referral rewards) that do not reset
    pub total_credits: i64,
    /// `YYYY-MM-DD` of the last reset, empty if never reset
    #[serde(default)]
    pub last_reset_date: String,
}

impl UserCredits {
    /// Free-tier balance at full daily allowance
    pub fn new_free(user_id: impl Into<String>) -> Self {
        let tier = CreditTier::Free;
        Self {
            user_id: user_id.into(),
            tier,
            daily_credits: tier.daily_limit(),
            total_credits: 0,
            last_reset_date: String::new(),
        }
    }
}

/// Outcome of a reset-all run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub success: bool,
    pub count: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_limits() {
        assert_eq!(CreditTier::Free.daily_limit(), 10);
        assert_eq!(CreditTier::Premium.daily_limit(), 50);
        assert_eq!(CreditTier::Pro.daily_limit(), 200);
    }

    #[test]
    fn test_tier_round_trips_through_str() {
        for tier in [CreditTier::Free, CreditTier::Premium, CreditTier::Pro] {
            assert_eq!(tier.as_str().parse::<CreditTier>().unwrap(), tier);
        }
        assert!("gold".parse::<CreditTier>().is_err());
        assert_eq!(serde_json::to_string(&CreditTier::Pro).unwrap(), "\"pro\"");
    }

    #[test]
    fn test_new_free_has_full_allowance() {
        let credits = UserCredits::new_free("u1");
        assert_eq!(credits.tier, CreditTier::Free);
        assert_eq!(credits.daily_credits, 10);
        assert_eq!(credits.total_credits, 0);
    }
}
