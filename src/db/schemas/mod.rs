//! Database schemas for faceoff
//!
//! MongoDB document structures for content, scores, preferences,
//! referrals and credits.

mod author_score;
mod content;
mod credit;
mod preference;
mod referral;

pub use author_score::{AuthorScoreDoc, RANKING_COLLECTION};
pub use content::{ContentDoc, CONTENT_COLLECTION};
pub use credit::{UserCreditsDoc, CREDITS_COLLECTION};
pub use preference::{PreferenceDoc, USERPREF_COLLECTION};
pub use referral::{ReferralCodeDoc, ReferralDoc, REFERRALS_COLLECTION, REFERRAL_CODES_COLLECTION};
