//! Domain models shared by stores, services and routes

pub mod content;
pub mod credit;
pub mod preference;
pub mod referral;
pub mod score;

pub use content::ContentItem;
pub use credit::{CreditTier, ResetSummary, UserCredits};
pub use preference::{PreferenceProfile, WeightMap};
pub use referral::{Referral, ReferralCode, ReferralStats};
pub use score::{AuthorIdentity, AuthorScoreEntry, RankedAuthor};
