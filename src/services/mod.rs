//! Domain services over the storage seams

pub mod credits;
pub mod ledger;
pub mod preferences;
pub mod ranking;
pub mod referrals;
pub mod scheduler;

pub use credits::{CreditService, LocalResetTrigger};
pub use ledger::ScoreService;
pub use preferences::PreferenceService;
pub use ranking::{RankingMaterializer, RankingPage};
pub use referrals::ReferralService;
pub use scheduler::{CreditResetScheduler, HttpResetTrigger, ResetTrigger, SchedulerStatus};
