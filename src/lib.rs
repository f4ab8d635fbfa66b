//! faceoff - pick a favorite between two pieces of content
//!
//! Serves a swipe feed ordered by each user's category and tag weights,
//! keeps a per-author score ledger from those picks and derives the author
//! leaderboard from it. Referral codes and daily credit balances ride
//! alongside.
//!
//! ## Services
//!
//! - **Selection**: preference-weighted content batches with exclusions
//! - **Ledger / Rankings**: atomic author score increments, ranked views
//! - **Preferences**: per-user category and tag weight maps
//! - **Referrals**: codes, redemption and referral stats
//! - **Credits**: tiered daily allowance with a midnight reset scheduler

pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod selection;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{FaceoffError, Result};
