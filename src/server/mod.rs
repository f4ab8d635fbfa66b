//! HTTP server and shared application state

pub mod http;

pub use http::{dispatch, run, AppState};

#[cfg(test)]
pub(crate) use http::{test_state, test_state_with};
