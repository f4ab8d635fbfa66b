//! Caller identification

pub mod jwt;

pub use jwt::{extract_token_from_header, SessionClaims, SessionValidator};
