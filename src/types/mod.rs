//! Shared types for faceoff

mod error;
mod lookup;

pub use error::{FaceoffError, Result};
pub use lookup::Lookup;
