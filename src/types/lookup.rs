//! Tagged lookup results
//!
//! A missing preference profile, score entry or credit record is a valid
//! empty state rather than an error. `Lookup` keeps that distinction in the
//! type instead of collapsing it into `Option`.

use serde::Serialize;

/// Result of reading a record that may not exist yet
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The record exists in storage
    Found(T),
    /// No record exists; the value is the default empty state
    Default(T),
}

impl<T> Lookup<T> {
    /// Build from an optional stored value, falling back to `default`
    pub fn from_option(value: Option<T>, default: impl FnOnce() -> T) -> Self {
        match value {
            Some(v) => Self::Found(v),
            None => Self::Default(default()),
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default(_))
    }

    pub fn as_inner(&self) -> &T {
        match self {
            Self::Found(v) | Self::Default(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Found(v) | Self::Default(v) => v,
        }
    }
}

/// JSON envelope: `{ "data": ..., "isDefault": bool }`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupBody<'a, T: Serialize> {
    pub data: &'a T,
    pub is_default: bool,
}

impl<T: Serialize> Lookup<T> {
    pub fn body(&self) -> LookupBody<'_, T> {
        LookupBody {
            data: self.as_inner(),
            is_default: self.is_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_option() {
        let found = Lookup::from_option(Some(3), || 0);
        assert_eq!(found, Lookup::Found(3));
        assert!(!found.is_default());

        let missing: Lookup<i32> = Lookup::from_option(None, || 0);
        assert!(missing.is_default());
        assert_eq!(missing.into_inner(), 0);
    }

    #[test]
    fn test_body_serialization() {
        let lookup = Lookup::Default(vec![1, 2]);
        let json = serde_json::to_value(lookup.body()).unwrap();
        assert_eq!(json["isDefault"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }
}
