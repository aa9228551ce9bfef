//! Marshal lifecycle hooks
//!
//! Objects that cross the wire can react at two fixed points: immediately
//! before they are encoded and immediately after they are decoded. Any type
//! implementing [`MarshalHooks`] qualifies; the codec calls the hooks by
//! reference.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Callbacks invoked around encoding and decoding.
///
/// Implementations must tolerate being called any number of times and must
/// not panic for any valid object state.
pub trait MarshalHooks {
    /// Called immediately before the object is encoded.
    fn pre_marshal(&mut self) {}

    /// Called immediately after the object is fully decoded.
    fn post_unmarshal(&mut self) {}
}

/// Data object that records whether its hooks ran.
///
/// Recording is idempotent: one call and many calls leave the same state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookedRecord {
    pub name: String,
    #[serde(default)]
    pub values: Vec<i64>,
    #[serde(skip)]
    pub pre_marshal_invoked: bool,
    #[serde(skip)]
    pub post_unmarshal_invoked: bool,
}

impl HookedRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl MarshalHooks for HookedRecord {
    fn pre_marshal(&mut self) {
        self.pre_marshal_invoked = true;
    }

    fn post_unmarshal(&mut self) {
        self.post_unmarshal_invoked = true;
    }
}

/// JSON codec that drives the lifecycle hooks
pub mod codec {
    use super::*;

    /// Run `pre_marshal`, then encode
    pub fn marshal<T>(value: &mut T) -> serde_json::Result<String>
    where
        T: Serialize + MarshalHooks,
    {
        value.pre_marshal();
        serde_json::to_string(value)
    }

    /// Decode, then run `post_unmarshal`
    pub fn unmarshal<T>(input: &str) -> serde_json::Result<T>
    where
        T: DeserializeOwned + MarshalHooks,
    {
        let mut value: T = serde_json::from_str(input)?;
        value.post_unmarshal();
        Ok(value)
    }
}
