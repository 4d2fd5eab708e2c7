//! Tri-state optional field wrapper.
//!
//! # Responsibility
//! - Distinguish "field absent" from "field present as null" at API boundaries.
//!
//! # Invariants
//! - `Patch::Absent` is the `Default` and means "leave unchanged".
//! - `Patch::Null` means "explicitly clear", e.g. move to root.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Optional field that remembers whether it was supplied at all.
///
/// Decoding relies on `#[serde(default)]` on the containing field: a missing
/// key yields `Absent`, JSON `null` yields `Null`, anything else `Value`.
/// Encoding needs `skip_serializing_if = "Patch::is_absent"` on the field;
/// an unskipped `Absent` writes `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Field not supplied.
    #[default]
    Absent,
    /// Field supplied as null.
    Null,
    /// Field supplied with a value.
    Value(T),
}

impl<T> Patch<T> {
    /// Builds a present patch from a nullable value.
    pub fn present(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Value(value),
            None => Self::Null,
        }
    }

    /// Returns whether the field was omitted.
    ///
    /// Pair with `skip_serializing_if` so an absent field stays absent on the wire.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns the supplied nullable value, or `None` when absent.
    pub fn as_present(&self) -> Option<Option<&T>> {
        match self {
            Self::Absent => None,
            Self::Null => Some(None),
            Self::Value(value) => Some(Some(value)),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Self::present)
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Absent | Self::Null => serializer.serialize_none(),
            Self::Value(value) => serializer.serialize_some(value),
        }
    }
}
