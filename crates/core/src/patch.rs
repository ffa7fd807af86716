//! Field-level patch values for partial updates.

use serde::{Deserialize, Deserializer};

use crate::error::{DomainError, DomainResult};

/// One field of a partial update.
///
/// Deserialize with `#[serde(default)]` on the field: an absent key yields
/// `Unchanged`, an explicit `null` yields `Clear`, any other value `Set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unchanged
    }
}

impl<T> Patch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Unchanged => Patch::Unchanged,
            Patch::Clear => Patch::Clear,
            Patch::Set(v) => Patch::Set(f(v)),
        }
    }

    /// Apply to a nullable field.
    pub fn apply_optional(self, slot: &mut Option<T>) {
        match self {
            Patch::Unchanged => {}
            Patch::Clear => *slot = None,
            Patch::Set(v) => *slot = Some(v),
        }
    }

    /// Apply to a non-nullable field; `Clear` is rejected.
    pub fn apply_required(self, field: &str, slot: &mut T) -> DomainResult<()> {
        match self {
            Patch::Unchanged => Ok(()),
            Patch::Clear => Err(DomainError::validation(format!("{field} cannot be null"))),
            Patch::Set(v) => {
                *slot = v;
                Ok(())
            }
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
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        })
    }
}
