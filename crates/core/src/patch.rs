//! Per-field changeset type for partial updates.
//!
//! A partial update has to tell apart "leave this field alone" from "clear this
//! field". `Option<T>` cannot express both, so updates carry a `Patch<T>` per
//! field instead.

use serde::{Deserialize, Deserializer};

/// Change to a single field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Field absent from the update; keep the current value.
    #[default]
    Unchanged,
    /// Replace the current value.
    Set(T),
    /// Explicitly remove the current value.
    Clear,
}

impl<T> Patch<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, Patch::Unchanged)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Resolve against the current optional value.
    pub fn apply_to(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Unchanged => current,
            Patch::Set(v) => Some(v),
            Patch::Clear => None,
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    /// `Some(v)` sets, `None` clears.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Set(v),
            None => Patch::Clear,
        }
    }
}

/// Deserialize a JSON field into a `Patch`.
///
/// Use together with `#[serde(default)]`: an absent key never reaches this
/// function and stays `Unchanged`, `null` becomes `Clear`, anything else `Set`.
pub fn deserialize_patch<'de, D, T>(deserializer: D) -> Result<Patch<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Patch::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "deserialize_patch")]
        notes: Patch<String>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        let null: Body = serde_json::from_str(r#"{"notes":null}"#).unwrap();
        let set: Body = serde_json::from_str(r#"{"notes":"late"}"#).unwrap();

        assert_eq!(absent.notes, Patch::Unchanged);
        assert_eq!(null.notes, Patch::Clear);
        assert_eq!(set.notes, Patch::Set("late".to_string()));
    }

    #[test]
    fn apply_to_resolves_against_current_value() {
        let current = Some(1);
        assert_eq!(Patch::Unchanged.apply_to(current), Some(1));
        assert_eq!(Patch::Set(2).apply_to(current), Some(2));
        assert_eq!(Patch::<i32>::Clear.apply_to(current), None);
    }
}
