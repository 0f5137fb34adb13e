//! Three-valued field semantics.
//!
//! PBS's config wire format distinguishes "field not supplied" from "field
//! explicitly cleared" from "field set to X". Modeling this as
//! `Option<Option<T>>` works but reads poorly at every call site; [`Value`]
//! gives the three states names so mapping code can match exhaustively
//! instead of nesting `Option`s.

use serde::{Deserialize, Serialize};

/// A field that may be known (set to a value), explicitly null (present in
/// the desired model but cleared), or unknown (not mentioned at all).
///
/// Every mapping step between the declarative value-tree and PBS wire
/// structs must preserve this three-way distinction: collapsing `Null` and
/// `Unknown` together would make it impossible to compute a correct
/// [`crate::DeleteSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value<T> {
    /// The field is set to `T`.
    Known(T),
    /// The field was explicitly cleared (present with a null/empty value).
    Null,
    /// The field was not mentioned; its prior value, if any, is untouched.
    Unknown,
}

impl<T> Value<T> {
    /// True for [`Value::Known`].
    pub fn is_known(&self) -> bool {
        matches!(self, Value::Known(_))
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for [`Value::Unknown`].
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Returns the inner value if [`Value::Known`], otherwise `None`.
    pub fn known(&self) -> Option<&T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes self, returning the inner value if [`Value::Known`].
    pub fn into_known(self) -> Option<T> {
        match self {
            Value::Known(v) => Some(v),
            _ => None,
        }
    }

    /// Maps the inner value of [`Value::Known`], leaving `Null`/`Unknown` as-is.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        match self {
            Value::Known(v) => Value::Known(f(v)),
            Value::Null => Value::Null,
            Value::Unknown => Value::Unknown,
        }
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Unknown
    }
}

impl<T> From<Option<T>> for Value<T> {
    /// `Some(v)` becomes `Known(v)`, `None` becomes `Null` — use this only
    /// when the source already distinguishes "supplied" from "not
    /// mentioned" at an outer layer (e.g. after a map lookup has already
    /// resolved presence), not for decoding raw desired-model input where
    /// the three-way distinction must come from the outer `Option` too.
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Value::Known(v),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates() {
        let known = Value::Known(5);
        let null: Value<i32> = Value::Null;
        let unknown: Value<i32> = Value::Unknown;

        assert!(known.is_known() && !known.is_null() && !known.is_unknown());
        assert!(null.is_null() && !null.is_known() && !null.is_unknown());
        assert!(unknown.is_unknown() && !unknown.is_known() && !unknown.is_null());
    }

    #[test]
    fn known_accessor() {
        assert_eq!(Value::Known(5).known(), Some(&5));
        assert_eq!(Value::<i32>::Null.known(), None);
        assert_eq!(Value::<i32>::Unknown.known(), None);
    }

    #[test]
    fn into_known_consumes() {
        assert_eq!(Value::Known("x".to_string()).into_known(), Some("x".to_string()));
        assert_eq!(Value::<String>::Unknown.into_known(), None);
    }

    #[test]
    fn map_transforms_known_only() {
        assert_eq!(Value::Known(2).map(|v| v * 2), Value::Known(4));
        assert_eq!(Value::<i32>::Null.map(|v| v * 2), Value::Null);
        assert_eq!(Value::<i32>::Unknown.map(|v| v * 2), Value::Unknown);
    }

    #[test]
    fn default_is_unknown() {
        assert_eq!(Value::<i32>::default(), Value::Unknown);
    }

    #[test]
    fn serde_roundtrip_all_variants() {
        for v in [Value::Known(1), Value::Null, Value::Unknown] {
            let json = serde_json::to_string(&v).unwrap();
            let back: Value<i32> = serde_json::from_str(&json).unwrap();
            assert_eq!(v, back);
        }
    }
}
