//! Field values and primary-key normalization.
//!
//! Records hold loosely-typed [`Value`]s. Keys are compared through their
//! canonical parameter form, [`KeyParam`], which is the decimal string for
//! integers and the raw string for text. This is what makes `1`, `"1"` and a
//! wrapped numeric id all hit the same index slot.
//!
//! ```rust
//! use constcache_core::{ToParam, Value};
//!
//! assert_eq!(Value::from(1).to_param(), Value::from("1").to_param());
//! assert_eq!(Value::Null.to_param(), None);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (SQL `NULL`).
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Ordered list of values.
    List(Vec<Value>),
}

impl Value {
    /// True for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text payload, if this is a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer payload, if this is an integer value.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert a TOML value. Datetimes become text; tables are not field
    /// values and are rejected by returning `None`.
    #[must_use]
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        Some(match value {
            toml::Value::String(s) => Self::Text(s.clone()),
            toml::Value::Integer(n) => Self::Int(*n),
            toml::Value::Float(f) => Self::Float(*f),
            toml::Value::Boolean(b) => Self::Bool(*b),
            toml::Value::Datetime(dt) => Self::Text(dt.to_string()),
            toml::Value::Array(items) => {
                Self::List(items.iter().map(Self::from_toml).collect::<Option<Vec<_>>>()?)
            },
            toml::Value::Table(_) => return None,
        })
    }

    /// Total order used for default load order and `ORDER BY`.
    ///
    /// Nulls sort first, then booleans, numbers (compared numerically across
    /// integer and float), text, and lists.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.total_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.compare(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            },
            _ => self.rank().cmp(&other.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::List(_) => 4,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            },
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u64> for Value {
    // Values beyond i64 keep their decimal form, which is also their key form.
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or_else(|_| Self::Text(n.to_string()), Self::Int)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

/// Canonical, comparable form of a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyParam(String);

impl KeyParam {
    /// Wrap an already-canonical key string.
    pub fn new(param: impl Into<String>) -> Self {
        Self(param.into())
    }

    /// The canonical string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversion into the canonical key form.
///
/// Implement this for id newtypes so they can be used wherever a key is
/// expected; returning `None` means "no key" (the equivalent of `nil`).
pub trait ToParam {
    /// Canonical key, or `None` when the value cannot identify a record.
    fn to_param(&self) -> Option<KeyParam>;
}

impl ToParam for Value {
    fn to_param(&self) -> Option<KeyParam> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(KeyParam(b.to_string())),
            Self::Int(n) => Some(KeyParam(n.to_string())),
            // Integral floats share the integer form so 1.0 finds id 1;
            // adding 0.0 turns -0.0 into 0.0.
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 9.0e15 => {
                Some(KeyParam(format!("{:.0}", x + 0.0)))
            },
            Self::Float(x) => Some(KeyParam(x.to_string())),
            Self::Text(s) => Some(KeyParam(s.clone())),
            Self::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(ToParam::to_param)
                    .map(|p| p.0)
                    .collect();
                Some(KeyParam(parts.join("/")))
            },
        }
    }
}

impl ToParam for KeyParam {
    fn to_param(&self) -> Option<KeyParam> {
        Some(self.clone())
    }
}

impl ToParam for i64 {
    fn to_param(&self) -> Option<KeyParam> {
        Some(KeyParam(self.to_string()))
    }
}

impl ToParam for str {
    fn to_param(&self) -> Option<KeyParam> {
        Some(KeyParam(self.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_integer_and_string_keys_normalize_equal() {
        // Given: The same id in three representations
        let int = Value::from(1);
        let text = Value::from("1");
        let float = Value::from(1.0);

        // Then: All share one canonical key
        assert_eq!(int.to_param(), text.to_param());
        assert_eq!(int.to_param(), float.to_param());
        assert_eq!(int.to_param().unwrap().as_str(), "1");
    }

    #[test]
    fn test_null_has_no_key() {
        assert_eq!(Value::Null.to_param(), None);
        assert_eq!(Value::from(None::<i64>).to_param(), None);
    }

    #[test]
    fn test_large_unsigned_keeps_decimal_form() {
        let big = Value::from(u64::MAX);
        assert_eq!(big.to_param().unwrap().as_str(), "18446744073709551615");
    }

    #[test]
    fn test_signed_zero_finds_id_zero() {
        assert_eq!(Value::from(-0.0).to_param(), Value::from(0).to_param());
        assert_eq!(Value::from(-0.0).to_param().unwrap().as_str(), "0");
    }

    #[test]
    fn test_fractional_float_is_not_an_integer_key() {
        assert_ne!(Value::from(1.5).to_param(), Value::from(1).to_param());
    }

    #[test]
    fn test_compare_orders_numbers_numerically() {
        assert_eq!(Value::from(2).compare(&Value::from(10)), Ordering::Less);
        assert_eq!(Value::from(2.5).compare(&Value::from(2)), Ordering::Greater);
        assert_eq!(Value::Null.compare(&Value::from(0)), Ordering::Less);
        assert_eq!(Value::from("b").compare(&Value::from("a")), Ordering::Greater);
    }

    #[test]
    fn test_from_toml_values() {
        let table: toml::Table = toml::from_str("a = 1\nb = 'x'\nc = [1, 2]\nd = true").unwrap();
        assert_eq!(Value::from_toml(&table["a"]), Some(Value::Int(1)));
        assert_eq!(Value::from_toml(&table["b"]), Some(Value::from("x")));
        assert_eq!(
            Value::from_toml(&table["c"]),
            Some(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(Value::from_toml(&table["d"]), Some(Value::Bool(true)));
    }

    proptest! {
        #[test]
        fn test_int_and_decimal_text_always_match(n in any::<i64>()) {
            prop_assert_eq!(Value::Int(n).to_param(), Value::Text(n.to_string()).to_param());
            prop_assert_eq!(n.to_param(), Value::Int(n).to_param());
        }

        #[test]
        fn test_distinct_ints_have_distinct_keys(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(a != b);
            prop_assert_ne!(Value::Int(a).to_param(), Value::Int(b).to_param());
        }
    }
}
