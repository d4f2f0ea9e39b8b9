//! Lookup requests and the query classifier.
//!
//! A request is a [`Selector`] plus [`QueryOptions`]. Plain requests (no
//! qualifiers, explicit or ambient) are answered from the cache; anything
//! else is delegated to the store untouched.
//!
//! ```rust
//! use constcache_core::{Classification, QueryOptions, classify};
//!
//! assert_eq!(classify(&QueryOptions::default(), None), Classification::Cacheable);
//!
//! let locked = QueryOptions::default().lock(true);
//! assert!(classify(&locked, None).is_bypass());
//! ```

use crate::{Record, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a lookup asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Every record, in load order.
    All,
    /// The first record in load order.
    First,
    /// The last record in load order.
    Last,
    /// One record by key; answers with a single record.
    Id(Value),
    /// Several records by key; answers with a list. Nested lists are
    /// flattened, nulls dropped and duplicates collapsed before lookup.
    Ids(Vec<Value>),
}

impl Selector {
    /// Single-key selector.
    pub fn id(key: impl Into<Value>) -> Self {
        Self::Id(key.into())
    }

    /// Multi-key selector.
    pub fn ids<I, T>(keys: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::Ids(keys.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::First => f.write_str("first"),
            Self::Last => f.write_str("last"),
            Self::Id(key) => write!(f, "id={key}"),
            Self::Ids(keys) => write!(f, "ids={}", Value::List(keys.clone())),
        }
    }
}

/// A filter condition on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// `field = value`
    Eq {
        /// Field name.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// `field LIKE pattern`, with `%` and `_` wildcards, ASCII case-insensitive.
    Like {
        /// Field name.
        field: String,
        /// LIKE pattern.
        pattern: String,
    },
}

impl Condition {
    /// Equality condition.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// LIKE condition.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Evaluate against a record. Missing fields compare as null.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Eq { field, value } => record.get(field).unwrap_or(&Value::Null) == value,
            Self::Like { field, pattern } => match record.get(field) {
                None | Some(Value::Null) => false,
                Some(v) => like_match(&v.to_string(), pattern),
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { field, value } => write!(f, "{field} = '{value}'"),
            Self::Like { field, pattern } => write!(f, "{field} LIKE '{pattern}'"),
        }
    }
}

fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();

    // Greedy matcher with single-point backtracking on the last `%`.
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Field to sort by.
    pub field: String,
    /// Sort descending instead of ascending.
    #[serde(default)]
    pub descending: bool,
}

/// Qualifiers attached to a lookup.
///
/// Every qualifier is optional. A present-but-empty list counts as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Filter conditions, all of which must hold.
    pub conditions: Option<Vec<Condition>>,
    /// Column projection.
    pub select: Option<Vec<String>>,
    /// Explicit ordering.
    pub order: Option<Vec<Order>>,
    /// Maximum number of records.
    pub limit: Option<usize>,
    /// Records to skip.
    pub offset: Option<usize>,
    /// Row-locking flag. Any explicit value, even `false`, is a qualifier.
    pub lock: Option<bool>,
}

impl QueryOptions {
    /// Add an equality condition.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .get_or_insert_with(Vec::new)
            .push(Condition::eq(field, value));
        self
    }

    /// Add a LIKE condition.
    #[must_use]
    pub fn where_like(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.conditions
            .get_or_insert_with(Vec::new)
            .push(Condition::like(field, pattern));
        self
    }

    /// Restrict returned columns.
    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Append an ordering term.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order.get_or_insert_with(Vec::new).push(Order {
            field: field.into(),
            descending,
        });
        self
    }

    /// Limit the number of records.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip records.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Set the locking flag.
    #[must_use]
    pub const fn lock(mut self, lock: bool) -> Self {
        self.lock = Some(lock);
        self
    }

    /// First qualifier that is present, if any.
    #[must_use]
    pub fn first_qualifier(&self) -> Option<Qualifier> {
        fn non_empty<T>(list: Option<&Vec<T>>) -> bool {
            list.is_some_and(|l| !l.is_empty())
        }

        if non_empty(self.conditions.as_ref()) {
            Some(Qualifier::Conditions)
        } else if non_empty(self.select.as_ref()) {
            Some(Qualifier::Select)
        } else if non_empty(self.order.as_ref()) {
            Some(Qualifier::Order)
        } else if self.limit.is_some() {
            Some(Qualifier::Limit)
        } else if self.offset.is_some() {
            Some(Qualifier::Offset)
        } else if self.lock.is_some() {
            Some(Qualifier::Lock)
        } else {
            None
        }
    }

    /// True when no qualifier is present.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.first_qualifier().is_none()
    }

    /// Layer `inner` on top of `self`: conditions accumulate, every other
    /// qualifier set in `inner` replaces the outer one.
    #[must_use]
    pub fn merge(&self, inner: &Self) -> Self {
        let conditions = match (&self.conditions, &inner.conditions) {
            (None, None) => None,
            (outer, inner) => Some(
                outer
                    .iter()
                    .flatten()
                    .chain(inner.iter().flatten())
                    .cloned()
                    .collect(),
            ),
        };
        Self {
            conditions,
            select: inner.select.clone().or_else(|| self.select.clone()),
            order: inner.order.clone().or_else(|| self.order.clone()),
            limit: inner.limit.or(self.limit),
            offset: inner.offset.or(self.offset),
            lock: inner.lock.or(self.lock),
        }
    }
}

/// Kind of qualifier that forced a bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualifier {
    /// Filter conditions.
    Conditions,
    /// Column projection.
    Select,
    /// Explicit ordering.
    Order,
    /// Row limit.
    Limit,
    /// Row offset.
    Offset,
    /// Locking flag.
    Lock,
    /// A scope established by the caller before the request.
    AmbientScope,
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Conditions => "conditions",
            Self::Select => "select",
            Self::Order => "order",
            Self::Limit => "limit",
            Self::Offset => "offset",
            Self::Lock => "lock",
            Self::AmbientScope => "ambient scope",
        })
    }
}

/// Outcome of classifying a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Answer from the cache.
    Cacheable,
    /// Delegate to the store; carries the qualifier that forced it.
    Bypass(Qualifier),
}

impl Classification {
    /// True for [`Classification::Bypass`].
    #[must_use]
    pub const fn is_bypass(&self) -> bool {
        matches!(self, Self::Bypass(_))
    }
}

/// Decide whether a request can be answered from the cache.
///
/// Pure: looks only at the explicit options and the ambient scope the store
/// reports for the entity's table.
#[must_use]
pub fn classify(options: &QueryOptions, ambient: Option<&QueryOptions>) -> Classification {
    if let Some(qualifier) = options.first_qualifier() {
        return Classification::Bypass(qualifier);
    }
    if ambient.is_some_and(|scope| !scope.is_blank()) {
        return Classification::Bypass(Qualifier::AmbientScope);
    }
    Classification::Cacheable
}
