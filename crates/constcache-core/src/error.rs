//! Error types and handling for constcache-core operations.
//!
//! Every fallible operation in the crate returns [`Result<T>`]. Errors are
//! grouped into categories for logging and carry a recoverability hint so
//! callers can decide whether a retry is worthwhile.
//!
//! ## Error Categories
//!
//! - **Lookup errors**: [`Error::RecordNotFound`], [`Error::UnknownAccessor`]
//! - **Configuration errors**: [`Error::Config`], [`Error::UnknownEntity`]
//! - **Store errors**: [`Error::Store`], produced by the backing store and
//!   passed through the cache unchanged
//! - **Integrity errors**: [`Error::Index`], [`Error::FrozenRecord`]
//!
//! ## Not-found semantics
//!
//! A missing key produces the same error whether the entity is cached or the
//! request was bypassed to the store:
//!
//! ```rust
//! use constcache_core::Error;
//!
//! let err = Error::not_found_id("Pie", "42");
//! assert_eq!(err.to_string(), "Couldn't find Pie with ID=42");
//! assert!(err.is_not_found());
//! ```

use thiserror::Error;

/// The main error type for constcache-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A lookup by one or more keys found fewer records than requested.
    ///
    /// Also raised when a key lookup was issued without any usable key
    /// (for example a single `nil` id).
    #[error("{message}")]
    RecordNotFound {
        /// Entity the lookup was issued against.
        entity: String,
        /// Human-readable description naming the missing key(s).
        message: String,
    },

    /// A named accessor was invoked that no loaded record derives.
    ///
    /// This is the equivalent of a missing-method error, not a domain
    /// not-found: the accessor simply does not exist on the entity.
    #[error("undefined accessor '{name}' for {entity}")]
    UnknownAccessor {
        /// Entity the accessor was requested on.
        entity: String,
        /// Requested accessor name.
        name: String,
    },

    /// Configuration is invalid.
    ///
    /// ## Common Causes
    ///
    /// - Unrecognized registration option keys
    /// - The same entity registered twice
    /// - Malformed TOML in a config file
    #[error("Configuration error: {0}")]
    Config(String),

    /// A lookup named an entity that was never registered.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Attempted to mutate a record that has been frozen into a snapshot.
    #[error("can't modify frozen {entity} (field '{field}')")]
    FrozenRecord {
        /// Entity (table) the record belongs to.
        entity: String,
        /// Field the caller tried to write.
        field: String,
    },

    /// The backing store failed.
    ///
    /// Loaders report connectivity problems, missing tables and similar
    /// failures with this variant. The cache never wraps or rewrites it and
    /// stores no snapshot, so the next lookup retries the load.
    #[error("Store error: {0}")]
    Store(String),

    /// A loaded snapshot could not be indexed.
    ///
    /// ## Common Causes
    ///
    /// - A record without a value for the primary-key field
    /// - Two records normalizing to the same primary key
    #[error("Index error: {0}")]
    Index(String),

    /// I/O operation failed (reading config or fixture files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// `Couldn't find <entity> without an ID`
    pub fn not_found_without_id(entity: &str) -> Self {
        Self::RecordNotFound {
            entity: entity.to_string(),
            message: format!("Couldn't find {entity} without an ID"),
        }
    }

    /// `Couldn't find <entity> with ID=<key>`
    pub fn not_found_id(entity: &str, key: &str) -> Self {
        Self::RecordNotFound {
            entity: entity.to_string(),
            message: format!("Couldn't find {entity} with ID={key}"),
        }
    }

    /// `Couldn't find all <entity> with IDs (<keys>) (found <n> results, but was looking for <m>)`
    pub fn not_found_ids(entity: &str, keys: &[String], found: usize) -> Self {
        Self::RecordNotFound {
            entity: entity.to_string(),
            message: format!(
                "Couldn't find all {entity} with IDs ({}) (found {found} results, but was looking for {})",
                keys.join(", "),
                keys.len()
            ),
        }
    }

    /// True for [`Error::RecordNotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }

    /// Check if the error might be recoverable through retry logic.
    ///
    /// Store failures are treated as transient: the cache keeps no state
    /// from a failed load, so retrying the lookup re-runs the fetch.
    /// Lookup and configuration errors are permanent for the current data.
    ///
    /// ```rust
    /// use constcache_core::Error;
    ///
    /// assert!(Error::Store("connection refused".into()).is_recoverable());
    /// assert!(!Error::Config("unknown key".into()).is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// - `"not_found"` - missing records
    /// - `"accessor"` - unknown named accessors
    /// - `"config"` - registration and configuration problems
    /// - `"frozen"` - mutation of cached records
    /// - `"store"` - backing store failures
    /// - `"index"` - snapshot indexing failures
    /// - `"io"` / `"serialization"` - file handling
    /// - `"other"` - uncategorized errors
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::RecordNotFound { .. } => "not_found",
            Self::UnknownAccessor { .. } => "accessor",
            Self::Config(_) | Self::UnknownEntity(_) => "config",
            Self::FrozenRecord { .. } => "frozen",
            Self::Store(_) => "store",
            Self::Index(_) => "index",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
