//! # constcache-core
//!
//! Read-through, load-once cache for constant database tables.
//!
//! Tables whose contents never change while a process runs (lookup tables,
//! enumerations stored as rows) are read once in full, frozen and served from
//! memory afterwards: by primary key, by position, or by a human-readable
//! name derived from one of their fields.
//!
//! ## Architecture
//!
//! - **Classification**: every lookup is either plain (cacheable) or carries
//!   qualifiers, explicit or ambient, and goes straight to the store
//! - **Snapshots**: one full-table fetch per epoch, frozen and indexed by
//!   normalized primary key
//! - **Named accessors**: `"Tasty beef steak"` becomes `tasty_beef_steak`
//! - **Lifecycle**: per-entity and global resets, plus a hook for bulk-data
//!   loaders
//!
//! ## Quick Start
//!
//! ```rust
//! use constcache_core::{
//!     CacheRegistry, EntityDescriptor, FixtureSet, MemoryStore, QueryOptions, Selector,
//! };
//! use std::sync::Arc;
//!
//! let fixtures: FixtureSet = r#"
//!     [pies]
//!     rows = [{ id = 1, filling = "Mince" }, { id = 2, filling = "Apple" }]
//! "#.parse()?;
//! let store = Arc::new(MemoryStore::from_fixtures(&fixtures));
//! let registry = CacheRegistry::new(store.clone());
//! registry.register(EntityDescriptor::new("Pie").table("pies"))?;
//! store.subscribe(registry.reset_hook());
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build()?;
//! runtime.block_on(async {
//!     let all = registry.all("Pie").await?;
//!     let apple = registry.find_one("Pie", "2").await?;
//!     assert_eq!(all.len(), 2);
//!     assert!(apple.is_frozen());
//!
//!     // Qualified lookups always reach the store
//!     let options = QueryOptions::default().where_eq("filling", "Mince");
//!     registry.find("Pie", &Selector::All, &options).await?;
//!     Ok::<(), constcache_core::Error>(())
//! })?;
//!
//! assert_eq!(store.query_count(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. A missing key reports the same
//! `RecordNotFound` message whether or not the entity is cached.

/// Named-accessor derivation
pub mod accessor;
/// Per-entity cache state and population
pub mod cache;
/// Entity configuration files
pub mod config;
/// Entity descriptors and registration options
pub mod entity;
/// Error types and result aliases
pub mod error;
/// Table fixtures for bulk loading
pub mod fixtures;
/// In-memory backing store
pub mod memory;
/// Selectors, qualifiers and request classification
pub mod query;
/// Records and freezing
pub mod record;
/// Registry of cached entities
pub mod registry;
/// Snapshots, key index and lookup
pub mod snapshot;
/// Backing-store boundary
pub mod store;
/// Field values and key normalization
pub mod value;

// Re-export commonly used types
pub use accessor::{AccessorTable, normalize_name};
pub use cache::{CacheStats, CacheStatsSummary, EntityCache};
pub use config::{CacheConfig, EntityConfig};
pub use entity::{DEFAULT_PRIMARY_KEY, EntityDescriptor, EntityOptions};
pub use error::{Error, Result};
pub use fixtures::{FixtureSet, FixtureTable};
pub use memory::{MemoryStore, Observer};
pub use query::{Classification, Condition, Order, QueryOptions, Qualifier, Selector, classify};
pub use record::Record;
pub use registry::{CacheRegistry, ResetHook};
pub use snapshot::{KeyIndex, Snapshot};
pub use store::{Found, Store};
pub use value::{KeyParam, ToParam, Value};
