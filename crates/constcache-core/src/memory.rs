//! In-process reference [`Store`].
//!
//! `MemoryStore` keeps tables as plain row lists and executes requests with
//! the same semantics a relational driver would: equality and `LIKE`
//! conditions, projection, ordering, limit and offset. It also records every
//! query it runs, which makes it the natural backend for tests asserting how
//! often the cache actually reaches the store.
//!
//! Ambient scopes are set per table with [`MemoryStore::with_scope`]. A scope
//! belongs to the task that polls the scoped future and ends with it, so
//! concurrent callers and spawned tasks never observe each other's scopes.

use crate::fixtures::FixtureSet;
use crate::snapshot::{KeyIndex, resolve};
use crate::{
    DEFAULT_PRIMARY_KEY, EntityDescriptor, Error, Found, QueryOptions, Record, Result, Selector,
    Store,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// Callback invoked after fixtures are bulk-loaded or a table is truncated.
pub type Observer = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone)]
struct Table {
    primary_key: String,
    rows: Vec<Record>,
}

#[derive(Debug, Clone)]
struct ScopeEntry {
    store: u64,
    table: String,
    options: QueryOptions,
}

tokio::task_local! {
    // Active scopes of the current task, outermost first.
    static SCOPES: Vec<ScopeEntry>;
}

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

/// In-memory tables with a query log.
pub struct MemoryStore {
    id: u64,
    tables: RwLock<HashMap<String, Table>>,
    log: Mutex<Vec<String>>,
    observers: RwLock<Vec<Observer>>,
    failing_fetches: AtomicUsize,
    fetch_delay: Mutex<Option<Duration>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("tables", &self.tables.read().keys().collect::<Vec<_>>())
            .field("queries", &self.log.lock().len())
            .field("observers", &self.observers.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            tables: RwLock::default(),
            log: Mutex::default(),
            observers: RwLock::default(),
            failing_fetches: AtomicUsize::new(0),
            fetch_delay: Mutex::default(),
        }
    }
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated from fixtures. Observers are not involved.
    #[must_use]
    pub fn from_fixtures(fixtures: &FixtureSet) -> Self {
        let store = Self::new();
        store.replace_tables(fixtures);
        store
    }

    /// Create or replace `table`.
    pub fn insert_table(
        &self,
        table: impl Into<String>,
        primary_key: impl Into<String>,
        rows: Vec<Record>,
    ) {
        self.tables.write().insert(
            table.into(),
            Table {
                primary_key: primary_key.into(),
                rows,
            },
        );
    }

    /// Append one row, creating the table if needed.
    ///
    /// Caches are not told: this is how a table changes underneath a cache.
    pub fn insert(&self, table: &str, record: Record) {
        self.tables
            .write()
            .entry(table.to_string())
            .or_insert_with(|| Table {
                primary_key: DEFAULT_PRIMARY_KEY.to_string(),
                rows: Vec::new(),
            })
            .rows
            .push(record);
    }

    /// Replace every table named in `fixtures`, then notify observers.
    pub fn load_fixtures(&self, fixtures: &FixtureSet) {
        self.replace_tables(fixtures);
        debug!(tables = fixtures.len(), "fixtures loaded");
        self.notify();
    }

    /// Remove all rows of `table`, then notify observers.
    pub fn truncate(&self, table: &str) {
        if let Some(table) = self.tables.write().get_mut(table) {
            table.rows.clear();
        }
        debug!(table, "table truncated");
        self.notify();
    }

    /// Register a callback for fixture loads and truncations.
    pub fn subscribe(&self, observer: Observer) {
        self.observers.write().push(observer);
    }

    /// Run `future` with `options` active as an ambient scope on `table`.
    ///
    /// The scope is visible only to the task polling `future`, and only
    /// through this store. Scopes nest; inner scopes merge onto outer ones
    /// and end when their future completes.
    #[allow(clippy::future_not_send)]
    pub async fn with_scope<F: Future>(
        &self,
        table: impl Into<String>,
        options: QueryOptions,
        future: F,
    ) -> F::Output {
        let mut stack = SCOPES.try_with(Clone::clone).unwrap_or_default();
        stack.push(ScopeEntry {
            store: self.id,
            table: table.into(),
            options,
        });
        SCOPES.scope(stack, future).await
    }

    /// Make the next `count` full-table fetches fail.
    pub fn fail_next_fetches(&self, count: usize) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Delay the completion of every full-table fetch, widening the window in
    /// which concurrent requests pile up on a load.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.lock() = delay;
    }

    /// Number of queries executed so far.
    pub fn query_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Executed queries in order.
    pub fn queries(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Forget the query log.
    pub fn clear_queries(&self) {
        self.log.lock().clear();
    }

    fn replace_tables(&self, fixtures: &FixtureSet) {
        let mut tables = self.tables.write();
        for (name, fixture) in fixtures.tables() {
            tables.insert(
                name.to_string(),
                Table {
                    primary_key: fixture.primary_key.clone(),
                    rows: fixture.rows.clone(),
                },
            );
        }
    }

    fn notify(&self) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer();
        }
    }

    fn record_query(&self, sql: String) {
        trace!(%sql, "query");
        self.log.lock().push(sql);
    }

    fn table(&self, name: &str) -> Result<Table> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Store(format!("no such table: {name}")))
    }

    fn take_failure(&self) -> bool {
        self.failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn sort_rows(rows: &mut [Record], options: &QueryOptions, primary_key: &str) {
    let null = crate::Value::Null;
    match options.order.as_deref() {
        Some(order) if !order.is_empty() => rows.sort_by(|a, b| {
            order.iter().fold(CmpOrdering::Equal, |acc, term| {
                acc.then_with(|| {
                    let ord = a
                        .get(&term.field)
                        .unwrap_or(&null)
                        .compare(b.get(&term.field).unwrap_or(&null));
                    if term.descending { ord.reverse() } else { ord }
                })
            })
        }),
        _ => rows.sort_by(|a, b| {
            a.get(primary_key)
                .unwrap_or(&null)
                .compare(b.get(primary_key).unwrap_or(&null))
        }),
    }
}

fn describe(table: &str, selector: &Selector, options: &QueryOptions, primary_key: &str) -> String {
    let columns = options
        .select
        .as_ref()
        .filter(|s| !s.is_empty())
        .map_or_else(|| "*".to_string(), |s| s.join(", "));
    let mut sql = format!("SELECT {columns} FROM {table}");

    let mut predicates: Vec<String> = options
        .conditions
        .iter()
        .flatten()
        .map(ToString::to_string)
        .collect();
    match selector {
        Selector::Id(key) => predicates.push(format!("{primary_key} = {key}")),
        Selector::Ids(keys) => {
            let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
            predicates.push(format!("{primary_key} IN ({})", keys.join(", ")));
        },
        Selector::All | Selector::First | Selector::Last => {},
    }
    if !predicates.is_empty() {
        let _ = write!(sql, " WHERE {}", predicates.join(" AND "));
    }
    if let Some(order) = options.order.as_ref().filter(|o| !o.is_empty()) {
        let terms: Vec<String> = order
            .iter()
            .map(|o| format!("{} {}", o.field, if o.descending { "DESC" } else { "ASC" }))
            .collect();
        let _ = write!(sql, " ORDER BY {}", terms.join(", "));
    }
    if let Some(limit) = options.limit {
        let _ = write!(sql, " LIMIT {limit}");
    }
    if let Some(offset) = options.offset {
        let _ = write!(sql, " OFFSET {offset}");
    }
    if options.lock == Some(true) {
        sql.push_str(" FOR UPDATE");
    }
    sql
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_all(&self, entity: &EntityDescriptor) -> Result<Vec<Record>> {
        let table_name = entity.table_name();
        self.record_query(format!("SELECT * FROM {table_name}"));
        if self.take_failure() {
            return Err(Error::Store(format!("connection lost while reading {table_name}")));
        }

        let mut rows = self.table(table_name)?.rows;
        sort_rows(&mut rows, &QueryOptions::default(), entity.primary_key_field());

        // Rows are read before the delay, so a slow fetch returns what the
        // table held when the query was issued.
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(rows)
    }

    async fn execute(
        &self,
        entity: &EntityDescriptor,
        selector: &Selector,
        options: &QueryOptions,
    ) -> Result<Found> {
        let table_name = entity.table_name();
        let effective = self
            .ambient_scope(table_name)
            .map_or_else(|| options.clone(), |scope| scope.merge(options));
        let primary_key = entity.primary_key_field();
        self.record_query(describe(table_name, selector, &effective, primary_key));

        let mut rows: Vec<Record> = self
            .table(table_name)?
            .rows
            .into_iter()
            .filter(|row| effective.conditions.iter().flatten().all(|c| c.matches(row)))
            .collect();
        sort_rows(&mut rows, &effective, primary_key);

        if matches!(selector, Selector::All | Selector::First | Selector::Last) {
            let offset = effective.offset.unwrap_or(0);
            let limit = effective.limit.unwrap_or(usize::MAX);
            rows = rows.into_iter().skip(offset).take(limit).collect();
        }

        let rows: Vec<Arc<Record>> = rows
            .into_iter()
            .map(|row| match effective.select.as_deref() {
                Some(fields) if !fields.is_empty() => Arc::new(row.project(fields)),
                _ => Arc::new(row),
            })
            .collect();
        let index = if effective.select.as_ref().is_some_and(|s| !s.is_empty())
            && !effective
                .select
                .iter()
                .flatten()
                .any(|f| f == primary_key)
        {
            // Key lookups on a projection without the key cannot match anything.
            KeyIndex::default()
        } else {
            KeyIndex::build(entity.name(), primary_key, &rows)?
        };

        resolve(entity.name(), &rows, &index, selector)
    }

    fn primary_key(&self, table: &str) -> Option<String> {
        self.tables.read().get(table).map(|t| t.primary_key.clone())
    }

    fn ambient_scope(&self, table: &str) -> Option<QueryOptions> {
        SCOPES
            .try_with(|stack| {
                stack
                    .iter()
                    .filter(|entry| entry.store == self.id && entry.table == table)
                    .fold(None, |merged: Option<QueryOptions>, entry| {
                        Some(merged.unwrap_or_default().merge(&entry.options))
                    })
            })
            .ok()
            .flatten()
    }
}
