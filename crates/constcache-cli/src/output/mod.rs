//! # Output Formatting
//!
//! Records, accessor names and statistics are printed either as text for
//! people or as JSON for scripts.
//!
//! ```bash
//! # Text (default): one record per line, fields in name order
//! constcache --fixtures pies.toml find pies 3
//! filling=Mince id=3
//!
//! # JSON: a single key gives an object, several keys give an array
//! constcache --fixtures pies.toml --format json find pies 1 3 | jq '.[].filling'
//! ```

pub mod detect;

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use constcache_core::{CacheStatsSummary, Found, Record};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;

/// Output format for command results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// Whether this format is meant for programs rather than people.
    #[must_use]
    pub const fn is_machine_readable(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Statistics for one entity, as printed by `stats`.
#[derive(Debug, Serialize)]
pub struct EntityStats<'a> {
    /// Entity name
    pub entity: &'a str,
    /// Whether a snapshot is currently published
    pub loaded: bool,
    /// Counters since the process started
    #[serde(flatten)]
    pub counters: CacheStatsSummary,
}

/// Render a single record as `field=value` pairs.
#[must_use]
pub fn render_record(record: &Record) -> String {
    let mut line = String::new();
    for (field, value) in record.attributes() {
        if !line.is_empty() {
            line.push(' ');
        }
        let _ = write!(line, "{}={value}", field.cyan());
    }
    line
}

/// Render a lookup result in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_found(found: &Found, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(match found {
            Found::One(record) => serde_json::to_string_pretty(record.as_ref())?,
            Found::Many(records) => serde_json::to_string_pretty(records)?,
            Found::Nothing => "null".to_string(),
        }),
        OutputFormat::Text => Ok(match found {
            Found::One(record) => render_record(record),
            Found::Many(records) => render_records(records),
            Found::Nothing => "(none)".dimmed().to_string(),
        }),
    }
}

fn render_records(records: &[Arc<Record>]) -> String {
    if records.is_empty() {
        return "(none)".dimmed().to_string();
    }
    records
        .iter()
        .map(|record| render_record(record))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render accessor names, one per line in text mode.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_names(names: &[String], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(names)?),
        OutputFormat::Text if names.is_empty() => Ok("(none)".dimmed().to_string()),
        OutputFormat::Text => Ok(names.join("\n")),
    }
}

/// Render entity statistics.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_stats(stats: &EntityStats<'_>, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(stats)?);
    }

    let c = stats.counters;
    let mut out = String::new();
    let _ = writeln!(out, "{}", stats.entity.bold());
    let rows = [
        ("loaded", stats.loaded.to_string()),
        ("hits", c.hits.to_string()),
        ("bypasses", c.bypasses.to_string()),
        ("loads", c.loads.to_string()),
        ("discarded loads", c.discarded_loads.to_string()),
        ("resets", c.resets.to_string()),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "  {:<16} {value}", format!("{label}:").cyan());
    }
    Ok(out.trim_end().to_string())
}
