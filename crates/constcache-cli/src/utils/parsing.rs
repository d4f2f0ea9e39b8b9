//! Argument parsing for keys and equality conditions.

use anyhow::{Result, bail};
use constcache_core::Value;

/// Parse a command-line value: integers become [`Value::Int`], anything
/// else stays text.
#[must_use]
pub fn parse_value(raw: &str) -> Value {
    raw.parse::<i64>()
        .map_or_else(|_| Value::from(raw), Value::Int)
}

/// Parse a `FIELD=VALUE` condition.
///
/// Only the first `=` separates; the value may contain further `=` signs.
///
/// # Errors
///
/// Returns an error if there is no `=` or the field name is empty.
pub fn parse_condition(raw: &str) -> Result<(String, Value)> {
    let Some((field, value)) = raw.split_once('=') else {
        bail!("Invalid condition '{raw}': expected FIELD=VALUE");
    };
    let field = field.trim();
    if field.is_empty() {
        bail!("Invalid condition '{raw}': field name is empty");
    }
    Ok((field.to_string(), parse_value(value)))
}
