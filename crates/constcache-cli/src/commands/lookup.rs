//! Cached lookups by selector and bypassing lookups by condition

use anyhow::Result;
use constcache_core::{CacheRegistry, QueryOptions, Selector};

use crate::output::{OutputFormat, render_found};
use crate::utils::parsing::{parse_condition, parse_value};

/// Selector for the keys given on the command line.
///
/// One key selects a single record; several select a list.
#[must_use]
pub fn key_selector(ids: &[String]) -> Selector {
    match ids {
        [id] => Selector::id(parse_value(id)),
        ids => Selector::ids(ids.iter().map(|id| parse_value(id))),
    }
}

/// Execute a lookup with no query options, which the cache answers.
///
/// # Errors
///
/// Returns an error if the entity is unknown or a key is missing.
pub async fn execute(
    registry: &CacheRegistry,
    entity: &str,
    selector: &Selector,
    format: OutputFormat,
) -> Result<()> {
    let found = registry
        .find(entity, selector, &QueryOptions::default())
        .await?;
    println!("{}", render_found(&found, format)?);
    Ok(())
}

/// Execute a filtered lookup. Conditions always go to the store.
///
/// # Errors
///
/// Returns an error if a condition is malformed or the store query fails.
pub async fn execute_where(
    registry: &CacheRegistry,
    entity: &str,
    conditions: &[String],
    format: OutputFormat,
) -> Result<()> {
    let mut options = QueryOptions::default();
    for raw in conditions {
        let (field, value) = parse_condition(raw)?;
        options = options.where_eq(field, value);
    }

    let found = registry.find(entity, &Selector::All, &options).await?;
    println!("{}", render_found(&found, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use constcache_core::Value;

    #[test]
    fn test_key_selector_arity() {
        assert_eq!(key_selector(&["3".to_string()]), Selector::Id(Value::Int(3)));
        assert_eq!(
            key_selector(&["1".to_string(), "abc".to_string()]),
            Selector::Ids(vec![Value::Int(1), Value::from("abc")])
        );
    }
}
