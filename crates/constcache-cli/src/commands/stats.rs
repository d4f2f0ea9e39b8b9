//! Cache statistics command implementation

use anyhow::Result;
use constcache_core::CacheRegistry;
use tracing::debug;

use crate::output::{EntityStats, OutputFormat, render_stats};
use crate::utils::parsing::parse_value;

/// Look up each key through the cache, then print the entity's counters.
///
/// # Errors
///
/// Returns an error if the entity is unknown or a key is missing.
pub async fn execute(
    registry: &CacheRegistry,
    entity: &str,
    ids: &[String],
    format: OutputFormat,
) -> Result<()> {
    for id in ids {
        let record = registry.find_one(entity, parse_value(id)).await?;
        debug!(entity, id = %id, fields = record.attributes().len(), "looked up record");
    }

    let stats = EntityStats {
        entity,
        loaded: registry.is_loaded(entity)?,
        counters: registry.stats(entity)?,
    };
    println!("{}", render_stats(&stats, format)?);
    Ok(())
}
