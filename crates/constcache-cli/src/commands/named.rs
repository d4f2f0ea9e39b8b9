//! Named accessor commands

use anyhow::Result;
use constcache_core::{CacheRegistry, Found};

use crate::output::{OutputFormat, render_found, render_names};

/// Invoke the accessor `name` on `entity` and print the record.
///
/// # Errors
///
/// Returns an error if `entity` derives no accessor called `name`.
pub async fn execute(
    registry: &CacheRegistry,
    entity: &str,
    name: &str,
    format: OutputFormat,
) -> Result<()> {
    let record = registry.invoke_named_accessor(entity, name).await?;
    println!("{}", render_found(&Found::One(record), format)?);
    Ok(())
}

/// Print every accessor name `entity` derives, in record order.
///
/// # Errors
///
/// Returns an error if the entity is unknown or its table fails to load.
pub async fn list(registry: &CacheRegistry, entity: &str, format: OutputFormat) -> Result<()> {
    let names = registry.accessor_names(entity).await?;
    println!("{}", render_names(&names, format)?);
    Ok(())
}
