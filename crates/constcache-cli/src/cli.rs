//! # CLI Structure and Argument Parsing
//!
//! The `constcache` command loads table fixtures into an in-memory store,
//! registers cached entities from a config file and answers lookups through
//! the cache.
//!
//! ```bash
//! constcache --fixtures pies.toml find pies 1 2
//! constcache --fixtures pies.toml --config constcache.toml named ConstantNamedPie mince
//! constcache --fixtures pies.toml --format json where pies filling=Mince
//! ```
//!
//! Fixture tables without a configured entity are registered under their
//! table name.

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the `constcache` command
#[derive(Parser, Clone, Debug)]
#[command(name = "constcache")]
#[command(version)]
#[command(about = "constcache - serve constant tables from a load-once cache", long_about = None)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Fixture file with the table rows to serve
    #[arg(long, global = true, env = "CONSTCACHE_FIXTURES", value_name = "FILE")]
    pub fixtures: Option<PathBuf>,

    /// Entity configuration file (defaults to `CONSTCACHE_CONFIG`, then the
    /// platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Look up records by primary key
    Find {
        /// Entity name
        entity: String,
        /// One or more primary keys
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Print every record
    All {
        /// Entity name
        entity: String,
    },

    /// Print the first record in load order
    First {
        /// Entity name
        entity: String,
    },

    /// Print the last record in load order
    Last {
        /// Entity name
        entity: String,
    },

    /// Invoke a named accessor
    Named {
        /// Entity name
        entity: String,
        /// Accessor name, e.g. `tasty_beef_steak`
        name: String,
    },

    /// List the derived accessor names
    Accessors {
        /// Entity name
        entity: String,
    },

    /// Filtered lookup; always goes to the store
    Where {
        /// Entity name
        entity: String,
        /// Equality conditions
        #[arg(required = true, value_name = "FIELD=VALUE")]
        conditions: Vec<String>,
    },

    /// Run lookups by key, then print the entity's cache statistics
    Stats {
        /// Entity name
        entity: String,
        /// Primary keys to look up first
        ids: Vec<String>,
    },
}
