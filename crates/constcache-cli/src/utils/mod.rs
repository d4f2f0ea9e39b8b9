//! Shared helpers for the CLI commands.
//!
//! - [`logging`]: tracing subscriber and color setup
//! - [`parsing`]: key and `FIELD=VALUE` argument parsing

pub mod logging;
pub mod parsing;

pub use logging::initialize_logging;
