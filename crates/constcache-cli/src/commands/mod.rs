//! Command implementations for the constcache CLI

mod lookup;
mod named;
mod stats;

pub use lookup::{execute as find, execute_where as find_where, key_selector};
pub use named::{execute as invoke_named, list as list_accessors};
pub use stats::execute as show_stats;
