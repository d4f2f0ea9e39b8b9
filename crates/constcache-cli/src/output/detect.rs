//! TTY detection for color decisions.

use is_terminal::IsTerminal;

/// Whether stdout is connected to an interactive terminal.
#[must_use]
pub fn is_interactive() -> bool {
    std::io::stdout().is_terminal()
}

/// Whether colored text output should be produced.
///
/// Color is off when requested, when `NO_COLOR` is set, when output is
/// machine-readable, or when stdout is piped.
#[must_use]
pub fn should_colorize(no_color: bool, machine_output: bool) -> bool {
    !no_color && std::env::var_os("NO_COLOR").is_none() && !machine_output && is_interactive()
}
