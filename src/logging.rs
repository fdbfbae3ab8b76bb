//! Harness log output.
//!
//! Library code logs through the `log` facade. [`init`] installs an
//! `env_logger` that prefixes every record with `[DOUBLECHECK LEVEL]` and
//! colors the prefix by severity.

use colored::{ColoredString, Colorize};
use std::io::{IsTerminal, Write};

use crate::config::Configuration;

/// `[DOUBLECHECK LEVEL] message`, uncolored
pub fn format_line(level: log::Level, message: &str) -> String {
    format!("[DOUBLECHECK {}] {}", level, message)
}

fn paint(level: log::Level, prefix: String) -> ColoredString {
    match level {
        log::Level::Error => prefix.red(),
        log::Level::Warn => prefix.yellow(),
        log::Level::Info => prefix.blue(),
        log::Level::Debug | log::Level::Trace => prefix.normal(),
    }
}

/// Whether output should be colored: the configured override, else a TTY check
pub fn color_enabled(config: &Configuration) -> bool {
    config
        .color
        .unwrap_or_else(|| std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal())
}

/// Install the harness logger. Repeated calls keep the first logger.
pub fn init(config: &Configuration) {
    let color = color_enabled(config);
    colored::control::set_override(color);

    let result = env_logger::Builder::new()
        .filter_level(config.effective_log_level().to_level_filter())
        .parse_env("DOUBLECHECK_LOG")
        .format(move |buf, record| {
            let prefix = format!("[DOUBLECHECK {}]", record.level());
            if color {
                writeln!(buf, "{} {}", paint(record.level(), prefix), record.args())
            } else {
                writeln!(buf, "{} {}", prefix, record.args())
            }
        })
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialized");
    }
}
