//! Harness configuration.
//!
//! Settings live in `.doublecheck.toml`, found by walking up from the
//! working directory. Missing or unreadable files fall back to defaults;
//! an explicitly named file must load.

mod core;
mod loader;

pub use self::core::{Configuration, LogLevel, DEBUG_ENV};
pub use loader::{
    directory_ancestors, load_config, load_config_file, load_config_from,
    parse_and_validate_config, CONFIG_FILE_NAME,
};
