use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::Configuration;
use crate::core::{Error, Result};

/// File name searched for in the working directory and its ancestors
pub const CONFIG_FILE_NAME: &str = ".doublecheck.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse a configuration and apply its flag implications.
///
/// Unknown backends and strategies, and location patterns that do not
/// compile, are rejected.
pub fn parse_and_validate_config(contents: &str) -> std::result::Result<Configuration, String> {
    let config = toml::from_str::<Configuration>(contents)
        .map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))?
        .normalize();

    config
        .call_filter()
        .map_err(|e| format!("Invalid ignored_call_locations: {}", e))?;

    if config.auto_type_check && config.type_check.is_none() {
        log::warn!("auto_type_check is enabled but no type_check backend is configured");
    }

    Ok(config)
}

pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<Configuration> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("{}. Using defaults.", e);
            None
        }
    }
}

fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // Only log actual errors, not "file not found"
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// `start` followed by its parents, at most `max_depth` directories
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Search `start` and its ancestors for the config file
pub fn load_config_from(start: PathBuf) -> Configuration {
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            Configuration::default()
        })
}

/// Load configuration for the current directory, falling back to defaults
pub fn load_config() -> Configuration {
    match std::env::current_dir() {
        Ok(dir) => load_config_from(dir),
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            Configuration::default()
        }
    }
}

/// Load an explicitly named config file; every failure is an error
pub fn load_config_file(path: &Path) -> Result<Configuration> {
    let contents = read_config_file(path)
        .map_err(|e| Error::file_system("Cannot read config file", path, e))?;
    parse_and_validate_config(&contents).map_err(Error::configuration)
}
