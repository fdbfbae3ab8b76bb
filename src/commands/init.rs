use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::config::{parse_and_validate_config, CONFIG_FILE_NAME};

pub const DEFAULT_CONFIG: &str = r#"# doublecheck configuration

# Log level: debug, info, warn, error
log_level = "info"

# Trace real calls of mocked methods ("wrap" or "events")
trace_real_calls = false
trace_real_calls_via = "wrap"

# Verify stubs against traced real calls (implies trace_real_calls)
verify_mock_contracts = false

# Type-check mocked calls against signatures inferred from real calls
# (implies trace_real_calls and store_mocked_calls; needs type_check)
auto_type_check = false
# type_check = "signatures"
signature_load_dirs = ["sig"]
raise_on_missing_types = false
raise_on_missing_auto_types = true

# Regexes of call locations the tracer ignores
ignored_call_locations = []
"#;

/// Write the default configuration into `dir`
pub fn init_config_in(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        bail!("Configuration file already exists. Use --force to overwrite.");
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(())
}

pub fn init_config(force: bool) -> Result<()> {
    init_config_in(Path::new("."), force)?;
    println!("Created {} configuration file", CONFIG_FILE_NAME);
    Ok(())
}
