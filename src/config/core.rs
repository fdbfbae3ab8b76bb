use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tracer::{CallFilter, TraceStrategy};
use crate::type_checks::TypeCheckKind;

/// Environment variable that turns on debug output regardless of the file
pub const DEBUG_ENV: &str = "DOUBLECHECK_DEBUG";

/// Minimum level of harness log output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Root configuration structure, read from `.doublecheck.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Dump stored mocked and traced calls at debug level
    pub debug: bool,

    pub log_level: LogLevel,

    /// Force colored output on or off; detected from the terminal when unset
    pub color: Option<bool>,

    /// Keep every mocked call for the auto type-check pass
    pub store_mocked_calls: bool,

    /// Backend used for inline and auto type-checking
    pub type_check: Option<TypeCheckKind>,

    /// Directories searched for `*.toml` signature files
    pub signature_load_dirs: Vec<PathBuf>,

    /// Fail inline checks of mocked calls that have no signature
    pub raise_on_missing_types: bool,

    /// Fail auto type-checks of mocked calls that have no signature
    pub raise_on_missing_auto_types: bool,

    pub trace_real_calls: bool,

    pub trace_real_calls_via: TraceStrategy,

    /// Type-check stored mocked calls against signatures inferred from real calls
    pub auto_type_check: bool,

    /// Verify every stub against real calls at teardown
    pub verify_mock_contracts: bool,

    /// Extra location patterns whose calls never count as real
    pub ignored_call_locations: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: LogLevel::default(),
            color: None,
            store_mocked_calls: false,
            type_check: None,
            signature_load_dirs: vec![PathBuf::from("sig")],
            raise_on_missing_types: false,
            raise_on_missing_auto_types: true,
            trace_real_calls: false,
            trace_real_calls_via: TraceStrategy::default(),
            auto_type_check: false,
            verify_mock_contracts: false,
            ignored_call_locations: Vec::new(),
        }
    }
}

impl Configuration {
    /// Auto type-checking needs real calls to infer from and stored mocked
    /// calls to check.
    pub fn set_auto_type_check(&mut self, enabled: bool) {
        self.auto_type_check = enabled;
        if enabled {
            self.trace_real_calls = true;
            self.store_mocked_calls = true;
        }
    }

    /// Contract verification needs real calls to verify against.
    pub fn set_verify_mock_contracts(&mut self, enabled: bool) {
        self.verify_mock_contracts = enabled;
        if enabled {
            self.trace_real_calls = true;
        }
    }

    /// Re-apply flag implications after deserialization
    pub fn normalize(mut self) -> Self {
        self.set_auto_type_check(self.auto_type_check);
        self.set_verify_mock_contracts(self.verify_mock_contracts);
        self
    }

    /// Debug output is on when configured or requested via the environment
    pub fn debug_enabled(&self) -> bool {
        self.debug || debug_env_enabled(std::env::var(DEBUG_ENV).ok().as_deref())
    }

    /// Effective log level; debug mode lowers it to debug
    pub fn effective_log_level(&self) -> LogLevel {
        if self.debug_enabled() {
            LogLevel::Debug
        } else {
            self.log_level
        }
    }

    /// Filter built from the reserved stub location and `ignored_call_locations`
    pub fn call_filter(&self) -> crate::core::Result<CallFilter> {
        CallFilter::with_patterns(self.ignored_call_locations.as_slice())
    }
}

pub(crate) fn debug_env_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "y" | "yes" | "true" | "t"
        )
    })
}
