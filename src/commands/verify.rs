use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::method_call::MethodCall;
use crate::recording::Recording;
use crate::reporting::{report_offenses, ConsoleReporter, OffenseReporter, ReportSummary};
use crate::runtime::TypeCatalog;
use crate::suite::{auto_type_check, verify_contracts};
use crate::type_checks::{AnnotatedSignatures, DeclaredSignatures, TypeChecker, TypeEnvironment};

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub real: PathBuf,
    pub mocks: PathBuf,
    pub type_check: bool,
    pub sig_dirs: Vec<PathBuf>,
    pub contracts: bool,
    pub raise_on_missing_auto_types: bool,
}

#[derive(Debug, Default)]
pub struct VerifyOutcome {
    pub type_offenses: Vec<MethodCall>,
    pub contract_offenses: Vec<MethodCall>,
}

impl VerifyOutcome {
    pub fn offenses(&self) -> Vec<MethodCall> {
        self.type_offenses
            .iter()
            .chain(&self.contract_offenses)
            .cloned()
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.type_offenses.is_empty() && self.contract_offenses.is_empty()
    }
}

/// Types from both recordings; the real recording wins on conflicts
fn merged_catalog(real: &Recording, mocks: &Recording) -> TypeCatalog {
    let mut catalog = real.catalog();
    let mocked = mocks.catalog();
    for name in mocked.type_names() {
        if catalog.contains(name) {
            continue;
        }
        if let Some(def) = mocked.type_def(name) {
            catalog.define_type(def.clone());
        }
    }
    catalog
}

fn offline_checker(env: Arc<dyn TypeEnvironment>, sig_dirs: &[PathBuf]) -> Result<Arc<dyn TypeChecker>> {
    if sig_dirs.is_empty() {
        return Ok(Arc::new(AnnotatedSignatures::new(env)));
    }
    let checker = DeclaredSignatures::new(env);
    let loaded = checker.load_dirs(sig_dirs)?;
    log::debug!("Loaded {} declared signature(s)", loaded);
    Ok(Arc::new(checker))
}

/// Run the enabled passes over two recordings.
///
/// Each recorded mocked call is both a type-check subject and the source of
/// a mock contract.
pub fn verify_recordings(config: &VerifyConfig) -> Result<VerifyOutcome> {
    let real = Recording::load(&config.real)?;
    let mocks = Recording::load(&config.mocks)?;
    let real_calls = real.calls()?;
    let mut mocked_calls = mocks.calls()?;
    let catalog = Arc::new(merged_catalog(&real, &mocks));

    let mut outcome = VerifyOutcome::default();
    if config.type_check {
        let checker = offline_checker(catalog.clone(), &config.sig_dirs)?;
        outcome.type_offenses = auto_type_check(
            Some(checker.as_ref()),
            &real_calls,
            mocked_calls.clone(),
            config.raise_on_missing_auto_types,
        )?;
    }
    if config.contracts {
        outcome.contract_offenses = verify_contracts(mocked_calls.iter_mut(), &real_calls, catalog.as_ref());
    }
    Ok(outcome)
}

pub fn run_verify(config: &VerifyConfig, reporter: &mut dyn OffenseReporter) -> Result<ReportSummary> {
    if !config.type_check && !config.contracts {
        log::warn!("Nothing to verify: type checking and contracts are both disabled");
    }
    let outcome = verify_recordings(config)?;
    Ok(report_offenses(&outcome.offenses(), reporter))
}

/// Verify and report to stderr; `Ok(false)` when offenses were found
pub fn verify(config: &VerifyConfig) -> Result<bool> {
    let mut reporter = ConsoleReporter::stderr();
    let summary = run_verify(config, &mut reporter)?;
    Ok(summary.is_clean())
}
