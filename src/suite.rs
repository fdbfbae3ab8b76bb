//! Verification orchestration across a test run.
//!
//! [`Suite::cook`] runs before any test: it builds the configured type
//! checker, starts tracing real calls on every stubbed target and arms the
//! mocked-call sink. [`Suite::eat`] runs after the last test: it drains the
//! tracer and runs the two batch passes, collecting offenses rather than
//! stopping at the first one.
//!
//! The passes are also exposed as free functions ([`auto_type_check`],
//! [`verify_contracts`]) so recorded data can be verified offline.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Configuration;
use crate::contract::MockContract;
use crate::core::{CallTarget, Error, Result, Subtyping};
use crate::method_call::{MethodCall, VerificationError};
use crate::mocks::{MockRegistry, MockedCallSink};
use crate::observability::VerificationPhase;
use crate::runtime::Runtime;
use crate::tracer::Tracer;
use crate::type_checks::{build_checker, infer_signatures, TypeChecker, TypeEnvironment};

pub struct Suite {
    config: Configuration,
    registry: MockRegistry,
    runtime: Option<Arc<Runtime>>,
    tracer: Option<Tracer>,
    checker: Option<Arc<dyn TypeChecker>>,
    stored_mocked_calls: Arc<Mutex<Vec<MethodCall>>>,
    real_calls: Vec<MethodCall>,
    phase: VerificationPhase,
}

impl Suite {
    pub fn new(config: Configuration) -> Self {
        Self {
            config: config.normalize(),
            registry: MockRegistry::new(),
            runtime: None,
            tracer: None,
            checker: None,
            stored_mocked_calls: Arc::new(Mutex::new(Vec::new())),
            real_calls: Vec::new(),
            phase: VerificationPhase::Idle,
        }
    }

    /// Use `checker` instead of building one from `type_check`
    pub fn with_checker(mut self, checker: Arc<dyn TypeChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn phase(&self) -> VerificationPhase {
        self.phase
    }

    pub fn registry(&self) -> &MockRegistry {
        &self.registry
    }

    /// Stubs are configured here before [`Suite::cook`]
    pub fn registry_mut(&mut self) -> &mut MockRegistry {
        &mut self.registry
    }

    pub fn checker(&self) -> Option<&Arc<dyn TypeChecker>> {
        self.checker.as_ref()
    }

    pub fn stored_mocked_calls(&self) -> Vec<MethodCall> {
        self.stored_mocked_calls.lock().clone()
    }

    /// Real calls drained by [`Suite::eat`]
    pub fn real_calls(&self) -> &[MethodCall] {
        &self.real_calls
    }

    fn enter(&mut self, next: VerificationPhase) -> Result<()> {
        self.phase = self.phase.advance(next)?;
        log::debug!("Entering phase {}", next);
        Ok(())
    }

    /// Install checkers and tracing according to the configuration
    pub fn cook(&mut self, runtime: &Arc<Runtime>) -> Result<()> {
        self.enter(VerificationPhase::Collecting)?;
        self.runtime = Some(runtime.clone());

        if let (Some(kind), None) = (self.config.type_check, &self.checker) {
            let env: Arc<dyn TypeEnvironment> = runtime.clone();
            let checker = build_checker(kind, env, &self.config.signature_load_dirs)?;
            log::info!(
                "Set up type checker: {} (load_dirs: {:?})",
                kind,
                self.config.signature_load_dirs
            );
            self.checker = Some(checker);
        }

        if self.config.store_mocked_calls {
            log::info!("Collect mocked calls");
        }

        if self.config.trace_real_calls {
            log::info!(
                "Collect real calls via {}",
                self.config.trace_real_calls_via
            );
            let mut tracer =
                Tracer::new(self.config.trace_real_calls_via).with_filter(self.config.call_filter()?);
            for (target, methods) in self.registry.targets() {
                log::debug!("Trace {} methods: {}", target, methods.join(", "));
                tracer.register(target, methods);
            }
            tracer.start(runtime)?;
            self.tracer = Some(tracer);
        }

        Ok(())
    }

    /// Sink for the stub layer: type-checks each mocked call inline when a
    /// checker is configured, then stores it when storage is enabled.
    pub fn mocked_call_sink(&self) -> MockedCallSink {
        let checker = if self.config.type_check.is_some() {
            self.checker.clone()
        } else {
            None
        };
        let raise_on_missing = self.config.raise_on_missing_types;
        let store = self
            .config
            .store_mocked_calls
            .then(|| self.stored_mocked_calls.clone());

        Arc::new(move |call: MethodCall| -> std::result::Result<(), VerificationError> {
            if let Some(checker) = &checker {
                checker.typecheck(&call, raise_on_missing)?;
            }
            if let Some(store) = &store {
                store.lock().push(call);
            }
            Ok(())
        })
    }

    /// Hand one mocked call to the sink directly
    pub fn handle_mocked_call(&self, call: MethodCall) -> std::result::Result<(), VerificationError> {
        (self.mocked_call_sink())(call)
    }

    /// Run the post-run passes and return every offense found.
    ///
    /// Fails without offenses when auto type-checking is enabled but no
    /// checker is configured.
    pub fn eat(&mut self) -> Result<Vec<MethodCall>> {
        self.enter(VerificationPhase::Draining)?;
        if let Some(tracer) = self.tracer.as_mut() {
            self.real_calls = tracer.stop();
        }

        if self.config.debug_enabled() {
            log::debug!("Stored mocked calls:\n{}", dump(&self.stored_mocked_calls.lock()));
            log::debug!("Traced real calls:\n{}", dump(&self.real_calls));
        }

        let mut offenses = Vec::new();

        if self.config.auto_type_check {
            self.enter(VerificationPhase::TypeChecking)?;
            let mocked = self.stored_mocked_calls.lock().clone();
            offenses.extend(auto_type_check(
                self.checker.as_deref(),
                &self.real_calls,
                mocked,
                self.config.raise_on_missing_auto_types,
            )?);
        }

        if self.config.verify_mock_contracts {
            self.enter(VerificationPhase::ContractVerifying)?;
            let hierarchy: &dyn Subtyping = match &self.runtime {
                Some(runtime) => runtime.as_ref() as &dyn Subtyping,
                None => &crate::core::BuiltinHierarchy as &dyn Subtyping,
            };
            offenses.extend(verify_contracts(
                self.registry.stubs_mut(),
                &self.real_calls,
                hierarchy,
            ));
        }

        self.enter(VerificationPhase::Reported)?;
        Ok(offenses)
    }

    /// Stop tracing and forget everything collected, ready for a new run
    pub fn reset(&mut self) {
        if let Some(mut tracer) = self.tracer.take() {
            tracer.stop();
        }
        self.registry.clear();
        self.stored_mocked_calls.lock().clear();
        self.real_calls.clear();
        self.runtime = None;
        self.phase = VerificationPhase::Idle;
    }
}

fn dump(calls: &[MethodCall]) -> String {
    calls
        .iter()
        .map(|call| format!("  {}", call))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Type-check mocked calls against signatures inferred from real calls.
///
/// Returns the mocked calls that failed, each with its error attached.
pub fn auto_type_check(
    checker: Option<&dyn TypeChecker>,
    real_calls: &[MethodCall],
    mocked_calls: Vec<MethodCall>,
    raise_on_missing: bool,
) -> Result<Vec<MethodCall>> {
    let checker = checker.ok_or_else(|| Error::configuration("No type checker configured"))?;
    let _span = tracing::info_span!(
        "auto_type_check",
        checker = checker.name(),
        mocked = mocked_calls.len()
    )
    .entered();

    let signatures = infer_signatures(real_calls);
    log::debug!("Inferred {} signature(s) from real calls", signatures.len());
    checker.load_signatures(&signatures);

    log::info!("Type-checking mocked calls against auto-generated signatures...");

    let offenses: Vec<MethodCall> = mocked_calls
        .into_iter()
        .filter_map(|mut call| match checker.typecheck(&call, raise_on_missing) {
            Ok(()) => None,
            Err(err) => {
                call.metadata.error = Some(err.into());
                Some(call)
            }
        })
        .collect();

    if offenses.is_empty() {
        log::info!("Type-checking completed. All good");
    } else {
        log::error!("Type-checking completed. Failed examples: {}", offenses.len());
    }
    Ok(offenses)
}

/// Verify every stub against the real calls of its method.
///
/// Failing stubs get their error attached and are returned as offenses.
/// Contracts without arguments to match or a return type to check are
/// skipped.
pub fn verify_contracts<'s>(
    stubs: impl IntoIterator<Item = &'s mut MethodCall>,
    real_calls: &[MethodCall],
    hierarchy: &dyn Subtyping,
) -> Vec<MethodCall> {
    let _span = tracing::info_span!("verify_contracts", real = real_calls.len()).entered();
    log::info!("Verifying mock contracts...");

    let mut grouped: HashMap<(CallTarget, String), Vec<MethodCall>> = HashMap::new();
    for call in real_calls {
        grouped
            .entry((call.target().clone(), call.method_name().to_string()))
            .or_default()
            .push(call.clone());
    }

    let mut offenses = Vec::new();
    for stub in stubs {
        let contract = MockContract::from_stub(stub);
        if contract.is_noop() {
            log::debug!("Skipping no-op contract {}", contract);
            continue;
        }
        log::debug!("Generated contract:\n  {}\n    (from stub: {})", contract, stub);

        let evidence = grouped
            .get(&(stub.target().clone(), stub.method_name().to_string()))
            .map(Vec::as_slice);
        if let Err(err) = contract.verify(evidence, hierarchy) {
            stub.metadata.error = Some(err.into());
            offenses.push(stub.clone());
        }
    }

    if offenses.is_empty() {
        log::info!("Verifying mock contracts completed. All good");
    } else {
        log::error!(
            "Verifying mock contracts completed. Failed contracts: {}",
            offenses.len()
        );
    }
    offenses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BuiltinHierarchy, Value};
    use crate::testkit::{mocked_call, real_call, ConfigBuilder};
    use crate::type_checks::{AnnotatedSignatures, TypeCheckKind};

    fn for_income() -> CallTarget {
        CallTarget::instance("TaxCalculator")
    }

    #[test]
    fn test_auto_type_check_without_checker_is_fatal() {
        let err = auto_type_check(None, &[], vec![], true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: No type checker configured"
        );
    }

    #[test]
    fn test_auto_type_check_flags_wrong_argument_type() {
        let runtime = Arc::new(Runtime::new());
        let checker = AnnotatedSignatures::new(runtime);
        let real = vec![
            real_call(for_income(), "for_income", vec![Value::Int(120)], Value::Int(87)),
            real_call(for_income(), "for_income", vec![Value::Int(0)], Value::Nil),
        ];
        let mocked = vec![
            mocked_call(for_income(), "for_income", vec![Value::Int(5)], Value::Int(1)),
            mocked_call(for_income(), "for_income", vec![Value::str("125")], Value::Int(87)),
        ];

        let offenses = auto_type_check(Some(&checker as &dyn TypeChecker), &real, mocked, true).unwrap();

        assert_eq!(offenses.len(), 1);
        crate::assert_offense!(offenses[0], "expected `Integer`, got `String`");
    }

    #[test]
    fn test_verify_contracts_keeps_going_after_failures() {
        let mut stubs = vec![
            mocked_call(for_income(), "for_income", vec![Value::Int(89)], Value::Int(42)),
            mocked_call(for_income(), "for_income", vec![Value::Int(-10)], Value::Int(0)),
            mocked_call(CallTarget::static_of("TaxCalculator"), "tax_rate_for", vec![], Value::Float(0.1)),
            mocked_call(for_income(), "rate", vec![], Value::Nil),
        ];
        let real = vec![real_call(for_income(), "for_income", vec![Value::Int(89)], Value::Int(19))];

        let offenses = verify_contracts(stubs.iter_mut(), &real, &BuiltinHierarchy);

        assert_eq!(offenses.len(), 2);
        crate::assert_offense!(offenses[0], "No matching calls captured");
        crate::assert_offense!(offenses[1], "No method calls captured for TaxCalculator.tax_rate_for");
        assert!(stubs[0].metadata.error.is_none());
        assert!(stubs[1].metadata.error.is_some());
        assert!(stubs[3].metadata.error.is_none());
    }

    #[test]
    fn test_phases_run_once() {
        let runtime = Arc::new(Runtime::new());
        let mut suite = Suite::new(Configuration::default());

        suite.cook(&runtime).unwrap();
        assert!(matches!(suite.cook(&runtime), Err(Error::Phase { .. })));
        assert!(suite.eat().unwrap().is_empty());
        assert_eq!(suite.phase(), VerificationPhase::Reported);
        assert!(suite.eat().is_err());

        suite.reset();
        assert_eq!(suite.phase(), VerificationPhase::Idle);
    }

    #[test]
    fn test_sink_stores_and_checks_inline() {
        let runtime = Arc::new(Runtime::new());
        let config = ConfigBuilder::new()
            .type_check(TypeCheckKind::Annotations)
            .auto_type_check()
            .raise_on_missing_types(true)
            .build();
        let mut suite = Suite::new(config);
        suite.cook(&runtime).unwrap();

        let call = mocked_call(for_income(), "for_income", vec![Value::Int(1)], Value::Int(0));
        let err = suite.handle_mocked_call(call).unwrap_err();

        assert!(err.to_string().starts_with("No signature found for TaxCalculator#for_income"));
        assert!(suite.stored_mocked_calls().is_empty());
    }
}
