//! Mock configurations registered during a run.
//!
//! Every `allow(...)` creates a stub record: a [`MethodCall`] holding the
//! expected arguments and the canned return value. Records are kept per
//! target and method in registration order; contract verification consumes
//! them after the run.

use crate::core::{CallTarget, DoubleKind, DoubleRef, TypeName, Value};
use crate::method_call::{MethodCall, ALLOCATOR, CONSTRUCTOR};
use crate::observability::current_example;
use crate::runtime::STUB_LOCATION;

#[derive(Debug, Clone)]
struct MethodStubs {
    method: String,
    stubs: Vec<MethodCall>,
}

#[derive(Debug, Clone)]
struct TargetStubs {
    target: CallTarget,
    methods: Vec<MethodStubs>,
}

/// Stub configurations keyed by target, then method
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    entries: Vec<TargetStubs>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start configuring a stub of `method` on `target`
    pub fn allow(&mut self, target: CallTarget, method: &str) -> StubBuilder<'_> {
        StubBuilder {
            registry: self,
            target,
            method: method.to_string(),
            arguments: Vec::new(),
            receiver: None,
            location: None,
        }
    }

    /// Start configuring a stub on a double; the target is the type it
    /// stands in for
    pub fn allow_double(&mut self, double: &DoubleRef, method: &str) -> StubBuilder<'_> {
        let target = match &double.double().kind {
            DoubleKind::Instance(type_name) => CallTarget::Instance(type_name.clone()),
            DoubleKind::Static(type_name) => CallTarget::Static(type_name.clone()),
            DoubleKind::Plain => CallTarget::Instance(TypeName::new(
                double.double().name.as_deref().unwrap_or(crate::core::builtin::DOUBLE),
            )),
        };
        let mut builder = self.allow(target, method);
        builder.receiver = Some(Value::Double(double.clone()));
        builder
    }

    /// Add a stub record. Type-level `new` is keyed as the instance constructor.
    pub fn register(&mut self, stub: MethodCall) {
        let stub = normalize_allocator(stub);
        let target = stub.target().clone();
        let entry = match self
            .entries
            .iter()
            .position(|e| e.target == target)
        {
            Some(index) => &mut self.entries[index],
            None => {
                self.entries.push(TargetStubs {
                    target,
                    methods: Vec::new(),
                });
                let last = self.entries.len() - 1;
                &mut self.entries[last]
            }
        };

        match entry.methods.iter_mut().find(|m| m.method == stub.method_name()) {
            Some(method) => method.stubs.push(stub),
            None => entry.methods.push(MethodStubs {
                method: stub.method_name().to_string(),
                stubs: vec![stub],
            }),
        }
    }

    /// Stubbed targets with their stubbed method names, in registration order
    pub fn targets(&self) -> Vec<(CallTarget, Vec<String>)> {
        self.entries
            .iter()
            .map(|entry| {
                let methods = entry.methods.iter().map(|m| m.method.clone()).collect();
                (entry.target.clone(), methods)
            })
            .collect()
    }

    pub fn stubs_for(&self, target: &CallTarget, method: &str) -> &[MethodCall] {
        self.entries
            .iter()
            .find(|e| &e.target == target)
            .and_then(|e| e.methods.iter().find(|m| m.method == method))
            .map(|m| m.stubs.as_slice())
            .unwrap_or_default()
    }

    /// Every stub record in registration order (grouped by target and method)
    pub fn stubs(&self) -> impl Iterator<Item = &MethodCall> {
        self.entries
            .iter()
            .flat_map(|e| e.methods.iter())
            .flat_map(|m| m.stubs.iter())
    }

    pub fn stubs_mut(&mut self) -> impl Iterator<Item = &mut MethodCall> {
        self.entries
            .iter_mut()
            .flat_map(|e| e.methods.iter_mut())
            .flat_map(|m| m.stubs.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.stubs().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Re-key a stubbed type-level `new` as the instance constructor. The stub
/// keeps its canned value and the type object as its receiver, which is what
/// [`crate::mocks::StubSet`] answers `new` with.
fn normalize_allocator(stub: MethodCall) -> MethodCall {
    match stub.target() {
        CallTarget::Static(type_name) if stub.method_name() == ALLOCATOR => {
            let receiver = stub
                .mocked_object()
                .cloned()
                .unwrap_or_else(|| Value::Type(type_name.clone()));
            let mut normalized = MethodCall::new(
                CallTarget::Instance(type_name.clone()),
                CONSTRUCTOR,
                stub.arguments().to_vec(),
            )
            .with_mocked_object(receiver);
            if stub.is_completed() {
                normalized = normalized.with_return(stub.return_value().clone());
            }
            normalized.metadata = stub.metadata.clone();
            normalized
        }
        _ => stub,
    }
}

/// Whether `stub` was configured on the type-level `new` of its target
pub fn is_allocator_stub(stub: &MethodCall) -> bool {
    match (stub.target(), stub.mocked_object()) {
        (CallTarget::Instance(type_name), Some(Value::Type(receiver))) => {
            stub.is_constructor() && receiver == type_name
        }
        _ => false,
    }
}

/// Fluent stub configuration, finished by [`StubBuilder::and_return`]
pub struct StubBuilder<'r> {
    registry: &'r mut MockRegistry,
    target: CallTarget,
    method: String,
    arguments: Vec<Value>,
    receiver: Option<Value>,
    location: Option<String>,
}

impl StubBuilder<'_> {
    /// Only answer calls with exactly these arguments
    pub fn with(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Source location of the test that configured the stub
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn and_return(self, value: Value) -> MethodCall {
        let mut stub = MethodCall::new(self.target, self.method, self.arguments)
            .with_return(value)
            .with_example(current_example())
            .with_location(self.location.unwrap_or_else(|| STUB_LOCATION.to_string()));
        if let Some(receiver) = self.receiver {
            stub = stub.with_mocked_object(receiver);
        }
        self.registry.register(stub.clone());
        stub
    }
}
