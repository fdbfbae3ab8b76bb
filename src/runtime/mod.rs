//! Dispatch surface for traced code.
//!
//! The [`Runtime`] owns a [`TypeCatalog`], a method table keyed by
//! `(CallTarget, method)` and a list of event subscribers. Test code invokes
//! methods through it; the tracer intercepts them either by swapping table
//! entries for wrappers or by subscribing to the event stream.
//!
//! No lock is held while an implementation runs, so implementations may
//! re-enter the runtime (recursion, calls into other traced methods).

pub mod catalog;
pub mod events;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use catalog::{MethodDef, TypeCatalog, TypeDef};
pub use events::{EventHandler, SubscriptionId, TraceEvent};

use crate::core::{CallTarget, DoubleRef, MethodShape, ObjectRef, Subtyping, TypeName, Value};
use crate::method_call::{ALLOCATOR, CONSTRUCTOR};
use crate::type_checks::{MethodSignature, TypeEnvironment};

/// Location reported for implementations installed by the mocking layer
pub const STUB_LOCATION: &str = "<doublecheck:stub>";

/// An error raised by a method instead of returning
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{type_name}: {message}")]
pub struct Raised {
    pub type_name: TypeName,
    pub message: String,
}

impl Raised {
    pub fn new(type_name: impl Into<TypeName>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn no_method(target: &CallTarget, method: &str) -> Self {
        Self::new(
            "NoMethodError",
            format!("undefined method `{}`", target.describe(method)),
        )
    }
}

pub type MethodImpl =
    Arc<dyn Fn(&Runtime, &Value, &[Value]) -> Result<Value, Raised> + Send + Sync>;

/// An installed implementation and where it lives
#[derive(Clone)]
pub struct MethodEntry {
    pub implementation: MethodImpl,
    pub location: String,
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Receives every message sent to a test double
pub type DoubleHandler =
    Arc<dyn Fn(&Runtime, &DoubleRef, &str, &[Value]) -> Result<Value, Raised> + Send + Sync>;

type MethodKey = (CallTarget, String);

#[derive(Default)]
pub struct Runtime {
    catalog: RwLock<TypeCatalog>,
    methods: RwLock<HashMap<MethodKey, MethodEntry>>,
    subscribers: RwLock<Vec<(SubscriptionId, EventHandler)>>,
    next_subscription: AtomicU64,
    double_handler: RwLock<Option<DoubleHandler>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_type(&self, def: TypeDef) {
        self.catalog.write().define_type(def);
    }

    /// Define a method: declare it in the catalog and install its implementation.
    pub fn define_method<F>(
        &self,
        target: CallTarget,
        name: &str,
        shape: MethodShape,
        location: impl Into<String>,
        implementation: F,
    ) where
        F: Fn(&Runtime, &Value, &[Value]) -> Result<Value, Raised> + Send + Sync + 'static,
    {
        let location = location.into();
        self.catalog.write().define_method(
            &target,
            name,
            MethodDef {
                shape: Arc::new(shape),
                location: location.clone(),
                signature: None,
            },
        );
        self.methods.write().insert(
            (target, name.to_string()),
            MethodEntry {
                implementation: Arc::new(implementation),
                location,
            },
        );
    }

    /// Attach a signature annotation to a defined method
    pub fn annotate(&self, target: &CallTarget, name: &str, signature: MethodSignature) -> bool {
        self.catalog.write().annotate(target, name, signature)
    }

    /// Snapshot of the catalog
    pub fn catalog(&self) -> TypeCatalog {
        self.catalog.read().clone()
    }

    /// Declared shape and location of a method, resolved through the hierarchy
    pub fn method_def(&self, target: &CallTarget, name: &str) -> Option<(CallTarget, MethodDef)> {
        self.catalog
            .read()
            .lookup(target, name)
            .map(|(owner, def)| (owner, def.clone()))
    }

    /// The entry installed directly on `target`, without walking the hierarchy
    pub fn own_method(&self, target: &CallTarget, name: &str) -> Option<MethodEntry> {
        self.methods
            .read()
            .get(&(target.clone(), name.to_string()))
            .cloned()
    }

    /// Find the implementation that handles `name` on `target`.
    pub fn resolve(&self, target: &CallTarget, name: &str) -> Option<(CallTarget, MethodEntry)> {
        let methods = self.methods.read();
        let catalog = self.catalog.read();
        let mut current = Some(target.underlying_type().clone());
        let mut depth = 0;

        while let Some(type_name) = current {
            if depth > 64 {
                break;
            }
            depth += 1;

            let candidate = if target.is_static() {
                CallTarget::Static(type_name)
            } else {
                CallTarget::Instance(type_name)
            };
            if let Some(entry) = methods.get(&(candidate.clone(), name.to_string())) {
                return Some((candidate, entry.clone()));
            }
            current = catalog
                .type_def(candidate.underlying_type())
                .and_then(|def| def.superclass.clone());
        }

        None
    }

    /// Install an implementation directly on `target`, returning the one it replaces
    pub fn replace_method(
        &self,
        target: &CallTarget,
        name: &str,
        entry: MethodEntry,
    ) -> Option<MethodEntry> {
        self.methods
            .write()
            .insert((target.clone(), name.to_string()), entry)
    }

    /// Undo a [`Runtime::replace_method`]
    pub fn restore_method(&self, target: &CallTarget, name: &str, previous: Option<MethodEntry>) {
        let key = (target.clone(), name.to_string());
        let mut methods = self.methods.write();
        match previous {
            Some(entry) => {
                methods.insert(key, entry);
            }
            None => {
                methods.remove(&key);
            }
        }
    }

    pub fn subscribe(&self, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, handler));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.write().retain(|(sid, _)| *sid != id);
    }

    /// Route messages sent to test doubles to `handler`, returning the previous one
    pub fn set_double_handler(&self, handler: Option<DoubleHandler>) -> Option<DoubleHandler> {
        std::mem::replace(&mut *self.double_handler.write(), handler)
    }

    /// Invoke an instance or static method, depending on the receiver.
    ///
    /// Doubles never reach the method table or the event stream.
    pub fn invoke(&self, receiver: &Value, name: &str, args: Vec<Value>) -> Result<Value, Raised> {
        let target = match receiver {
            Value::Double(double) => return self.message_double(double, name, &args),
            Value::Type(type_name) => CallTarget::Static(type_name.clone()),
            other => CallTarget::Instance(other.type_name()),
        };
        self.dispatch(&target, receiver, name, &args)
    }

    pub fn invoke_static(
        &self,
        type_name: impl Into<TypeName>,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, Raised> {
        self.invoke(&Value::Type(type_name.into()), name, args)
    }

    /// Create an instance: `Type.new(args)`, which by default allocates an
    /// object and runs `initialize` on it.
    pub fn construct(&self, type_name: impl Into<TypeName>, args: Vec<Value>) -> Result<Value, Raised> {
        let type_name = type_name.into();
        let target = CallTarget::Static(type_name.clone());
        if self.resolve(&target, ALLOCATOR).is_some() {
            return self.dispatch(&target, &Value::Type(type_name), ALLOCATOR, &args);
        }
        self.allocate(&type_name, &args)
    }

    /// Default allocation: new object, then its constructor if one exists
    pub fn allocate(&self, type_name: &TypeName, args: &[Value]) -> Result<Value, Raised> {
        let object = Value::Object(ObjectRef::new(type_name.clone()));
        let instance = CallTarget::Instance(type_name.clone());
        if self.resolve(&instance, CONSTRUCTOR).is_some() {
            self.dispatch(&instance, &object, CONSTRUCTOR, args)?;
        }
        Ok(object)
    }

    fn message_double(&self, double: &DoubleRef, name: &str, args: &[Value]) -> Result<Value, Raised> {
        let handler = self.double_handler.read().clone();
        match handler {
            Some(handler) => handler(self, double, name, args),
            None => Err(Raised::new(
                "MockExpectationError",
                format!("{} received unexpected message :{}", double.double(), name),
            )),
        }
    }

    fn dispatch(
        &self,
        target: &CallTarget,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> Result<Value, Raised> {
        let (owner, entry) = self
            .resolve(target, name)
            .ok_or_else(|| Raised::no_method(target, name))?;

        let subscribers: Vec<EventHandler> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        if subscribers.is_empty() {
            return (entry.implementation)(self, receiver, args);
        }

        let binding = self
            .method_def(&owner, name)
            .map(|(_, def)| def.shape.bind(args))
            .unwrap_or_default();
        let call = TraceEvent::Call {
            target: &owner,
            method: name,
            receiver,
            binding: &binding,
            location: &entry.location,
        };
        subscribers.iter().for_each(|handler| handler(&call));

        let result = (entry.implementation)(self, receiver, args);

        let finish = match &result {
            Ok(value) => TraceEvent::Return {
                target: &owner,
                method: name,
                value,
            },
            Err(error) => TraceEvent::Unwind {
                target: &owner,
                method: name,
                error,
            },
        };
        subscribers.iter().for_each(|handler| handler(&finish));

        result
    }
}

impl Subtyping for Runtime {
    fn superclass_of(&self, ty: &TypeName) -> Option<TypeName> {
        self.catalog.read().superclass_of(ty)
    }
}

impl TypeEnvironment for Runtime {
    fn annotated_signature(&self, target: &CallTarget, method: &str) -> Option<MethodSignature> {
        self.catalog.read().annotated_signature(target, method)
    }

    fn knows_type(&self, name: &TypeName) -> bool {
        self.catalog.read().knows_type(name)
    }
}
