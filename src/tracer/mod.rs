//! Real-call tracer.
//!
//! Observes genuine invocations of a registered set of methods and keeps
//! them as [`MethodCall`] records. Two interception strategies exist:
//!
//! - [`TraceStrategy::Wrap`]: each traced method is replaced by a recording
//!   wrapper that forwards to the original
//! - [`TraceStrategy::Events`]: the runtime's call/return event stream is
//!   followed and correlated on a stack
//!
//! Mocking artifacts are filtered once, when the tracer stops.

mod event_stream;
pub mod filter;
mod wrapping;

pub use filter::CallFilter;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::{CallTarget, Error, Result, Value};
use crate::method_call::{MethodCall, ALLOCATOR, CONSTRUCTOR};
use crate::runtime::{Raised, Runtime, SubscriptionId};

pub(crate) type CallStore = Arc<Mutex<Vec<MethodCall>>>;
pub(crate) type Targets = Vec<(CallTarget, Vec<String>)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStrategy {
    #[default]
    Wrap,
    Events,
}

impl TraceStrategy {
    pub const ALL: [TraceStrategy; 2] = [TraceStrategy::Wrap, TraceStrategy::Events];

    pub fn as_str(self) -> &'static str {
        match self {
            TraceStrategy::Wrap => "wrap",
            TraceStrategy::Events => "events",
        }
    }
}

impl fmt::Display for TraceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TraceStrategy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for TraceStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TraceStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Unknown tracing strategy: {}. Supported: wrap,events",
                    s
                ))
            })
    }
}

/// Counts reported when the tracer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraceStats {
    /// Calls captured before filtering
    pub collected: usize,
    /// Calls discarded as mocking artifacts
    pub filtered: usize,
}

impl TraceStats {
    pub fn kept(&self) -> usize {
        self.collected - self.filtered
    }
}

enum Installation {
    Wrapped {
        runtime: Arc<Runtime>,
        methods: Vec<wrapping::WrappedMethod>,
    },
    Subscribed {
        runtime: Arc<Runtime>,
        id: SubscriptionId,
    },
}

enum TracerState {
    Ready,
    Running(Installation),
    Stopped {
        calls: Vec<MethodCall>,
        stats: TraceStats,
    },
}

pub struct Tracer {
    strategy: TraceStrategy,
    targets: Targets,
    filter: CallFilter,
    store: CallStore,
    state: TracerState,
}

impl Tracer {
    pub fn new(strategy: TraceStrategy) -> Self {
        Self {
            strategy,
            targets: Vec::new(),
            filter: CallFilter::default(),
            store: Arc::new(Mutex::new(Vec::new())),
            state: TracerState::Ready,
        }
    }

    pub fn with_filter(mut self, filter: CallFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn strategy(&self) -> TraceStrategy {
        self.strategy
    }

    /// Watch `methods` on `target`; repeated registrations are merged.
    ///
    /// The type-level allocator is watched through the instance constructor
    /// it runs, so both are recorded as `Type#initialize`.
    pub fn register<I, S>(&mut self, target: CallTarget, methods: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for method in methods {
            let (target, method) = normalize(target.clone(), method.into());
            match self.targets.iter_mut().find(|(t, _)| *t == target) {
                Some((_, watched)) => {
                    if !watched.contains(&method) {
                        watched.push(method);
                    }
                }
                None => self.targets.push((target, vec![method])),
            }
        }
    }

    pub fn targets(&self) -> &[(CallTarget, Vec<String>)] {
        &self.targets
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TracerState::Running(_))
    }

    /// Install interception for every registered target. A tracer starts once.
    pub fn start(&mut self, runtime: &Arc<Runtime>) -> Result<()> {
        if !matches!(self.state, TracerState::Ready) {
            return Err(Error::Tracer("tracer already started".to_string()));
        }

        let installation = match self.strategy {
            TraceStrategy::Wrap => Installation::Wrapped {
                runtime: runtime.clone(),
                methods: wrapping::install(runtime, &self.targets, &self.store),
            },
            TraceStrategy::Events => Installation::Subscribed {
                runtime: runtime.clone(),
                id: event_stream::subscribe(runtime, self.targets.clone(), self.store.clone()),
            },
        };
        log::debug!(
            "Tracing {} method(s) via {}",
            self.targets.iter().map(|(_, m)| m.len()).sum::<usize>(),
            self.strategy
        );
        self.state = TracerState::Running(installation);
        Ok(())
    }

    /// Append a record captured elsewhere
    pub fn observe(&self, call: MethodCall) {
        push_call(&self.store, call);
    }

    /// Uninstall interception and return the filtered real calls.
    ///
    /// Later calls return the same records again.
    pub fn stop(&mut self) -> Vec<MethodCall> {
        if let TracerState::Stopped { calls, .. } = &self.state {
            return calls.clone();
        }

        match std::mem::replace(&mut self.state, TracerState::Ready) {
            TracerState::Running(Installation::Wrapped { runtime, methods }) => {
                wrapping::uninstall(&runtime, methods);
            }
            TracerState::Running(Installation::Subscribed { runtime, id }) => {
                runtime.unsubscribe(id);
            }
            TracerState::Ready | TracerState::Stopped { .. } => {}
        }

        let captured = std::mem::take(&mut *self.store.lock());
        let collected = captured.len();
        let calls = self.filter.retain_real(captured);
        let stats = TraceStats {
            collected,
            filtered: collected - calls.len(),
        };
        log::debug!(
            "Collected {} real calls ({} were filtered)",
            calls.len(),
            stats.filtered
        );

        self.state = TracerState::Stopped {
            calls: calls.clone(),
            stats,
        };
        calls
    }

    /// Counts so far; final once stopped
    pub fn stats(&self) -> TraceStats {
        match &self.state {
            TracerState::Stopped { stats, .. } => *stats,
            _ => TraceStats {
                collected: self.store.lock().len(),
                filtered: 0,
            },
        }
    }

    /// Everything captured so far while tracing; the filtered calls once
    /// stopped
    pub fn captured(&self) -> Vec<MethodCall> {
        match &self.state {
            TracerState::Stopped { calls, .. } => calls.clone(),
            _ => self.store.lock().clone(),
        }
    }
}

fn normalize(target: CallTarget, method: String) -> (CallTarget, String) {
    match target {
        CallTarget::Static(type_name) if method == ALLOCATOR => {
            (CallTarget::Instance(type_name), CONSTRUCTOR.to_string())
        }
        other => (other, method),
    }
}

pub(crate) fn push_call(store: &CallStore, call: MethodCall) -> usize {
    let mut store = store.lock();
    store.push(call);
    store.len() - 1
}

/// Attach a return value; constructor records stay without one
pub(crate) fn complete_at(store: &CallStore, index: usize, value: &Value) {
    let store = store.lock();
    let Some(call) = store.get(index) else {
        return;
    };
    if call.is_constructor() {
        return;
    }
    if let Err(err) = call.complete(value.clone()) {
        log::debug!("{}", err);
    }
}

pub(crate) fn raise_at(store: &CallStore, index: usize, raised: &Raised) {
    if let Some(call) = store.lock().get_mut(index) {
        call.metadata.raised = Some(raised.to_string());
    }
}
