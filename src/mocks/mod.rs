//! Mock configuration source: the stub registry and stub installation.

pub mod registry;
pub mod stubs;

pub use registry::{MockRegistry, StubBuilder};
pub use stubs::{MockedCallSink, StubSet};
