//! Prelude for convenient imports.

pub use crate::WASM_PAGE_SIZE;
pub use crate::error::{HarnessError, Result, TrapKind};
pub use crate::sink::{Emission, OutputSink, RecordingSink, SharedSink, StdoutSink, TracingSink};
pub use crate::value::{ParseValueError, Signature, Value, ValueType};
