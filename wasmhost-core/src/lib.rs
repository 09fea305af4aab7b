//! wasmhost Core Library
//!
//! Foundational types shared by the wasmhost loader and its command-line
//! runner.
//!
//! # Key Components
//!
//! - **Value / Signature**: Tagged numeric values and function signatures
//!   used to call WASM exports without dynamic typing
//! - **OutputSink**: Injected destination for guest diagnostic output
//! - **HarnessError**: The error taxonomy every load and invoke surfaces
//!
//! # Example
//!
//! ```
//! use wasmhost_core::prelude::*;
//!
//! let sig = Signature::new(vec![ValueType::I32], vec![ValueType::I32]);
//! assert!(sig.check_args("square", &[Value::I32(4)]).is_ok());
//!
//! let sink = RecordingSink::new();
//! sink.emit(Emission::Integer(7));
//! assert_eq!(sink.integers(), vec![7]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod prelude;
pub mod sink;
pub mod value;

pub use error::{HarnessError, Result, TrapKind};
pub use sink::{Emission, OutputSink, RecordingSink, SharedSink, StdoutSink, TracingSink};
pub use value::{ParseValueError, Signature, Value, ValueType};

/// Size of one WASM linear memory page in bytes.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;
