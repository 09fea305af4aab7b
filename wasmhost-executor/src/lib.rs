//! wasmhost Executor - Wasmtime-backed module loading and invocation.
//!
//! This crate provides the runtime side of the harness:
//! - Import tables for the `console.log` loggers and the `js.mem` memory
//! - Module compilation with a content-hash cache
//! - Instantiation with link and start-trap classification
//! - Export invocation with tagged numeric values
//! - Tracing subscriber setup

#![warn(missing_docs)]

pub mod observability;
pub mod wasm;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::observability::{LogFormat, TracingConfig, init_tracing};
    pub use crate::wasm::{
        CompiledModule, ImportTable, Instance, IntegerWidth, SharedInstance, WasmRuntime,
        WasmRuntimeConfig, load,
    };
    pub use wasmhost_core::prelude::*;
}
