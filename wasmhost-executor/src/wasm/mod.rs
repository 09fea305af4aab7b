//! WASM host harness built on Wasmtime.
//!
//! Loads a compiled module, supplies a small set of host imports,
//! instantiates the module against them and invokes its exports with
//! numeric arguments.
//!
//! # Architecture
//!
//! - **WasmRuntime**: Manages the Wasmtime engine and compiled modules
//! - **ImportTable**: Configuration of the host imports offered to a module
//! - **Instance**: An instantiated module that owns its store
//! - **HostState**: Per-store state read by host functions
//!
//! # Host Import ABI
//!
//! | Import | Signature | Behavior |
//! |:-------|:----------|:---------|
//! | `console.log` (integer) | `(i32) -> ()` or `(i64) -> ()` | Emits the value |
//! | `console.log` (string) | `(offset: u32, length: u32) -> ()` | Emits the UTF-8 text at the range |
//! | `js.mem` | memory, 1 page initial | Memory the string logger reads |
//!
//! The string logger looks its memory up on every call, so text written
//! after `memory.grow` is read from the grown buffer.
//!
//! # Example
//!
//! ```
//! use wasmhost_core::{RecordingSink, Value};
//! use wasmhost_executor::wasm::{ImportTable, load};
//!
//! let bytes = wat::parse_str(
//!     r#"(module
//!         (import "console" "log" (func $log (param i32)))
//!         (func (export "main") i32.const 7 call $log))"#,
//! )?;
//!
//! let sink = RecordingSink::new();
//! let mut instance = load(&bytes, &ImportTable::integer_logger(sink.clone()))?;
//! assert_eq!(instance.invoke("main", &[])?, None);
//! assert_eq!(sink.integers(), vec![7]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod convert;
mod host;
mod imports;
mod instance;
mod memory;
mod runtime;

// Re-export public types
pub use convert::{ExportInfo, ExternKind, ImportInfo};
pub use host::{HostState, qualified_name};
pub use imports::{
    CONSOLE_MODULE, DEFAULT_MEMORY_EXPORT, HostImport, ImportEntry, ImportTable, IntegerWidth,
    JS_MODULE, LOG_FUNCTION, MEMORY_IMPORT, MemoryPages, MemorySource,
};
pub use instance::{Instance, SharedInstance};
pub use memory::{WasmPtr, read_bytes, read_string};
pub use runtime::{CompiledModule, WasmRuntime, WasmRuntimeConfig, load};
