//! Host function bindings for WASM modules.
//!
//! Provides the `console.log` imports in their integer and string forms.
//! Both forms emit into an injected [`OutputSink`] synchronously, before
//! control returns to the guest.

use super::imports::MemorySource;
use super::memory::{WasmPtr, read_string};
use std::collections::HashMap;
use wasmhost_core::{Emission, HarnessError, Result, SharedSink};
use wasmtime::{Caller, Extern, Linker, Memory, StoreLimits};

/// State owned by each store.
///
/// Holds the host-created memories by qualified import name (`js.mem`) so
/// host functions can look them up on every call instead of capturing a
/// view of their bytes, plus the resource limiter for the store.
pub struct HostState {
    /// Host-owned memories, keyed by `module.name`.
    memories: HashMap<String, Memory>,
    /// Resource limits enforced on guest memories and tables.
    pub(crate) limits: StoreLimits,
}

impl HostState {
    /// Create new host state with the given limits.
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            memories: HashMap::new(),
            limits,
        }
    }

    /// Register a host-owned memory under its qualified import name.
    pub fn insert_memory(&mut self, qualified_name: impl Into<String>, memory: Memory) {
        self.memories.insert(qualified_name.into(), memory);
    }

    /// Look up a host-owned memory by qualified import name.
    pub fn memory(&self, qualified_name: &str) -> Option<Memory> {
        self.memories.get(qualified_name).copied()
    }

    /// Number of host-owned memories.
    pub fn memory_count(&self) -> usize {
        self.memories.len()
    }
}

/// Join an import namespace and name the way diagnostics print them.
pub fn qualified_name(module: &str, name: &str) -> String {
    format!("{}.{}", module, name)
}

fn registration_error(module: &str, name: &str, e: anyhow::Error) -> HarnessError {
    HarnessError::HostFunction {
        module: module.to_string(),
        name: name.to_string(),
        cause: e.to_string(),
    }
}

/// Register the 32-bit integer logger: `(i32) -> ()`.
pub fn register_integer_logger_i32(
    linker: &mut Linker<HostState>,
    module: &str,
    name: &str,
    sink: SharedSink,
) -> Result<()> {
    linker
        .func_wrap(module, name, move |value: i32| {
            tracing::trace!(value, "console.log (i32)");
            sink.emit(Emission::Integer(i64::from(value)));
        })
        .map_err(|e| registration_error(module, name, e))?;
    Ok(())
}

/// Register the 64-bit integer logger: `(i64) -> ()`.
pub fn register_integer_logger_i64(
    linker: &mut Linker<HostState>,
    module: &str,
    name: &str,
    sink: SharedSink,
) -> Result<()> {
    linker
        .func_wrap(module, name, move |value: i64| {
            tracing::trace!(value, "console.log (i64)");
            sink.emit(Emission::Integer(value));
        })
        .map_err(|e| registration_error(module, name, e))?;
    Ok(())
}

/// Register the string logger: `(offset: u32, length: u32) -> ()`.
///
/// On each call the memory named by `source` is resolved again, the
/// descriptor is bounds-checked against its current size and the bytes
/// are decoded strictly as UTF-8. Any failure is returned to the guest's
/// caller as the corresponding `HarnessError` and nothing is emitted.
pub fn register_string_logger(
    linker: &mut Linker<HostState>,
    module: &str,
    name: &str,
    source: MemorySource,
    sink: SharedSink,
) -> Result<()> {
    linker
        .func_wrap(
            module,
            name,
            move |mut caller: Caller<'_, HostState>,
                  offset: u32,
                  length: u32|
                  -> anyhow::Result<()> {
                let ptr = WasmPtr::new(offset, length);

                let text = resolve_memory(&mut caller, &source)
                    .and_then(|memory| read_string(&memory, &caller, ptr))
                    .inspect_err(|e| {
                        tracing::warn!(
                            offset,
                            length,
                            error = %e,
                            "console.log rejected descriptor"
                        );
                    })?;

                tracing::trace!(offset, length, "console.log (string)");
                sink.emit(Emission::Text(text));
                Ok(())
            },
        )
        .map_err(|e| registration_error(module, name, e))?;
    Ok(())
}

/// Find the memory a string logger reads from, as of this call.
fn resolve_memory(caller: &mut Caller<'_, HostState>, source: &MemorySource) -> Result<Memory> {
    match source {
        MemorySource::Imported { module, name } => {
            let key = qualified_name(module, name);
            caller
                .data()
                .memory(&key)
                .ok_or(HarnessError::MemoryUnavailable { name: key })
        }
        MemorySource::Exported(export) => caller
            .get_export(export)
            .and_then(Extern::into_memory)
            .ok_or_else(|| HarnessError::MemoryUnavailable {
                name: export.clone(),
            }),
    }
}
