//! Instantiated modules and export invocation.

use super::convert::{
    ExportInfo, extern_kind_of, from_val, signature_of, to_val, trap_kind_of, zero_val,
};
use super::host::HostState;
use super::memory::{WasmPtr, read_bytes};
use parking_lot::Mutex;
use std::sync::Arc;
use wasmhost_core::{HarnessError, Result, Signature, TrapKind, Value};
use wasmtime::{Func, Memory, Module, Store, Trap, TypedFunc, WasmParams, WasmResults};

/// A module instantiated against an import table, ready to invoke.
///
/// Owns its store, so every host object created for it (host memories,
/// resource limits) lives exactly as long as the instance. Invocation
/// takes `&mut self`: one instance runs one call at a time.
pub struct Instance {
    name: String,
    module: Module,
    store: Store<HostState>,
    instance: wasmtime::Instance,
}

impl Instance {
    pub(crate) fn new(
        name: String,
        module: Module,
        store: Store<HostState>,
        instance: wasmtime::Instance,
    ) -> Self {
        Self {
            name,
            module,
            store,
            instance,
        }
    }

    /// Name the module was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Describe every export of the module.
    pub fn exports(&self) -> Vec<ExportInfo> {
        self.module
            .exports()
            .map(|e| ExportInfo {
                name: e.name().to_string(),
                kind: extern_kind_of(&e.ty()),
            })
            .collect()
    }

    /// Check if a function export with this name exists.
    pub fn has_function(&mut self, export: &str) -> bool {
        self.instance.get_func(&mut self.store, export).is_some()
    }

    /// Get the signature of a function export.
    pub fn signature(&mut self, export: &str) -> Result<Signature> {
        let func = self.func(export)?;
        self.signature_of_func(export, &func)
    }

    /// Call a function export with the given arguments.
    ///
    /// Returns `None` for exports without a result. Arguments are checked
    /// against the declared signature before the guest runs; a mismatch
    /// fails with `ArityOrType` and has no side effects. Errors raised by
    /// host functions during the call are returned unchanged; guest traps
    /// are returned as `Trap`.
    pub fn invoke(&mut self, export: &str, args: &[Value]) -> Result<Option<Value>> {
        let func = self.func(export)?;
        let sig = self.signature_of_func(export, &func)?;
        if sig.results.len() > 1 {
            return Err(HarnessError::ArityOrType {
                export: export.to_string(),
                expected: "at most one result".to_string(),
                actual: sig.to_string(),
            });
        }

        let mut results = self.call(export, func, &sig, args)?;
        Ok(results.pop())
    }

    /// Call a function export and return all of its results.
    pub fn invoke_multi(&mut self, export: &str, args: &[Value]) -> Result<Vec<Value>> {
        let func = self.func(export)?;
        let sig = self.signature_of_func(export, &func)?;
        self.call(export, func, &sig, args)
    }

    /// Get a statically typed handle to a function export.
    ///
    /// Fails with `NotFound` if there is no such function and with
    /// `ArityOrType` if `P`/`R` do not match its signature.
    pub fn typed_func<P, R>(&mut self, export: &str) -> Result<TypedFunc<P, R>>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self.func(export)?;
        func.typed::<P, R>(&self.store)
            .map_err(|e| HarnessError::ArityOrType {
                export: export.to_string(),
                expected: func_type_string(&self.store, &func),
                actual: e.to_string(),
            })
    }

    /// Call a function export through a statically typed handle.
    pub fn invoke_typed<P, R>(&mut self, export: &str, params: P) -> Result<R>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self.typed_func::<P, R>(export)?;
        tracing::debug!(module = %self.name, export, "Invoking typed export");
        func.call(&mut self.store, params)
            .map_err(|e| classify_call_error(export, e))
    }

    /// Find a memory by export name, or by qualified host import name
    /// (`js.mem`) for memories the host created.
    pub fn memory(&mut self, name: &str) -> Option<Memory> {
        self.instance
            .get_memory(&mut self.store, name)
            .or_else(|| self.store.data().memory(name))
    }

    /// Copy `length` bytes at `offset` out of the named memory.
    pub fn read_memory(&mut self, name: &str, offset: u32, length: u32) -> Result<Vec<u8>> {
        let memory = self
            .memory(name)
            .ok_or_else(|| HarnessError::MemoryUnavailable {
                name: name.to_string(),
            })?;
        read_bytes(&memory, &self.store, WasmPtr::new(offset, length)).map(<[u8]>::to_vec)
    }

    /// Fuel left in the store, when fuel metering is enabled.
    pub fn remaining_fuel(&self) -> Option<u64> {
        self.store.get_fuel().ok()
    }

    /// Wrap this instance for use from several threads.
    pub fn into_shared(self) -> SharedInstance {
        SharedInstance {
            inner: Arc::new(Mutex::new(self)),
        }
    }

    fn call(
        &mut self,
        export: &str,
        func: Func,
        sig: &Signature,
        args: &[Value],
    ) -> Result<Vec<Value>> {
        sig.check_args(export, args)?;

        let params: Vec<_> = args.iter().copied().map(to_val).collect();
        let mut results: Vec<_> = sig.results.iter().copied().map(zero_val).collect();

        tracing::debug!(module = %self.name, export, args = args.len(), "Invoking export");

        func.call(&mut self.store, &params, &mut results)
            .map_err(|e| classify_call_error(export, e))
            .inspect_err(|e| {
                tracing::warn!(module = %self.name, export, error = %e, "Export failed");
            })?;

        results
            .iter()
            .map(|v| {
                from_val(v).ok_or_else(|| HarnessError::ArityOrType {
                    export: export.to_string(),
                    expected: sig.to_string(),
                    actual: "non-numeric result".to_string(),
                })
            })
            .collect()
    }

    fn func(&mut self, export: &str) -> Result<Func> {
        self.instance
            .get_func(&mut self.store, export)
            .ok_or_else(|| HarnessError::NotFound {
                export: export.to_string(),
            })
    }

    fn signature_of_func(&self, export: &str, func: &Func) -> Result<Signature> {
        signature_of(&func.ty(&self.store)).ok_or_else(|| HarnessError::ArityOrType {
            export: export.to_string(),
            expected: "numeric parameters and results".to_string(),
            actual: func_type_string(&self.store, func),
        })
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An [`Instance`] shared across threads.
///
/// Calls are serialized by a mutex: concurrent callers wait for the
/// running invocation to finish.
#[derive(Clone)]
pub struct SharedInstance {
    inner: Arc<Mutex<Instance>>,
}

impl SharedInstance {
    /// Call a function export; see [`Instance::invoke`].
    pub fn invoke(&self, export: &str, args: &[Value]) -> Result<Option<Value>> {
        self.inner.lock().invoke(export, args)
    }

    /// Run `f` with exclusive access to the instance.
    pub fn with<R>(&self, f: impl FnOnce(&mut Instance) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

fn func_type_string(store: &Store<HostState>, func: &Func) -> String {
    format!("{:?}", func.ty(store))
}

/// Turn an error out of `Func::call` into the harness taxonomy.
///
/// A `HarnessError` raised by a host function keeps its kind; anything
/// else is a trap, classified by the `Trap` code in its chain.
pub(crate) fn classify_call_error(export: &str, err: anyhow::Error) -> HarnessError {
    match err.downcast::<HarnessError>() {
        Ok(host) => host,
        Err(err) => HarnessError::Trap {
            export: export.to_string(),
            kind: err
                .downcast_ref::<Trap>()
                .map(trap_kind_of)
                .unwrap_or(TrapKind::Other),
            cause: format!("{:#}", err),
        },
    }
}

/// Turn an error out of `Linker::instantiate` into the harness taxonomy.
///
/// Imports are checked before instantiation, so what reaches here is a
/// start function trap, a host error raised from the start function, or
/// a resource limit; all but the host error are instantiation failures.
pub(crate) fn classify_instantiation_error(module: &str, err: anyhow::Error) -> HarnessError {
    match err.downcast::<HarnessError>() {
        Ok(host) => host,
        Err(err) => HarnessError::Instantiation {
            module: module.to_string(),
            cause: format!("{:#}", err),
        },
    }
}
