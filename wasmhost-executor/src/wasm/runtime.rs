//! WASM runtime management using Wasmtime.
//!
//! Provides engine configuration, module compilation and caching, and
//! instantiation of compiled modules against an [`ImportTable`].

use super::convert::{ExportInfo, ImportInfo, extern_kind_of};
use super::host::HostState;
use super::imports::ImportTable;
use super::instance::{Instance, classify_instantiation_error};
use dashmap::DashMap;
use std::env;
use std::path::Path;
use std::sync::Arc;
use wasmhost_core::{HarnessError, Result, WASM_PAGE_SIZE};
use wasmtime::{Config, Engine, Linker, Module, Store, StoreLimitsBuilder};

/// Default maximum memory pages (64 KiB per page).
const DEFAULT_MAX_MEMORY_PAGES: u32 = 1024; // 64 MiB

/// Default fuel amount for execution limiting.
const DEFAULT_FUEL: u64 = 10_000_000;

/// Name used for modules loaded from bare bytes.
const ANONYMOUS_MODULE: &str = "module";

/// Configuration for the WASM runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmRuntimeConfig {
    /// Maximum pages any single guest memory may grow to (64 KiB per page).
    pub max_memory_pages: u32,
    /// Whether to enable fuel-based execution limiting.
    pub fuel_enabled: bool,
    /// Initial fuel amount for each new instance when fuel is enabled.
    pub fuel_amount: u64,
    /// Whether to cache compiled modules by content hash.
    pub cache_modules: bool,
    /// Enable debug info in compiled modules.
    pub debug_info: bool,
}

impl Default for WasmRuntimeConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
            fuel_enabled: false,
            fuel_amount: DEFAULT_FUEL,
            cache_modules: true,
            debug_info: false,
        }
    }
}

impl WasmRuntimeConfig {
    /// Create a configuration for running untrusted modules: fuel metering on.
    pub fn production() -> Self {
        Self {
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
            fuel_enabled: true,
            fuel_amount: DEFAULT_FUEL,
            cache_modules: true,
            debug_info: false,
        }
    }

    /// Create a configuration for testing with stricter limits.
    pub fn testing() -> Self {
        Self {
            max_memory_pages: 256, // 16 MiB
            fuel_enabled: true,
            fuel_amount: 1_000_000,
            cache_modules: false,
            debug_info: true,
        }
    }

    /// Create configuration from environment variables, starting from defaults.
    ///
    /// Environment variables:
    /// - `WASMHOST_MAX_MEMORY_PAGES`: memory cap in pages
    /// - `WASMHOST_FUEL`: fuel per instance; `0` or `off` disables metering
    /// - `WASMHOST_CACHE`: `false`/`0` disables the module cache
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(pages) = env::var("WASMHOST_MAX_MEMORY_PAGES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            config.max_memory_pages = pages;
        }

        if let Ok(fuel) = env::var("WASMHOST_FUEL") {
            match fuel.to_lowercase().as_str() {
                "0" | "off" | "false" => config.fuel_enabled = false,
                other => {
                    if let Ok(amount) = other.parse::<u64>() {
                        config = config.with_fuel(true, amount);
                    }
                }
            }
        }

        if let Ok(cache) = env::var("WASMHOST_CACHE") {
            config.cache_modules = !matches!(cache.to_lowercase().as_str(), "false" | "0" | "off");
        }

        config
    }

    /// Set maximum memory pages.
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages;
        self
    }

    /// Enable or disable fuel-based limiting.
    pub fn with_fuel(mut self, enabled: bool, amount: u64) -> Self {
        self.fuel_enabled = enabled;
        self.fuel_amount = amount;
        self
    }

    /// Enable or disable module caching.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_modules = enabled;
        self
    }

    /// Enable or disable debug info.
    pub fn with_debug_info(mut self, enabled: bool) -> Self {
        self.debug_info = enabled;
        self
    }

    /// Maximum size of a single guest memory in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_pages as usize * WASM_PAGE_SIZE
    }

    fn to_wasmtime_config(&self) -> Config {
        let mut config = Config::new();

        config.consume_fuel(self.fuel_enabled);
        config.debug_info(self.debug_info);
        config.strategy(wasmtime::Strategy::Cranelift);

        config
    }
}

/// A compiled WASM module ready for instantiation.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    /// Name used in diagnostics.
    name: String,
    /// The compiled Wasmtime module.
    module: Module,
    /// Hash of the original WASM bytes (for caching).
    hash: u64,
}

impl CompiledModule {
    /// Get the name this module was compiled under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the underlying Wasmtime module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Get the hash of this module.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Describe every import the module declares.
    pub fn imports(&self) -> Vec<ImportInfo> {
        self.module
            .imports()
            .map(|i| ImportInfo {
                module: i.module().to_string(),
                name: i.name().to_string(),
                kind: extern_kind_of(&i.ty()),
            })
            .collect()
    }

    /// Describe every export the module provides.
    pub fn exports(&self) -> Vec<ExportInfo> {
        self.module
            .exports()
            .map(|e| ExportInfo {
                name: e.name().to_string(),
                kind: extern_kind_of(&e.ty()),
            })
            .collect()
    }
}

/// WASM runtime managing the Wasmtime engine and compiled modules.
///
/// The runtime is `Send + Sync`; instances it creates are independent of
/// each other and of the runtime.
pub struct WasmRuntime {
    /// The Wasmtime engine (thread-safe, can be shared).
    engine: Engine,
    /// Configuration for this runtime.
    config: WasmRuntimeConfig,
    /// Cache of compiled modules by their content hash.
    module_cache: DashMap<u64, Arc<CompiledModule>>,
}

impl WasmRuntime {
    /// Create a new WASM runtime with the given configuration.
    pub fn new(config: WasmRuntimeConfig) -> Result<Self> {
        let wasmtime_config = config.to_wasmtime_config();
        let engine = Engine::new(&wasmtime_config).map_err(|e| HarnessError::Engine {
            cause: e.to_string(),
        })?;

        tracing::debug!(?config, "Created WASM runtime");

        Ok(Self {
            engine,
            config,
            module_cache: DashMap::new(),
        })
    }

    /// Create a new runtime with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(WasmRuntimeConfig::default())
    }

    /// Get the Wasmtime engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &WasmRuntimeConfig {
        &self.config
    }

    /// Compile WASM bytes into a module.
    ///
    /// If caching is enabled and the same bytes were compiled before, the
    /// cached module is reused. Malformed or invalid bytes fail with
    /// `Validation`.
    pub fn compile(&self, name: &str, wasm_bytes: &[u8]) -> Result<Arc<CompiledModule>> {
        let hash = hash_bytes(wasm_bytes);

        if self.config.cache_modules {
            if let Some(cached) = self.module_cache.get(&hash) {
                tracing::debug!(module = name, hash, "Module cache hit");
                if cached.name == name {
                    return Ok(Arc::clone(&cached));
                }
                return Ok(Arc::new(CompiledModule {
                    name: name.to_string(),
                    module: cached.module.clone(),
                    hash,
                }));
            }
        }

        let module = Module::new(&self.engine, wasm_bytes).map_err(|e| HarnessError::Validation {
            module: name.to_string(),
            cause: format!("{:#}", e),
        })?;

        tracing::debug!(module = name, hash, size = wasm_bytes.len(), "Compiled module");

        let compiled = Arc::new(CompiledModule {
            name: name.to_string(),
            module,
            hash,
        });

        if self.config.cache_modules {
            self.module_cache.insert(hash, Arc::clone(&compiled));
        }

        Ok(compiled)
    }

    /// Compile WASM bytes from a file, named after the file.
    pub fn compile_file(&self, path: &Path) -> Result<Arc<CompiledModule>> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(ANONYMOUS_MODULE);

        let wasm_bytes = std::fs::read(path).map_err(|e| HarnessError::Io {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;

        self.compile(name, &wasm_bytes)
    }

    /// Validate WASM bytes without compiling.
    pub fn validate(&self, wasm_bytes: &[u8]) -> Result<()> {
        Module::validate(&self.engine, wasm_bytes).map_err(|e| HarnessError::Validation {
            module: ANONYMOUS_MODULE.to_string(),
            cause: format!("{:#}", e),
        })
    }

    /// Compile `wasm_bytes` and instantiate it against `imports`.
    pub fn load(&self, wasm_bytes: &[u8], imports: &ImportTable) -> Result<Instance> {
        self.load_named(ANONYMOUS_MODULE, wasm_bytes, imports)
    }

    /// Like [`load`](Self::load), naming the module in diagnostics.
    pub fn load_named(
        &self,
        name: &str,
        wasm_bytes: &[u8],
        imports: &ImportTable,
    ) -> Result<Instance> {
        let compiled = self.compile(name, wasm_bytes)?;
        self.instantiate(&compiled, imports)
    }

    /// Instantiate a compiled module against an import table.
    ///
    /// Every instance gets a fresh store: its own host memories, limits and
    /// fuel. Unsatisfied imports fail with `Link` before anything runs; a
    /// trapping start function fails with `Instantiation`.
    pub fn instantiate(
        &self,
        compiled: &CompiledModule,
        imports: &ImportTable,
    ) -> Result<Instance> {
        let name = compiled.name();
        imports.check(name, compiled.module())?;

        let limits = StoreLimitsBuilder::new()
            .memory_size(self.config.max_memory_bytes())
            .build();
        let mut store = Store::new(&self.engine, HostState::new(limits));
        store.limiter(|state| &mut state.limits);

        if let Some(fuel) = self.initial_fuel() {
            store.set_fuel(fuel).map_err(|e| HarnessError::Engine {
                cause: e.to_string(),
            })?;
        }

        let mut linker = Linker::new(&self.engine);
        imports.link(&mut linker, &mut store)?;
        tracing::debug!(module = name, imports = imports.len(), "Linked imports");

        let instance = linker
            .instantiate(&mut store, compiled.module())
            .map_err(|e| classify_instantiation_error(name, e))
            .inspect_err(|e| {
                tracing::warn!(module = name, error = %e, "Instantiation failed");
            })?;

        tracing::info!(module = name, "Instantiated module");

        Ok(Instance::new(
            name.to_string(),
            compiled.module().clone(),
            store,
            instance,
        ))
    }

    /// Clear the module cache.
    pub fn clear_cache(&self) {
        self.module_cache.clear();
    }

    /// Get the number of cached modules.
    pub fn cache_size(&self) -> usize {
        self.module_cache.len()
    }

    /// Get the initial fuel amount for new stores.
    pub fn initial_fuel(&self) -> Option<u64> {
        if self.config.fuel_enabled {
            Some(self.config.fuel_amount)
        } else {
            None
        }
    }
}

/// Compile and instantiate `wasm_bytes` on a default runtime.
///
/// Convenience for one-off loads; use a [`WasmRuntime`] to share compiled
/// modules or to configure limits.
pub fn load(wasm_bytes: &[u8], imports: &ImportTable) -> Result<Instance> {
    WasmRuntime::new(WasmRuntimeConfig::default().with_cache(false))?.load(wasm_bytes, imports)
}

/// Hash bytes for cache key.
fn hash_bytes(bytes: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}
