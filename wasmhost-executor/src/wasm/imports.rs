//! Import tables: the host functions and memories a module may import.
//!
//! An [`ImportTable`] is plain configuration. Building one never touches
//! module bytes and never fails; the Wasmtime objects behind each entry
//! are only created when the table is linked into a fresh store during
//! instantiation.

use super::convert::{ExternKind, extern_kind_of, signature_of};
use super::host::{
    HostState, qualified_name, register_integer_logger_i32, register_integer_logger_i64,
    register_string_logger,
};
use std::fmt;
use std::sync::Arc;
use wasmhost_core::{HarnessError, OutputSink, Result, SharedSink, Signature, ValueType};
use wasmtime::{ExternType, Linker, Memory, MemoryType, Module, Store};

/// Namespace of the logging import.
pub const CONSOLE_MODULE: &str = "console";
/// Name of the logging import.
pub const LOG_FUNCTION: &str = "log";
/// Namespace of the shared memory import.
pub const JS_MODULE: &str = "js";
/// Name of the shared memory import.
pub const MEMORY_IMPORT: &str = "mem";
/// Conventional name of a module's own exported memory.
pub const DEFAULT_MEMORY_EXPORT: &str = "memory";

/// Width of the integer accepted by the integer logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegerWidth {
    /// `console.log(i32)`.
    #[default]
    I32,
    /// `console.log(i64)`.
    I64,
}

impl IntegerWidth {
    fn value_type(self) -> ValueType {
        match self {
            Self::I32 => ValueType::I32,
            Self::I64 => ValueType::I64,
        }
    }
}

/// Where the string logger finds the guest memory it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemorySource {
    /// A host-owned memory the table also provides as an import.
    Imported {
        /// Import namespace.
        module: String,
        /// Import name.
        name: String,
    },
    /// Memory the module allocates itself and exports under this name.
    Exported(String),
}

/// Initial and maximum size of a host-owned memory, in 64 KiB pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPages {
    /// Initial size in pages.
    pub initial: u32,
    /// Maximum size in pages, or unbounded.
    pub maximum: Option<u32>,
}

impl Default for MemoryPages {
    fn default() -> Self {
        Self {
            initial: 1,
            maximum: None,
        }
    }
}

/// One host-provided import.
#[derive(Clone)]
pub enum HostImport {
    /// A host-owned linear memory.
    Memory(MemoryPages),
    /// `(integer) -> ()`, emits the integer.
    IntegerLogger {
        /// Accepted integer width.
        width: IntegerWidth,
        /// Where emissions go.
        sink: SharedSink,
    },
    /// `(offset: u32, length: u32) -> ()`, emits the UTF-8 string at the descriptor.
    StringLogger {
        /// Memory the descriptor refers to.
        memory: MemorySource,
        /// Where emissions go.
        sink: SharedSink,
    },
}

impl HostImport {
    /// The type a module must declare to import this entry.
    pub fn kind(&self) -> ExternKind {
        match self {
            Self::Memory(pages) => ExternKind::Memory {
                minimum: u64::from(pages.initial),
                maximum: pages.maximum.map(u64::from),
            },
            Self::IntegerLogger { width, .. } => {
                ExternKind::Function(Signature::new(vec![width.value_type()], vec![]))
            }
            Self::StringLogger { .. } => ExternKind::Function(Signature::new(
                vec![ValueType::I32, ValueType::I32],
                vec![],
            )),
        }
    }
}

impl fmt::Debug for HostImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(pages) => f.debug_tuple("Memory").field(pages).finish(),
            Self::IntegerLogger { width, .. } => f
                .debug_struct("IntegerLogger")
                .field("width", width)
                .finish_non_exhaustive(),
            Self::StringLogger { memory, .. } => f
                .debug_struct("StringLogger")
                .field("memory", memory)
                .finish_non_exhaustive(),
        }
    }
}

/// A named entry in an import table.
#[derive(Debug, Clone)]
pub struct ImportEntry {
    /// Import namespace.
    pub module: String,
    /// Import name.
    pub name: String,
    /// What is provided.
    pub import: HostImport,
}

/// The set of imports offered to a module at instantiation.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    entries: Vec<ImportEntry>,
}

impl ImportTable {
    /// A table with no imports, for self-contained modules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `console.log(i32) -> ()` emitting each value to `sink`.
    pub fn integer_logger(sink: impl OutputSink + 'static) -> Self {
        Self::empty().with_integer_logger(IntegerWidth::I32, sink)
    }

    /// `console.log(i64) -> ()` emitting each value to `sink`.
    pub fn integer_logger_i64(sink: impl OutputSink + 'static) -> Self {
        Self::empty().with_integer_logger(IntegerWidth::I64, sink)
    }

    /// A one-page host memory at `js.mem` plus
    /// `console.log(offset: u32, length: u32) -> ()` reading from it.
    ///
    /// A module importing `console.log` from this table must also import
    /// `js.mem`; modules that log from their own memory use
    /// [`string_logger_exported`](Self::string_logger_exported).
    pub fn string_logger(sink: impl OutputSink + 'static) -> Self {
        Self::empty()
            .with_entry(
                JS_MODULE,
                MEMORY_IMPORT,
                HostImport::Memory(MemoryPages::default()),
            )
            .with_entry(
                CONSOLE_MODULE,
                LOG_FUNCTION,
                HostImport::StringLogger {
                    memory: MemorySource::Imported {
                        module: JS_MODULE.to_string(),
                        name: MEMORY_IMPORT.to_string(),
                    },
                    sink: Arc::new(sink),
                },
            )
    }

    /// `console.log(offset: u32, length: u32) -> ()` reading from the
    /// module's own memory export named `export`.
    pub fn string_logger_exported(sink: impl OutputSink + 'static, export: &str) -> Self {
        Self::empty().with_entry(
            CONSOLE_MODULE,
            LOG_FUNCTION,
            HostImport::StringLogger {
                memory: MemorySource::Exported(export.to_string()),
                sink: Arc::new(sink),
            },
        )
    }

    /// Add an integer logger at `console.log`.
    pub fn with_integer_logger(self, width: IntegerWidth, sink: impl OutputSink + 'static) -> Self {
        self.with_entry(
            CONSOLE_MODULE,
            LOG_FUNCTION,
            HostImport::IntegerLogger {
                width,
                sink: Arc::new(sink),
            },
        )
    }

    /// Resize every host-owned memory in the table.
    pub fn with_memory_pages(mut self, initial: u32, maximum: Option<u32>) -> Self {
        for entry in &mut self.entries {
            if let HostImport::Memory(pages) = &mut entry.import {
                *pages = MemoryPages { initial, maximum };
            }
        }
        self
    }

    /// Add or replace the entry at `module.name`.
    pub fn with_entry(
        mut self,
        module: impl Into<String>,
        name: impl Into<String>,
        import: HostImport,
    ) -> Self {
        let module = module.into();
        let name = name.into();
        self.entries
            .retain(|e| !(e.module == module && e.name == name));
        self.entries.push(ImportEntry {
            module,
            name,
            import,
        });
        self
    }

    /// Get the entry at `module.name`.
    pub fn get(&self, module: &str, name: &str) -> Option<&ImportEntry> {
        self.entries
            .iter()
            .find(|e| e.module == module && e.name == name)
    }

    /// All entries, in registration order.
    pub fn entries(&self) -> &[ImportEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Verify that every import `module` declares is satisfied by this table.
    ///
    /// Fails with `Link` naming the first import that is missing or whose
    /// declared type does not match what the table provides. A string
    /// logger backed by a host memory also requires the module to import
    /// that memory; otherwise the logger would read bytes the guest can
    /// never write.
    pub fn check(&self, module_name: &str, module: &Module) -> Result<()> {
        let link_error = |cause: String| HarnessError::Link {
            module: module_name.to_string(),
            cause,
        };

        for import in module.imports() {
            let key = qualified_name(import.module(), import.name());

            let entry = self
                .get(import.module(), import.name())
                .ok_or_else(|| link_error(format!("unknown import `{}`", key)))?;

            let declared = import.ty();
            if !satisfies(&entry.import, &declared) {
                return Err(link_error(format!(
                    "incompatible import type for `{}`: module declares {}, host provides {}",
                    key,
                    extern_kind_of(&declared).describe(),
                    entry.import.kind().describe()
                )));
            }

            if let HostImport::StringLogger {
                memory: MemorySource::Imported { module: mem_module, name: mem_name },
                ..
            } = &entry.import
            {
                let imports_memory = module
                    .imports()
                    .any(|i| i.module() == mem_module.as_str() && i.name() == mem_name.as_str());
                if !imports_memory {
                    return Err(link_error(format!(
                        "`{}` reads host memory `{}`, which the module does not import",
                        key,
                        qualified_name(mem_module, mem_name)
                    )));
                }
            }
        }
        Ok(())
    }

    /// Create this table's host objects in `store` and define them in `linker`.
    pub fn link(&self, linker: &mut Linker<HostState>, store: &mut Store<HostState>) -> Result<()> {
        for entry in &self.entries {
            let (module, name) = (entry.module.as_str(), entry.name.as_str());
            match &entry.import {
                HostImport::Memory(pages) => {
                    let host_error = |e: anyhow::Error| HarnessError::HostFunction {
                        module: module.to_string(),
                        name: name.to_string(),
                        cause: e.to_string(),
                    };
                    let memory =
                        Memory::new(&mut *store, MemoryType::new(pages.initial, pages.maximum))
                            .map_err(host_error)?;
                    linker
                        .define(&*store, module, name, memory)
                        .map_err(host_error)?;
                    store
                        .data_mut()
                        .insert_memory(qualified_name(module, name), memory);
                }
                HostImport::IntegerLogger {
                    width: IntegerWidth::I32,
                    sink,
                } => register_integer_logger_i32(linker, module, name, Arc::clone(sink))?,
                HostImport::IntegerLogger {
                    width: IntegerWidth::I64,
                    sink,
                } => register_integer_logger_i64(linker, module, name, Arc::clone(sink))?,
                HostImport::StringLogger { memory, sink } => {
                    register_string_logger(linker, module, name, memory.clone(), Arc::clone(sink))?
                }
            }
            tracing::trace!(import = %qualified_name(module, name), "Linked host import");
        }
        Ok(())
    }
}

/// Check a host entry against the type a module declares for it.
fn satisfies(import: &HostImport, declared: &ExternType) -> bool {
    match (import, declared) {
        (HostImport::Memory(pages), ExternType::Memory(ty)) => {
            if ty.is_64() || ty.is_shared() {
                return false;
            }
            if u64::from(pages.initial) < ty.minimum() {
                return false;
            }
            match (ty.maximum(), pages.maximum) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(declared_max), Some(max)) => u64::from(max) <= declared_max,
            }
        }
        (
            HostImport::IntegerLogger { .. } | HostImport::StringLogger { .. },
            ExternType::Func(ty),
        ) => match (import.kind(), signature_of(ty)) {
            (ExternKind::Function(provided), Some(declared)) => provided == declared,
            _ => false,
        },
        _ => false,
    }
}
