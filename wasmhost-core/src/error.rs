//! Error types for the wasmhost harness.
//!
//! Every failure a caller of `load` or `invoke` can observe has its own
//! variant so the kind of an error is never lost on the way up. Each
//! variant carries a stable code in its display output.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Classification of a guest trap.
///
/// Mirrors the trap conditions the WebAssembly specification defines,
/// collapsed to the ones a host usually wants to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrapKind {
    /// Out-of-bounds linear memory access.
    MemoryOutOfBounds,
    /// Out-of-bounds table access.
    TableOutOfBounds,
    /// Indirect call through a null entry or with a mismatched signature.
    BadIndirectCall,
    /// Integer division or remainder by zero.
    IntegerDivisionByZero,
    /// Signed integer overflow (e.g. `i32.div_s` of `MIN / -1`).
    IntegerOverflow,
    /// Float to integer conversion out of range or NaN.
    BadConversionToInteger,
    /// An `unreachable` instruction was executed.
    Unreachable,
    /// The call stack was exhausted.
    StackOverflow,
    /// Execution ran out of fuel.
    OutOfFuel,
    /// Any other trap reported by the engine.
    Other,
}

impl fmt::Display for TrapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MemoryOutOfBounds => "out of bounds memory access",
            Self::TableOutOfBounds => "out of bounds table access",
            Self::BadIndirectCall => "bad indirect call",
            Self::IntegerDivisionByZero => "integer divide by zero",
            Self::IntegerOverflow => "integer overflow",
            Self::BadConversionToInteger => "invalid conversion to integer",
            Self::Unreachable => "unreachable",
            Self::StackOverflow => "call stack exhausted",
            Self::OutOfFuel => "all fuel consumed",
            Self::Other => "trap",
        };
        f.write_str(s)
    }
}

/// The main error type for harness operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    // =========================================================================
    // Engine Errors (E001-E099)
    // =========================================================================
    /// The WASM engine could not be created.
    #[error("E001: Failed to create WASM engine: {cause}")]
    Engine {
        /// Reason for the failure.
        cause: String,
    },

    /// A host import could not be registered with the linker.
    #[error("E002: Failed to register host import '{module}.{name}': {cause}")]
    HostFunction {
        /// Import namespace.
        module: String,
        /// Import name.
        name: String,
        /// Reason for the failure.
        cause: String,
    },

    // =========================================================================
    // Load Errors (E100-E199)
    // =========================================================================
    /// The bytes are not a well-formed binary module.
    #[error("E101: Invalid WASM module '{module}': {cause}")]
    Validation {
        /// Module name used for diagnostics.
        module: String,
        /// Reason the module was rejected.
        cause: String,
    },

    /// The module's imports are not satisfied by the import table.
    #[error("E102: Failed to link WASM module '{module}': {cause}")]
    Link {
        /// Module name used for diagnostics.
        module: String,
        /// Which import failed and why.
        cause: String,
    },

    /// The module's start code trapped during instantiation.
    #[error("E103: Failed to instantiate WASM module '{module}': {cause}")]
    Instantiation {
        /// Module name used for diagnostics.
        module: String,
        /// Reason for the failure.
        cause: String,
    },

    // =========================================================================
    // Invocation Errors (E200-E299)
    // =========================================================================
    /// No function export exists with the requested name.
    #[error("E201: Export '{export}' not found")]
    NotFound {
        /// The requested export name.
        export: String,
    },

    /// The supplied arguments do not match the export's signature.
    #[error("E202: Arguments to '{export}' do not match its signature: expected {expected}, got {actual}")]
    ArityOrType {
        /// The export being called.
        export: String,
        /// The declared signature.
        expected: String,
        /// What was supplied.
        actual: String,
    },

    /// The guest trapped while executing an export.
    #[error("E203: WASM trap in '{export}': {kind}: {cause}")]
    Trap {
        /// The export that was running.
        export: String,
        /// Classified trap condition.
        kind: TrapKind,
        /// Engine-provided detail, including the guest backtrace when available.
        cause: String,
    },

    // =========================================================================
    // Host Function Errors (E300-E399)
    // =========================================================================
    /// A string descriptor points outside the current guest memory.
    #[error(
        "E301: Memory access out of bounds: offset {offset} + length {length} exceeds memory size {memory_size}"
    )]
    MemoryBounds {
        /// Start offset requested by the guest.
        offset: u32,
        /// Number of bytes requested.
        length: u32,
        /// Memory size in bytes at the time of the call.
        memory_size: usize,
    },

    /// The bytes at a string descriptor are not valid UTF-8.
    #[error("E302: Invalid UTF-8 at offset {offset} (length {length}): {cause}")]
    Decode {
        /// Start offset of the string.
        offset: u32,
        /// Length of the string in bytes.
        length: u32,
        /// Decoder detail.
        cause: String,
    },

    /// The guest memory the host function needs is not available.
    #[error("E303: Guest memory '{name}' is not available")]
    MemoryUnavailable {
        /// Import or export name of the memory.
        name: String,
    },

    // =========================================================================
    // I/O Errors (E900-E999)
    // =========================================================================
    /// Reading a module from disk failed.
    #[error("E901: Failed to read module at {path}: {cause}")]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// Reason for the failure.
        cause: String,
    },
}

impl HarnessError {
    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Engine { .. } => "E001",
            Self::HostFunction { .. } => "E002",
            Self::Validation { .. } => "E101",
            Self::Link { .. } => "E102",
            Self::Instantiation { .. } => "E103",
            Self::NotFound { .. } => "E201",
            Self::ArityOrType { .. } => "E202",
            Self::Trap { .. } => "E203",
            Self::MemoryBounds { .. } => "E301",
            Self::Decode { .. } => "E302",
            Self::MemoryUnavailable { .. } => "E303",
            Self::Io { .. } => "E901",
        }
    }

    /// Check if this error was raised while turning bytes into an instance.
    #[must_use]
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Link { .. } | Self::Instantiation { .. }
        )
    }

    /// Check if this error was caused by the guest misbehaving at runtime,
    /// either by trapping or by handing a host function a bad descriptor.
    #[must_use]
    pub fn is_guest_fault(&self) -> bool {
        matches!(
            self,
            Self::Trap { .. }
                | Self::MemoryBounds { .. }
                | Self::Decode { .. }
                | Self::MemoryUnavailable { .. }
        )
    }

    /// Get the trap kind, if this is a trap.
    pub fn trap_kind(&self) -> Option<TrapKind> {
        match self {
            Self::Trap { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Result type alias using `HarnessError`.
pub type Result<T> = std::result::Result<T, HarnessError>;
