//! Guest memory access for host functions.
//!
//! A [`Memory`] is a handle into its store, not a view of the bytes. Every
//! read here goes through `Memory::data` with the caller's current store
//! context, so the slice always reflects the memory's size at the time of
//! the call, including any growth the guest performed since the last one.

use wasmhost_core::{HarnessError, Result};
use wasmtime::{Memory, StoreContext};

/// A string descriptor: a byte range within guest linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WasmPtr {
    /// Offset within guest linear memory.
    pub offset: u32,
    /// Length in bytes.
    pub length: u32,
}

impl WasmPtr {
    /// Create a new descriptor.
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Get the exclusive end offset, widened so it cannot overflow.
    pub const fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }

    /// Check if the range is empty.
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Borrow the bytes at `ptr` from the memory's current backing buffer.
///
/// Fails with `MemoryBounds` if the range extends past the end of memory.
pub fn read_bytes<'a, T: 'a>(
    memory: &Memory,
    store: impl Into<StoreContext<'a, T>>,
    ptr: WasmPtr,
) -> Result<&'a [u8]> {
    let data = memory.data(store);
    let out_of_bounds = || HarnessError::MemoryBounds {
        offset: ptr.offset,
        length: ptr.length,
        memory_size: data.len(),
    };

    if ptr.end() > data.len() as u64 {
        return Err(out_of_bounds());
    }

    data.get(ptr.offset as usize..ptr.end() as usize)
        .ok_or_else(out_of_bounds)
}

/// Read and strictly decode a UTF-8 string at `ptr`.
///
/// Invalid byte sequences fail with `Decode`; nothing is substituted.
pub fn read_string<'a, T: 'a>(
    memory: &Memory,
    store: impl Into<StoreContext<'a, T>>,
    ptr: WasmPtr,
) -> Result<String> {
    let bytes = read_bytes(memory, store, ptr)?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| HarnessError::Decode {
            offset: ptr.offset,
            length: ptr.length,
            cause: e.to_string(),
        })
}
