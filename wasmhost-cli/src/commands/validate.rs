//! Validate command - check that a module compiles.

use anyhow::{Context, Result};
use std::path::Path;
use wasmhost_executor::wasm::WasmRuntime;

use super::resolve_module;

/// Run the validate command.
pub fn run(module: &str, build_dir: &Path) -> Result<()> {
    let path = resolve_module(module, build_dir)?;
    tracing::info!(path = %path.display(), "Validating module");

    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let runtime = WasmRuntime::with_defaults()?;

    match runtime.validate(&bytes) {
        Ok(()) => {
            println!("✓ {} is a valid WebAssembly module", path.display());
            Ok(())
        }
        Err(e) => {
            println!("✗ {} is not valid:", path.display());
            println!("  {}", e);
            anyhow::bail!("Module validation failed");
        }
    }
}
