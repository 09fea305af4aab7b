//! Inspect command - show a module's imports and exports.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use wasmhost_executor::wasm::{CompiledModule, WasmRuntime};

use super::resolve_module;

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Entry {
    name: String,
    kind: String,
}

#[derive(Debug, Serialize)]
struct Summary {
    module: String,
    imports: Vec<Entry>,
    exports: Vec<Entry>,
}

fn summarize(compiled: &CompiledModule) -> Summary {
    Summary {
        module: compiled.name().to_string(),
        imports: compiled
            .imports()
            .into_iter()
            .map(|i| Entry {
                name: format!("{}.{}", i.module, i.name),
                kind: i.kind.describe(),
            })
            .collect(),
        exports: compiled
            .exports()
            .into_iter()
            .map(|e| Entry {
                name: e.name,
                kind: e.kind.describe(),
            })
            .collect(),
    }
}

/// Run the inspect command.
pub fn run(module: &str, build_dir: &Path, json: bool) -> Result<()> {
    let path = resolve_module(module, build_dir)?;
    tracing::info!(path = %path.display(), "Inspecting module");

    let runtime = WasmRuntime::with_defaults()?;
    let compiled = runtime
        .compile_file(&path)
        .with_context(|| format!("Failed to compile {}", path.display()))?;
    let summary = summarize(&compiled);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Module: {}", summary.module);
    println!("========{}", "=".repeat(summary.module.len()));
    println!();

    println!("Imports ({}):", summary.imports.len());
    for entry in &summary.imports {
        println!("  {:<24} {}", entry.name, entry.kind);
    }
    println!();

    println!("Exports ({}):", summary.exports.len());
    for entry in &summary.exports {
        println!("  {:<24} {}", entry.name, entry.kind);
    }

    Ok(())
}
