//! Run command - load a module and invoke an export.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use wasmhost_core::{Emission, HarnessError, RecordingSink, SharedSink, StdoutSink, Value};
use wasmhost_executor::wasm::{DEFAULT_MEMORY_EXPORT, ImportTable, WasmRuntime, WasmRuntimeConfig};

use super::resolve_module;

/// Import table selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportsArg {
    /// No imports.
    #[value(name = "none")]
    None,
    /// `console.log(i32)`.
    #[value(name = "int")]
    Int,
    /// `console.log(i64)`.
    #[value(name = "int64")]
    Int64,
    /// `js.mem` plus `console.log(offset, length)`.
    #[value(name = "string")]
    String,
    /// `console.log(offset, length)` reading the module's exported `memory`.
    #[value(name = "string-exported")]
    StringExported,
}

impl ImportsArg {
    /// Build the import table, sending emissions to `sink`.
    pub fn table(self, sink: SharedSink) -> ImportTable {
        match self {
            Self::None => ImportTable::empty(),
            Self::Int => ImportTable::integer_logger(sink),
            Self::Int64 => ImportTable::integer_logger_i64(sink),
            Self::String => ImportTable::string_logger(sink),
            Self::StringExported => {
                ImportTable::string_logger_exported(sink, DEFAULT_MEMORY_EXPORT)
            }
        }
    }
}

/// What to run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Import table to link against.
    pub imports: ImportsArg,
    /// Export to invoke.
    pub export: String,
    /// Textual arguments.
    pub args: Vec<String>,
    /// Fuel limit, if any.
    pub fuel: Option<u64>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    /// Value returned by the export, if it has a result.
    pub result: Option<Value>,
    /// Fuel left afterwards, when limited.
    pub remaining_fuel: Option<u64>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    module: &'a str,
    export: &'a str,
    emissions: Vec<Emission>,
    #[serde(flatten)]
    outcome: Option<&'a RunOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonError>,
}

#[derive(Serialize)]
struct JsonError {
    code: &'static str,
    message: String,
}

/// Load the module at `path`, link it and invoke the export.
///
/// Guest emissions go to `sink` as they happen.
pub fn execute(
    path: &Path,
    options: &RunOptions,
    sink: SharedSink,
) -> wasmhost_core::Result<RunOutcome> {
    let mut config = WasmRuntimeConfig::from_env().with_cache(false);
    if let Some(fuel) = options.fuel {
        config = config.with_fuel(true, fuel);
    }
    let runtime = WasmRuntime::new(config)?;

    let compiled = runtime.compile_file(path)?;
    let mut instance = runtime.instantiate(&compiled, &options.imports.table(sink))?;

    let signature = instance.signature(&options.export)?;
    let args = signature.parse_args(&options.export, &options.args)?;
    let result = instance.invoke(&options.export, &args)?;

    Ok(RunOutcome {
        result,
        remaining_fuel: instance.remaining_fuel(),
    })
}

/// Run the run command.
pub fn run(module: &str, build_dir: &Path, options: &RunOptions, json: bool) -> Result<()> {
    let path = resolve_module(module, build_dir)?;
    tracing::info!(path = %path.display(), export = %options.export, "Running module");

    if !json {
        let outcome = execute(&path, options, Arc::new(StdoutSink::new()))
            .with_context(|| format!("Failed to run {}", path.display()))?;
        if let Some(value) = outcome.result {
            println!("{}", value);
        }
        return Ok(());
    }

    let recorder = RecordingSink::new();
    let result = execute(&path, options, Arc::new(recorder.clone()));
    let report = JsonReport {
        module,
        export: &options.export,
        emissions: recorder.emissions(),
        outcome: result.as_ref().ok(),
        error: result.as_ref().err().map(|e: &HarnessError| JsonError {
            code: e.code(),
            message: e.to_string(),
        }),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    result
        .map(|_| ())
        .with_context(|| format!("Failed to run {}", path.display()))
}
