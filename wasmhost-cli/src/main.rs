//! wasmhost CLI - Command-line runner for WebAssembly modules.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::run::{ImportsArg, RunOptions};
use std::path::PathBuf;
use wasmhost_executor::observability::{TracingConfigBuilder, TracingGuard, init_tracing};

/// wasmhost - Load WebAssembly modules, supply logging imports, invoke exports.
#[derive(Parser)]
#[command(name = "wasmhost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory searched for `<name>.wasm` when a module path does not exist
    #[arg(long, default_value = commands::DEFAULT_BUILD_DIR, global = true)]
    build_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a module and invoke one of its exports
    Run {
        /// Path to a .wasm file, or a module name in the build directory
        module: String,

        /// Import table to link against
        #[arg(short, long, value_enum, default_value_t = ImportsArg::None)]
        imports: ImportsArg,

        /// Export to invoke
        #[arg(long, default_value = "main")]
        invoke: String,

        /// Arguments, parsed against the export's parameter types
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,

        /// Print a JSON report instead of raw output
        #[arg(long)]
        json: bool,

        /// Limit execution to this much fuel
        #[arg(long)]
        fuel: Option<u64>,
    },

    /// Show a module's imports and exports
    Inspect {
        /// Path to a .wasm file, or a module name in the build directory
        module: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check that a module compiles
    Validate {
        /// Path to a .wasm file, or a module name in the build directory
        module: String,
    },

    /// Show version information
    Version,
}

/// Environment settings first, then `-v` on top.
fn setup_logging(verbosity: u8) -> Result<TracingGuard> {
    init_tracing(TracingConfigBuilder::from_env().verbosity(verbosity).build())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            module,
            imports,
            invoke,
            args,
            json,
            fuel,
        } => commands::run::run(
            &module,
            &cli.build_dir,
            &RunOptions {
                imports,
                export: invoke,
                args,
                fuel,
            },
            json,
        ),
        Commands::Inspect { module, json } => commands::inspect::run(&module, &cli.build_dir, json),
        Commands::Validate { module } => commands::validate::run(&module, &cli.build_dir),
        Commands::Version => commands::version::run(),
    }
}
