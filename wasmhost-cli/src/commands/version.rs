//! Version command - show version information.

use anyhow::Result;

/// Version information.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command.
pub fn run() -> Result<()> {
    println!("wasmhost - WebAssembly host harness");
    println!();
    println!("Version:     {}", VERSION);
    println!(
        "Platform:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!();
    println!("Components:");
    println!("  wasmhost-core      Values, signatures, output sinks, errors");
    println!("  wasmhost-executor  Wasmtime loader, import tables, invoker");
    println!("  wasmhost-cli       Command-line interface");
    println!();
    println!("Host imports:");
    println!("  console.log  (i32) | (i64) | (offset: u32, length: u32)");
    println!("  js.mem       memory, 1 page");

    Ok(())
}
