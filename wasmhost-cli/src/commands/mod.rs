//! CLI command implementations.

pub mod inspect;
pub mod run;
pub mod validate;
pub mod version;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Where the compiler writes its modules.
pub const DEFAULT_BUILD_DIR: &str = "gwe_build";

/// Find the module file for a command-line argument.
///
/// An existing path is used as is. Otherwise the argument is taken as a
/// module name and looked up as `<build_dir>/<name>.wasm`.
pub fn resolve_module(module: &str, build_dir: &Path) -> Result<PathBuf> {
    let path = Path::new(module);
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    let file_name = if path.extension().is_some_and(|ext| ext == "wasm") {
        module.to_string()
    } else {
        format!("{}.wasm", module)
    };
    let candidate = build_dir.join(file_name);
    if candidate.is_file() {
        tracing::debug!(module, path = %candidate.display(), "Resolved module in build directory");
        return Ok(candidate);
    }

    anyhow::bail!(
        "Module not found: {} (also tried {})",
        module,
        candidate.display()
    )
}
