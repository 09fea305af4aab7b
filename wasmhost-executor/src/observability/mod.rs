//! Logging setup for wasmhost binaries and embedders.
//!
//! Structured logging through `tracing-subscriber`, with the output
//! format selected by `WASMHOST_LOG_FORMAT`:
//! - `json` - Structured JSON output
//! - `pretty` - Human-readable multi-line output (default for a TTY)
//! - `compact` - Compact single-line output
//!
//! Settings layer in order: defaults, then the environment, then explicit
//! builder calls such as a CLI `-v` count.
//!
//! # Example
//!
//! ```ignore
//! use wasmhost_executor::observability::{TracingConfigBuilder, init_tracing};
//!
//! let config = TracingConfigBuilder::from_env().verbosity(args.verbose).build();
//! let _guard = init_tracing(config)?;
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig, TracingConfigBuilder};
pub use tracing_setup::{TracingGuard, init_tracing};
