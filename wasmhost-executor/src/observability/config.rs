//! Logging configuration, assembled from defaults, the environment and
//! command-line overrides.

use std::io::IsTerminal;
use std::str::FromStr;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line, colored output for terminals.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format `{}`", other)),
        }
    }
}

/// Settings for [`init_tracing`](super::init_tracing).
#[derive(Debug, Clone)]
pub struct TracingConfig {
    log_format: LogFormat,
    /// `EnvFilter` directives, e.g. `"debug,wasmtime=warn"`.
    log_filter: String,
    include_location: bool,
    include_target: bool,
    include_thread_names: bool,
    include_thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
            include_location: false,
            include_target: true,
            include_thread_names: false,
            include_thread_ids: false,
        }
    }
}

impl TracingConfig {
    pub fn builder() -> TracingConfigBuilder {
        TracingConfigBuilder::default()
    }

    /// Configuration from the process environment alone.
    ///
    /// Shorthand for `TracingConfigBuilder::from_env().build()`.
    pub fn from_env() -> Self {
        TracingConfigBuilder::from_env().build()
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Whether events carry their source file and line.
    pub fn include_location(&self) -> bool {
        self.include_location
    }

    pub fn include_target(&self) -> bool {
        self.include_target
    }

    pub fn include_thread_names(&self) -> bool {
        self.include_thread_names
    }

    pub fn include_thread_ids(&self) -> bool {
        self.include_thread_ids
    }
}

/// Builder for [`TracingConfig`].
///
/// Unset fields fall back to [`TracingConfig::default`] in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct TracingConfigBuilder {
    log_format: Option<LogFormat>,
    log_filter: Option<String>,
    include_location: Option<bool>,
    include_target: Option<bool>,
    include_thread_names: Option<bool>,
    include_thread_ids: Option<bool>,
}

impl TracingConfigBuilder {
    /// Start from the process environment.
    ///
    /// See [`from_lookup`](Self::from_lookup) for the variables read. When
    /// `WASMHOST_LOG_FORMAT` is unset, a terminal on stderr selects
    /// [`LogFormat::Pretty`].
    pub fn from_env() -> Self {
        let builder = Self::from_lookup(|name| std::env::var(name).ok());
        if builder.log_format.is_none() && std::io::stderr().is_terminal() {
            builder.log_format(LogFormat::Pretty)
        } else {
            builder
        }
    }

    /// Start from variables resolved through `lookup`.
    ///
    /// - `WASMHOST_LOG_FORMAT`: `json`, `pretty` or `compact`
    /// - `WASMHOST_LOG_LEVEL`, then `RUST_LOG`: filter directives
    /// - `WASMHOST_LOG_LOCATION`, `WASMHOST_LOG_TARGET`,
    ///   `WASMHOST_LOG_THREAD_NAMES`, `WASMHOST_LOG_THREAD_IDS`: flags
    ///
    /// Only variables that are present and parse are applied. Unparseable
    /// values are ignored with a note on stderr, since no subscriber exists yet.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut builder = Self::default();

        if let Some(raw) = lookup("WASMHOST_LOG_FORMAT") {
            match raw.parse() {
                Ok(format) => builder.log_format = Some(format),
                Err(e) => eprintln!("wasmhost: ignoring WASMHOST_LOG_FORMAT: {}", e),
            }
        }

        builder.log_filter = lookup("WASMHOST_LOG_LEVEL")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|s| !s.trim().is_empty());

        let flag = |name: &str| lookup(name).and_then(|raw| parse_flag(name, &raw));
        builder.include_location = flag("WASMHOST_LOG_LOCATION");
        builder.include_target = flag("WASMHOST_LOG_TARGET");
        builder.include_thread_names = flag("WASMHOST_LOG_THREAD_NAMES");
        builder.include_thread_ids = flag("WASMHOST_LOG_THREAD_IDS");
        builder
    }

    /// Apply a `-v` count.
    ///
    /// Zero keeps a filter taken from the environment and otherwise quiets
    /// output to `warn`. One or more replaces the filter with `info`,
    /// `debug` or `trace`.
    pub fn verbosity(mut self, count: u8) -> Self {
        let level = match count {
            0 if self.log_filter.is_some() => return self,
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        self.log_filter = Some(level.to_string());
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = Some(format);
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    pub fn include_location(mut self, include: bool) -> Self {
        self.include_location = Some(include);
        self
    }

    pub fn include_target(mut self, include: bool) -> Self {
        self.include_target = Some(include);
        self
    }

    pub fn include_thread_names(mut self, include: bool) -> Self {
        self.include_thread_names = Some(include);
        self
    }

    pub fn include_thread_ids(mut self, include: bool) -> Self {
        self.include_thread_ids = Some(include);
        self
    }

    pub fn build(self) -> TracingConfig {
        let defaults = TracingConfig::default();
        TracingConfig {
            log_format: self.log_format.unwrap_or(defaults.log_format),
            log_filter: self.log_filter.unwrap_or(defaults.log_filter),
            include_location: self.include_location.unwrap_or(defaults.include_location),
            include_target: self.include_target.unwrap_or(defaults.include_target),
            include_thread_names: self
                .include_thread_names
                .unwrap_or(defaults.include_thread_names),
            include_thread_ids: self
                .include_thread_ids
                .unwrap_or(defaults.include_thread_ids),
        }
    }
}

impl From<TracingConfig> for TracingConfigBuilder {
    fn from(config: TracingConfig) -> Self {
        Self {
            log_format: Some(config.log_format),
            log_filter: Some(config.log_filter),
            include_location: Some(config.include_location),
            include_target: Some(config.include_target),
            include_thread_names: Some(config.include_thread_names),
            include_thread_ids: Some(config.include_thread_ids),
        }
    }
}

fn parse_flag(name: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        other => {
            eprintln!("wasmhost: ignoring {}={:?}, expected a boolean", name, other);
            None
        }
    }
}
