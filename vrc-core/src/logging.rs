//! Tracing setup shared by the CLI and by programs embedding the client.
//!
//! Human-readable output goes to stderr so event lines on stdout stay
//! pipeable. A daily-rotated file in the log directory receives the same
//! events, optionally as JSON. The WebSocket, TLS, and HTTP crates are
//! capped at `warn` unless the configured level names them explicitly.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{VrcError, VrcResult};

/// File name prefix for the rotated log files.
const LOG_FILE_PREFIX: &str = "vrchat.log";

/// Dependencies that are noisy at debug level.
const CAPPED_TARGETS: &[&str] = &[
    "tungstenite",
    "tokio_tungstenite",
    "rustls",
    "hyper",
    "hyper_util",
    "reqwest",
];

/// Everything [`init_logging`] needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Level or filter directive, e.g. `info` or `info,vrc_socket=trace`.
    pub level: String,
    pub dir: PathBuf,
    pub json: bool,
    /// Force `debug` regardless of `level`.
    pub verbose: bool,
}

impl LogOptions {
    pub fn from_config(config: &LoggingConfig, dir: PathBuf) -> Self {
        Self {
            level: config.level.clone(),
            dir,
            json: config.json_output,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The filter directive that gets installed.
    pub fn directive(&self) -> String {
        let requested = if self.verbose { "debug" } else { self.level.trim() };
        let base = if requested.is_empty() || EnvFilter::try_new(requested).is_err() {
            "info"
        } else {
            requested
        };

        let named: Vec<&str> = base
            .split(',')
            .filter_map(|part| part.split_once('=').map(|(target, _)| target.trim()))
            .collect();
        let mut directive = base.to_string();
        for target in CAPPED_TARGETS.iter().filter(|t| !named.contains(t)) {
            directive.push_str(&format!(",{target}=warn"));
        }
        directive
    }
}

/// Keeps the background file writer alive; dropping it flushes the log.
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(options: &LogOptions) -> VrcResult<LogGuard> {
    std::fs::create_dir_all(&options.dir)?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&options.dir, LOG_FILE_PREFIX));
    let directive = options.directive();

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();
    let (json_file, text_file) = if options.json {
        let layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(false)
            .with_thread_ids(true);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(&directive))
        .with(console)
        .with(json_file)
        .with(text_file)
        .try_init()
        .map_err(|e| VrcError::Internal(format!("logging init: {e}")))?;

    tracing::debug!("logging to {} with {directive}", options.dir.display());
    Ok(LogGuard { _guard: guard })
}
