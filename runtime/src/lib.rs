//! Process-level bootstrap shared by the blogdesk binaries.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling::daily};
use tracing_subscriber::{
    fmt::{layer, writer::MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "blogdesk.log";

/// Logging setup options.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Directory for daily-rolling log files. Console-only when `None`.
    pub log_dir: Option<PathBuf>,
    /// Filter directive used when `RUST_LOG` is unset.
    pub default_filter: Option<String>,
}

impl LogOptions {
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(self.default_filter.as_deref().unwrap_or(DEFAULT_FILTER))
        })
    }
}

/// Installs the global tracing subscriber.
///
/// Console output goes to stderr so stdout stays free for command output.
/// When a log directory is configured the returned guard must be kept alive
/// for the lifetime of the process, or buffered file lines are lost.
pub fn init_logging(options: LogOptions) -> Result<Option<WorkerGuard>> {
    let console = layer().with_writer(std::io::stderr).with_target(false);

    match &options.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let (appender, guard) = non_blocking(daily(dir, LOG_FILE_PREFIX));
            tracing_subscriber::registry()
                .with(options.filter())
                .with(console)
                .with(
                    layer()
                        .with_ansi(false)
                        .with_writer(appender.with_max_level(Level::INFO)),
                )
                .try_init()
                .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
            Ok(Some(guard))
        },
        None => {
            tracing_subscriber::registry()
                .with(options.filter())
                .with(console)
                .try_init()
                .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;
            Ok(None)
        },
    }
}
