use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "zsearch.log";

/// Keeps the file writer alive; dropping it flushes pending records.
pub struct LoggingGuard {
    _flush: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

fn resolve_log_dir() -> Option<PathBuf> {
    if let Ok(dir) = zsearch::kernel::services::adapters::ensure_log_dir() {
        return Some(dir);
    }
    let fallback = std::env::temp_dir().join("zsearch").join("logs");
    std::fs::create_dir_all(&fallback).ok()?;
    Some(fallback)
}

/// Search results own stdout, so logs go to a daily file. `verbose` also
/// mirrors them to stderr. `RUST_LOG` replaces the default filter.
pub fn init(verbose: bool) -> Option<LoggingGuard> {
    let log_dir = resolve_log_dir()?;
    let (file_writer, flush) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "zsearch=debug" } else { "zsearch=info" })
    });

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_thread_names(true)
        .with_line_number(true);
    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .ok()?;

    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "zsearch panicked");
    }));
    tracing::debug!(log_dir = %log_dir.display(), "logging to file");

    Some(LoggingGuard {
        _flush: flush,
        log_dir,
    })
}
