use std::io;
use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const STDERR_FILTER: &str = "warn,catalog=info,classify=info,normalize=info";
const FILE_FILTER: &str = "info,classify=debug,normalize=debug";

/// Install the global subscriber: human-readable stderr output (overridable with `RUST_LOG`)
/// plus a daily rolling file under `log_dir`. Stdout is left free for command output.
pub fn configure_logging(log_dir: &Path) {
    let stderr_log = fmt::layer().with_writer(io::stderr).with_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDERR_FILTER)),
    );

    let file_appender = rolling::daily(log_dir, "specharvest.log");
    let file_log = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::Registry::default()
        .with(stderr_log)
        .with(file_log)
        .init();
}
