//! Logging initialization.

use crate::cli::LogLevel;
use tracing::Level;
use tracing_subscriber::fmt;

/// Installs the global subscriber.
///
/// Logs go to stderr: stdout may carry the archive itself.
pub fn init_logging(level: LogLevel) {
    let level: Level = level.into();

    let subscriber = fmt::Subscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    subscriber.init();
}
