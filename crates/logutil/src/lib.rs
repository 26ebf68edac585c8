//! Utilities for logging.

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    HumanReadable,
    Json,
}

fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Install a global subscriber writing to `writer`.
///
/// `RUST_LOG` takes precedence over `default_level`. Only the first call in
/// a process has any effect.
pub fn configure_global_logger<W>(default_level: Level, format: LogFormat, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter(default_level))
        .with_writer(writer);

    let _ = match format {
        LogFormat::HumanReadable => {
            tracing::subscriber::set_global_default(builder.with_target(false).finish())
        }
        LogFormat::Json => tracing::subscriber::set_global_default(
            builder
                .json()
                .with_file(true)
                .with_line_number(true)
                .finish(),
        ),
    };
}

/// Debug-level logging captured by the test harness.
pub fn init_test() {
    let subscriber = FmtSubscriber::builder()
        .with_test_writer()
        .with_env_filter(env_filter(Level::DEBUG))
        .with_file(true)
        .with_line_number(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_configuration_is_ignored() {
        init_test();
        configure_global_logger(Level::ERROR, LogFormat::Json, std::io::stderr);
        tracing::debug!("still logging");
    }
}
