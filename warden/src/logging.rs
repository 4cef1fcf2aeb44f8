use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};


/// Sets up a console layer and a daily-rolling log file layer, each with its own filter.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// until the program exits.
pub fn initialize_tracing<P>(
    console_level_filter: EnvFilter,
    log_file_level_filter: EnvFilter,
    log_file_output_directory: P,
    log_file_name_prefix: &str,
) -> Result<WorkerGuard>
where
    P: AsRef<Path>,
{
    let rolling_file_appender =
        tracing_appender::rolling::daily(log_file_output_directory, log_file_name_prefix);
    let (non_blocking_file_writer, guard) = tracing_appender::non_blocking(rolling_file_appender);

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_filter(console_level_filter);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file_writer)
        .with_ansi(false)
        .with_filter(log_file_level_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .into_diagnostic()
        .wrap_err("Failed to install the global tracing subscriber.")?;

    Ok(guard)
}
