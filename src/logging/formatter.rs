use std::{io, path::Path};

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    registry::LookupSpan,
    Layer,
};

use super::config::LogFormat;

pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Console layer in the requested layout, writing to stderr so command output
/// on stdout stays clean.
pub fn console_layer<S>(format: LogFormat) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let writer: fn() -> io::Stderr = io::stderr;
    match format {
        LogFormat::Json => fmt::layer()
            .event_format(fmt::format().json().with_current_span(true))
            .with_writer(writer)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .event_format(fmt::format().pretty())
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(writer)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .event_format(fmt::format().compact())
            .with_writer(writer)
            .with_target(true)
            .boxed(),
    }
}

/// Daily-rolling file sink. Events are written by a background worker that
/// flushes when the returned guard is dropped.
pub fn file_layer<S>(
    dir: &Path,
    file_name: &str,
) -> (BoxedLayer<S>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = rolling::daily(dir, file_name);
    let (writer, guard) = non_blocking(appender);
    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer)
        .boxed();
    (layer, guard)
}
