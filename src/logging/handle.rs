use tracing_appender::non_blocking::WorkerGuard;

/// Keeps the file sink's background writer alive.
///
/// Dropping the handle flushes buffered file output, so hold it until the
/// program is about to exit.
#[derive(Debug)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self { file_guard }
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Flushes and closes the file sink.
    pub fn shutdown(mut self) {
        if let Some(guard) = self.file_guard.take() {
            tracing::debug!("Flushing file log sink");
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_without_file_sink() {
        let handle = LoggingHandle::new(None);
        assert!(!handle.has_file_sink());
        handle.shutdown();
    }

    #[test]
    fn test_shutdown_flushes_file_sink() {
        let tmp = tempfile::tempdir().unwrap();
        let appender = tracing_appender::rolling::never(tmp.path(), "test.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let handle = LoggingHandle::new(Some(guard));
        assert!(handle.has_file_sink());

        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(writer)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("walk finished");
        });
        handle.shutdown();

        let written = std::fs::read_to_string(tmp.path().join("test.log")).unwrap();
        assert!(written.contains("walk finished"));
    }
}
