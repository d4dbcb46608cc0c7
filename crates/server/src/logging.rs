//! Rolling JSON log files, split by severity.
//!
//! Events below `ERROR` go to `info.<period>.json` and `ERROR` events go to
//! `error.<period>.json`, both under `LOG_PATH`. Files roll over on the
//! configured schedule and only the newest `LOG_MAX_FILES` of each are kept.

use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::config::{LogFiles, LogRotation};

/// File name prefix for events below `ERROR`.
pub const INFO_FILE: &str = "info";
/// File name prefix for `ERROR` events.
pub const ERROR_FILE: &str = "error";

/// Keeps the background writers flushing; drop only at shutdown.
#[must_use = "log files stop being written when the guards are dropped"]
pub struct FileGuards {
    _info: WorkerGuard,
    _error: WorkerGuard,
}

// Spans pass both filters so every file keeps request context.
fn below_error(meta: &Metadata<'_>) -> bool {
    meta.is_span() || *meta.level() > Level::ERROR
}

fn error_only(meta: &Metadata<'_>) -> bool {
    meta.is_span() || *meta.level() == Level::ERROR
}

const fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Open one rolling `<name>.<period>.json` file in `files.dir`.
///
/// # Errors
///
/// Returns [`InitError`] if the directory cannot be created or the file
/// cannot be opened.
pub fn rolling_file(files: &LogFiles, name: &str) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(rotation(files.rotation))
        .filename_prefix(name)
        .filename_suffix("json")
        .max_log_files(files.max_files)
        .build(&files.dir)
}

/// Two JSON layers: everything below `ERROR` to `info`, `ERROR` to `error`.
pub fn split_by_level<S, I, E>(info: I, error: E) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    I: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    E: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let info = fmt::layer()
        .json()
        .flatten_event(true)
        .with_ansi(false)
        .with_writer(info)
        .with_filter(filter_fn(below_error));
    let error = fmt::layer()
        .json()
        .flatten_event(true)
        .with_ansi(false)
        .with_writer(error)
        .with_filter(filter_fn(error_only));
    info.and_then(error)
}

/// Open both files behind non-blocking writers and build the layer.
///
/// # Errors
///
/// Returns [`InitError`] if either file cannot be opened.
pub fn file_layer<S>(
    files: &LogFiles,
) -> Result<(impl Layer<S> + Send + Sync, FileGuards), InitError>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let (info, info_guard) = tracing_appender::non_blocking(rolling_file(files, INFO_FILE)?);
    let (error, error_guard) = tracing_appender::non_blocking(rolling_file(files, ERROR_FILE)?);

    Ok((
        split_by_level(info, error),
        FileGuards {
            _info: info_guard,
            _error: error_guard,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<serde_json::Value> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    #[test]
    fn test_events_split_by_level() {
        let info = Captured::default();
        let error = Captured::default();
        let (info_writer, error_writer) = (info.clone(), error.clone());
        let subscriber = tracing_subscriber::registry().with(split_by_level(
            move || info_writer.clone(),
            move || error_writer.clone(),
        ));

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("http_request", request_id = "req-9");
            let _entered = span.enter();
            tracing::info!(count = 3, "user count");
            tracing::warn!("slow store");
            tracing::error!(error_code = "ER500", "response error");
        });

        let info = info.lines();
        let error = error.lines();
        assert_eq!(info.len(), 2);
        assert_eq!(info[0]["level"], "INFO");
        assert_eq!(info[0]["count"], 3);
        assert_eq!(info[1]["level"], "WARN");

        assert_eq!(error.len(), 1);
        assert_eq!(error[0]["level"], "ERROR");
        assert_eq!(error[0]["error_code"], "ER500");
        assert_eq!(error[0]["span"]["request_id"], "req-9");
    }

    #[test]
    fn test_rolling_file_created_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let files = LogFiles {
            dir: dir.path().join("nested"),
            rotation: LogRotation::Daily,
            max_files: 3,
        };

        let mut appender = rolling_file(&files, INFO_FILE).unwrap();
        appender.write_all(b"{\"message\":\"hello\"}\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(&files.dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("info."));
        assert!(names[0].ends_with(".json"));
    }
}
