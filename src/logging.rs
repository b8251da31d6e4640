use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{warn, Dispatch};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Where the run's log lines end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    File(PathBuf),
}

/// Subscriber for one run. Nothing is installed globally; callers attach
/// `dispatch` to the futures that should log through it.
pub struct RunLog {
    pub dispatch: Dispatch,
    pub sink: LogSink,
}

/// Build the run's subscriber. With a log path the file is opened for append
/// (created if missing); if that fails the run logs to stdout instead and the
/// failure is reported there.
pub fn build(log_path: Option<&Path>) -> RunLog {
    build_with_console(log_path, std::io::stdout)
}

/// Same as [`build`] with `console` standing in for stdout.
pub fn build_with_console<W>(log_path: Option<&Path>, console: W) -> RunLog
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let Some(path) = log_path else {
        return RunLog {
            dispatch: console_dispatch(console),
            sink: LogSink::Stdout,
        };
    };

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => RunLog {
            dispatch: file_dispatch(file),
            sink: LogSink::File(path.to_path_buf()),
        },
        Err(e) => {
            let dispatch = console_dispatch(console);
            tracing::dispatcher::with_default(&dispatch, || {
                warn!(
                    "Failed to open log file {:?}: {}, logging to stdout",
                    path, e
                );
            });
            RunLog {
                dispatch,
                sink: LogSink::Stdout,
            }
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn console_dispatch<W>(console: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    Dispatch::new(
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(console)
            .finish(),
    )
}

fn file_dispatch(file: File) -> Dispatch {
    Dispatch::new(
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish(),
    )
}


#[cfg(test)]
mod tests {
    use super::capture::SharedBuffer;
    use super::*;
    use tracing::info;

    #[test]
    fn test_no_path_logs_to_stdout() {
        let log = build(None);
        assert_eq!(log.sink, LogSink::Stdout);
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        std::fs::write(&path, "earlier run\n").unwrap();

        let log = build(Some(&path));
        assert_eq!(log.sink, LogSink::File(path.clone()));

        tracing::dispatcher::with_default(&log.dispatch, || {
            info!("Worker 1 finished job 1");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("earlier run\n"));
        assert!(content.contains("Worker 1 finished job 1"));
    }

    #[test]
    fn test_unwritable_path_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("run.log");
        let console = SharedBuffer::default();

        let log = build_with_console(Some(&path), console.clone());
        assert_eq!(log.sink, LogSink::Stdout);
        assert!(!path.exists());

        let output = console.contents();
        assert!(output.contains("Failed to open log file"));
        assert!(output.contains("run.log"));

        tracing::dispatcher::with_default(&log.dispatch, || {
            info!("still logging");
        });
        assert!(console.contents().contains("still logging"));
    }
}
