//! Process-wide logging sink.
//!
//! Log lines fan out to standard output and/or a dated file under
//! `logs/`, behind the usual `tracing` facade with an `RUST_LOG`
//! environment filter (default `info`).

use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Directory log files are written to.
pub const LOG_DIRECTORY: &str = "logs";

#[derive(Clone)]
struct LogSink {
    stdout: bool,
    file: Option<Arc<Mutex<File>>>,
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.stdout {
            io::stdout().write_all(buf)?;
        }
        if let Some(file) = &self.file {
            file.lock().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.stdout {
            io::stdout().flush()?;
        }
        if let Some(file) = &self.file {
            file.lock().flush()?;
        }
        Ok(())
    }
}

/// Installs the global subscriber. Safe to call more than once; later
/// calls leave the first subscriber in place.
pub fn init(stdout_logging: bool, file_logging: bool) -> io::Result<()> {
    let file = if file_logging {
        std::fs::create_dir_all(LOG_DIRECTORY)?;
        let name = format!(
            "{}/relay_{}.log",
            LOG_DIRECTORY,
            chrono::Local::now().format("%d_%m_%Y_%H-%M")
        );
        Some(Arc::new(Mutex::new(File::create(name)?)))
    } else {
        None
    };
    let sink = LogSink {
        stdout: stdout_logging,
        file,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .try_init();
    Ok(())
}

/// Names of all log files written so far, sorted.
pub fn log_list() -> Vec<String> {
    let mut names = Vec::new();
    if let Ok(entries) = std::fs::read_dir(LOG_DIRECTORY) {
        for entry in entries.flatten() {
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    names
}

/// Reads a log file by name. Names containing path separators are
/// rejected so callers cannot escape the log directory.
pub fn read_log(name: &str) -> io::Result<String> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "log name must not contain path separators",
        ));
    }
    std::fs::read_to_string(format!("{LOG_DIRECTORY}/{name}"))
}
