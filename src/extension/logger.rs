//! File-backed request logger.
//!
//! Entries go to an append-only file as `[LABEL] message` lines and are
//! mirrored into `tracing`. All writes take one mutex, so concurrent
//! requests never interleave partial lines.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::ConnectionExtension;
use crate::connection::Connection;
use crate::error::ConfigError;

/// Level used by [`Logger::log`].
pub const DEFAULT_LEVEL: u8 = 1;

#[derive(Debug)]
struct Sink {
    file: BufWriter<File>,
    counts: HashMap<u8, u64>,
}

/// Appends entries to a file shared by every request.
///
/// Writes are blocking file I/O on the calling task's worker thread. Each
/// entry is buffered and flushed as one write, so a call costs a single
/// syscall under the lock; keep a slow or remote disk out of `log_file`.
#[derive(Debug)]
pub struct Logger {
    path: PathBuf,
    sink: Mutex<Sink>,
}

impl Logger {
    /// Opens `path` for appending, creating it and its parent directories.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source| ConfigError::SinkUnavailable {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(unavailable)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(unavailable)?;

        Ok(Self {
            path,
            sink: Mutex::new(Sink {
                file: BufWriter::new(file),
                counts: HashMap::new(),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self, message: &str) {
        self.log_at(DEFAULT_LEVEL, message);
    }

    /// 1 = info, 2 = warn, 3 = error, anything else = debug.
    pub fn log_at(&self, level: u8, message: &str) {
        let label = label(level);
        match level {
            1 => tracing::info!(target: "weft::logger", "{message}"),
            2 => tracing::warn!(target: "weft::logger", "{message}"),
            3 => tracing::error!(target: "weft::logger", "{message}"),
            _ => tracing::debug!(target: "weft::logger", "{message}"),
        }

        let mut sink = self.sink.lock();
        *sink.counts.entry(level).or_insert(0) += 1;
        let written = writeln!(sink.file, "[{label}] {message}").and_then(|_| sink.file.flush());
        if let Err(e) = written {
            tracing::error!(path = %self.path.display(), error = %e, "log write failed");
        }
    }

    /// Logs `message` and also prints it in the client's browser console.
    pub fn log_to_client(&self, conn: &mut Connection, message: &str) {
        self.log(message);
        let literal = serde_json::to_string(message)
            .unwrap_or_else(|_| "\"\"".to_string())
            .replace("</", "<\\/");
        conn.write(&format!("<script>console.log({literal});</script>"));
    }

    /// Entries written at `level` since the logger was opened.
    pub fn count(&self, level: u8) -> u64 {
        self.sink.lock().counts.get(&level).copied().unwrap_or(0)
    }
}

impl ConnectionExtension for Logger {}

fn label(level: u8) -> &'static str {
    match level {
        1 => "INFO",
        2 => "WARN",
        3 => "ERROR",
        _ => "DEBUG",
    }
}
