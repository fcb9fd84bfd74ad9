//! Record persistence.
//!
//! [`JsonFileSink`] writes the record as pretty-printed JSON (field order
//! kept, non-ASCII text kept as-is) through a uniquely named sibling temp
//! file that is renamed over the destination, so readers only ever see the
//! previous file or the complete new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::models::Record;
use crate::traits::RecordSink;

#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    echo: bool,
}

impl JsonFileSink {
    /// A sink writing to `path` that also prints the record to stdout.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo: true,
        }
    }

    /// Only log the record; don't print it to stdout.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort mirror of the record to the observation stream.
    fn mirror(&self, json: &str) {
        tracing::info!(path = %self.path.display(), "Extracted record:\n{json}");
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = writeln!(stdout, "{json}") {
                tracing::warn!("Failed to echo record to stdout: {e}");
            }
        }
    }

    /// Write `json` to a uniquely named sibling temp file, then rename it
    /// over the destination. The temp file is removed on any failure.
    fn persist(&self, json: &str) -> Result<(), AppError> {
        let sink_write = |reason: String| AppError::SinkWrite {
            path: self.path.clone(),
            reason,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "record".to_string());

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{file_name}."))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| sink_write(e.to_string()))?;

        write_synced(tmp.as_file_mut(), json.as_bytes()).map_err(|e| sink_write(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| sink_write(e.error.to_string()))?;
        Ok(())
    }
}

fn write_synced(file: &mut fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()
}

impl RecordSink for JsonFileSink {
    fn write(&self, record: &Record) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(record)?;
        self.mirror(&json);
        self.persist(&json)?;
        tracing::info!("Record saved to {}", self.path.display());
        Ok(())
    }
}
