//! Log Writer
//!
//! Writes PUT/DELETE entries to a new log file in append order.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::{HashlogError, Result};
use crate::varint;

use super::{LogHeader, LOG_HEADER_SIZE, LOG_VERSION, TAG_DELETE, TAG_PUT};

/// Options for a new log
#[derive(Debug, Clone, Copy)]
pub struct LogWriterOptions {
    /// Allow DELETE entries
    pub supports_deletion: bool,
}

impl Default for LogWriterOptions {
    fn default() -> Self {
        Self {
            supports_deletion: true,
        }
    }
}

/// Single-writer appender for a new log file
pub struct LogWriter {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Running statistics, written into the header by `finish()`
    header: LogHeader,
}

impl LogWriter {
    /// Create a new log, truncating any existing file at `path`
    ///
    /// Writes a placeholder header immediately; call `put()`/`delete()`,
    /// then `finish()` to patch in the final header.
    pub fn create(path: impl AsRef<Path>, options: LogWriterOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(&[0u8; LOG_HEADER_SIZE as usize])?;

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            header: LogHeader {
                version: LOG_VERSION,
                created_at,
                supports_deletion: options.supports_deletion,
                ..LogHeader::default()
            },
        })
    }

    /// Append a key/value pair
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(1 + 2 * varint::MAX_VARINT_LEN);
        frame.push(TAG_PUT);
        varint::encode(key.len() as u64, &mut frame);
        varint::encode(value.len() as u64, &mut frame);

        self.writer.write_all(&frame)?;
        self.writer.write_all(key)?;
        self.writer.write_all(value)?;

        self.record(frame.len(), key.len(), value.len());
        Ok(())
    }

    /// Append a deletion marker for `key`
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if !self.header.supports_deletion {
            return Err(HashlogError::usage(format!(
                "{}: log was created without deletion support",
                self.path.display()
            )));
        }

        let mut frame = Vec::with_capacity(1 + varint::MAX_VARINT_LEN);
        frame.push(TAG_DELETE);
        varint::encode(key.len() as u64, &mut frame);

        self.writer.write_all(&frame)?;
        self.writer.write_all(key)?;

        self.record(frame.len(), key.len(), 0);
        Ok(())
    }

    /// Bytes of entry data written so far
    pub fn data_size(&self) -> u64 {
        self.header.data_size
    }

    /// Finish: patch the header with final statistics and sync
    pub fn finish(self) -> Result<LogHeader> {
        let mut file = self.writer.into_inner().map_err(|e| {
            HashlogError::Io(std::io::Error::new(
                e.error().kind(),
                format!("failed to flush log: {}", e.error()),
            ))
        })?;

        file.seek(SeekFrom::Start(0))?;
        file.write_all(&self.header.encode())?;
        file.sync_all()?;

        debug!(
            path = %self.path.display(),
            entries = self.header.max_entry_count,
            data_size = self.header.data_size,
            "finished log"
        );

        Ok(self.header)
    }

    fn record(&mut self, frame_len: usize, key_len: usize, value_len: usize) {
        let h = &mut self.header;
        h.data_size += (frame_len + key_len + value_len) as u64;
        h.max_entry_count += 1;
        h.max_key_len = h.max_key_len.max(key_len as u64);
        h.max_value_len = h.max_value_len.max(value_len as u64);
    }
}
