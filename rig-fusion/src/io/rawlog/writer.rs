//! Rawlog writer with all-or-nothing output.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::Result;
use super::types::{HEADER_SIZE, RawlogHeader, RawlogInfo, StreamRecord};

/// Writes records to `<path>.partial` and renames it to `path` on
/// [`finish`](Self::finish).
///
/// A writer dropped before `finish` (including on an error path) deletes
/// the partial file, so the destination either holds a complete stream or
/// is left untouched.
///
/// # Example
///
/// ```ignore
/// use rig_fusion::io::rawlog::RawlogWriter;
///
/// let mut writer = RawlogWriter::create("run_located.rawlog")?;
/// for record in &records {
///     writer.write_record(record)?;
/// }
/// let info = writer.finish()?;
/// println!("Wrote {} records", info.record_count);
/// ```
pub struct RawlogWriter {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    partial_path: PathBuf,
    flags: u16,
    record_count: u64,
    scan_count: u64,
    range_count: u64,
    start_time_us: Option<u64>,
    end_time_us: u64,
}

impl RawlogWriter {
    /// Create a writer whose output will appear at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut partial: OsString = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial_path = PathBuf::from(partial);

        let file = File::create(&partial_path)?;
        let mut writer = BufWriter::new(file);
        // Reserve space for the header
        writer.write_all(&[0u8; HEADER_SIZE])?;

        Ok(Self {
            writer: Some(writer),
            path,
            partial_path,
            flags: 0,
            record_count: 0,
            scan_count: 0,
            range_count: 0,
            start_time_us: None,
            end_time_us: 0,
        })
    }

    /// Set header flags written by `finish`.
    pub fn set_flags(&mut self, flags: u16) {
        self.flags = flags;
    }

    pub fn write_record(&mut self, record: &StreamRecord) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let timestamp = record.timestamp_us();
        if self.start_time_us.is_none() {
            self.start_time_us = Some(timestamp);
        }
        self.end_time_us = self.end_time_us.max(timestamp);

        let bytes = postcard::to_allocvec(record)?;
        writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
        writer.write_all(&bytes)?;

        self.record_count += 1;
        if record.is_scan() {
            self.scan_count += 1;
        } else {
            self.range_count += 1;
        }
        Ok(())
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Write the header, flush, and move the file into place.
    pub fn finish(mut self) -> Result<RawlogInfo> {
        let Some(mut writer) = self.writer.take() else {
            return Err(super::RawlogError::InvalidFormat(
                "writer already finished".to_string(),
            ));
        };

        writer.flush()?;
        let file_size = writer.stream_position()?;
        writer.seek(SeekFrom::Start(0))?;

        let header = RawlogHeader {
            flags: self.flags,
            start_time_us: self.start_time_us.unwrap_or(0),
            end_time_us: self.end_time_us,
            record_count: self.record_count,
            ..RawlogHeader::new()
        };
        let header_bytes = postcard::to_allocvec(&header)?;
        let mut buffer = [0u8; HEADER_SIZE];
        let n = header_bytes.len().min(HEADER_SIZE);
        buffer[..n].copy_from_slice(&header_bytes[..n]);
        writer.write_all(&buffer)?;
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&self.partial_path, &self.path)?;

        Ok(RawlogInfo {
            path: self.path.clone(),
            duration_us: self
                .end_time_us
                .saturating_sub(self.start_time_us.unwrap_or(0)),
            record_count: self.record_count,
            file_size_bytes: file_size,
            scan_count: self.scan_count,
            range_count: self.range_count,
        })
    }
}

impl Drop for RawlogWriter {
    fn drop(&mut self) {
        if self.writer.take().is_some() {
            if let Err(e) = fs::remove_file(&self.partial_path) {
                log::warn!(
                    "Could not remove partial output {}: {}",
                    self.partial_path.display(),
                    e
                );
            }
        }
    }
}
