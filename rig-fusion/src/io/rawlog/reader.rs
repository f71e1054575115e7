//! Sequential rawlog reader.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::error::{RawlogError, Result};
use super::types::{HEADER_SIZE, MAX_RECORD_SIZE, RawlogHeader, StreamRecord};

/// Reads records in file order.
///
/// # Example
///
/// ```ignore
/// use rig_fusion::io::rawlog::RawlogReader;
///
/// let reader = RawlogReader::open("run.rawlog")?;
/// for record in reader {
///     println!("Record at {} us", record?.timestamp_us());
/// }
/// ```
pub struct RawlogReader {
    reader: BufReader<File>,
    header: RawlogHeader,
    records_read: u64,
}

impl RawlogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut header_buffer = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header_buffer).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                RawlogError::InvalidFormat("file shorter than header".to_string())
            } else {
                RawlogError::Io(e)
            }
        })?;

        let header: RawlogHeader = postcard::from_bytes(&header_buffer)
            .map_err(|e| RawlogError::InvalidFormat(format!("bad header: {}", e)))?;
        if !header.is_valid() {
            return Err(RawlogError::InvalidFormat(
                "missing RLOG magic bytes".to_string(),
            ));
        }

        Ok(Self {
            reader,
            header,
            records_read: 0,
        })
    }

    pub fn header(&self) -> &RawlogHeader {
        &self.header
    }

    pub fn record_count(&self) -> u64 {
        self.header.record_count
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Read the next record, `None` at end of file.
    pub fn next_record(&mut self) -> Result<Option<StreamRecord>> {
        let mut len_bytes = [0u8; 4];
        let mut filled = 0;
        while filled < len_bytes.len() {
            match self.reader.read(&mut len_bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        match filled {
            0 => return Ok(None),
            4 => {}
            n => {
                return Err(RawlogError::InvalidFormat(format!(
                    "truncated length prefix ({} of 4 bytes) after {} records",
                    n, self.records_read
                )));
            }
        }

        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_RECORD_SIZE {
            return Err(RawlogError::InvalidFormat(format!(
                "record too large: {} bytes",
                len
            )));
        }

        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                RawlogError::InvalidFormat(format!(
                    "truncated record after {} records",
                    self.records_read
                ))
            } else {
                RawlogError::Io(e)
            }
        })?;

        let record: StreamRecord = postcard::from_bytes(&payload)?;
        self.records_read += 1;
        Ok(Some(record))
    }
}

impl Iterator for RawlogReader {
    type Item = Result<StreamRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
