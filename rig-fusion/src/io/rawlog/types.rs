//! Record and header types for the rawlog stream format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::types::{ScanRecord, SensorFrame};

/// Magic bytes at start of a rawlog file.
pub const RAWLOG_MAGIC: [u8; 4] = *b"RLOG";

/// Current rawlog format version.
pub const RAWLOG_VERSION: u16 = 1;

/// Size of the rawlog header in bytes.
pub const HEADER_SIZE: usize = 64;

/// Flag set on files written by the fusion pipeline (frames carry poses).
pub const FLAG_LOCALIZED: u16 = 0x01;

/// Largest record accepted when reading (64 MB).
pub const MAX_RECORD_SIZE: usize = 64 * 1024 * 1024;

/// Rawlog header (64 bytes fixed size).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawlogHeader {
    /// Magic bytes: "RLOG"
    pub magic: [u8; 4],
    pub version: u16,
    pub flags: u16,
    /// Timestamp of first record (microseconds)
    pub start_time_us: u64,
    /// Timestamp of last record (microseconds)
    pub end_time_us: u64,
    pub record_count: u64,
    pub reserved: [u8; 16],
}

impl RawlogHeader {
    pub fn new() -> Self {
        Self {
            magic: RAWLOG_MAGIC,
            version: RAWLOG_VERSION,
            flags: 0,
            start_time_us: 0,
            end_time_us: 0,
            record_count: 0,
            reserved: [0; 16],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == RAWLOG_MAGIC
    }

    pub fn is_localized(&self) -> bool {
        self.flags & FLAG_LOCALIZED != 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.end_time_us.saturating_sub(self.start_time_us) as f64 / 1_000_000.0
    }
}

impl Default for RawlogHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Records stored in a rawlog, in capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamRecord {
    /// Planar scanner sweep
    Scan2D(ScanRecord),
    /// 3D range/intensity capture
    Range3D(SensorFrame),
}

impl StreamRecord {
    pub fn timestamp_us(&self) -> u64 {
        match self {
            StreamRecord::Scan2D(r) => r.timestamp_us,
            StreamRecord::Range3D(f) => f.timestamp_us,
        }
    }

    /// Label of the sensor that produced this record.
    pub fn sensor(&self) -> &str {
        match self {
            StreamRecord::Scan2D(r) => &r.sensor,
            StreamRecord::Range3D(f) => &f.sensor,
        }
    }

    pub fn is_scan(&self) -> bool {
        matches!(self, StreamRecord::Scan2D(_))
    }

    pub fn is_range(&self) -> bool {
        matches!(self, StreamRecord::Range3D(_))
    }

    pub fn as_scan(&self) -> Option<&ScanRecord> {
        match self {
            StreamRecord::Scan2D(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&SensorFrame> {
        match self {
            StreamRecord::Range3D(f) => Some(f),
            _ => None,
        }
    }
}

/// Summary of a rawlog file.
#[derive(Debug, Clone)]
pub struct RawlogInfo {
    pub path: PathBuf,
    pub duration_us: u64,
    pub record_count: u64,
    pub file_size_bytes: u64,
    pub scan_count: u64,
    pub range_count: u64,
}

impl RawlogInfo {
    pub fn duration_secs(&self) -> f64 {
        self.duration_us as f64 / 1_000_000.0
    }
}
