//! Rawlog: the recorded sensor stream consumed and produced by the pipeline.
//!
//! # File Format
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Header (64 bytes)                                │
//! │ - Magic: "RLOG" (4 bytes)                        │
//! │ - Version: u16                                   │
//! │ - Flags: u16 (0x01 = localized)                  │
//! │ - Start time: u64 (microseconds)                 │
//! │ - End time: u64 (microseconds)                   │
//! │ - Record count: u64                              │
//! │ - Reserved: 16 bytes                             │
//! ├──────────────────────────────────────────────────┤
//! │ Record Stream                                    │
//! │ [len:u32 LE][postcard StreamRecord]...           │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Header fields are postcard-encoded and zero padded to 64 bytes.

mod error;
mod reader;
mod types;
mod writer;

pub use error::{RawlogError, Result};
pub use reader::RawlogReader;
pub use types::{
    FLAG_LOCALIZED, HEADER_SIZE, RAWLOG_MAGIC, RAWLOG_VERSION, RawlogHeader, RawlogInfo,
    StreamRecord,
};
pub use writer::RawlogWriter;
