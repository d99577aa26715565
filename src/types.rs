//! Core types shared across the decoding engine.
//!
//! These are the small value objects the rest of the crate passes around:
//! the raw record contract callers feed in, the decoded tuple the
//! streaming path emits, and the error/warning taxonomy from the decode
//! contract.

use chrono::{DateTime, Utc};

/// Timestamp type used for decoded output.
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations.
pub type Result<T> = std::result::Result<T, DecoderError>;

/// A single raw CAN record, as produced by whatever upstream log reader or
/// bus interface the caller is using. The decoder does not care where
/// these come from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCanRecord {
    /// Nanoseconds since the Unix epoch.
    pub timestamp_ns: i64,
    /// Arbitration ID, 11 or 29 bits.
    pub id: u32,
    /// True if `id` is a 29-bit extended identifier.
    pub ide: bool,
    /// Payload bytes, first byte first on the wire. 1-8 bytes.
    pub data: Vec<u8>,
}

impl RawCanRecord {
    /// The canonical compound CAN ID: bit 31 set from `ide`, bits 28..0 the
    /// arbitration ID (low 29 or low 11 bits, per `ide`).
    pub fn canonical_id(&self) -> u32 {
        if self.ide {
            (self.id & 0x1FFF_FFFF) | 0x8000_0000
        } else {
            self.id & 0x7FF
        }
    }

    /// Convert `timestamp_ns` to an absolute UTC instant.
    pub fn timestamp(&self) -> Timestamp {
        let secs = self.timestamp_ns.div_euclid(1_000_000_000);
        let nanos = self.timestamp_ns.rem_euclid(1_000_000_000) as u32;
        DateTime::from_timestamp(secs, nanos).unwrap_or_else(Utc::now)
    }
}

/// A single decoded signal, as emitted by the streaming decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    /// Absolute timestamp of the source record.
    pub timestamp: Timestamp,
    /// Canonical compound CAN ID of the source record.
    pub can_id: u32,
    /// Signal name.
    pub signal: String,
    /// Raw integer value, before scaling.
    pub raw: i64,
    /// Scaled physical value (`raw * factor + offset`, or the
    /// reinterpreted float for float signals).
    pub physical: f64,
}

/// Errors that abort the current call. Per-record/per-group anomalies are
/// warnings (see [`DecoderWarning`]) and do not appear here.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("no known support for protocol: {0:?}")]
    UnknownProtocol(Option<String>),

    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("signal {0:?} is declared float with unsupported size {1} (must be 32 or 64)")]
    UnsupportedSignal(String, u16),

    #[error("frame 0x{0:08X} already has a top-level multiplexer signal")]
    InvalidFrame(u32),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("DBC parse error: {0}")]
    DbcParseError(String),
}

/// Non-fatal, per-record/per-group anomalies. These are logged via the
/// `log` facade (`log::warn!`) rather than returned; iteration or batch
/// processing continues.
///
/// There is no "missing field in record" variant: `RawCanRecord` is a
/// plain struct with `TimeStamp`/`ID`/`IDE`/`DataBytes` as mandatory
/// fields, so that failure mode (meaningful for a dynamically-typed
/// record) cannot occur here — the type system rules it out at
/// construction, not at decode time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecoderWarning {
    #[error("group for frame 0x{frame_id:08X} has DataBytes width {actual}, expected {expected}")]
    DataSizeMismatch {
        frame_id: u32,
        expected: usize,
        actual: usize,
    },
}
