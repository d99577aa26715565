//! CAN signal decoder
//!
//! A stateless, reusable library for decoding CAN and J1939 bus records
//! into scaled physical signal values, given a pre-built signal database
//! (frames, signals, and multiplexer trees).
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Builds a signal database from DBC files (feature `dbc`) or by hand
//! - Decodes CAN records against it, generic or J1939
//! - Handles recursively multiplexed signals
//! - Offers both a lazy streaming decoder and a columnar batch decoder
//!
//! The library does NOT:
//! - Parse log file formats (BLF, MF4, ASC, ...) — callers supply records
//! - Reassemble transport-layer (ISO-TP) multi-frame messages
//! - Track signal value changes, evaluate conditions, or run callbacks
//!
//! # Example
//!
//! ```no_run
//! use can_signal_decoder::{RawCanRecord, SignalDB, StreamDecoder};
//!
//! # fn records() -> Vec<RawCanRecord> { vec![] }
//! let db = SignalDB::new(None);
//! let decoder = StreamDecoder::new(records().into_iter(), &db).unwrap();
//!
//! for signal in decoder {
//!     println!("{} = {}", signal.signal, signal.physical);
//! }
//! ```

pub mod batch;
pub mod bits;
pub mod config;
#[cfg(feature = "dbc")]
pub mod dbc_loader;
pub mod db;
pub mod dispatch;
pub mod frame;
pub mod j1939;
pub mod phys;
pub mod signal;
pub mod stream;
pub mod types;

pub use batch::{decode_batch, BatchInput, BatchOutput};
pub use config::DecodeOptions;
#[cfg(feature = "dbc")]
pub use dbc_loader::{load_dbc_file, DbcLoadOptions};
pub use db::SignalDB;
pub use dispatch::Protocol;
pub use frame::Frame;
pub use signal::Signal;
pub use stream::StreamDecoder;
pub use types::{DecodedSignal, DecoderError, DecoderWarning, RawCanRecord, Result, Timestamp};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
