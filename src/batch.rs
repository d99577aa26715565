//! Batch (columnar) decoder (spec §4.6): decodes many records at once,
//! grouped by CAN ID (generic) or PGN (J1939), sharing the bit-extraction
//! kernel with the streaming path one row at a time.

use std::collections::BTreeMap;

use crate::bits::extract_raw;
use crate::config::DecodeOptions;
use crate::db::SignalDB;
use crate::dispatch::{select_protocol, Protocol};
use crate::frame::Frame;
use crate::j1939;
use crate::phys::raw_to_physical;
use crate::signal::Signal;
use crate::types::{DecoderError, DecoderWarning, Result};

/// Columnar input: one entry per record, all vectors the same length as
/// `timestamps`. `id`, `ide`, and `data_bytes` are `Option` so a caller
/// assembling this from a dynamic source (e.g. a real DataFrame) can
/// represent "this column wasn't supplied" distinctly from "this column
/// is empty", surfacing as [`DecoderError::MissingColumn`] rather than a
/// panic or silent empty decode.
#[derive(Debug, Clone, Default)]
pub struct BatchInput {
    pub timestamps: Vec<i64>,
    pub id: Option<Vec<u32>>,
    pub ide: Option<Vec<bool>>,
    pub data_bytes: Option<Vec<Vec<u8>>>,
}

impl BatchInput {
    pub fn new(timestamps: Vec<i64>, id: Vec<u32>, ide: Vec<bool>, data_bytes: Vec<Vec<u8>>) -> Self {
        Self {
            timestamps,
            id: Some(id),
            ide: Some(ide),
            data_bytes: Some(data_bytes),
        }
    }

    fn validated(&self) -> Result<(&[u32], &[bool], &[Vec<u8>])> {
        let id = self.id.as_deref().ok_or(DecoderError::MissingColumn("ID"))?;
        let ide = self
            .ide
            .as_deref()
            .ok_or(DecoderError::MissingColumn("IDE"))?;
        let data_bytes = self
            .data_bytes
            .as_deref()
            .ok_or(DecoderError::MissingColumn("DataBytes"))?;
        Ok((id, ide, data_bytes))
    }
}

/// Long-format batch result. Columns a caller listed in
/// [`DecodeOptions::columns_to_drop`] are `None`; `pgn`/`source_address`
/// are additionally `None` for the generic protocol, since they only
/// exist in the J1939 variant.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub timestamp: Vec<i64>,
    pub can_id: Option<Vec<u32>>,
    pub signal: Option<Vec<String>>,
    pub raw: Option<Vec<i64>>,
    pub physical: Option<Vec<f64>>,
    pub pgn: Option<Vec<u32>>,
    pub source_address: Option<Vec<u8>>,
}

impl BatchOutput {
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }
}

/// One decoded measurement before final column assembly.
struct Row {
    timestamp: i64,
    can_id: u32,
    signal: String,
    raw: i64,
    physical: f64,
    pgn: Option<u32>,
    source_address: Option<u8>,
}

/// Decode a columnar batch of records against `db`, per spec §4.6.
pub fn decode_batch(db: &SignalDB, input: &BatchInput, options: &DecodeOptions) -> Result<BatchOutput> {
    let (id, ide, data_bytes) = input.validated()?;
    let n = input.timestamps.len();
    debug_assert_eq!(id.len(), n);
    debug_assert_eq!(ide.len(), n);
    debug_assert_eq!(data_bytes.len(), n);

    let fused_ids: Vec<u32> = (0..n)
        .map(|i| ((ide[i] as u32) << 31) | (id[i] & 0x1FFF_FFFF))
        .collect();

    let protocol = select_protocol(db)?;

    let mut rows = match protocol {
        Protocol::Generic => decode_generic(db, &fused_ids, data_bytes, &input.timestamps),
        Protocol::J1939 => decode_j1939(db, &fused_ids, data_bytes, &input.timestamps, options),
    };

    rows.sort_by_key(|r| r.timestamp);

    Ok(assemble(rows, options))
}

fn group_by_fused_id(fused_ids: &[u32]) -> BTreeMap<u32, Vec<usize>> {
    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, &fused) in fused_ids.iter().enumerate() {
        groups.entry(fused).or_default().push(i);
    }
    groups
}

fn check_uniform_length(frame: &Frame, indices: &[usize], data_bytes: &[Vec<u8>]) -> bool {
    for &i in indices {
        if data_bytes[i].len() != frame.size {
            log::warn!(
                "{}",
                DecoderWarning::DataSizeMismatch {
                    frame_id: frame.id,
                    expected: frame.size,
                    actual: data_bytes[i].len(),
                }
            );
            return false;
        }
    }
    true
}

fn decode_generic(
    db: &SignalDB,
    fused_ids: &[u32],
    data_bytes: &[Vec<u8>],
    timestamps: &[i64],
) -> Vec<Row> {
    let mut rows = Vec::new();

    for (fused_id, indices) in group_by_fused_id(fused_ids) {
        let Some(frame) = db.frame(fused_id) else {
            continue;
        };

        if !check_uniform_length(frame, &indices, data_bytes) {
            continue;
        }

        for signal in &frame.signals {
            decode_signal_tree(
                signal,
                &indices,
                data_bytes,
                timestamps,
                fused_ids,
                None,
                None,
                &mut rows,
            );
        }
    }

    rows
}

fn decode_j1939(
    db: &SignalDB,
    fused_ids: &[u32],
    data_bytes: &[Vec<u8>],
    timestamps: &[i64],
    options: &DecodeOptions,
) -> Vec<Row> {
    let mut pgn_index: BTreeMap<u32, u32> = BTreeMap::new();
    for frame in db.frames() {
        pgn_index.insert(j1939::pgn_of(frame.id), frame.id);
    }

    // Drop non-extended rows first (cannot be J1939), then group the
    // survivors by PGN.
    let extended: Vec<usize> = (0..fused_ids.len())
        .filter(|&i| fused_ids[i] & 0x8000_0000 != 0)
        .collect();

    let mut pgn_groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for &i in &extended {
        let pgn = j1939::pgn_of(fused_ids[i] & 0x1FFF_FFFF);
        pgn_groups.entry(pgn).or_default().push(i);
    }

    let mut rows = Vec::new();

    for (pgn, indices) in pgn_groups {
        let Some(&frame_id) = pgn_index.get(&pgn) else {
            continue;
        };
        let Some(frame) = db.frame(frame_id) else {
            continue;
        };

        if !check_uniform_length(frame, &indices, data_bytes) {
            continue;
        }

        let validity = if options.ignore_invalid_signals {
            Some(j1939::is_valid as fn(u64, &Signal) -> bool)
        } else {
            None
        };

        for signal in &frame.signals {
            decode_signal_tree(
                signal,
                &indices,
                data_bytes,
                timestamps,
                fused_ids,
                Some(pgn),
                validity,
                &mut rows,
            );
        }
    }

    rows
}

/// Recursive multiplex walk over a subset of row indices — the batch
/// analogue of `stream::decode_recursive`, operating on an index vector
/// rather than a single payload. Multiplexer selector values are grouped
/// with a `BTreeMap` (rather than a hash map) so groups are visited in
/// ascending numeric order, matching `numpy.unique`'s sorted-unique
/// semantics in the original implementation and keeping output order
/// deterministic.
#[allow(clippy::too_many_arguments)]
fn decode_signal_tree(
    signal: &Signal,
    indices: &[usize],
    data_bytes: &[Vec<u8>],
    timestamps: &[i64],
    fused_ids: &[u32],
    pgn: Option<u32>,
    validity: Option<fn(u64, &Signal) -> bool>,
    rows: &mut Vec<Row>,
) {
    if signal.is_multiplexer() {
        let mut groups: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for &i in indices {
            let raw = extract_raw(signal, &data_bytes[i]);
            groups.entry(raw).or_default().push(i);
        }

        for (selector, group_indices) in groups {
            if let Some(children) = signal.children_for(selector) {
                for child in children {
                    decode_signal_tree(
                        child,
                        &group_indices,
                        data_bytes,
                        timestamps,
                        fused_ids,
                        pgn,
                        validity,
                        rows,
                    );
                }
            }
        }
        return;
    }

    for &i in indices {
        let raw = extract_raw(signal, &data_bytes[i]);

        if let Some(is_valid) = validity {
            if !is_valid(raw, signal) {
                continue;
            }
        }

        let (raw_integer, physical) = raw_to_physical(signal, raw);

        rows.push(Row {
            timestamp: timestamps[i],
            can_id: fused_ids[i] & 0x1FFF_FFFF,
            signal: signal.name.clone(),
            raw: raw_integer,
            physical,
            pgn,
            source_address: pgn.map(|_| (fused_ids[i] & 0xFF) as u8),
        });
    }
}

fn assemble(rows: Vec<Row>, options: &DecodeOptions) -> BatchOutput {
    let drop = |name: &str| options.columns_to_drop.contains(name);

    let timestamp = rows.iter().map(|r| r.timestamp).collect();

    let can_id = (!drop("CAN ID")).then(|| rows.iter().map(|r| r.can_id).collect());
    let signal = (!drop("Signal")).then(|| rows.iter().map(|r| r.signal.clone()).collect());
    let raw = (!drop("Raw Value")).then(|| rows.iter().map(|r| r.raw).collect());
    let physical = (!drop("Physical Value")).then(|| rows.iter().map(|r| r.physical).collect());

    let is_j1939 = rows.first().map(|r| r.pgn.is_some()).unwrap_or(false);
    let pgn = (is_j1939 && !drop("PGN")).then(|| rows.iter().map(|r| r.pgn.unwrap_or(0)).collect());
    let source_address = (is_j1939 && !drop("Source Address"))
        .then(|| rows.iter().map(|r| r.source_address.unwrap_or(0)).collect());

    BatchOutput {
        timestamp,
        can_id,
        signal,
        raw,
        physical,
        pgn,
        source_address,
    }
}
