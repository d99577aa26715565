//! Streaming decoder (spec §4.5): a pull-based, FIFO-buffered iterator
//! over decoded signals, driven by a lazy source of [`RawCanRecord`]s.

use std::collections::{HashMap, VecDeque};

use crate::bits::extract_raw;
use crate::db::SignalDB;
use crate::dispatch::{select_protocol, Protocol};
use crate::j1939;
use crate::phys::raw_to_physical;
use crate::signal::Signal;
use crate::types::{DecodedSignal, RawCanRecord, Result, Timestamp};

/// Wraps an upstream record source and emits decoded signals lazily: one
/// request pulls zero or more upstream records (draining any signals a
/// single record produced through an internal FIFO) before producing a
/// result.
///
/// State machine: `Constructed -> Iterating <-> Yielding -> Exhausted`,
/// matching spec §4.7 — there is no explicit cancellation; dropping the
/// decoder frees the upstream iterator and the FIFO.
pub struct StreamDecoder<'db, I> {
    inner: I,
    db: &'db SignalDB,
    protocol: Protocol,
    /// J1939 only: PGN -> frame ID, built once at construction so lookups
    /// don't recompute the PGN of every frame in the database per record.
    pgn_index: Option<HashMap<u32, u32>>,
    fifo: VecDeque<DecodedSignal>,
}

impl<'db, I> StreamDecoder<'db, I>
where
    I: Iterator<Item = RawCanRecord>,
{
    /// Construct a decoder over `inner`, dispatching on `db`'s protocol
    /// tag (spec §4.7).
    pub fn new(inner: I, db: &'db SignalDB) -> Result<Self> {
        let protocol = select_protocol(db)?;
        log::info!("constructed StreamDecoder for {protocol:?}");

        let pgn_index = match protocol {
            Protocol::J1939 => {
                let mut index = HashMap::new();
                for frame in db.frames() {
                    index.insert(j1939::pgn_of(frame.id), frame.id);
                }
                Some(index)
            }
            Protocol::Generic => None,
        };

        Ok(Self {
            inner,
            db,
            protocol,
            pgn_index,
            fifo: VecDeque::new(),
        })
    }

    fn process_record(&mut self, record: RawCanRecord) {
        log::trace!("processing record id=0x{:08X} ide={}", record.id, record.ide);
        match self.protocol {
            Protocol::Generic => self.process_generic(&record),
            Protocol::J1939 => self.process_j1939(&record),
        }
    }

    fn process_generic(&mut self, record: &RawCanRecord) {
        let canonical_id = record.canonical_id();

        let Some(frame) = self.db.frame(canonical_id) else {
            log::debug!("no frame for canonical id 0x{canonical_id:08X}, skipping record");
            return;
        };
        log::debug!("matched frame 0x{:08X} ({} signal(s))", frame.id, frame.signals.len());

        let timestamp = record.timestamp();

        for signal in &frame.signals {
            decode_recursive(
                signal,
                &record.data,
                canonical_id,
                timestamp,
                None,
                &mut self.fifo,
            );
        }
    }

    fn process_j1939(&mut self, record: &RawCanRecord) {
        if !record.ide {
            return;
        }

        let canonical_id = record.canonical_id();
        let pgn = j1939::pgn_of(canonical_id & 0x1FFF_FFFF);

        let Some(&frame_id) = self.pgn_index.as_ref().and_then(|idx| idx.get(&pgn)) else {
            log::debug!("no frame for PGN 0x{pgn:05X}, skipping record");
            return;
        };
        let Some(frame) = self.db.frame(frame_id) else {
            log::debug!("PGN 0x{pgn:05X} indexed but frame 0x{frame_id:08X} missing, skipping record");
            return;
        };
        log::debug!("matched PGN 0x{pgn:05X} to frame 0x{:08X}", frame.id);

        let timestamp = record.timestamp();

        for signal in &frame.signals {
            decode_recursive(
                signal,
                &record.data,
                canonical_id,
                timestamp,
                Some(j1939::is_valid),
                &mut self.fifo,
            );
        }
    }
}

/// Walk a signal (and, if it's a multiplexer, its selected children)
/// pre-order, pushing one [`DecodedSignal`] per non-multiplexer leaf.
/// `validity` is the J1939 invalid-value filter; `None` for the generic
/// path. A selector value with no matching child group yields no output
/// for that branch.
fn decode_recursive(
    signal: &Signal,
    payload: &[u8],
    can_id: u32,
    timestamp: Timestamp,
    validity: Option<fn(u64, &Signal) -> bool>,
    fifo: &mut VecDeque<DecodedSignal>,
) {
    let raw = extract_raw(signal, payload);

    if signal.is_multiplexer() {
        if let Some(children) = signal.children_for(raw) {
            for child in children {
                decode_recursive(child, payload, can_id, timestamp, validity, fifo);
            }
        }
        return;
    }

    if let Some(is_valid) = validity {
        if !is_valid(raw, signal) {
            log::trace!("signal {:?} dropped: raw 0x{raw:X} fails J1939 validity", signal.name);
            return;
        }
    }

    let (raw_integer, physical) = raw_to_physical(signal, raw);
    log::trace!("emitting {:?} raw={raw_integer} physical={physical}", signal.name);

    fifo.push_back(DecodedSignal {
        timestamp,
        can_id,
        signal: signal.name.clone(),
        raw: raw_integer,
        physical,
    });
}

impl<'db, I> Iterator for StreamDecoder<'db, I>
where
    I: Iterator<Item = RawCanRecord>,
{
    type Item = DecodedSignal;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(signal) = self.fifo.pop_front() {
                return Some(signal);
            }

            match self.inner.next() {
                Some(record) => self.process_record(record),
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn record(id: u32, ide: bool, data: Vec<u8>) -> RawCanRecord {
        RawCanRecord {
            timestamp_ns: 0,
            id,
            ide,
            data,
        }
    }

    #[test]
    fn s1_obd2_multiplexed_streaming() {
        let engine_rpm = Signal::new("EngineRPM", 24, 16, false, false, false, 1.0, 0.25).unwrap();
        let mut pid_mux = Signal::new("PIDMux", 16, 8, false, false, false, 1.0, 0.0).unwrap();
        pid_mux.add_child(0x0C, engine_rpm);

        let mut service_mux = Signal::new("ServiceMux", 8, 8, false, false, false, 1.0, 0.0).unwrap();
        service_mux.add_child(0x41, pid_mux);

        let mut frame = Frame::new(0x07E8, 8);
        frame.add_signal(service_mux).unwrap();

        let mut db = SignalDB::new(None);
        db.add_frame(frame);

        let records = vec![record(
            0x07E8,
            false,
            vec![0x04, 0x41, 0x0C, 0x32, 0x32, 0xAA, 0xAA, 0xAA],
        )];

        let decoder = StreamDecoder::new(records.into_iter(), &db).unwrap();
        let outputs: Vec<_> = decoder.collect();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].signal, "EngineRPM");
        assert_eq!(outputs[0].raw, 12850);
        assert!((outputs[0].physical - 12850.25).abs() < 1e-9);
        assert_eq!(outputs[0].can_id, 0x07E8);
    }

    #[test]
    fn s2_j1939_valid_engine_speed() {
        let engine_speed = Signal::new("EngineSpeed", 24, 16, true, false, false, 0.125, 0.0).unwrap();
        let mut frame = Frame::new(0x8CF0_04FE, 8);
        frame.add_signal(engine_speed).unwrap();

        let mut db = SignalDB::new(Some("J1939".to_string()));
        db.add_frame(frame);

        let records = vec![record(
            0x0CF0_04FE,
            true,
            vec![0x10, 0x7D, 0x82, 0xBD, 0x12, 0x00, 0xF4, 0x82],
        )];

        let decoder = StreamDecoder::new(records.into_iter(), &db).unwrap();
        let outputs: Vec<_> = decoder.collect();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].signal, "EngineSpeed");
        assert_eq!(outputs[0].raw, 4797);
        assert!((outputs[0].physical - 599.625).abs() < 1e-9);

        let canonical = outputs[0].can_id;
        assert_eq!(j1939::pgn_of(canonical & 0x1FFF_FFFF), 0xF004);
        assert_eq!(j1939::source_address_of(canonical), 0xFE);
    }

    #[test]
    fn s3_j1939_invalid_value_dropped() {
        let engine_speed = Signal::new("EngineSpeed", 24, 16, true, false, false, 0.125, 0.0).unwrap();
        let mut frame = Frame::new(0x8CF0_04FE, 8);
        frame.add_signal(engine_speed).unwrap();

        let mut db = SignalDB::new(Some("J1939".to_string()));
        db.add_frame(frame);

        let records = vec![record(
            0x0CF0_04FE,
            true,
            vec![0x10, 0x7D, 0x82, 0xBD, 0xFF, 0xFF, 0xF4, 0x82],
        )];

        let decoder = StreamDecoder::new(records.into_iter(), &db).unwrap();
        let outputs: Vec<_> = decoder.collect();

        assert!(outputs.is_empty());
    }

    #[test]
    fn unknown_frame_id_is_silently_skipped() {
        let db = SignalDB::new(None);
        let records = vec![record(0x123, false, vec![0; 8])];
        let decoder = StreamDecoder::new(records.into_iter(), &db).unwrap();
        assert_eq!(decoder.count(), 0);
    }

    #[test]
    fn ordering_is_preorder_within_record_and_record_order_across_records() {
        let sig_a = Signal::new("A", 0, 8, true, false, false, 1.0, 0.0).unwrap();
        let sig_b = Signal::new("B", 8, 8, true, false, false, 1.0, 0.0).unwrap();
        let mut frame = Frame::new(0x200, 8);
        frame.add_signal(sig_a).unwrap();
        frame.add_signal(sig_b).unwrap();

        let mut db = SignalDB::new(None);
        db.add_frame(frame);

        let records = vec![
            record(0x200, false, vec![1, 2, 0, 0, 0, 0, 0, 0]),
            record(0x200, false, vec![3, 4, 0, 0, 0, 0, 0, 0]),
        ];

        let decoder = StreamDecoder::new(records.into_iter(), &db).unwrap();
        let names: Vec<_> = decoder.map(|s| (s.signal, s.raw)).collect();

        assert_eq!(
            names,
            vec![
                ("A".to_string(), 1),
                ("B".to_string(), 2),
                ("A".to_string(), 3),
                ("B".to_string(), 4),
            ]
        );
    }
}
