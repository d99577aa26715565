//! Bit-level signal extraction (spec §4.2).
//!
//! One scalar kernel, [`extract_raw`], used both by the streaming decoder
//! (one payload row at a time) and the batch decoder (called once per
//! row of the columnar matrix) — the "share the scalar kernel with the
//! batch kernel" design note, without needing an actual array backend.

use crate::signal::Signal;

/// Extract the raw unsigned magnitude of `signal` from one payload row.
///
/// Implements spec §4.2 steps 1-6: slice the byte range the signal spans,
/// unpack to bits honouring endianness, take the `size`-bit window
/// starting at `start_bit % 8`, normalise big-endian windows to a
/// little-endian bit order, and repack as an unsigned little-endian
/// integer. Returns `0` if the payload is too short to contain the
/// signal (callers that need to distinguish this from a genuine zero
/// value should check payload length themselves — `extract_raw` never
/// fails).
pub fn extract_raw(signal: &Signal, payload: &[u8]) -> u64 {
    let start_bit = signal.start_bit as usize;
    let size = signal.size as usize;

    let mut result: u64 = 0;

    if signal.is_little_endian {
        for i in 0..size {
            let bit_pos = start_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = bit_pos % 8;

            if let Some(&byte) = payload.get(byte_idx) {
                let bit = (byte >> bit_in_byte) & 1;
                result |= (bit as u64) << i;
            }
        }
    } else {
        // Motorola (big-endian): start_bit addresses the MSB of the
        // signal; bit 0 of a byte is its MSB, bit 7 its LSB, and the
        // signal grows towards higher bit numbers from there.
        for i in 0..size {
            let bit_pos = start_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8);

            if let Some(&byte) = payload.get(byte_idx) {
                let bit = (byte >> bit_in_byte) & 1;
                result |= (bit as u64) << (size - 1 - i);
            }
        }
    }

    result
}

/// Extract `signal` from every row of a columnar payload matrix. Each row
/// is an independent call to [`extract_raw`] — this is the "batch kernel
/// invokes the scalar kernel with N=1, N times" structure.
pub fn extract_raw_column(signal: &Signal, rows: &[&[u8]]) -> Vec<u64> {
    rows.iter().map(|row| extract_raw(signal, row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(start_bit: u16, size: u16, little_endian: bool) -> Signal {
        Signal::new("S", start_bit, size, little_endian, false, false, 1.0, 0.0).unwrap()
    }

    #[test]
    fn little_endian_single_byte() {
        let data = [0xABu8, 0xCD, 0xEF, 0x12];
        assert_eq!(extract_raw(&sig(0, 8, true), &data), 0xAB);
    }

    #[test]
    fn little_endian_cross_byte() {
        let data = [0xABu8, 0xCD, 0xEF, 0x12];
        assert_eq!(extract_raw(&sig(0, 16, true), &data), 0xCDAB);
    }

    #[test]
    fn big_endian_single_byte() {
        // start_bit 7 = MSB of byte 0 in Motorola bit numbering.
        let data = [0xABu8, 0xCD, 0xEF, 0x12];
        assert_eq!(extract_raw(&sig(7, 8, false), &data), 0xAB);
    }

    #[test]
    fn obd2_engine_rpm_scenario() {
        // S1 from spec §8: ServiceMux@8/8 BE, PIDMux@16/8 BE, EngineRPM@24/16 BE.
        let data = [0x04u8, 0x41, 0x0C, 0x32, 0x32, 0xAA, 0xAA, 0xAA];
        assert_eq!(extract_raw(&sig(8, 8, false), &data), 0x41);
        assert_eq!(extract_raw(&sig(16, 8, false), &data), 0x0C);
        assert_eq!(extract_raw(&sig(24, 16, false), &data), 12850);
    }

    #[test]
    fn j1939_engine_speed_scenario() {
        // S2 from spec §8: EngineSpeed@24/16 LE, factor 0.125.
        let data = [0x10u8, 0x7D, 0x82, 0xBD, 0x12, 0x00, 0xF4, 0x82];
        assert_eq!(extract_raw(&sig(24, 16, true), &data), 4797);
    }

    #[test]
    fn column_extraction_matches_scalar() {
        let rows: [&[u8]; 2] = [&[0xAB, 0xCD], &[0x12, 0x34]];
        let signal = sig(0, 8, true);
        let got = extract_raw_column(&signal, &rows);
        assert_eq!(got, vec![0xAB, 0x12]);
    }

    #[test]
    fn signed_little_endian_across_byte_boundary() {
        // S5 from spec §8: size 12, start_bit 10, little-endian, signed,
        // raw bitfield value -100 (two's complement over 12 bits = 3996).
        let raw_value: u16 = (-100i16 as u16) & 0x0FFF;
        let mut data = [0u8; 8];
        for bit in 0..12u16 {
            let src_bit = (raw_value >> bit) & 1;
            if src_bit == 1 {
                let pos = 10 + bit as usize;
                data[pos / 8] |= 1 << (pos % 8);
            }
        }
        let signal = Signal::new("Sig", 10, 12, true, true, false, 1.0, 0.0).unwrap();
        let extracted = extract_raw(&signal, &data);
        assert_eq!(extracted, raw_value as u64);
    }
}
