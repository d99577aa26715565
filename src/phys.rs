//! Raw-to-physical conversion (spec §4.3): sign extension, float
//! reinterpretation, and factor/offset scaling.

use crate::signal::Signal;

/// Sign-extend a `size`-bit raw value into an `i64`.
///
/// If bit `size - 1` of `raw` is set, the value is negative: all bits
/// from `size` upward are set to 1 before reinterpreting as two's
/// complement.
pub fn sign_extend(raw: u64, size: u16) -> i64 {
    if size >= 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (size - 1);
    if raw & sign_bit != 0 {
        let mask = !0u64 << size;
        (raw | mask) as i64
    } else {
        raw as i64
    }
}

/// Reinterpret the low 4 or 8 bytes of `raw` as an IEEE-754 float,
/// per `signal.size`. Callers must have already verified
/// `signal.is_float && signal.size ∈ {32, 64}` — that invariant is
/// enforced at [`crate::signal::Signal::new`], so it is a programmer
/// error (and panics) to call this otherwise.
pub fn reinterpret_float(signal: &Signal, raw: u64) -> f64 {
    match signal.size {
        32 => f32::from_bits(raw as u32) as f64,
        64 => f64::from_bits(raw),
        other => unreachable!("float signal with unsupported size {other} should have been rejected at construction"),
    }
}

/// The signed or unsigned integer `raw` represents, as an `i64`.
pub fn as_integer(signal: &Signal, raw: u64) -> i64 {
    if signal.is_signed {
        sign_extend(raw, signal.size)
    } else {
        raw as i64
    }
}

/// Decode `raw` into `(raw_integer, physical_value)` per spec §4.3: sign
/// extension for signed integers, float reinterpretation for float
/// signals, then `physical = raw * factor + offset` in double precision.
/// For float signals the raw integer is the bit pattern reinterpreted as
/// an integer (there is no meaningful separate "raw" for a float signal
/// beyond its bits), and factor/offset still apply on top of it.
pub fn raw_to_physical(signal: &Signal, raw: u64) -> (i64, f64) {
    if signal.is_float {
        let value = reinterpret_float(signal, raw);
        (raw as i64, value * signal.factor + signal.offset)
    } else {
        let integer = as_integer(signal, raw);
        (integer, integer as f64 * signal.factor + signal.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extend_positive() {
        assert_eq!(sign_extend(0x7F, 8), 127);
    }

    #[test]
    fn sign_extend_negative() {
        assert_eq!(sign_extend(0xFF, 8), -1);
        assert_eq!(sign_extend(0x8000, 16), -32768);
    }

    #[test]
    fn sign_extend_any_raw_in_range() {
        // Property 3 from spec §8: for any r in [0, 2^s), decoded value
        // equals r if top bit clear, r - 2^s otherwise.
        let size = 12u16;
        for r in 0..(1u64 << size) {
            let got = sign_extend(r, size);
            let top_bit_set = (r >> (size - 1)) & 1 == 1;
            let expected = if top_bit_set {
                r as i64 - (1i64 << size)
            } else {
                r as i64
            };
            assert_eq!(got, expected, "r={r}");
        }
    }

    #[test]
    fn scaling_applies_factor_and_offset() {
        let signal = Signal::new("S", 0, 16, true, false, false, 0.125, 10.0).unwrap();
        let (raw, physical) = raw_to_physical(&signal, 100);
        assert_eq!(raw, 100);
        assert!((physical - (100.0 * 0.125 + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn float32_reinterpretation() {
        let signal = Signal::new("F", 0, 32, true, false, true, 1.0, 0.0).unwrap();
        let bits = 3.5f32.to_bits() as u64;
        let (_, physical) = raw_to_physical(&signal, bits);
        assert!((physical - 3.5).abs() < 1e-6);
    }

    #[test]
    fn float64_reinterpretation() {
        let signal = Signal::new("F", 0, 64, true, false, true, 1.0, 0.0).unwrap();
        let bits = 2.718281828f64.to_bits();
        let (_, physical) = raw_to_physical(&signal, bits);
        assert!((physical - 2.718281828).abs() < 1e-12);
    }

    #[test]
    fn obd2_engine_rpm_physical_value() {
        // S1 from spec §8: factor 1, offset 0.25, raw 12850.
        let signal = Signal::new("EngineRPM", 24, 16, false, false, false, 1.0, 0.25).unwrap();
        let (raw, physical) = raw_to_physical(&signal, 12850);
        assert_eq!(raw, 12850);
        assert!((physical - 12850.25).abs() < 1e-9);
    }
}
