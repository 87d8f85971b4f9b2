//! Integer conversions: word, doubleword, quadword loads and stores.
//!
//! Loads are exact. Stores round to an integer under rounding control (or
//! truncate unconditionally for the truncating-store form) and collapse any
//! out-of-range or non-finite source to the integer indefinite when the
//! invalid exception is masked.

use crate::reg::{EXP_BIAS, FpReg, SIG_MSB, Sign, Tag};
use crate::words::{ControlWord, ExnFlags, RoundMode};

pub fn load_i64(v: i64) -> FpReg {
    if v == 0 {
        return FpReg::zero(Sign::Pos);
    }
    let sign = Sign::of_bit(v < 0);
    let mag = v.unsigned_abs();
    let lz = mag.leading_zeros();
    FpReg::finite(sign, EXP_BIAS + 63 - lz as i32, mag << lz)
}

pub fn load_i32(v: i32) -> FpReg {
    load_i64(v as i64)
}

pub fn load_i16(v: i16) -> FpReg {
    load_i64(v as i64)
}

/// Round the magnitude of a finite nonzero value to an integer.
/// Returns `None` when the magnitude cannot fit 64 bits at all.
pub(crate) fn integer_magnitude(r: &FpReg, rm: RoundMode) -> Option<(u64, bool, bool)> {
    let e = r.exp - EXP_BIAS;
    if e > 63 {
        return None;
    }
    let (mag, guard, rest) = if e < -64 {
        (0, false, true)
    } else {
        let frac_bits = (63 - e) as u32;
        let v = r.sig as u128;
        let mag = if frac_bits >= 128 {
            0
        } else {
            (v >> frac_bits) as u64
        };
        let guard = frac_bits >= 1 && (v >> (frac_bits - 1)) & 1 != 0;
        let rest = frac_bits >= 2 && v & ((1u128 << (frac_bits - 1)) - 1) != 0;
        (mag, guard, rest)
    };
    let inexact = guard || rest;
    let up = match rm {
        RoundMode::Nearest => guard && (rest || mag & 1 != 0),
        RoundMode::Down => r.sign == Sign::Neg && inexact,
        RoundMode::Up => r.sign == Sign::Pos && inexact,
        RoundMode::Chop => false,
    };
    let (mag, carry) = mag.overflowing_add(up as u64);
    if carry {
        return None;
    }
    Some((mag, inexact, up))
}

fn store_signed(
    r: &FpReg,
    cw: &ControlWord,
    truncate: bool,
    max: u64,
    indefinite: i64,
) -> (i64, ExnFlags, bool) {
    let rm = if truncate {
        RoundMode::Chop
    } else {
        cw.rounding()
    };
    match r.tag {
        Tag::Zero => (0, ExnFlags::empty(), false),
        Tag::Valid => match integer_magnitude(r, rm) {
            Some((mag, inexact, up)) => {
                let in_range = mag <= max || (r.sign == Sign::Neg && mag == max + 1);
                if !in_range {
                    return (indefinite, ExnFlags::INVALID, false);
                }
                let v = if r.sign == Sign::Neg {
                    (mag as i64).wrapping_neg()
                } else {
                    mag as i64
                };
                let flags = if inexact {
                    ExnFlags::PRECISION
                } else {
                    ExnFlags::empty()
                };
                (v, flags, up)
            }
            None => (indefinite, ExnFlags::INVALID, false),
        },
        // NaN, infinity, empty.
        _ => (indefinite, ExnFlags::INVALID, false),
    }
}

pub fn store_i16(r: &FpReg, cw: &ControlWord, truncate: bool) -> (i16, ExnFlags, bool) {
    let (v, flags, up) = store_signed(r, cw, truncate, i16::MAX as u64, i16::MIN as i64);
    (v as i16, flags, up)
}

pub fn store_i32(r: &FpReg, cw: &ControlWord, truncate: bool) -> (i32, ExnFlags, bool) {
    let (v, flags, up) = store_signed(r, cw, truncate, i32::MAX as u64, i32::MIN as i64);
    (v as i32, flags, up)
}

pub fn store_i64(r: &FpReg, cw: &ControlWord, truncate: bool) -> (i64, ExnFlags, bool) {
    store_signed(r, cw, truncate, i64::MAX as u64, i64::MIN)
}
