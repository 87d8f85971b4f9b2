//! Binary real conversions: single, double, and the 80-bit extended memory
//! format.
//!
//! Single/double loads widen exactly but classify on the way in (subnormals
//! are normalized and flagged, signaling NaNs are flagged and quieted).
//! Extended loads never signal. Stores narrow through the shared rounding
//! helper; the extended store is an exact image of the register.

use crate::reg::{EXP_BIAS, FpReg, QNAN_BIT, SIG_MSB, Sign, Tag};
use crate::round::round_at;
use crate::utils::{read_u16_le, read_u64_le, shr128_sticky, write_u16_le, write_u64_le};
use crate::words::{ControlWord, ExnFlags, RoundMode};

struct TargetFormat {
    keep: u32,
    bias: i32,
    /// Largest exponent field of a finite value.
    max_field: i32,
}

const F32_FMT: TargetFormat = TargetFormat {
    keep: 24,
    bias: 127,
    max_field: 254,
};
const F64_FMT: TargetFormat = TargetFormat {
    keep: 53,
    bias: 1023,
    max_field: 2046,
};

/// Narrow a finite nonzero register value to a target format, handling the
/// masked overflow substitution table and masked-underflow denormalization.
/// Returns the exponent field, the `keep`-bit significand (integer bit
/// included), the flags, and the round-up indication.
fn round_finite(r: &FpReg, cw: &ControlWord, fmt: &TargetFormat) -> (i32, u64, ExnFlags, bool) {
    let rm = cw.rounding();
    let field = r.exp - EXP_BIAS + fmt.bias;

    if field < 1 && cw.is_masked(ExnFlags::UNDERFLOW) {
        let shift = ((1 - field) as u32).min(128);
        let (hi, lo, st) = shr128_sticky(r.sig, 0, shift);
        let rr = round_at(r.sign, hi, lo, st, fmt.keep, rm);
        let mut flags = ExnFlags::empty();
        if rr.inexact {
            flags |= ExnFlags::UNDERFLOW | ExnFlags::PRECISION;
        }
        // Rounding can climb back to the smallest normal.
        let field = if rr.q >= 1 << (fmt.keep - 1) { 1 } else { 0 };
        return (field, rr.q, flags, rr.up);
    }

    let rr = round_at(r.sign, r.sig, 0, false, fmt.keep, rm);
    let mut flags = ExnFlags::empty();
    if rr.inexact {
        flags |= ExnFlags::PRECISION;
    }
    let field = field + rr.carry as i32;
    if field < 1 {
        // Unmasked underflow; the value is discarded by the caller.
        flags |= ExnFlags::UNDERFLOW;
        return (field, rr.q, flags, rr.up);
    }
    if field > fmt.max_field {
        flags |= ExnFlags::OVERFLOW | ExnFlags::PRECISION;
        if cw.is_masked(ExnFlags::OVERFLOW) {
            let to_inf = match rm {
                RoundMode::Nearest => true,
                RoundMode::Chop => false,
                RoundMode::Down => r.sign == Sign::Neg,
                RoundMode::Up => r.sign == Sign::Pos,
            };
            return if to_inf {
                (fmt.max_field + 1, 1 << (fmt.keep - 1), flags, true)
            } else {
                (fmt.max_field, u64::MAX >> (64 - fmt.keep), flags, false)
            };
        }
    }
    (field, rr.q, flags, rr.up)
}

pub fn load_f32(bits: u32) -> (FpReg, ExnFlags) {
    let sign = Sign::of_bit(bits >> 31 != 0);
    let field = ((bits >> 23) & 0xFF) as i32;
    let frac = (bits & 0x007F_FFFF) as u64;
    match (field, frac) {
        (0, 0) => (FpReg::zero(sign), ExnFlags::empty()),
        (0, _) => {
            // Subnormal: widen exactly, flag the denormal operand.
            let lz = frac.leading_zeros();
            let sig = frac << lz;
            let exp = (1 - 127 + EXP_BIAS) - (lz as i32 - 40);
            (FpReg::finite(sign, exp, sig), ExnFlags::DENORMAL)
        }
        (0xFF, 0) => (FpReg::infinity(sign), ExnFlags::empty()),
        (0xFF, _) => {
            let sig = SIG_MSB | (frac << 40);
            let r = FpReg::nan(sign, sig);
            if r.is_signaling() {
                (r.quieted(), ExnFlags::INVALID)
            } else {
                (r, ExnFlags::empty())
            }
        }
        _ => {
            let sig = (0x0080_0000 | (bits as u64 & 0x007F_FFFF)) << 40;
            (
                FpReg::finite(sign, field - 127 + EXP_BIAS, sig),
                ExnFlags::empty(),
            )
        }
    }
}

pub fn load_f64(bits: u64) -> (FpReg, ExnFlags) {
    let sign = Sign::of_bit(bits >> 63 != 0);
    let field = ((bits >> 52) & 0x7FF) as i32;
    let frac = bits & 0x000F_FFFF_FFFF_FFFF;
    match (field, frac) {
        (0, 0) => (FpReg::zero(sign), ExnFlags::empty()),
        (0, _) => {
            let lz = frac.leading_zeros();
            let sig = frac << lz;
            let exp = (1 - 1023 + EXP_BIAS) - (lz as i32 - 11);
            (FpReg::finite(sign, exp, sig), ExnFlags::DENORMAL)
        }
        (0x7FF, 0) => (FpReg::infinity(sign), ExnFlags::empty()),
        (0x7FF, _) => {
            let sig = SIG_MSB | (frac << 11);
            let r = FpReg::nan(sign, sig);
            if r.is_signaling() {
                (r.quieted(), ExnFlags::INVALID)
            } else {
                (r, ExnFlags::empty())
            }
        }
        _ => {
            let sig = (0x0010_0000_0000_0000 | frac) << 11;
            (
                FpReg::finite(sign, field - 1023 + EXP_BIAS, sig),
                ExnFlags::empty(),
            )
        }
    }
}

/// Load the 80-bit memory format. Never signals; unnormals and
/// pseudo-denormals are normalized on the way in.
pub fn load_ext(bytes: &[u8; 10]) -> FpReg {
    let sig = read_u64_le(&bytes[0..8]);
    let se = read_u16_le(&bytes[8..10]);
    let sign = Sign::of_bit(se & 0x8000 != 0);
    let field = (se & 0x7FFF) as i32;
    match (field, sig) {
        (0, 0) => FpReg::zero(sign),
        (0, _) => {
            // Denormal or pseudo-denormal; both mean exponent 1.
            let lz = sig.leading_zeros();
            FpReg::finite(sign, 1 - lz as i32, sig << lz)
        }
        (0x7FFF, s) if s == SIG_MSB => FpReg::infinity(sign),
        (0x7FFF, _) => FpReg::nan(sign, sig),
        (_, 0) => FpReg::zero(sign),
        _ => {
            // Unnormals normalize; a set integer bit leaves lz == 0.
            let lz = sig.leading_zeros();
            FpReg::finite(sign, field - lz as i32, sig << lz)
        }
    }
}

pub fn store_f32(r: &FpReg, cw: &ControlWord) -> (u32, ExnFlags, bool) {
    let sign = (r.sign.bit() as u32) << 31;
    match r.tag {
        Tag::Zero => (sign, ExnFlags::empty(), false),
        Tag::Infinity => (sign | 0x7F80_0000, ExnFlags::empty(), false),
        Tag::Empty | Tag::NaN => {
            let (sig, flags) = narrow_nan(r);
            let frac = ((sig >> 40) as u32) & 0x007F_FFFF;
            (sign | 0x7F80_0000 | frac, flags, false)
        }
        Tag::Valid => {
            let (field, q, flags, up) = round_finite(r, cw, &F32_FMT);
            let frac = (q as u32) & 0x007F_FFFF;
            (sign | ((field.max(0) as u32) << 23) | frac, flags, up)
        }
    }
}

pub fn store_f64(r: &FpReg, cw: &ControlWord) -> (u64, ExnFlags, bool) {
    let sign = (r.sign.bit() as u64) << 63;
    match r.tag {
        Tag::Zero => (sign, ExnFlags::empty(), false),
        Tag::Infinity => (sign | 0x7FF0_0000_0000_0000, ExnFlags::empty(), false),
        Tag::Empty | Tag::NaN => {
            let (sig, flags) = narrow_nan(r);
            let frac = (sig >> 11) & 0x000F_FFFF_FFFF_FFFF;
            (sign | 0x7FF0_0000_0000_0000 | frac, flags, false)
        }
        Tag::Valid => {
            let (field, q, flags, up) = round_finite(r, cw, &F64_FMT);
            let frac = q & 0x000F_FFFF_FFFF_FFFF;
            (sign | ((field.max(0) as u64) << 52) | frac, flags, up)
        }
    }
}

fn narrow_nan(r: &FpReg) -> (u64, ExnFlags) {
    if r.tag == Tag::Empty {
        return (FpReg::indefinite().sig, ExnFlags::empty());
    }
    if r.is_signaling() {
        (r.sig | QNAN_BIT, ExnFlags::INVALID)
    } else {
        (r.sig, ExnFlags::empty())
    }
}

/// Store the 80-bit memory format: an exact image, no exceptions. Values the
/// rounding engine kept normalized below the format's normal range come out
/// as denormal encodings here.
pub fn store_ext(r: &FpReg) -> [u8; 10] {
    let (field, sig): (u16, u64) = match r.tag {
        Tag::Zero => (0, 0),
        Tag::Infinity => (0x7FFF, SIG_MSB),
        Tag::NaN => (0x7FFF, r.sig),
        Tag::Empty => (0x7FFF, FpReg::indefinite().sig),
        Tag::Valid => {
            if r.exp >= 1 {
                (r.exp as u16, r.sig)
            } else {
                let shift = ((1 - r.exp) as u32).min(63);
                (0, r.sig >> shift)
            }
        }
    };
    let mut bytes = [0u8; 10];
    write_u64_le(&mut bytes[0..8], sig);
    write_u16_le(&mut bytes[8..10], field | ((r.sign.bit() as u16) << 15));
    bytes
}
