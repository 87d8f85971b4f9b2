//! Sign operations, exponent extraction, integer rounding, scaling, and
//! operand classification.

use super::{denormal_flag, propagate_nan};
use crate::config::QuirkMode;
use crate::convert::int::{integer_magnitude, load_i64};
use crate::reg::{EXP_BIAS, FpReg, SIG_MSB, Sign, Tag};
use crate::round::{RawResult, round};
use crate::words::{ControlWord, ExnFlags};

/// FCHS / FABS never examine the value; they flip bits even on NaNs.
pub fn fchs(a: &FpReg) -> FpReg {
    a.negated()
}

pub fn fabs(a: &FpReg) -> FpReg {
    a.with_sign(Sign::Pos)
}

/// FXTRACT: split into exponent and significand parts. The exponent part
/// replaces st0 and the significand part is pushed on top.
pub fn fxtract(a: &FpReg) -> (FpReg, FpReg, ExnFlags) {
    match a.tag {
        Tag::NaN => {
            let flags = if a.is_signaling() {
                ExnFlags::INVALID
            } else {
                ExnFlags::empty()
            };
            (a.quieted(), a.quieted(), flags)
        }
        // log2(0) pole: exponent part is -inf and the zero divide fires.
        Tag::Zero => (FpReg::infinity(Sign::Neg), *a, ExnFlags::ZERO_DIVIDE),
        Tag::Infinity => (FpReg::infinity(Sign::Pos), *a, ExnFlags::empty()),
        Tag::Valid => {
            let flags = denormal_flag(&[a]);
            // The internal exponent is already the true one for values kept
            // normalized below the format range.
            let exp_part = load_i64((a.exp - EXP_BIAS) as i64);
            let sig_part = FpReg::finite(a.sign, EXP_BIAS, a.sig);
            (exp_part, sig_part, flags)
        }
        Tag::Empty => (FpReg::indefinite(), FpReg::indefinite(), ExnFlags::INVALID),
    }
}

/// FRNDINT: round to an integral value under rounding control.
pub fn frndint(a: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    match a.tag {
        Tag::NaN => {
            if a.is_signaling() {
                (a.quieted(), ExnFlags::INVALID, false)
            } else {
                (*a, ExnFlags::empty(), false)
            }
        }
        Tag::Zero | Tag::Infinity => (*a, ExnFlags::empty(), false),
        Tag::Valid => {
            let flags = denormal_flag(&[a]);
            if a.exp - EXP_BIAS >= 63 {
                return (*a, flags, false);
            }
            // Cannot overflow u64: the exponent is below 63.
            let Some((mag, inexact, up)) = integer_magnitude(a, cw.rounding()) else {
                return (*a, flags, false);
            };
            let r = if mag == 0 {
                FpReg::zero(a.sign)
            } else {
                load_i64(mag as i64).with_sign(a.sign)
            };
            let flags = if inexact {
                flags | ExnFlags::PRECISION
            } else {
                flags
            };
            (r, flags, up)
        }
        Tag::Empty => (FpReg::indefinite(), ExnFlags::INVALID, false),
    }
}

/// FSCALE: st0 * 2^trunc(st1).
pub fn fscale(
    a: &FpReg,
    b: &FpReg,
    cw: &ControlWord,
    quirk: QuirkMode,
) -> (FpReg, ExnFlags, bool) {
    if a.is_nan() || b.is_nan() {
        let (r, flags) = propagate_nan(a, b);
        return (r, flags, false);
    }
    let flags = denormal_flag(&[a, b]);

    match (a.tag, b.tag) {
        (Tag::Zero, Tag::Infinity) => {
            if b.sign == Sign::Pos {
                // Hardware faults here; the documented result is the zero.
                if quirk == QuirkMode::HardwareCompatible {
                    (FpReg::indefinite(), flags | ExnFlags::INVALID, false)
                } else {
                    (*a, flags, false)
                }
            } else {
                (*a, flags, false)
            }
        }
        (Tag::Infinity, Tag::Infinity) if b.sign == Sign::Neg => {
            (FpReg::indefinite(), flags | ExnFlags::INVALID, false)
        }
        (Tag::Infinity, _) => (*a, flags, false),
        (_, Tag::Infinity) => {
            if b.sign == Sign::Pos {
                (FpReg::infinity(a.sign), flags, false)
            } else {
                (FpReg::zero(a.sign), flags, false)
            }
        }
        (Tag::Zero, _) => (*a, flags, false),
        (Tag::Valid, _) => {
            let n = scale_amount(b);
            let raw = RawResult::from_sig64(a.sign, a.exp + n, a.sig);
            let (r, f, up) = round(&raw, cw);
            (r, flags | f, up)
        }
        _ => (FpReg::indefinite(), flags | ExnFlags::INVALID, false),
    }
}

/// Truncate the scale operand toward zero, clamped well past the exponent
/// range so saturation behaves like an infinite scale.
fn scale_amount(b: &FpReg) -> i32 {
    const CLAMP: i32 = 1 << 20;
    if b.tag != Tag::Valid {
        return 0;
    }
    let e = b.exp - EXP_BIAS;
    if e < 0 {
        return 0;
    }
    if e >= 31 {
        return if b.sign == Sign::Neg { -CLAMP } else { CLAMP };
    }
    let mag = (b.sig >> (63 - e)) as i32;
    if b.sign == Sign::Neg { -mag } else { mag }
}

/// Operand class for FXAM: (C3, C2, C0) plus C1 = sign.
pub struct Examined {
    pub c0: bool,
    pub c1: bool,
    pub c2: bool,
    pub c3: bool,
}

pub fn fxam(a: &FpReg) -> Examined {
    let c1 = a.sign == Sign::Neg;
    let (c3, c2, c0) = match a.tag {
        Tag::Empty => (true, false, true),
        Tag::NaN => (false, false, true),
        Tag::Valid if a.is_tiny() => (true, true, false),
        Tag::Valid => (false, true, false),
        Tag::Infinity => (false, true, true),
        Tag::Zero => (true, false, false),
    };
    Examined { c0, c1, c2, c3 }
}
