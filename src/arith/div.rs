//! Division.
//!
//! The quotient is developed to 66 or 67 bits through two u128 divide steps;
//! the final remainder feeds the sticky flag, which is all the rounding
//! engine needs for a correctly rounded result in every mode.

use super::{denormal_flag, propagate_nan};
use crate::config::QuirkMode;
use crate::reg::{EXP_BIAS, FpReg, Tag};
use crate::round::{RawResult, round};
use crate::words::{ControlWord, ExnFlags};

pub fn div(
    a: &FpReg,
    b: &FpReg,
    cw: &ControlWord,
    quirk: QuirkMode,
) -> (FpReg, ExnFlags, bool) {
    if a.is_nan() || b.is_nan() {
        let (r, flags) = propagate_nan(a, b);
        return (r, flags, false);
    }
    let mut flags = denormal_flag(&[a, b]);
    let sign = a.sign.xor(b.sign);

    match (a.tag, b.tag) {
        (Tag::Infinity, Tag::Infinity) | (Tag::Zero, Tag::Zero) => {
            (FpReg::indefinite(), flags | ExnFlags::INVALID, false)
        }
        (Tag::Infinity, _) => (FpReg::infinity(sign), flags, false),
        (_, Tag::Infinity) => (FpReg::zero(sign), flags, false),
        (Tag::Zero, _) => (FpReg::zero(sign), flags, false),
        (_, Tag::Zero) => {
            // Dividing a denormal by zero: hardware reports the denormal
            // operand, the documented behavior reports the zero divide.
            if quirk == QuirkMode::Strict {
                flags -= ExnFlags::DENORMAL;
            }
            (FpReg::infinity(sign), flags | ExnFlags::ZERO_DIVIDE, false)
        }
        (Tag::Valid, Tag::Valid) => {
            let n = (a.sig as u128) << 64;
            let d = b.sig as u128;
            let q1 = n / d;
            let r1 = n % d;
            let q2 = (r1 << 2) / d;
            let r2 = (r1 << 2) % d;
            let q = (q1 << 2) | q2;
            // q carries 66 or 67 significant bits; place its top at bit 127.
            let (frame, exp) = if q >> 66 != 0 {
                (q << 61, a.exp - b.exp + EXP_BIAS)
            } else {
                (q << 62, a.exp - b.exp + EXP_BIAS - 1)
            };
            let raw = RawResult {
                sign,
                exp,
                hi: (frame >> 64) as u64,
                lo: frame as u64,
                sticky: r2 != 0,
            };
            let (r, f, up) = round(&raw, cw);
            (r, flags | f, up)
        }
        _ => (FpReg::indefinite(), flags | ExnFlags::INVALID, false),
    }
}
