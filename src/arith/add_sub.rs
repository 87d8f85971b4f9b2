//! Addition and subtraction.

use super::{denormal_flag, propagate_nan};
use crate::reg::{FpReg, Sign, Tag};
use crate::round::{RawResult, round};
use crate::utils::shr128_sticky;
use crate::words::{ControlWord, ExnFlags, RoundMode};

pub fn add(a: &FpReg, b: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    add_signed(a, b, false, cw)
}

pub fn sub(a: &FpReg, b: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    add_signed(a, b, true, cw)
}

fn add_signed(a: &FpReg, b: &FpReg, negate_b: bool, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    if a.is_nan() || b.is_nan() {
        let (r, flags) = propagate_nan(a, b);
        return (r, flags, false);
    }
    let mut flags = denormal_flag(&[a, b]);
    let b = if negate_b { b.negated() } else { *b };

    match (a.tag, b.tag) {
        (Tag::Infinity, Tag::Infinity) => {
            if a.sign == b.sign {
                (*a, flags, false)
            } else {
                // inf - inf
                (FpReg::indefinite(), flags | ExnFlags::INVALID, false)
            }
        }
        (Tag::Infinity, _) => (*a, flags, false),
        (_, Tag::Infinity) => (b, flags, false),
        (Tag::Zero, Tag::Zero) => {
            let sign = if a.sign == b.sign {
                a.sign
            } else if cw.rounding() == RoundMode::Down {
                Sign::Neg
            } else {
                Sign::Pos
            };
            (FpReg::zero(sign), flags, false)
        }
        (Tag::Zero, Tag::Valid) => {
            let (r, f, up) = round(&RawResult::from_sig64(b.sign, b.exp, b.sig), cw);
            (r, flags | f, up)
        }
        (Tag::Valid, Tag::Zero) => {
            let (r, f, up) = round(&RawResult::from_sig64(a.sign, a.exp, a.sig), cw);
            (r, flags | f, up)
        }
        (Tag::Valid, Tag::Valid) => {
            let (r, f, up) = add_finite(a, &b, cw);
            (r, flags | f, up)
        }
        // Empty operands were substituted before dispatch.
        _ => (FpReg::indefinite(), flags | ExnFlags::INVALID, false),
    }
}

fn add_finite(a: &FpReg, b: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    // Order by magnitude so the smaller operand is the one shifted.
    let (big, small) = if a.exp > b.exp || (a.exp == b.exp && a.sig >= b.sig) {
        (a, b)
    } else {
        (b, a)
    };
    let diff = (big.exp - small.exp).min(192) as u32;
    let (shi, slo, st) = shr128_sticky(small.sig, 0, diff.min(128));
    // Jam the lost bits into the low bit; rounding decisions survive it.
    let sv = (((shi as u128) << 64) | slo as u128) | (st || diff > 128) as u128;
    let bv = (big.sig as u128) << 64;

    if big.sign == small.sign {
        let (v, carry) = bv.overflowing_add(sv);
        let (v, exp) = if carry {
            ((v >> 1) | (1 << 127) | (v & 1), big.exp + 1)
        } else {
            (v, big.exp)
        };
        let raw = RawResult {
            sign: big.sign,
            exp,
            hi: (v >> 64) as u64,
            lo: v as u64,
            sticky: false,
        };
        round(&raw, cw)
    } else {
        let v = bv - sv;
        if v == 0 {
            // Exact cancellation: +0, except -0 when rounding down.
            let sign = if cw.rounding() == RoundMode::Down {
                Sign::Neg
            } else {
                Sign::Pos
            };
            return (FpReg::zero(sign), ExnFlags::empty(), false);
        }
        let raw = RawResult {
            sign: big.sign,
            exp: big.exp,
            hi: (v >> 64) as u64,
            lo: v as u64,
            sticky: false,
        };
        round(&raw, cw)
    }
}
