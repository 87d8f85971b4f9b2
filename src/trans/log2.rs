//! Base-two logarithms.
//!
//! ln x comes from the artanh identity ln x = 2 artanh((x-1)/(x+1)). For
//! operands inside [1/2, 2) the quotient is formed from the operand itself,
//! which keeps x near one free of cancellation; elsewhere the exponent is
//! split off first and the identity runs on the mantissa alone.

use crate::arith::{denormal_flag, propagate_nan};
use crate::reg::{EXP_BIAS, FpReg, SIG_MSB, Sign, Tag};
use crate::round::round;
use crate::trans::consts::LOG2_E;
use crate::trans::full_precision;
use crate::trans::poly::{Ext, artanh_series};
use crate::words::{ControlWord, ExnFlags};

fn is_one(x: &FpReg) -> bool {
    x.tag == Tag::Valid && x.sign == Sign::Pos && x.exp == EXP_BIAS && x.sig == SIG_MSB
}

/// Magnitude strictly above one.
fn mag_above_one(x: &FpReg) -> bool {
    x.exp > EXP_BIAS || (x.exp == EXP_BIAS && x.sig > SIG_MSB)
}

/// log2 of a positive finite operand.
fn log2_ext(x: &FpReg) -> Ext {
    let one = Ext::one();
    let e = x.exp - EXP_BIAS;
    if e == 0 || e == -1 {
        let xe = Ext::from_reg(&x.with_sign(Sign::Pos));
        let s = xe.sub(&one).div(&xe.add(&one));
        return artanh_series(&s).scaled(1).mul(&LOG2_E);
    }
    let m = Ext::norm(Sign::Pos, 0, (x.sig as u128) << 64);
    let s = m.sub(&one).div(&m.add(&one));
    let frac = artanh_series(&s).scaled(1).mul(&LOG2_E);
    let whole = Ext::from_u64(Sign::of_bit(e < 0), e.unsigned_abs() as u64);
    whole.add(&frac)
}

/// FYL2X: y * log2(x), stored over st1 with a pop. y is st1, x is st0.
pub fn fyl2x(y: &FpReg, x: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    if y.is_nan() || x.is_nan() {
        let (r, flags) = propagate_nan(y, x);
        return (r, flags, false);
    }
    if y.is_empty() || x.is_empty() {
        return (FpReg::indefinite(), ExnFlags::INVALID, false);
    }
    let flags = denormal_flag(&[y, x]);
    // The logarithm has no negative domain.
    if x.sign == Sign::Neg && x.tag != Tag::Zero {
        return (FpReg::indefinite(), flags | ExnFlags::INVALID, false);
    }
    let (r, f, up) = match (x.tag, y.tag) {
        (Tag::Zero, Tag::Zero) | (Tag::Infinity, Tag::Zero) => {
            (FpReg::indefinite(), ExnFlags::INVALID, false)
        }
        // log2 pole: the sign of y rides on -inf.
        (Tag::Zero, _) => (
            FpReg::infinity(y.sign.flip()),
            ExnFlags::ZERO_DIVIDE,
            false,
        ),
        (Tag::Infinity, _) => (FpReg::infinity(y.sign), ExnFlags::empty(), false),
        (Tag::Valid, _) if is_one(x) => {
            if y.tag == Tag::Infinity {
                (FpReg::indefinite(), ExnFlags::INVALID, false)
            } else {
                (FpReg::zero(y.sign), ExnFlags::empty(), false)
            }
        }
        (Tag::Valid, Tag::Zero) => {
            let log_sign = Sign::of_bit(x.exp < EXP_BIAS);
            (FpReg::zero(y.sign.xor(log_sign)), ExnFlags::empty(), false)
        }
        (Tag::Valid, Tag::Infinity) => {
            let log_sign = Sign::of_bit(x.exp < EXP_BIAS);
            (
                FpReg::infinity(y.sign.xor(log_sign)),
                ExnFlags::empty(),
                false,
            )
        }
        _ => {
            let l = log2_ext(x);
            let r = Ext::from_reg(y).mul(&l);
            round(&r.to_raw(), &full_precision(cw))
        }
    };
    (r, flags | f, up)
}

/// FYL2XP1: y * log2(1 + x). Accurate near zero, where forming 1 + x first
/// would wipe the operand out; the documented domain is |x| < 1 - sqrt(2)/2.
pub fn fyl2xp1(y: &FpReg, x: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    if y.is_nan() || x.is_nan() {
        let (r, flags) = propagate_nan(y, x);
        return (r, flags, false);
    }
    if y.is_empty() || x.is_empty() {
        return (FpReg::indefinite(), ExnFlags::INVALID, false);
    }
    let flags = denormal_flag(&[y, x]);
    let (r, f, up) = match x.tag {
        Tag::Infinity => {
            if x.sign == Sign::Neg || y.tag == Tag::Zero {
                (FpReg::indefinite(), ExnFlags::INVALID, false)
            } else {
                (FpReg::infinity(y.sign), ExnFlags::empty(), false)
            }
        }
        Tag::Zero => {
            if y.tag == Tag::Infinity {
                (FpReg::indefinite(), ExnFlags::INVALID, false)
            } else {
                (FpReg::zero(y.sign.xor(x.sign)), ExnFlags::empty(), false)
            }
        }
        _ => {
            if x.sign == Sign::Neg && mag_above_one(x) {
                // 1 + x below zero.
                (FpReg::indefinite(), ExnFlags::INVALID, false)
            } else if x.sign == Sign::Neg && is_one(&x.with_sign(Sign::Pos)) {
                // 1 + x is exactly zero: same pole as log2(0).
                if y.tag == Tag::Zero {
                    (FpReg::indefinite(), ExnFlags::INVALID, false)
                } else {
                    (
                        FpReg::infinity(y.sign.flip()),
                        ExnFlags::ZERO_DIVIDE,
                        false,
                    )
                }
            } else if y.tag == Tag::Zero {
                (FpReg::zero(y.sign.xor(x.sign)), ExnFlags::empty(), false)
            } else if y.tag == Tag::Infinity {
                (FpReg::infinity(y.sign.xor(x.sign)), ExnFlags::empty(), false)
            } else {
                let xe = Ext::from_reg(x);
                let s = xe.div(&Ext::from_u64(Sign::Pos, 2).add(&xe));
                let l = artanh_series(&s).scaled(1).mul(&LOG2_E);
                let r = Ext::from_reg(y).mul(&l);
                round(&r.to_raw(), &full_precision(cw))
            }
        }
    };
    (r, flags | f, up)
}
