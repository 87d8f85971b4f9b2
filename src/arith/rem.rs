//! Partial remainder: the truncating form and the IEEE round-to-nearest form.
//!
//! When the exponent gap fits 63 bits the remainder is computed exactly in
//! one u128 divide and the low three quotient bits are reported through
//! C0/C3/C1. A larger gap takes a partial step against the divisor scaled
//! up to the dividend, leaves C2 set, and the caller reissues the
//! instruction.

use super::{denormal_flag, propagate_nan};
use crate::reg::{EXP_BIAS, FpReg, Sign, Tag};
use crate::words::{ControlWord, ExnFlags};

pub struct RemOutcome {
    pub result: FpReg,
    pub flags: ExnFlags,
    pub c0: bool,
    pub c1: bool,
    pub c2: bool,
    pub c3: bool,
}

impl RemOutcome {
    fn done(result: FpReg, flags: ExnFlags, q: u64) -> RemOutcome {
        RemOutcome {
            result,
            flags,
            c0: q & 4 != 0,
            c1: q & 1 != 0,
            c2: false,
            c3: q & 2 != 0,
        }
    }
}

/// `st0 rem st1`. `to_nearest` selects the IEEE form; otherwise the quotient
/// truncates toward zero.
pub fn fprem(st0: &FpReg, st1: &FpReg, to_nearest: bool, cw: &ControlWord) -> RemOutcome {
    if st0.is_nan() || st1.is_nan() {
        let (r, flags) = propagate_nan(st0, st1);
        return RemOutcome::done(r, flags, 0);
    }
    let mut flags = denormal_flag(&[st0, st1]);

    match (st0.tag, st1.tag) {
        (Tag::Infinity, _) | (_, Tag::Zero) => {
            RemOutcome::done(FpReg::indefinite(), flags | ExnFlags::INVALID, 0)
        }
        // A huge divisor leaves the dividend untouched, exactly.
        (_, Tag::Infinity) | (Tag::Zero, _) => RemOutcome::done(*st0, flags, 0),
        (Tag::Valid, Tag::Valid) => {
            let d = st0.exp - st1.exp;
            if d <= 63 {
                let (result, q) = exact_step(st0, st1, d, to_nearest);
                if result.is_tiny() && !cw.is_masked(ExnFlags::UNDERFLOW) {
                    flags |= ExnFlags::UNDERFLOW;
                }
                RemOutcome::done(result, flags, q)
            } else {
                let result = partial_step(st0, st1);
                RemOutcome {
                    result,
                    flags,
                    c0: false,
                    c1: false,
                    c2: true,
                    c3: false,
                }
            }
        }
        _ => RemOutcome::done(FpReg::indefinite(), flags | ExnFlags::INVALID, 0),
    }
}

/// Exact remainder when the quotient fits 64 bits. Returns the (possibly
/// sign-flipped) remainder and the integer quotient magnitude.
fn exact_step(st0: &FpReg, st1: &FpReg, d: i32, to_nearest: bool) -> (FpReg, u64) {
    if d < 0 {
        // |st0| < |st1| / 2 always holds at d <= -2; at d = -1 the nearest
        // form may still fold once.
        if to_nearest && d == -1 && st0.sig > st1.sig {
            // |st0| > |st1|/2: fold once. The exact midpoint stays put,
            // quotient 1 being odd.
            let rem = (((st1.sig as u128) << 1) - st0.sig as u128) as u64;
            return (build(st0.sign.flip(), st1.exp - 1, rem), 1);
        }
        return (*st0, 0);
    }
    let n = (st0.sig as u128) << d;
    let ds = st1.sig as u128;
    let mut q = (n / ds) as u64;
    let mut rem = n % ds;
    let mut sign = st0.sign;
    if to_nearest {
        let fold = rem
            .checked_mul(2)
            .map(|twice| twice > ds || (twice == ds && q & 1 != 0))
            .unwrap_or(true);
        if fold {
            q = q.wrapping_add(1);
            rem = ds - rem;
            sign = sign.flip();
        }
    }
    if rem == 0 {
        return (FpReg::zero(st0.sign), q);
    }
    (build(sign, st1.exp, rem as u64), q)
}

/// One chopping step against the divisor scaled within 62 exponents of the
/// dividend; the remaining gap shrinks by about 62 per call.
fn partial_step(st0: &FpReg, st1: &FpReg) -> FpReg {
    let n = (st0.sig as u128) << 62;
    let ds = st1.sig as u128;
    let rem = n % ds;
    if rem == 0 {
        return FpReg::zero(st0.sign);
    }
    build(st0.sign, st0.exp - 62, rem as u64)
}

/// Normalize a sub-divisor remainder: value = rem * 2^(exp - bias - 63).
fn build(sign: Sign, exp: i32, rem: u64) -> FpReg {
    let lz = rem.leading_zeros();
    FpReg::finite(sign, exp - lz as i32, rem << lz)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::convert::real::load_f64;
    use crate::reg::SIG_MSB;

    fn cw() -> ControlWord {
        ControlWord::default()
    }

    fn v(x: f64) -> FpReg {
        load_f64(x.to_bits()).0
    }

    #[test]
    fn test_truncating_quotient_bits() {
        // 17 rem 5 = 2, quotient 3: C3 and C1 set, C0 clear.
        let out = fprem(&v(17.0), &v(5.0), false, &cw());
        assert_eq!(out.result, v(2.0));
        assert!(!out.c0 && out.c1 && out.c3 && !out.c2);
        // 20 rem 5 = 0, quotient 4: bit 2 -> C0.
        let out = fprem(&v(20.0), &v(5.0), false, &cw());
        assert_eq!(out.result, FpReg::zero(Sign::Pos));
        assert!(out.c0 && !out.c1 && !out.c3);
    }

    #[test]
    fn test_sign_follows_dividend() {
        let out = fprem(&v(-17.0), &v(5.0), false, &cw());
        assert_eq!(out.result, v(-2.0));
        let out = fprem(&v(17.0), &v(-5.0), false, &cw());
        assert_eq!(out.result, v(2.0));
    }

    #[test]
    fn test_nearest_form_folds() {
        // 17 = 3*5 + 2 truncating; nearest quotient also 3 (2 < 2.5).
        let out = fprem(&v(17.0), &v(5.0), true, &cw());
        assert_eq!(out.result, v(2.0));
        // 18 = 4*5 - 2 under nearest: remainder goes negative.
        let out = fprem(&v(18.0), &v(5.0), true, &cw());
        assert_eq!(out.result, v(-2.0));
        assert!(out.c0 && !out.c1 && !out.c3); // quotient 4
        // Midpoint 7.5 rem 5: quotient rounds to the even 2.
        let out = fprem(&v(7.5), &v(5.0), true, &cw());
        assert_eq!(out.result, v(-2.5));
    }

    #[test]
    fn test_small_dividend_passthrough() {
        let out = fprem(&v(1.0), &v(8.0), false, &cw());
        assert_eq!(out.result, v(1.0));
        assert!(!out.c2);
        // Nearest form at half the divisor magnitude folds upward.
        let out = fprem(&v(3.0), &v(4.0), true, &cw());
        assert_eq!(out.result, v(-1.0));
    }

    #[test]
    fn test_partial_step_sets_c2() {
        let big = FpReg::finite(Sign::Pos, EXP_BIAS + 100, SIG_MSB);
        let out = fprem(&big, &v(3.0), false, &cw());
        assert!(out.c2);
        // The gap shrinks enough for the next step to make progress.
        assert!(out.result.exp - v(3.0).exp < 100);
        let again = fprem(&out.result, &v(3.0), false, &cw());
        // 2^100 mod 3 = 1 eventually; every intermediate stays exact.
        let _ = again;
    }

    #[test]
    fn test_specials() {
        let out = fprem(&FpReg::infinity(Sign::Pos), &v(2.0), false, &cw());
        assert_eq!(out.result, FpReg::indefinite());
        assert!(out.flags.contains(ExnFlags::INVALID));
        let out = fprem(&v(2.0), &FpReg::zero(Sign::Pos), false, &cw());
        assert_eq!(out.result, FpReg::indefinite());
        assert!(out.flags.contains(ExnFlags::INVALID));
        let out = fprem(&v(2.0), &FpReg::infinity(Sign::Neg), false, &cw());
        assert_eq!(out.result, v(2.0));
        let out = fprem(&FpReg::zero(Sign::Neg), &v(2.0), false, &cw());
        assert_eq!(out.result, FpReg::zero(Sign::Neg));
    }
}
