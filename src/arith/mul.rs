//! Multiplication.

use super::{denormal_flag, propagate_nan};
use crate::reg::{EXP_BIAS, FpReg, Tag};
use crate::round::{RawResult, round};
use crate::words::{ControlWord, ExnFlags};

pub fn mul(a: &FpReg, b: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    if a.is_nan() || b.is_nan() {
        let (r, flags) = propagate_nan(a, b);
        return (r, flags, false);
    }
    let flags = denormal_flag(&[a, b]);
    let sign = a.sign.xor(b.sign);

    match (a.tag, b.tag) {
        (Tag::Infinity, Tag::Zero) | (Tag::Zero, Tag::Infinity) => {
            (FpReg::indefinite(), flags | ExnFlags::INVALID, false)
        }
        (Tag::Infinity, _) | (_, Tag::Infinity) => (FpReg::infinity(sign), flags, false),
        (Tag::Zero, _) | (_, Tag::Zero) => (FpReg::zero(sign), flags, false),
        (Tag::Valid, Tag::Valid) => {
            let p = a.sig as u128 * b.sig as u128;
            let raw = RawResult {
                sign,
                exp: a.exp + b.exp - EXP_BIAS + 1,
                hi: (p >> 64) as u64,
                lo: p as u64,
                sticky: false,
            };
            let (r, f, up) = round(&raw, cw);
            (r, flags | f, up)
        }
        _ => (FpReg::indefinite(), flags | ExnFlags::INVALID, false),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reg::{SIG_MSB, Sign};

    fn cw() -> ControlWord {
        ControlWord::default()
    }

    #[test]
    fn test_exact_products() {
        let two = FpReg::finite(Sign::Pos, EXP_BIAS + 1, SIG_MSB);
        let three = FpReg::finite(Sign::Pos, EXP_BIAS + 1, 0xC000_0000_0000_0000);
        let (r, flags, _) = mul(&two, &three, &cw());
        assert_eq!(r, FpReg::finite(Sign::Pos, EXP_BIAS + 2, 0xC000_0000_0000_0000));
        assert!(flags.is_empty());
        // Sign rules.
        let (r, _, _) = mul(&two.negated(), &three, &cw());
        assert_eq!(r.sign, Sign::Neg);
        let (r, _, _) = mul(&two.negated(), &three.negated(), &cw());
        assert_eq!(r.sign, Sign::Pos);
    }

    #[test]
    fn test_inexact_product() {
        // (1 + 2^-63)^2 = 1 + 2^-62 + 2^-126: the last term is lost.
        let x = FpReg::finite(Sign::Pos, EXP_BIAS, SIG_MSB | 1);
        let (r, flags, up) = mul(&x, &x, &cw());
        assert_eq!(r, FpReg::finite(Sign::Pos, EXP_BIAS, SIG_MSB | 2));
        assert!(flags.contains(ExnFlags::PRECISION));
        assert!(!up);
    }

    #[test]
    fn test_zero_and_infinity() {
        let zero = FpReg::zero(Sign::Neg);
        let inf = FpReg::infinity(Sign::Pos);
        let one = FpReg::finite(Sign::Pos, EXP_BIAS, SIG_MSB);
        let (r, flags, _) = mul(&zero, &inf, &cw());
        assert_eq!(r, FpReg::indefinite());
        assert!(flags.contains(ExnFlags::INVALID));
        assert_eq!(mul(&zero, &one, &cw()).0, FpReg::zero(Sign::Neg));
        assert_eq!(mul(&inf, &one.negated(), &cw()).0, FpReg::infinity(Sign::Neg));
    }

    #[test]
    fn test_overflow_to_infinity() {
        let big = FpReg::finite(Sign::Pos, crate::reg::EXP_MAX, SIG_MSB);
        let two = FpReg::finite(Sign::Pos, EXP_BIAS + 1, SIG_MSB);
        let (r, flags, _) = mul(&big, &two, &cw());
        assert_eq!(r.tag, Tag::Infinity);
        assert!(flags.contains(ExnFlags::OVERFLOW | ExnFlags::PRECISION));
    }

    #[test]
    fn test_underflow_denormalizes() {
        let tiny = FpReg::finite(Sign::Pos, crate::reg::EXP_MIN, SIG_MSB);
        let half = FpReg::finite(Sign::Pos, EXP_BIAS - 1, SIG_MSB);
        let (r, flags, _) = mul(&tiny, &half, &cw());
        // Exact result representable as a denormal: no flags, kept
        // normalized internally.
        assert_eq!(r, FpReg::finite(Sign::Pos, crate::reg::EXP_MIN - 1, SIG_MSB));
        assert!(flags.is_empty());
    }
}
