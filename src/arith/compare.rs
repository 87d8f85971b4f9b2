//! Ordered and unordered comparison.

use super::denormal_flag;
use crate::reg::{FpReg, Sign, Tag};
use crate::words::ExnFlags;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmpResult {
    Less,
    Equal,
    Greater,
    Unordered,
}

/// Numeric comparison; zeros compare equal regardless of sign.
pub fn compare(a: &FpReg, b: &FpReg) -> CmpResult {
    if a.is_nan() || b.is_nan() || a.is_empty() || b.is_empty() {
        return CmpResult::Unordered;
    }
    if a.tag == Tag::Zero && b.tag == Tag::Zero {
        return CmpResult::Equal;
    }
    // Distinct signs settle it (zero counts as either sign).
    let a_neg = a.sign == Sign::Neg && a.tag != Tag::Zero;
    let b_neg = b.sign == Sign::Neg && b.tag != Tag::Zero;
    if a_neg != b_neg {
        return if a_neg { CmpResult::Less } else { CmpResult::Greater };
    }
    let mag = magnitude_cmp(a, b);
    if a_neg { mag.reverse() } else { mag }
}

fn magnitude_cmp(a: &FpReg, b: &FpReg) -> CmpResult {
    use CmpResult::*;
    match (a.tag, b.tag) {
        (Tag::Zero, Tag::Zero) | (Tag::Infinity, Tag::Infinity) => Equal,
        (Tag::Zero, _) | (_, Tag::Infinity) => Less,
        (_, Tag::Zero) | (Tag::Infinity, _) => Greater,
        _ => match (a.exp, a.sig).cmp(&(b.exp, b.sig)) {
            core::cmp::Ordering::Less => Less,
            core::cmp::Ordering::Equal => Equal,
            core::cmp::Ordering::Greater => Greater,
        },
    }
}

impl CmpResult {
    fn reverse(self) -> CmpResult {
        match self {
            CmpResult::Less => CmpResult::Greater,
            CmpResult::Greater => CmpResult::Less,
            other => other,
        }
    }
}

/// Comparison with exception semantics. The ordered forms raise the invalid
/// exception for any NaN; the unordered forms only for a signaling one.
pub fn fcom(a: &FpReg, b: &FpReg, ordered: bool) -> (CmpResult, ExnFlags) {
    let mut flags = denormal_flag(&[a, b]);
    let has_nan = a.is_nan() || b.is_nan();
    let signaling = a.is_signaling() || b.is_signaling();
    if (ordered && has_nan) || signaling {
        flags |= ExnFlags::INVALID;
    }
    (compare(a, b), flags)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::convert::real::load_f64;
    use crate::reg::SIG_MSB;

    fn v(x: f64) -> FpReg {
        load_f64(x.to_bits()).0
    }

    #[test]
    fn test_ordering() {
        assert_eq!(compare(&v(1.0), &v(2.0)), CmpResult::Less);
        assert_eq!(compare(&v(2.0), &v(1.0)), CmpResult::Greater);
        assert_eq!(compare(&v(3.5), &v(3.5)), CmpResult::Equal);
        assert_eq!(compare(&v(-1.0), &v(1.0)), CmpResult::Less);
        assert_eq!(compare(&v(-1.0), &v(-2.0)), CmpResult::Greater);
    }

    #[test]
    fn test_zeros_equal() {
        assert_eq!(
            compare(&FpReg::zero(Sign::Neg), &FpReg::zero(Sign::Pos)),
            CmpResult::Equal
        );
        assert_eq!(compare(&FpReg::zero(Sign::Neg), &v(1.0)), CmpResult::Less);
        assert_eq!(compare(&v(-1.0), &FpReg::zero(Sign::Pos)), CmpResult::Less);
    }

    #[test]
    fn test_infinities() {
        let inf = FpReg::infinity(Sign::Pos);
        assert_eq!(compare(&inf, &v(1e300)), CmpResult::Greater);
        assert_eq!(compare(&inf.negated(), &v(-1e300)), CmpResult::Less);
        assert_eq!(compare(&inf, &inf), CmpResult::Equal);
        assert_eq!(compare(&inf.negated(), &inf), CmpResult::Less);
    }

    #[test]
    fn test_nan_semantics() {
        let q = FpReg::nan(Sign::Pos, 0xC000_0000_0000_0000);
        let s = FpReg::nan(Sign::Pos, SIG_MSB | 1);
        let (r, flags) = fcom(&q, &v(1.0), true);
        assert_eq!(r, CmpResult::Unordered);
        assert!(flags.contains(ExnFlags::INVALID));
        // Unordered compare tolerates quiet NaNs.
        let (r, flags) = fcom(&q, &v(1.0), false);
        assert_eq!(r, CmpResult::Unordered);
        assert!(flags.is_empty());
        let (_, flags) = fcom(&s, &v(1.0), false);
        assert!(flags.contains(ExnFlags::INVALID));
    }

    #[test]
    fn test_denormal_flagged() {
        let tiny = FpReg::finite(Sign::Pos, crate::reg::EXP_MIN - 1, SIG_MSB);
        let (r, flags) = fcom(&tiny, &v(1.0), true);
        assert_eq!(r, CmpResult::Less);
        assert!(flags.contains(ExnFlags::DENORMAL));
    }
}
