//! 2^x - 1.
//!
//! The operand is scaled by ln 2 and fed to the exp-minus-one series, which
//! keeps the result accurate when x is near zero and the subtraction of one
//! would otherwise cancel. The documented domain is [-1, 1]; operands outside
//! it pass through untouched.

use crate::arith::denormal_flag;
use crate::reg::{EXP_BIAS, FpReg, SIG_MSB, Sign, Tag};
use crate::round::round;
use crate::trans::consts::LN2;
use crate::trans::full_precision;
use crate::trans::poly::{Ext, expm1_series};
use crate::words::{ControlWord, ExnFlags};

/// F2XM1.
pub fn f2xm1(a: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    match a.tag {
        Tag::NaN => {
            let flags = if a.is_signaling() {
                ExnFlags::INVALID
            } else {
                ExnFlags::empty()
            };
            (a.quieted(), flags, false)
        }
        Tag::Empty => (FpReg::indefinite(), ExnFlags::INVALID, false),
        // 2^inf - 1 saturates; 2^-inf - 1 is exactly -1.
        Tag::Infinity => {
            if a.sign == Sign::Pos {
                (*a, ExnFlags::empty(), false)
            } else {
                (FpReg::finite(Sign::Neg, EXP_BIAS, SIG_MSB), ExnFlags::empty(), false)
            }
        }
        Tag::Zero => (*a, ExnFlags::empty(), false),
        Tag::Valid => {
            let flags = denormal_flag(&[a]);
            if a.exp > EXP_BIAS || (a.exp == EXP_BIAS && a.sig > SIG_MSB) {
                // Outside the domain the operand comes back unchanged.
                return (*a, flags, false);
            }
            let w = Ext::from_reg(a).mul(&LN2);
            let r = expm1_series(&w);
            let (r, f, up) = round(&r.to_raw(), &full_precision(cw));
            (r, flags | f, up)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::convert::real::{load_f64, store_f64};

    fn cw() -> ControlWord {
        ControlWord::default()
    }

    fn v(x: f64) -> FpReg {
        load_f64(x.to_bits()).0
    }

    fn f(r: &FpReg) -> f64 {
        let (bits, _, _) = store_f64(r, &cw());
        f64::from_bits(bits)
    }

    fn close(a: f64, b: f64) {
        assert!((a - b).abs() <= b.abs() * 1e-14 + 1e-300, "{a} vs {b}");
    }

    #[test]
    fn test_values() {
        for x in [0.5f64, -0.5, 0.001, -0.001, 0.99, -0.99, 1e-30] {
            let (r, _, _) = f2xm1(&v(x), &cw());
            close(f(&r), x.exp2() - 1.0);
        }
    }

    #[test]
    fn test_endpoints_exact() {
        let (r, _, _) = f2xm1(&v(1.0), &cw());
        close(f(&r), 1.0);
        let (r, _, _) = f2xm1(&v(-1.0), &cw());
        close(f(&r), -0.5);
    }

    #[test]
    fn test_domain_and_specials() {
        // Outside [-1, 1] the operand passes through.
        let (r, flags, _) = f2xm1(&v(3.0), &cw());
        assert_eq!(r, v(3.0));
        assert!(flags.is_empty());
        let (r, _, _) = f2xm1(&v(-100.0), &cw());
        assert_eq!(r, v(-100.0));

        let (r, _, _) = f2xm1(&FpReg::infinity(Sign::Pos), &cw());
        assert_eq!(r, FpReg::infinity(Sign::Pos));
        let (r, _, _) = f2xm1(&FpReg::infinity(Sign::Neg), &cw());
        assert_eq!(f(&r), -1.0);
        let z = FpReg::zero(Sign::Neg);
        let (r, flags, _) = f2xm1(&z, &cw());
        assert_eq!(r, z);
        assert!(flags.is_empty());
    }
}
