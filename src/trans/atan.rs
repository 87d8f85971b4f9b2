//! Two-argument arctangent.
//!
//! The ratio is folded into [0, 1] by reciprocal, then halved three times
//! with atan(a) = 2 atan(a / (1 + sqrt(1 + a^2))) to land inside the series
//! radius. Quadrant placement follows the operand signs, so the zero and
//! infinity cases line up with atan2.

use crate::arith::{denormal_flag, propagate_nan};
use crate::reg::{FpReg, Sign, Tag};
use crate::round::round;
use crate::trans::consts::PI;
use crate::trans::full_precision;
use crate::trans::poly::{Ext, atan_series};
use crate::words::{ControlWord, ExnFlags};

fn rounded(v: &Ext, sign: Sign, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    let signed = Ext { sign, ..*v };
    round(&signed.to_raw(), &full_precision(cw))
}

/// FPATAN: atan(y / x) placed in the quadrant of (x, y). The dispatcher
/// stores the result over st1 and pops.
pub fn fpatan(y: &FpReg, x: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    if y.is_nan() || x.is_nan() {
        let (r, flags) = propagate_nan(y, x);
        return (r, flags, false);
    }
    if y.is_empty() || x.is_empty() {
        return (FpReg::indefinite(), ExnFlags::INVALID, false);
    }
    let flags = denormal_flag(&[y, x]);
    let half_pi = PI.scaled(-1);
    let quarter_pi = PI.scaled(-2);

    let (r, f, up) = match (y.tag, x.tag) {
        // A zero ratio keeps the sign of y; a negative x swings it to pi.
        (Tag::Zero, _) | (Tag::Valid, Tag::Infinity) => {
            if x.sign == Sign::Pos {
                (FpReg::zero(y.sign), ExnFlags::empty(), false)
            } else {
                rounded(&PI, y.sign, cw)
            }
        }
        (Tag::Infinity, Tag::Infinity) => {
            if x.sign == Sign::Pos {
                rounded(&quarter_pi, y.sign, cw)
            } else {
                rounded(&PI.sub(&quarter_pi), y.sign, cw)
            }
        }
        (Tag::Infinity, _) | (Tag::Valid, Tag::Zero) => rounded(&half_pi, y.sign, cw),
        (Tag::Valid, Tag::Valid) => {
            let ay = Ext::from_reg(y).abs();
            let ax = Ext::from_reg(x).abs();
            let ratio = ay.div(&ax);
            // Fold ratios above one through the reciprocal.
            let (mut a, recip) = if ratio.exp >= 0 {
                (ax.div(&ay), true)
            } else {
                (ratio, false)
            };
            for _ in 0..3 {
                let s = Ext::one().add(&a.mul(&a)).sqrt();
                a = a.div(&Ext::one().add(&s));
            }
            let mut t = atan_series(&a).scaled(3);
            if recip {
                t = half_pi.sub(&t);
            }
            if x.sign == Sign::Neg {
                t = PI.sub(&t);
            }
            rounded(&t, y.sign, cw)
        }
        // Tags are exhaustive above; anything else would be empty.
        _ => (FpReg::indefinite(), ExnFlags::INVALID, false),
    };
    (r, flags | f, up)
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
    fn test_all_quadrants() {
        for (y, x) in [
            (1.0f64, 2.0f64),
            (1.0, -2.0),
            (-1.0, 2.0),
            (-1.0, -2.0),
            (3.0, 0.5),
            (0.001, 1000.0),
            (7.25, 7.25),
        ] {
            let (r, _, _) = fpatan(&v(y), &v(x), &cw());
            close(f(&r), y.atan2(x));
        }
    }

    #[test]
    fn test_extreme_ratio() {
        let (r, _, _) = fpatan(&v(1e300), &v(1e-300), &cw());
        close(f(&r), std::f64::consts::FRAC_PI_2);
        let (r, _, _) = fpatan(&v(1e-300), &v(1e300), &cw());
        close(f(&r), 1e-300 / 1e300);
    }

    #[test]
    fn test_zero_rules() {
        let pz = FpReg::zero(Sign::Pos);
        let nz = FpReg::zero(Sign::Neg);
        // atan2(+-0, x > 0) keeps the zero.
        let (r, flags, _) = fpatan(&pz, &v(3.0), &cw());
        assert_eq!(r, pz);
        assert!(flags.is_empty());
        let (r, _, _) = fpatan(&nz, &v(3.0), &cw());
        assert_eq!(r, nz);
        // Negative x side lands on +-pi, no invalid even for (0, -0).
        let (r, flags, _) = fpatan(&pz, &v(-3.0), &cw());
        close(f(&r), std::f64::consts::PI);
        assert!(!flags.contains(ExnFlags::INVALID));
        let (r, _, _) = fpatan(&nz, &nz, &cw());
        close(f(&r), -std::f64::consts::PI);
        let (r, _, _) = fpatan(&pz, &pz, &cw());
        assert_eq!(r, pz);
    }

    #[test]
    fn test_infinity_rules() {
        let inf = FpReg::infinity(Sign::Pos);
        let (r, _, _) = fpatan(&inf, &v(5.0), &cw());
        close(f(&r), std::f64::consts::FRAC_PI_2);
        let (r, _, _) = fpatan(&inf.negated(), &v(5.0), &cw());
        close(f(&r), -std::f64::consts::FRAC_PI_2);
        let (r, _, _) = fpatan(&inf, &inf, &cw());
        close(f(&r), std::f64::consts::FRAC_PI_4);
        let (r, _, _) = fpatan(&inf, &inf.negated(), &cw());
        close(f(&r), 3.0 * std::f64::consts::FRAC_PI_4);
        let (r, _, _) = fpatan(&v(1.0), &inf, &cw());
        assert_eq!(r, FpReg::zero(Sign::Pos));
        let (r, _, _) = fpatan(&v(1.0), &inf.negated(), &cw());
        close(f(&r), std::f64::consts::PI);
        let (r, _, _) = fpatan(&v(1.0), &FpReg::zero(Sign::Pos), &cw());
        close(f(&r), std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_nan_propagation() {
        let q = FpReg::nan(Sign::Pos, 0xC000_0000_0000_0005);
        let (r, flags, _) = fpatan(&q, &v(1.0), &cw());
        assert_eq!(r.sig, q.sig);
        assert!(flags.is_empty());
        let s = FpReg::nan(Sign::Neg, crate::reg::SIG_MSB | 3);
        let (r, flags, _) = fpatan(&v(1.0), &s, &cw());
        assert!(!r.is_signaling());
        assert!(flags.contains(ExnFlags::INVALID));
    }
}
