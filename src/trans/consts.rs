//! Long constants, computed once at startup.
//!
//! Nothing here is transcribed: pi comes from Machin's formula and ln 2 from
//! the artanh series, both evaluated in 192-bit fixed point with the wide
//! integer primitives. The fixed-point scale is Q190 (bit 190 is the units
//! bit), which holds pi/2 with two bits to spare.

use lazy_static::lazy_static;

use crate::ext::Wide;
use crate::reg::Sign;
use crate::trans::poly::Ext;

lazy_static! {
    /// pi/2 in Q190.
    pub(crate) static ref PI_OVER_2: Wide = compute_pi().shr_sticky(1).0;
    /// pi/4 in Q190.
    pub(crate) static ref PI_OVER_4: Wide = compute_pi().shr_sticky(2).0;
    /// ln 2.
    pub(crate) static ref LN2: Ext = wide_q190_to_ext(&compute_ln2());
    /// log2 e = 1 / ln 2.
    pub(crate) static ref LOG2_E: Ext = Ext::one().div(&LN2);
    /// pi as a working value.
    pub(crate) static ref PI: Ext = wide_q190_to_ext(&compute_pi());
}

/// Q190 fixed point into a working value: v = w * 2^-190.
pub(crate) fn wide_q190_to_ext(w: &Wide) -> Ext {
    let (n, lz) = w.normalize();
    let (hi, lo, _) = n.top128_sticky();
    Ext::norm(Sign::Pos, 1 - lz as i32, ((hi as u128) << 64) | lo as u128)
}

/// Machin: pi = 16 atan(1/5) - 4 atan(1/239), accumulated in Q188 and
/// rescaled to pi/2 in Q190 by the callers above.
fn compute_pi() -> Wide {
    let a = atan_inv_q188(5);
    let b = atan_inv_q188(239);
    let (a16, _) = a.shl(4).sub(&b.shl(2));
    // Rescale Q188 to Q190; pi * 2^190 still fits 192 bits.
    a16.shl(2)
}

/// atan(1/x) in Q188 by the alternating Gregory series.
fn atan_inv_q188(x: u64) -> Wide {
    let mut power = Wide::one_shl(188).div_small(x).0;
    let mut sum = power;
    let xx = x * x;
    let mut k = 1u64;
    let mut negative = true;
    loop {
        power = power.div_small(xx).0;
        if power.is_zero() {
            break;
        }
        let (term, _) = power.div_small(2 * k + 1);
        sum = if negative {
            sum.sub(&term).0
        } else {
            sum.add(&term).0
        };
        negative = !negative;
        k += 1;
    }
    sum
}

/// ln 2 = 2 artanh(1/3) in Q190.
fn compute_ln2() -> Wide {
    let mut power = Wide::one_shl(190).div_small(3).0;
    let mut sum = power;
    let mut k = 1u64;
    loop {
        power = power.div_small(9).0;
        if power.is_zero() {
            break;
        }
        let (term, _) = power.div_small(2 * k + 1);
        let (s, _) = sum.add(&term);
        sum = s;
        k += 1;
    }
    // The series gave artanh(1/3) at Q190; doubling gives ln 2.
    sum.shl(1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pi_over_2_digits() {
        // pi/2 * 2^190 has pi * 2^61 in its top limb.
        assert_eq!(PI_OVER_2.limb[2], 0x6487_ED51_10B4_611A);
        assert_eq!(PI_OVER_2.limb[1] >> 32, 0x6263_3145);
        // pi/4 is one shift down.
        assert_eq!(PI_OVER_4.limb[2], 0x3243_F6A8_885A_308D);
    }

    #[test]
    fn test_ln2_digits() {
        assert_eq!(LN2.exp, -1);
        assert_eq!(LN2.hi, 0xB172_17F7_D1CF_79AB);
        assert_eq!(LN2.lo >> 8, 0x00C9_E3B3_9803_F2F6);
    }

    #[test]
    fn test_log2_e_digits() {
        assert_eq!(LOG2_E.exp, 0);
        assert_eq!(LOG2_E.hi, 0xB8AA_3B29_5C17_F0BB);
        assert_eq!(LOG2_E.lo >> 8, 0x00BE_87FE_D069_1D3E);
    }

    #[test]
    fn test_pi_value() {
        assert_eq!(PI.exp, 1);
        assert_eq!(PI.hi, 0xC90F_DAA2_2168_C234);
    }
}
