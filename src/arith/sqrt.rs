//! Square root, bit-by-bit over the wide integer type.

use super::denormal_flag;
use crate::ext::{Wide, wide_sqrt};
use crate::reg::{EXP_BIAS, FpReg, Sign, Tag};
use crate::round::{RawResult, round};
use crate::words::{ControlWord, ExnFlags};

pub fn sqrt(a: &FpReg, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    match a.tag {
        Tag::NaN => {
            if a.is_signaling() {
                (a.quieted(), ExnFlags::INVALID, false)
            } else {
                (*a, ExnFlags::empty(), false)
            }
        }
        // Both zeros keep their sign.
        Tag::Zero => (*a, ExnFlags::empty(), false),
        Tag::Infinity => {
            if a.sign == Sign::Pos {
                (*a, ExnFlags::empty(), false)
            } else {
                (FpReg::indefinite(), ExnFlags::INVALID, false)
            }
        }
        Tag::Valid => {
            if a.sign == Sign::Neg {
                return (FpReg::indefinite(), ExnFlags::INVALID, false);
            }
            let flags = denormal_flag(&[a]);
            // value = sig * 2^k; shift the radicand so the scaled exponent
            // is even and the root carries two guard bits past 64.
            let k = a.exp - EXP_BIAS - 63;
            let s = 68 + (k & 1) as u32;
            let radicand = Wide::from_u64(a.sig).shl(s);
            let (root, rem) = wide_sqrt(&radicand);
            let raw = RawResult {
                sign: Sign::Pos,
                exp: (k - s as i32) / 2 + EXP_BIAS + 127,
                hi: root.limb[1],
                lo: root.limb[0],
                sticky: !rem.is_zero(),
            };
            let (r, f, up) = round(&raw, cw);
            (r, flags | f, up)
        }
        Tag::Empty => (FpReg::indefinite(), ExnFlags::INVALID, false),
    }
}
