//! 128-bit significand arithmetic and the bounded series kernels.
//!
//! `Ext` is a sign/exponent/128-bit-significand triple used as the working
//! type of every transcendental evaluation: double the target precision, so
//! a few dozen truncated operations still leave the final 64-bit rounding
//! correct to about one ulp. Operations truncate (no sticky tracking); the
//! discarded tail sits near 2^-128 relative, far below the target.

use crate::ext::{Wide, wide_sqrt};
use crate::reg::{EXP_BIAS, FpReg, Sign, Tag};
use crate::round::RawResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Ext {
    pub sign: Sign,
    /// Unbiased exponent: value = significand/2^127 * 2^exp.
    pub exp: i32,
    pub hi: u64,
    pub lo: u64,
}

impl Ext {
    pub const ZERO: Ext = Ext {
        sign: Sign::Pos,
        exp: 0,
        hi: 0,
        lo: 0,
    };

    pub fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    fn v(&self) -> u128 {
        ((self.hi as u128) << 64) | self.lo as u128
    }

    /// Normalize a raw (sign, exponent-of-bit-127, value) triple.
    pub fn norm(sign: Sign, exp: i32, v: u128) -> Ext {
        if v == 0 {
            return Ext { sign, ..Ext::ZERO };
        }
        let lz = v.leading_zeros();
        let v = v << lz;
        Ext {
            sign,
            exp: exp - lz as i32,
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }

    pub fn from_u64(sign: Sign, n: u64) -> Ext {
        Ext::norm(sign, 63, (n as u128) << 64)
    }

    pub fn one() -> Ext {
        Ext::from_u64(Sign::Pos, 1)
    }

    /// Finite register value (Valid or Zero tag) into working form.
    pub fn from_reg(r: &FpReg) -> Ext {
        match r.tag {
            Tag::Zero => Ext {
                sign: r.sign,
                ..Ext::ZERO
            },
            _ => {
                debug_assert!(r.tag == Tag::Valid);
                Ext {
                    sign: r.sign,
                    exp: r.exp - EXP_BIAS,
                    hi: r.sig,
                    lo: 0,
                }
            }
        }
    }

    pub fn to_raw(&self) -> RawResult {
        RawResult {
            sign: self.sign,
            exp: self.exp + EXP_BIAS,
            hi: self.hi,
            lo: self.lo,
            sticky: false,
        }
    }

    pub fn neg(&self) -> Ext {
        Ext {
            sign: self.sign.flip(),
            ..*self
        }
    }

    pub fn abs(&self) -> Ext {
        Ext {
            sign: Sign::Pos,
            ..*self
        }
    }

    pub fn scaled(&self, k: i32) -> Ext {
        if self.is_zero() {
            return *self;
        }
        Ext {
            exp: self.exp + k,
            ..*self
        }
    }

    pub fn mul(&self, o: &Ext) -> Ext {
        if self.is_zero() || o.is_zero() {
            return Ext {
                sign: self.sign.xor(o.sign),
                ..Ext::ZERO
            };
        }
        let (ah, al) = (self.hi as u128, self.lo as u128);
        let (bh, bl) = (o.hi as u128, o.lo as u128);
        let ll = al * bl;
        let (mid, mc) = (ah * bl).overflowing_add(al * bh);
        let (low, lc) = ll.overflowing_add(mid << 64);
        let high = ah * bh + (mid >> 64) + ((mc as u128) << 64) + lc as u128;
        // Top bit of the 256-bit product is at 255 or 254.
        let (v, exp) = if high >> 127 != 0 {
            (high, self.exp + o.exp + 1)
        } else {
            ((high << 1) | (low >> 127), self.exp + o.exp)
        };
        Ext {
            sign: self.sign.xor(o.sign),
            exp,
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }

    /// Full 128-bit quotient by restoring division.
    pub fn div(&self, o: &Ext) -> Ext {
        debug_assert!(!o.is_zero());
        if self.is_zero() {
            return Ext {
                sign: self.sign.xor(o.sign),
                ..Ext::ZERO
            };
        }
        let num = self.v();
        let den = o.v();
        let (mut rem, mut q, steps, exp) = if num >= den {
            (num - den, 1u128, 127u32, self.exp - o.exp)
        } else {
            (num, 0u128, 128u32, self.exp - o.exp - 1)
        };
        for _ in 0..steps {
            let carry = rem >> 127;
            rem <<= 1;
            q <<= 1;
            if carry != 0 || rem >= den {
                rem = rem.wrapping_sub(den);
                q |= 1;
            }
        }
        Ext {
            sign: self.sign.xor(o.sign),
            exp,
            hi: (q >> 64) as u64,
            lo: q as u64,
        }
    }

    pub fn div_small(&self, d: u64) -> Ext {
        debug_assert!(d != 0);
        if self.is_zero() {
            return *self;
        }
        let v = self.v();
        let q = v / d as u128;
        let r = v % d as u128;
        let q2 = ((r << 64) / d as u128) as u64;
        let lz = q.leading_zeros();
        let v = if lz == 0 {
            q
        } else {
            (q << lz) | (q2 as u128) >> (64 - lz)
        };
        Ext {
            sign: self.sign,
            exp: self.exp - lz as i32,
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }

    pub fn add(&self, o: &Ext) -> Ext {
        if self.is_zero() {
            return *o;
        }
        if o.is_zero() {
            return *self;
        }
        let (a, b) = if (self.exp, self.v()) >= (o.exp, o.v()) {
            (self, o)
        } else {
            (o, self)
        };
        let diff = a.exp - b.exp;
        if diff > 130 {
            return *a;
        }
        let bv = b.v() >> diff.min(127) >> (diff - diff.min(127));
        if a.sign == b.sign {
            let (v, carry) = a.v().overflowing_add(bv);
            if carry {
                Ext {
                    sign: a.sign,
                    exp: a.exp + 1,
                    hi: ((v >> 65) as u64) | (1 << 63),
                    lo: (v >> 1) as u64,
                }
            } else {
                Ext {
                    sign: a.sign,
                    exp: a.exp,
                    hi: (v >> 64) as u64,
                    lo: v as u64,
                }
            }
        } else {
            Ext::norm(a.sign, a.exp, a.v() - bv)
        }
    }

    pub fn sub(&self, o: &Ext) -> Ext {
        self.add(&o.neg())
    }

    /// Square root over the wide integer type.
    pub fn sqrt(&self) -> Ext {
        debug_assert!(self.sign == Sign::Pos);
        if self.is_zero() {
            return *self;
        }
        // Scale the radicand so its exponent is even; the root then carries
        // 96 bits.
        let (radicand, k) = if (self.exp - 191) & 1 == 0 {
            (
                Wide {
                    limb: [0, self.lo, self.hi],
                },
                self.exp - 191,
            )
        } else {
            (
                Wide {
                    limb: [self.lo << 63, (self.hi << 63) | (self.lo >> 1), self.hi >> 1],
                },
                self.exp - 190,
            )
        };
        let (root, _) = wide_sqrt(&radicand);
        let r = ((root.limb[1] as u128) << 64) | root.limb[0] as u128;
        Ext::norm(Sign::Pos, k / 2 + 95, r << 32)
    }
}

/// sin(u) for u in [0, 0.79], Taylor series.
pub(crate) fn sin_series(u: &Ext) -> Ext {
    if u.is_zero() {
        return *u;
    }
    let u2 = u.mul(u);
    let mut term = *u;
    let mut sum = *u;
    for k in 1..26u64 {
        term = term.mul(&u2).div_small(2 * k * (2 * k + 1)).neg();
        if term.is_zero() || term.exp < sum.exp - 140 {
            break;
        }
        sum = sum.add(&term);
    }
    sum
}

/// cos(u) for u in [0, 0.79].
pub(crate) fn cos_series(u: &Ext) -> Ext {
    let u2 = u.mul(u);
    let mut term = Ext::one();
    let mut sum = Ext::one();
    for k in 1..26u64 {
        term = term.mul(&u2).div_small((2 * k - 1) * (2 * k)).neg();
        if term.is_zero() || term.exp < sum.exp - 140 {
            break;
        }
        sum = sum.add(&term);
    }
    sum
}

/// atan(r) for |r| <= 0.2.
pub(crate) fn atan_series(r: &Ext) -> Ext {
    if r.is_zero() {
        return *r;
    }
    let r2 = r.mul(r);
    let mut power = *r;
    let mut sum = *r;
    for k in 1..34u64 {
        power = power.mul(&r2).neg();
        let term = power.div_small(2 * k + 1);
        if term.is_zero() || term.exp < sum.exp - 140 {
            break;
        }
        sum = sum.add(&term);
    }
    sum
}

/// artanh(s) for |s| <= 1/3.
pub(crate) fn artanh_series(s: &Ext) -> Ext {
    if s.is_zero() {
        return *s;
    }
    let s2 = s.mul(s);
    let mut power = *s;
    let mut sum = *s;
    for k in 1..46u64 {
        power = power.mul(&s2);
        let term = power.div_small(2 * k + 1);
        if term.is_zero() || term.exp < sum.exp - 140 {
            break;
        }
        sum = sum.add(&term);
    }
    sum
}

/// e^w - 1 for |w| <= 0.7.
pub(crate) fn expm1_series(w: &Ext) -> Ext {
    if w.is_zero() {
        return *w;
    }
    let mut term = *w;
    let mut sum = *w;
    for k in 2..40u64 {
        term = term.mul(w).div_small(k);
        if term.is_zero() || term.exp < sum.exp - 140 {
            break;
        }
        sum = sum.add(&term);
    }
    sum
}
