//! Exact wide-width integer arithmetic.
//!
//! Everything above this module (rounding, arithmetic core, transcendental
//! kernels) funnels its exact intermediates through [`Wide`], a 192-bit
//! unsigned integer stored as three little-endian limbs. All operations are
//! total within the fixed width; exponent-range discipline is the caller's
//! problem, and a width overflow here is a programming defect, not a runtime
//! condition.

/// 192-bit unsigned integer, little-endian limbs (`limb[0]` least significant).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Wide {
    pub limb: [u64; 3],
}

pub const WIDE_BITS: u32 = 192;

impl Wide {
    pub const ZERO: Wide = Wide { limb: [0; 3] };

    pub const fn from_u64(v: u64) -> Self {
        Wide { limb: [v, 0, 0] }
    }

    /// `1 << n` for `n < 192`.
    pub const fn one_shl(n: u32) -> Self {
        let mut limb = [0u64; 3];
        limb[(n / 64) as usize] = 1u64 << (n % 64);
        Wide { limb }
    }

    pub fn is_zero(&self) -> bool {
        self.limb == [0, 0, 0]
    }

    pub fn bit(&self, n: u32) -> bool {
        (self.limb[(n / 64) as usize] >> (n % 64)) & 1 != 0
    }

    pub fn leading_zeros(&self) -> u32 {
        for i in (0..3).rev() {
            if self.limb[i] != 0 {
                return (2 - i as u32) * 64 + self.limb[i].leading_zeros();
            }
        }
        WIDE_BITS
    }

    /// Addition; the returned flag is the carry out of bit 191.
    pub fn add(&self, rhs: &Wide) -> (Wide, bool) {
        let mut out = Wide::ZERO;
        let mut carry = false;
        for i in 0..3 {
            let (s, c1) = self.limb[i].overflowing_add(rhs.limb[i]);
            let (s, c2) = s.overflowing_add(carry as u64);
            out.limb[i] = s;
            carry = c1 || c2;
        }
        (out, carry)
    }

    /// Subtraction; the returned flag is the borrow out of bit 191.
    pub fn sub(&self, rhs: &Wide) -> (Wide, bool) {
        let mut out = Wide::ZERO;
        let mut borrow = false;
        for i in 0..3 {
            let (d, b1) = self.limb[i].overflowing_sub(rhs.limb[i]);
            let (d, b2) = d.overflowing_sub(borrow as u64);
            out.limb[i] = d;
            borrow = b1 || b2;
        }
        (out, borrow)
    }

    pub fn cmp_wide(&self, rhs: &Wide) -> core::cmp::Ordering {
        for i in (0..3).rev() {
            match self.limb[i].cmp(&rhs.limb[i]) {
                core::cmp::Ordering::Equal => continue,
                other => return other,
            }
        }
        core::cmp::Ordering::Equal
    }

    pub fn geq(&self, rhs: &Wide) -> bool {
        !matches!(self.cmp_wide(rhs), core::cmp::Ordering::Less)
    }

    /// Logical left shift; bits shifted past bit 191 are lost.
    pub fn shl(&self, shift: u32) -> Wide {
        if shift == 0 {
            return *self;
        }
        if shift >= WIDE_BITS {
            return Wide::ZERO;
        }
        let mut out = Wide::ZERO;
        let limb_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in (limb_shift..3).rev() {
            let src = i - limb_shift;
            let mut v = self.limb[src] << bit_shift;
            if bit_shift != 0 && src > 0 {
                v |= self.limb[src - 1] >> (64 - bit_shift);
            }
            out.limb[i] = v;
        }
        out
    }

    /// Logical right shift, OR-reducing every shifted-out bit into the
    /// returned sticky flag.
    pub fn shr_sticky(&self, shift: u32) -> (Wide, bool) {
        if shift == 0 {
            return (*self, false);
        }
        if shift >= WIDE_BITS {
            return (Wide::ZERO, !self.is_zero());
        }
        let mut sticky = false;
        let limb_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for i in 0..limb_shift {
            sticky |= self.limb[i] != 0;
        }
        if bit_shift != 0 {
            sticky |= self.limb[limb_shift] & ((1u64 << bit_shift) - 1) != 0;
        }
        let mut out = Wide::ZERO;
        for i in 0..(3 - limb_shift) {
            let src = i + limb_shift;
            let mut v = self.limb[src] >> bit_shift;
            if bit_shift != 0 && src + 1 < 3 {
                v |= self.limb[src + 1] << (64 - bit_shift);
            }
            out.limb[i] = v;
        }
        (out, sticky)
    }

    /// Left-shift until bit 191 is set, returning the shift count.
    /// Zero stays zero with a count of [`WIDE_BITS`].
    pub fn normalize(&self) -> (Wide, u32) {
        let lz = self.leading_zeros();
        if lz == WIDE_BITS {
            return (*self, WIDE_BITS);
        }
        (self.shl(lz), lz)
    }

    /// Exact 64×64→128 product placed into the low limbs.
    pub fn mul64(a: u64, b: u64) -> Wide {
        let p = a as u128 * b as u128;
        Wide {
            limb: [p as u64, (p >> 64) as u64, 0],
        }
    }

    /// Multiply by a small factor; the returned flag reports overflow past
    /// bit 191.
    pub fn mul_small(&self, m: u64) -> (Wide, bool) {
        let mut out = Wide::ZERO;
        let mut carry: u64 = 0;
        for i in 0..3 {
            let p = self.limb[i] as u128 * m as u128 + carry as u128;
            out.limb[i] = p as u64;
            carry = (p >> 64) as u64;
        }
        (out, carry != 0)
    }

    /// Exact division by a small divisor, yielding quotient and remainder.
    /// `d` must be nonzero.
    pub fn div_small(&self, d: u64) -> (Wide, u64) {
        debug_assert!(d != 0);
        let mut out = Wide::ZERO;
        let mut rem: u64 = 0;
        for i in (0..3).rev() {
            let cur = ((rem as u128) << 64) | self.limb[i] as u128;
            out.limb[i] = (cur / d as u128) as u64;
            rem = (cur % d as u128) as u64;
        }
        (out, rem)
    }

    pub fn low_u64(&self) -> u64 {
        self.limb[0]
    }

    /// Top 128 bits as a significand pair (bit 191 maps to bit 127), with a
    /// sticky flag for the discarded low limb.
    pub fn top128_sticky(&self) -> (u64, u64, bool) {
        (self.limb[2], self.limb[1], self.limb[0] != 0)
    }
}

/// Integer square root of a `Wide`, bit-by-bit restoring method.
/// Returns `(floor(sqrt(x)), remainder)`; the root occupies at most 96 bits.
pub fn wide_sqrt(x: &Wide) -> (Wide, Wide) {
    let mut rem = *x;
    let mut root = Wide::ZERO;
    // Highest even bit position.
    let mut bit = Wide::one_shl(190);
    while !bit.is_zero() {
        let (trial, _) = root.add(&bit);
        if rem.geq(&trial) {
            let (r, borrow) = rem.sub(&trial);
            debug_assert!(!borrow);
            rem = r;
            let (half, _) = root.shr_sticky(1);
            let (next, _) = half.add(&bit);
            root = next;
        } else {
            let (half, _) = root.shr_sticky(1);
            root = half;
        }
        let (b, _) = bit.shr_sticky(2);
        bit = b;
    }
    (root, rem)
}
