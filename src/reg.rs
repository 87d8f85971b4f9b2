//! Register values.
//!
//! A register holds a sign, a class tag, a biased exponent kept in an `i32`
//! (so wide intermediate exponents never clip), and a 64-bit significand with
//! the integer bit explicit. Values whose biased exponent is `<= 0` stay
//! normalized in the register; they are denormalized only when stored to the
//! 80-bit memory format.

use core::fmt;

pub const EXP_BIAS: i32 = 16383;
/// Largest biased exponent of a finite extended value.
pub const EXP_MAX: i32 = 0x7FFE;
/// Smallest biased exponent of a normal extended value.
pub const EXP_MIN: i32 = 1;
pub const SIG_MSB: u64 = 1 << 63;
/// Quiet bit of a NaN significand.
pub const QNAN_BIT: u64 = 1 << 62;
/// Significand of the real indefinite quiet NaN.
pub const INDEFINITE_SIG: u64 = 0xC000_0000_0000_0000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Sign {
    Pos,
    Neg,
}

impl Sign {
    pub fn of_bit(bit: bool) -> Sign {
        if bit { Sign::Neg } else { Sign::Pos }
    }

    pub fn bit(self) -> bool {
        self == Sign::Neg
    }

    pub fn xor(self, other: Sign) -> Sign {
        Sign::of_bit(self.bit() != other.bit())
    }

    pub fn flip(self) -> Sign {
        Sign::of_bit(!self.bit())
    }
}

/// Value class. Kept per register; the packed tag word is derived from it,
/// never the other way around.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tag {
    Valid,
    Zero,
    Infinity,
    NaN,
    Empty,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FpReg {
    pub sign: Sign,
    pub tag: Tag,
    /// Biased exponent (bias 16383). Meaningful only for `Tag::Valid`.
    pub exp: i32,
    /// Significand, integer bit explicit in bit 63.
    pub sig: u64,
}

impl FpReg {
    pub const fn empty() -> FpReg {
        FpReg {
            sign: Sign::Pos,
            tag: Tag::Empty,
            exp: 0,
            sig: 0,
        }
    }

    pub fn zero(sign: Sign) -> FpReg {
        FpReg {
            sign,
            tag: Tag::Zero,
            exp: 0,
            sig: 0,
        }
    }

    pub fn infinity(sign: Sign) -> FpReg {
        FpReg {
            sign,
            tag: Tag::Infinity,
            exp: EXP_MAX + 1,
            sig: SIG_MSB,
        }
    }

    /// The real indefinite: the quiet NaN substituted for every masked
    /// invalid-operation result.
    pub fn indefinite() -> FpReg {
        FpReg {
            sign: Sign::Neg,
            tag: Tag::NaN,
            exp: EXP_MAX + 1,
            sig: INDEFINITE_SIG,
        }
    }

    pub fn nan(sign: Sign, sig: u64) -> FpReg {
        FpReg {
            sign,
            tag: Tag::NaN,
            exp: EXP_MAX + 1,
            sig,
        }
    }

    /// A finite nonzero value; `sig` must have bit 63 set.
    pub fn finite(sign: Sign, exp: i32, sig: u64) -> FpReg {
        debug_assert!(sig & SIG_MSB != 0);
        FpReg {
            sign,
            tag: Tag::Valid,
            exp,
            sig,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tag == Tag::Empty
    }

    pub fn is_nan(&self) -> bool {
        self.tag == Tag::NaN
    }

    /// Signaling NaN: the quiet bit of the significand is clear.
    pub fn is_signaling(&self) -> bool {
        self.tag == Tag::NaN && self.sig & QNAN_BIT == 0
    }

    pub fn quieted(&self) -> FpReg {
        debug_assert!(self.tag == Tag::NaN);
        FpReg {
            sig: self.sig | QNAN_BIT,
            ..*self
        }
    }

    /// Whether a finite value would be denormal in the 80-bit memory format.
    pub fn is_tiny(&self) -> bool {
        self.tag == Tag::Valid && self.exp < EXP_MIN
    }

    pub fn negated(&self) -> FpReg {
        FpReg {
            sign: self.sign.flip(),
            ..*self
        }
    }

    pub fn with_sign(&self, sign: Sign) -> FpReg {
        FpReg { sign, ..*self }
    }
}

impl fmt::Display for FpReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = if self.sign.bit() { "-" } else { "+" };
        match self.tag {
            Tag::Empty => write!(f, "<empty>"),
            Tag::Zero => write!(f, "{s}0"),
            Tag::Infinity => write!(f, "{s}inf"),
            Tag::NaN => write!(f, "{s}nan({:#018x})", self.sig),
            Tag::Valid => write!(f, "{s}{:#018x}p{}", self.sig, self.exp - EXP_BIAS),
        }
    }
}

/// Built-in load constants, rounded to 64 significand bits to nearest-even.
pub mod consts {
    use super::{EXP_BIAS, FpReg, Sign};

    pub fn one() -> FpReg {
        FpReg::finite(Sign::Pos, EXP_BIAS, 0x8000_0000_0000_0000)
    }

    /// log2(10)
    pub fn l2t() -> FpReg {
        FpReg::finite(Sign::Pos, EXP_BIAS + 1, 0xD49A_784B_CD1B_8AFE)
    }

    /// log2(e)
    pub fn l2e() -> FpReg {
        FpReg::finite(Sign::Pos, EXP_BIAS, 0xB8AA_3B29_5C17_F0BC)
    }

    /// pi
    pub fn pi() -> FpReg {
        FpReg::finite(Sign::Pos, EXP_BIAS + 1, 0xC90F_DAA2_2168_C235)
    }

    /// log10(2)
    pub fn lg2() -> FpReg {
        FpReg::finite(Sign::Pos, EXP_BIAS - 2, 0x9A20_9A84_FBCF_F799)
    }

    /// ln(2)
    pub fn ln2() -> FpReg {
        FpReg::finite(Sign::Pos, EXP_BIAS - 1, 0xB172_17F7_D1CF_79AC)
    }

    pub fn zero() -> FpReg {
        FpReg::zero(Sign::Pos)
    }
}
