//! Rounding and precision engine.
//!
//! Every inexact producer funnels its exact intermediate through [`RawResult`]
//! and [`round`]: a sign, a biased exponent, a 128-bit significand (integer
//! bit at bit 127 once normalized) and a sticky flag covering everything
//! already discarded. `round` applies precision control, rounding control and
//! the masked overflow/underflow substitutions, and reports the flags plus
//! the round-up indication that lands in C1.

use crate::reg::{EXP_MAX, EXP_MIN, FpReg, Sign};
use crate::utils::{lz128, shr128_sticky};
use crate::words::{ControlWord, ExnFlags, RoundMode};

#[derive(Clone, Copy, Debug)]
pub struct RawResult {
    pub sign: Sign,
    /// Biased exponent of bit 127, i.e. value = (hi:lo) * 2^(exp - bias - 127).
    pub exp: i32,
    pub hi: u64,
    pub lo: u64,
    pub sticky: bool,
}

impl RawResult {
    /// Exact 64-bit significand placed in the high half.
    pub fn from_sig64(sign: Sign, exp: i32, sig: u64) -> RawResult {
        RawResult {
            sign,
            exp,
            hi: sig,
            lo: 0,
            sticky: false,
        }
    }
}

/// Outcome of rounding a normalized 128-bit frame at `keep` bits.
pub(crate) struct Rounded {
    /// The kept bits as an integer; bit `keep-1` is the integer bit unless
    /// the frame was denormal.
    pub q: u64,
    /// Significand wrapped to `1 << (keep-1)`; the exponent must grow by one.
    pub carry: bool,
    pub inexact: bool,
    pub up: bool,
}

/// Round `hi:lo` (+ sticky) to `keep` significand bits (1..=64).
pub(crate) fn round_at(
    sign: Sign,
    hi: u64,
    lo: u64,
    sticky: bool,
    keep: u32,
    rm: RoundMode,
) -> Rounded {
    debug_assert!((1..=64).contains(&keep));
    let (q, guard, rest) = if keep == 64 {
        (hi, lo & (1 << 63) != 0, lo & ((1 << 63) - 1) != 0 || sticky)
    } else {
        let q = hi >> (64 - keep);
        let guard = hi & (1 << (63 - keep)) != 0;
        let low_mask = (1u64 << (63 - keep)) - 1;
        (q, guard, hi & low_mask != 0 || lo != 0 || sticky)
    };
    let inexact = guard || rest;
    let up = match rm {
        RoundMode::Nearest => guard && (rest || q & 1 != 0),
        RoundMode::Down => sign == Sign::Neg && inexact,
        RoundMode::Up => sign == Sign::Pos && inexact,
        RoundMode::Chop => false,
    };
    if !up {
        return Rounded {
            q,
            carry: false,
            inexact,
            up,
        };
    }
    let (q, wrapped) = q.overflowing_add(1);
    let carry = wrapped || (keep < 64 && q == 1 << keep);
    let q = if carry { 1 << (keep - 1) } else { q };
    Rounded {
        q,
        carry,
        inexact,
        up,
    }
}

/// Round an exact intermediate under the given control word, yielding the
/// register value, the exception flags and the round-up bit for C1.
///
/// Overflow leaves the oversized exponent in place when unmasked (the caller
/// discards the value on report); underflow is detected on tininess before
/// rounding and, when masked, re-rounds at the denormal boundary and hands
/// back an internally renormalized value.
pub fn round(raw: &RawResult, cw: &ControlWord) -> (FpReg, ExnFlags, bool) {
    let mut flags = ExnFlags::empty();
    if raw.hi == 0 && raw.lo == 0 {
        if raw.sticky {
            flags |= ExnFlags::PRECISION;
        }
        return (FpReg::zero(raw.sign), flags, false);
    }
    let lz = lz128(raw.hi, raw.lo);
    let v = (((raw.hi as u128) << 64) | raw.lo as u128) << lz;
    let (hi, lo) = ((v >> 64) as u64, v as u64);
    let exp = raw.exp - lz as i32;

    let keep = cw.precision().keep_bits();
    let rm = cw.rounding();

    if exp < EXP_MIN && cw.is_masked(ExnFlags::UNDERFLOW) {
        let shift = (EXP_MIN - exp).min(128) as u32;
        let (dhi, dlo, s2) = shr128_sticky(hi, lo, shift);
        let r = round_at(raw.sign, dhi, dlo, raw.sticky || s2, keep, rm);
        if r.inexact {
            flags |= ExnFlags::UNDERFLOW | ExnFlags::PRECISION;
        }
        if r.q == 0 {
            return (FpReg::zero(raw.sign), flags, r.up);
        }
        let frame = if keep == 64 { r.q } else { r.q << (64 - keep) };
        let lz2 = frame.leading_zeros();
        return (
            FpReg::finite(raw.sign, EXP_MIN - lz2 as i32, frame << lz2),
            flags,
            r.up,
        );
    }

    let r = round_at(raw.sign, hi, lo, raw.sticky, keep, rm);
    if r.inexact {
        flags |= ExnFlags::PRECISION;
    }
    let exp = exp + r.carry as i32;
    let sig = if keep == 64 { r.q } else { r.q << (64 - keep) };

    if exp < EXP_MIN {
        // Unmasked underflow (the masked path returned above).
        flags |= ExnFlags::UNDERFLOW;
        return (FpReg::finite(raw.sign, exp, sig), flags, r.up);
    }
    if exp > EXP_MAX {
        flags |= ExnFlags::OVERFLOW | ExnFlags::PRECISION;
        if cw.is_masked(ExnFlags::OVERFLOW) {
            let to_inf = match rm {
                RoundMode::Nearest => true,
                RoundMode::Chop => false,
                RoundMode::Down => raw.sign == Sign::Neg,
                RoundMode::Up => raw.sign == Sign::Pos,
            };
            return if to_inf {
                (FpReg::infinity(raw.sign), flags, true)
            } else {
                let largest = u64::MAX << (64 - keep);
                (FpReg::finite(raw.sign, EXP_MAX, largest), flags, false)
            };
        }
        return (FpReg::finite(raw.sign, exp, sig), flags, r.up);
    }
    (FpReg::finite(raw.sign, exp, sig), flags, r.up)
}
