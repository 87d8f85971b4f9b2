//! Sine, cosine, and tangent.
//!
//! Arguments below 2^63 in magnitude are reduced modulo pi/2 against the
//! 192-bit fixed-point constant, so the reduction itself never loses bits the
//! series could see. Larger arguments are reported back unreduced; the
//! dispatcher sets C2 and leaves the stack alone.

use crate::arith::denormal_flag;
use crate::reg::{EXP_BIAS, FpReg, Sign, Tag};
use crate::round::round;
use crate::trans::consts::{PI_OVER_2, PI_OVER_4, wide_q190_to_ext};
use crate::trans::full_precision;
use crate::trans::poly::{Ext, cos_series, sin_series};
use crate::words::{ControlWord, ExnFlags};

/// Argument folded into [0, pi/4] with its quadrant count.
struct Reduced {
    u: Ext,
    quadrant: u8,
    /// Whether the residue was reflected about pi/4 (u stands for pi/2 - r).
    folded: bool,
}

/// Reduce |x| = n * pi/2 + r. Doubling the operand mantissa one exponent bit
/// at a time with a conditional subtract keeps the residue exact at the Q190
/// scale; the quotient only matters modulo 4.
fn reduce(x: &FpReg) -> Reduced {
    let e = x.exp - EXP_BIAS;
    if e <= -2 {
        // Below 1/2, already inside the first half-quadrant.
        return Reduced {
            u: Ext::from_reg(&x.with_sign(Sign::Pos)),
            quadrant: 0,
            folded: false,
        };
    }
    let p = *PI_OVER_2;
    // Mantissa in Q190: value in [1, 2) for e >= 0, [1/2, 1) for e = -1.
    let mut w = if e >= 0 {
        crate::ext::Wide {
            limb: [0, x.sig << 63, x.sig >> 1],
        }
    } else {
        crate::ext::Wide {
            limb: [0, x.sig << 62, x.sig >> 2],
        }
    };
    let mut n: u64 = 0;
    if w.geq(&p) {
        w = w.sub(&p).0;
        n = 1;
    }
    for _ in 0..e.max(0) {
        w = w.shl(1);
        n <<= 1;
        if w.geq(&p) {
            w = w.sub(&p).0;
            n |= 1;
        }
    }
    let folded = w.cmp_wide(&PI_OVER_4) == core::cmp::Ordering::Greater;
    if folded {
        w = p.sub(&w).0;
        n += 1;
    }
    let u = if w.is_zero() {
        Ext::ZERO
    } else {
        wide_q190_to_ext(&w)
    };
    Reduced {
        u,
        quadrant: (n & 3) as u8,
        folded,
    }
}

/// (sin |x|, cos |x|) from the reduced argument, by quadrant identity.
fn sin_cos_mag(r: &Reduced) -> (Ext, Ext) {
    let s0 = sin_series(&r.u);
    let c0 = cos_series(&r.u);
    // Reflection swaps the roles of sin and cos of the residue; the quadrant
    // increment it came with flips one sign back.
    let s = if r.folded { s0.neg() } else { s0 };
    match r.quadrant {
        0 => (s, c0),
        1 => (c0, s.neg()),
        2 => (s.neg(), c0.neg()),
        _ => (c0.neg(), s),
    }
}

/// Class handling shared by all four entry points. `Ok` carries the operand
/// through to the reduction; `Err` is the finished special-case answer.
fn trig_special(a: &FpReg) -> Result<ExnFlags, (FpReg, ExnFlags)> {
    match a.tag {
        Tag::NaN => {
            let flags = if a.is_signaling() {
                ExnFlags::INVALID
            } else {
                ExnFlags::empty()
            };
            Err((a.quieted(), flags))
        }
        Tag::Infinity => Err((FpReg::indefinite(), ExnFlags::INVALID)),
        Tag::Empty => Err((FpReg::indefinite(), ExnFlags::INVALID)),
        _ => Ok(denormal_flag(&[a])),
    }
}

fn out_of_range(a: &FpReg) -> bool {
    a.tag == Tag::Valid && a.exp - EXP_BIAS >= 63
}

/// FSIN. `None` means the operand was too large to reduce: the caller sets
/// C2 and leaves st0 in place.
pub fn fsin(a: &FpReg, cw: &ControlWord) -> Option<(FpReg, ExnFlags, bool)> {
    if out_of_range(a) {
        return None;
    }
    let flags = match trig_special(a) {
        Ok(f) => f,
        Err((r, f)) => return Some((r, f, false)),
    };
    if a.tag == Tag::Zero {
        return Some((*a, flags, false));
    }
    let (s, _) = sin_cos_mag(&reduce(a));
    let s = if a.sign == Sign::Neg { s.neg() } else { s };
    let (r, f, up) = round(&s.to_raw(), &full_precision(cw));
    Some((r, flags | f, up))
}

/// FCOS.
pub fn fcos(a: &FpReg, cw: &ControlWord) -> Option<(FpReg, ExnFlags, bool)> {
    if out_of_range(a) {
        return None;
    }
    let flags = match trig_special(a) {
        Ok(f) => f,
        Err((r, f)) => return Some((r, f, false)),
    };
    if a.tag == Tag::Zero {
        return Some((crate::reg::consts::one(), flags, false));
    }
    let (_, c) = sin_cos_mag(&reduce(a));
    let (r, f, up) = round(&c.to_raw(), &full_precision(cw));
    Some((r, flags | f, up))
}

/// FSINCOS: sine replaces st0, cosine is pushed on top. The caller verifies
/// push space first.
pub fn fsincos(a: &FpReg, cw: &ControlWord) -> Option<(FpReg, FpReg, ExnFlags, bool)> {
    if out_of_range(a) {
        return None;
    }
    let flags = match trig_special(a) {
        Ok(f) => f,
        Err((r, f)) => return Some((r, r, f, false)),
    };
    if a.tag == Tag::Zero {
        return Some((*a, crate::reg::consts::one(), flags, false));
    }
    let (s, c) = sin_cos_mag(&reduce(a));
    let s = if a.sign == Sign::Neg { s.neg() } else { s };
    let (rs, fs, up_s) = round(&s.to_raw(), &full_precision(cw));
    let (rc, fc, up_c) = round(&c.to_raw(), &full_precision(cw));
    Some((rs, rc, flags | fs | fc, up_s || up_c))
}

/// FPTAN: tangent replaces st0 and the dispatcher pushes +1.0 on top.
pub fn fptan(a: &FpReg, cw: &ControlWord) -> Option<(FpReg, ExnFlags, bool)> {
    if out_of_range(a) {
        return None;
    }
    let flags = match trig_special(a) {
        Ok(f) => f,
        Err((r, f)) => return Some((r, f, false)),
    };
    if a.tag == Tag::Zero {
        return Some((*a, flags, false));
    }
    let (s, c) = sin_cos_mag(&reduce(a));
    let s = if a.sign == Sign::Neg { s.neg() } else { s };
    // The residue stays clear of pi/2, so the cosine never vanishes.
    let t = s.div(&c);
    let (r, f, up) = round(&t.to_raw(), &full_precision(cw));
    Some((r, flags | f, up))
}
