//! Transcendental library.
//!
//! All kernels evaluate bounded series in 128-bit significand arithmetic
//! ([`poly::Ext`]) and hand the final value to the rounding engine at full
//! 64-bit precision; precision control does not apply here. The long
//! constants these functions need are computed once at startup from integer
//! series, see [`consts`].

pub mod atan;
pub mod consts;
pub mod exp2;
pub mod log2;
pub mod poly;
pub mod sincos;

use crate::words::ControlWord;

/// Transcendental results always round at 64 bits regardless of the
/// precision-control field.
pub(crate) fn full_precision(cw: &ControlWord) -> ControlWord {
    ControlWord(cw.0 | 0x0300)
}
