//! Arithmetic core: the basic operations on register values.
//!
//! Every dyadic operation classifies the full tag pair before touching
//! significands. The functions here are pure value transforms returning
//! `(result, flags, round_up)`; operand fetch, masked/unmasked commit, and
//! condition-code writes happen in the dispatcher.

pub mod add_sub;
pub mod compare;
pub mod div;
pub mod misc;
pub mod mul;
pub mod rem;
pub mod sqrt;

use crate::reg::FpReg;
use crate::words::ExnFlags;

/// Denormal-operand detection: register values kept normalized below the
/// normal range count as denormal operands.
pub(crate) fn denormal_flag(ops: &[&FpReg]) -> ExnFlags {
    if ops.iter().any(|r| r.is_tiny()) {
        ExnFlags::DENORMAL
    } else {
        ExnFlags::empty()
    }
}

/// NaN propagation for dyadic operations. When both operands are NaN the
/// first one wins; a signaling operand raises the invalid exception and the
/// chosen NaN is quieted.
pub(crate) fn propagate_nan(a: &FpReg, b: &FpReg) -> (FpReg, ExnFlags) {
    debug_assert!(a.is_nan() || b.is_nan());
    let flags = if a.is_signaling() || b.is_signaling() {
        ExnFlags::INVALID
    } else {
        ExnFlags::empty()
    };
    let chosen = if a.is_nan() { a } else { b };
    (chosen.quieted(), flags)
}
