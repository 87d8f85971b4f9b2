//! Status, control, and tag word layouts plus the fault type reported for
//! unmasked exceptions.

use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use thiserror::Error;

bitflags! {
    /// Exception bits, shared between the status-word sticky field and the
    /// control-word mask field (same bit positions).
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct ExnFlags: u16 {
        const INVALID     = 1 << 0;
        const DENORMAL    = 1 << 1;
        const ZERO_DIVIDE = 1 << 2;
        const OVERFLOW    = 1 << 3;
        const UNDERFLOW   = 1 << 4;
        const PRECISION   = 1 << 5;
        /// Stack fault qualifier; always paired with INVALID.
        const STACK_FAULT = 1 << 6;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, TryFromPrimitive)]
#[repr(u16)]
pub enum RoundMode {
    Nearest = 0,
    Down = 1,
    Up = 2,
    Chop = 3,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, TryFromPrimitive)]
#[repr(u16)]
pub enum PrecisionMode {
    Single = 0,
    Reserved = 1,
    Double = 2,
    Extended = 3,
}

impl PrecisionMode {
    /// Significand bits kept by precision control.
    pub fn keep_bits(self) -> u32 {
        match self {
            PrecisionMode::Single => 24,
            // The reserved encoding behaves as double on real parts.
            PrecisionMode::Reserved | PrecisionMode::Double => 53,
            PrecisionMode::Extended => 64,
        }
    }
}

/// Control word: exception masks in bits 0..=5, precision control in bits
/// 8..=9, rounding control in bits 10..=11.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ControlWord(pub u16);

pub const CONTROL_DEFAULT: u16 = 0x037F;

impl Default for ControlWord {
    fn default() -> Self {
        ControlWord(CONTROL_DEFAULT)
    }
}

impl ControlWord {
    pub fn masks(&self) -> ExnFlags {
        ExnFlags::from_bits_truncate(self.0 & 0x3F)
    }

    pub fn is_masked(&self, exn: ExnFlags) -> bool {
        // STACK_FAULT shares the invalid mask.
        let exn = if exn.contains(ExnFlags::STACK_FAULT) {
            (exn - ExnFlags::STACK_FAULT) | ExnFlags::INVALID
        } else {
            exn
        };
        self.masks().contains(exn)
    }

    pub fn rounding(&self) -> RoundMode {
        match RoundMode::try_from((self.0 >> 10) & 0x3) {
            Ok(mode) => mode,
            Err(_) => unreachable!(),
        }
    }

    pub fn precision(&self) -> PrecisionMode {
        match PrecisionMode::try_from((self.0 >> 8) & 0x3) {
            Ok(mode) => mode,
            Err(_) => unreachable!(),
        }
    }
}

/// Status word: sticky exceptions in bits 0..=5, stack-fault in bit 6,
/// error summary in bit 7, C0..C3 in bits 8/9/10/14, top-of-stack in
/// bits 11..=13, busy in bit 15.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct StatusWord(pub u16);

pub const SW_C0: u16 = 1 << 8;
pub const SW_C1: u16 = 1 << 9;
pub const SW_C2: u16 = 1 << 10;
pub const SW_C3: u16 = 1 << 14;
pub const SW_ES: u16 = 1 << 7;

impl StatusWord {
    pub fn top(&self) -> u8 {
        ((self.0 >> 11) & 0x7) as u8
    }

    pub fn set_top(&mut self, top: u8) {
        self.0 = (self.0 & !(0x7 << 11)) | ((top as u16 & 0x7) << 11);
    }

    pub fn sticky(&self) -> ExnFlags {
        ExnFlags::from_bits_truncate(self.0 & 0x7F)
    }

    pub fn raise(&mut self, exn: ExnFlags) {
        self.0 |= exn.bits();
    }

    pub fn set_summary(&mut self) {
        self.0 |= SW_ES;
    }

    pub fn c0(&self) -> bool {
        self.0 & SW_C0 != 0
    }

    pub fn c1(&self) -> bool {
        self.0 & SW_C1 != 0
    }

    pub fn c2(&self) -> bool {
        self.0 & SW_C2 != 0
    }

    pub fn c3(&self) -> bool {
        self.0 & SW_C3 != 0
    }

    pub fn set_cc(&mut self, bit: u16, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    /// Clear C0..C3 ahead of an operation that redefines them.
    pub fn clear_cc(&mut self) {
        self.0 &= !(SW_C0 | SW_C1 | SW_C2 | SW_C3);
    }
}

/// Unmasked-exception report. The destination is never modified when one of
/// these is returned; the sticky bit and the error-summary bit are already
/// set in the status word.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpuFault {
    #[error("invalid operation")]
    Invalid,
    #[error("denormal operand")]
    Denormal,
    #[error("divide by zero")]
    ZeroDivide,
    #[error("numeric overflow")]
    Overflow,
    #[error("numeric underflow")]
    Underflow,
    #[error("inexact result")]
    Precision,
    #[error("illegal opcode {opcode:#04x} modrm {modrm:#04x}")]
    IllegalInstruction { opcode: u8, modrm: u8 },
}

impl FpuFault {
    /// Highest-priority unmasked flag, in the architectural report order.
    pub fn from_flags(flags: ExnFlags) -> Option<FpuFault> {
        if flags.intersects(ExnFlags::INVALID | ExnFlags::STACK_FAULT) {
            Some(FpuFault::Invalid)
        } else if flags.contains(ExnFlags::DENORMAL) {
            Some(FpuFault::Denormal)
        } else if flags.contains(ExnFlags::ZERO_DIVIDE) {
            Some(FpuFault::ZeroDivide)
        } else if flags.contains(ExnFlags::OVERFLOW) {
            Some(FpuFault::Overflow)
        } else if flags.contains(ExnFlags::UNDERFLOW) {
            Some(FpuFault::Underflow)
        } else if flags.contains(ExnFlags::PRECISION) {
            Some(FpuFault::Precision)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_control_default_fields() {
        let cw = ControlWord::default();
        assert_eq!(cw.rounding(), RoundMode::Nearest);
        assert_eq!(cw.precision(), PrecisionMode::Extended);
        assert_eq!(cw.masks(), ExnFlags::from_bits_truncate(0x3F));
        assert!(cw.is_masked(ExnFlags::STACK_FAULT | ExnFlags::INVALID));
    }

    #[test]
    fn test_status_top_roundtrip() {
        let mut sw = StatusWord::default();
        for top in 0..8 {
            sw.set_top(top);
            assert_eq!(sw.top(), top);
        }
        sw.raise(ExnFlags::PRECISION);
        sw.set_top(3);
        assert!(sw.sticky().contains(ExnFlags::PRECISION));
    }

    #[test]
    fn test_condition_codes() {
        let mut sw = StatusWord::default();
        sw.set_cc(SW_C3, true);
        sw.set_cc(SW_C0, true);
        assert!(sw.c3() && sw.c0() && !sw.c2());
        sw.clear_cc();
        assert!(!sw.c3() && !sw.c0());
    }

    #[test]
    fn test_fault_priority() {
        let f = ExnFlags::PRECISION | ExnFlags::ZERO_DIVIDE;
        assert_eq!(FpuFault::from_flags(f), Some(FpuFault::ZeroDivide));
        assert_eq!(
            FpuFault::from_flags(ExnFlags::STACK_FAULT),
            Some(FpuFault::Invalid)
        );
        assert_eq!(FpuFault::from_flags(ExnFlags::empty()), None);
    }

    #[test]
    fn test_precision_keep_bits() {
        assert_eq!(PrecisionMode::Single.keep_bits(), 24);
        assert_eq!(PrecisionMode::Double.keep_bits(), 53);
        assert_eq!(PrecisionMode::Extended.keep_bits(), 64);
    }
}
