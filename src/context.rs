//! Unit context: the 8-slot rotating register file, control/status words,
//! instruction/operand pointer bookkeeping, and the masked/unmasked exception
//! commit discipline every operation goes through.

use log::trace;

use crate::config::FpuConfig;
use crate::reg::{FpReg, Tag};
use crate::words::{ControlWord, ExnFlags, FpuFault, SW_C1, StatusWord};

/// Offset/selector pair of the last instruction or memory operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct PointerPair {
    pub offset: u32,
    pub selector: u16,
}

pub struct FpuContext {
    /// Physical register file; logical st(i) is `regs[(top + i) & 7]`.
    pub regs: [FpReg; 8],
    pub control: ControlWord,
    pub status: StatusWord,
    pub config: FpuConfig,
    pub last_ip: PointerPair,
    pub last_dp: PointerPair,
    pub last_opcode: u16,
}

impl FpuContext {
    pub fn new(config: FpuConfig) -> FpuContext {
        let mut ctx = FpuContext {
            regs: [FpReg::empty(); 8],
            control: ControlWord::default(),
            status: StatusWord::default(),
            config,
            last_ip: PointerPair::default(),
            last_dp: PointerPair::default(),
            last_opcode: 0,
        };
        ctx.init();
        ctx
    }

    /// FNINIT: reset to the power-on state.
    pub fn init(&mut self) {
        self.control = ControlWord::default();
        self.status = StatusWord::default();
        self.regs = [FpReg::empty(); 8];
        self.last_ip = PointerPair::default();
        self.last_dp = PointerPair::default();
        self.last_opcode = 0;
    }

    /// FNCLEX: clear the sticky exceptions, the summary bit and busy.
    pub fn clear_exceptions(&mut self) {
        self.status.0 &= 0x7F00;
    }

    pub fn top(&self) -> u8 {
        self.status.top()
    }

    fn phys(&self, i: u8) -> usize {
        ((self.top() + i) & 7) as usize
    }

    pub fn st(&self, i: u8) -> &FpReg {
        &self.regs[self.phys(i)]
    }

    pub fn st_mut(&mut self, i: u8) -> &mut FpReg {
        let p = self.phys(i);
        &mut self.regs[p]
    }

    /// Unchecked push: decrement top and store.
    pub fn push(&mut self, v: FpReg) {
        let t = self.top().wrapping_sub(1) & 7;
        self.status.set_top(t);
        self.regs[t as usize] = v;
    }

    /// Empty the vacated slot and increment top.
    pub fn pop(&mut self) {
        let t = self.top();
        self.regs[t as usize] = FpReg::empty();
        self.status.set_top((t + 1) & 7);
    }

    /// Packed tag word, derived from the register file.
    pub fn tag_word(&self) -> u16 {
        let mut tw = 0u16;
        for (i, r) in self.regs.iter().enumerate() {
            let bits = match r.tag {
                Tag::Empty => 3,
                Tag::Zero => 1,
                Tag::Valid if !r.is_tiny() => 0,
                // NaN, infinity, denormal.
                _ => 2,
            };
            tw |= bits << (2 * i);
        }
        tw
    }

    /// Accumulate sticky bits; if any raised bit is unmasked, set the summary
    /// bit and report the highest-priority fault. An `Err` return means the
    /// destination must not be written.
    pub fn report(&mut self, flags: ExnFlags) -> Result<(), FpuFault> {
        self.status.raise(flags);
        // The stack-fault qualifier is governed by the invalid mask and is
        // always raised together with INVALID.
        let masks = self.control.masks() | ExnFlags::STACK_FAULT;
        let unmasked = flags - masks;
        if let Some(fault) = FpuFault::from_flags(unmasked) {
            self.status.set_summary();
            trace!("unmasked exception: {fault}");
            return Err(fault);
        }
        Ok(())
    }

    /// Fetch a source operand. An empty slot is a stack underflow: C1 is
    /// cleared and, when the invalid exception is masked, the indefinite is
    /// substituted so the operation can proceed.
    pub fn op_src(&mut self, i: u8) -> Result<FpReg, FpuFault> {
        let r = *self.st(i);
        if r.is_empty() {
            self.status.set_cc(SW_C1, false);
            self.report(ExnFlags::INVALID | ExnFlags::STACK_FAULT)?;
            return Ok(FpReg::indefinite());
        }
        Ok(r)
    }

    /// Check that a push has room. Returns `Ok(true)` when it does,
    /// `Ok(false)` for a masked stack overflow (the caller pushes the
    /// indefinite instead of its result), `Err` when unmasked.
    pub fn check_push_space(&mut self) -> Result<bool, FpuFault> {
        let below = (self.top().wrapping_sub(1) & 7) as usize;
        if self.regs[below].is_empty() {
            return Ok(true);
        }
        self.status.set_cc(SW_C1, true);
        self.report(ExnFlags::INVALID | ExnFlags::STACK_FAULT)?;
        Ok(false)
    }

    pub fn set_c1_round_up(&mut self, up: bool) {
        self.status.set_cc(SW_C1, up);
    }
}
