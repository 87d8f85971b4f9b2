//! Instruction dispatch.
//!
//! Two entry points: register-form instructions take the escape/ModR-M pair
//! directly; memory-form instructions additionally take the operand buffer
//! the caller resolved (addressing modes live outside the core). Both record
//! instruction and operand pointers before executing, except for the pure
//! stack moves and control instructions that must not disturb the last
//! recorded fault location. An `Err` return means the destination was left
//! unmodified, apart from the partial effects called out per instruction
//! (compares still set their condition codes).

use log::{trace, warn};

use crate::arith::add_sub::{add, sub};
use crate::arith::compare::{CmpResult, fcom};
use crate::arith::div::div;
use crate::arith::misc::{fabs, fchs, frndint, fscale, fxam, fxtract};
use crate::arith::mul::mul;
use crate::arith::rem::fprem;
use crate::arith::sqrt::sqrt;
use crate::config::QuirkMode;
use crate::context::{FpuContext, PointerPair};
use crate::convert::bcd::{load_bcd, store_bcd};
use crate::convert::int::{load_i16, load_i32, load_i64, store_i16, store_i32, store_i64};
use crate::convert::real::{load_ext, load_f32, load_f64, store_ext, store_f32, store_f64};
use crate::decode::{CmovPred, Decoded, Dyadic, MemInstr, RegInstr, Scalar, decode, skips_pointer_update};
use crate::reg::{FpReg, Sign, consts};
use crate::state;
use crate::trans::atan::fpatan;
use crate::trans::exp2::f2xm1;
use crate::trans::log2::{fyl2x, fyl2xp1};
use crate::trans::sincos::{fcos, fptan, fsin, fsincos};
use crate::utils::{read_u16_le, read_u32_le, read_u64_le, write_u16_le, write_u32_le, write_u64_le};
use crate::words::{ControlWord, ExnFlags, FpuFault, SW_C0, SW_C1, SW_C2, SW_C3};

/// Flag traffic with the surrounding CPU emulation: conditional moves read
/// CF/ZF/PF, the FCOMI family and FNSTSW AX write back through it.
#[derive(Clone, Copy, Default, Debug)]
pub struct CpuBridge {
    pub cf: bool,
    pub zf: bool,
    pub pf: bool,
    pub ax: u16,
}

/// A resolved memory operand: the raw bytes plus the address pair recorded
/// in the operand-pointer bookkeeping.
pub struct MemOperand<'a> {
    pub buf: &'a mut [u8],
    pub addr: u32,
    pub selector: u16,
}

fn illegal(escape: u8, modrm: u8) -> FpuFault {
    warn!("illegal x87 encoding {escape:#04x}/{modrm:#04x}");
    FpuFault::IllegalInstruction { opcode: escape, modrm }
}

fn opcode_word(escape: u8, modrm: u8) -> u16 {
    (((escape & 7) as u16) << 8) | modrm as u16
}

/// Execute a register-form (or no-operand) instruction.
pub fn exec_reg(
    ctx: &mut FpuContext,
    escape: u8,
    modrm: u8,
    ip: PointerPair,
    bridge: &mut CpuBridge,
) -> Result<(), FpuFault> {
    let instr = match decode(escape, modrm) {
        Some(Decoded::Reg(i)) => i,
        _ => return Err(illegal(escape, modrm)),
    };
    trace!("x87 {instr:?}");
    if !skips_pointer_update(&Decoded::Reg(instr)) {
        ctx.last_ip = ip;
        ctx.last_opcode = opcode_word(escape, modrm);
    }
    run_reg(ctx, instr, bridge)
}

/// Execute a memory-form instruction. The caller resolves addressing and
/// hands over a buffer of the operand's documented length.
pub fn exec_mem(
    ctx: &mut FpuContext,
    escape: u8,
    modrm: u8,
    mem: &mut MemOperand<'_>,
    ip: PointerPair,
) -> Result<(), FpuFault> {
    let instr = match decode(escape, modrm) {
        Some(Decoded::Mem(i)) => i,
        _ => return Err(illegal(escape, modrm)),
    };
    trace!("x87 {instr:?} at {:#x}:{:#x}", mem.selector, mem.addr);
    if !skips_pointer_update(&Decoded::Mem(instr)) {
        ctx.last_ip = ip;
        ctx.last_opcode = opcode_word(escape, modrm);
        ctx.last_dp = PointerPair {
            offset: mem.addr,
            selector: mem.selector,
        };
    }
    run_mem(ctx, instr, mem)
}

fn dyadic(
    op: Dyadic,
    x: &FpReg,
    y: &FpReg,
    cw: &ControlWord,
    quirk: QuirkMode,
) -> (FpReg, ExnFlags, bool) {
    match op {
        Dyadic::Add => add(x, y, cw),
        Dyadic::Mul => mul(x, y, cw),
        Dyadic::Sub => sub(x, y, cw),
        Dyadic::Subr => sub(y, x, cw),
        Dyadic::Div => div(x, y, cw, quirk),
        Dyadic::Divr => div(y, x, cw, quirk),
    }
}

fn set_compare_cc(ctx: &mut FpuContext, r: CmpResult) {
    let (c3, c2, c0) = match r {
        CmpResult::Less => (false, false, true),
        CmpResult::Equal => (true, false, false),
        CmpResult::Greater => (false, false, false),
        CmpResult::Unordered => (true, true, true),
    };
    ctx.status.set_cc(SW_C3, c3);
    ctx.status.set_cc(SW_C2, c2);
    ctx.status.set_cc(SW_C0, c0);
    ctx.status.set_cc(SW_C1, false);
}

fn pred_holds(pred: CmovPred, b: &CpuBridge) -> bool {
    match pred {
        CmovPred::Below => b.cf,
        CmovPred::Equal => b.zf,
        CmovPred::BelowEqual => b.cf || b.zf,
        CmovPred::Unordered => b.pf,
        CmovPred::NotBelow => !b.cf,
        CmovPred::NotEqual => !b.zf,
        CmovPred::NotBelowEqual => !(b.cf || b.zf),
        CmovPred::NotUnordered => !b.pf,
    }
}

fn push_checked(ctx: &mut FpuContext, v: FpReg) -> Result<(), FpuFault> {
    let space = ctx.check_push_space()?;
    if space {
        ctx.set_c1_round_up(false);
    }
    ctx.push(if space { v } else { FpReg::indefinite() });
    Ok(())
}

fn run_reg(ctx: &mut FpuContext, instr: RegInstr, bridge: &mut CpuBridge) -> Result<(), FpuFault> {
    let cw = ctx.control;
    let quirk = ctx.config.quirk_mode;
    match instr {
        RegInstr::Arith { op, st, to_sti, pop } => {
            let a = ctx.op_src(0)?;
            let b = ctx.op_src(st)?;
            let (dst, x, y) = if to_sti { (st, b, a) } else { (0, a, b) };
            let (r, flags, up) = dyadic(op, &x, &y, &cw, quirk);
            ctx.report(flags)?;
            *ctx.st_mut(dst) = r;
            ctx.set_c1_round_up(up);
            if pop {
                ctx.pop();
            }
        }
        RegInstr::Com { st, pop, unordered } => {
            let a = ctx.op_src(0)?;
            let b = ctx.op_src(st)?;
            let (res, flags) = fcom(&a, &b, !unordered);
            set_compare_cc(ctx, res);
            ctx.report(flags)?;
            if pop {
                ctx.pop();
            }
        }
        RegInstr::Compp { unordered } => {
            let a = ctx.op_src(0)?;
            let b = ctx.op_src(1)?;
            let (res, flags) = fcom(&a, &b, !unordered);
            set_compare_cc(ctx, res);
            ctx.report(flags)?;
            ctx.pop();
            ctx.pop();
        }
        RegInstr::ComI { st, pop, unordered } => {
            let a = ctx.op_src(0)?;
            let b = ctx.op_src(st)?;
            let (res, flags) = fcom(&a, &b, !unordered);
            bridge.cf = matches!(res, CmpResult::Less | CmpResult::Unordered);
            bridge.zf = matches!(res, CmpResult::Equal | CmpResult::Unordered);
            bridge.pf = res == CmpResult::Unordered;
            ctx.status.set_cc(SW_C1, false);
            ctx.report(flags)?;
            if pop {
                ctx.pop();
            }
        }
        RegInstr::Fcmov { st, pred } => {
            let _ = ctx.op_src(0)?;
            let b = ctx.op_src(st)?;
            if pred_holds(pred, bridge) {
                *ctx.st_mut(0) = b;
            }
        }
        RegInstr::Fld(st) => {
            let src = ctx.op_src(st)?;
            push_checked(ctx, src)?;
        }
        RegInstr::Fxch(st) => {
            let a = ctx.op_src(0)?;
            let b = ctx.op_src(st)?;
            *ctx.st_mut(0) = b;
            *ctx.st_mut(st) = a;
            ctx.set_c1_round_up(false);
        }
        RegInstr::FstReg { st, pop } => {
            let a = ctx.op_src(0)?;
            *ctx.st_mut(st) = a;
            if pop {
                ctx.pop();
            }
        }
        RegInstr::Ffree { st, pop } => {
            *ctx.st_mut(st) = FpReg::empty();
            if pop {
                ctx.pop();
            }
        }
        RegInstr::Fnop => {}
        RegInstr::Fchs => {
            let a = ctx.op_src(0)?;
            *ctx.st_mut(0) = fchs(&a);
            ctx.set_c1_round_up(false);
        }
        RegInstr::Fabs => {
            let a = ctx.op_src(0)?;
            *ctx.st_mut(0) = fabs(&a);
            ctx.set_c1_round_up(false);
        }
        RegInstr::Ftst => {
            let a = ctx.op_src(0)?;
            let (res, flags) = fcom(&a, &FpReg::zero(Sign::Pos), true);
            set_compare_cc(ctx, res);
            ctx.report(flags)?;
        }
        RegInstr::Fxam => {
            // Classifies an empty slot instead of faulting on it.
            let e = fxam(ctx.st(0));
            ctx.status.set_cc(SW_C0, e.c0);
            ctx.status.set_cc(SW_C1, e.c1);
            ctx.status.set_cc(SW_C2, e.c2);
            ctx.status.set_cc(SW_C3, e.c3);
        }
        RegInstr::Fld1 => push_checked(ctx, consts::one())?,
        RegInstr::Fldl2t => push_checked(ctx, consts::l2t())?,
        RegInstr::Fldl2e => push_checked(ctx, consts::l2e())?,
        RegInstr::Fldpi => push_checked(ctx, consts::pi())?,
        RegInstr::Fldlg2 => push_checked(ctx, consts::lg2())?,
        RegInstr::Fldln2 => push_checked(ctx, consts::ln2())?,
        RegInstr::Fldz => push_checked(ctx, consts::zero())?,
        RegInstr::F2xm1 => {
            let a = ctx.op_src(0)?;
            let (r, flags, up) = f2xm1(&a, &cw);
            ctx.report(flags)?;
            *ctx.st_mut(0) = r;
            ctx.set_c1_round_up(up);
        }
        RegInstr::Fyl2x => {
            let x = ctx.op_src(0)?;
            let y = ctx.op_src(1)?;
            let (r, flags, up) = fyl2x(&y, &x, &cw);
            ctx.report(flags)?;
            *ctx.st_mut(1) = r;
            ctx.set_c1_round_up(up);
            ctx.pop();
        }
        RegInstr::Fyl2xp1 => {
            let x = ctx.op_src(0)?;
            let y = ctx.op_src(1)?;
            let (r, flags, up) = fyl2xp1(&y, &x, &cw);
            ctx.report(flags)?;
            *ctx.st_mut(1) = r;
            ctx.set_c1_round_up(up);
            ctx.pop();
        }
        RegInstr::Fpatan => {
            let x = ctx.op_src(0)?;
            let y = ctx.op_src(1)?;
            let (r, flags, up) = fpatan(&y, &x, &cw);
            ctx.report(flags)?;
            *ctx.st_mut(1) = r;
            ctx.set_c1_round_up(up);
            ctx.pop();
        }
        RegInstr::Fptan => {
            let a = ctx.op_src(0)?;
            match fptan(&a, &cw) {
                None => ctx.status.set_cc(SW_C2, true),
                Some((r, flags, up)) => {
                    let space = ctx.check_push_space()?;
                    ctx.report(flags)?;
                    *ctx.st_mut(0) = r;
                    if space {
                        ctx.set_c1_round_up(up);
                    }
                    ctx.push(if space { consts::one() } else { FpReg::indefinite() });
                    ctx.status.set_cc(SW_C2, false);
                }
            }
        }
        RegInstr::Fsincos => {
            let a = ctx.op_src(0)?;
            match fsincos(&a, &cw) {
                None => ctx.status.set_cc(SW_C2, true),
                Some((s, c, flags, up)) => {
                    let space = ctx.check_push_space()?;
                    ctx.report(flags)?;
                    *ctx.st_mut(0) = s;
                    if space {
                        ctx.set_c1_round_up(up);
                    }
                    ctx.push(if space { c } else { FpReg::indefinite() });
                    ctx.status.set_cc(SW_C2, false);
                }
            }
        }
        RegInstr::Fsin => {
            let a = ctx.op_src(0)?;
            match fsin(&a, &cw) {
                None => ctx.status.set_cc(SW_C2, true),
                Some((r, flags, up)) => {
                    ctx.report(flags)?;
                    *ctx.st_mut(0) = r;
                    ctx.set_c1_round_up(up);
                    ctx.status.set_cc(SW_C2, false);
                }
            }
        }
        RegInstr::Fcos => {
            let a = ctx.op_src(0)?;
            match fcos(&a, &cw) {
                None => ctx.status.set_cc(SW_C2, true),
                Some((r, flags, up)) => {
                    ctx.report(flags)?;
                    *ctx.st_mut(0) = r;
                    ctx.set_c1_round_up(up);
                    ctx.status.set_cc(SW_C2, false);
                }
            }
        }
        RegInstr::Fxtract => {
            let a = ctx.op_src(0)?;
            let space = ctx.check_push_space()?;
            let (exp_part, sig_part, flags) = fxtract(&a);
            ctx.report(flags)?;
            *ctx.st_mut(0) = exp_part;
            ctx.push(if space { sig_part } else { FpReg::indefinite() });
        }
        RegInstr::Fprem | RegInstr::Fprem1 => {
            let a = ctx.op_src(0)?;
            let b = ctx.op_src(1)?;
            let out = fprem(&a, &b, instr == RegInstr::Fprem1, &cw);
            ctx.report(out.flags)?;
            *ctx.st_mut(0) = out.result;
            ctx.status.set_cc(SW_C0, out.c0);
            ctx.status.set_cc(SW_C1, out.c1);
            ctx.status.set_cc(SW_C2, out.c2);
            ctx.status.set_cc(SW_C3, out.c3);
        }
        RegInstr::Fsqrt => {
            let a = ctx.op_src(0)?;
            let (r, flags, up) = sqrt(&a, &cw);
            ctx.report(flags)?;
            *ctx.st_mut(0) = r;
            ctx.set_c1_round_up(up);
        }
        RegInstr::Frndint => {
            let a = ctx.op_src(0)?;
            let (r, flags, up) = frndint(&a, &cw);
            ctx.report(flags)?;
            *ctx.st_mut(0) = r;
            ctx.set_c1_round_up(up);
        }
        RegInstr::Fscale => {
            let a = ctx.op_src(0)?;
            let b = ctx.op_src(1)?;
            let (r, flags, up) = fscale(&a, &b, &cw, quirk);
            ctx.report(flags)?;
            *ctx.st_mut(0) = r;
            ctx.set_c1_round_up(up);
        }
        RegInstr::Fdecstp => {
            let t = ctx.top();
            ctx.status.set_top(t.wrapping_sub(1) & 7);
            ctx.set_c1_round_up(false);
        }
        RegInstr::Fincstp => {
            let t = ctx.top();
            ctx.status.set_top((t + 1) & 7);
            ctx.set_c1_round_up(false);
        }
        RegInstr::Fnclex => ctx.clear_exceptions(),
        RegInstr::Fninit => ctx.init(),
        RegInstr::FnstswAx => bridge.ax = ctx.status.0,
    }
    Ok(())
}

fn load_scalar(fmt: Scalar, buf: &[u8]) -> (FpReg, ExnFlags) {
    match fmt {
        Scalar::F32 => load_f32(read_u32_le(buf)),
        Scalar::F64 => load_f64(read_u64_le(buf)),
        Scalar::F80 => {
            let mut b = [0u8; 10];
            b.copy_from_slice(&buf[..10]);
            (load_ext(&b), ExnFlags::empty())
        }
        Scalar::I16 => (load_i16(read_u16_le(buf) as i16), ExnFlags::empty()),
        Scalar::I32 => (load_i32(read_u32_le(buf) as i32), ExnFlags::empty()),
        Scalar::I64 => (load_i64(read_u64_le(buf) as i64), ExnFlags::empty()),
    }
}

fn run_mem(ctx: &mut FpuContext, instr: MemInstr, mem: &mut MemOperand<'_>) -> Result<(), FpuFault> {
    let cw = ctx.control;
    let quirk = ctx.config.quirk_mode;
    match instr {
        MemInstr::Arith { op, fmt } => {
            let (b, lf) = load_scalar(fmt, mem.buf);
            let a = ctx.op_src(0)?;
            let (r, flags, up) = dyadic(op, &a, &b, &cw, quirk);
            ctx.report(lf | flags)?;
            *ctx.st_mut(0) = r;
            ctx.set_c1_round_up(up);
        }
        MemInstr::Com { fmt, pop } => {
            let (b, lf) = load_scalar(fmt, mem.buf);
            let a = ctx.op_src(0)?;
            let (res, flags) = fcom(&a, &b, true);
            set_compare_cc(ctx, res);
            ctx.report(lf | flags)?;
            if pop {
                ctx.pop();
            }
        }
        MemInstr::Fld(fmt) => {
            let space = ctx.check_push_space()?;
            if !space {
                ctx.push(FpReg::indefinite());
                return Ok(());
            }
            let (r, lf) = load_scalar(fmt, mem.buf);
            ctx.report(lf)?;
            ctx.set_c1_round_up(false);
            ctx.push(r);
        }
        MemInstr::Fst { fmt, pop } => {
            let a = ctx.op_src(0)?;
            let up = match fmt {
                Scalar::F32 => {
                    let (bits, f, up) = store_f32(&a, &cw);
                    ctx.report(f)?;
                    write_u32_le(mem.buf, bits);
                    up
                }
                Scalar::F64 => {
                    let (bits, f, up) = store_f64(&a, &cw);
                    ctx.report(f)?;
                    write_u64_le(mem.buf, bits);
                    up
                }
                Scalar::F80 => {
                    let img = store_ext(&a);
                    mem.buf[..10].copy_from_slice(&img);
                    false
                }
                Scalar::I16 => {
                    let (v, f, up) = store_i16(&a, &cw, false);
                    ctx.report(f)?;
                    write_u16_le(mem.buf, v as u16);
                    up
                }
                Scalar::I32 => {
                    let (v, f, up) = store_i32(&a, &cw, false);
                    ctx.report(f)?;
                    write_u32_le(mem.buf, v as u32);
                    up
                }
                Scalar::I64 => {
                    let (v, f, up) = store_i64(&a, &cw, false);
                    ctx.report(f)?;
                    write_u64_le(mem.buf, v as u64);
                    up
                }
            };
            ctx.set_c1_round_up(up);
            if pop {
                ctx.pop();
            }
        }
        MemInstr::Fisttp(fmt) => {
            let a = ctx.op_src(0)?;
            match fmt {
                Scalar::I16 => {
                    let (v, f, _) = store_i16(&a, &cw, true);
                    ctx.report(f)?;
                    write_u16_le(mem.buf, v as u16);
                }
                Scalar::I32 => {
                    let (v, f, _) = store_i32(&a, &cw, true);
                    ctx.report(f)?;
                    write_u32_le(mem.buf, v as u32);
                }
                _ => {
                    let (v, f, _) = store_i64(&a, &cw, true);
                    ctx.report(f)?;
                    write_u64_le(mem.buf, v as u64);
                }
            }
            ctx.set_c1_round_up(false);
            ctx.pop();
        }
        MemInstr::Fbld => {
            let space = ctx.check_push_space()?;
            if !space {
                ctx.push(FpReg::indefinite());
                return Ok(());
            }
            let mut b = [0u8; 10];
            b.copy_from_slice(&mem.buf[..10]);
            ctx.set_c1_round_up(false);
            ctx.push(load_bcd(&b));
        }
        MemInstr::Fbstp => {
            let a = ctx.op_src(0)?;
            let (img, f, up) = store_bcd(&a, &cw);
            ctx.report(f)?;
            mem.buf[..10].copy_from_slice(&img);
            ctx.set_c1_round_up(up);
            ctx.pop();
        }
        MemInstr::Fldcw => {
            ctx.control = ControlWord(read_u16_le(mem.buf));
            // Freshly unmasked pending exceptions surface on the summary bit.
            let pending = ctx.status.sticky() - (ctx.control.masks() | ExnFlags::STACK_FAULT);
            if !pending.is_empty() {
                ctx.status.set_summary();
            }
        }
        MemInstr::Fnstcw => write_u16_le(mem.buf, ctx.control.0),
        MemInstr::Fnstsw => write_u16_le(mem.buf, ctx.status.0),
        MemInstr::Fldenv => state::load_env(ctx, mem.buf),
        MemInstr::Fnstenv => {
            state::store_env(ctx, mem.buf);
            // The store also masks everything, like the hardware sequence.
            ctx.control = ControlWord(ctx.control.0 | 0x3F);
        }
        MemInstr::Fnsave => {
            state::save(ctx, mem.buf);
            ctx.init();
        }
        MemInstr::Frstor => state::restore(ctx, mem.buf),
    }
    Ok(())
}
