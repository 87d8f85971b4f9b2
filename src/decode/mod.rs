//! Instruction decoding for the eight escape opcodes 0xD8..=0xDF.
//!
//! A ModR/M byte below 0xC0 selects the memory-operand table of its escape
//! (the operand itself is resolved by the caller); 0xC0 and above selects the
//! register-form table. Every legal encoding decodes to a variant of a closed
//! enumeration; everything else is `None`, which the dispatcher turns into an
//! illegal-instruction fault rather than falling through.

pub mod exec;

/// Dyadic arithmetic selector shared by the memory and register forms.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dyadic {
    Add,
    Mul,
    Sub,
    Subr,
    Div,
    Divr,
}

/// External scalar format of a memory operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Scalar {
    F32,
    F64,
    F80,
    I16,
    I32,
    I64,
}

impl Scalar {
    /// Operand length in bytes.
    pub fn len(self) -> usize {
        match self {
            Scalar::I16 => 2,
            Scalar::F32 | Scalar::I32 => 4,
            Scalar::F64 | Scalar::I64 => 8,
            Scalar::F80 => 10,
        }
    }
}

/// Predicate of a conditional move, evaluated against the caller's CPU flags.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmovPred {
    Below,
    Equal,
    BelowEqual,
    Unordered,
    NotBelow,
    NotEqual,
    NotBelowEqual,
    NotUnordered,
}

/// Memory-operand instructions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MemInstr {
    /// fadd/fmul/fsub/fsubr/fdiv/fdivr with a converted memory source.
    Arith { op: Dyadic, fmt: Scalar },
    /// fcom/fcomp and the integer ficom/ficomp forms.
    Com { fmt: Scalar, pop: bool },
    /// fld and fild (the format tells them apart).
    Fld(Scalar),
    /// fst/fstp/fist/fistp.
    Fst { fmt: Scalar, pop: bool },
    /// Truncating integer store with pop.
    Fisttp(Scalar),
    Fbld,
    Fbstp,
    Fldcw,
    Fnstcw,
    Fnstsw,
    Fldenv,
    Fnstenv,
    Fnsave,
    Frstor,
}

/// Register-form and no-operand instructions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegInstr {
    /// Register arithmetic; `to_sti` selects st(i) as the destination and
    /// `pop` the DE "and pop" forms.
    Arith {
        op: Dyadic,
        st: u8,
        to_sti: bool,
        pop: bool,
    },
    Com {
        st: u8,
        pop: bool,
        unordered: bool,
    },
    /// fcompp / fucompp: compare st0 with st1, pop both.
    Compp { unordered: bool },
    /// fcomi family: compare writing CPU flags through the bridge.
    ComI {
        st: u8,
        pop: bool,
        unordered: bool,
    },
    Fcmov { st: u8, pred: CmovPred },
    Fld(u8),
    Fxch(u8),
    FstReg { st: u8, pop: bool },
    Ffree { st: u8, pop: bool },
    Fnop,
    Fchs,
    Fabs,
    Ftst,
    Fxam,
    Fld1,
    Fldl2t,
    Fldl2e,
    Fldpi,
    Fldlg2,
    Fldln2,
    Fldz,
    F2xm1,
    Fyl2x,
    Fptan,
    Fpatan,
    Fxtract,
    Fprem1,
    Fdecstp,
    Fincstp,
    Fprem,
    Fyl2xp1,
    Fsqrt,
    Fsincos,
    Frndint,
    Fscale,
    Fsin,
    Fcos,
    Fnclex,
    Fninit,
    FnstswAx,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Decoded {
    Mem(MemInstr),
    Reg(RegInstr),
}

/// Decode an escape/ModR-M pair. `None` is an illegal encoding.
pub fn decode(escape: u8, modrm: u8) -> Option<Decoded> {
    if modrm < 0xC0 {
        mem_table(escape, (modrm >> 3) & 7).map(Decoded::Mem)
    } else {
        reg_table(escape, modrm).map(Decoded::Reg)
    }
}

fn mem_table(escape: u8, reg: u8) -> Option<MemInstr> {
    use MemInstr::*;
    use Scalar::*;
    let arith_row = |fmt: Scalar| match reg {
        0 => Some(Arith { op: Dyadic::Add, fmt }),
        1 => Some(Arith { op: Dyadic::Mul, fmt }),
        2 => Some(Com { fmt, pop: false }),
        3 => Some(Com { fmt, pop: true }),
        4 => Some(Arith { op: Dyadic::Sub, fmt }),
        5 => Some(Arith { op: Dyadic::Subr, fmt }),
        6 => Some(Arith { op: Dyadic::Div, fmt }),
        _ => Some(Arith { op: Dyadic::Divr, fmt }),
    };
    match escape {
        0xD8 => arith_row(F32),
        0xD9 => match reg {
            0 => Some(Fld(F32)),
            2 => Some(Fst { fmt: F32, pop: false }),
            3 => Some(Fst { fmt: F32, pop: true }),
            4 => Some(Fldenv),
            5 => Some(Fldcw),
            6 => Some(Fnstenv),
            7 => Some(Fnstcw),
            _ => None,
        },
        0xDA => arith_row(I32),
        0xDB => match reg {
            0 => Some(Fld(I32)),
            1 => Some(Fisttp(I32)),
            2 => Some(Fst { fmt: I32, pop: false }),
            3 => Some(Fst { fmt: I32, pop: true }),
            5 => Some(Fld(F80)),
            7 => Some(Fst { fmt: F80, pop: true }),
            _ => None,
        },
        0xDC => arith_row(F64),
        0xDD => match reg {
            0 => Some(Fld(F64)),
            1 => Some(Fisttp(I64)),
            2 => Some(Fst { fmt: F64, pop: false }),
            3 => Some(Fst { fmt: F64, pop: true }),
            4 => Some(Frstor),
            6 => Some(Fnsave),
            7 => Some(Fnstsw),
            _ => None,
        },
        0xDE => arith_row(I16),
        0xDF => match reg {
            0 => Some(Fld(I16)),
            1 => Some(Fisttp(I16)),
            2 => Some(Fst { fmt: I16, pop: false }),
            3 => Some(Fst { fmt: I16, pop: true }),
            4 => Some(Fbld),
            5 => Some(Fld(I64)),
            6 => Some(Fbstp),
            7 => Some(Fst { fmt: I64, pop: true }),
            _ => None,
        },
        _ => None,
    }
}

fn reg_table(escape: u8, modrm: u8) -> Option<RegInstr> {
    use RegInstr::*;
    let st = modrm & 7;
    let row = modrm & 0xF8;
    match escape {
        0xD8 => match row {
            0xC0 => Some(Arith { op: Dyadic::Add, st, to_sti: false, pop: false }),
            0xC8 => Some(Arith { op: Dyadic::Mul, st, to_sti: false, pop: false }),
            0xD0 => Some(Com { st, pop: false, unordered: false }),
            0xD8 => Some(Com { st, pop: true, unordered: false }),
            0xE0 => Some(Arith { op: Dyadic::Sub, st, to_sti: false, pop: false }),
            0xE8 => Some(Arith { op: Dyadic::Subr, st, to_sti: false, pop: false }),
            0xF0 => Some(Arith { op: Dyadic::Div, st, to_sti: false, pop: false }),
            _ => Some(Arith { op: Dyadic::Divr, st, to_sti: false, pop: false }),
        },
        0xD9 => match modrm {
            0xC0..=0xC7 => Some(Fld(st)),
            0xC8..=0xCF => Some(Fxch(st)),
            0xD0 => Some(Fnop),
            // The undocumented FSTP1 alias.
            0xD8..=0xDF => Some(FstReg { st, pop: true }),
            0xE0 => Some(Fchs),
            0xE1 => Some(Fabs),
            0xE4 => Some(Ftst),
            0xE5 => Some(Fxam),
            0xE8 => Some(Fld1),
            0xE9 => Some(Fldl2t),
            0xEA => Some(Fldl2e),
            0xEB => Some(Fldpi),
            0xEC => Some(Fldlg2),
            0xED => Some(Fldln2),
            0xEE => Some(Fldz),
            0xF0 => Some(F2xm1),
            0xF1 => Some(Fyl2x),
            0xF2 => Some(Fptan),
            0xF3 => Some(Fpatan),
            0xF4 => Some(Fxtract),
            0xF5 => Some(Fprem1),
            0xF6 => Some(Fdecstp),
            0xF7 => Some(Fincstp),
            0xF8 => Some(Fprem),
            0xF9 => Some(Fyl2xp1),
            0xFA => Some(Fsqrt),
            0xFB => Some(Fsincos),
            0xFC => Some(Frndint),
            0xFD => Some(Fscale),
            0xFE => Some(Fsin),
            0xFF => Some(Fcos),
            _ => None,
        },
        0xDA => match modrm {
            0xC0..=0xC7 => Some(Fcmov { st, pred: CmovPred::Below }),
            0xC8..=0xCF => Some(Fcmov { st, pred: CmovPred::Equal }),
            0xD0..=0xD7 => Some(Fcmov { st, pred: CmovPred::BelowEqual }),
            0xD8..=0xDF => Some(Fcmov { st, pred: CmovPred::Unordered }),
            0xE9 => Some(Compp { unordered: true }),
            _ => None,
        },
        0xDB => match modrm {
            0xC0..=0xC7 => Some(Fcmov { st, pred: CmovPred::NotBelow }),
            0xC8..=0xCF => Some(Fcmov { st, pred: CmovPred::NotEqual }),
            0xD0..=0xD7 => Some(Fcmov { st, pred: CmovPred::NotBelowEqual }),
            0xD8..=0xDF => Some(Fcmov { st, pred: CmovPred::NotUnordered }),
            0xE2 => Some(Fnclex),
            0xE3 => Some(Fninit),
            0xE8..=0xEF => Some(ComI { st, pop: false, unordered: true }),
            0xF0..=0xF7 => Some(ComI { st, pop: false, unordered: false }),
            _ => None,
        },
        0xDC => match row {
            0xC0 => Some(Arith { op: Dyadic::Add, st, to_sti: true, pop: false }),
            0xC8 => Some(Arith { op: Dyadic::Mul, st, to_sti: true, pop: false }),
            // Undocumented aliases of the D8 compare rows.
            0xD0 => Some(Com { st, pop: false, unordered: false }),
            0xD8 => Some(Com { st, pop: true, unordered: false }),
            0xE0 => Some(Arith { op: Dyadic::Subr, st, to_sti: true, pop: false }),
            0xE8 => Some(Arith { op: Dyadic::Sub, st, to_sti: true, pop: false }),
            0xF0 => Some(Arith { op: Dyadic::Divr, st, to_sti: true, pop: false }),
            _ => Some(Arith { op: Dyadic::Div, st, to_sti: true, pop: false }),
        },
        0xDD => match row {
            0xC0 => Some(Ffree { st, pop: false }),
            0xD0 => Some(FstReg { st, pop: false }),
            0xD8 => Some(FstReg { st, pop: true }),
            0xE0 => Some(Com { st, pop: false, unordered: true }),
            0xE8 => Some(Com { st, pop: true, unordered: true }),
            _ => None,
        },
        0xDE => match modrm {
            0xC0..=0xC7 => Some(Arith { op: Dyadic::Add, st, to_sti: true, pop: true }),
            0xC8..=0xCF => Some(Arith { op: Dyadic::Mul, st, to_sti: true, pop: true }),
            0xD9 => Some(Compp { unordered: false }),
            0xE0..=0xE7 => Some(Arith { op: Dyadic::Subr, st, to_sti: true, pop: true }),
            0xE8..=0xEF => Some(Arith { op: Dyadic::Sub, st, to_sti: true, pop: true }),
            0xF0..=0xF7 => Some(Arith { op: Dyadic::Divr, st, to_sti: true, pop: true }),
            0xF8..=0xFF => Some(Arith { op: Dyadic::Div, st, to_sti: true, pop: true }),
            _ => None,
        },
        0xDF => match modrm {
            0xC0..=0xC7 => Some(Ffree { st, pop: true }),
            0xE0 => Some(FnstswAx),
            0xE8..=0xEF => Some(ComI { st, pop: true, unordered: true }),
            0xF0..=0xF7 => Some(ComI { st, pop: true, unordered: false }),
            _ => None,
        },
        _ => None,
    }
}

/// Instructions that must not disturb the recorded fault pointers: pure
/// stack moves and the control group.
pub(crate) fn skips_pointer_update(d: &Decoded) -> bool {
    match d {
        Decoded::Reg(r) => matches!(
            r,
            RegInstr::Fnop
                | RegInstr::Fxch(_)
                | RegInstr::Ffree { .. }
                | RegInstr::Fdecstp
                | RegInstr::Fincstp
                | RegInstr::Fnclex
                | RegInstr::Fninit
                | RegInstr::FnstswAx
        ),
        Decoded::Mem(m) => matches!(
            m,
            MemInstr::Fldcw
                | MemInstr::Fnstcw
                | MemInstr::Fnstsw
                | MemInstr::Fldenv
                | MemInstr::Fnstenv
                | MemInstr::Fnsave
                | MemInstr::Frstor
        ),
    }
}
