//! Environment and full-state images.
//!
//! The environment image holds seven fields (control, status, tag words,
//! then the instruction and operand pointer/selector pairs) as u16s in the
//! 16-bit layout or u32s in the 32-bit one. The full image appends the eight
//! raw extended-real register images in physical register order. Loading an
//! image replaces the corresponding context state wholesale.

use crate::config::OperandSize;
use crate::context::{FpuContext, PointerPair};
use crate::convert::real::{load_ext, store_ext};
use crate::reg::{FpReg, Sign};
use crate::utils::{read_u16_le, read_u32_le, write_u16_le, write_u32_le};
use crate::words::{ControlWord, StatusWord};

pub const REG_IMAGE_LEN: usize = 10;

pub fn env_len(size: OperandSize) -> usize {
    match size {
        OperandSize::Bits16 => 14,
        OperandSize::Bits32 => 28,
    }
}

pub fn save_len(size: OperandSize) -> usize {
    env_len(size) + 8 * REG_IMAGE_LEN
}

fn write_field(buf: &mut [u8], i: usize, size: OperandSize, v: u32) {
    match size {
        OperandSize::Bits16 => write_u16_le(&mut buf[2 * i..], v as u16),
        OperandSize::Bits32 => write_u32_le(&mut buf[4 * i..], v),
    }
}

fn read_field(buf: &[u8], i: usize, size: OperandSize) -> u32 {
    match size {
        OperandSize::Bits16 => read_u16_le(&buf[2 * i..]) as u32,
        OperandSize::Bits32 => read_u32_le(&buf[4 * i..]),
    }
}

/// FNSTENV body. `buf` must hold [`env_len`] bytes.
pub fn store_env(ctx: &FpuContext, buf: &mut [u8]) {
    let size = ctx.config.operand_size;
    write_field(buf, 0, size, ctx.control.0 as u32);
    write_field(buf, 1, size, ctx.status.0 as u32);
    write_field(buf, 2, size, ctx.tag_word() as u32);
    write_field(buf, 3, size, ctx.last_ip.offset);
    write_field(buf, 4, size, ctx.last_ip.selector as u32);
    write_field(buf, 5, size, ctx.last_dp.offset);
    write_field(buf, 6, size, ctx.last_dp.selector as u32);
}

/// FLDENV body. The tag word reclassifies the existing registers: an empty
/// tag empties the slot, a non-empty tag on a slot with no value makes it a
/// zero (there is nothing better to resurrect).
pub fn load_env(ctx: &mut FpuContext, buf: &[u8]) {
    let size = ctx.config.operand_size;
    ctx.control = ControlWord(read_field(buf, 0, size) as u16);
    ctx.status = StatusWord(read_field(buf, 1, size) as u16);
    let tw = read_field(buf, 2, size) as u16;
    ctx.last_ip = PointerPair {
        offset: read_field(buf, 3, size),
        selector: read_field(buf, 4, size) as u16,
    };
    ctx.last_dp = PointerPair {
        offset: read_field(buf, 5, size),
        selector: read_field(buf, 6, size) as u16,
    };
    for i in 0..8 {
        let bits = (tw >> (2 * i)) & 3;
        if bits == 3 {
            ctx.regs[i] = FpReg::empty();
        } else if ctx.regs[i].is_empty() {
            ctx.regs[i] = FpReg::zero(Sign::Pos);
        }
    }
}

/// FNSAVE body: environment plus the raw register images. `buf` must hold
/// [`save_len`] bytes. The dispatcher reinitializes the unit afterwards.
pub fn save(ctx: &FpuContext, buf: &mut [u8]) {
    store_env(ctx, buf);
    let base = env_len(ctx.config.operand_size);
    for (i, r) in ctx.regs.iter().enumerate() {
        let img = store_ext(r);
        buf[base + REG_IMAGE_LEN * i..base + REG_IMAGE_LEN * (i + 1)].copy_from_slice(&img);
    }
}

/// FRSTOR body: the inverse of [`save`]. Registers tagged empty come back
/// empty no matter what bytes their image slots hold.
pub fn restore(ctx: &mut FpuContext, buf: &[u8]) {
    let size = ctx.config.operand_size;
    load_env(ctx, buf);
    let tw = read_field(buf, 2, size) as u16;
    let base = env_len(size);
    for i in 0..8 {
        if (tw >> (2 * i)) & 3 == 3 {
            ctx.regs[i] = FpReg::empty();
            continue;
        }
        let mut img = [0u8; REG_IMAGE_LEN];
        img.copy_from_slice(&buf[base + REG_IMAGE_LEN * i..base + REG_IMAGE_LEN * (i + 1)]);
        ctx.regs[i] = load_ext(&img);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::FpuConfig;
    use crate::reg::{EXP_BIAS, SIG_MSB, Tag};
    use crate::words::ExnFlags;

    fn ctx() -> FpuContext {
        FpuContext::new(FpuConfig::default())
    }

    #[test]
    fn test_env_roundtrip_both_sizes() {
        for size in [OperandSize::Bits16, OperandSize::Bits32] {
            let mut c = ctx();
            c.config.operand_size = size;
            c.control = ControlWord(0x0F7F);
            c.status.set_top(5);
            c.status.raise(ExnFlags::PRECISION);
            c.last_ip = PointerPair { offset: 0x1234, selector: 0x5678 };
            c.last_dp = PointerPair { offset: 0x9ABC, selector: 0xDEF0 };
            let mut buf = vec![0u8; env_len(size)];
            store_env(&c, &mut buf);

            let mut fresh = ctx();
            fresh.config.operand_size = size;
            load_env(&mut fresh, &buf);
            assert_eq!(fresh.control, c.control);
            assert_eq!(fresh.status, c.status);
            assert_eq!(fresh.last_ip, c.last_ip);
            assert_eq!(fresh.last_dp, c.last_dp);
        }
    }

    #[test]
    fn test_env_32bit_offsets_survive() {
        let mut c = ctx();
        c.config.operand_size = OperandSize::Bits32;
        c.last_ip.offset = 0xDEAD_BEEF;
        let mut buf = vec![0u8; env_len(OperandSize::Bits32)];
        store_env(&c, &mut buf);
        let mut fresh = ctx();
        fresh.config.operand_size = OperandSize::Bits32;
        load_env(&mut fresh, &buf);
        assert_eq!(fresh.last_ip.offset, 0xDEAD_BEEF);
    }

    #[test]
    fn test_save_restore_bit_identical() {
        let mut c = ctx();
        c.push(FpReg::nan(Sign::Pos, SIG_MSB | 1).quieted());
        c.push(FpReg::finite(Sign::Neg, EXP_BIAS + 3, 0xDEAD_BEEF_0000_0001 | SIG_MSB));
        c.push(FpReg::zero(Sign::Neg));
        c.control = ControlWord(0x0F7F);
        c.status.raise(ExnFlags::INVALID | ExnFlags::PRECISION);

        let mut buf = vec![0u8; save_len(c.config.operand_size)];
        save(&c, &mut buf);
        let mut fresh = ctx();
        restore(&mut fresh, &buf);

        assert_eq!(fresh.control, c.control);
        assert_eq!(fresh.status, c.status);
        for i in 0..8 {
            assert_eq!(fresh.regs[i], c.regs[i], "register {i}");
        }
        assert_eq!(fresh.tag_word(), c.tag_word());
    }

    #[test]
    fn test_load_env_tag_reclassification() {
        let mut c = ctx();
        c.regs[0] = FpReg::finite(Sign::Pos, EXP_BIAS, SIG_MSB);
        let mut buf = vec![0u8; env_len(c.config.operand_size)];
        store_env(&c, &mut buf);

        let mut other = ctx();
        other.regs[0] = FpReg::finite(Sign::Neg, EXP_BIAS + 1, SIG_MSB);
        // The image tags slot 1 empty, so the value sitting there is dropped.
        other.regs[1] = FpReg::zero(Sign::Pos);
        load_env(&mut other, &buf);
        // Slot 0 keeps its own value, only the classification is applied.
        assert_eq!(other.regs[0].tag, Tag::Valid);
        assert_eq!(other.regs[0].sign, Sign::Neg);
        assert!(other.regs[1].is_empty());
    }

    #[test]
    fn test_image_sizes() {
        assert_eq!(env_len(OperandSize::Bits16), 14);
        assert_eq!(env_len(OperandSize::Bits32), 28);
        assert_eq!(save_len(OperandSize::Bits16), 94);
        assert_eq!(save_len(OperandSize::Bits32), 108);
    }
}
