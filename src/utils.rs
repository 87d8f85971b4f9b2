//! Small bit-twiddling helpers shared across the crate.

/// Build a mask with bits `[low, high]` (inclusive) set.
pub const fn make_mask(low: u32, high: u32) -> u64 {
    debug_assert!(low <= high && high < 64);
    let span = high - low + 1;
    if span == 64 {
        u64::MAX
    } else {
        ((1u64 << span) - 1) << low
    }
}

/// Right-shift a 128-bit significand pair, OR-reducing every shifted-out bit
/// into the returned sticky flag.
pub fn shr128_sticky(hi: u64, lo: u64, shift: u32) -> (u64, u64, bool) {
    if shift == 0 {
        return (hi, lo, false);
    }
    let v = ((hi as u128) << 64) | lo as u128;
    if shift >= 128 {
        return (0, 0, v != 0);
    }
    let sticky = v & ((1u128 << shift) - 1) != 0;
    let v = v >> shift;
    ((v >> 64) as u64, v as u64, sticky)
}

/// Leading-zero count of a 128-bit significand pair.
pub fn lz128(hi: u64, lo: u64) -> u32 {
    if hi != 0 {
        hi.leading_zeros()
    } else {
        64 + lo.leading_zeros()
    }
}

pub fn read_u16_le(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}

pub fn read_u32_le(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub fn read_u64_le(buf: &[u8]) -> u64 {
    u64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ])
}

pub fn write_u16_le(buf: &mut [u8], v: u16) {
    buf[..2].copy_from_slice(&v.to_le_bytes());
}

pub fn write_u32_le(buf: &mut [u8], v: u32) {
    buf[..4].copy_from_slice(&v.to_le_bytes());
}

pub fn write_u64_le(buf: &mut [u8], v: u64) {
    buf[..8].copy_from_slice(&v.to_le_bytes());
}
