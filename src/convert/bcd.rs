//! Packed decimal: ten-byte, 18-digit sign-magnitude images.
//!
//! Digits live two to a byte, least significant pair first; byte 9 carries
//! the sign in bit 7. Loads do not validate digit nibbles (out-of-range
//! nibbles produce an unspecified magnitude, as on hardware). Stores round
//! to an integer under rounding control and fall back to the packed-decimal
//! indefinite when the magnitude does not fit 18 digits.

use crate::convert::int::{integer_magnitude, load_i64};
use crate::reg::{FpReg, Sign, Tag};
use crate::words::{ControlWord, ExnFlags};

const MAX_MAGNITUDE: u64 = 999_999_999_999_999_999;

/// The image stored for non-representable sources.
pub fn indefinite_image() -> [u8; 10] {
    let mut bytes = [0u8; 10];
    bytes[9] = 0xFF;
    bytes[8] = 0xFF;
    bytes[7] = 0xC0;
    bytes
}

pub fn load_bcd(bytes: &[u8; 10]) -> FpReg {
    let mut mag: u64 = 0;
    for &b in bytes[0..9].iter().rev() {
        mag = mag * 100 + (b >> 4) as u64 * 10 + (b & 0xF) as u64;
    }
    let sign = Sign::of_bit(bytes[9] & 0x80 != 0);
    if mag == 0 {
        return FpReg::zero(sign);
    }
    let r = load_i64(mag as i64);
    r.with_sign(sign)
}

pub fn store_bcd(r: &FpReg, cw: &ControlWord) -> ([u8; 10], ExnFlags, bool) {
    let (mag, flags, up) = match r.tag {
        Tag::Zero => (0u64, ExnFlags::empty(), false),
        Tag::Valid => match integer_magnitude(r, cw.rounding()) {
            Some((mag, inexact, up)) if mag <= MAX_MAGNITUDE => {
                let flags = if inexact {
                    ExnFlags::PRECISION
                } else {
                    ExnFlags::empty()
                };
                (mag, flags, up)
            }
            _ => return (indefinite_image(), ExnFlags::INVALID, false),
        },
        _ => return (indefinite_image(), ExnFlags::INVALID, false),
    };
    let mut bytes = [0u8; 10];
    let mut rem = mag;
    for b in bytes[0..9].iter_mut() {
        *b = ((rem % 10) | (rem / 10 % 10) << 4) as u8;
        rem /= 100;
    }
    bytes[9] = (r.sign.bit() as u8) << 7;
    (bytes, flags, up)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reg::EXP_BIAS;

    fn cw() -> ControlWord {
        ControlWord::default()
    }

    #[test]
    fn test_roundtrip_integers() {
        for v in [0i64, 1, -1, 42, 987_654_321, -123_456_789_012_345_678] {
            let r = load_i64(v);
            let (bytes, flags, _) = store_bcd(&r, &cw());
            assert!(flags.is_empty());
            let back = load_bcd(&bytes);
            assert_eq!(back, r, "{v}");
        }
    }

    #[test]
    fn test_digit_packing() {
        let r = load_i64(1234);
        let (bytes, _, _) = store_bcd(&r, &cw());
        assert_eq!(bytes[0], 0x34);
        assert_eq!(bytes[1], 0x12);
        assert_eq!(bytes[2], 0x00);
        assert_eq!(bytes[9], 0x00);
        let (bytes, _, _) = store_bcd(&r.negated(), &cw());
        assert_eq!(bytes[9], 0x80);
    }

    #[test]
    fn test_negative_zero_sign_preserved() {
        let mut bytes = [0u8; 10];
        bytes[9] = 0x80;
        let r = load_bcd(&bytes);
        assert_eq!(r, FpReg::zero(Sign::Neg));
    }

    #[test]
    fn test_out_of_range_is_indefinite() {
        let r = load_i64(i64::MAX); // above 18 digits
        let (bytes, flags, _) = store_bcd(&r, &cw());
        assert!(flags.contains(ExnFlags::INVALID));
        assert_eq!(bytes, indefinite_image());
        let (bytes, flags, _) = store_bcd(&FpReg::infinity(Sign::Pos), &cw());
        assert!(flags.contains(ExnFlags::INVALID));
        assert_eq!(bytes, indefinite_image());
    }

    #[test]
    fn test_rounds_to_integer() {
        // 2.5 rounds to even.
        let r = FpReg::finite(Sign::Pos, EXP_BIAS + 1, 0xA000_0000_0000_0000);
        let (bytes, flags, _) = store_bcd(&r, &cw());
        assert!(flags.contains(ExnFlags::PRECISION));
        assert_eq!(load_bcd(&bytes), load_i64(2));
    }
}
