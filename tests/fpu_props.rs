//! End-to-end properties of the unit: totality over operand classes, image
//! roundtrips, sticky-flag discipline, and a bit-exact comparison of the
//! basic operations against the `rustc_apfloat` extended-precision model.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_apfloat::ieee::X87DoubleExtended;
use rustc_apfloat::{Float, Round};

use x87_emulator::arith::add_sub::{add, sub};
use x87_emulator::arith::compare::fcom;
use x87_emulator::arith::div::div;
use x87_emulator::arith::mul::mul;
use x87_emulator::arith::sqrt::sqrt;
use x87_emulator::convert::int::store_i32;
use x87_emulator::convert::real::{load_ext, load_f32, load_f64, store_ext, store_f64};
use x87_emulator::reg::{EXP_BIAS, EXP_MIN, QNAN_BIT, SIG_MSB};
use x87_emulator::trans::exp2::f2xm1;
use x87_emulator::{
    ControlWord, CpuBridge, ExnFlags, FpReg, FpuConfig, FpuContext, FpuFault, MemOperand,
    PointerPair, QuirkMode, Sign, Tag, exec_mem, exec_reg, state,
};

fn cw() -> ControlWord {
    ControlWord::default()
}

fn ip() -> PointerPair {
    PointerPair { offset: 0x100, selector: 0x08 }
}

fn v(x: f64) -> FpReg {
    load_f64(x.to_bits()).0
}

fn f(r: &FpReg) -> f64 {
    let (bits, _, _) = store_f64(r, &cw());
    f64::from_bits(bits)
}

fn reg_bits(r: &FpReg) -> u128 {
    let img = store_ext(r);
    let mut b = [0u8; 16];
    b[..10].copy_from_slice(&img);
    u128::from_le_bytes(b)
}

#[test]
fn dyadic_operations_are_total_over_operand_classes() {
    let reps = [
        v(1.5),
        FpReg::zero(Sign::Neg),
        FpReg::infinity(Sign::Pos),
        FpReg::nan(Sign::Pos, SIG_MSB | QNAN_BIT | 7),
        // Kept normalized below the normal range: a denormal operand.
        FpReg::finite(Sign::Pos, EXP_MIN - 10, SIG_MSB),
    ];
    for a in &reps {
        for b in &reps {
            for (r, flags, _) in [
                add(a, b, &cw()),
                sub(a, b, &cw()),
                mul(a, b, &cw()),
                div(a, b, &cw(), QuirkMode::HardwareCompatible),
            ] {
                assert_ne!(r.tag, Tag::Empty);
                // Pure value transforms never report stack trouble.
                assert!(!flags.contains(ExnFlags::STACK_FAULT));
            }
            let (_, flags) = fcom(a, b, false);
            assert!(!flags.contains(ExnFlags::STACK_FAULT));
        }
    }
}

#[test]
fn extended_image_roundtrip_is_exact() {
    let samples = [
        v(1.0),
        v(-3.25),
        FpReg::zero(Sign::Neg),
        FpReg::infinity(Sign::Neg),
        FpReg::nan(Sign::Pos, SIG_MSB | QNAN_BIT | 0xBEEF),
        // Signaling payloads survive the raw 80-bit image untouched.
        FpReg::nan(Sign::Neg, SIG_MSB | 1),
        FpReg::finite(Sign::Pos, EXP_MIN - 20, SIG_MSB | 12345),
        FpReg::finite(Sign::Neg, EXP_BIAS + 1000, SIG_MSB | 1),
    ];
    for r in &samples {
        let img = store_ext(r);
        let back = load_ext(&img);
        assert_eq!(store_ext(&back), img, "{r:?}");
    }
}

#[test]
fn save_restore_identity_on_random_states() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5157);
    for _ in 0..50 {
        let mut c = FpuContext::new(FpuConfig::default());
        c.control = ControlWord(0x037F & !(0x3 << 10) | (rng.random_range(0..4u16) << 10));
        let n = rng.random_range(0..=8);
        for _ in 0..n {
            c.push(v(f64::from_bits(rng.random::<u64>() & 0x7FEF_FFFF_FFFF_FFFF)));
        }
        if rng.random::<bool>() {
            c.status.raise(ExnFlags::PRECISION | ExnFlags::UNDERFLOW);
        }

        let mut buf = vec![0u8; state::save_len(c.config.operand_size)];
        state::save(&c, &mut buf);
        let mut fresh = FpuContext::new(FpuConfig::default());
        state::restore(&mut fresh, &buf);

        assert_eq!(fresh.control, c.control);
        assert_eq!(fresh.status, c.status);
        assert_eq!(fresh.tag_word(), c.tag_word());
        for i in 0..8 {
            assert_eq!(reg_bits(&fresh.regs[i]), reg_bits(&c.regs[i]));
        }
    }
}

#[test]
fn sticky_flags_accumulate_and_clear() {
    let mut c = FpuContext::new(FpuConfig::default());
    let mut b = CpuBridge::default();
    push_f64(&mut c, 0.0);
    push_f64(&mut c, 5.0);
    exec_reg(&mut c, 0xD8, 0xF1, ip(), &mut b).unwrap();
    let once = c.status.sticky();
    assert!(once.contains(ExnFlags::ZERO_DIVIDE));
    // Reissuing only grows the set.
    push_f64(&mut c, 0.0);
    push_f64(&mut c, 5.0);
    exec_reg(&mut c, 0xD8, 0xF1, ip(), &mut b).unwrap();
    assert!(c.status.sticky().contains(once));
    // FNCLEX wipes it.
    exec_reg(&mut c, 0xDB, 0xE2, ip(), &mut b).unwrap();
    assert!(c.status.sticky().is_empty());
}

#[test]
fn integer_ties_round_to_even() {
    for (x, want) in [(0.5f64, 0i32), (1.5, 2), (2.5, 2), (-0.5, 0), (-1.5, -2)] {
        let (r, flags, _) = store_i32(&v(x), &cw(), false);
        assert_eq!(r, want, "{x}");
        assert!(flags.contains(ExnFlags::PRECISION));
    }
}

fn push_f64(c: &mut FpuContext, x: f64) {
    let mut buf = x.to_bits().to_le_bytes();
    let mut mem = MemOperand { buf: &mut buf, addr: 0, selector: 0 };
    exec_mem(c, 0xDD, 0x00, &mut mem, ip()).unwrap();
}

#[test]
fn load_single_one() {
    let (r, flags) = load_f32(0x3F80_0000);
    assert_eq!(r.tag, Tag::Valid);
    assert_eq!(r.sign, Sign::Pos);
    assert_eq!(r.exp, EXP_BIAS);
    assert_eq!(r.sig, SIG_MSB);
    assert!(flags.is_empty());
}

#[test]
fn divide_by_zero_masked_and_unmasked() {
    let mut c = FpuContext::new(FpuConfig::default());
    let mut b = CpuBridge::default();
    push_f64(&mut c, 0.0);
    push_f64(&mut c, 5.0);
    exec_reg(&mut c, 0xD8, 0xF1, ip(), &mut b).unwrap();
    assert_eq!(f(c.st(0)), f64::INFINITY);

    let mut c = FpuContext::new(FpuConfig::default());
    c.control = ControlWord(0x037F & !0x04);
    push_f64(&mut c, 0.0);
    push_f64(&mut c, 5.0);
    let err = exec_reg(&mut c, 0xD8, 0xF1, ip(), &mut b).unwrap_err();
    assert_eq!(err, FpuFault::ZeroDivide);
    assert_eq!(f(c.st(0)), 5.0);
    assert_ne!(c.status.0 & 0x80, 0); // summary bit
}

#[test]
fn sqrt_of_negative_masked() {
    let (r, flags, _) = sqrt(&v(-4.0), &cw());
    assert_eq!(r, FpReg::indefinite());
    assert!(flags.contains(ExnFlags::INVALID));
}

#[test]
fn two_to_the_half_minus_one() {
    let (r, _, _) = f2xm1(&v(0.5), &cw());
    let want = std::f64::consts::SQRT_2 - 1.0;
    assert!((f(&r) - want).abs() < 1e-15);
}

#[test]
fn state_image_preserves_nan_payload_and_modes() {
    let mut c = FpuContext::new(FpuConfig::default());
    c.control = ControlWord(0x0F7F); // chop, 64-bit precision
    c.push(FpReg::nan(Sign::Pos, SIG_MSB | QNAN_BIT | 0x1));
    let mut buf = vec![0u8; state::save_len(c.config.operand_size)];
    let mut mem = MemOperand { buf: &mut buf, addr: 0, selector: 0 };
    exec_mem(&mut c, 0xDD, 0x30, &mut mem, ip()).unwrap(); // FNSAVE
    assert!(c.st(0).is_empty());

    let mut mem = MemOperand { buf: &mut buf, addr: 0, selector: 0 };
    exec_mem(&mut c, 0xDD, 0x20, &mut mem, ip()).unwrap(); // FRSTOR
    assert_eq!(c.control.0, 0x0F7F);
    assert_eq!(c.st(0).sig, SIG_MSB | QNAN_BIT | 0x1);
    assert!(c.st(1).is_empty());
}

fn round_of(rc: u16) -> Round {
    match rc {
        0 => Round::NearestTiesToEven,
        1 => Round::TowardNegative,
        2 => Round::TowardPositive,
        _ => Round::TowardZero,
    }
}

/// Bit-exact oracle check of add/sub/mul/div on finite operands at every
/// rounding mode, against `rustc_apfloat`'s x87 extended type.
#[test]
fn basic_operations_match_apfloat() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x87);
    for _ in 0..500 {
        // Finite normal doubles; products and quotients stay comfortably
        // inside the extended range so no underflow paths diverge.
        let bits_of = |rng: &mut ChaCha8Rng| -> u64 {
            let sign = (rng.random::<bool>() as u64) << 63;
            let exp = rng.random_range(1..2047u64) << 52;
            sign | exp | (rng.random::<u64>() & 0x000F_FFFF_FFFF_FFFF)
        };
        let a = load_f64(bits_of(&mut rng)).0;
        let b = load_f64(bits_of(&mut rng)).0;
        let xa = X87DoubleExtended::from_bits(reg_bits(&a));
        let xb = X87DoubleExtended::from_bits(reg_bits(&b));

        for rc in 0..4u16 {
            let cw = ControlWord(0x037F | (rc << 10));
            let round = round_of(rc);
            let pairs = [
                (add(&a, &b, &cw).0, xa.add_r(xb, round).value),
                (sub(&a, &b, &cw).0, xa.sub_r(xb, round).value),
                (mul(&a, &b, &cw).0, xa.mul_r(xb, round).value),
                (
                    div(&a, &b, &cw, QuirkMode::HardwareCompatible).0,
                    xa.div_r(xb, round).value,
                ),
            ];
            for (i, (mine, want)) in pairs.iter().enumerate() {
                assert_eq!(
                    reg_bits(mine),
                    want.to_bits(),
                    "op {i} rc {rc}: {:?} vs {:?}",
                    f(&a),
                    f(&b),
                );
            }
        }
    }
}
