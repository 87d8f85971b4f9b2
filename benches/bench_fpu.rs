use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use x87_emulator::arith::add_sub::add;
use x87_emulator::arith::div::div;
use x87_emulator::arith::mul::mul;
use x87_emulator::convert::real::load_f64;
use x87_emulator::trans::log2::fyl2x;
use x87_emulator::trans::sincos::fsin;
use x87_emulator::{
    ControlWord, CpuBridge, FpReg, FpuConfig, FpuContext, PointerPair, QuirkMode, exec_reg,
};

fn operands(n: usize) -> Vec<(FpReg, FpReg)> {
    let mut rng = ChaCha8Rng::seed_from_u64(0xB127);
    (0..n)
        .map(|_| {
            let bits = |rng: &mut ChaCha8Rng| {
                let exp = rng.random_range(1..2047u64) << 52;
                exp | (rng.random::<u64>() & 0x000F_FFFF_FFFF_FFFF)
            };
            (load_f64(bits(&mut rng)).0, load_f64(bits(&mut rng)).0)
        })
        .collect()
}

fn bench_arith(c: &mut Criterion) {
    let mut group = c.benchmark_group("arith");
    let cw = ControlWord::default();
    let ops = operands(256);

    group.bench_function("add", |b| {
        b.iter(|| {
            for (x, y) in &ops {
                black_box(add(x, y, &cw));
            }
        })
    });
    group.bench_function("mul", |b| {
        b.iter(|| {
            for (x, y) in &ops {
                black_box(mul(x, y, &cw));
            }
        })
    });
    group.bench_function("div", |b| {
        b.iter(|| {
            for (x, y) in &ops {
                black_box(div(x, y, &cw, QuirkMode::HardwareCompatible));
            }
        })
    });

    group.finish();
}

fn bench_trans(c: &mut Criterion) {
    let mut group = c.benchmark_group("trans");
    group.sample_size(50);
    let cw = ControlWord::default();
    let x = load_f64(2.75f64.to_bits()).0;
    let y = load_f64(1.5f64.to_bits()).0;

    group.bench_function("fsin", |b| {
        b.iter(|| black_box(fsin(&x, &cw)))
    });
    group.bench_function("fyl2x", |b| {
        b.iter(|| black_box(fyl2x(&y, &x, &cw)))
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let ip = PointerPair { offset: 0x100, selector: 0x08 };
    c.bench_function("dispatch_fadd", |b| {
        let mut ctx = FpuContext::new(FpuConfig::default());
        let mut bridge = CpuBridge::default();
        ctx.push(load_f64(1.25f64.to_bits()).0);
        ctx.push(load_f64(2.5f64.to_bits()).0);
        b.iter(|| {
            // D8 C1: FADD st0, st1; st0 grows but stays finite long enough.
            black_box(exec_reg(&mut ctx, 0xD8, 0xC1, ip, &mut bridge)).unwrap();
        })
    });
}

criterion_group!(benches, bench_arith, bench_trans, bench_dispatch);
criterion_main!(benches);
