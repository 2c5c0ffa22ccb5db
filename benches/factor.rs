use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use structmat::{
    BandTriDiagDecomp, DenseTriDiagDecomp, DynMatrix, DynVector, Factorization, GenFact, PdBandFact,
    PdFact, SchurDecomp, SymBandMatrix, SymFact, SymMatrix, TriDiagFact, TriDiagMatrix,
};

const SIZES: [usize; 3] = [8, 32, 96];

// ---------------------------------------------------------------------------
// Helpers: deterministic test matrices
// ---------------------------------------------------------------------------

fn dense(n: usize) -> DynMatrix<f64> {
    DynMatrix::from_fn(n, n, |i, j| ((i * 7 + j * 3) % 11) as f64 - 5.0 + if i == j { n as f64 } else { 0.0 })
}

fn spd(n: usize) -> SymMatrix<f64> {
    let mut a = SymMatrix::new(n, n).unwrap();
    for j in 0..n {
        for i in 0..=j {
            let v = ((i + 1) * (j + 1) % 5) as f64 + if i == j { 2.0 * n as f64 } else { 0.0 };
            a.set(i, j, v).unwrap();
        }
    }
    a
}

fn indefinite(n: usize) -> SymMatrix<f64> {
    let mut a = spd(n);
    for i in (0..n).step_by(2) {
        a.set(i, i, -(n as f64)).unwrap();
    }
    a
}

fn spd_band(n: usize, h: usize) -> SymBandMatrix<f64> {
    let mut a = SymBandMatrix::with_bandwidth(n, n, h).unwrap();
    for j in 0..n {
        a.set(j, j, 4.0 * h as f64 + 1.0).unwrap();
        for i in j.saturating_sub(h)..j {
            a.set(i, j, 1.0 / (1 + j - i) as f64).unwrap();
        }
    }
    a
}

fn rhs(n: usize) -> DynVector<f64> {
    DynVector::from_vec((0..n).map(|i| (i % 3) as f64 + 1.0).collect())
}

// ---------------------------------------------------------------------------
// Factorizations
// ---------------------------------------------------------------------------

fn factor_dense(c: &mut Criterion) {
    let mut g = c.benchmark_group("factor_dense");
    for n in SIZES {
        let a = dense(n);
        g.bench_with_input(BenchmarkId::new("lu", n), &a, |b, a| {
            b.iter(|| GenFact::new(std::hint::black_box(a), false))
        });
        let s = indefinite(n);
        g.bench_with_input(BenchmarkId::new("bunch_kaufman", n), &s, |b, s| {
            b.iter(|| SymFact::new(std::hint::black_box(s), false))
        });
        let p = spd(n);
        g.bench_with_input(BenchmarkId::new("cholesky", n), &p, |b, p| {
            b.iter(|| PdFact::new(std::hint::black_box(p), false))
        });
    }
    g.finish();
}

fn factor_banded(c: &mut Criterion) {
    let mut g = c.benchmark_group("factor_banded");
    for n in SIZES {
        let a = spd_band(n, 3);
        g.bench_with_input(BenchmarkId::new("pd_band", n), &a, |b, a| {
            b.iter(|| PdBandFact::new(std::hint::black_box(a), false))
        });

        let mut t = TriDiagMatrix::<f64>::new(n, n).unwrap();
        for i in 0..n {
            t.set(i, i, 4.0).unwrap();
            if i + 1 < n {
                t.set(i, i + 1, 1.0).unwrap();
                t.set(i + 1, i, -1.0).unwrap();
            }
        }
        g.bench_with_input(BenchmarkId::new("tridiagonal", n), &t, |b, t| {
            b.iter(|| TriDiagFact::new(std::hint::black_box(t), false))
        });
    }
    g.finish();
}

fn condition_estimate(c: &mut Criterion) {
    let mut g = c.benchmark_group("condition_estimate");
    for n in SIZES {
        let p = spd(n);
        g.bench_with_input(BenchmarkId::new("cholesky_with_rcond", n), &p, |b, p| {
            b.iter(|| PdFact::new(std::hint::black_box(p), true))
        });
    }
    g.finish();
}

fn solve(c: &mut Criterion) {
    let mut g = c.benchmark_group("solve");
    for n in SIZES {
        let f = SymFact::new(&indefinite(n), false);
        let b = rhs(n);
        g.bench_with_input(BenchmarkId::new("bunch_kaufman", n), &b, |bench, b| {
            bench.iter(|| f.solve(std::hint::black_box(b)))
        });
    }
    g.finish();
}

// ---------------------------------------------------------------------------
// Decompositions
// ---------------------------------------------------------------------------

fn decompositions(c: &mut Criterion) {
    let mut g = c.benchmark_group("decomp");
    g.sample_size(20);
    for n in [8, 32] {
        let a = dense(n);
        g.bench_with_input(BenchmarkId::new("schur", n), &a, |b, a| {
            b.iter(|| SchurDecomp::new(std::hint::black_box(a)))
        });
        let s = spd(n);
        g.bench_with_input(BenchmarkId::new("tridiag_dense", n), &s, |b, s| {
            b.iter(|| DenseTriDiagDecomp::from_symmetric(std::hint::black_box(s)))
        });
        let band = spd_band(n, 3);
        g.bench_with_input(BenchmarkId::new("tridiag_band", n), &band, |b, band| {
            b.iter(|| BandTriDiagDecomp::from_symmetric(std::hint::black_box(band)))
        });
        g.bench_with_input(BenchmarkId::new("tridiag_band_without_q", n), &band, |b, band| {
            b.iter(|| BandTriDiagDecomp::from_symmetric_without_q(std::hint::black_box(band)))
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    factor_dense,
    factor_banded,
    condition_estimate,
    solve,
    decompositions
);
criterion_main!(benches);
