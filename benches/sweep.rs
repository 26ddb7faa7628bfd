use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sweepgeom::{Point, Segment, SweepDriver};

fn random_segments(n: usize, seed: u64) -> Vec<Segment> {
  let mut rng = SmallRng::seed_from_u64(seed);
  (0..n)
    .map(|_| {
      let a = Point::new(rng.gen_range(-1e3..1e3), rng.gen_range(-1e3..1e3));
      let b = Point::new(rng.gen_range(-1e3..1e3), rng.gen_range(-1e3..1e3));
      Segment::new(a, b)
    })
    .collect()
}

fn bench_random_segments(c: &mut Criterion) {
  let mut group = c.benchmark_group("sweep_random_segments");
  for &n in &[100usize, 500, 2_000] {
    let segments = random_segments(n, 0xC0FFEE);
    group.bench_with_input(BenchmarkId::from_parameter(n), &segments, |b, segments| {
      b.iter(|| {
        let mut driver = SweepDriver::new();
        driver.scan(black_box(segments)).unwrap();
        black_box(driver.intersections().len())
      });
    });
  }
  group.finish();
}

fn bench_dense_grid(c: &mut Criterion) {
  // A grid of horizontal/vertical segments: worst case for the number of
  // pairwise crossings at fixed input size.
  let mut segments = Vec::new();
  for i in 0..40 {
    let v = i as f64;
    segments.push(Segment::new(Point::new(v, -40.0), Point::new(v, 40.0)));
    segments.push(Segment::new(Point::new(-40.0, v), Point::new(40.0, v)));
  }
  c.bench_function("sweep_dense_grid", |b| {
    b.iter(|| {
      let mut driver = SweepDriver::new();
      driver.scan(black_box(&segments)).unwrap();
      black_box(driver.intersections().len())
    });
  });
}

criterion_group!(benches, bench_random_segments, bench_dense_grid);
criterion_main!(benches);
