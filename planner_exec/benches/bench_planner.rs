//! # Planner Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nalgebra::Vector2;
use planner_lib::{
    data::{DynamicObstacle, ReferencePath},
    obstacles::{ensure_obstacle_size, gaussian_constant_velocity_prediction},
    spline::Spline2D,
};

fn planner_benchmark(c: &mut Criterion) {
    // ---- Build a winding reference path ----

    let x: Vec<f64> = (0..50).map(|i| i as f64 * 2.0).collect();
    let y: Vec<f64> = x.iter().map(|x| (x * 0.1).sin() * 3.0).collect();
    let path = ReferencePath::new(x.clone(), y.clone());

    c.bench_function("Spline2D::from_path", |b| {
        b.iter(|| Spline2D::from_path(black_box(&path)).unwrap())
    });

    let spline = Spline2D::from_path(&path).unwrap();
    let point = Vector2::new(41.3, 1.2);

    c.bench_function("Spline2D::find_closest_point::full", |b| {
        b.iter(|| spline.find_closest_point(black_box(&point), None, 3))
    });
    c.bench_function("Spline2D::find_closest_point::window", |b| {
        b.iter(|| spline.find_closest_point(black_box(&point), Some(20), 3))
    });

    // ---- Obstacle normalisation ----

    let obstacles: Vec<DynamicObstacle> = (0..40)
        .map(|i| {
            let position = Vector2::new((i * 7 % 31) as f64, (i * 3 % 11) as f64 - 5.0);
            let mut o = DynamicObstacle::new(i, position, 0.0, 0.3);
            o.prediction = gaussian_constant_velocity_prediction(
                position,
                Vector2::new(-0.5, 0.1),
                0.2,
                20,
                0.05,
                0.05,
            );
            o
        })
        .collect();

    c.bench_function("ensure_obstacle_size", |b| {
        b.iter(|| {
            let mut set = obstacles.clone();
            ensure_obstacle_size(&mut set, Vector2::new(10.0, 0.0), 4, 0.2, 20);
            set
        })
    });
}

criterion_group!(benches, planner_benchmark);
criterion_main!(benches);
