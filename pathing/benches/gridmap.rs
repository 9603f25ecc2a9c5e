use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pathing::{GridMap, PathFinder, PathFinderState, Point};

/// A serpentine maze: every other row is a wall with a single gap, alternating sides
fn serpentine(rows: usize, columns: usize) -> Result<GridMap, anyhow::Error> {
    let mut picture = String::new();
    for row in 0..rows {
        for col in 0..columns {
            let wall_row = row % 2 == 1;
            let gap = if row % 4 == 1 { columns - 1 } else { 0 };
            picture.push(if wall_row && col != gap { '#' } else { '.' });
        }
        picture.push('\n');
    }
    Ok(picture.parse()?)
}

fn load_base_map_scaled(factor: usize) -> (GridMap, Point, Point) {
    let mut map = serpentine(31, 50).unwrap();
    let mut start = Point { row: 0, col: 0 };
    let mut goal = Point { row: 30, col: 49 };

    map.scale_up(factor);
    start.row *= factor;
    start.col *= factor;
    goal.row *= factor;
    goal.col *= factor;

    (map, start, goal)
}

fn bench_map_scaled(c: &mut Criterion, factor: usize) {
    let (map, start, goal) = load_base_map_scaled(factor);

    c.bench_function(&format!("map_scaled_{}", factor), |b| {
        b.iter(|| {
            let (res, _) = PathFinder::new(&map, black_box(start), black_box(goal)).finish(&map);
            assert!(matches!(res, PathFinderState::PathFound(_)));
        })
    });
}

pub fn map_small(c: &mut Criterion) {
    bench_map_scaled(c, 1);
}

pub fn map_medium(c: &mut Criterion) {
    bench_map_scaled(c, 2);
}

pub fn map_large(c: &mut Criterion) {
    bench_map_scaled(c, 4);
}

criterion_group!(benches, map_small, map_medium, map_large);
criterion_main!(benches);
