use criterion::{black_box, criterion_group, criterion_main, Criterion};
use geo::{polygon, MultiPolygon, Polygon};
use waste_map::braille::BrailleCanvas;
use waste_map::config::AppConfig;
use waste_map::filter::{nearby, within_region};
use waste_map::map::geometry::fill_polygon;
use waste_map::map::{Choropleth, ValueIndex, Viewport};
use waste_map::names::NameNormalizer;
use waste_map::types::{Coordinate, Entity, RegionFeature};

const GRID: usize = 16;

fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
    polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x + size, y: y + size),
        (x: x, y: y + size),
        (x: x, y: y),
    ]
}

/// A GRID x GRID tiling of 0.1 degree districts around central Korea.
fn districts() -> Vec<RegionFeature> {
    (0..GRID * GRID)
        .map(|i| {
            let x = 126.0 + (i % GRID) as f64 * 0.1;
            let y = 35.5 + (i / GRID) as f64 * 0.1;
            RegionFeature {
                name: format!("경기도 구역{i}시"),
                geometry: MultiPolygon(vec![square(x, y, 0.1)]),
            }
        })
        .collect()
}

fn companies(count: usize) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            // deterministic scatter over the grid extent
            let t = i as f64;
            let lat = 35.5 + (t * 0.618_033_988_7).fract() * 1.6;
            let lng = 126.0 + (t * 0.414_213_562_3).fract() * 1.6;
            Entity {
                name: format!("업체{i}"),
                coordinate: Coordinate::new(lat, lng),
                representative: String::new(),
                phone: String::new(),
                waste_type: String::new(),
            }
        })
        .collect()
}

fn bench_binding(c: &mut Criterion) {
    let config = AppConfig::default();
    let normalizer = NameNormalizer::from_config(&config.names);
    let features = districts();
    let stats: Vec<(String, f64)> = (0..GRID * GRID)
        .map(|i| (format!("구역{i}시"), (i * 137 % 5000) as f64))
        .collect();

    c.bench_function("value_index_256", |b| {
        b.iter(|| ValueIndex::from_pairs(black_box(stats.iter().map(|(k, v)| (k, *v))), &normalizer))
    });

    let values = ValueIndex::from_pairs(stats.iter().map(|(k, v)| (k, *v)), &normalizer);
    c.bench_function("choropleth_build_256", |b| {
        b.iter(|| Choropleth::build(black_box(features.clone()), &values, &normalizer, &config.scale))
    });
}

fn bench_filters(c: &mut Criterion) {
    let entities = companies(20_000);
    let origin = Coordinate::new(36.3, 126.8);
    c.bench_function("nearby_20k", |b| b.iter(|| nearby(black_box(origin), &entities, 10.0).len()));

    let region = MultiPolygon(vec![square(126.4, 35.9, 0.5)]);
    c.bench_function("within_region_20k", |b| {
        b.iter(|| within_region(black_box(&region), &entities).len())
    });
}

fn bench_fill(c: &mut Criterion) {
    let features = districts();
    let viewport = Viewport::fit_bounds(126.0, 35.5, 127.6, 37.1, 400, 320);
    c.bench_function("fill_polygon_256", |b| {
        b.iter(|| {
            let mut canvas = BrailleCanvas::new(200, 80);
            for feature in &features {
                for polygon in &feature.geometry.0 {
                    fill_polygon(&mut canvas, polygon, &viewport);
                }
            }
            black_box(canvas.is_blank())
        })
    });
}

criterion_group!(benches, bench_binding, bench_filters, bench_fill);
criterion_main!(benches);
