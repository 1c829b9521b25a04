use waste_map::config::{AppConfig, LabelsConfig};
use waste_map::data::{parse_boundaries, parse_entities, parse_stats, region_names};
use waste_map::filter::{nearby, within_region};
use waste_map::map::{legend_ticks, Choropleth, LabelPlacer, ValueIndex, Viewport};
use waste_map::names::NameNormalizer;

const DISTRICTS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "properties": {"SGG_NM": "경기도 수원시"},
         "geometry": {"type": "Polygon", "coordinates": [[[126.9,37.2],[127.1,37.2],[127.1,37.4],[126.9,37.4],[126.9,37.2]]]}},
        {"type": "Feature", "properties": {"SGG_NM": "경기도 성남시"},
         "geometry": {"type": "Polygon", "coordinates": [[[127.1,37.3],[127.2,37.3],[127.2,37.5],[127.1,37.5],[127.1,37.3]]]}},
        {"type": "Feature", "properties": {"SGG_NM": "경기도 가평군"},
         "geometry": {"type": "MultiPolygon", "coordinates": [[[[127.3,37.7],[127.5,37.7],[127.5,37.9],[127.3,37.9],[127.3,37.7]]]]}}
    ]
}"#;

const STATS: &str = r#"{"수원시": 52000.4, "성남시": 1200, "연천군": 80}"#;

const COMPANIES: &str = r#"[
    {"entrps_nm": "수원자원", "latitude": "37.30", "longitude": "127.00", "wste": "폐지"},
    {"entrps_nm": "성남환경", "latitude": 37.40, "longitude": 127.15, "wste": "폐플라스틱"},
    {"entrps_nm": "경계업체", "latitude": 37.35, "longitude": 127.10},
    {"entrps_nm": "좌표없음", "latitude": "", "longitude": ""}
]"#;

fn setup() -> (AppConfig, NameNormalizer) {
    let config = AppConfig::default();
    let normalizer = NameNormalizer::from_config(&config.names);
    (config, normalizer)
}

#[test]
fn binds_colors_and_labels_a_district_view() {
    let (config, normalizer) = setup();
    let features = parse_boundaries(&mut DISTRICTS.as_bytes().to_vec(), "SGG_NM").unwrap();
    assert_eq!(region_names(&features, &normalizer), ["가평군", "성남시", "수원시"]);

    let stats = parse_stats(&mut STATS.as_bytes().to_vec()).unwrap();
    let values = ValueIndex::from_pairs(stats, &normalizer);
    let map = Choropleth::build(features, &values, &normalizer, &config.scale).unwrap();

    // 연천군 has a value but no boundary; 가평군 has a boundary but no value
    assert_eq!(map.regions.len(), 3);
    assert_eq!(map.matched(), 2);
    let gapyeong = map.region("가평군").unwrap();
    assert_eq!(gapyeong.color, config.scale.fallback);
    assert_eq!(gapyeong.tooltip(), "가평군\n데이터 없음");
    assert_eq!(map.region("수원시").unwrap().tooltip(), "수원시\n52,000톤");
    assert_eq!(map.region("수원시").unwrap().color, *config.scale.stops.last().unwrap());

    let scale = map.scale.as_ref().unwrap();
    let ticks = legend_ticks(scale, config.scale.district_ticks);
    assert_eq!(ticks.len(), 4);
    assert_eq!(ticks[0].label, "80톤");
    assert_eq!(ticks[3].label, "5.2만");

    let viewport = Viewport::fit_bounds(126.9, 37.2, 127.5, 37.9, 200, 160);
    let labels = LabelPlacer::from_config(&LabelsConfig::default(), viewport.width).place_all(&map.regions, &viewport);
    assert_eq!(labels.len(), 3);
    for label in &labels {
        assert!(label.position.x > 0.0 && label.position.x < 200.0, "{label:?}");
        assert!(label.position.y > 0.0 && label.position.y < 160.0, "{label:?}");
    }
}

#[test]
fn filters_companies_by_district_and_radius() {
    let (config, normalizer) = setup();
    let features = parse_boundaries(&mut DISTRICTS.as_bytes().to_vec(), "SGG_NM").unwrap();
    let companies = parse_entities(&mut COMPANIES.as_bytes().to_vec()).unwrap();
    assert_eq!(companies.len(), 3);

    let suwon = features
        .iter()
        .find(|f| normalizer.normalize(&f.name) == "수원시")
        .unwrap();
    let inside: Vec<&str> = within_region(&suwon.geometry, &companies)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    // the company on the shared edge belongs to neither district
    assert_eq!(inside, ["수원자원"]);

    let origin = companies[0].coordinate;
    let close: Vec<&str> = nearby(origin, &companies, config.nearby.radius_km)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert!(close.contains(&"수원자원"));
    assert!(!close.contains(&"성남환경"));
}
