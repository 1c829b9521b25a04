//! TOML configuration with built-in defaults for every lookup table.

use crate::error::Result;
use crate::types::Rgb;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub geo: GeoConfig,
    pub scale: ScaleConfig,
    pub names: NamesConfig,
    pub labels: LabelsConfig,
    pub view: ViewConfig,
    pub nearby: NearbyConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Statistics and company feeds; a local directory path also works
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://elbserver.store/waste_status_api".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    pub dir: PathBuf,
    /// National province boundaries
    pub province_file: String,
    /// Directory of `{slug}-geo.json` district files
    pub district_dir: String,
    /// National district boundaries used for company lookups
    pub sig_file: String,
    pub province_name_property: String,
    pub district_name_property: String,
    pub sig_name_property: String,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("geo"),
            province_file: "jeongug-sido-geo_opt.json".to_string(),
            district_dir: "sgg".to_string(),
            sig_file: "sig/sig-geo.json".to_string(),
            province_name_property: "CTP_KOR_NM".to_string(),
            district_name_property: "SGG_NM".to_string(),
            sig_name_property: "SIG_KOR_NM".to_string(),
        }
    }
}

impl GeoConfig {
    pub fn province_path(&self) -> PathBuf {
        self.dir.join(&self.province_file)
    }

    pub fn district_path(&self, slug: &str) -> PathBuf {
        self.dir.join(&self.district_dir).join(format!("{}-geo.json", slug))
    }

    pub fn sig_path(&self) -> PathBuf {
        self.dir.join(&self.sig_file)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Palest to darkest
    pub stops: Vec<Rgb>,
    /// Fill for regions without data
    pub fallback: Rgb,
    pub province_ticks: usize,
    pub district_ticks: usize,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            stops: vec![
                Rgb::new(0xfe, 0xf0, 0xd9),
                Rgb::new(0xfd, 0xcc, 0x8a),
                Rgb::new(0xfc, 0x8d, 0x59),
                Rgb::new(0xe3, 0x4a, 0x33),
                Rgb::new(0xb3, 0x00, 0x00),
            ],
            fallback: Rgb::new(0xee, 0xee, 0xee),
            province_ticks: 5,
            district_ticks: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamesConfig {
    /// Official province names stripped from district names
    pub prefixes: Vec<String>,
    /// Official name -> short display name
    pub synonyms: HashMap<String, String>,
    /// Short province name -> district boundary file slug
    pub province_slugs: HashMap<String, String>,
}

const PROVINCES: &[(&str, &str, &str)] = &[
    ("서울특별시", "서울", "seoul"),
    ("부산광역시", "부산", "busan"),
    ("대구광역시", "대구", "daegu"),
    ("인천광역시", "인천", "incheon"),
    ("광주광역시", "광주", "gwangju"),
    ("대전광역시", "대전", "daejeon"),
    ("울산광역시", "울산", "ulsan"),
    ("세종특별자치시", "세종", "sejong"),
    ("경기도", "경기", "gyeonggi"),
    ("강원도", "강원", "gangwon"),
    ("충청북도", "충북", "chungbuk"),
    ("충청남도", "충남", "chungnam"),
    ("전라북도", "전북", "jeonbuk"),
    ("전라남도", "전남", "jeonnam"),
    ("경상북도", "경북", "gyeongbuk"),
    ("경상남도", "경남", "gyeongnam"),
    ("제주특별자치도", "제주", "jeju"),
];

/// Renamed provinces that still appear in boundary files
const RENAMED: &[(&str, &str)] = &[
    ("강원특별자치도", "강원"),
    ("전북특별자치도", "전북"),
    ("제주도", "제주"),
];

impl Default for NamesConfig {
    fn default() -> Self {
        let mut prefixes: Vec<String> = PROVINCES.iter().map(|(official, _, _)| official.to_string()).collect();
        prefixes.extend(RENAMED.iter().map(|(official, _)| official.to_string()));

        let mut synonyms: HashMap<String, String> = PROVINCES
            .iter()
            .map(|(official, short, _)| (official.to_string(), short.to_string()))
            .collect();
        synonyms.extend(RENAMED.iter().map(|(official, short)| (official.to_string(), short.to_string())));

        let province_slugs = PROVINCES
            .iter()
            .map(|(_, short, slug)| (short.to_string(), slug.to_string()))
            .collect();

        Self {
            prefixes,
            synonyms,
            province_slugs,
        }
    }
}

/// Pixel nudge applied on top of a computed label anchor
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelOffset {
    pub dx: f64,
    pub dy: f64,
}

impl LabelOffset {
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Canvas width the offsets were tuned for; offsets scale with the canvas
    pub reference_width: f64,
    pub offsets: HashMap<String, LabelOffset>,
}

const DISTRICT_LABEL_OFFSETS: &[(&str, f64, f64)] = &[
    ("성남시", 0.0, 14.0),
    ("수원시", 0.0, 14.0),
    ("용인시", -16.0, -14.0),
    ("이천시", -10.0, -10.0),
    ("안산시", -16.0, 6.0),
    ("군포시", 0.0, 6.0),
    ("과천시", 0.0, -6.0),
    ("천안시", 2.0, -30.0),
    ("서산시", 15.0, -70.0),
    ("당진시", -50.0, 25.0),
    ("홍성군", 55.0, -28.0),
    ("보령시", 42.0, -40.0),
    ("서천군", 36.0, -20.0),
    ("태안군", -30.0, -100.0),
    ("포항시", -30.0, -50.0),
    ("경주시", -40.0, -36.0),
    ("영덕군", -10.0, -38.0),
    ("울진군", -10.0, -50.0),
    ("청주시", -28.0, -10.0),
    ("전주시", 0.0, -8.0),
    ("순천시", -10.0, -46.0),
    ("광양시", 16.0, -36.0),
    ("여수시", -50.0, -140.0),
    ("고흥군", -56.0, -76.0),
    ("보성군", 16.0, -46.0),
    ("장흥군", 0.0, -76.0),
    ("강진군", -10.0, -76.0),
    ("영암군", 60.0, 2.0),
    ("무안군", 15.0, -30.0),
    ("신안군", 15.0, -140.0),
    ("영광군", 30.0, -30.0),
    ("완도군", 50.0, -50.0),
    ("해남군", 15.0, -80.0),
    ("진도군", 15.0, -40.0),
    ("창원시", -10.0, 40.0),
    ("제주시", 300.0, -140.0),
    ("서귀포시", 280.0, -100.0),
];

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            reference_width: 700.0,
            offsets: DISTRICT_LABEL_OFFSETS
                .iter()
                .map(|&(name, dx, dy)| (name.to_string(), LabelOffset::new(dx, dy)))
                .collect(),
        }
    }
}

/// Geographic extent the viewer may pan within
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewConfig {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            min_lat: 33.1,
            min_lng: 124.6,
            max_lat: 38.6,
            max_lng: 131.9,
        }
    }
}

impl ViewConfig {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lng..=self.max_lng).contains(&lng)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct NearbyConfig {
    pub radius_km: f64,
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self { radius_km: crate::filter::DEFAULT_RADIUS_KM }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file used by the terminal viewer
    pub file: PathBuf,
    /// `RUST_LOG`-style directive used when the variable is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("waste-map.log"),
            filter: "waste_map=info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in tables
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            info!(path = %path.display(), "loading configuration");
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_provinces() {
        let names = NamesConfig::default();
        assert_eq!(names.province_slugs.len(), 17);
        assert_eq!(names.synonyms.get("서울특별시").map(String::as_str), Some("서울"));
        assert!(names.prefixes.iter().any(|p| p == "강원특별자치도"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r##"
            [api]
            base_url = "http://localhost:8080"

            [scale]
            fallback = "#cccccc"

            [labels.offsets."수원시"]
            dy = 20.0
            "##,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_ms, 10_000);
        assert_eq!(config.scale.fallback, Rgb::new(0xcc, 0xcc, 0xcc));
        assert_eq!(config.scale.stops.len(), 5);
        assert_eq!(config.labels.offsets.get("수원시"), Some(&LabelOffset::new(0.0, 20.0)));
        assert!(config.labels.offsets.get("여수시").is_none());
        assert_eq!(config.nearby.radius_km, 5.0);
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let result: std::result::Result<AppConfig, _> = toml::from_str("[scale]\nfallback = \"grey\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_view_bounds() {
        let view = ViewConfig::default();
        assert!(view.contains(37.5665, 126.9780));
        assert!(!view.contains(35.0, 139.0));
    }
}
