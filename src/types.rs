use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude in [-90, 90] and longitude in [-180, 180], both finite
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A recycling company from the entity directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub coordinate: Coordinate,
    pub representative: String,
    pub phone: String,
    pub waste_type: String,
}

/// One boundary feature: its raw display name and polygon parts.
///
/// Degenerate input (no polygons, empty rings) is kept as an empty
/// multipolygon so binding can still report the region.
#[derive(Debug, Clone)]
pub struct RegionFeature {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// 24-bit color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `rrggbb`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self { r, g, b })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value).ok_or_else(|| format!("invalid color '{}', expected #rrggbb", value))
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// Waste processing category used to filter the statistics feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessingType {
    #[default]
    Total,
    SelfTreated,
    Consigned,
    Public,
}

impl ProcessingType {
    pub const ALL: [ProcessingType; 4] = [
        ProcessingType::Total,
        ProcessingType::SelfTreated,
        ProcessingType::Consigned,
        ProcessingType::Public,
    ];

    /// Query-string value understood by the statistics feed
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingType::Total => "total",
            ProcessingType::SelfTreated => "self",
            ProcessingType::Consigned => "consigned",
            ProcessingType::Public => "public",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingType::Total => "총계",
            ProcessingType::SelfTreated => "자가처리",
            ProcessingType::Consigned => "위탁처리",
            ProcessingType::Public => "공공처리",
        }
    }

    /// Cycle to the next category (wraps around)
    pub fn next(&self) -> Self {
        match self {
            ProcessingType::Total => ProcessingType::SelfTreated,
            ProcessingType::SelfTreated => ProcessingType::Consigned,
            ProcessingType::Consigned => ProcessingType::Public,
            ProcessingType::Public => ProcessingType::Total,
        }
    }
}

impl fmt::Display for ProcessingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessingType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.label() == s)
            .ok_or_else(|| format!("unknown processing type '{}' (total, self, consigned, public)", s))
    }
}
