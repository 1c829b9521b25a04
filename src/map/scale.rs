use crate::error::{MapError, Result};
use crate::types::Rgb;

/// Quantized color scale over the current value set.
///
/// `[min, max]` is split into `stops.len()` equal-width buckets. A single
/// distinct value collapses the domain and everything maps to the first stop.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    min: f64,
    max: f64,
    stops: Vec<Rgb>,
}

impl ColorScale {
    /// Build a scale from the values currently on screen.
    ///
    /// Fails with [`MapError::InvalidDomain`] for an empty value set, an empty
    /// stop list or a non-finite value, since any of those would leave the
    /// bucket arithmetic comparing against NaN.
    pub fn new(values: &[f64], stops: &[Rgb]) -> Result<Self> {
        if values.is_empty() {
            return Err(MapError::InvalidDomain("no values to build a color scale from".into()));
        }
        if stops.is_empty() {
            return Err(MapError::InvalidDomain("color scale needs at least one stop".into()));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(MapError::InvalidDomain(format!("non-finite value {} in domain", bad)));
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        Ok(Self {
            min,
            max,
            stops: stops.to_vec(),
        })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn stops(&self) -> &[Rgb] {
        &self.stops
    }

    /// Whether every value maps to one bucket
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Bucket index for a value; out-of-domain values clamp to the ends
    pub fn bucket(&self, value: f64) -> usize {
        if self.is_degenerate() || !value.is_finite() {
            return 0;
        }
        let n = self.stops.len();
        let t = (value - self.min) / (self.max - self.min);
        let idx = (t * n as f64).floor();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(n - 1)
        }
    }

    pub fn color(&self, value: f64) -> Rgb {
        self.stops[self.bucket(value)]
    }
}

/// Legend tick: position along the legend bar in `[0, 1]` and its label
#[derive(Debug, Clone, PartialEq)]
pub struct LegendTick {
    pub position: f64,
    pub value: f64,
    pub label: String,
}

/// Evenly spaced ticks across the scale's domain.
///
/// A collapsed domain (or `count < 2`) yields a single tick at the start.
pub fn legend_ticks(scale: &ColorScale, count: usize) -> Vec<LegendTick> {
    let (min, max) = scale.domain();
    if count < 2 || scale.is_degenerate() {
        return vec![LegendTick {
            position: 0.0,
            value: min,
            label: format_tick(min),
        }];
    }

    let steps = (count - 1) as f64;
    (0..count)
        .map(|i| {
            let position = i as f64 / steps;
            let value = min + (max - min) * position;
            LegendTick {
                position,
                value,
                label: format_tick(value),
            }
        })
        .collect()
}

/// Short tonnage label with a Korean magnitude suffix.
///
/// >= 1,000,000 uses 백만, >= 10,000 uses 만 with one decimal,
/// >= 1,000 uses 천 with one decimal, anything smaller is whole tons.
pub fn format_tick(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{}백만", trim_decimal(value / 1_000_000.0))
    } else if value >= 10_000.0 {
        format!("{:.1}만", value / 10_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}천", value / 1_000.0)
    } else {
        format!("{}톤", value.round() as i64)
    }
}

/// One decimal place, dropping a trailing `.0`
fn trim_decimal(value: f64) -> String {
    let s = format!("{:.1}", value);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}

/// Floored tonnage with thousands separators, e.g. `12,345톤`
pub fn format_tons(value: f64) -> String {
    let whole = value.floor().max(0.0) as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push('톤');
    out
}
