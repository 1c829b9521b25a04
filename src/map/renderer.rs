use crate::braille::BrailleCanvas;
use crate::config::LabelsConfig;
use crate::map::binding::{BoundRegion, Choropleth};
use crate::map::geometry::{draw_circle_outline, draw_marker, fill_polygon, stroke_polygon};
use crate::map::labels::LabelPlacer;
use crate::map::projection::Viewport;
use crate::types::{Coordinate, Entity, Rgb};
use rayon::prelude::*;
use std::collections::HashSet;

/// Kilometers per degree of latitude
const KM_PER_DEGREE: f64 = 111.32;

/// One bucket of the choropleth rasterized on its own canvas
pub struct FillLayer {
    pub color: Rgb,
    pub canvas: BrailleCanvas,
}

/// Rendered map layers, back to front
pub struct MapLayers {
    pub fills: Vec<FillLayer>,
    pub borders: BrailleCanvas,
    /// Outline of the selected region
    pub highlight: BrailleCanvas,
    pub companies: BrailleCanvas,
    /// Companies in the current nearby/region result
    pub matches: BrailleCanvas,
    /// User-placed point and its search radius
    pub user: BrailleCanvas,
    /// (column, row, text) anchors in character cells, text centered on the anchor
    pub labels: Vec<(u16, u16, String)>,
}

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_fills: bool,
    pub show_borders: bool,
    pub show_labels: bool,
    pub show_companies: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_fills: true,
            show_borders: true,
            show_labels: true,
            show_companies: true,
        }
    }
}

/// View state owned by the app and handed to each render pass
#[derive(Default)]
pub struct Overlay<'a> {
    pub selected_region: Option<&'a str>,
    pub user_point: Option<(Coordinate, f64)>,
    pub matched_companies: Option<&'a HashSet<String>>,
}

/// Rasterizes a bound choropleth and the company directory
pub struct MapRenderer {
    pub choropleth: Option<Choropleth>,
    pub companies: Vec<Entity>,
    pub labels: LabelsConfig,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new(labels: LabelsConfig) -> Self {
        Self {
            choropleth: None,
            companies: Vec::new(),
            labels,
            settings: DisplaySettings::default(),
        }
    }

    /// Check if any region geometry is loaded
    pub fn has_data(&self) -> bool {
        self.choropleth.as_ref().is_some_and(|c| !c.regions.is_empty())
    }

    /// Render all layers for a canvas of `width` x `height` characters
    pub fn render(&self, width: usize, height: usize, viewport: &Viewport, overlay: &Overlay) -> MapLayers {
        let mut layers = MapLayers {
            fills: Vec::new(),
            borders: BrailleCanvas::new(width, height),
            highlight: BrailleCanvas::new(width, height),
            companies: BrailleCanvas::new(width, height),
            matches: BrailleCanvas::new(width, height),
            user: BrailleCanvas::new(width, height),
            labels: Vec::new(),
        };

        if let Some(choropleth) = &self.choropleth {
            if self.settings.show_fills {
                layers.fills = rasterize_fills(&choropleth.regions, width, height, viewport);
            }

            for region in &choropleth.regions {
                let selected = overlay.selected_region == Some(region.name.as_str());
                for polygon in &region.geometry {
                    if self.settings.show_borders {
                        stroke_polygon(&mut layers.borders, polygon, viewport);
                    }
                    if selected {
                        stroke_polygon(&mut layers.highlight, polygon, viewport);
                    }
                }
            }

            if self.settings.show_labels {
                let placer = LabelPlacer::from_config(&self.labels, viewport.width);
                for label in placer.place_all(&choropleth.regions, viewport) {
                    if !label.anchored {
                        continue;
                    }
                    let (px, py) = (label.position.x, label.position.y);
                    if px >= 0.0 && py >= 0.0 && viewport.is_visible(px as i32, py as i32) {
                        layers.labels.push(((px / 2.0) as u16, (py / 4.0) as u16, label.name));
                    }
                }
            }
        }

        if self.settings.show_companies {
            for company in &self.companies {
                let (px, py) = viewport.project(company.coordinate.lng, company.coordinate.lat);
                if !viewport.is_visible(px, py) {
                    continue;
                }
                let matched = overlay
                    .matched_companies
                    .is_some_and(|names| names.contains(&company.name));
                if matched {
                    draw_marker(&mut layers.matches, px, py, 1);
                } else {
                    layers.companies.set_pixel_signed(px, py);
                }
            }
        }

        if let Some((point, radius_km)) = overlay.user_point {
            let (px, py) = viewport.project(point.lng, point.lat);
            draw_marker(&mut layers.user, px, py, 2);
            let edge = viewport.project_f64(point.lng, point.lat + radius_km / KM_PER_DEGREE);
            let center = viewport.project_f64(point.lng, point.lat);
            let radius_px = (center.y - edge.y).abs().round() as i32;
            draw_circle_outline(&mut layers.user, px, py, radius_px);
        }

        layers
    }

    /// Toggle region fills
    pub fn toggle_fills(&mut self) {
        self.settings.show_fills = !self.settings.show_fills;
    }

    /// Toggle region borders
    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    /// Toggle region labels
    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    /// Toggle company markers
    pub fn toggle_companies(&mut self) {
        self.settings.show_companies = !self.settings.show_companies;
    }
}

/// One canvas per distinct fill color, rasterized in parallel
fn rasterize_fills(regions: &[BoundRegion], width: usize, height: usize, viewport: &Viewport) -> Vec<FillLayer> {
    let mut groups: Vec<(Rgb, Vec<&BoundRegion>)> = Vec::new();
    for region in regions {
        match groups.iter_mut().find(|(color, _)| *color == region.color) {
            Some((_, members)) => members.push(region),
            None => groups.push((region.color, vec![region])),
        }
    }

    groups
        .into_par_iter()
        .map(|(color, members)| {
            let mut canvas = BrailleCanvas::new(width, height);
            for region in members {
                for polygon in &region.geometry {
                    fill_polygon(&mut canvas, polygon, viewport);
                }
            }
            FillLayer { color, canvas }
        })
        .collect()
}
