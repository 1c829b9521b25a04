use anyhow::{Context, Result};
use geo::BoundingRect;
use ratatui::layout::Rect;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use waste_map::config::{AppConfig, GeoConfig};
use waste_map::data;
use waste_map::export;
use waste_map::fetch::{FeedClient, Loader};
use waste_map::filter::{nearby_with_distance, within_region};
use waste_map::map::{Choropleth, MapRenderer, Overlay, ValueIndex, Viewport};
use waste_map::names::NameNormalizer;
use waste_map::table::TableState;
use waste_map::types::{Coordinate, Entity, ProcessingType, RegionFeature};

use crate::ui;

/// Which boundary set is on screen
#[derive(Debug, Clone, PartialEq)]
pub enum Level {
    National,
    District { province: String },
}

impl Level {
    pub fn title(&self) -> String {
        match self {
            Level::National => "전국 시도".to_string(),
            Level::District { province } => format!("{} 시군구", province),
        }
    }
}

/// Boundaries and statistics for one view, produced off the UI thread
pub struct ViewData {
    level: Level,
    kind: ProcessingType,
    features: Vec<RegionFeature>,
    stats: Vec<(String, f64)>,
    stats_error: Option<String>,
}

/// Side panel contents
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Closed,
    /// Companies around the user marker with their distance
    Nearby(Vec<(Entity, f64)>),
    /// Companies inside the selected region
    InRegion { region: String, companies: Vec<Entity> },
    /// Region names of the current view
    Regions(Vec<String>),
}

/// Text entry target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    TableSearch,
    CompanySearch,
}

/// Application state
pub struct App {
    pub config: AppConfig,
    pub normalizer: NameNormalizer,
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for the tooltip
    pub mouse_pos: Option<(u16, u16)>,
    pub level: Level,
    pub kind: ProcessingType,
    /// Canonical name and value of every region in the feed
    pub stats: Vec<(String, f64)>,
    /// Sorted unique region names of the current view
    pub region_names: Vec<String>,
    pub selected: Option<String>,
    pub user_point: Option<Coordinate>,
    pub matched: HashSet<String>,
    pub open_company: Option<Entity>,
    pub panel: Panel,
    pub show_table: bool,
    pub table: TableState,
    pub input: Option<Input>,
    pub company_query: String,
    pub status: String,
    client: Arc<FeedClient>,
    view_loader: Loader<Result<ViewData>>,
    company_loader: Loader<Result<Vec<Entity>>>,
    last_valid_center: (f64, f64),
    terminal_size: (u16, u16),
}

impl App {
    pub fn new(config: AppConfig, width: u16, height: u16) -> Result<Self> {
        let client = FeedClient::new(&config.api).context("creating feed client")?;
        let normalizer = NameNormalizer::from_config(&config.names);
        let view = config.view;
        let mut app = Self {
            viewport: Viewport::fit_bounds(view.min_lng, view.min_lat, view.max_lng, view.max_lat, 0, 0),
            map_renderer: MapRenderer::new(config.labels.clone()),
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            level: Level::National,
            kind: ProcessingType::Total,
            stats: Vec::new(),
            region_names: Vec::new(),
            selected: None,
            user_point: None,
            matched: HashSet::new(),
            open_company: None,
            panel: Panel::Closed,
            show_table: false,
            table: TableState::default(),
            input: None,
            company_query: String::new(),
            status: String::new(),
            client: Arc::new(client),
            view_loader: Loader::new(),
            company_loader: Loader::new(),
            last_valid_center: (0.0, 0.0),
            terminal_size: (width, height),
            normalizer,
            config,
        };
        app.resize(width, height);
        app.fit_to_bounds();
        app.load_companies();
        app.request_view(Level::National);
        Ok(app)
    }

    /// Update viewport size when the terminal or the panel changes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.terminal_size = (width, height);
        let inner = ui::map_inner(Rect::new(0, 0, width, height), self.panel_open());
        self.viewport.width = inner.width as usize * 2;
        self.viewport.height = inner.height as usize * 4;
    }

    pub fn panel_open(&self) -> bool {
        self.panel != Panel::Closed
    }

    fn set_panel(&mut self, panel: Panel) {
        self.panel = panel;
        let (w, h) = self.terminal_size;
        self.resize(w, h);
    }

    pub fn close_panel(&mut self) {
        self.set_panel(Panel::Closed);
        self.user_point = None;
        self.matched.clear();
    }

    /// Fit the loaded regions, or the national extent before anything loads
    pub fn fit_to_bounds(&mut self) {
        let bounds = self
            .map_renderer
            .choropleth
            .as_ref()
            .and_then(|c| {
                c.regions
                    .iter()
                    .filter_map(|r| r.geometry.bounding_rect())
                    .reduce(|a, b| {
                        geo::Rect::new(
                            geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                            geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                        )
                    })
            })
            .map(|r| (r.min().x, r.min().y, r.max().x, r.max().y));

        let view = self.config.view;
        let (min_lon, min_lat, max_lon, max_lat) =
            bounds.unwrap_or((view.min_lng, view.min_lat, view.max_lng, view.max_lat));
        self.viewport = Viewport::fit_bounds(
            min_lon,
            min_lat,
            max_lon,
            max_lat,
            self.viewport.width,
            self.viewport.height,
        );
        self.last_valid_center = (self.viewport.center_lon, self.viewport.center_lat);
    }

    /// Revert to the last center inside the national bounds
    fn clamp_center(&mut self) {
        if self.config.view.contains(self.viewport.center_lat, self.viewport.center_lon) {
            self.last_valid_center = (self.viewport.center_lon, self.viewport.center_lat);
        } else {
            (self.viewport.center_lon, self.viewport.center_lat) = self.last_valid_center;
        }
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
        self.clamp_center();
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
        self.clamp_center();
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
        self.clamp_center();
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!("{:.3}°N, {:.3}°E", self.viewport.center_lat, self.viewport.center_lon)
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - x as i32) * 2;
            let dy = (last_y as i32 - y as i32) * 4;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    fn screen_to_lonlat(&self, col: u16, row: u16) -> (f64, f64) {
        let (px, py) = screen_to_pixel(col, row);
        self.viewport.unproject(px, py)
    }

    /// Hover text for the region under the mouse
    pub fn tooltip(&self) -> Option<String> {
        let (col, row) = self.mouse_pos?;
        let (lon, lat) = self.screen_to_lonlat(col, row);
        self.map_renderer
            .choropleth
            .as_ref()?
            .region_at(lon, lat)
            .map(|r| r.tooltip())
    }

    /// Per-render view state for the map renderer
    pub fn overlay(&self) -> Overlay<'_> {
        Overlay {
            selected_region: self.selected.as_deref(),
            user_point: self.user_point.map(|p| (p, self.config.nearby.radius_km)),
            matched_companies: (!self.matched.is_empty()).then_some(&self.matched),
        }
    }

    // ---- loading ----

    fn load_companies(&mut self) {
        let client = Arc::clone(&self.client);
        self.company_loader
            .request(move || client.companies().context("fetching company directory"));
    }

    /// Start loading a view; an older request still in flight is superseded
    pub fn request_view(&mut self, level: Level) {
        let client = Arc::clone(&self.client);
        let geo = self.config.geo.clone();
        let kind = self.kind;
        let slug = match &level {
            Level::National => None,
            Level::District { province } => Some(self.normalizer.province_slug(province)),
        };
        self.status = format!("{} 불러오는 중…", level.title());
        let generation = self
            .view_loader
            .request(move || load_view(&client, &geo, level, kind, slug.as_deref()));
        info!(generation, kind = %kind, "view requested");
    }

    pub fn is_loading(&self) -> bool {
        self.view_loader.is_pending()
    }

    /// Apply finished loads; called once per frame
    pub fn poll_loaders(&mut self) {
        if let Some(result) = self.view_loader.poll() {
            match result {
                Ok(view) => self.apply_view(view),
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "view load failed");
                    self.status = format!("불러오기 실패: {e:#}");
                }
            }
        }

        if let Some(result) = self.company_loader.poll() {
            match result {
                Ok(companies) => {
                    info!(count = companies.len(), "companies loaded");
                    self.map_renderer.companies = companies;
                }
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "company directory unavailable");
                    self.status = format!("업체 목록 실패: {e:#}");
                }
            }
        }
    }

    fn apply_view(&mut self, view: ViewData) {
        let index = ValueIndex::from_pairs(view.stats.iter().map(|(n, v)| (n.as_str(), *v)), &self.normalizer);
        let region_names = data::region_names(&view.features, &self.normalizer);
        let choropleth = if index.is_empty() {
            Choropleth::without_data(view.features, &self.normalizer, self.config.scale.fallback)
        } else {
            match Choropleth::build(view.features, &index, &self.normalizer, &self.config.scale) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "cannot color view");
                    self.status = e.to_string();
                    return;
                }
            }
        };

        let mut stats: Vec<(String, f64)> = index.iter().map(|(n, v)| (n.to_string(), v)).collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));

        self.status = match &view.stats_error {
            Some(e) => format!("{} · 통계 없음 ({})", view.level.title(), e),
            None => format!(
                "{} · {} · {}/{} 지역",
                view.level.title(),
                view.kind.label(),
                choropleth.matched(),
                choropleth.regions.len()
            ),
        };
        if !index.collisions().is_empty() {
            self.status.push_str(&format!(" · 이름 충돌 {}", index.collisions().len()));
        }

        self.level = view.level;
        self.stats = stats;
        self.region_names = region_names;
        self.selected = None;
        self.matched.clear();
        self.map_renderer.choropleth = Some(choropleth);
        if matches!(self.panel, Panel::InRegion { .. } | Panel::Regions(_)) {
            self.set_panel(Panel::Closed);
        }
        self.fit_to_bounds();
    }

    // ---- navigation ----

    /// Cycle the processing type and refetch
    pub fn next_kind(&mut self) {
        self.kind = self.kind.next();
        self.request_view(self.level.clone());
    }

    /// Open the district map of the selected province
    pub fn drill_down(&mut self) {
        if self.level != Level::National {
            return;
        }
        if let Some(name) = self.selected.clone() {
            let province = self.normalizer.canonical_province(&name);
            self.request_view(Level::District { province });
        }
    }

    pub fn back(&mut self) {
        if self.level != Level::National {
            self.request_view(Level::National);
        }
    }

    /// Select the region under a click and list the companies inside it
    pub fn select_at(&mut self, col: u16, row: u16) {
        let (lon, lat) = self.screen_to_lonlat(col, row);
        let name = self
            .map_renderer
            .choropleth
            .as_ref()
            .and_then(|c| c.region_at(lon, lat))
            .map(|r| r.name.clone());
        match name {
            Some(name) => self.select_region(&name),
            None => {
                self.selected = None;
                self.matched.clear();
            }
        }
    }

    pub fn select_region(&mut self, name: &str) {
        let Some(region) = self.map_renderer.choropleth.as_ref().and_then(|c| c.region(name)) else {
            return;
        };
        let companies: Vec<Entity> = within_region(&region.geometry, &self.map_renderer.companies)
            .into_iter()
            .cloned()
            .collect();
        self.status = region.tooltip().replace('\n', " · ");
        self.matched = companies.iter().map(|c| c.name.clone()).collect();
        self.selected = Some(name.to_string());
        self.user_point = None;
        self.set_panel(Panel::InRegion {
            region: name.to_string(),
            companies,
        });
    }

    /// Step through the region list (`forward` = next)
    pub fn cycle_region(&mut self, forward: bool) {
        let len = self.region_names.len();
        if len == 0 {
            return;
        }
        let current = self
            .selected
            .as_ref()
            .and_then(|s| self.region_names.iter().position(|n| n == s));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        let name = self.region_names[next].clone();
        self.select_region(&name);
    }

    /// Show the region names in the side panel
    pub fn show_regions(&mut self) {
        self.set_panel(Panel::Regions(self.region_names.clone()));
    }

    /// Drop the user marker and list companies within the configured radius
    pub fn place_marker(&mut self, col: u16, row: u16) {
        let (lon, lat) = self.screen_to_lonlat(col, row);
        let origin = Coordinate::new(lat, lon);
        let radius = self.config.nearby.radius_km;
        let hits: Vec<(Entity, f64)> = nearby_with_distance(origin, &self.map_renderer.companies, radius)
            .into_iter()
            .map(|(e, d)| (e.clone(), d))
            .collect();
        self.status = format!("반경 {:.1}km 내 업체 {}곳", radius, hits.len());
        self.matched = hits.iter().map(|(e, _)| e.name.clone()).collect();
        self.user_point = Some(origin);
        self.set_panel(Panel::Nearby(hits));
    }

    /// Center on a company by exact name and open its card
    pub fn find_company(&mut self) {
        let query = self.company_query.trim();
        let found = self.map_renderer.companies.iter().find(|c| c.name == query).cloned();
        match found {
            Some(company) => {
                self.viewport.center_lon = company.coordinate.lng;
                self.viewport.center_lat = company.coordinate.lat;
                self.clamp_center();
                self.matched = HashSet::from([company.name.clone()]);
                self.status = format!("{} 찾음", company.name);
                self.open_company = Some(company);
            }
            None => {
                self.status = format!("'{}' 업체를 찾을 수 없음", query);
            }
        }
    }

    // ---- text input ----

    pub fn begin_input(&mut self, input: Input) {
        if input == Input::CompanySearch {
            self.company_query.clear();
        }
        self.input = Some(input);
    }

    pub fn input_char(&mut self, c: char) {
        match self.input {
            Some(Input::TableSearch) => self.table.search.push(c),
            Some(Input::CompanySearch) => self.company_query.push(c),
            None => {}
        }
    }

    pub fn input_backspace(&mut self) {
        match self.input {
            Some(Input::TableSearch) => {
                self.table.search.pop();
            }
            Some(Input::CompanySearch) => {
                self.company_query.pop();
            }
            None => {}
        }
    }

    pub fn submit_input(&mut self) {
        if self.input.take() == Some(Input::CompanySearch) {
            self.find_company();
        }
    }

    pub fn cancel_input(&mut self) {
        if self.input.take() == Some(Input::TableSearch) {
            self.table.search.clear();
        }
    }

    // ---- export ----

    /// Write the current view's values to a CSV in the working directory
    pub fn export_view(&mut self) {
        let stem = match &self.level {
            Level::National => "전국".to_string(),
            Level::District { province } => province.clone(),
        };
        let path = PathBuf::from(format!("{}_{}.csv", stem, self.kind.label()));
        let result = File::create(&path)
            .map_err(anyhow::Error::from)
            .and_then(|f| export::write_regions(BufWriter::new(f), &self.stats).map_err(anyhow::Error::from));
        self.status = match result {
            Ok(()) => {
                info!(path = %path.display(), rows = self.stats.len(), "exported view");
                format!("{} 저장됨", path.display())
            }
            Err(e) => {
                warn!(error = %e, "export failed");
                format!("저장 실패: {e}")
            }
        };
    }
}

/// Terminal cell to braille pixel, accounting for the map border
fn screen_to_pixel(col: u16, row: u16) -> (i32, i32) {
    let px = (col.saturating_sub(1) as i32) * 2;
    let py = (row.saturating_sub(1) as i32) * 4;
    (px, py)
}

/// Boundary file plus statistics for one level.
///
/// A failed statistics request still yields the boundaries so the view can
/// show its empty state.
fn load_view(
    client: &FeedClient,
    geo: &GeoConfig,
    level: Level,
    kind: ProcessingType,
    slug: Option<&str>,
) -> Result<ViewData> {
    let (path, property, stats) = match (&level, slug) {
        (Level::District { province }, Some(slug)) => (
            geo.district_path(slug),
            &geo.district_name_property,
            client.districts(province, kind),
        ),
        _ => (geo.province_path(), &geo.province_name_property, client.provinces(kind)),
    };
    let features = data::load_boundaries(&path, property)?;

    let (stats, stats_error) = match stats {
        Ok(stats) => (stats, None),
        Err(e) => {
            warn!(error = %e, "statistics feed failed");
            (Vec::new(), Some(e.to_string()))
        }
    };

    Ok(ViewData {
        level,
        kind,
        features,
        stats,
        stats_error,
    })
}
