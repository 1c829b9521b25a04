use glam::DVec2;
use std::f64::consts::PI;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 5000.0;
/// Share of the canvas a fitted extent may occupy
const FIT_PADDING: f64 = 0.92;

/// Normalized Web Mercator x in [0, 1]
#[inline(always)]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Normalized Web Mercator y in [0, 1], north at 0
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline(always)]
fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Viewport representing the visible map area and zoom level
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level (1.0 = whole world spans the canvas width)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Fit a lon/lat extent into the canvas, like a `fitSize` Mercator.
    ///
    /// An empty or inverted extent falls back to a world view.
    pub fn fit_bounds(
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
        width: usize,
        height: usize,
    ) -> Self {
        let x0 = mercator_x(min_lon);
        let x1 = mercator_x(max_lon);
        let y0 = mercator_y(max_lat);
        let y1 = mercator_y(min_lat);
        let span_x = x1 - x0;
        let span_y = y1 - y0;

        if !(span_x.is_finite() && span_y.is_finite()) || span_x < 0.0 || span_y < 0.0 || width == 0 {
            return Self::new(0.0, 0.0, 1.0, width, height);
        }

        let w = width as f64;
        let h = height.max(1) as f64;
        let scale_x = if span_x > 0.0 { w / span_x } else { f64::INFINITY };
        let scale_y = if span_y > 0.0 { h / span_y } else { f64::INFINITY };
        let scale = scale_x.min(scale_y);
        let zoom = if scale.is_finite() {
            (scale * FIT_PADDING / w).clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            MAX_ZOOM
        };

        let center_lon = (x0 + x1) / 2.0 * 360.0 - 180.0;
        let center_lat = inverse_mercator_y((y0 + y1) / 2.0);

        Self::new(center_lon, center_lat, zoom, width, height)
    }

    /// Pixels per normalized Mercator unit
    #[inline(always)]
    fn scale(&self) -> f64 {
        self.zoom * self.width as f64
    }

    #[inline(always)]
    fn center_mercator(&self) -> DVec2 {
        DVec2::new(mercator_x(self.center_lon), mercator_y(self.center_lat))
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let cx = self.width as f64 / 2.0 + dx as f64;
        let cy = self.height as f64 / 2.0 + dy as f64;
        let (lon, lat) = self.unproject_f64(DVec2::new(cx, cy));

        self.center_lon = lon;
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
        self.center_lat = lat.clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor keeping the geographic point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Project to sub-pixel screen coordinates
    pub fn project_f64(&self, lon: f64, lat: f64) -> DVec2 {
        let p = DVec2::new(mercator_x(lon), mercator_y(lat));
        let half = DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0);
        (p - self.center_mercator()) * self.scale() + half
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let p = self.project_f64(lon, lat);
        (p.x as i32, p.y as i32)
    }

    pub fn unproject_f64(&self, screen: DVec2) -> (f64, f64) {
        let half = DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0);
        let m = (screen - half) / self.scale() + self.center_mercator();
        (m.x * 360.0 - 180.0, inverse_mercator_y(m.y))
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        self.unproject_f64(DVec2::new(px as f64, py as f64))
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10
            && px < self.width as i32 + 10
            && py >= -10
            && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0
            && min_x < self.width as i32
            && max_y >= 0
            && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
        vp.pan(0, -10);
        assert!(vp.center_lat > 0.0);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(127.5, 36.0, 40.0, 200, 160);
        let p = vp.project_f64(126.978, 37.5665);
        let (lon, lat) = vp.unproject_f64(p);
        assert!((lon - 126.978).abs() < 1e-9);
        assert!((lat - 37.5665).abs() < 1e-9);
    }

    #[test]
    fn test_fit_bounds_centers_extent() {
        let vp = Viewport::fit_bounds(124.6, 33.1, 131.9, 38.6, 200, 160);
        let nw = vp.project_f64(124.6, 38.6);
        let se = vp.project_f64(131.9, 33.1);
        let mid = (nw + se) / 2.0;
        assert!((mid.x - 100.0).abs() < 1e-6);
        assert!((mid.y - 80.0).abs() < 1e-6);
        assert!(nw.x >= 0.0 && nw.y >= 0.0);
        assert!(se.x <= 200.0 && se.y <= 160.0);
    }

    #[test]
    fn test_fit_bounds_inverted_extent() {
        let vp = Viewport::fit_bounds(10.0, 10.0, 0.0, 0.0, 100, 100);
        assert_eq!(vp.zoom, 1.0);
    }
}
