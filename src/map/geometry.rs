use crate::braille::BrailleCanvas;
use crate::map::projection::Viewport;
use geo::Polygon;
use glam::DVec2;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a point marker (small cross)
pub fn draw_marker(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y);
        canvas.set_pixel_signed(x, y + i);
    }
}

/// Draw a circle outline of `radius` pixels (the nearby-search ring)
pub fn draw_circle_outline(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    if radius <= 0 {
        canvas.set_pixel_signed(cx, cy);
        return;
    }
    // midpoint circle
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)] {
            canvas.set_pixel_signed(cx + px, cy + py);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Project every ring of a polygon, dropping non-finite points
fn projected_rings(polygon: &Polygon<f64>, viewport: &Viewport) -> Vec<Vec<DVec2>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| {
            ring.coords()
                .map(|c| viewport.project_f64(c.x, c.y))
                .filter(|p| p.is_finite())
                .collect::<Vec<_>>()
        })
        .filter(|ring| ring.len() >= 3)
        .collect()
}

/// Scanline fill with the even-odd rule, so holes stay empty.
///
/// Each pixel row is sampled at its center, and a pixel is filled only when
/// its center lies strictly between two crossings.
pub fn fill_polygon(canvas: &mut BrailleCanvas, polygon: &Polygon<f64>, viewport: &Viewport) {
    let rings = projected_rings(polygon, viewport);
    if rings.is_empty() {
        return;
    }

    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    let first_row = min_y.floor().max(0.0) as i32;
    let last_row = max_y.ceil().min(canvas.pixel_height() as f64 - 1.0) as i32;

    let mut crossings: Vec<f64> = Vec::new();
    for row in first_row..=last_row {
        let yc = row as f64 + 0.5;
        crossings.clear();

        for ring in &rings {
            let mut prev = ring[ring.len() - 1];
            for &p in ring {
                if (prev.y <= yc) != (p.y <= yc) {
                    crossings.push(prev.x + (yc - prev.y) * (p.x - prev.x) / (p.y - prev.y));
                }
                prev = p;
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));
        for pair in crossings.chunks_exact(2) {
            let x0 = (pair[0] - 0.5).floor() as i32 + 1;
            let x1 = (pair[1] - 0.5).ceil() as i32 - 1;
            if x1 >= x0 {
                canvas.fill_span(row, x0, x1);
            }
        }
    }
}

/// Outline every ring of a polygon with viewport culling
pub fn stroke_polygon(canvas: &mut BrailleCanvas, polygon: &Polygon<f64>, viewport: &Viewport) {
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        let mut prev: Option<(i32, i32)> = None;
        for c in ring.coords() {
            let p = viewport.project_f64(c.x, c.y);
            if !p.is_finite() {
                prev = None;
                continue;
            }
            let point = (p.x as i32, p.y as i32);
            if let Some(last) = prev {
                if viewport.line_might_be_visible(last, point) {
                    draw_line(canvas, last.0, last.1, point.0, point.1);
                }
            }
            prev = Some(point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;

    fn world_viewport(size: usize) -> Viewport {
        // zoom 1 over a square canvas: 1 degree of longitude ~ size/360 px
        Viewport::new(0.0, 0.0, 1.0, size, size)
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
        LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)])
    }

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert_eq!(canvas.row_to_string(0), "⠉⠉⠉⠉⠉");
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.to_string(), "⡇\n⡇");
    }

    #[test]
    fn test_fill_covers_interior() {
        let vp = world_viewport(360);
        let mut canvas = BrailleCanvas::new(180, 90);
        fill_polygon(&mut canvas, &Polygon::new(rect(-20.0, -20.0, 20.0, 20.0), vec![]), &vp);
        // center of the canvas is inside, a corner is not
        assert_eq!(canvas.cell(90, 45), 0xff);
        assert_eq!(canvas.cell(0, 0), 0);
    }

    #[test]
    fn test_fill_leaves_hole_empty() {
        let vp = world_viewport(360);
        let mut canvas = BrailleCanvas::new(180, 90);
        let polygon = Polygon::new(rect(-40.0, -40.0, 40.0, 40.0), vec![rect(-10.0, -10.0, 10.0, 10.0)]);
        fill_polygon(&mut canvas, &polygon, &vp);
        assert_eq!(canvas.cell(90, 45), 0);
        assert_eq!(canvas.cell(90 - 12, 45), 0xff);
    }

    #[test]
    fn test_degenerate_polygon_draws_nothing() {
        let vp = world_viewport(360);
        let mut canvas = BrailleCanvas::new(180, 90);
        let line = LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]);
        fill_polygon(&mut canvas, &Polygon::new(line, vec![]), &vp);
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_circle_outline() {
        let mut canvas = BrailleCanvas::new(10, 5);
        draw_circle_outline(&mut canvas, 10, 10, 4);
        assert!(!canvas.is_blank());
        // the center stays empty
        assert_eq!(canvas.cell(5, 2) & 0x01, 0);
    }
}
