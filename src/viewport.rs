use crate::model::Point;
use egui::{pos2, Pos2, Rect};

/// Screen pixels per graph unit at 100% zoom
pub const WORLD_SCALE: f64 = 50.0;

/// Pick tolerance around atoms and bond midpoints, screen pixels
pub const DEFAULT_HIT_RADIUS_PX: f32 = 12.0;

pub const MIN_ZOOM_PERCENT: f64 = 10.0;
pub const MAX_ZOOM_PERCENT: f64 = 500.0;

/// Maps between screen pixels and graph units.
///
/// The graph origin sits at the centre of the canvas rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    canvas_rect: Rect,
    zoom_percent: f64,
    hit_radius_px: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0)), 100.0)
    }
}

impl Viewport {
    pub fn new(canvas_rect: Rect, zoom_percent: f64) -> Self {
        Self {
            canvas_rect,
            zoom_percent: clamp_zoom_percent(zoom_percent),
            hit_radius_px: DEFAULT_HIT_RADIUS_PX,
        }
    }

    pub fn with_hit_radius(mut self, px: f32) -> Self {
        self.hit_radius_px = px;
        self
    }

    pub fn rect(&self) -> Rect {
        self.canvas_rect
    }

    pub fn set_rect(&mut self, canvas_rect: Rect) {
        self.canvas_rect = canvas_rect;
    }

    pub fn zoom_percent(&self) -> f64 {
        self.zoom_percent
    }

    pub fn set_zoom_percent(&mut self, percent: f64) {
        self.zoom_percent = clamp_zoom_percent(percent);
    }

    /// Pixels per graph unit
    pub fn scale(&self) -> f64 {
        WORLD_SCALE * self.zoom_percent / 100.0
    }

    pub fn screen_to_graph(&self, pos: Pos2) -> Point {
        let center = self.canvas_rect.center();
        let scale = self.scale();
        Point::new(
            f64::from(pos.x - center.x) / scale,
            f64::from(pos.y - center.y) / scale,
        )
    }

    pub fn graph_to_screen(&self, p: Point) -> Pos2 {
        let center = self.canvas_rect.center();
        let scale = self.scale();
        pos2(
            center.x + (p.x * scale) as f32,
            center.y + (p.y * scale) as f32,
        )
    }

    /// Hit radius in graph units
    pub fn hit_radius(&self) -> f64 {
        f64::from(self.hit_radius_px) / self.scale()
    }

    pub fn hit_radius_px(&self) -> f32 {
        self.hit_radius_px
    }
}

fn clamp_zoom_percent(percent: f64) -> f64 {
    if percent.is_finite() {
        percent.clamp(MIN_ZOOM_PERCENT, MAX_ZOOM_PERCENT)
    } else {
        100.0
    }
}

/// Grid snapping applied to dragged positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSnap {
    pub enabled: bool,
    pub size: f64,
}

impl Default for GridSnap {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 0.5,
        }
    }
}

impl GridSnap {
    pub fn new(enabled: bool, size: f64) -> Self {
        Self { enabled, size }
    }

    pub fn apply(&self, p: Point) -> Point {
        if !self.enabled {
            return p;
        }
        Point::new(snap(p.x, self.size), snap(p.y, self.size))
    }
}

/// `round(v / grid) * grid`; a non-positive grid leaves `v` untouched
pub fn snap(v: f64, grid: f64) -> f64 {
    if grid > 0.0 && grid.is_finite() {
        (v / grid).round() * grid
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(Rect::from_min_max(pos2(0.0, 0.0), pos2(400.0, 200.0)), 100.0)
    }

    #[test]
    fn test_centre_is_origin() {
        let vp = viewport();
        assert_eq!(vp.screen_to_graph(pos2(200.0, 100.0)), Point::new(0.0, 0.0));
        assert_eq!(vp.screen_to_graph(pos2(250.0, 0.0)), Point::new(1.0, -2.0));
    }

    #[test]
    fn test_round_trip() {
        let mut vp = viewport();
        vp.set_zoom_percent(200.0);
        let screen = vp.graph_to_screen(Point::new(-1.5, 0.25));
        assert_eq!(screen, pos2(50.0, 125.0));
        assert_eq!(vp.screen_to_graph(screen), Point::new(-1.5, 0.25));
    }

    #[test]
    fn test_hit_radius_scales_with_zoom() {
        let mut vp = viewport();
        assert!((vp.hit_radius() - 0.24).abs() < 1e-12);
        vp.set_zoom_percent(50.0);
        assert!((vp.hit_radius() - 0.48).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut vp = viewport();
        vp.set_zoom_percent(5000.0);
        assert_eq!(vp.zoom_percent(), MAX_ZOOM_PERCENT);
        vp.set_zoom_percent(1.0);
        assert_eq!(vp.zoom_percent(), MIN_ZOOM_PERCENT);
        vp.set_zoom_percent(f64::NAN);
        assert_eq!(vp.zoom_percent(), 100.0);
    }

    #[test]
    fn test_snap() {
        assert_eq!(snap(0.74, 0.5), 0.5);
        assert_eq!(snap(0.76, 0.5), 1.0);
        assert_eq!(snap(-1.3, 1.0), -1.0);
        assert_eq!(snap(0.3, 0.0), 0.3);

        let grid = GridSnap::new(true, 0.25);
        assert_eq!(grid.apply(Point::new(0.3, -0.9)), Point::new(0.25, -1.0));
        assert_eq!(GridSnap::default().apply(Point::new(0.3, 0.3)), Point::new(0.3, 0.3));
    }
}
