use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Axis-aligned rectangle; `width`/`height` extend right and down from `pos`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Rect {
    pub pos: Point,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { pos: Point { x, y }, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.pos.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.pos.y.saturating_add(self.height)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Closed polygon in image coordinates. Inclusion is decided with the
/// even-odd rule, so self-intersecting outlines behave predictably.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Polygon {
    pub vertices: Vec<(f64, f64)>,
}

impl Polygon {
    pub fn new(vertices: Vec<(f64, f64)>) -> Self {
        Self { vertices }
    }
}

/// Explicit set of selected pixel coordinates, e.g. from a freehand tool.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PixelMask {
    pub points: Vec<Point>,
}

impl PixelMask {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }
}

#[enum_dispatch]
pub trait RegionGeometry {
    /// Smallest rectangle covering the region, before any clipping.
    /// `None` for a region with no extent at all.
    fn bounding_box(&self) -> Option<Rect>;

    /// Whether the pixel at (x, y) belongs to the region.
    fn contains(&self, x: u32, y: u32) -> bool;
}

impl RegionGeometry for Rect {
    fn bounding_box(&self) -> Option<Rect> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.clone())
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.pos.x && x < self.right() && y >= self.pos.y && y < self.bottom()
    }
}

impl RegionGeometry for Polygon {
    fn bounding_box(&self) -> Option<Rect> {
        if self.vertices.len() < 3 {
            return None;
        }
        let min_x = self.vertices.iter().map(|v| v.0).fold(f64::INFINITY, f64::min);
        let min_y = self.vertices.iter().map(|v| v.1).fold(f64::INFINITY, f64::min);
        let max_x = self.vertices.iter().map(|v| v.0).fold(f64::NEG_INFINITY, f64::max);
        let max_y = self.vertices.iter().map(|v| v.1).fold(f64::NEG_INFINITY, f64::max);
        if max_x <= 0.0 || max_y <= 0.0 {
            return None;
        }
        let x = min_x.max(0.0).floor() as u32;
        let y = min_y.max(0.0).floor() as u32;
        let width = (max_x.ceil() as u32).saturating_sub(x);
        let height = (max_y.ceil() as u32).saturating_sub(y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Rect::new(x, y, width, height))
    }

    /// Even-odd test against the pixel center.
    fn contains(&self, x: u32, y: u32) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        let px = x as f64 + 0.5;
        let py = y as f64 + 0.5;
        let mut inside = false;
        let mut j = self.vertices.len() - 1;
        for i in 0..self.vertices.len() {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];
            if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

impl RegionGeometry for PixelMask {
    fn bounding_box(&self) -> Option<Rect> {
        if self.points.is_empty() {
            return None;
        }
        let min_x = self.points.iter().map(|p| p.x).min().unwrap();
        let min_y = self.points.iter().map(|p| p.y).min().unwrap();
        let max_x = self.points.iter().map(|p| p.x).max().unwrap();
        let max_y = self.points.iter().map(|p| p.y).max().unwrap();
        Some(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        self.points.iter().any(|p| p.x == x && p.y == y)
    }
}

/// A user-drawn region of interest.
#[enum_dispatch(RegionGeometry)]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum Region {
    Rect(Rect),
    Polygon(Polygon),
    Mask(PixelMask),
}
