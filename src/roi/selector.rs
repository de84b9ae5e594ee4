use log::trace;

use crate::buffer::PixelBuffer;
use crate::error::{AnalysisError, Result};
use crate::roi::types::{PixelMask, Point, Polygon, Rect, Region, RegionGeometry};

/// Validates and normalizes user-drawn regions against image bounds and
/// turns them into deterministic pixel coordinate sequences.
///
/// Rasterization order is strict row-major so repeated runs over the same
/// input always visit samples identically, which keeps the downstream
/// statistics reproducible bit for bit.
pub struct RegionSelector;

impl RegionSelector {
    /// Clip a region to the buffer's bounds.
    ///
    /// Rectangles are clipped; a rectangle (or polygon) lying entirely
    /// outside the image fails with `OutOfBounds`. Mask points outside the
    /// image are discarded. Polygons are resolved to the pixel mask selected
    /// by the even-odd rule, so the result rasterizes in-bounds without
    /// revisiting the geometry. Anything that ends up selecting zero pixels
    /// fails with `EmptyRegion`.
    pub fn normalize(region: &Region, buffer: &PixelBuffer) -> Result<Region> {
        match region {
            Region::Rect(rect) => Self::normalize_rect(rect, buffer).map(Region::Rect),
            Region::Polygon(polygon) => {
                Self::normalize_polygon(polygon, buffer).map(Region::Mask)
            }
            Region::Mask(mask) => Self::normalize_mask(mask, buffer).map(Region::Mask),
        }
    }

    /// Selected coordinates in row-major order. Assumes a normalized region;
    /// out-of-bounds coordinates never appear in the output of
    /// `rasterize(normalize(..))`.
    pub fn rasterize(region: &Region) -> Vec<(u32, u32)> {
        match region {
            Region::Rect(rect) => Self::rasterize_rect(rect),
            Region::Polygon(polygon) => Self::rasterize_polygon(polygon),
            Region::Mask(mask) => Self::rasterize_mask(mask),
        }
    }

    fn normalize_rect(rect: &Rect, buffer: &PixelBuffer) -> Result<Rect> {
        if rect.width == 0 || rect.height == 0 {
            return Err(AnalysisError::EmptyRegion);
        }
        if rect.pos.x >= buffer.width() || rect.pos.y >= buffer.height() {
            return Err(AnalysisError::OutOfBounds {
                x: rect.pos.x,
                y: rect.pos.y,
                channel: 0,
            });
        }
        let width = rect.width.min(buffer.width() - rect.pos.x);
        let height = rect.height.min(buffer.height() - rect.pos.y);
        let clipped = Rect { pos: rect.pos, width, height };
        if clipped != *rect {
            trace!(
                "clipped rect ({}, {}) {}x{} to {}x{}",
                rect.pos.x, rect.pos.y, rect.width, rect.height, width, height
            );
        }
        Ok(clipped)
    }

    fn normalize_polygon(polygon: &Polygon, buffer: &PixelBuffer) -> Result<PixelMask> {
        if polygon.vertices.len() < 3 {
            return Err(AnalysisError::EmptyRegion);
        }
        let min_x = polygon.vertices.iter().map(|v| v.0).fold(f64::INFINITY, f64::min);
        let min_y = polygon.vertices.iter().map(|v| v.1).fold(f64::INFINITY, f64::min);
        let max_x = polygon.vertices.iter().map(|v| v.0).fold(f64::NEG_INFINITY, f64::max);
        let max_y = polygon.vertices.iter().map(|v| v.1).fold(f64::NEG_INFINITY, f64::max);
        if min_x >= buffer.width() as f64
            || min_y >= buffer.height() as f64
            || max_x <= 0.0
            || max_y <= 0.0
        {
            return Err(AnalysisError::OutOfBounds {
                x: min_x.max(0.0) as u32,
                y: min_y.max(0.0) as u32,
                channel: 0,
            });
        }

        let x0 = min_x.max(0.0).floor() as u32;
        let y0 = min_y.max(0.0).floor() as u32;
        let x1 = (max_x.ceil() as u32).min(buffer.width());
        let y1 = (max_y.ceil() as u32).min(buffer.height());

        let mut points = Vec::new();
        for y in y0..y1 {
            for x in x0..x1 {
                if polygon.contains(x, y) {
                    points.push(Point { x, y });
                }
            }
        }
        if points.is_empty() {
            return Err(AnalysisError::EmptyRegion);
        }
        Ok(PixelMask { points })
    }

    fn normalize_mask(mask: &PixelMask, buffer: &PixelBuffer) -> Result<PixelMask> {
        let mut points: Vec<Point> = mask
            .points
            .iter()
            .copied()
            .filter(|p| buffer.contains(p.x, p.y))
            .collect();
        points.sort_by_key(|p| (p.y, p.x));
        points.dedup();
        if points.is_empty() {
            return Err(AnalysisError::EmptyRegion);
        }
        Ok(PixelMask { points })
    }

    fn rasterize_rect(rect: &Rect) -> Vec<(u32, u32)> {
        let mut coords = Vec::with_capacity(rect.pixel_count() as usize);
        for y in rect.pos.y..rect.bottom() {
            for x in rect.pos.x..rect.right() {
                coords.push((x, y));
            }
        }
        coords
    }

    fn rasterize_polygon(polygon: &Polygon) -> Vec<(u32, u32)> {
        let Some(bounds) = polygon.bounding_box() else {
            return Vec::new();
        };
        let mut coords = Vec::new();
        for y in bounds.pos.y..bounds.bottom() {
            for x in bounds.pos.x..bounds.right() {
                if polygon.contains(x, y) {
                    coords.push((x, y));
                }
            }
        }
        coords
    }

    fn rasterize_mask(mask: &PixelMask) -> Vec<(u32, u32)> {
        let mut coords: Vec<(u32, u32)> = mask.points.iter().map(|p| (p.x, p.y)).collect();
        coords.sort_by_key(|&(x, y)| (y, x));
        coords.dedup();
        coords
    }
}
