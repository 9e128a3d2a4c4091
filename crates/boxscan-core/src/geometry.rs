//! Coordinate spaces and the pure transforms between them.
//!
//! Three spaces are in play:
//!
//! - **document space**: native page points, origin at the top-left corner of
//!   the page, independent of any rendering;
//! - **raster space**: pixels of a page rendered at some zoom factor. Regions
//!   are stored in raster space at the canonical zoom 1.0;
//! - **viewport space**: visible canvas pixels, i.e. raster pixels at the
//!   current zoom shifted by the scroll offset.

use serde::{Deserialize, Serialize};

use crate::error::BoxscanError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Scroll offset of the viewport into the rendered page. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollState {
    pub x: f64,
    pub y: f64,
}

impl ScrollState {
    pub fn new(x: f64, y: f64) -> Self {
        ScrollState { x, y }
    }
}

/// Axis-aligned rectangle given by two corners.
///
/// Rectangles built with [`Rect::from_corners`] are normalized so that
/// `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Rect { x1, y1, x2, y2 }
    }

    /// Build a normalized rectangle from two arbitrary corners, in whatever
    /// direction the drag went.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Rect {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn normalized(self) -> Self {
        Rect::from_corners(Point::new(self.x1, self.y1), Point::new(self.x2, self.y2))
    }

    /// A rectangle with zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.x1 == self.x2 || self.y1 == self.y2
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }

    /// True when both rectangles share an area greater than zero.
    /// Touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        a.x1 < b.x2 && b.x1 < a.x2 && a.y1 < b.y2 && b.y1 < a.y2
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Native size of a page in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f64,
    pub height_pt: f64,
}

impl PageSize {
    pub fn new(width_pt: f64, height_pt: f64) -> Self {
        PageSize {
            width_pt,
            height_pt,
        }
    }
}

/// Pixel dimensions of one concrete rendering, and the zoom it was made at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterGeometry {
    pub width_px: u32,
    pub height_px: u32,
    pub zoom: f64,
}

impl RasterGeometry {
    pub fn new(width_px: u32, height_px: u32, zoom: f64) -> Result<Self, BoxscanError> {
        if !(zoom.is_finite() && zoom > 0.0) {
            return Err(BoxscanError::InvalidZoom(zoom));
        }
        if width_px == 0 || height_px == 0 {
            return Err(BoxscanError::Render(format!(
                "empty raster ({width_px}x{height_px} px)"
            )));
        }
        Ok(RasterGeometry {
            width_px,
            height_px,
            zoom,
        })
    }

    /// Raster size the page would have at zoom 1.0, as implied by this
    /// rendering. Fractional when the renderer rounded.
    pub fn canonical_size(&self) -> (f64, f64) {
        (
            f64::from(self.width_px) / self.zoom,
            f64::from(self.height_px) / self.zoom,
        )
    }
}

/// Viewport point to canonical raster point: `(p + scroll) / zoom`.
pub fn to_raster_space(viewport: Point, scroll: ScrollState, zoom: f64) -> Point {
    Point {
        x: (viewport.x + scroll.x) / zoom,
        y: (viewport.y + scroll.y) / zoom,
    }
}

/// Canonical raster point to viewport point: `p * zoom - scroll`.
pub fn to_viewport_space(raster: Point, scroll: ScrollState, zoom: f64) -> Point {
    Point {
        x: raster.x * zoom - scroll.x,
        y: raster.y * zoom - scroll.y,
    }
}

/// Map a canonical raster rectangle into viewport space for drawing.
pub fn rect_to_viewport(rect: Rect, scroll: ScrollState, zoom: f64) -> Rect {
    let a = to_viewport_space(Point::new(rect.x1, rect.y1), scroll, zoom);
    let b = to_viewport_space(Point::new(rect.x2, rect.y2), scroll, zoom);
    Rect::new(a.x, a.y, b.x, b.y)
}

/// Points-per-canonical-pixel ratio for one page rendering.
///
/// Derived from the pixel dimensions the renderer actually produced rather
/// than from the zoom factor alone, so rounding of raster sizes does not make
/// regions drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterScale {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl RasterScale {
    pub fn derive(page: PageSize, raster: RasterGeometry) -> Self {
        let (canonical_w, canonical_h) = raster.canonical_size();
        RasterScale {
            scale_x: page.width_pt / canonical_w,
            scale_y: page.height_pt / canonical_h,
        }
    }

    pub fn to_document(&self, rect: Rect) -> Rect {
        Rect {
            x1: rect.x1 * self.scale_x,
            y1: rect.y1 * self.scale_y,
            x2: rect.x2 * self.scale_x,
            y2: rect.y2 * self.scale_y,
        }
    }
}
