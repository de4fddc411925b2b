//! Raster sources and the rectangles used to address them.

use image::{imageops, Rgba, RgbaImage};

/// Half-open integer rectangle `[x0, x1) × [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    /// Build a rectangle, swapping coordinates so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, clamp_i32(width as i64), clamp_i32(height as i64))
    }

    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Shrink every side by `n`. A negative `n` grows the rectangle.
    ///
    /// Unlike [`Rect::new`] the result is not normalized, so an inset larger
    /// than half the extent yields an empty rectangle.
    pub fn inset(&self, n: i32) -> Self {
        Self {
            x0: self.x0.saturating_add(n),
            y0: self.y0.saturating_add(n),
            x1: self.x1.saturating_sub(n),
            y1: self.y1.saturating_sub(n),
        }
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x0: self.x0.saturating_add(dx),
            y0: self.y0.saturating_add(dy),
            x1: self.x1.saturating_add(dx),
            y1: self.y1.saturating_add(dy),
        }
    }

    /// Largest rectangle contained in both; empty rectangles collapse to the default.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        if r.is_empty() {
            Rect::default()
        } else {
            r
        }
    }

    /// True when `other` lies entirely inside `self`. Empty rectangles are
    /// contained in everything.
    pub fn contains(&self, other: &Rect) -> bool {
        other.is_empty()
            || (self.x0 <= other.x0
                && self.y0 <= other.y0
                && other.x1 <= self.x1
                && other.y1 <= self.y1)
    }
}

pub(crate) fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Pixel-addressable image with fixed bounds.
pub trait RasterSource: Send + Sync {
    fn bounds(&self) -> Rect;

    /// Color at `(x, y)`. Callers only ask for points inside [`bounds`](Self::bounds).
    fn pixel(&self, x: i32, y: i32) -> Rgba<u8>;

    /// The sub-rectangle capability, if this source has one.
    fn sub_region(&self) -> Option<&dyn SubRegionExtractable> {
        None
    }

    /// Copy the whole source into a zero-origin buffer.
    fn to_rgba(&self) -> RgbaImage {
        let b = self.bounds();
        let (w, h) = (b.width().max(0) as u32, b.height().max(0) as u32);
        RgbaImage::from_fn(w, h, |x, y| self.pixel(b.x0 + x as i32, b.y0 + y as i32))
    }
}

/// Sources that can hand out a copy of one of their sub-rectangles.
pub trait SubRegionExtractable {
    /// Copy `rect` (clipped to the source bounds) into a zero-origin buffer.
    fn extract(&self, rect: Rect) -> RgbaImage;
}

impl RasterSource for RgbaImage {
    fn bounds(&self) -> Rect {
        Rect::from_size(self.width(), self.height())
    }

    fn pixel(&self, x: i32, y: i32) -> Rgba<u8> {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(x), Ok(y)) => self.get_pixel_checked(x, y).copied().unwrap_or(Rgba([0, 0, 0, 0])),
            _ => Rgba([0, 0, 0, 0]),
        }
    }

    fn sub_region(&self) -> Option<&dyn SubRegionExtractable> {
        Some(self)
    }

    fn to_rgba(&self) -> RgbaImage {
        self.clone()
    }
}

impl SubRegionExtractable for RgbaImage {
    fn extract(&self, rect: Rect) -> RgbaImage {
        let r = rect.intersect(&self.bounds());
        if r.is_empty() {
            return RgbaImage::new(0, 0);
        }
        imageops::crop_imm(
            self,
            r.x0 as u32,
            r.y0 as u32,
            r.width() as u32,
            r.height() as u32,
        )
        .to_image()
    }
}
