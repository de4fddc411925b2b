//! Viewport mapper: a pannable, zoomable window into a source image,
//! resampled to the terminal's cell grid.
//!
//! The target grid has twice as many pixel rows as the terminal has cell
//! rows. Each cell shows two stacked pixels: the top one as background and
//! the bottom one as the foreground of a lower half block.

use std::sync::Arc;

use image::{Rgb, RgbaImage};
use tracing::debug;

use crate::color::over_black;
use crate::raster::{clamp_i32, RasterSource, Rect};
use crate::resample::{BoxFilter, Resampler};
use crate::surface::{CellSurface, BLACK};

/// Lower half block: the foreground paints the bottom pixel.
pub const HALF_BLOCK: char = '▄';

/// Pan direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Immutable snapshot of a resampled window, ready to draw.
#[derive(Debug, Clone)]
pub struct Frame {
    scaled: Arc<RgbaImage>,
    cols: u32,
    rows: u32,
}

impl Frame {
    /// Target grid `(cols, pixel rows)`.
    pub fn target(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    pub fn scaled(&self) -> &RgbaImage {
        &self.scaled
    }

    /// Color of target pixel `(x, y)`. Anything past the requested grid or
    /// past the resampled raster reads as black.
    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        let (cols, rows) = (self.cols as u64, self.rows as u64);
        if y as u64 * cols + x as u64 >= cols * rows {
            return BLACK;
        }
        self.scaled
            .get_pixel_checked(x, y)
            .map_or(BLACK, |p| over_black(*p))
    }

    /// Terminal cell rows covered by this frame.
    pub fn cell_rows(&self) -> u32 {
        self.rows.div_ceil(2)
    }

    /// Paint every cell of the grid onto `surface`.
    pub fn render_to<S: CellSurface + ?Sized>(&self, surface: &mut S) {
        let cols = u16::try_from(self.cols).unwrap_or(u16::MAX);
        let cell_rows = u16::try_from(self.cell_rows()).unwrap_or(u16::MAX);
        surface.resize(cols, cell_rows);

        for k in 0..cell_rows {
            let top_y = k as u32 * 2;
            for c in 0..cols {
                let bg = self.pixel(c as u32, top_y);
                let fg = self.pixel(c as u32, top_y + 1);
                let glyph = if fg == bg { ' ' } else { HALF_BLOCK };
                surface.set_cell(c, k, fg, bg, glyph);
            }
        }
    }
}

/// A window into `source`, kept resampled to the target grid.
///
/// Every mutator validates, commits and resamples before returning, so a
/// [`Frame`] taken afterwards always matches the committed window.
pub struct Viewport<S, R = BoxFilter> {
    source: S,
    resampler: R,
    window: Rect,
    cols: u32,
    rows: u32,
    scaled: Arc<RgbaImage>,
}

impl<S: RasterSource> Viewport<S> {
    pub fn new(source: S, cols: u32, rows: u32) -> Self {
        Self::with_resampler(source, BoxFilter, cols, rows)
    }
}

impl<S: RasterSource, R: Resampler> Viewport<S, R> {
    pub fn with_resampler(source: S, resampler: R, cols: u32, rows: u32) -> Self {
        let window = source.bounds();
        let mut viewport = Self {
            source,
            resampler,
            window,
            cols,
            rows,
            scaled: Arc::new(RgbaImage::new(0, 0)),
        };
        viewport.resync();
        viewport
    }

    pub fn window(&self) -> Rect {
        self.window
    }

    pub fn bounds(&self) -> Rect {
        self.source.bounds()
    }

    /// Target grid `(cols, pixel rows)`.
    pub fn target(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    pub fn frame(&self) -> Frame {
        Frame {
            scaled: Arc::clone(&self.scaled),
            cols: self.cols,
            rows: self.rows,
        }
    }

    pub fn render_to<D: CellSurface + ?Sized>(&self, surface: &mut D) {
        self.frame().render_to(surface);
    }

    /// Source pixels per target pixel along the most compressed axis, or
    /// `None` when the target grid is empty.
    pub fn step(&self) -> Option<i32> {
        if self.cols == 0 || self.rows == 0 {
            return None;
        }
        let b = self.source.bounds();
        let sx = b.width() as i64 / self.cols as i64;
        let sy = b.height() as i64 / self.rows as i64;
        Some(clamp_i32(sx.max(sy).max(1)))
    }

    /// `rows` must already be doubled.
    pub fn resize(&mut self, cols: u32, rows: u32) {
        self.cols = cols;
        self.rows = rows;
        self.resync();
    }

    pub fn reset_zoom(&mut self) -> bool {
        let bounds = self.source.bounds();
        let changed = self.window != bounds;
        self.window = bounds;
        self.resync();
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        let Some(sz) = self.navigable_step() else {
            return false;
        };
        let r = self.window.inset(sz);
        let min = sz.saturating_mul(2);
        if r.width() < min || r.height() < min {
            return false;
        }
        self.commit(self.fix_aspect(r).intersect(&self.source.bounds()))
    }

    pub fn zoom_out(&mut self) -> bool {
        let Some(sz) = self.navigable_step() else {
            return false;
        };
        let r = self.window.inset(-sz);
        self.commit(self.fix_aspect(r).intersect(&self.source.bounds()))
    }

    /// Move one step; refused rather than clamped when it would leave the image.
    pub fn pan(&mut self, dir: Direction) -> bool {
        let Some(sz) = self.navigable_step() else {
            return false;
        };
        let (dx, dy) = match dir {
            Direction::Left => (-sz, 0),
            Direction::Right => (sz, 0),
            Direction::Up => (0, -sz),
            Direction::Down => (0, sz),
        };
        let r = self.window.translate(dx, dy);
        if !self.source.bounds().contains(&r) {
            return false;
        }
        self.commit(r)
    }

    pub fn pan_left(&mut self) -> bool {
        self.pan(Direction::Left)
    }

    pub fn pan_right(&mut self) -> bool {
        self.pan(Direction::Right)
    }

    pub fn pan_up(&mut self) -> bool {
        self.pan(Direction::Up)
    }

    pub fn pan_down(&mut self) -> bool {
        self.pan(Direction::Down)
    }

    /// Recompute the scaled raster from the current window and grid.
    pub fn resync(&mut self) {
        let region = match self.source.sub_region() {
            Some(ext) => ext.extract(self.window),
            None => self.source.to_rgba(),
        };
        let scaled = self.resampler.fit(&region, self.cols, self.rows);
        debug!(
            window = ?self.window,
            cols = self.cols,
            rows = self.rows,
            scaled_w = scaled.width(),
            scaled_h = scaled.height(),
            "viewport resampled"
        );
        self.scaled = Arc::new(scaled);
    }

    /// Step size, if the window can move at all: sources without sub-region
    /// extraction always show the whole image.
    fn navigable_step(&self) -> Option<i32> {
        self.source.sub_region()?;
        self.step()
    }

    fn commit(&mut self, r: Rect) -> bool {
        if r.is_empty() || r == self.window {
            return false;
        }
        self.window = r;
        self.resync();
        true
    }

    /// Grow the shorter side of `r` around its center until `r` has the
    /// aspect ratio of the target grid.
    fn fix_aspect(&self, r: Rect) -> Rect {
        let (w, h) = (r.width() as i64, r.height() as i64);
        let (cols, rows) = (self.cols as i64, self.rows as i64);
        if w <= 0 || h <= 0 {
            return r;
        }
        if w * rows < h * cols {
            let grow = (h * cols + rows / 2) / rows - w;
            let left = grow / 2;
            Rect {
                x0: clamp_i32(r.x0 as i64 - left),
                x1: clamp_i32(r.x1 as i64 + grow - left),
                ..r
            }
        } else if w * rows > h * cols {
            let grow = (w * rows + cols / 2) / cols - h;
            let top = grow / 2;
            Rect {
                y0: clamp_i32(r.y0 as i64 - top),
                y1: clamp_i32(r.y1 as i64 + grow - top),
                ..r
            }
        } else {
            r
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 100, 255]))
    }

    /// A source without the sub-region capability.
    struct Opaque(RgbaImage);

    impl RasterSource for Opaque {
        fn bounds(&self) -> Rect {
            self.0.bounds()
        }

        fn pixel(&self, x: i32, y: i32) -> Rgba<u8> {
            self.0.pixel(x, y)
        }
    }

    #[test]
    fn starts_on_full_image() {
        let vp = Viewport::new(gradient(100, 50), 50, 50);
        assert_eq!(vp.window(), Rect::new(0, 0, 100, 50));
        assert_eq!(vp.step(), Some(2));
        assert_eq!(vp.frame().scaled().dimensions(), (50, 25));
    }

    #[test]
    fn zoom_in_insets_then_fixes_aspect() {
        let mut vp = Viewport::new(gradient(100, 50), 50, 50);
        assert!(vp.zoom_in());
        // (2,2,98,48) widened vertically to 96×96, then clipped.
        assert_eq!(vp.window(), Rect::new(2, 0, 98, 50));
    }

    #[test]
    fn zoom_in_stops_at_minimum_extent() {
        let mut vp = Viewport::new(gradient(100, 50), 50, 50);
        let mut steps = 0;
        while vp.zoom_in() {
            steps += 1;
            let w = vp.window();
            assert!(w.width() > 0 && w.height() > 0);
            assert!(vp.bounds().contains(&w));
            assert!(steps < 100, "zoom_in never settled");
        }
        let settled = vp.window();
        assert!(!vp.zoom_in());
        assert_eq!(vp.window(), settled);
        assert!(settled.width() >= 4 && settled.height() >= 4);
    }

    #[test]
    fn zoom_out_saturates_at_bounds() {
        let mut vp = Viewport::new(gradient(100, 50), 50, 50);
        assert!(!vp.zoom_out());
        assert_eq!(vp.window(), vp.bounds());
        for _ in 0..5 {
            vp.zoom_in();
        }
        for _ in 0..50 {
            vp.zoom_out();
        }
        assert_eq!(vp.window(), vp.bounds());
    }

    #[test]
    fn zoom_round_trip_from_full_bounds() {
        let mut vp = Viewport::new(gradient(100, 50), 50, 50);
        let original = vp.window();
        vp.zoom_in();
        vp.zoom_out();
        assert_eq!(vp.window(), original);
    }

    #[test]
    fn zoom_round_trip_within_one_step() {
        // Target aspect matches the window, so no correction is applied.
        let mut vp = Viewport::new(gradient(200, 200), 50, 50);
        for _ in 0..10 {
            vp.zoom_in();
        }
        let before = vp.window();
        let sz = vp.step().unwrap();
        vp.zoom_in();
        vp.zoom_out();
        let after = vp.window();
        assert!((after.x0 - before.x0).abs() <= sz);
        assert!((after.y0 - before.y0).abs() <= sz);
        assert!((after.x1 - before.x1).abs() <= sz);
        assert!((after.y1 - before.y1).abs() <= sz);
    }

    #[test]
    fn pan_refuses_to_leave_bounds() {
        let mut vp = Viewport::new(gradient(100, 50), 50, 50);
        assert!(!vp.pan_right());
        vp.zoom_in();
        assert!(vp.pan_right());
        assert_eq!(vp.window(), Rect::new(4, 0, 100, 50));
        for _ in 0..10 {
            assert!(!vp.pan_right());
            assert_eq!(vp.window(), Rect::new(4, 0, 100, 50));
        }
        assert!(!vp.pan_down());
        assert!(vp.pan_left());
        assert!(vp.pan_left());
        assert_eq!(vp.window(), Rect::new(0, 0, 96, 50));
        assert!(!vp.pan_left());
    }

    #[test]
    fn reset_zoom_is_history_independent() {
        let mut vp = Viewport::new(gradient(120, 80), 40, 40);
        vp.zoom_in();
        vp.zoom_in();
        vp.pan_down();
        vp.pan_left();
        vp.reset_zoom();
        assert_eq!(vp.window(), vp.bounds());
        assert!(!vp.reset_zoom());
        assert_eq!(vp.window(), vp.bounds());
    }

    #[test]
    fn empty_target_renders_nothing() {
        let mut vp = Viewport::new(gradient(10, 10), 0, 10);
        assert_eq!(vp.step(), None);
        assert!(!vp.zoom_in());
        assert!(!vp.pan_right());
        let mut surface = MemorySurface::new(0, 0);
        vp.render_to(&mut surface);
        assert_eq!(surface.writes(), 0);

        vp.resize(10, 10);
        vp.render_to(&mut surface);
        assert_eq!(surface.writes(), 50);
    }

    #[test]
    fn render_writes_every_cell() {
        let vp = Viewport::new(gradient(100, 50), 50, 50);
        let mut surface = MemorySurface::new(50, 25);
        vp.render_to(&mut surface);
        assert_eq!(surface.writes(), 50 * 25);
        // The scaled image is 50×25, so the lower half is letterboxed black.
        let bottom = surface.cell(0, 24).unwrap();
        assert_eq!((bottom.fg, bottom.bg, bottom.glyph), (BLACK, BLACK, ' '));
    }

    #[test]
    fn defensive_bound_reads_black() {
        let vp = Viewport::new(gradient(4, 2), 4, 2);
        let frame = vp.frame();
        assert_eq!(frame.target(), (4, 2));
        assert_ne!(frame.pixel(3, 1), BLACK);
        assert_eq!(frame.pixel(4, 1), BLACK);
        assert_eq!(frame.pixel(0, 2), BLACK);
    }

    #[test]
    fn pixel_pairs_pick_glyph() {
        let img = RgbaImage::from_fn(2, 2, |x, y| match (x, y) {
            (0, _) => Rgba([10, 20, 30, 255]),
            (1, 0) => Rgba([255, 0, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let vp = Viewport::new(img, 2, 2);
        let mut surface = MemorySurface::new(2, 1);
        vp.render_to(&mut surface);

        let same = surface.cell(0, 0).unwrap();
        assert_eq!(same.glyph, ' ');
        assert_eq!(same.bg, Rgb([10, 20, 30]));

        let split = surface.cell(1, 0).unwrap();
        assert_eq!(split.glyph, HALF_BLOCK);
        assert_eq!(split.bg, Rgb([255, 0, 0]));
        assert_eq!(split.fg, Rgb([0, 0, 255]));
    }

    #[test]
    fn resize_keeps_window() {
        let mut vp = Viewport::new(gradient(100, 50), 50, 50);
        vp.zoom_in();
        let w = vp.window();
        vp.resize(80, 48);
        assert_eq!(vp.window(), w);
        assert_eq!(vp.target(), (80, 48));
        let frame = vp.frame();
        assert_eq!(frame.target(), (80, 48));
        assert_eq!(frame.scaled().dimensions(), (80, 42));
    }

    #[test]
    fn sources_without_sub_regions_stay_whole() {
        let mut vp = Viewport::new(Opaque(gradient(100, 50)), 50, 50);
        assert!(!vp.zoom_in());
        assert!(!vp.pan_right());
        assert_eq!(vp.window(), vp.bounds());
        assert_eq!(vp.frame().scaled().dimensions(), (50, 25));
    }
}
