//! Box-filter resampling into a bounding box.

use image::RgbaImage;
use rayon::prelude::*;

/// Fits a raster into a `max_width × max_height` box.
pub trait Resampler: Send + Sync {
    /// Deterministic; preserves aspect ratio and never exceeds the box.
    /// The box may be larger than `src`, in which case the result is
    /// upscaled to fill it along the tighter axis.
    fn fit(&self, src: &RgbaImage, max_width: u32, max_height: u32) -> RgbaImage;
}

/// Area-averaging filter. Every output pixel is the mean of the source
/// pixels its footprint covers; when upscaling that footprint is a single
/// pixel, so it degrades to nearest-neighbor.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxFilter;

impl Resampler for BoxFilter {
    fn fit(&self, src: &RgbaImage, max_width: u32, max_height: u32) -> RgbaImage {
        let (w, h) = fit_dimensions(src.width(), src.height(), max_width, max_height);
        if w == 0 || h == 0 {
            return RgbaImage::new(0, 0);
        }
        if (w, h) == src.dimensions() {
            return src.clone();
        }
        box_resize(src, w, h)
    }
}

/// Size of `src_w × src_h` scaled to fit inside `max_w × max_h`.
pub fn fit_dimensions(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 || max_w == 0 || max_h == 0 {
        return (0, 0);
    }
    let (sw, sh, mw, mh) = (src_w as u64, src_h as u64, max_w as u64, max_h as u64);
    // Compare sw/sh against mw/mh without floats.
    if sw * mh > sh * mw {
        let h = ((sh * mw + sw / 2) / sw).clamp(1, mh);
        (max_w, h as u32)
    } else {
        let w = ((sw * mh + sh / 2) / sh).clamp(1, mw);
        (w as u32, max_h)
    }
}

/// Source index range `[start, end)` covered by output index `i` of `dst`.
fn span(i: u32, src: u32, dst: u32) -> (u32, u32) {
    let (i, src, dst) = (i as u64, src as u64, dst as u64);
    let start = i * src / dst;
    let end = ((i + 1) * src).div_ceil(dst).max(start + 1).min(src);
    (start as u32, end as u32)
}

fn box_resize(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let cols: Vec<(u32, u32)> = (0..width).map(|x| span(x, src.width(), width)).collect();
    let row_len = width as usize * 4;

    let mut out = RgbaImage::new(width, height);
    (*out)
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let (y0, y1) = span(y as u32, src.height(), height);
            for (x, &(x0, x1)) in cols.iter().enumerate() {
                let mut sum = [0u64; 4];
                for sy in y0..y1 {
                    for sx in x0..x1 {
                        let p = src.get_pixel(sx, sy).0;
                        for c in 0..4 {
                            sum[c] += p[c] as u64;
                        }
                    }
                }
                let count = (x1 - x0) as u64 * (y1 - y0) as u64;
                for c in 0..4 {
                    row[x * 4 + c] = ((sum[c] + count / 2) / count) as u8;
                }
            }
        });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn fit_preserves_aspect() {
        assert_eq!(fit_dimensions(100, 50, 50, 50), (50, 25));
        assert_eq!(fit_dimensions(50, 100, 50, 50), (25, 50));
        assert_eq!(fit_dimensions(96, 50, 50, 50), (50, 26));
        assert_eq!(fit_dimensions(4, 4, 80, 48), (48, 48));
    }

    #[test]
    fn fit_degenerate_box_is_empty() {
        assert_eq!(fit_dimensions(100, 50, 0, 50), (0, 0));
        assert_eq!(fit_dimensions(0, 50, 10, 10), (0, 0));
        let img = RgbaImage::new(10, 10);
        assert_eq!(BoxFilter.fit(&img, 0, 10).dimensions(), (0, 0));
    }

    #[test]
    fn box_filter_averages_blocks() {
        // Left half black, right half white; halving keeps the edge sharp.
        let img = RgbaImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let out = BoxFilter.fit(&img, 2, 1);
        assert_eq!(out.dimensions(), (2, 1));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));

        let mixed = BoxFilter.fit(&img, 1, 1);
        assert_eq!(mixed.get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn upscale_replicates_pixels() {
        let img = RgbaImage::from_fn(2, 1, |x, _| Rgba([x as u8 * 200, 0, 0, 255]));
        let out = BoxFilter.fit(&img, 4, 4);
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(out.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(2, 0), &Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn huge_footprint_keeps_exact_average() {
        // One output pixel covers 17.2M source pixels.
        let white = Rgba([255, 255, 255, 255]);
        let img = RgbaImage::from_pixel(4200, 4100, white);
        let out = BoxFilter.fit(&img, 1, 2);
        assert_eq!(out.dimensions(), (1, 1));
        assert_eq!(out.get_pixel(0, 0), &white);
    }
}
