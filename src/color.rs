//! Terminal color depth and palette reduction.

use image::{Rgb, Rgba};
use serde::Deserialize;

/// How many colors the terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorDepth {
    /// Decide from `COLORTERM`.
    #[default]
    Auto,
    TrueColor,
    Ansi256,
}

impl ColorDepth {
    /// Replace [`ColorDepth::Auto`] with what the environment advertises.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => Self::from_colorterm(std::env::var("COLORTERM").ok().as_deref()),
            other => other,
        }
    }

    pub fn from_colorterm(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("truecolor") | Some("24bit") => Self::TrueColor,
            _ => Self::Ansi256,
        }
    }
}

/// Composite a possibly translucent pixel over black.
pub fn over_black(p: Rgba<u8>) -> Rgb<u8> {
    let [r, g, b, a] = p.0;
    let mul = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
    Rgb([mul(r), mul(g), mul(b)])
}

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

fn cube_index(c: u8) -> usize {
    match c {
        0..=47 => 0,
        48..=114 => 1,
        _ => ((c as usize - 35) / 40).min(5),
    }
}

fn distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as i32 - y as i32;
            (d * d) as u32
        })
        .sum()
}

/// Nearest entry of the xterm 256-color palette, from the 6×6×6 cube or the
/// 24-step gray ramp.
pub fn ansi256(color: Rgb<u8>) -> u8 {
    let [r, g, b] = color.0;
    let (ri, gi, bi) = (cube_index(r), cube_index(g), cube_index(b));
    let cube = [CUBE_LEVELS[ri], CUBE_LEVELS[gi], CUBE_LEVELS[bi]];
    let cube_code = 16 + 36 * ri + 6 * gi + bi;

    let avg = (r as u32 + g as u32 + b as u32) / 3;
    let gray_step = if avg > 238 { 23 } else { (avg.saturating_sub(3) / 10).min(23) };
    let level = (8 + 10 * gray_step) as u8;
    let gray_code = 232 + gray_step as usize;

    if distance([level; 3], color.0) < distance(cube, color.0) {
        gray_code as u8
    } else {
        cube_code as u8
    }
}
