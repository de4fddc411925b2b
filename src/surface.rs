//! The cell grid that frames and messages are drawn on.

use image::Rgb;
use std::io;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// One character cell: a glyph drawn in `fg` over `bg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub glyph: char,
    pub fg: Rgb<u8>,
    pub bg: Rgb<u8>,
}

impl Default for Cell {
    fn default() -> Self {
        Self { glyph: ' ', fg: BLACK, bg: BLACK }
    }
}

/// A terminal-like grid of colored cells.
///
/// `set_cell` and `clear` only touch the pending grid; nothing is visible
/// until [`present`](CellSurface::present) or [`sync`](CellSurface::sync).
pub trait CellSurface {
    /// `(cols, rows)`.
    fn size(&self) -> (u16, u16);

    /// Reallocate the grid. A no-op when the size is unchanged.
    fn resize(&mut self, cols: u16, rows: u16);

    /// Reset every pending cell to a blank on black.
    fn clear(&mut self);

    /// Writes outside the grid are ignored.
    fn set_cell(&mut self, x: u16, y: u16, fg: Rgb<u8>, bg: Rgb<u8>, glyph: char);

    /// Make pending cells visible.
    fn present(&mut self) -> io::Result<()>;

    /// Repaint everything from scratch, recovering from corrupted output.
    fn sync(&mut self) -> io::Result<()>;
}

/// Headless surface that keeps the grid in memory.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    cols: u16,
    rows: u16,
    cells: Vec<Cell>,
    writes: usize,
    presents: usize,
    syncs: usize,
}

impl MemorySurface {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); cols as usize * rows as usize],
            writes: 0,
            presents: 0,
            syncs: 0,
        }
    }

    pub fn cell(&self, x: u16, y: u16) -> Option<Cell> {
        if x >= self.cols || y >= self.rows {
            return None;
        }
        self.cells.get(y as usize * self.cols as usize + x as usize).copied()
    }

    /// Glyphs of row `y`, for asserting on text output.
    pub fn row_text(&self, y: u16) -> String {
        (0..self.cols).filter_map(|x| self.cell(x, y)).map(|c| c.glyph).collect()
    }

    /// Number of in-bounds `set_cell` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn presents(&self) -> usize {
        self.presents
    }

    pub fn syncs(&self) -> usize {
        self.syncs
    }
}

impl CellSurface for MemorySurface {
    fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        if (cols, rows) == (self.cols, self.rows) {
            return;
        }
        self.cols = cols;
        self.rows = rows;
        self.cells = vec![Cell::default(); cols as usize * rows as usize];
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    fn set_cell(&mut self, x: u16, y: u16, fg: Rgb<u8>, bg: Rgb<u8>, glyph: char) {
        if x >= self.cols || y >= self.rows {
            return;
        }
        self.cells[y as usize * self.cols as usize + x as usize] = Cell { glyph, fg, bg };
        self.writes += 1;
    }

    fn present(&mut self) -> io::Result<()> {
        self.presents += 1;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.syncs += 1;
        Ok(())
    }
}
