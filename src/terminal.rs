//! Crossterm-backed display surface and terminal session.

use std::io::{self, Stdout, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, ClearType},
    ExecutableCommand,
};
use image::Rgb;
use tracing::{debug, warn};

use crate::color::{ansi256, ColorDepth};
use crate::input::{InputEvent, Key};
use crate::surface::{Cell, CellSurface};
use crate::{Result, ShowpicError};

/// Raw mode, alternate screen and a hidden cursor, restored on drop.
struct RawGuard {
    cleaned: bool,
}

impl RawGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut guard = Self { cleaned: false };
        let mut out = io::stdout();
        if let Err(e) = out
            .execute(terminal::EnterAlternateScreen)
            .and_then(|o| o.execute(cursor::Hide))
        {
            guard.cleanup();
            return Err(e);
        }
        Ok(guard)
    }

    fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        let mut out = io::stdout();
        let _ = out.execute(ResetColor);
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Drop for RawGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Cell grid drawn to stdout with crossterm.
///
/// `present` only writes cells that differ from what is already on screen.
pub struct TerminalSurface {
    out: Stdout,
    depth: ColorDepth,
    cols: u16,
    rows: u16,
    back: Vec<Cell>,
    front: Vec<Option<Cell>>,
}

impl TerminalSurface {
    pub fn new(depth: ColorDepth) -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        let len = cols as usize * rows as usize;
        Ok(Self {
            out: io::stdout(),
            depth: depth.resolve(),
            cols,
            rows,
            back: vec![Cell::default(); len],
            front: vec![None; len],
        })
    }

    fn color(&self, c: Rgb<u8>) -> Color {
        let [r, g, b] = c.0;
        match self.depth {
            ColorDepth::Ansi256 => Color::AnsiValue(ansi256(c)),
            ColorDepth::TrueColor | ColorDepth::Auto => Color::Rgb { r, g, b },
        }
    }

    fn flush_cells(&mut self, all: bool) -> io::Result<()> {
        let mut last: Option<(Rgb<u8>, Rgb<u8>)> = None;
        let mut cursor_at: Option<(u16, u16)> = None;
        let mut written = 0usize;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = y as usize * self.cols as usize + x as usize;
                let cell = self.back[i];
                if !all && self.front[i] == Some(cell) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.out, cursor::MoveTo(x, y))?;
                }
                if last != Some((cell.fg, cell.bg)) {
                    let (fg, bg) = (self.color(cell.fg), self.color(cell.bg));
                    queue!(self.out, SetForegroundColor(fg), SetBackgroundColor(bg))?;
                    last = Some((cell.fg, cell.bg));
                }
                queue!(self.out, Print(cell.glyph))?;
                self.front[i] = Some(cell);
                cursor_at = Some((x + 1, y));
                written += 1;
            }
        }
        self.out.flush()?;
        debug!(written, full = all, "terminal flushed");
        Ok(())
    }
}

impl CellSurface for TerminalSurface {
    fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        if (cols, rows) == (self.cols, self.rows) {
            return;
        }
        let len = cols as usize * rows as usize;
        self.cols = cols;
        self.rows = rows;
        self.back = vec![Cell::default(); len];
        self.front = vec![None; len];
    }

    fn clear(&mut self) {
        self.back.fill(Cell::default());
    }

    fn set_cell(&mut self, x: u16, y: u16, fg: Rgb<u8>, bg: Rgb<u8>, glyph: char) {
        if x >= self.cols || y >= self.rows {
            return;
        }
        self.back[y as usize * self.cols as usize + x as usize] = Cell { glyph, fg, bg };
    }

    fn present(&mut self) -> io::Result<()> {
        self.flush_cells(false)
    }

    fn sync(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            SetBackgroundColor(Color::Black),
            terminal::Clear(ClearType::All)
        )?;
        self.front.fill(None);
        self.flush_cells(true)
    }
}

/// Map a crossterm event onto the events the viewer understands.
pub fn translate(event: Event) -> Option<InputEvent> {
    match event {
        Event::Key(key) => translate_key(key).map(InputEvent::Key),
        Event::Resize(cols, rows) => Some(InputEvent::Resize(cols, rows)),
        _ => None,
    }
}

fn translate_key(key: KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    Some(match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Key::Ctrl(c.to_ascii_lowercase())
        }
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        _ => return None,
    })
}

/// Everything that needs the real terminal, held for the life of the program.
pub struct Session {
    pub surface: TerminalSurface,
    pub events: Receiver<InputEvent>,
    poster: Sender<InputEvent>,
    // Dropped last so the screen is restored after everything else is gone.
    _guard: RawGuard,
}

impl Session {
    pub fn open(depth: ColorDepth) -> Result<Self> {
        let guard = RawGuard::enter().map_err(|e| ShowpicError::Display(e.to_string()))?;
        let mut surface =
            TerminalSurface::new(depth).map_err(|e| ShowpicError::Display(e.to_string()))?;
        surface.sync()?;

        let (poster, events) = mpsc::channel();
        let tx = poster.clone();
        thread::Builder::new()
            .name("showpic-input".into())
            .spawn(move || loop {
                match event::read() {
                    Ok(ev) => {
                        if let Some(ev) = translate(ev) {
                            if tx.send(ev).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "terminal event stream failed");
                        break;
                    }
                }
            })?;

        debug!(size = ?surface.size(), depth = ?surface.depth, "terminal session opened");
        Ok(Self { surface, events, poster, _guard: guard })
    }

    /// Sender for posting synthetic events, such as the slideshow interrupt.
    pub fn poster(&self) -> Sender<InputEvent> {
        self.poster.clone()
    }
}
