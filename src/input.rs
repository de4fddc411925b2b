//! Input events, the key map, and the input task.

use std::sync::mpsc::{Receiver, SyncSender};

use tracing::{debug, trace};

use crate::raster::RasterSource;
use crate::redraw::RedrawSignal;
use crate::resample::Resampler;
use crate::viewport::{Direction, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// A letter pressed with Control.
    Ctrl(char),
    Up,
    Down,
    Left,
    Right,
    Enter,
    Esc,
}

/// Terminal events the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    /// New terminal size in cells.
    Resize(u16, u16),
    /// Synthetic wake-up, posted by the slideshow timer of the image
    /// session with this id.
    Interrupt(u64),
}

/// How a viewing session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Move on to the next image.
    Advance,
    /// Stop the program.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pan(Direction),
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Refresh,
    Resize(u16, u16),
    Exit(Outcome),
}

impl Command {
    pub fn from_event(event: InputEvent) -> Option<Self> {
        let key = match event {
            InputEvent::Key(key) => key,
            InputEvent::Resize(cols, rows) => return Some(Self::Resize(cols, rows)),
            InputEvent::Interrupt(_) => return Some(Self::Exit(Outcome::Advance)),
        };
        Some(match key {
            Key::Up => Self::Pan(Direction::Up),
            Key::Down => Self::Pan(Direction::Down),
            Key::Left => Self::Pan(Direction::Left),
            Key::Right => Self::Pan(Direction::Right),
            Key::Char('+' | '=' | 'z') => Self::ZoomIn,
            Key::Char('-') => Self::ZoomOut,
            Key::Char('0') => Self::ResetZoom,
            Key::Ctrl('l') => Self::Refresh,
            Key::Esc | Key::Enter => Self::Exit(Outcome::Advance),
            Key::Char('q') | Key::Ctrl('c') => Self::Exit(Outcome::Quit),
            _ => return None,
        })
    }
}

/// Translate events into viewport changes until the user leaves.
///
/// Every change is committed before its frame is sent, so the redraw task
/// only ever sees finished states. A closed event stream counts as quitting;
/// a closed redraw channel means the redraw task died and also ends input.
/// Interrupts posted for any session other than `session` are dropped.
pub fn drive<S, R>(
    events: &Receiver<InputEvent>,
    session: u64,
    viewport: &mut Viewport<S, R>,
    redraw: &SyncSender<RedrawSignal>,
) -> Outcome
where
    S: RasterSource,
    R: Resampler,
{
    loop {
        let Ok(event) = events.recv() else {
            debug!("event stream closed");
            return Outcome::Quit;
        };
        if let InputEvent::Interrupt(id) = event {
            if id != session {
                debug!(id, session, "stale interrupt dropped");
                continue;
            }
        }
        let Some(command) = Command::from_event(event) else {
            trace!(?event, "ignored event");
            continue;
        };

        let signal = match command {
            Command::Exit(outcome) => return outcome,
            Command::Refresh => {
                viewport.resync();
                RedrawSignal::force(viewport.frame())
            }
            Command::Resize(cols, rows) => {
                viewport.resize(cols as u32, rows as u32 * 2);
                RedrawSignal::coalesce(viewport.frame())
            }
            Command::Pan(dir) => {
                if !viewport.pan(dir) {
                    continue;
                }
                RedrawSignal::coalesce(viewport.frame())
            }
            Command::ZoomIn => {
                if !viewport.zoom_in() {
                    continue;
                }
                RedrawSignal::coalesce(viewport.frame())
            }
            Command::ZoomOut => {
                if !viewport.zoom_out() {
                    continue;
                }
                RedrawSignal::coalesce(viewport.frame())
            }
            Command::ResetZoom => {
                if !viewport.reset_zoom() {
                    continue;
                }
                RedrawSignal::coalesce(viewport.frame())
            }
        };
        trace!(?command, window = ?viewport.window(), "viewport updated");

        if redraw.send(signal).is_err() {
            debug!("redraw task gone");
            return Outcome::Quit;
        }
    }
}
