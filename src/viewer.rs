//! Per-image viewing sessions: the image view with its input, redraw and
//! slideshow tasks, and the dismissable message view used for load errors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::input::{self, Command, InputEvent, Outcome};
use crate::load::Loader;
use crate::redraw::{ChannelSource, Coalescer};
use crate::surface::{CellSurface, BLACK, WHITE};
use crate::viewport::Viewport;
use crate::{Result, ShowpicError};

/// Id handed to the next image session; tags its slideshow interrupts.
static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Knobs for a viewing run.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub debounce: Duration,
    pub redraw_queue: usize,
    /// Advance automatically after this long; `None` waits for the user.
    pub slideshow: Option<Duration>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            debounce: crate::redraw::DEFAULT_DEBOUNCE,
            redraw_queue: 8,
            slideshow: None,
        }
    }
}

/// Drives a list of sources through one surface and one event stream.
pub struct Viewer<'a, D> {
    surface: &'a mut D,
    events: &'a Receiver<InputEvent>,
    poster: Sender<InputEvent>,
    loader: Loader,
    options: ViewOptions,
}

impl<'a, D: CellSurface + Send> Viewer<'a, D> {
    pub fn new(
        surface: &'a mut D,
        events: &'a Receiver<InputEvent>,
        poster: Sender<InputEvent>,
        loader: Loader,
        options: ViewOptions,
    ) -> Self {
        Self { surface, events, poster, loader, options }
    }

    /// Show every source in turn. Returns how many were visited before the
    /// run ended.
    pub fn run<S: AsRef<str>>(&mut self, sources: &[S]) -> Result<usize> {
        let mut visited = 0;
        for source in sources {
            let source = source.as_ref();
            visited += 1;
            let outcome = match self.loader.load(source) {
                Ok(image) => show_image(
                    &mut *self.surface,
                    self.events,
                    &self.poster,
                    image,
                    &self.options,
                )?,
                Err(e) => {
                    warn!(source, error = %e, "could not load image");
                    show_message(&mut *self.surface, self.events, &e.to_string())?
                }
            };
            if outcome == Outcome::Quit {
                info!(source, "quit requested");
                break;
            }
        }
        Ok(visited)
    }
}

/// View one image until the user advances or quits.
///
/// The calling thread runs the input task; the redraw task and the optional
/// slideshow timer run on scoped threads and end when the input task drops
/// its senders. An interrupt the timer of an earlier session left in
/// `events` does not advance this one.
pub fn show_image<D: CellSurface + Send>(
    surface: &mut D,
    events: &Receiver<InputEvent>,
    poster: &Sender<InputEvent>,
    image: RgbaImage,
    options: &ViewOptions,
) -> Result<Outcome> {
    let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
    let (cols, rows) = surface.size();
    let mut viewport = Viewport::new(image, cols as u32, rows as u32 * 2);
    surface.clear();
    viewport.render_to(surface);
    surface.present()?;

    let coalescer = Coalescer::new(options.debounce);
    let (redraw_tx, redraw_rx) = mpsc::sync_channel(options.redraw_queue.max(1));
    let (quit_tx, quit_rx) = mpsc::channel::<()>();

    thread::scope(|scope| -> Result<Outcome> {
        let redraw = scope.spawn(move || {
            let mut source = ChannelSource::new(redraw_rx);
            coalescer.run(&mut source, surface)
        });

        if let Some(timeout) = options.slideshow {
            let poster = poster.clone();
            scope.spawn(move || slideshow_timer(quit_rx, timeout, session, poster));
        }

        let outcome = input::drive(events, session, &mut viewport, &redraw_tx);
        drop(redraw_tx);
        drop(quit_tx);

        let stats = redraw
            .join()
            .map_err(|_| ShowpicError::Display("redraw task panicked".into()))??;
        debug!(session, ?outcome, ?stats, "image closed");
        Ok(outcome)
    })
}

/// Post an interrupt for `session` after `timeout` unless `quit` closes first.
fn slideshow_timer(
    quit: Receiver<()>,
    timeout: Duration,
    session: u64,
    poster: Sender<InputEvent>,
) {
    match quit.recv_timeout(timeout) {
        Err(RecvTimeoutError::Timeout) => {
            debug!(?timeout, session, "slideshow advancing");
            let _ = poster.send(InputEvent::Interrupt(session));
        }
        Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
    }
}

/// Show `text` in white on black until the user dismisses it.
pub fn show_message<D: CellSurface + ?Sized>(
    surface: &mut D,
    events: &Receiver<InputEvent>,
    text: &str,
) -> Result<Outcome> {
    draw_message(surface, text);
    surface.present()?;

    loop {
        let Ok(event) = events.recv() else {
            return Ok(Outcome::Quit);
        };
        match Command::from_event(event) {
            Some(Command::Exit(outcome)) if !matches!(event, InputEvent::Interrupt(_)) => {
                return Ok(outcome);
            }
            Some(Command::Resize(cols, rows)) => {
                surface.resize(cols, rows);
                draw_message(surface, text);
                surface.sync()?;
            }
            _ => {}
        }
    }
}

fn draw_message<D: CellSurface + ?Sized>(surface: &mut D, text: &str) {
    surface.clear();
    let (cols, rows) = surface.size();
    if cols == 0 {
        return;
    }
    let (mut x, mut y) = (0u16, 0u16);
    for ch in text.chars() {
        if ch == '\n' || x >= cols {
            x = 0;
            y += 1;
            if ch == '\n' {
                continue;
            }
        }
        if y >= rows {
            break;
        }
        surface.set_cell(x, y, WHITE, BLACK, ch);
        x += 1;
    }
}
