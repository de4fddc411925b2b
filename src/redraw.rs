//! Redraw coalescing.
//!
//! Holding an arrow key produces a stream of viewport changes far faster
//! than a full repaint can keep up with. The redraw task merges bursts of
//! coalescable signals that arrive within a short debounce window and paints
//! only the newest frame. A forced signal ends the window at once.

use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::surface::CellSurface;
use crate::viewport::Frame;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(10);

/// How a redraw request wants to be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repaint {
    /// May be merged with requests that follow shortly after.
    Coalesce,
    /// Paint now and resynchronize the whole screen.
    Force,
}

#[derive(Debug, Clone)]
pub struct RedrawSignal {
    pub frame: Frame,
    pub kind: Repaint,
}

impl RedrawSignal {
    pub fn coalesce(frame: Frame) -> Self {
        Self { frame, kind: Repaint::Coalesce }
    }

    pub fn force(frame: Frame) -> Self {
        Self { frame, kind: Repaint::Force }
    }
}

/// Result of waiting for a signal with a deadline.
#[derive(Debug)]
pub enum Poll {
    Signal(RedrawSignal),
    Elapsed,
    Closed,
}

/// A queue of redraw signals with its own notion of time.
pub trait SignalSource {
    /// Time elapsed on this source's clock.
    fn now(&self) -> Duration;

    /// Block for the next signal; `None` once all senders are gone.
    fn recv(&mut self) -> Option<RedrawSignal>;

    /// Wait for a signal until `deadline` on this source's clock.
    fn recv_until(&mut self, deadline: Duration) -> Poll;
}

/// [`SignalSource`] over a std channel and the wall clock.
pub struct ChannelSource {
    rx: Receiver<RedrawSignal>,
    epoch: Instant,
}

impl ChannelSource {
    pub fn new(rx: Receiver<RedrawSignal>) -> Self {
        Self { rx, epoch: Instant::now() }
    }
}

impl SignalSource for ChannelSource {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn recv(&mut self) -> Option<RedrawSignal> {
        self.rx.recv().ok()
    }

    fn recv_until(&mut self, deadline: Duration) -> Poll {
        let timeout = deadline.saturating_sub(self.now());
        match self.rx.recv_timeout(timeout) {
            Ok(signal) => Poll::Signal(signal),
            Err(RecvTimeoutError::Timeout) => Poll::Elapsed,
            Err(RecvTimeoutError::Disconnected) => Poll::Closed,
        }
    }
}

/// What the redraw task did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedrawStats {
    pub renders: usize,
    pub presents: usize,
    pub syncs: usize,
    /// Coalescable signals folded into another render.
    pub merged: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Coalescer {
    debounce: Duration,
}

impl Default for Coalescer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Coalescer {
    pub fn new(debounce: Duration) -> Self {
        Self { debounce }
    }

    /// Drain `source` until it closes, painting onto `surface`.
    pub fn run<Q, D>(&self, source: &mut Q, surface: &mut D) -> io::Result<RedrawStats>
    where
        Q: SignalSource,
        D: CellSurface + ?Sized,
    {
        let mut stats = RedrawStats::default();
        while let Some(signal) = source.recv() {
            let (frame, kind) = match signal.kind {
                Repaint::Force => (signal.frame, Repaint::Force),
                Repaint::Coalesce => self.collect_burst(source, signal.frame, &mut stats),
            };

            frame.render_to(surface);
            stats.renders += 1;
            match kind {
                Repaint::Coalesce => {
                    surface.present()?;
                    stats.presents += 1;
                }
                Repaint::Force => {
                    surface.sync()?;
                    stats.syncs += 1;
                }
            }
        }
        debug!(?stats, "redraw task finished");
        Ok(stats)
    }

    /// Swallow coalescable signals until the debounce window closes and
    /// return the newest frame.
    fn collect_burst<Q: SignalSource>(
        &self,
        source: &mut Q,
        mut latest: Frame,
        stats: &mut RedrawStats,
    ) -> (Frame, Repaint) {
        let deadline = source.now() + self.debounce;
        let mut eaten = 0;
        let kind = loop {
            match source.recv_until(deadline) {
                Poll::Signal(next) => {
                    latest = next.frame;
                    if next.kind == Repaint::Force {
                        break Repaint::Force;
                    }
                    eaten += 1;
                }
                Poll::Elapsed | Poll::Closed => break Repaint::Coalesce,
            }
        };
        if eaten > 0 {
            trace!(eaten, "coalesced redraw requests");
        }
        stats.merged += eaten;
        (latest, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use crate::viewport::Viewport;
    use image::{Rgba, RgbaImage};
    use std::collections::VecDeque;
    use std::sync::mpsc;

    /// Signals scheduled on a virtual clock.
    struct Script {
        now: Duration,
        queue: VecDeque<(Duration, RedrawSignal)>,
    }

    impl Script {
        fn new(items: Vec<(u64, RedrawSignal)>) -> Self {
            Self {
                now: Duration::ZERO,
                queue: items
                    .into_iter()
                    .map(|(ms, s)| (Duration::from_millis(ms), s))
                    .collect(),
            }
        }
    }

    impl SignalSource for Script {
        fn now(&self) -> Duration {
            self.now
        }

        fn recv(&mut self) -> Option<RedrawSignal> {
            let (at, signal) = self.queue.pop_front()?;
            self.now = self.now.max(at);
            Some(signal)
        }

        fn recv_until(&mut self, deadline: Duration) -> Poll {
            match self.queue.front() {
                Some((at, _)) if *at <= deadline => match self.recv() {
                    Some(signal) => Poll::Signal(signal),
                    None => Poll::Closed,
                },
                Some(_) => {
                    self.now = deadline;
                    Poll::Elapsed
                }
                None => Poll::Closed,
            }
        }
    }

    fn frame(shade: u8) -> Frame {
        let img = RgbaImage::from_pixel(2, 2, Rgba([shade, shade, shade, 255]));
        Viewport::new(img, 2, 2).frame()
    }

    fn shade_at_origin(surface: &MemorySurface) -> u8 {
        surface.cell(0, 0).map_or(0, |c| c.bg.0[0])
    }

    #[test]
    fn burst_renders_once() {
        let mut script = Script::new(vec![
            (0, RedrawSignal::coalesce(frame(1))),
            (2, RedrawSignal::coalesce(frame(2))),
            (4, RedrawSignal::coalesce(frame(3))),
            (6, RedrawSignal::coalesce(frame(4))),
        ]);
        let mut surface = MemorySurface::new(2, 1);
        let stats = Coalescer::default().run(&mut script, &mut surface).unwrap();
        assert_eq!(
            stats,
            RedrawStats { renders: 1, presents: 1, syncs: 0, merged: 3 }
        );
        assert_eq!(shade_at_origin(&surface), 4);
    }

    #[test]
    fn bursts_separated_by_silence_render_separately() {
        let mut script = Script::new(vec![
            (0, RedrawSignal::coalesce(frame(1))),
            (5, RedrawSignal::coalesce(frame(2))),
            (50, RedrawSignal::coalesce(frame(3))),
        ]);
        let mut surface = MemorySurface::new(2, 1);
        let stats = Coalescer::default().run(&mut script, &mut surface).unwrap();
        assert_eq!(
            stats,
            RedrawStats { renders: 2, presents: 2, syncs: 0, merged: 1 }
        );
    }

    #[test]
    fn force_breaks_debounce_immediately() {
        let mut script = Script::new(vec![
            (0, RedrawSignal::coalesce(frame(1))),
            (3, RedrawSignal::force(frame(2))),
            (30, RedrawSignal::coalesce(frame(3))),
        ]);
        let mut surface = MemorySurface::new(2, 1);
        let coalescer = Coalescer::default();

        let first = script.recv().unwrap();
        let mut stats = RedrawStats::default();
        let (f, kind) = coalescer.collect_burst(&mut script, first.frame, &mut stats);
        // The window closed at the forced signal, not at the 10ms deadline.
        assert_eq!(script.now(), Duration::from_millis(3));
        assert_eq!(kind, Repaint::Force);
        f.render_to(&mut surface);
        assert_eq!(shade_at_origin(&surface), 2);
    }

    #[test]
    fn lone_force_syncs() {
        let mut script = Script::new(vec![(0, RedrawSignal::force(frame(9)))]);
        let mut surface = MemorySurface::new(2, 1);
        let stats = Coalescer::default().run(&mut script, &mut surface).unwrap();
        assert_eq!(
            stats,
            RedrawStats { renders: 1, presents: 0, syncs: 1, merged: 0 }
        );
        assert_eq!(surface.syncs(), 1);
        assert_eq!(shade_at_origin(&surface), 9);
    }

    #[test]
    fn channel_burst_renders_once() {
        let (tx, rx) = mpsc::sync_channel(8);
        for shade in 1..=5 {
            tx.send(RedrawSignal::coalesce(frame(shade))).ok();
        }
        drop(tx);

        let mut source = ChannelSource::new(rx);
        let mut surface = MemorySurface::new(2, 1);
        let stats = Coalescer::new(Duration::from_millis(50))
            .run(&mut source, &mut surface)
            .unwrap();
        assert_eq!(
            stats,
            RedrawStats { renders: 1, presents: 1, syncs: 0, merged: 4 }
        );
        assert_eq!(surface.presents(), 1);
        assert_eq!(shade_at_origin(&surface), 5);
    }
}
