//! Scoped runtime probes.
//!
//! Timers and counters are acquired when a loop is entered and release
//! their event when dropped, so every exit path (normal completion,
//! `break`, early `return`, `?`) emits exactly one closing event.
//!
//! ```ignore
//! let (result, trace) = profile_program(Vec::new(), |channel| {
//!     let _timer = LoopTimer::start(channel, "for_3");
//!     let mut counter = IterationCounter::start(channel, "for_3");
//!     for row in rows {
//!         counter.tick();
//!         // ...
//!     }
//! })?;
//! ```

use crate::parser::TraceEvent;
use crate::utils::config::{TRACE_CLOSE_MARKER, TRACE_OPEN_MARKER};
use log::{debug, warn};
use std::cell::RefCell;
use std::io::{self, Write};
use std::time::Instant;

/// Connect/emit/disconnect channel the probes write through
pub struct TraceChannel<W: Write> {
    writer: W,
    emitted: usize,
    failure: Option<io::Error>,
}

impl<W: Write> TraceChannel<W> {
    /// Open the channel and write the opening marker
    pub fn connect(mut writer: W) -> io::Result<Self> {
        write!(writer, "{}", TRACE_OPEN_MARKER)?;
        Ok(Self {
            writer,
            emitted: 0,
            failure: None,
        })
    }

    /// Write one event
    ///
    /// A write failure is remembered and reported by [`disconnect`],
    /// since probes release from `Drop` and cannot propagate it.
    ///
    /// [`disconnect`]: TraceChannel::disconnect
    pub fn emit(&mut self, event: &TraceEvent) {
        if self.failure.is_some() {
            return;
        }
        let separator = if self.emitted == 0 { "" } else { "," };
        match write!(self.writer, "{}{}", separator, event) {
            Ok(()) => self.emitted += 1,
            Err(e) => {
                warn!("Trace channel write failed: {}", e);
                self.failure = Some(e);
            }
        }
    }

    /// Events written so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Write the closing marker and hand back the writer
    pub fn disconnect(mut self) -> io::Result<W> {
        if let Some(e) = self.failure.take() {
            return Err(e);
        }
        write!(self.writer, "{}", TRACE_CLOSE_MARKER)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn release<W: Write>(channel: &RefCell<TraceChannel<W>>, event: TraceEvent) {
    match channel.try_borrow_mut() {
        Ok(mut channel) => channel.emit(&event),
        Err(_) => warn!("Trace channel busy; dropping {}", event),
    }
}

/// Emits `(0, tag, seconds)` when dropped
pub struct LoopTimer<'c, W: Write> {
    channel: &'c RefCell<TraceChannel<W>>,
    tag: String,
    started: Instant,
}

impl<'c, W: Write> LoopTimer<'c, W> {
    pub fn start(channel: &'c RefCell<TraceChannel<W>>, tag: impl Into<String>) -> Self {
        Self {
            channel,
            tag: tag.into(),
            started: Instant::now(),
        }
    }
}

impl<W: Write> Drop for LoopTimer<'_, W> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        release(
            self.channel,
            TraceEvent::loop_timer(std::mem::take(&mut self.tag), elapsed),
        );
    }
}

/// Counts iteration-body entries; emits `(1, tag, count)` when dropped
pub struct IterationCounter<'c, W: Write> {
    channel: &'c RefCell<TraceChannel<W>>,
    tag: String,
    count: u64,
}

impl<'c, W: Write> IterationCounter<'c, W> {
    pub fn start(channel: &'c RefCell<TraceChannel<W>>, tag: impl Into<String>) -> Self {
        Self {
            channel,
            tag: tag.into(),
            count: 0,
        }
    }

    /// Call once at the start of every iteration body
    pub fn tick(&mut self) {
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<W: Write> Drop for IterationCounter<'_, W> {
    fn drop(&mut self) {
        release(
            self.channel,
            TraceEvent::loop_counter(std::mem::take(&mut self.tag), self.count),
        );
    }
}

/// Emits `(2, seconds)` when dropped
pub struct ProgramTimer<'c, W: Write> {
    channel: &'c RefCell<TraceChannel<W>>,
    started: Instant,
}

impl<'c, W: Write> ProgramTimer<'c, W> {
    pub fn start(channel: &'c RefCell<TraceChannel<W>>) -> Self {
        Self {
            channel,
            started: Instant::now(),
        }
    }
}

impl<W: Write> Drop for ProgramTimer<'_, W> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_secs_f64();
        release(self.channel, TraceEvent::program_timer(elapsed));
    }
}

/// Run an entry-function body under the channel and program timer
///
/// Connects the channel, runs `body` inside a program timer, then writes
/// the closing marker and disconnects.
///
/// # Returns
/// The body's result and the writer holding the complete trace
pub fn profile_program<W, R, F>(writer: W, body: F) -> io::Result<(R, W)>
where
    W: Write,
    F: FnOnce(&RefCell<TraceChannel<W>>) -> R,
{
    let channel = RefCell::new(TraceChannel::connect(writer)?);
    let result = {
        let _timer = ProgramTimer::start(&channel);
        body(&channel)
    };
    let channel = channel.into_inner();
    debug!("Program finished after {} trace events", channel.emitted());
    let writer = channel.disconnect()?;
    Ok((result, writer))
}
