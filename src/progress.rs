//! Progress reporting for long-running jobs.
//!
//! Each job owns a [`ProgressTracker`] and pushes [`ProgressEvent`]s to a
//! [`ProgressSink`] between units of work. Sinks are one-way: a job never
//! waits on, or reads back from, its sink.

use serde::Serialize;
use std::fmt;

/// Which job an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    PixelMapsZip,
    Areas,
    Binning,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::PixelMapsZip => "pixel-maps-zip",
            Phase::Areas => "areas",
            Phase::Binning => "binning",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl ProgressEvent {
    /// Completed share of the job, `0.0` for a job with no steps.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.current, self.total, self.message)
    }
}

pub trait ProgressSink {
    fn report(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&mut self, _event: ProgressEvent) {}
}

/// Step counter for one job run.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    phase: Phase,
    current: usize,
    total: usize,
}

impl ProgressTracker {
    pub fn new(phase: Phase, total: usize) -> Self {
        Self {
            phase,
            current: 0,
            total,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Mark one more step as done. Never runs past `total`.
    pub fn advance(&mut self) {
        self.current = (self.current + 1).min(self.total);
    }

    /// Event describing the current position.
    pub fn event(&self, message: impl Into<String>) -> ProgressEvent {
        ProgressEvent {
            phase: self.phase,
            current: self.current,
            total: self.total,
            message: message.into(),
        }
    }

    /// Report the current position without advancing.
    pub fn report(&self, sink: &mut dyn ProgressSink, message: impl Into<String>) {
        sink.report(self.event(message));
    }

    /// Advance one step, then report.
    pub fn step(&mut self, sink: &mut dyn ProgressSink, message: impl Into<String>) {
        self.advance();
        self.report(sink, message);
    }
}
