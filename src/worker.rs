//! Background workers.
//!
//! Each worker owns one thread, one request channel and one event channel.
//! Requests are handled strictly in order; every payload crossing a channel
//! is owned, so the caller and the worker never share live data. A worker
//! stops once its handle is dropped.

use std::fmt;
use std::io::{Seek, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::{AreaJob, ExportJob, ExportSummary, ParticipantAreas};
use crate::model::{AnatomicalSide, PersonaDrawing};
use crate::participant::ParticipantData;
use crate::pixel_merge::{merge_drawings, PixelBin};
use crate::progress::{Phase, ProgressEvent};
use crate::surface::RgbaSurfaceProvider;
use crate::survey::Survey;

/// Byte destination for an archive produced on a worker thread.
pub trait ArchiveSink: Write + Seek + Send {}

impl<T: Write + Seek + Send> ArchiveSink for T {}

// ============================================================================
// Binning worker
// ============================================================================

#[derive(Debug)]
pub enum BinningRequest {
    GetBins {
        side: AnatomicalSide,
        drawings: Vec<PersonaDrawing>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BinningEvent {
    Progress {
        side: AnatomicalSide,
        event: ProgressEvent,
    },
    Bins {
        side: AnatomicalSide,
        bins: Vec<PixelBin>,
    },
}

fn handle_binning(request: BinningRequest, events: &Sender<BinningEvent>) {
    match request {
        BinningRequest::GetBins { side, drawings } => {
            debug!(%side, drawings = drawings.len(), "merging drawings");
            let refs: Vec<&PersonaDrawing> = drawings.iter().collect();
            let mut sink = |event: ProgressEvent| {
                let _ = events.send(BinningEvent::Progress { side, event });
            };
            let bins = merge_drawings(&refs, &mut sink);
            let _ = events.send(BinningEvent::Bins { side, bins });
        }
    }
}

pub struct BinningWorker {
    requests: Option<Sender<BinningRequest>>,
    events: Receiver<BinningEvent>,
    handle: Option<JoinHandle<()>>,
}

impl BinningWorker {
    pub fn spawn() -> Result<Self> {
        let (req_tx, req_rx) = mpsc::channel::<BinningRequest>();
        let (ev_tx, ev_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("binning-worker".into())
            .spawn(move || {
                for request in req_rx {
                    handle_binning(request, &ev_tx);
                }
                debug!("binning worker stopped");
            })?;
        Ok(Self {
            requests: Some(req_tx),
            events: ev_rx,
            handle: Some(handle),
        })
    }

    /// Queue the drawings of one side for merging.
    pub fn request_bins(&self, side: AnatomicalSide, drawings: Vec<PersonaDrawing>) -> Result<()> {
        send(&self.requests, BinningRequest::GetBins { side, drawings }, "binning")
    }

    /// Next event, blocking. `None` once the worker is gone.
    pub fn recv(&self) -> Option<BinningEvent> {
        self.events.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<BinningEvent> {
        recv_timeout(&self.events, timeout)
    }

    /// Block until the bins of `side` arrive, passing earlier events to
    /// `on_event`.
    pub fn wait_for_bins(
        &self,
        side: AnatomicalSide,
        mut on_event: impl FnMut(&BinningEvent),
    ) -> Result<Vec<PixelBin>> {
        loop {
            match self.recv() {
                Some(BinningEvent::Bins { side: s, bins }) if s == side => return Ok(bins),
                Some(event) => on_event(&event),
                None => return Err(Error::WorkerStopped("binning")),
            }
        }
    }
}

impl Drop for BinningWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("binning worker panicked");
            }
        }
    }
}

// ============================================================================
// Export worker
// ============================================================================

pub enum ExportRequest {
    /// Archive the pixel maps of a survey into `sink`.
    PixelMapsZip {
        survey: Survey,
        sink: Box<dyn ArchiveSink>,
    },
    /// Compute drawn areas for a list of participants.
    Areas { participants: Vec<ParticipantData> },
}

pub enum ExportEvent {
    Progress(ProgressEvent),
    /// The archive was delivered; the sink is handed back.
    PixelMapsDone {
        summary: ExportSummary,
        sink: Box<dyn ArchiveSink>,
    },
    AreasDone(Vec<ParticipantAreas>),
    Failed { phase: Phase, message: String },
}

impl fmt::Debug for ExportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportEvent::Progress(e) => f.debug_tuple("Progress").field(e).finish(),
            ExportEvent::PixelMapsDone { summary, .. } => f
                .debug_struct("PixelMapsDone")
                .field("summary", summary)
                .finish_non_exhaustive(),
            ExportEvent::AreasDone(areas) => f.debug_tuple("AreasDone").field(areas).finish(),
            ExportEvent::Failed { phase, message } => f
                .debug_struct("Failed")
                .field("phase", phase)
                .field("message", message)
                .finish(),
        }
    }
}

struct ExportContext {
    config: Config,
    provider: RgbaSurfaceProvider,
    events: Sender<ExportEvent>,
}

impl ExportContext {
    fn handle(&mut self, request: ExportRequest) {
        let events = self.events.clone();
        let mut sink = |e: ProgressEvent| {
            let _ = events.send(ExportEvent::Progress(e));
        };

        let outcome = match request {
            ExportRequest::PixelMapsZip { survey, sink: mut out } => {
                let mut job = ExportJob::new(self.config.export.clone());
                job.run(&survey, &mut self.provider, &mut out, &mut sink)
                    .map(|summary| ExportEvent::PixelMapsDone { summary, sink: out })
                    .map_err(|e| (Phase::PixelMapsZip, e))
            }
            ExportRequest::Areas { participants } => AreaJob::new(participants)
                .run(&mut self.provider, &mut sink)
                .map(ExportEvent::AreasDone)
                .map_err(|e| (Phase::Areas, e)),
        };

        let event = outcome.unwrap_or_else(|(phase, e)| {
            warn!(%phase, error = %e, "export worker job failed");
            ExportEvent::Failed {
                phase,
                message: e.to_string(),
            }
        });
        let _ = self.events.send(event);
    }
}

pub struct ExportWorker {
    requests: Option<Sender<ExportRequest>>,
    events: Receiver<ExportEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ExportWorker {
    pub fn spawn(config: Config) -> Result<Self> {
        let (req_tx, req_rx) = mpsc::channel::<ExportRequest>();
        let (ev_tx, ev_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("export-worker".into())
            .spawn(move || {
                let mut ctx = ExportContext {
                    provider: RgbaSurfaceProvider::new(config.surface.clone()),
                    config,
                    events: ev_tx,
                };
                for request in req_rx {
                    ctx.handle(request);
                }
                debug!("export worker stopped");
            })?;
        Ok(Self {
            requests: Some(req_tx),
            events: ev_rx,
            handle: Some(handle),
        })
    }

    pub fn request_archive(&self, survey: Survey, sink: Box<dyn ArchiveSink>) -> Result<()> {
        send(&self.requests, ExportRequest::PixelMapsZip { survey, sink }, "export")
    }

    pub fn request_areas(&self, participants: Vec<ParticipantData>) -> Result<()> {
        send(&self.requests, ExportRequest::Areas { participants }, "export")
    }

    pub fn recv(&self) -> Option<ExportEvent> {
        self.events.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ExportEvent> {
        recv_timeout(&self.events, timeout)
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("export worker panicked");
            }
        }
    }
}

fn send<T>(requests: &Option<Sender<T>>, request: T, worker: &'static str) -> Result<()> {
    requests
        .as_ref()
        .ok_or(Error::WorkerStopped(worker))?
        .send(request)
        .map_err(|_| Error::WorkerStopped(worker))
}

fn recv_timeout<T>(events: &Receiver<T>, timeout: Duration) -> Option<T> {
    match events.recv_timeout(timeout) {
        Ok(event) => Some(event),
        Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
    }
}
