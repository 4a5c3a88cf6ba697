//! Background bar extraction with single-flight supersession.
//!
//! Extraction jobs run on tokio's blocking pool and report back over a
//! channel that the interactive thread drains once per frame. Every job gets
//! a ticket; only the result carrying the most recent ticket is delivered,
//! so a slow job computed for an old geometry can never paint over a newer
//! one. Superseded jobs are not cancelled, their results are just dropped.
//!
//! Without a tokio runtime the coordinator extracts synchronously at submit
//! time and delivers through the same channel.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::bars::{extract_bars, BarLayout, BarSequence, ExtractOptions};
use super::geometry::Geometry;
use super::host::HostEvents;

/// Immutable inputs for one extraction pass.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub samples: Arc<[f32]>,
    pub geometry: Geometry,
    pub layout: BarLayout,
    pub options: ExtractOptions,
}

impl ExtractionJob {
    pub fn run(&self) -> BarSequence {
        extract_bars(
            &self.samples,
            self.geometry.pixel_width,
            self.geometry.pixel_height,
            self.layout,
            self.options,
        )
    }
}

/// Why a job was submitted; decides which processing flag it raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOrigin {
    Resize,
    Initial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobTicket(u64);

struct Completed {
    ticket: JobTicket,
    bars: BarSequence,
}

pub struct OffloadCoordinator {
    runtime: Option<Handle>,
    tx: mpsc::UnboundedSender<Completed>,
    rx: mpsc::UnboundedReceiver<Completed>,
    issued: u64,
    latest: Option<JobTicket>,
    delivered: bool,
    resize_flag: bool,
    complete_flag: bool,
}

impl Default for OffloadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl OffloadCoordinator {
    /// Binds to the current tokio runtime, or falls back to synchronous
    /// extraction when called outside of one.
    pub fn new() -> Self {
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            tracing::warn!("No async runtime available; bar extraction runs on the calling thread");
        }
        Self::with_runtime(runtime)
    }

    /// Always extracts on the calling thread.
    pub fn inline() -> Self {
        Self::with_runtime(None)
    }

    fn with_runtime(runtime: Option<Handle>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            tx,
            rx,
            issued: 0,
            latest: None,
            delivered: false,
            resize_flag: false,
            complete_flag: false,
        }
    }

    pub fn is_background(&self) -> bool {
        self.runtime.is_some()
    }

    /// The latest submitted job has not been delivered yet.
    pub fn is_pending(&self) -> bool {
        self.latest.is_some() && !self.delivered
    }

    /// Queues `job`, superseding any job still in flight.
    pub fn submit(
        &mut self,
        job: ExtractionJob,
        origin: JobOrigin,
        events: &mut dyn HostEvents,
    ) -> JobTicket {
        let ticket = self.register(origin, events);
        tracing::debug!(
            "Extraction {:?} ({:?}): {} samples into {}x{}",
            ticket,
            origin,
            job.samples.len(),
            job.geometry.pixel_width,
            job.geometry.pixel_height
        );

        let tx = self.tx.clone();
        match &self.runtime {
            Some(handle) => {
                handle.spawn_blocking(move || {
                    let bars = job.run();
                    if tx.send(Completed { ticket, bars }).is_err() {
                        tracing::trace!("Extraction {:?} finished after coordinator dropped", ticket);
                    }
                });
            }
            None => {
                let bars = job.run();
                // The receiver lives in `self`, so this cannot fail.
                let _ = tx.send(Completed { ticket, bars });
            }
        }
        ticket
    }

    fn register(&mut self, origin: JobOrigin, events: &mut dyn HostEvents) -> JobTicket {
        self.issued += 1;
        let ticket = JobTicket(self.issued);
        if self.is_pending() {
            tracing::debug!("Extraction {:?} supersedes {:?}", ticket, self.latest);
        }
        self.latest = Some(ticket);
        self.delivered = false;

        match origin {
            JobOrigin::Resize => {
                self.resize_flag = true;
                events.set_processing_on_resize(true);
            }
            JobOrigin::Initial => {
                self.complete_flag = true;
                events.set_processing_audio_on_complete(true);
            }
        }
        ticket
    }

    /// Drains finished jobs without blocking. Returns the latest job's
    /// bars once they arrive; everything else is discarded.
    pub fn poll(&mut self, events: &mut dyn HostEvents) -> Option<Arc<BarSequence>> {
        let mut delivered = None;
        while let Ok(done) = self.rx.try_recv() {
            if let Some(bars) = self.accept(done) {
                delivered = Some(bars);
            }
        }
        if delivered.is_some() {
            self.lower_flags(events);
        }
        delivered
    }

    fn accept(&mut self, done: Completed) -> Option<Arc<BarSequence>> {
        if Some(done.ticket) == self.latest && !self.delivered {
            self.delivered = true;
            tracing::debug!("Extraction {:?} delivered {} bars", done.ticket, done.bars.len());
            Some(Arc::new(done.bars))
        } else {
            tracing::debug!("Discarding superseded extraction {:?}", done.ticket);
            None
        }
    }

    fn lower_flags(&mut self, events: &mut dyn HostEvents) {
        if std::mem::take(&mut self.resize_flag) {
            events.set_processing_on_resize(false);
        }
        if std::mem::take(&mut self.complete_flag) {
            events.set_processing_audio_on_complete(false);
        }
    }
}
