//! Scanner module containing the main scanning engine

pub mod engine;

use crate::device::Device;
use crate::error::ScanError;
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use engine::ScanEngine;

/// Final statistics of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Target range, as resolved
    pub target: String,

    /// Number of addresses in the target range
    pub total_addresses: u128,

    /// Addresses that were actually handed to a probe task
    pub scheduled: u64,

    /// Devices delivered to the stream
    pub found: u64,

    /// Failures classified as "nothing there"
    pub ignored: u64,

    /// Failures worth reporting (protocol errors and the like)
    pub reported: u64,

    /// Whether cancellation left addresses unscheduled or probes unfinished
    pub cancelled: bool,

    /// Total scan duration
    pub duration: Duration,
}

impl ScanSummary {
    /// Scan rate in addresses per second
    pub fn scan_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.scheduled as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Counters shared between the scheduler and its probe tasks
#[derive(Debug, Default)]
pub(crate) struct ScanCounters {
    scheduled: AtomicU64,
    found: AtomicU64,
    ignored: AtomicU64,
    reported: AtomicU64,
    interrupted: AtomicU64,
}

impl ScanCounters {
    pub(crate) fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_found(&self) {
        self.found.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, error: &ScanError) {
        if error.is_ignorable() {
            self.ignored.fetch_add(1, Ordering::Relaxed);
        } else {
            self.reported.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A probe was cut short by cancellation
    pub(crate) fn record_interrupted(&self) {
        self.interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed) > 0
    }

    pub(crate) fn fill(&self, summary: &mut ScanSummary) {
        summary.scheduled = self.scheduled.load(Ordering::Relaxed);
        summary.found = self.found.load(Ordering::Relaxed);
        summary.ignored = self.ignored.load(Ordering::Relaxed);
        summary.reported = self.reported.load(Ordering::Relaxed);
    }
}

/// Stream of identified devices, in completion order.
///
/// The stream ends once every scheduled probe has finished, or once the
/// scan was cancelled and the in-flight probes have wound down.
#[derive(Debug)]
pub struct DeviceStream {
    receiver: mpsc::Receiver<Device>,
    scheduler: JoinHandle<ScanSummary>,
}

impl DeviceStream {
    pub(crate) fn new(receiver: mpsc::Receiver<Device>, scheduler: JoinHandle<ScanSummary>) -> Self {
        Self {
            receiver,
            scheduler,
        }
    }

    /// Wait for the next device. `None` once the scan is over.
    pub async fn next(&mut self) -> Option<Device> {
        self.receiver.recv().await
    }

    /// Wait for the scan to end and return its statistics, whether or not it
    /// was cancelled. Devices not yet read are discarded.
    pub async fn wait(self) -> crate::Result<ScanSummary> {
        // let blocked producers observe the closed channel
        drop(self.receiver);
        Ok(self.scheduler.await?)
    }

    /// Like [`wait`](Self::wait), but a cancelled scan is an error.
    pub async fn finish(self) -> crate::Result<ScanSummary> {
        let summary = self.wait().await?;
        if summary.cancelled {
            return Err(ScanError::Cancelled);
        }
        Ok(summary)
    }

    /// Drain the stream, then finish the scan.
    pub async fn collect_all(mut self) -> crate::Result<(Vec<Device>, ScanSummary)> {
        let mut devices = Vec::new();
        while let Some(device) = self.next().await {
            devices.push(device);
        }
        let summary = self.finish().await?;
        Ok((devices, summary))
    }
}

impl Stream for DeviceStream {
    type Item = Device;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Device>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
