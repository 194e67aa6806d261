//! Main scanning engine implementation
//!
//! One probe task per address, admitted through a semaphore so that at most
//! `concurrency` probes are in flight. Every task races its probe against the
//! per-device timeout and the scan's cancellation token, and hands a found
//! device to a capacity-1 channel so a slow consumer throttles the producers.

use crate::config::ScanConfig;
use crate::device::{Device, DeviceClient, DeviceProbe};
use crate::error::ScanError;
use crate::scanner::{DeviceStream, ScanCounters, ScanSummary};
use crate::utils::target_parser::{self, AddressRange};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// Main scanning engine
pub struct ScanEngine {
    config: ScanConfig,
    probe: Arc<dyn DeviceProbe>,
}

impl ScanEngine {
    /// Create a scan engine probing over HTTP on `config.port`
    pub fn new(config: ScanConfig) -> crate::Result<Self> {
        let client = DeviceClient::new(config.port)?;
        Self::with_probe(config, Arc::new(client))
    }

    /// Create a scan engine using a custom prober
    pub fn with_probe(config: ScanConfig, probe: Arc<dyn DeviceProbe>) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config, probe })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start a scan of `config.target`.
    ///
    /// Fails up front if the target cannot be resolved; no probe is started
    /// in that case. Otherwise returns the stream of identified devices.
    /// Cancelling `cancel` (or reaching `config.deadline`) stops scheduling
    /// new addresses and aborts the probes in flight.
    pub async fn scan(&self, cancel: CancellationToken) -> crate::Result<DeviceStream> {
        let range = target_parser::resolve(&self.config.target)?;
        let concurrency = self.config.concurrency.min(Semaphore::MAX_PERMITS);

        log::info!(
            "Scanning {} ({} addresses, up to {} concurrent probes)",
            range,
            range.len(),
            concurrency
        );

        // the deadline must not cancel the caller's token
        let cancel = cancel.child_token();
        let deadline = self
            .config
            .deadline_duration()
            .map(|deadline| spawn_deadline(deadline, cancel.clone()));

        let (tx, rx) = mpsc::channel(1);
        let scheduler = Scheduler {
            range,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            task: ProbeTask {
                probe: self.probe.clone(),
                timeout: self.config.timeout_duration(),
                verbose: self.config.verbose,
                cancel,
                counters: Arc::new(ScanCounters::default()),
            },
        };

        let handle = tokio::spawn(async move {
            let summary = scheduler.run(tx).await;
            if let Some(deadline) = deadline {
                deadline.abort();
            }
            summary
        });

        Ok(DeviceStream::new(rx, handle))
    }
}

/// Cancel `cancel` once `deadline` has passed
fn spawn_deadline(deadline: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(deadline) => {
                log::info!("Scan deadline of {:?} reached", deadline);
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}

struct Scheduler {
    range: AddressRange,
    semaphore: Arc<Semaphore>,
    task: ProbeTask,
}

impl Scheduler {
    async fn run(self, tx: mpsc::Sender<Device>) -> ScanSummary {
        let start_time = Instant::now();
        let mut tasks = JoinSet::new();
        let mut stopped_early = false;

        for addr in self.range.iter() {
            let permit = tokio::select! {
                biased;
                _ = self.task.cancel.cancelled() => {
                    log::debug!("Scan cancelled before {}, not scheduling the rest", addr);
                    stopped_early = true;
                    break;
                }
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        log::error!("Admission limiter failed: {}", e);
                        break;
                    }
                },
            };

            self.task.counters.record_scheduled();
            tasks.spawn(self.task.clone().run(addr, tx.clone(), permit));

            // reap finished tasks so a large range does not pile up handles
            while let Some(result) = tasks.try_join_next() {
                log_join_error(result);
            }
        }

        // the stream closes once the last task drops its sender
        drop(tx);
        while let Some(result) = tasks.join_next().await {
            log_join_error(result);
        }

        let mut summary = ScanSummary {
            target: self.range.to_string(),
            total_addresses: self.range.len(),
            // a token firing after the last probe finished changes nothing
            cancelled: stopped_early || self.task.counters.interrupted(),
            duration: start_time.elapsed(),
            ..Default::default()
        };
        self.task.counters.fill(&mut summary);

        log::info!(
            "Scan of {} finished in {:?}: {} probed, {} found, {} ignored, {} reported{}",
            summary.target,
            summary.duration,
            summary.scheduled,
            summary.found,
            summary.ignored,
            summary.reported,
            if summary.cancelled { " (cancelled)" } else { "" }
        );

        summary
    }
}

fn log_join_error(result: Result<(), JoinError>) {
    if let Err(e) = result {
        log::error!("Probe task failed: {}", e);
    }
}

/// Everything a single probe task needs
#[derive(Clone)]
struct ProbeTask {
    probe: Arc<dyn DeviceProbe>,
    timeout: Duration,
    verbose: bool,
    cancel: CancellationToken,
    counters: Arc<ScanCounters>,
}

impl ProbeTask {
    /// Probe one address. The permit is held until the task ends.
    async fn run(self, addr: IpAddr, tx: mpsc::Sender<Device>, _permit: OwnedSemaphorePermit) {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScanError::Cancelled),
            result = timeout(self.timeout, self.probe.identify(addr)) => {
                result.unwrap_or_else(|elapsed| Err(elapsed.into()))
            }
        };

        match result {
            Ok(device) => {
                log::debug!(
                    "{} is {} ({})",
                    addr,
                    device.product_name,
                    device.system_mode
                );
                tokio::select! {
                    biased;
                    sent = tx.send(device) => {
                        if sent.is_ok() {
                            self.counters.record_found();
                        }
                    }
                    _ = self.cancel.cancelled() => {
                        self.counters.record_interrupted();
                        log::debug!("Dropping device at {} found after cancellation", addr);
                    }
                }
            }
            Err(e) => {
                if matches!(e, ScanError::Cancelled) {
                    self.counters.record_interrupted();
                }
                self.counters.record_failure(&e);
                if e.is_ignorable() || !self.verbose {
                    log::debug!("{}: {}", addr, e);
                } else {
                    log::warn!("error cannot be ignored: address={} error={}", addr, e);
                }
            }
        }
    }
}
