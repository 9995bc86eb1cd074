//! Periodic Liveness Monitor
//!
//! Probes every known peer once per cycle and feeds the outcomes into the
//! registry's state machine:
//!
//! ```text
//! Healthy --fail--> Suspect --fail x N--> Dead
//! Suspect | Dead --success--> Healthy
//! ```
//!
//! Probes of one cycle run concurrently, each bounded by the probe timeout, so
//! a slow peer cannot hold up the others. After the probes, dead peers past the
//! grace period are pruned.

use crate::config::HealthConfig;
use crate::error::OverlayError;
use crate::membership::registry::PeerRegistry;
use crate::membership::types::PeerStatus;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use super::probe::LivenessProbe;

#[derive(Debug, Clone)]
pub struct HealthSettings {
    pub interval: Duration,
    pub probe_timeout: Duration,
    pub failure_threshold: u32,
    pub dead_grace: Duration,
}

impl From<&HealthConfig> for HealthSettings {
    fn from(config: &HealthConfig) -> Self {
        Self {
            interval: config.interval(),
            probe_timeout: config.probe_timeout(),
            failure_threshold: config.failure_threshold,
            dead_grace: config.dead_grace(),
        }
    }
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self::from(&HealthConfig::default())
    }
}

/// Summary of one probe cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub probed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub newly_dead: Vec<String>,
    pub recovered: Vec<String>,
    pub pruned: Vec<String>,
}

struct RunningLoop {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct HealthMonitor {
    registry: Arc<PeerRegistry>,
    probe: Arc<dyn LivenessProbe>,
    settings: HealthSettings,
    running: Mutex<Option<RunningLoop>>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<PeerRegistry>,
        probe: Arc<dyn LivenessProbe>,
        settings: HealthSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            probe,
            settings,
            running: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &HealthSettings {
        &self.settings
    }

    /// Spawns the background loop. Returns `false` if it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.is_some() {
            return false;
        }

        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(monitor.settings.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let report = monitor.run_cycle().await;
                        tracing::debug!(
                            "Health cycle: {} probed, {} ok, {} failed, {} pruned",
                            report.probed,
                            report.succeeded,
                            report.failed,
                            report.pruned.len()
                        );
                    }
                }
            }

            tracing::info!("Health monitor stopped");
        });

        tracing::info!(
            "Health monitor started with {:?} interval (threshold {})",
            self.settings.interval,
            self.settings.failure_threshold
        );
        *running = Some(RunningLoop { shutdown, handle });
        true
    }

    /// Stops the background loop and waits for an in-flight cycle to finish.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(RunningLoop { shutdown, handle }) = running {
            let _ = shutdown.send(());
            if let Err(e) = handle.await {
                tracing::error!("Health monitor task ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Runs one probe cycle over every peer currently known.
    pub async fn run_cycle(&self) -> CycleReport {
        let targets = self.registry.list(None);
        let mut report = CycleReport {
            probed: targets.len(),
            ..CycleReport::default()
        };

        let mut probes = JoinSet::new();
        for record in targets {
            let probe = self.probe.clone();
            let timeout = self.settings.probe_timeout;
            probes.spawn(async move {
                let alive = probe_with_timeout(probe.as_ref(), &record.url, timeout).await;
                (record.url, alive)
            });
        }

        while let Some(joined) = probes.join_next().await {
            let (url, alive) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Probe task failed: {}", e);
                    continue;
                }
            };

            if alive {
                report.succeeded += 1;
                if let Some(change) = self.registry.record_success(&url)
                    && change.changed()
                {
                    tracing::info!("Peer {} is healthy again (was {:?})", url, change.previous);
                    report.recovered.push(url);
                }
            } else {
                report.failed += 1;
                if let Some(change) = self
                    .registry
                    .record_failure(&url, self.settings.failure_threshold)
                    && change.changed()
                {
                    match change.record.status {
                        PeerStatus::Dead => {
                            tracing::warn!(
                                "Peer {} declared DEAD after {} failed probes",
                                url,
                                change.record.consecutive_failures
                            );
                            report.newly_dead.push(url);
                        }
                        status => {
                            tracing::warn!("Peer {} is now {:?}", url, status);
                        }
                    }
                }
            }
        }

        report.pruned = self.registry.prune(self.settings.dead_grace);
        report
    }

    /// Probes one peer right away. A success is applied to the registry; a
    /// failure is left for the periodic cycle to count.
    pub async fn probe_now(&self, url: &str) -> bool {
        let alive = probe_with_timeout(self.probe.as_ref(), url, self.settings.probe_timeout).await;
        if alive {
            self.registry.record_success(url);
        }
        alive
    }
}

async fn probe_with_timeout(probe: &dyn LivenessProbe, url: &str, timeout: Duration) -> bool {
    let outcome = match tokio::time::timeout(timeout, probe.probe(url)).await {
        Ok(result) => result,
        Err(_) => Err(OverlayError::unreachable(url, "probe timed out")),
    };

    match outcome {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Probe failed: {}", e);
            false
        }
    }
}
