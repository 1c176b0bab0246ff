//! Scheduler module driving periodic sweeps over active projects.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db::Store;
use crate::probe::{ProbeStatus, Prober};

/// Timing of the sweep loop.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleSettings {
    /// Wait between two sweeps.
    pub sweep_interval: Duration,
    /// Wait between consecutive probes inside a sweep.
    pub probe_spacing: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            probe_spacing: Duration::from_secs(2),
        }
    }
}

/// Result of a manual ping-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepSummary {
    /// Projects that were actually probed.
    pub probed: usize,
    /// Projects whose status reads "Running" afterwards.
    pub running: usize,
}

struct Run {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// The background loop that sweeps all active projects through the prober.
pub struct Scheduler {
    store: Store,
    prober: Prober,
    settings: ScheduleSettings,
    run: Mutex<Option<Run>>,
}

impl Scheduler {
    pub fn new(store: Store, prober: Prober, settings: ScheduleSettings) -> Self {
        Self {
            store,
            prober,
            settings,
            run: Mutex::new(None),
        }
    }

    fn run_slot(&self) -> MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the sweep loop. Returns false if it was already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.run_slot();
        if slot.as_ref().is_some_and(|run| !run.task.is_finished()) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_sweep_loop(
            self.store.clone(),
            self.prober.clone(),
            self.settings,
            stop_rx,
        ));
        *slot = Some(Run { stop_tx, task });

        tracing::info!("Monitoring ON");
        true
    }

    /// Signal the sweep loop to stop. An in-flight probe is allowed to finish.
    ///
    /// Returns false if nothing was running.
    pub fn stop(&self) -> bool {
        let Some(run) = self.run_slot().take() else {
            return false;
        };
        let _ = run.stop_tx.send(true);
        tracing::info!("Monitoring OFF");
        true
    }

    pub fn is_running(&self) -> bool {
        self.run_slot()
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    /// Probe every active project once, sequentially, outside the cadence.
    pub async fn ping_all_now(&self, spacing: Duration) -> SweepSummary {
        let active = self.store.active_projects();
        let mut probed = 0;

        for (i, project) in active.iter().enumerate() {
            if i > 0 && !spacing.is_zero() {
                tokio::time::sleep(spacing).await;
            }
            if self.prober.probe(project).await.is_some() {
                probed += 1;
            }
        }

        let running = self
            .store
            .get_projects()
            .iter()
            .filter(|p| p.status == ProbeStatus::Running.to_string())
            .count();

        SweepSummary { probed, running }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(run) = self.run_slot().take() {
            let _ = run.stop_tx.send(true);
        }
    }
}

/// Sleep for `duration` unless a stop is signalled first. Returns false on stop.
async fn pause(duration: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    if *stop_rx.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => !*stop_rx.borrow(),
        // A closed channel means the scheduler is gone.
        changed = stop_rx.changed() => changed.is_ok() && !*stop_rx.borrow(),
    }
}

/// Run sweeps until stopped.
async fn run_sweep_loop(
    store: Store,
    prober: Prober,
    settings: ScheduleSettings,
    mut stop_rx: watch::Receiver<bool>,
) {
    tracing::debug!(
        "Sweep loop started (interval {:?}, spacing {:?})",
        settings.sweep_interval,
        settings.probe_spacing
    );

    'sweeps: loop {
        if *stop_rx.borrow() {
            break;
        }

        // Fresh snapshot each cycle so toggles apply from the next sweep on.
        let active = store.active_projects();
        if !active.is_empty() {
            tracing::debug!("Sweeping {} active projects", active.len());
        }

        for (i, project) in active.iter().enumerate() {
            if i > 0 && !pause(settings.probe_spacing, &mut stop_rx).await {
                break 'sweeps;
            }
            if *stop_rx.borrow() {
                break 'sweeps;
            }
            prober.probe(project).await;
        }

        if !pause(settings.sweep_interval, &mut stop_rx).await {
            break;
        }
    }

    tracing::debug!("Sweep loop exited");
}
