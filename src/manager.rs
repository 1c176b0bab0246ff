//! Composition root: the operations a front end calls.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::db::{DbError, JsonFile, Project, ProjectStats, Store};
use crate::probe::{
    HttpCheck, HttpSettings, ProbeError, ProbeStatus, Prober, ReqwestCheck, Resolver,
    SystemResolver,
};
use crate::scheduler::{ScheduleSettings, Scheduler, SweepSummary};

/// Snapshot for status screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub total: usize,
    pub active: usize,
    pub running: usize,
    pub monitoring: bool,
}

/// Owns the store, the prober and the scheduler.
///
/// Build one at startup and share it (e.g. behind an `Arc`) with every handler.
pub struct ProjectManager {
    store: Store,
    prober: Prober,
    scheduler: Scheduler,
    manual_spacing: Duration,
}

impl ProjectManager {
    /// Build a manager with the system resolver and a reqwest client.
    pub fn new(config: &MonitorConfig) -> Result<Self, ProbeError> {
        let http = ReqwestCheck::new(&HttpSettings {
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            accept_invalid_certs: config.accept_invalid_certs,
        })?;
        Ok(Self::with_network(
            config,
            Arc::new(SystemResolver),
            Arc::new(http),
        ))
    }

    /// Build a manager with custom network implementations.
    pub fn with_network(
        config: &MonitorConfig,
        resolver: Arc<dyn Resolver>,
        http: Arc<dyn HttpCheck>,
    ) -> Self {
        let store = Store::open(
            JsonFile::new(config.projects_path()),
            JsonFile::new(config.stats_path()),
        );
        let prober = Prober::new(store.clone(), resolver, http, config.dns_timeout);
        let scheduler = Scheduler::new(
            store.clone(),
            prober.clone(),
            ScheduleSettings {
                sweep_interval: config.sweep_interval,
                probe_spacing: config.probe_spacing,
            },
        );

        Self {
            store,
            prober,
            scheduler,
            manual_spacing: config.manual_spacing,
        }
    }

    pub fn add_project(
        &self,
        name: &str,
        url: &str,
        category: Option<&str>,
    ) -> Result<String, DbError> {
        self.store.add_project(name, url, category)
    }

    pub fn remove_project(&self, id: &str) -> bool {
        self.store.remove_project(id)
    }

    pub fn remove_all_projects(&self) -> usize {
        self.store.remove_all()
    }

    pub fn toggle_project(&self, id: &str) -> Result<bool, DbError> {
        self.store.toggle_project(id)
    }

    pub fn activate_all(&self) -> usize {
        self.store.set_all_active(true)
    }

    pub fn deactivate_all(&self) -> usize {
        self.store.set_all_active(false)
    }

    pub fn get_project(&self, id: &str) -> Option<Project> {
        self.store.get_project(id)
    }

    pub fn list_projects(&self) -> Vec<Project> {
        self.store.get_projects()
    }

    pub fn get_stats(&self, id: &str) -> Option<ProjectStats> {
        self.store.get_stats(id)
    }

    pub fn list_stats(&self) -> BTreeMap<String, ProjectStats> {
        self.store.get_all_stats()
    }

    /// Probe one project now.
    ///
    /// `Ok(None)` means the project is paused or already being probed.
    pub async fn ping_now(&self, id: &str) -> Result<Option<ProbeStatus>, DbError> {
        let project = self
            .store
            .get_project(id)
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;
        Ok(self.prober.probe(&project).await)
    }

    /// Probe all active projects now, one after another.
    pub async fn ping_all_active_now(&self) -> SweepSummary {
        self.scheduler.ping_all_now(self.manual_spacing).await
    }

    pub fn start_monitoring(&self) -> bool {
        self.scheduler.start()
    }

    pub fn stop_monitoring(&self) -> bool {
        self.scheduler.stop()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn status_report(&self) -> StatusReport {
        let projects = self.store.get_projects();
        let running = ProbeStatus::Running.to_string();
        StatusReport {
            total: projects.len(),
            active: projects.iter().filter(|p| p.active).count(),
            running: projects.iter().filter(|p| p.status == running).count(),
            monitoring: self.is_running(),
        }
    }
}
