//! JSON-file backed project store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use chrono::Utc;

use super::json_file::JsonFile;
use super::models::*;
use super::registry::Registry;
use super::stats::StatsTable;

/// Store error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("project {0} not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

struct State {
    registry: Registry,
    stats: StatsTable,
}

/// Thread-safe store holding the registry and its stats.
///
/// Every mutation rewrites the affected file(s) before returning. Write
/// failures are logged; the in-memory state stays authoritative.
#[derive(Clone)]
pub struct Store {
    state: Arc<Mutex<State>>,
    projects_file: JsonFile,
    stats_file: JsonFile,
}

impl Store {
    /// Open the store, loading whatever state the two files hold.
    ///
    /// Missing or unparsable files are treated as empty. The stats table is
    /// reconciled with the project list, but the repair is only written back
    /// when both files loaded cleanly; an unreadable file is left on disk
    /// until the next mutation.
    pub fn open(projects_file: JsonFile, stats_file: JsonFile) -> Self {
        let (projects, projects_ok) = projects_file.load_tracked::<Vec<Project>>();
        let (stats, stats_ok) = stats_file.load_tracked::<BTreeMap<String, ProjectStats>>();

        let registry = Registry::from_projects(projects);
        let mut stats = StatsTable::from_map(stats);
        let repaired = stats.reconcile(registry.projects());

        let store = Self {
            state: Arc::new(Mutex::new(State { registry, stats })),
            projects_file,
            stats_file,
        };

        if repaired {
            if projects_ok && stats_ok {
                tracing::info!("Stats table reconciled with project list");
                let state = store.lock();
                store.persist_both(&state);
            } else {
                tracing::warn!("Stats table reconciled in memory only; a state file failed to load");
            }
        }

        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist_projects(&self, state: &State) {
        if let Err(e) = self.projects_file.save(state.registry.projects()) {
            tracing::error!(
                "Failed to save projects to {}: {}",
                self.projects_file.path().display(),
                e
            );
        }
    }

    fn persist_stats(&self, state: &State) {
        if let Err(e) = self.stats_file.save(state.stats.entries()) {
            tracing::error!(
                "Failed to save stats to {}: {}",
                self.stats_file.path().display(),
                e
            );
        }
    }

    fn persist_both(&self, state: &State) {
        self.persist_projects(state);
        self.persist_stats(state);
    }

    // --- Project CRUD ---

    /// Add a project and return its id.
    pub fn add_project(
        &self,
        name: &str,
        url: &str,
        category: Option<&str>,
    ) -> Result<String, DbError> {
        let name = name.trim();
        let url = url.trim();
        if name.is_empty() {
            return Err(DbError::InvalidInput("name is empty".to_string()));
        }
        if url.is_empty() {
            return Err(DbError::InvalidInput("url is empty".to_string()));
        }

        let mut state = self.lock();
        let project = state.registry.add(name, url, category);
        let id = project.id.clone();
        tracing::info!("Added project {} ({}) as #{}", project.name, project.url, id);
        state.stats.insert_new(&id);
        self.persist_both(&state);
        Ok(id)
    }

    /// Remove a project and its stats. Unknown ids are ignored.
    pub fn remove_project(&self, id: &str) -> bool {
        let mut state = self.lock();
        let removed = state.registry.remove(id);
        state.stats.remove(id);
        self.persist_both(&state);

        if let Some(project) = &removed {
            tracing::info!("Removed project {} (#{})", project.name, id);
        }
        removed.is_some()
    }

    /// Remove every project and all stats. Returns how many projects were dropped.
    pub fn remove_all(&self) -> usize {
        let mut state = self.lock();
        let count = state.registry.clear();
        state.stats.clear();
        self.persist_both(&state);
        tracing::info!("Removed all {} projects", count);
        count
    }

    /// Flip a project's `active` flag.
    pub fn toggle_project(&self, id: &str) -> Result<bool, DbError> {
        let mut state = self.lock();
        let active = state
            .registry
            .toggle(id)
            .ok_or_else(|| DbError::NotFound(id.to_string()))?;
        self.persist_projects(&state);
        Ok(active)
    }

    /// Set `active` on every project. Returns the number of projects.
    pub fn set_all_active(&self, active: bool) -> usize {
        let mut state = self.lock();
        let count = state.registry.set_all_active(active);
        self.persist_projects(&state);
        count
    }

    /// Get a project by id.
    pub fn get_project(&self, id: &str) -> Option<Project> {
        self.lock().registry.get(id).cloned()
    }

    /// All projects in registry order.
    pub fn get_projects(&self) -> Vec<Project> {
        self.lock().registry.projects().to_vec()
    }

    /// Active projects in registry order.
    pub fn active_projects(&self) -> Vec<Project> {
        self.lock().registry.active()
    }

    // --- Stats ---

    pub fn get_stats(&self, id: &str) -> Option<ProjectStats> {
        self.lock().stats.get(id).cloned()
    }

    pub fn get_all_stats(&self) -> BTreeMap<String, ProjectStats> {
        self.lock().stats.entries().clone()
    }

    /// Record one probe outcome for a project.
    ///
    /// Returns false (and changes nothing) if the project no longer exists.
    pub fn record_outcome(&self, id: &str, status: &str, success: bool) -> bool {
        let mut state = self.lock();
        let Some(project) = state.registry.get_mut(id) else {
            tracing::debug!("Dropping outcome {} for removed project #{}", status, id);
            return false;
        };
        project.status = status.to_string();
        project.last_ping = Some(Utc::now());

        if !state.stats.record(id, status, success) {
            state.stats.insert_new(id);
            state.stats.record(id, status, success);
        }
        self.persist_both(&state);
        true
    }
}
