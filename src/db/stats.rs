//! Per-project statistics table.

use std::collections::BTreeMap;

use super::models::{Project, ProjectStats};

/// Mapping from project id to its counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsTable {
    entries: BTreeMap<String, ProjectStats>,
}

impl StatsTable {
    pub fn from_map(entries: BTreeMap<String, ProjectStats>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &BTreeMap<String, ProjectStats> {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ProjectStats> {
        self.entries.get(id)
    }

    /// Insert zeroed counters for a new project.
    pub fn insert_new(&mut self, id: &str) {
        self.entries.insert(id.to_string(), ProjectStats::default());
    }

    pub fn remove(&mut self, id: &str) -> Option<ProjectStats> {
        self.entries.remove(id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Count one outcome for `id`. Returns false if the id has no record.
    pub fn record(&mut self, id: &str, status: &str, success: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(stats) => {
                stats.record(status, success);
                true
            }
            None => false,
        }
    }

    /// Make the table match `projects` one-to-one.
    ///
    /// Missing records are created, orphans are dropped and counters are
    /// normalized. Returns true if anything changed.
    pub fn reconcile(&mut self, projects: &[Project]) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|id, _| projects.iter().any(|p| &p.id == id));
        let mut changed = self.entries.len() != before;

        for project in projects {
            if !self.entries.contains_key(&project.id) {
                let stats = ProjectStats {
                    last_status: project.status.clone(),
                    ..Default::default()
                };
                self.entries.insert(project.id.clone(), stats);
                changed = true;
            }
        }

        for stats in self.entries.values_mut() {
            changed |= stats.normalize();
        }

        changed
    }
}
