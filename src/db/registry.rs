//! In-memory project registry.

use super::models::{Project, DEFAULT_CATEGORY};

/// Ordered list of monitored projects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    projects: Vec<Project>,
}

impl Registry {
    pub fn from_projects(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Next id: one past the largest numeric id, starting at "1".
    pub fn next_id(&self) -> String {
        self.projects
            .iter()
            .filter_map(|p| p.id.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1)
            .to_string()
    }

    /// Insert a new active project and return it.
    ///
    /// `url` gets an `https://` prefix when it carries no http(s) scheme.
    pub fn add(&mut self, name: &str, url: &str, category: Option<&str>) -> &Project {
        let category = match category.map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => DEFAULT_CATEGORY.to_string(),
        };
        let project = Project::new(self.next_id(), name.to_string(), normalize_url(url), category);
        self.projects.push(project);
        &self.projects[self.projects.len() - 1]
    }

    /// Remove a project by id. Returns the removed project, if any.
    pub fn remove(&mut self, id: &str) -> Option<Project> {
        let idx = self.projects.iter().position(|p| p.id == id)?;
        Some(self.projects.remove(idx))
    }

    /// Drop every project and return how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.projects.len();
        self.projects.clear();
        count
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    /// Flip `active` and return the new value.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let project = self.get_mut(id)?;
        project.active = !project.active;
        Some(project.active)
    }

    /// Set every project's `active` flag; returns the number of projects.
    pub fn set_all_active(&mut self, active: bool) -> usize {
        for project in &mut self.projects {
            project.active = active;
        }
        self.projects.len()
    }

    /// Active projects in registry order.
    pub fn active(&self) -> Vec<Project> {
        self.projects.iter().filter(|p| p.active).cloned().collect()
    }
}

/// Prefix `https://` unless the url already names an http(s) scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}
