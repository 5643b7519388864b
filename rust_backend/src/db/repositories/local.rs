//! In-memory local repository implementation.
//!
//! This module provides a local implementation of [`ProjectRepository`]
//! suitable for unit testing, benchmarks and night simulations. Projects are
//! kept per profile in a `BTreeMap`, so loads come back in a stable order.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use log::{debug, warn};

use crate::db::repository::*;
use crate::models::{ExposurePlan, ExposurePlanId, Project, ProjectId, ProjectState, TargetId};
use crate::selection::SelectorKind;

/// In-memory local repository.
///
/// # Example
/// ```
/// use target_scheduler::db::repositories::LocalRepository;
/// use target_scheduler::db::repository::ProjectRepository;
/// use target_scheduler::models::{Project, ProjectPolicy};
///
/// let repo = LocalRepository::new();
/// repo.store_project("observatory", Project::new(1, "Veil", ProjectPolicy::default(), Vec::new()));
///
/// let projects = repo.load_active_projects("observatory").unwrap();
/// assert_eq!(projects.len(), 1);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    projects: BTreeMap<ProjectId, Project>,

    // ID counter for projects stored without an id
    next_project_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            projects: BTreeMap::new(),
            next_project_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Add a project to the repository under `profile_id`.
    ///
    /// # Arguments
    /// * `profile_id` - Profile the project belongs to
    /// * `project` - Project to add; an id of zero is replaced by a fresh one
    ///
    /// # Returns
    /// The ID the project is stored under
    pub fn store_project(&self, profile_id: &str, mut project: Project) -> ProjectId {
        let mut data = self.data.write().unwrap();
        if project.id.value() == 0 {
            project.id = ProjectId(data.next_project_id);
        }
        data.next_project_id = data.next_project_id.max(project.id.value() + 1);
        project.profile_id = profile_id.to_string();

        let project_id = project.id;
        data.projects.insert(project_id, project);
        project_id
    }

    /// Import a JSON array of projects for a profile.
    ///
    /// # Returns
    /// The number of projects imported, or a validation error naming the
    /// offending path
    pub fn import_json(&self, profile_id: &str, json: &str) -> RepositoryResult<usize> {
        self.check_health()?;
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        let projects: Vec<Project> = serde_path_to_error::deserialize(deserializer)?;
        let count = projects.len();
        for project in projects {
            self.store_project(profile_id, project);
        }
        debug!("LocalRepository: imported {} projects for profile '{}'", count, profile_id);
        Ok(count)
    }

    /// Record one acquired frame against an exposure plan.
    pub fn record_exposure(&self, exposure_plan_id: ExposurePlanId, accepted: bool) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let plan = data
            .projects
            .values_mut()
            .flat_map(|p| p.targets.iter_mut())
            .flat_map(|t| t.exposure_plans.iter_mut())
            .find(|e| e.id == exposure_plan_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Exposure plan {} not found", exposure_plan_id)))?;

        plan.acquired += 1;
        if accepted {
            plan.accepted += 1;
        }
        Ok(())
    }

    /// Replace the stored state of a project.
    pub fn set_project_state(&self, project_id: ProjectId, state: ProjectState) -> RepositoryResult<()> {
        let mut data = self.data.write().unwrap();
        let project = data
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Project {} not found", project_id)))?;
        project.state = state;
        Ok(())
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        let mut data = self.data.write().unwrap();
        data.is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write().unwrap();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    /// Get the number of projects stored.
    pub fn project_count(&self) -> usize {
        self.data.read().unwrap().projects.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        let data = self.data.read().unwrap();
        if !data.is_healthy {
            return Err(RepositoryError::ConnectionError(
                "Database is not healthy".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRepository for LocalRepository {
    fn health_check(&self) -> RepositoryResult<bool> {
        let data = self.data.read().unwrap();
        Ok(data.is_healthy)
    }

    fn load_active_projects(&self, profile_id: &str) -> RepositoryResult<Vec<Project>> {
        self.check_health()?;
        let data = self.data.read().unwrap();

        let mut projects: Vec<Project> = data
            .projects
            .values()
            .filter(|p| p.profile_id == profile_id && p.state == ProjectState::Active)
            .cloned()
            .collect();

        for project in &mut projects {
            project.targets.retain(|t| t.enabled);
            for target in &mut project.targets {
                if let SelectorKind::OverrideOrder(order) = &mut target.exposure_selector {
                    let plan_count = target.exposure_plans.len();
                    if order.is_stale(plan_count) {
                        warn!(
                            "LocalRepository: override order of target '{}' was authored for {:?} exposure plan(s) but the target has {}, clearing it",
                            target.name,
                            order.plan_count(),
                            plan_count
                        );
                        order.clear();
                    }
                }
            }
        }

        Ok(projects)
    }

    fn reload_exposure_plans(&self, target_id: TargetId) -> RepositoryResult<Vec<ExposurePlan>> {
        self.check_health()?;
        let data = self.data.read().unwrap();
        data.projects
            .values()
            .flat_map(|p| p.targets.iter())
            .find(|t| t.id == target_id)
            .map(|t| t.exposure_plans.clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("Target {} not found", target_id)))
    }

    fn save_selector_state(&self, target_id: TargetId, selector: &SelectorKind) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write().unwrap();
        let target = data
            .projects
            .values_mut()
            .flat_map(|p| p.targets.iter_mut())
            .find(|t| t.id == target_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Target {} not found", target_id)))?;
        target.exposure_selector = selector.clone();
        Ok(())
    }
}
