//! Data-access contract consumed by the planner.
//!
//! The planner never writes entities back itself. It asks the repository for
//! a fresh project tree at the start of a cycle and for refreshed exposure
//! counts while a target is continuing; everything else (recording frames,
//! grading, editing) happens outside the planning core.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations

pub mod error;

pub use error::{RepositoryError, RepositoryResult};

use crate::models::{ExposurePlan, Project, TargetId};
use crate::selection::SelectorKind;

pub trait ProjectRepository {
    /// Whether the backing store is reachable.
    fn health_check(&self) -> RepositoryResult<bool>;

    /// Active projects of a profile, each with its enabled targets and their
    /// exposure plans, in a stable order.
    fn load_active_projects(&self, profile_id: &str) -> RepositoryResult<Vec<Project>>;

    /// Current exposure plans of one target, used to refresh completion
    /// counts of a continuing target.
    fn reload_exposure_plans(&self, target_id: TargetId) -> RepositoryResult<Vec<ExposurePlan>>;

    /// Persist a target's exposure selector position after a plan was
    /// committed. Stores without selector state may ignore it.
    fn save_selector_state(&self, _target_id: TargetId, _selector: &SelectorKind) -> RepositoryResult<()> {
        Ok(())
    }
}
