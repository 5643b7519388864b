//! Target scheduler planning engine.
//!
//! Decides, at a given instant, which target an automated imaging telescope
//! should image next and with which exposure plan, or how long to wait for
//! the next target to become available.
//!
//! - [`models`]: project → target → exposure plan tree and rejection reasons
//! - [`planning`]: the planner, per-target checks and continuation
//! - [`selection`]: exposure ordering strategies
//! - [`scoring`]: tie-breaking between simultaneously ready targets
//! - [`oracles`]: sky collaborators (visibility, twilight, moon)
//! - [`db`]: data access contract and in-memory store
//! - [`config`]: profile and preference settings

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod oracles;
pub mod planning;
pub mod scoring;
pub mod selection;

pub use config::{ConfigError, PlannerConfig};
pub use error::{CollaboratorError, PlannerError, PlannerResult};
pub use planning::{ActiveTarget, PlanInstruction, Planner, SchedulerPlan};
