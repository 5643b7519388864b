//! Data access for the planner.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Planner (planning::planner)                │
//! └───────────────────┬─────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────┐
//! │  Repository Trait (repository) - contract   │
//! └───────────────────┬─────────────────────────┘
//!                     │
//!          ┌──────────▼──────────────┐
//!          │  Local Repository       │
//!          │  (in-memory)            │
//!          └─────────────────────────┘
//! ```
//!
//! Persistent stores plug in by implementing
//! [`repository::ProjectRepository`].

pub mod repositories;
pub mod repository;

pub use repositories::LocalRepository;
pub use repository::{ProjectRepository, RepositoryError, RepositoryResult};
