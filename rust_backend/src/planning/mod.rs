//! The planning engine.
//!
//! - [`completion`]: when an exposure plan counts as done
//! - [`meridian`]: meridian flip safety window
//! - [`imaging`]: per-target visibility and filter checks
//! - [`previous_target`]: continuation of the running target
//! - [`dither`]: dither history of the running target
//! - [`plan`]: planner output
//! - [`planner`]: the orchestrator

pub mod completion;
pub mod dither;
pub mod imaging;
pub mod meridian;
pub mod plan;
pub mod planner;
pub mod previous_target;

pub use completion::ExposureCompletion;
pub use dither::DitherTracker;
pub use imaging::{ImagingSettings, TargetImagingExpert};
pub use meridian::{ClipCase, MeridianFlipClipper};
pub use plan::{ActiveTarget, ImagingPlan, PlanInstruction, SchedulerPlan};
pub use planner::{Planner, TargetSlot};
pub use previous_target::PreviousTargetExpert;
