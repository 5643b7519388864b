//! Planning data model: the project → target → exposure plan tree, the
//! rejection vocabulary, and the time/sky value types the planner works in.

pub mod exposure;
pub mod horizon;
pub mod macros;
pub mod project;
pub mod rejection;
pub mod target;
pub mod time;
pub mod twilight;

pub use exposure::*;
pub use horizon::*;
pub use project::*;
pub use rejection::*;
pub use target::*;
pub use time::*;
pub use twilight::*;
