//! ECS Components (data-only, без логики систем)

pub mod actor;

pub use actor::*;
