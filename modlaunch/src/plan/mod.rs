//! Deployment Planner (C1).

pub mod builder;
pub mod entity;
mod ordering;
mod source;

pub use builder::{build_plan, BundleSource, DeploymentPlan, LocationSettings};
pub use entity::{Action, ActionSet, Autostart, BundleDeployment, BundleSourceOpener, StartLevel};
pub use source::discover;
