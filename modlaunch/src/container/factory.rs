//! Host-supplied container factory contract (C3 inputs).
//!
//! The runtime never embeds a module container; it drives one through this
//! trait, produced by the host environment. Calls are synchronous: per the
//! concurrency model, install/update/uninstall against a single container
//! are never issued concurrently, so there is no need for the async
//! machinery the rest of the workspace reaches for elsewhere.

use crate::error::Result;
use crate::properties::PropertyMap;

use std::io::Read;
use std::time::Duration;

/// Outcome of waiting for the container to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Stopped normally; no restart requested.
    Stopped,
    /// Stopped specifically to pick up an update; the runtime should
    /// re-enter `start` unless a kill was requested concurrently.
    StoppedForUpdate,
    /// The wait exceeded the configured timeout.
    TimedOut,
}

/// Produces [`Container`] instances from an effective framework properties
/// map. Implemented by the host environment; a fake is provided under
/// `#[cfg(test)]` in [`crate::container::runtime`] for exercising the state
/// machine without a real container.
pub trait ContainerFactory: Send {
    fn create(&self, framework_properties: &PropertyMap) -> Result<Box<dyn Container>>;
}

/// A single container instance, driven through its lifecycle by
/// [`crate::container::runtime::ContainerRuntime`].
pub trait Container: Send {
    fn init(&mut self) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;

    /// Block until the container reports a stop, or `timeout` elapses.
    /// `None` waits indefinitely.
    fn wait_for_stop(&mut self, timeout: Option<Duration>) -> Result<StopOutcome>;

    /// `true` if `location` is currently installed.
    fn is_installed(&self, location: &str) -> bool;

    fn install_bundle(&mut self, location: &str, stream: Box<dyn Read + Send>) -> Result<()>;
    fn update_bundle(&mut self, location: &str, stream: Box<dyn Read + Send>) -> Result<()>;

    /// Uninstall a bundle. Tolerates "already uninstalled" by returning
    /// `Ok(())` rather than an error, matching the design's terminal-state
    /// detection rule.
    fn uninstall_bundle(&mut self, location: &str) -> Result<()>;

    fn set_start_level(&mut self, location: &str, level: u32) -> Result<()>;
    fn set_autostart(&mut self, location: &str, autostart: bool) -> Result<()>;

    /// Every currently installed location, for pattern-based uninstall.
    /// The system/root bundle (id 0 in the underlying container) must not
    /// be included.
    fn installed_locations(&self) -> Vec<String>;
}
