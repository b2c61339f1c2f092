//! Reference container factory used when the host environment does not
//! link a real one. Tracks installed locations in memory and performs no
//! actual sandboxing; useful for dry runs and as the bin target's default.

use crate::error::Result;
use crate::properties::PropertyMap;

use super::factory::{Container, ContainerFactory, StopOutcome};

use std::collections::BTreeSet;
use std::io::Read;
use std::time::Duration;
use tracing::info;

#[derive(Default)]
pub struct NoopContainerFactory;

impl ContainerFactory for NoopContainerFactory {
    fn create(&self, framework_properties: &PropertyMap) -> Result<Box<dyn Container>> {
        info!(properties = ?framework_properties, "creating reference container");
        Ok(Box::new(NoopContainer::default()))
    }
}

#[derive(Default)]
struct NoopContainer {
    installed: BTreeSet<String>,
}

impl Container for NoopContainer {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        info!("reference container start (no-op)");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn wait_for_stop(&mut self, _timeout: Option<Duration>) -> Result<StopOutcome> {
        Ok(StopOutcome::Stopped)
    }

    fn is_installed(&self, location: &str) -> bool {
        self.installed.contains(location)
    }

    fn install_bundle(&mut self, location: &str, mut stream: Box<dyn Read + Send>) -> Result<()> {
        let mut discard = Vec::new();
        std::io::copy(&mut stream, &mut discard).ok();
        self.installed.insert(location.to_string());
        Ok(())
    }

    fn update_bundle(&mut self, location: &str, mut stream: Box<dyn Read + Send>) -> Result<()> {
        let mut discard = Vec::new();
        std::io::copy(&mut stream, &mut discard).ok();
        self.installed.insert(location.to_string());
        Ok(())
    }

    fn uninstall_bundle(&mut self, location: &str) -> Result<()> {
        self.installed.remove(location);
        Ok(())
    }

    fn set_start_level(&mut self, _location: &str, _level: u32) -> Result<()> {
        Ok(())
    }

    fn set_autostart(&mut self, _location: &str, _autostart: bool) -> Result<()> {
        Ok(())
    }

    fn installed_locations(&self) -> Vec<String> {
        self.installed.iter().cloned().collect()
    }
}
