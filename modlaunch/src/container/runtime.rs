//! Container Runtime (C3): drives a single container through
//! init/deploy/start/wait-for-stop/restart-on-update, and the
//! uninstall-by-pattern surface used by the command channel.

use crate::config::{
    KEY_CONTAINER_STORAGE, KEY_CONTAINER_STORAGE_CLEAN, KEY_INSTANCE, KEY_INSTANCE_CONFIGURATION, RESERVED_KEYS,
};
use crate::error::{LauncherError, Result};
use crate::glob::Matcher;
use crate::plan::{Action, BundleDeployment, DeploymentPlan};
use crate::properties::{interpolate_map, PropertyMap};

use super::factory::{Container, ContainerFactory, StopOutcome};

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Shared kill flag, read by the restart loop and written by a peer `stop`
/// request arriving on a different thread (the command-channel receive
/// thread). Both sides synchronize on the same mutex to prevent a stop
/// racing with a restart.
#[derive(Clone, Default)]
pub struct KillSwitch(Arc<Mutex<bool>>);

impl KillSwitch {
    pub fn new() -> KillSwitch {
        KillSwitch(Arc::new(Mutex::new(false)))
    }

    pub fn kill(&self) {
        *self.0.lock() = true;
    }

    pub fn is_killed(&self) -> bool {
        *self.0.lock()
    }
}

/// Drives one container instance through its lifecycle.
pub struct ContainerRuntime {
    container: Box<dyn Container>,
    kill_switch: KillSwitch,
}

impl ContainerRuntime {
    /// Prepare the framework properties (inject the reserved keys,
    /// interpolate placeholders) and create the container via `factory`.
    pub fn create(
        factory: &dyn ContainerFactory,
        instance_root: &Path,
        conf_dir: &Path,
        framework_properties: &PropertyMap,
        strip_storage_clean: bool,
    ) -> Result<ContainerRuntime> {
        let prepared = prepare_framework_properties(instance_root, conf_dir, framework_properties, strip_storage_clean);
        let container = factory.create(&prepared)?;
        Ok(ContainerRuntime {
            container,
            kill_switch: KillSwitch::new(),
        })
    }

    pub fn kill_switch(&self) -> KillSwitch {
        self.kill_switch.clone()
    }

    pub fn init(&mut self) -> Result<()> {
        self.container.init()
    }

    /// Deploy a sorted plan: for each entry, install/update/uninstall as
    /// the action set and current installed state dictate. Per-bundle
    /// failures are logged and do not abort the remaining plan.
    pub fn deploy(&mut self, plan: &DeploymentPlan) {
        for deployment in &plan.deployments {
            if let Err(err) = self.deploy_one(deployment) {
                error!(location = %deployment.location, error = %err, "bundle operation failed");
            }
        }
    }

    fn deploy_one(&mut self, deployment: &BundleDeployment) -> Result<()> {
        let installed = self.container.is_installed(&deployment.location);

        if !installed && deployment.actions.contains(Action::Install) {
            if let Some(opener) = &deployment.source {
                let stream = opener().map_err(|source| LauncherError::InstanceIo {
                    path: deployment.location.clone().into(),
                    source,
                })?;
                self.container.install_bundle(&deployment.location, stream)?;
                self.apply_start_level_and_autostart(deployment)?;
            }
            return Ok(());
        }

        if installed && deployment.actions.contains(Action::Uninstall) && deployment.source.is_none() {
            // Tolerate "already uninstalled": the factory's contract is to
            // return Ok(()) for a terminal-state bundle rather than erroring.
            return self.container.uninstall_bundle(&deployment.location);
        }

        if installed && deployment.actions.contains(Action::Update) {
            if let Some(opener) = &deployment.source {
                let stream = opener().map_err(|source| LauncherError::InstanceIo {
                    path: deployment.location.clone().into(),
                    source,
                })?;
                self.container.update_bundle(&deployment.location, stream)?;
                self.apply_start_level_and_autostart(deployment)?;
            }
            return Ok(());
        }

        Ok(())
    }

    fn apply_start_level_and_autostart(&mut self, deployment: &BundleDeployment) -> Result<()> {
        use crate::plan::Autostart;

        if deployment.start_level != 0 {
            self.container.set_start_level(&deployment.location, deployment.start_level)?;
        }
        match deployment.autostart {
            Autostart::Started => self.container.set_autostart(&deployment.location, true)?,
            Autostart::Stopped => self.container.set_autostart(&deployment.location, false)?,
            Autostart::Unspecified => {}
        }
        Ok(())
    }

    /// Uninstall every installed bundle whose location matches any of
    /// `patterns`. The system/root bundle is never a candidate since
    /// `installed_locations` never reports it.
    pub fn uninstall_matching(&mut self, patterns: &[String]) {
        let matchers: Vec<Matcher> = patterns.iter().map(|p| Matcher::compile(p)).collect();
        for location in self.container.installed_locations() {
            if matchers.iter().any(|m| m.test(&location)) {
                if let Err(err) = self.container.uninstall_bundle(&location) {
                    error!(location = %location, error = %err, "uninstall by pattern failed");
                }
            }
        }
    }

    /// Run the start/restart-on-update loop until the container reaches a
    /// terminal stop or the kill switch halts it.
    pub fn run(&mut self, shutdown_timeout: Option<Duration>) -> Result<()> {
        loop {
            self.container.start()?;
            match self.container.wait_for_stop(shutdown_timeout)? {
                StopOutcome::StoppedForUpdate => {
                    if self.kill_switch.is_killed() {
                        self.container.stop()?;
                        return Ok(());
                    }
                    info!("container requested restart for update");
                    continue;
                }
                StopOutcome::Stopped => return Ok(()),
                StopOutcome::TimedOut => {
                    warn!("wait_for_stop timed out; treating as stopped");
                    return Ok(());
                }
            }
        }
    }

    pub fn kill(&mut self) -> Result<()> {
        self.kill_switch.kill();
        self.container.stop()
    }
}

/// Inject the reserved keys and interpolate every framework property value
/// against them. Every key in [`RESERVED_KEYS`] is overwritten unconditionally
/// -- a user-supplied value for any of them is ignored, never merged.
/// `container.storage.clean` is additionally stripped when
/// `strip_storage_clean` (set on the `start` verb) to avoid wiping state
/// left over from a previous run.
fn prepare_framework_properties(
    instance_root: &Path,
    conf_dir: &Path,
    framework_properties: &PropertyMap,
    strip_storage_clean: bool,
) -> PropertyMap {
    let mut extra = PropertyMap::new();
    extra.insert(KEY_INSTANCE.to_string(), instance_root.display().to_string());
    extra.insert(
        KEY_INSTANCE_CONFIGURATION.to_string(),
        conf_dir.display().to_string(),
    );

    let mut base = framework_properties.clone();
    for key in RESERVED_KEYS {
        base.remove(*key);
    }

    base.insert(KEY_INSTANCE.to_string(), instance_root.display().to_string());
    base.insert(
        KEY_INSTANCE_CONFIGURATION.to_string(),
        conf_dir.display().to_string(),
    );
    let data_dir = instance_root.join("data");
    base.insert(KEY_CONTAINER_STORAGE.to_string(), data_dir.display().to_string());

    if strip_storage_clean {
        base.remove(KEY_CONTAINER_STORAGE_CLEAN);
    }

    interpolate_map(&base, &extra)
}

/// Parse a `shutdown.timeout`-style duration: `none`/`null`/empty means
/// wait indefinitely; otherwise `<n>{ms|s|m}` or a bare integer of seconds.
pub fn parse_shutdown_timeout(raw: Option<&str>) -> Result<Option<Duration>> {
    let raw = match raw {
        None => return Ok(None),
        Some(raw) => raw.trim(),
    };

    if raw.is_empty() || raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }

    let (digits, unit) = raw
        .find(|c: char| !c.is_ascii_digit())
        .map(|idx| raw.split_at(idx))
        .unwrap_or((raw, ""));

    let value: u64 = digits
        .parse()
        .map_err(|_| LauncherError::Config(format!("invalid shutdown timeout: {raw}")))?;

    let duration = match unit {
        "" | "s" => Duration::from_secs(value),
        "ms" => Duration::from_millis(value),
        "m" => Duration::from_secs(value * 60),
        other => {
            return Err(LauncherError::Config(format!(
                "unrecognized shutdown timeout unit {other:?} in {raw:?}"
            )))
        }
    };

    Ok(Some(duration))
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::collections::BTreeSet;

    /// In-memory [`ContainerFactory`]/[`Container`] pair for exercising the
    /// state machine without a real container implementation.
    #[derive(Default)]
    pub struct FakeContainerFactory;

    impl ContainerFactory for FakeContainerFactory {
        fn create(&self, _framework_properties: &PropertyMap) -> Result<Box<dyn Container>> {
            Ok(Box::new(FakeContainer::default()))
        }
    }

    #[derive(Default)]
    pub struct FakeContainer {
        pub installed: BTreeSet<String>,
        pub start_levels: std::collections::BTreeMap<String, u32>,
        pub stop_outcomes: Vec<StopOutcome>,
    }

    impl Container for FakeContainer {
        fn init(&mut self) -> Result<()> {
            Ok(())
        }
        fn start(&mut self) -> Result<()> {
            Ok(())
        }
        fn stop(&mut self) -> Result<()> {
            Ok(())
        }
        fn wait_for_stop(&mut self, _timeout: Option<Duration>) -> Result<StopOutcome> {
            Ok(self.stop_outcomes.pop().unwrap_or(StopOutcome::Stopped))
        }
        fn is_installed(&self, location: &str) -> bool {
            self.installed.contains(location)
        }
        fn install_bundle(&mut self, location: &str, _stream: Box<dyn std::io::Read + Send>) -> Result<()> {
            self.installed.insert(location.to_string());
            Ok(())
        }
        fn update_bundle(&mut self, location: &str, _stream: Box<dyn std::io::Read + Send>) -> Result<()> {
            self.installed.insert(location.to_string());
            Ok(())
        }
        fn uninstall_bundle(&mut self, location: &str) -> Result<()> {
            self.installed.remove(location);
            Ok(())
        }
        fn set_start_level(&mut self, location: &str, level: u32) -> Result<()> {
            self.start_levels.insert(location.to_string(), level);
            Ok(())
        }
        fn set_autostart(&mut self, _location: &str, _autostart: bool) -> Result<()> {
            Ok(())
        }
        fn installed_locations(&self) -> Vec<String> {
            self.installed.iter().cloned().collect()
        }
    }
}
