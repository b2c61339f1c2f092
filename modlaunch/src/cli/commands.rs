//! Verb dispatch: wires the planner, instance controller, container
//! runtime, and command channel together for each CLI verb.

use crate::channel::{send_stop, CommandServer, Link};
use crate::container::{parse_shutdown_timeout, ContainerFactory, ContainerRuntime, NoopContainerFactory};
use crate::error::{LauncherError, Result};
use crate::instance::InstanceController;
use crate::plan::{build_plan, BundleSource, DeploymentPlan};
use crate::properties::{self, PropertyMap};

use super::args::{parse_property, Command, DeployOpts};

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Dispatch a parsed command. `factory` is the host-supplied container
/// factory; the bin target falls back to [`NoopContainerFactory`] when the
/// host hasn't linked a real one.
pub fn run(command: Command, factory: &dyn ContainerFactory) -> Result<()> {
    match command {
        Command::Delete { instance } => delete(&instance),
        Command::Deploy { opts, instance } => deploy(&instance, &opts, factory).map(|_| ()),
        Command::Start { opts, instance } => start(&instance, &opts, factory, None),
        Command::Launch { opts, instance, container_args } => launch(&instance, &opts, factory, &container_args),
        Command::Stop { target } => stop(&target),
    }
}

pub fn default_factory() -> NoopContainerFactory {
    NoopContainerFactory
}

fn delete(instance: &Path) -> Result<()> {
    InstanceController::delete(instance)?;
    info!(instance = %instance.display(), "instance deleted");
    Ok(())
}

/// Build the launching-properties default map from `--launching-properties`
/// and `--property name=value` overrides (later overrides win).
fn load_launching_defaults(opts: &DeployOpts) -> Result<PropertyMap> {
    let mut defaults = match &opts.launching_properties {
        Some(path) => properties::load(path)?,
        None => PropertyMap::new(),
    };

    for raw in &opts.properties {
        match parse_property(raw) {
            Some((k, v)) => {
                defaults.insert(k, v);
            }
            None => {
                return Err(LauncherError::Syntax(format!(
                    "--property value {raw:?} is not of the form name=value"
                )))
            }
        }
    }

    Ok(defaults)
}

fn deploy(instance: &Path, opts: &DeployOpts, factory: &dyn ContainerFactory) -> Result<DeploymentPlan> {
    let defaults = load_launching_defaults(opts)?;
    let sources: Vec<BundleSource> = opts
        .bundle_sources
        .iter()
        .cloned()
        .map(|root| BundleSource { root })
        .collect();
    let plan = build_plan(&sources, &defaults)?;

    let controller = InstanceController::acquire(instance)?;

    let system = PropertyMap::new();
    let launching = defaults.clone();
    let framework = defaults.clone();
    controller.persist(&system, &launching, &framework)?;

    let mut runtime = ContainerRuntime::create(
        factory,
        controller.root(),
        &controller.conf_dir(),
        &framework,
        opts.clean.unwrap_or(false),
    )?;
    runtime.init()?;
    runtime.deploy(&plan);

    Ok(plan)
}

/// Deploy then start in one invocation. `container_args` is passed through
/// to the container unexamined; the host-supplied factory is responsible
/// for wiring it into whatever the container accepts.
fn launch(instance: &Path, opts: &DeployOpts, factory: &dyn ContainerFactory, container_args: &[String]) -> Result<()> {
    deploy(instance, opts, factory)?;
    if !container_args.is_empty() {
        info!(args = ?container_args, "passing container arguments through unexamined");
    }
    start(instance, opts, factory, None)
}

/// Load an existing instance, start the container, and run the
/// start/restart-on-update loop. `stop_after` lets tests bound how long
/// the loop is allowed to run; production callers pass `None`.
fn start(
    instance: &Path,
    opts: &DeployOpts,
    factory: &dyn ContainerFactory,
    stop_after: Option<Duration>,
) -> Result<()> {
    if !InstanceController::looks_valid(instance) {
        return Err(LauncherError::Config(format!(
            "{} does not look like an instance; run deploy first",
            instance.display()
        )));
    }

    let controller = InstanceController::acquire(instance)?;

    let mut system = PropertyMap::new();
    let mut launching = load_launching_defaults(opts)?;
    let mut framework = launching.clone();
    controller.restore_into(&mut system, &mut launching, &mut framework)?;

    let shutdown_timeout = match &opts.shutdown_timeout {
        Some(raw) => parse_shutdown_timeout(Some(raw))?,
        None => stop_after,
    };

    let mut runtime = ContainerRuntime::create(
        factory,
        controller.root(),
        &controller.conf_dir(),
        &framework,
        true,
    )?;
    runtime.init()?;

    let kill_switch = runtime.kill_switch();
    install_signal_handler(kill_switch.clone());

    let secret = crate::channel::crypto::generate_secret();
    let handler_kill_switch = kill_switch.clone();
    let server = CommandServer::bind(
        "0.0.0.0:0",
        controller.root().to_path_buf(),
        &secret,
        Arc::new(move |verb: &str, _addr: SocketAddr| {
            if verb == "stop" {
                handler_kill_switch.kill();
            } else {
                warn!(verb, "unrecognized command-channel verb");
            }
        }),
    )?;
    info!(addr = %server.local_addr(), "command channel bound");

    runtime.run(shutdown_timeout)
}

/// Send `stop`: either by instance path (reading `instance.link`) or by an
/// explicit `host port secret` triple.
fn stop(target: &[String]) -> Result<()> {
    match target {
        [instance] => {
            let link = read_link(Path::new(instance))?;
            send_stop(&link.host, link.port, &link.secret)
        }
        [host, port, secret] => {
            let port: u16 = port
                .parse()
                .map_err(|_| LauncherError::Syntax(format!("invalid port {port:?}")))?;
            send_stop(host, port, secret)
        }
        other => Err(LauncherError::Syntax(format!(
            "stop expects <instance> or <host> <port> <secret>, got {} tokens",
            other.len()
        ))),
    }
}

fn read_link(instance: &Path) -> Result<Link> {
    crate::channel::link::read(instance)
}

static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_shutdown_signal(_sig: libc::c_int) {
    SIGNAL_RECEIVED.store(true, Ordering::SeqCst);
}

/// Install SIGINT/SIGTERM handlers and spawn the shutdown-signal thread
/// (§5 concurrency model) whose sole contract is to invoke the runtime's
/// cancel hook (here, the kill switch) exactly once.
fn install_signal_handler(kill_switch: crate::container::KillSwitch) {
    unsafe {
        libc::signal(libc::SIGINT, handle_shutdown_signal as usize);
        libc::signal(libc::SIGTERM, handle_shutdown_signal as usize);
    }

    std::thread::spawn(move || loop {
        if SIGNAL_RECEIVED.load(Ordering::SeqCst) {
            kill_switch.kill();
            return;
        }
        std::thread::sleep(Duration::from_millis(100));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::fakes::FakeContainerFactory;
    use std::fs;

    #[test]
    fn deploy_persists_properties_and_runs_plan() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("bundles");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.jar"), "stub").unwrap();

        let instance = dir.path().join("inst");
        let opts = DeployOpts {
            bundle_sources: vec![source],
            ..Default::default()
        };

        let plan = deploy(&instance, &opts, &FakeContainerFactory).unwrap();
        assert_eq!(plan.deployments.len(), 1);
        assert!(instance.join("etc/launching.properties").is_file());
    }

    #[test]
    fn deploy_rejects_malformed_property_override() {
        let dir = tempfile::tempdir().unwrap();
        let instance = dir.path().join("inst");
        let opts = DeployOpts {
            properties: vec!["not-a-pair".to_string()],
            ..Default::default()
        };
        let result = deploy(&instance, &opts, &FakeContainerFactory);
        assert!(result.is_err());
    }

    #[test]
    fn start_refuses_non_instance_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = start(dir.path(), &DeployOpts::default(), &FakeContainerFactory, Some(Duration::from_millis(10)));
        assert!(result.is_err());
    }

    #[test]
    fn stop_rejects_wrong_argument_count() {
        let result = stop(&["a".to_string(), "b".to_string()]);
        assert!(result.is_err());
    }
}
