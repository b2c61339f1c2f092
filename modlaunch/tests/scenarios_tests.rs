//! End-to-end scenarios from the design's testable-properties section,
//! exercised against the public library API.

use modlaunch::cli::{default_factory, run, Command, DeployOpts};
use modlaunch::container::KillSwitch;
use modlaunch::instance::InstanceController;
use modlaunch::plan::{build_plan, BundleSource};
use modlaunch::properties::PropertyMap;

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn write(path: &std::path::Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// S1 — deploy then start: deploying materializes the instance and installs
/// every discovered bundle against the container; a subsequent start loads
/// the same instance without re-planning and runs to completion against the
/// reference container (which stops immediately).
#[test]
fn s1_deploy_then_start() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("bundles");
    write(&source.join("a.jar"), "stub");

    let instance = dir.path().join("inst");
    let factory = default_factory();

    run(
        Command::Deploy {
            opts: DeployOpts { bundle_sources: vec![source], ..Default::default() },
            instance: instance.clone(),
        },
        &factory,
    )
    .unwrap();

    assert!(instance.join("etc/launching.properties").is_file());
    assert!(instance.join("instance.lock").is_file());

    run(
        Command::Start { opts: DeployOpts::default(), instance: instance.clone() },
        &factory,
    )
    .unwrap();
}

/// S2 — stop via the command channel: a `stop` datagram sent to a bound
/// command server reaches its handler and trips the shared kill switch,
/// exactly as the running `start`/`launch` loop wires it.
#[test]
fn s2_stop_command_reaches_running_instance() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("inst");
    fs::create_dir_all(&instance).unwrap();

    let secret = "s2-scenario-secret";
    let kill_switch = KillSwitch::new();
    let handler_switch = kill_switch.clone();

    let server = modlaunch::channel::CommandServer::bind(
        "127.0.0.1:0",
        instance.clone(),
        secret,
        Arc::new(move |verb: &str, _addr: SocketAddr| {
            if verb == "stop" {
                handler_switch.kill();
            }
        }),
    )
    .unwrap();

    let addr = server.local_addr();
    modlaunch::channel::send_stop(&addr.ip().to_string(), addr.port(), secret).unwrap();

    let deadline = Instant::now() + Duration::from_secs(1);
    while !kill_switch.is_killed() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(kill_switch.is_killed());
}

/// S3 — lock exclusion: a second acquire of the same instance path fails
/// with InstanceBusy while the first is still held.
#[test]
fn s3_lock_exclusion() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("inst");

    let _first = InstanceController::acquire(&instance).unwrap();
    let second = InstanceController::acquire(&instance);

    assert!(second.is_err());
    match second {
        Err(modlaunch::LauncherError::InstanceBusy { .. }) => {}
        other => panic!("expected InstanceBusy, got {other:?}"),
    }
}

/// S4 — scoped override precedence: the most-literal scoped pattern wins,
/// an unmatched path falls back to the global default, and a path with a
/// separator is untouched by single-star patterns.
#[test]
fn s4_scoped_override_precedence() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("org.osgi.util.tracker.jar"), "stub");
    write(&dir.path().join("foo.jar"), "stub");
    write(&dir.path().join("subdir/bar.jar"), "stub");
    write(
        &dir.path().join("deployment.properties"),
        "start.level=10\nstart.level@*.jar=20\nstart.level@org.osgi.util.*.jar=1\n",
    );

    let sources = vec![BundleSource { root: dir.path().to_path_buf() }];
    let plan = build_plan(&sources, &PropertyMap::new()).unwrap();

    let level_of = |suffix: &str| {
        plan.deployments
            .iter()
            .find(|d| d.location.ends_with(suffix))
            .unwrap_or_else(|| panic!("no deployment for {suffix}"))
            .start_level
    };

    assert_eq!(level_of("org.osgi.util.tracker.jar"), 1);
    assert_eq!(level_of("foo.jar"), 20);
    assert_eq!(level_of("subdir/bar.jar"), 10);
}

/// S5 — ambiguous override: two equally-ranked scoped patterns both match;
/// neither applies and the bundle keeps its inherited default.
#[test]
fn s5_ambiguous_override_leaves_inherited_default() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("a-b.jar"), "stub");
    write(
        &dir.path().join("deployment.properties"),
        "start.level=9\nstart.level@a-?.jar=5\nstart.level@a-b.?ar=7\n",
    );

    let sources = vec![BundleSource { root: dir.path().to_path_buf() }];
    let plan = build_plan(&sources, &PropertyMap::new()).unwrap();

    assert_eq!(plan.deployments.len(), 1);
    assert_eq!(plan.deployments[0].start_level, 9);
}

/// S6 — delete round-trip: deploy (here, just instance acquisition plus
/// property persistence) then delete returns the filesystem to its
/// pre-deploy state.
#[test]
fn s6_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let instance = dir.path().join("inst");

    {
        let controller = InstanceController::acquire(&instance).unwrap();
        let mut props = PropertyMap::new();
        props.insert("k".to_string(), "v".to_string());
        controller.persist(&props, &props, &props).unwrap();
    }
    assert!(instance.exists());

    InstanceController::delete(&instance).unwrap();
    assert!(!instance.exists());

    // Delete is idempotent: a second delete on an already-gone path is a
    // no-op success, not an error.
    InstanceController::delete(&instance).unwrap();
    assert!(!instance.exists());
}
