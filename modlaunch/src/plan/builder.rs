//! Deployment Planner (C1): ties bundle sources, launching properties,
//! scoped overrides, and deterministic ordering into one Deployment Plan.

use crate::error::Result;
use crate::glob::Matcher;
use crate::properties::PropertyMap;

use super::entity::{ActionSet, BundleDeployment};
use super::ordering::sort_plan;
use super::source::{action_overrides, discover, effective_properties, start_level_overrides};

use std::collections::BTreeMap;
use std::path::PathBuf;

/// The per-pattern settings contributed by a source's scoped override keys,
/// recorded alongside the plan for introspection (e.g. `list` output) and
/// for the container runtime's uninstall-by-pattern rule.
#[derive(Debug, Clone, Default)]
pub struct LocationSettings {
    pub action: Option<ActionSet>,
    pub start_level: Option<i32>,
}

/// The materialized result of planning: a deterministically ordered list of
/// Bundle Deployments, the inherited default settings record, and a sorted
/// map from scoped-override pattern to the settings it contributes.
#[derive(Debug, Default)]
pub struct DeploymentPlan {
    pub deployments: Vec<BundleDeployment>,
    pub defaults: PropertyMap,
    pub location_settings: BTreeMap<String, LocationSettings>,
}

/// One configured bundle source: a directory to search, walked in the order
/// given (earlier sources are discovered, and therefore ordered, first
/// within a shared action/autostart/start-level tier).
pub struct BundleSource {
    pub root: PathBuf,
}

/// Build the Deployment Plan for an ordered list of bundle sources and a
/// shared launching-properties default map.
pub fn build_plan(sources: &[BundleSource], launching_defaults: &PropertyMap) -> Result<DeploymentPlan> {
    let mut deployments = Vec::new();
    let mut location_settings: BTreeMap<String, LocationSettings> = BTreeMap::new();

    for source in sources {
        let mut found = discover(&source.root, launching_defaults)?;
        deployments.append(&mut found);

        let effective = effective_properties(&source.root, launching_defaults)?;
        record_location_settings(&effective, &mut location_settings);
    }

    sort_plan(&mut deployments);

    Ok(DeploymentPlan {
        deployments,
        defaults: launching_defaults.clone(),
        location_settings,
    })
}

/// Fold a source's scoped-override collectors into the plan-wide settings
/// map, keyed by the original glob pattern text so two sources that target
/// the same pattern merge (later sources win, matching the merge direction
/// used for `deployment.properties` itself).
fn record_location_settings(effective: &PropertyMap, into: &mut BTreeMap<String, LocationSettings>) {
    for (matcher, level) in start_level_overrides(effective) {
        into.entry(pattern_key(&matcher)).or_default().start_level = Some(level);
    }
    for (matcher, actions) in action_overrides(effective) {
        into.entry(pattern_key(&matcher)).or_default().action = Some(actions);
    }
}

fn pattern_key(matcher: &Matcher) -> String {
    matcher.pattern().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::entity::Action;
    use std::fs;

    fn write(path: &std::path::Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn plan_merges_and_orders_multiple_sources() {
        let dir = tempfile::tempdir().unwrap();

        let first = dir.path().join("first");
        write(&first.join("a.jar"), "stub");
        write(&first.join("deployment.properties"), "deployment.action=install\n");

        let second = dir.path().join("second");
        write(&second.join("z.jar"), "stub");
        write(&second.join("deployment.properties"), "deployment.action=uninstall\n");

        let sources = vec![
            BundleSource { root: first },
            BundleSource { root: second },
        ];

        let plan = build_plan(&sources, &PropertyMap::new()).unwrap();
        assert_eq!(plan.deployments.len(), 2);
        // Pure-uninstall deployment sorts before the install-only one
        // regardless of discovery order across sources.
        assert!(plan.deployments[0].location.ends_with("z.jar"));
        assert!(plan.deployments[0].actions.contains(Action::Uninstall));
        assert!(plan.deployments[1].location.ends_with("a.jar"));
    }

    #[test]
    fn location_settings_capture_scoped_overrides_by_pattern() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a.jar"), "stub");
        write(
            &dir.path().join("deployment.properties"),
            "start.level@a.jar=10\ndeployment.action@a.jar=update\n",
        );

        let sources = vec![BundleSource { root: dir.path().to_path_buf() }];
        let plan = build_plan(&sources, &PropertyMap::new()).unwrap();

        let settings = plan.location_settings.get("a.jar").unwrap();
        assert_eq!(settings.start_level, Some(10));
        assert!(settings.action.as_ref().unwrap().contains(Action::Update));
    }
}
