//! Deterministic composite ordering of a deployment plan (C1).
//!
//! Sort key, most to least significant:
//! 1. Action-set execution-order rank, ascending (pure uninstalls first,
//!    pure installs last; see [`ActionSet::rank`]).
//! 2. Autostart: `Stopped` before `Started` before `Unspecified`.
//! 3. Start level, descending among nonzero levels, with `0` (unchanged)
//!    sorted last -- higher start levels activate earlier relative to
//!    lower ones within the same action tier.
//! 4. Location, lexicographic, as the final deterministic tiebreaker.

use super::entity::BundleDeployment;

pub fn sort_plan(deployments: &mut [BundleDeployment]) {
    deployments.sort_by(|a, b| {
        a.actions
            .rank()
            .cmp(&b.actions.rank())
            .then_with(|| a.autostart.cmp(&b.autostart))
            .then_with(|| start_level_rank(a.start_level).cmp(&start_level_rank(b.start_level)))
            .then_with(|| a.location.cmp(&b.location))
    });
}

/// `0` (unchanged) sorts after every nonzero level; nonzero levels sort by
/// descending value. Represented as a key that sorts ascending overall.
fn start_level_rank(level: u32) -> (bool, std::cmp::Reverse<u32>) {
    (level == 0, std::cmp::Reverse(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::entity::{ActionSet, Autostart};

    fn deployment(location: &str, actions: ActionSet, level: u32, autostart: Autostart) -> BundleDeployment {
        let mut d = BundleDeployment::new(location, actions);
        d.start_level = level;
        d.autostart = autostart;
        d
    }

    #[test]
    fn uninstalls_sort_before_installs() {
        let mut plan = vec![
            deployment("b", ActionSet::parse("install"), 0, Autostart::Unspecified),
            deployment("a", ActionSet::parse("uninstall"), 0, Autostart::Unspecified),
        ];
        sort_plan(&mut plan);
        assert_eq!(plan[0].location, "a");
        assert_eq!(plan[1].location, "b");
    }

    #[test]
    fn mixed_action_sets_sort_between_pure_uninstall_and_pure_install() {
        let mut plan = vec![
            deployment("install", ActionSet::parse("install"), 0, Autostart::Unspecified),
            deployment("uninstall", ActionSet::parse("uninstall"), 0, Autostart::Unspecified),
            deployment("mixed", ActionSet::parse("update,uninstall"), 0, Autostart::Unspecified),
        ];
        sort_plan(&mut plan);
        let order: Vec<&str> = plan.iter().map(|d| d.location.as_str()).collect();
        assert_eq!(order, vec!["uninstall", "mixed", "install"]);
    }

    #[test]
    fn stopped_sorts_before_started_before_unspecified() {
        let mut plan = vec![
            deployment("u", ActionSet::all(), 0, Autostart::Unspecified),
            deployment("st", ActionSet::all(), 0, Autostart::Started),
            deployment("sp", ActionSet::all(), 0, Autostart::Stopped),
        ];
        sort_plan(&mut plan);
        let order: Vec<&str> = plan.iter().map(|d| d.location.as_str()).collect();
        assert_eq!(order, vec!["sp", "st", "u"]);
    }

    #[test]
    fn higher_start_levels_sort_before_lower_nonzero_levels_and_zero_sorts_last() {
        let mut plan = vec![
            deployment("zero", ActionSet::all(), 0, Autostart::Started),
            deployment("low", ActionSet::all(), 5, Autostart::Started),
            deployment("high", ActionSet::all(), 20, Autostart::Started),
        ];
        sort_plan(&mut plan);
        let order: Vec<&str> = plan.iter().map(|d| d.location.as_str()).collect();
        assert_eq!(order, vec!["high", "low", "zero"]);
    }

    #[test]
    fn location_breaks_remaining_ties() {
        let mut plan = vec![
            deployment("z.jar", ActionSet::all(), 10, Autostart::Started),
            deployment("a.jar", ActionSet::all(), 10, Autostart::Started),
        ];
        sort_plan(&mut plan);
        assert_eq!(plan[0].location, "a.jar");
        assert_eq!(plan[1].location, "z.jar");
    }
}
