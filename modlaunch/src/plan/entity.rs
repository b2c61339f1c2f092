//! Bundle Deployment Entity and the small value types it is built from.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

/// One of the three operations a deployment may request against a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Install,
    Update,
    Uninstall,
}

impl Action {
    fn parse_one(token: &str) -> Option<Action> {
        match token.trim().to_ascii_uppercase().as_str() {
            "INSTALL" => Some(Action::Install),
            "UPDATE" => Some(Action::Update),
            "UNINSTALL" => Some(Action::Uninstall),
            _ => None,
        }
    }

    /// Bit used for the action-set execution-order rank. `Install` holds the
    /// most significant bit so that any action set containing it always
    /// outranks (sorts after) any set that does not -- installs happen only
    /// once every uninstall/update-only operation has freed its location.
    fn rank_bit(self) -> u32 {
        match self {
            Action::Uninstall => 0b001,
            Action::Update => 0b010,
            Action::Install => 0b100,
        }
    }
}

/// A subset of [`Action`], as parsed from a comma-separated `deployment.action`
/// property value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet(BTreeSet<Action>);

impl ActionSet {
    pub fn empty() -> ActionSet {
        ActionSet(BTreeSet::new())
    }

    pub fn all() -> ActionSet {
        ActionSet(BTreeSet::from([Action::Install, Action::Update, Action::Uninstall]))
    }

    /// Parse a comma-separated, case-insensitive list such as `install,update`.
    /// Unrecognized tokens are ignored.
    pub fn parse(value: &str) -> ActionSet {
        ActionSet(value.split(',').filter_map(Action::parse_one).collect())
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0.contains(&action)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The deterministic execution-order rank: ascending bitmask of the
    /// actions present, with `Install` given the high bit (see
    /// [`Action::rank_bit`]).
    pub fn rank(&self) -> u32 {
        self.0.iter().fold(0, |acc, a| acc | a.rank_bit())
    }
}

impl fmt::Display for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .0
            .iter()
            .map(|a| match a {
                Action::Install => "INSTALL",
                Action::Update => "UPDATE",
                Action::Uninstall => "UNINSTALL",
            })
            .collect();
        write!(f, "{}", names.join(","))
    }
}

/// Persisted intent of whether a bundle should activate once its start
/// level is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Autostart {
    /// Sorts before `Unspecified`; see [`Autostart`]'s `Ord` derive order.
    Stopped,
    Started,
    #[default]
    Unspecified,
}

/// A non-negative start level. `0` means "leave unchanged"; the raw signed
/// property value this is parsed from may be negative (meaning `Stopped`
/// with the absolute level) -- see [`parse_start_level`].
pub type StartLevel = u32;

/// Parse a raw `start.level`-style property value into `(StartLevel,
/// Autostart)` following: `0` -> unchanged; `n > 0` -> `(n, Started)`;
/// `n < 0` -> `(-n, Stopped)`; `i32::MIN` is treated as `0` because negating
/// it would overflow `i32`.
pub fn parse_start_level(raw: i32) -> (StartLevel, Autostart) {
    if raw == 0 || raw == i32::MIN {
        (0, Autostart::Unspecified)
    } else if raw > 0 {
        (raw as u32, Autostart::Started)
    } else {
        (raw.unsigned_abs(), Autostart::Stopped)
    }
}

/// A byte-stream opener for a bundle archive. Boxed so both filesystem
/// sources and synthetic (test) sources can implement it uniformly.
pub type BundleSourceOpener = Arc<dyn Fn() -> std::io::Result<Box<dyn Read + Send>> + Send + Sync>;

/// One row of the deployment plan: what to do with a single location.
#[derive(Clone)]
pub struct BundleDeployment {
    pub location: String,
    pub actions: ActionSet,
    pub start_level: StartLevel,
    pub autostart: Autostart,
    pub source: Option<BundleSourceOpener>,
}

impl fmt::Debug for BundleDeployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleDeployment")
            .field("location", &self.location)
            .field("actions", &self.actions.to_string())
            .field("start_level", &self.start_level)
            .field("autostart", &self.autostart)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl BundleDeployment {
    pub fn new(location: impl Into<String>, actions: ActionSet) -> BundleDeployment {
        BundleDeployment {
            location: location.into(),
            actions,
            start_level: 0,
            autostart: Autostart::Unspecified,
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_level_zero_is_unchanged() {
        assert_eq!(parse_start_level(0), (0, Autostart::Unspecified));
    }

    #[test]
    fn start_level_min_int_treated_as_zero() {
        assert_eq!(parse_start_level(i32::MIN), (0, Autostart::Unspecified));
    }

    #[test]
    fn positive_start_level_means_started() {
        assert_eq!(parse_start_level(10), (10, Autostart::Started));
    }

    #[test]
    fn negative_start_level_means_stopped() {
        assert_eq!(parse_start_level(-10), (10, Autostart::Stopped));
    }

    #[test]
    fn action_set_rank_orders_uninstall_before_mixed_before_install() {
        let uninstall_only = ActionSet::parse("uninstall");
        let update_only = ActionSet::parse("update");
        let install_only = ActionSet::parse("install");
        let install_update = ActionSet::parse("install,update");

        assert!(uninstall_only.rank() < update_only.rank());
        assert!(update_only.rank() < install_only.rank());
        assert!(install_only.rank() <= install_update.rank());
    }

    #[test]
    fn action_set_parse_is_case_insensitive() {
        let set = ActionSet::parse("Install, UPDATE");
        assert!(set.contains(Action::Install));
        assert!(set.contains(Action::Update));
        assert!(!set.contains(Action::Uninstall));
    }
}
