//! Interpolation & Property Layer (C6).

mod file;
mod interpolate;

pub use file::{load, parse, save};
pub use interpolate::{interpolate, interpolate_map};

use std::collections::BTreeMap;

/// A sorted property map, the common currency between the planner, the
/// instance controller, and the container runtime.
pub type PropertyMap = BTreeMap<String, String>;

/// Restore `persisted` into `into`, never overwriting a key already present
/// in `into`. This is the merge direction used when an instance is started:
/// CLI-supplied overrides dominate whatever was persisted at deploy time.
pub fn restore_without_override(into: &mut PropertyMap, persisted: &PropertyMap) {
    for (k, v) in persisted {
        into.entry(k.clone()).or_insert_with(|| v.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_never_overrides_existing_keys() {
        let mut live = PropertyMap::new();
        live.insert("a".to_string(), "cli-value".to_string());

        let mut persisted = PropertyMap::new();
        persisted.insert("a".to_string(), "disk-value".to_string());
        persisted.insert("b".to_string(), "disk-only".to_string());

        restore_without_override(&mut live, &persisted);

        assert_eq!(live.get("a").unwrap(), "cli-value");
        assert_eq!(live.get("b").unwrap(), "disk-only");
    }
}
