//! Bundle source discovery: walks a source directory, applies
//! `deployment.properties`, and produces the unordered set of Bundle
//! Deployments for that source (C1).

use crate::error::Result;
use crate::glob::{best_match, Matcher};
use crate::properties::PropertyMap;

use super::entity::{parse_start_level, ActionSet, BundleDeployment};

use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_SEARCH_SUFFIX: &str = ".jar";

/// Recognized property keys, as literal constants to keep the parsing code
/// free of typos.
mod keys {
    pub const LOCATION_ROOT: &str = "bundle.location.root";
    pub const ACTION: &str = "deployment.action";
    pub const SEARCH: &str = "deployment.search";
    pub const START_LEVEL: &str = "start.level";
    pub const START_LEVEL_SCOPE: &str = "start.level@";
    pub const ACTION_SCOPE: &str = "deployment.action@";
    pub const LOCATION_SCOPE: &str = "bundle.location@";
}

/// Selects which files within a source directory are bundles.
enum SearchFilter {
    /// Default behavior: a literal (non-glob) suffix match on the file name.
    Suffix(String),
    /// `deployment.search` was set: a restricted glob over the uniform
    /// relative path.
    Glob(Matcher),
}

impl SearchFilter {
    fn matches(&self, uniform_path: &str) -> bool {
        match self {
            SearchFilter::Suffix(suffix) => uniform_path.ends_with(suffix.as_str()),
            SearchFilter::Glob(matcher) => matcher.test(uniform_path),
        }
    }
}

/// Discover the bundle deployments contributed by a single source directory.
///
/// `root` is the source directory. `launching_defaults` supplies global
/// fallbacks for recognized keys; a `deployment.properties` file directly
/// under `root`, if present, overrides them for this source only.
pub fn discover(root: &Path, launching_defaults: &PropertyMap) -> Result<Vec<BundleDeployment>> {
    let own = load_source_properties(root)?;

    let effective = {
        let mut merged = launching_defaults.clone();
        for (k, v) in &own {
            merged.insert(k.clone(), v.clone());
        }
        merged
    };

    let location_root = resolve_location_root(&effective, root);
    let default_actions = effective
        .get(keys::ACTION)
        .map(|v| ActionSet::parse(v))
        .filter(|set| !set.is_empty())
        .unwrap_or_else(ActionSet::all);
    let default_start_level = effective
        .get(keys::START_LEVEL)
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(0);
    let (default_level, default_autostart) = parse_start_level(default_start_level);

    let search = match effective.get(keys::SEARCH) {
        Some(pattern) => SearchFilter::Glob(Matcher::compile(pattern)),
        None => SearchFilter::Suffix(DEFAULT_SEARCH_SUFFIX.to_string()),
    };

    let relative_paths = walk_sorted(root, &search)?;

    let mut tagged: Vec<(String, BundleDeployment)> = relative_paths
        .into_iter()
        .map(|relative| {
            let uniform = uniform_path(&relative);
            let location = format!("{location_root}{uniform}");
            let mut deployment = BundleDeployment::new(location, default_actions.clone());
            deployment.start_level = default_level;
            deployment.autostart = default_autostart;
            let file_path = root.join(&relative);
            deployment.source = Some(Arc::new(move || {
                Ok(Box::new(std::fs::File::open(&file_path)?) as Box<dyn std::io::Read + Send>)
            }));
            (uniform, deployment)
        })
        .collect();

    apply_location_overrides(&effective, &mut tagged);
    apply_scoped_value_overrides(&effective, &mut tagged);

    Ok(tagged.into_iter().map(|(_, d)| d).collect())
}

/// Apply `start.level@<glob>` and `deployment.action@<glob>` overrides.
/// Each property name is resolved independently: a bundle can have its
/// start level overridden by one scoped pattern and its action set by a
/// completely different one. Within a single property name, ambiguous ties
/// (see [`best_match`]) leave that bundle's inherited default untouched.
fn apply_scoped_value_overrides(effective: &PropertyMap, tagged: &mut [(String, BundleDeployment)]) {
    let level_overrides = start_level_overrides(effective);
    let level_matchers: Vec<Matcher> = level_overrides.iter().map(|(m, _)| m.clone()).collect();

    let action_overrides = action_overrides(effective);
    let action_matchers: Vec<Matcher> = action_overrides.iter().map(|(m, _)| m.clone()).collect();

    for (relative, deployment) in tagged.iter_mut() {
        if let Some(idx) = best_match_index(&level_matchers, relative) {
            let (level, autostart) = parse_start_level(level_overrides[idx].1);
            deployment.start_level = level;
            deployment.autostart = autostart;
        }
        if let Some(idx) = best_match_index(&action_matchers, relative) {
            deployment.actions = action_overrides[idx].1.clone();
        }
    }
}

fn load_source_properties(root: &Path) -> Result<PropertyMap> {
    let path = root.join("deployment.properties");
    if path.is_file() {
        crate::properties::load(&path)
    } else {
        Ok(PropertyMap::new())
    }
}

/// `bundle.location.root` resolution: verbatim if it already ends in `:` or
/// `/`; otherwise treated as a URI prefix with a trailing `/` appended;
/// empty/missing falls back to `file:<source>/`.
fn resolve_location_root(effective: &PropertyMap, root: &Path) -> String {
    match effective.get(keys::LOCATION_ROOT).map(|s| s.as_str()) {
        Some(value) if value.ends_with(':') || value.ends_with('/') => value.to_string(),
        Some(value) if !value.is_empty() => format!("{value}/"),
        _ => format!("file:{}/", root.display()),
    }
}

/// BFS-layer ordering: by component count ascending, then lexicographic per
/// component -- platform-independent and deterministic regardless of
/// filesystem iteration order.
fn walk_sorted(root: &Path, search: &SearchFilter) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();

    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => continue,
        };
        let uniform = uniform_path(&relative);
        if search.matches(&uniform) {
            matches.push(relative);
        }
    }

    matches.sort_by(|a, b| {
        let a_components: Vec<_> = a.components().collect();
        let b_components: Vec<_> = b.components().collect();
        a_components
            .len()
            .cmp(&b_components.len())
            .then_with(|| uniform_path(a).cmp(&uniform_path(b)))
    });

    Ok(matches)
}

/// Join path components with `/`, independent of the host path separator.
fn uniform_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Apply `bundle.location@<glob>` overrides: reassign the location of an
/// already-discovered deployment whose *relative* uniform path matches, or
/// -- if no discovered deployment matches a given pattern at all --
/// synthesize a new sourceless deployment for it (an explicit uninstall
/// target).
fn apply_location_overrides(effective: &PropertyMap, tagged: &mut Vec<(String, BundleDeployment)>) {
    let scoped: Vec<(Matcher, String)> = effective
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(keys::LOCATION_SCOPE)
                .map(|pattern| (Matcher::compile(pattern), v.clone()))
        })
        .collect();

    if scoped.is_empty() {
        return;
    }

    let matchers: Vec<Matcher> = scoped.iter().map(|(m, _)| m.clone()).collect();
    let mut matched_any_pattern = vec![false; scoped.len()];

    for (relative, deployment) in tagged.iter_mut() {
        if let Some(idx) = best_match_index(&matchers, relative) {
            matched_any_pattern[idx] = true;
            deployment.location = scoped[idx].1.clone();
        }
    }

    for (idx, (_, value)) in scoped.iter().enumerate() {
        if matched_any_pattern[idx] {
            continue;
        }
        // No discovered bundle matched this pattern: define a sourceless
        // bundle directly, using the override value as its location.
        let mut deployment = BundleDeployment::new(value.clone(), ActionSet::all());
        deployment.source = None;
        tagged.push((value.clone(), deployment));
    }
}

fn best_match_index(matchers: &[Matcher], subject: &str) -> Option<usize> {
    let best = best_match(matchers, subject)?;
    matchers.iter().position(|m| m == best)
}

/// Collect every `start.level@<glob>` override declared by a source (plus
/// inherited launching-properties) as `(Matcher, raw_value)` pairs.
pub fn start_level_overrides(effective: &PropertyMap) -> Vec<(Matcher, i32)> {
    effective
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(keys::START_LEVEL_SCOPE)
                .and_then(|pattern| v.parse::<i32>().ok().map(|n| (Matcher::compile(pattern), n)))
        })
        .collect()
}

/// Collect every `deployment.action@<glob>` override as `(Matcher, ActionSet)`.
pub fn action_overrides(effective: &PropertyMap) -> Vec<(Matcher, ActionSet)> {
    effective
        .iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(keys::ACTION_SCOPE)
                .map(|pattern| (Matcher::compile(pattern), ActionSet::parse(v)))
        })
        .collect()
}

/// Recompute a source's effective property map the same way [`discover`]
/// does, for callers (the planner) that need to apply scoped overrides
/// after discovery using the same merged view.
pub fn effective_properties(root: &Path, launching_defaults: &PropertyMap) -> Result<PropertyMap> {
    let own = load_source_properties(root)?;
    let mut merged = launching_defaults.clone();
    for (k, v) in &own {
        merged.insert(k.clone(), v.clone());
    }
    Ok(merged)
}
