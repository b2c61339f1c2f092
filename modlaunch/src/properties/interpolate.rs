//! `${name}` placeholder interpolation (C6).
//!
//! Substitution is single-pass: the replacement text is never re-scanned
//! for further placeholders. A placeholder whose name the lookup function
//! does not recognize is preserved verbatim, including its `${` `}`
//! delimiters.

/// Interpolate `${name}` occurrences in `template` using `lookup`.
pub fn interpolate(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = template[i + 2..].find('}') {
                let name = &template[i + 2..i + 2 + end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                i = i + 2 + end + 1;
                continue;
            }
        }
        // Not a placeholder start (or unterminated): copy one char verbatim.
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

/// Interpolate every value in a key/value map in place, using the map
/// itself (plus any extra bindings in `extra`, which take precedence) as
/// the lookup source. Each value is interpolated once against the
/// *original* map -- interpolation does not see other values' replacements,
/// matching the single-pass, no-recursive-substitution contract.
pub fn interpolate_map(
    map: &std::collections::BTreeMap<String, String>,
    extra: &std::collections::BTreeMap<String, String>,
) -> std::collections::BTreeMap<String, String> {
    let lookup = |name: &str| -> Option<String> {
        extra
            .get(name)
            .or_else(|| map.get(name))
            .cloned()
    };

    map.iter()
        .map(|(k, v)| (k.clone(), interpolate(v, lookup)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn substitutes_known_placeholder() {
        let out = interpolate("${home}/etc", |n| {
            (n == "home").then(|| "/var/launch".to_string())
        });
        assert_eq!(out, "/var/launch/etc");
    }

    #[test]
    fn preserves_unknown_placeholder() {
        let out = interpolate("${unknown}/etc", |_| None);
        assert_eq!(out, "${unknown}/etc");
    }

    #[test]
    fn single_pass_no_reinterpolation() {
        // The replacement for "a" itself contains "${b}"; it must not be
        // substituted again.
        let out = interpolate("${a}", |n| (n == "a").then(|| "${b}".to_string()));
        assert_eq!(out, "${b}");
    }

    #[test]
    fn idempotent_on_plain_text() {
        let out = interpolate("no placeholders here", |_| None);
        assert_eq!(out, "no placeholders here");
    }

    #[test]
    fn map_extra_takes_precedence() {
        let mut map = BTreeMap::new();
        map.insert("storage".to_string(), "${launcher.instance}/data".to_string());
        let mut extra = BTreeMap::new();
        extra.insert("launcher.instance".to_string(), "/inst".to_string());

        let out = interpolate_map(&map, &extra);
        assert_eq!(out.get("storage").unwrap(), "/inst/data");
    }
}
