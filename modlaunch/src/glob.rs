//! Restricted glob -> regex compiler (C5: Bundle Path Matcher).
//!
//! Supports exactly three wildcard forms: `?` (one non-separator character),
//! `**` (anything, including separators), and `*` (anything but a
//! separator). Every other character is escaped and matched literally.
//! Patterns are ranked by their count of literal (non-wildcard,
//! non-escaped-metacharacter) characters, so the most specific match wins
//! when several scoped overrides apply to the same bundle.

use regex::Regex;
use std::cmp::Ordering;

/// A compiled restricted glob, along with its original source and ranking.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    regex: Regex,
    rank: usize,
}

impl Matcher {
    /// Compile a restricted glob pattern.
    ///
    /// `?` -> `[^/]`, `**` -> `.*`, `*` -> `[^/]*`. All other characters are
    /// regex-escaped. The rank is the number of source characters that are
    /// neither a wildcard token nor an escaped regex metacharacter.
    pub fn compile(pattern: &str) -> Matcher {
        let mut body = String::with_capacity(pattern.len() * 2);
        body.push('^');
        let mut rank = 0usize;

        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '*' && chars.get(i + 1) == Some(&'*') {
                body.push_str(".*");
                i += 2;
                continue;
            }
            if c == '*' {
                body.push_str("[^/]*");
                i += 1;
                continue;
            }
            if c == '?' {
                body.push_str("[^/]");
                i += 1;
                continue;
            }
            // Literal character. Only characters that need no escaping
            // count towards the rank -- escaped regex metacharacters do not,
            // matching the design's "neither wildcards nor escaped
            // metacharacters" ranking rule.
            if !regex_syntax_is_meta(c) {
                rank += 1;
            }
            for escaped in regex_syntax_escape(c) {
                body.push(escaped);
            }
            i += 1;
        }
        body.push('$');

        // The pattern language is restricted enough that a compile failure
        // would indicate a bug in this translator, not user input.
        let regex = Regex::new(&body)
            .unwrap_or_else(|e| panic!("restricted glob compiled to invalid regex: {e}"));

        Matcher {
            pattern: pattern.to_string(),
            regex,
            rank,
        }
    }

    /// The original, uncompiled pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The literal-character ranking used to break ties between matchers.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Test a path (or bundle location string) against the compiled pattern.
    pub fn test(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}
impl Eq for Matcher {}

impl PartialOrd for Matcher {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Descending by rank, then lexicographic over the original pattern --
/// deterministic and consistent with equality.
impl Ord for Matcher {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .rank
            .cmp(&self.rank)
            .then_with(|| self.pattern.cmp(&other.pattern))
    }
}

fn regex_syntax_escape(c: char) -> Vec<char> {
    if regex_syntax_is_meta(c) {
        vec!['\\', c]
    } else {
        vec![c]
    }
}

fn regex_syntax_is_meta(c: char) -> bool {
    matches!(
        c,
        '\\' | '.'
            | '+'
            | '('
            | ')'
            | '|'
            | '['
            | ']'
            | '{'
            | '}'
            | '^'
            | '$'
            | '*'
            | '?'
    )
}

/// Pick the best-rank subset of matchers (from `candidates`) whose pattern
/// matches `subject`. Returns `None` if no matcher matches or if more than
/// one matcher shares the highest rank (an ambiguous scoped override --
/// callers should log a warning and apply no override in that case).
pub fn best_match<'a>(candidates: &'a [Matcher], subject: &str) -> Option<&'a Matcher> {
    let mut best: Vec<&Matcher> = Vec::new();
    let mut best_rank = None;

    for m in candidates {
        if !m.test(subject) {
            continue;
        }
        match best_rank {
            None => {
                best_rank = Some(m.rank());
                best.push(m);
            }
            Some(r) if m.rank() > r => {
                best_rank = Some(m.rank());
                best.clear();
                best.push(m);
            }
            Some(r) if m.rank() == r => {
                best.push(m);
            }
            _ => {}
        }
    }

    match best.len() {
        1 => Some(best[0]),
        _ => None,
    }
}
