//! Glob matching over `/`-separated relative names.
//!
//! `*` matches any run of characters inside one segment, `?` exactly one
//! character, and a segment made only of `**` matches zero or more whole
//! segments. Matches are anchored at both ends. Every other character,
//! including `[`, `]`, `{` and `}`, is literal.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::SelectError;

/// The recursive-descent segment.
pub const DEEP_TREE_MATCH: &str = "**";

/// Match a single pattern against a relative name.
///
/// Invalid patterns never match.
pub fn matches(pattern: &str, candidate: &str, case_sensitive: bool) -> bool {
    PatternMatcher::new([pattern], case_sensitive)
        .map(|m| m.is_match(candidate))
        .unwrap_or(false)
}

/// Normalise a user-supplied pattern: `\` becomes `/`, and a trailing `/`
/// becomes `/**`.
pub fn normalize_pattern(pattern: &str) -> String {
    let mut p = pattern.trim().replace('\\', "/");
    if p.ends_with('/') {
        p.push_str(DEEP_TREE_MATCH);
    }
    p
}

/// A compiled list of patterns; a name matches when any pattern matches.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: Vec<String>,
    set: GlobSet,
    // Patterns ending in `/**` with that suffix removed: a directory matching
    // one of these has every descendant matched too.
    subtree: GlobSet,
    matches_root: bool,
}

impl PatternMatcher {
    pub fn new<I, S>(patterns: I, case_sensitive: bool) -> Result<Self, SelectError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = GlobSetBuilder::new();
        let mut subtree = GlobSetBuilder::new();
        let mut matches_root = false;
        let mut kept = Vec::new();

        for raw in patterns {
            let pattern = normalize_pattern(raw.as_ref());
            let segments = collapse_segments(&pattern);

            if segments.iter().all(|s| *s == DEEP_TREE_MATCH) {
                matches_root = true;
            }

            set.add(compile(&segments, case_sensitive)?);

            if segments.len() > 1 && segments.last() == Some(&DEEP_TREE_MATCH) {
                let parent = &segments[..segments.len() - 1];
                // `dir/**` also matches `dir` itself.
                let glob = compile(parent, case_sensitive)?;
                set.add(glob.clone());
                subtree.add(glob);
            }
            kept.push(pattern);
        }

        let build = |b: GlobSetBuilder| {
            b.build()
                .map_err(|e| SelectError::Config(format!("invalid pattern: {e}")))
        };

        Ok(Self {
            patterns: kept,
            set: build(set)?,
            subtree: build(subtree)?,
            matches_root,
        })
    }

    /// Whether `name` (relative, `/` or `\` separated) matches any pattern.
    /// The empty name stands for the scan root.
    pub fn is_match(&self, name: &str) -> bool {
        if name.is_empty() {
            return self.matches_root;
        }
        if name.contains('\\') {
            return self.set.is_match(name.replace('\\', "/"));
        }
        self.set.is_match(name)
    }

    /// Whether every name below directory `dir` is guaranteed to match.
    pub fn matches_subtree(&self, dir: &str) -> bool {
        if dir.is_empty() {
            return self.matches_root;
        }
        self.subtree.is_match(dir)
    }

    /// The normalised patterns, in insertion order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Split into segments, folding runs of `**` segments into one. Only a
/// segment of exactly `**` crosses directories.
fn collapse_segments(pattern: &str) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for seg in pattern.split('/') {
        if seg == DEEP_TREE_MATCH && out.last() == Some(&DEEP_TREE_MATCH) {
            continue;
        }
        out.push(seg);
    }
    out
}

fn compile(segments: &[&str], case_sensitive: bool) -> Result<globset::Glob, SelectError> {
    let glob = segments
        .iter()
        .map(|s| translate_segment(s))
        .collect::<Vec<_>>()
        .join("/");

    GlobBuilder::new(&glob)
        .literal_separator(true)
        .backslash_escape(true)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| SelectError::Config(format!("invalid pattern {glob}: {e}")))
}

fn translate_segment(segment: &str) -> String {
    if segment == DEEP_TREE_MATCH {
        return segment.to_string();
    }
    let mut out = String::with_capacity(segment.len());
    let mut prev_star = false;
    for c in segment.chars() {
        match c {
            // `a**b` inside a segment is just `a*b`.
            '*' if prev_star => continue,
            '*' | '?' => out.push(c),
            '[' | ']' | '{' | '}' | ',' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        prev_star = c == '*';
    }
    out
}
