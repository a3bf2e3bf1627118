//! File name mapping used by the present and depend selectors.

use std::fmt;
use std::rc::Rc;

/// Maps a source name to zero or more target names.
///
/// `None` means "no mapping", which selectors treat as "not selected".
pub trait FileNameMapper: fmt::Debug {
    fn map_file_name(&self, name: &str) -> Option<Vec<String>>;
}

/// The built-in mappers, plus an escape hatch for caller-supplied ones.
#[derive(Debug, Clone)]
pub enum Mapper {
    /// The target name equals the source name.
    Identity,

    /// Strips all leading directories.
    Flatten,

    /// Rewrites `from` to `to`, each with at most one `*` wildcard.
    Glob { from: String, to: String },

    /// Maps every name to the same target.
    Merge { to: String },

    Custom(Rc<dyn FileNameMapper>),
}

impl Mapper {
    pub fn glob(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Glob {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn merge(to: impl Into<String>) -> Self {
        Self::Merge { to: to.into() }
    }
}

impl FileNameMapper for Mapper {
    fn map_file_name(&self, name: &str) -> Option<Vec<String>> {
        match self {
            Self::Identity => Some(vec![name.to_string()]),
            Self::Flatten => {
                let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
                Some(vec![base.to_string()])
            }
            Self::Glob { from, to } => glob_map(from, to, name).map(|n| vec![n]),
            Self::Merge { to } => Some(vec![to.clone()]),
            Self::Custom(inner) => inner.map_file_name(name),
        }
    }
}

fn split_star(pattern: &str) -> (&str, Option<&str>) {
    match pattern.find('*') {
        Some(i) => (&pattern[..i], Some(&pattern[i + 1..])),
        None => (pattern, None),
    }
}

fn glob_map(from: &str, to: &str, name: &str) -> Option<String> {
    let (from_prefix, from_suffix) = split_star(from);
    let middle = match from_suffix {
        None => {
            if name != from {
                return None;
            }
            ""
        }
        Some(suffix) => {
            if name.len() < from_prefix.len() + suffix.len()
                || !name.starts_with(from_prefix)
                || !name.ends_with(suffix)
            {
                return None;
            }
            &name[from_prefix.len()..name.len() - suffix.len()]
        }
    };
    let (to_prefix, to_suffix) = split_star(to);
    Some(match to_suffix {
        Some(suffix) => format!("{to_prefix}{middle}{suffix}"),
        None => to_prefix.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_rewrites_the_wildcard_part() {
        let m = Mapper::glob("*.java", "*.class");
        assert_eq!(
            m.map_file_name("org/x/A.java"),
            Some(vec!["org/x/A.class".to_string()])
        );
        assert_eq!(m.map_file_name("A.txt"), None);
    }

    #[test]
    fn glob_prefix_and_suffix_must_not_overlap() {
        let m = Mapper::glob("ab*ba", "x*");
        assert_eq!(m.map_file_name("aba"), None);
        assert_eq!(m.map_file_name("abba"), Some(vec!["x".to_string()]));
    }

    #[test]
    fn flatten_and_merge() {
        assert_eq!(
            Mapper::Flatten.map_file_name("a/b/c.txt"),
            Some(vec!["c.txt".to_string()])
        );
        assert_eq!(
            Mapper::merge("all.jar").map_file_name("a/b/c.txt"),
            Some(vec!["all.jar".to_string()])
        );
    }
}
