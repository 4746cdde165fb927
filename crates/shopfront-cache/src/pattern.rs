//! Key patterns for bulk invalidation.

use std::fmt;

/// A key pattern accepted by `remove_by_pattern`.
///
/// Matching is prefix-only on every backend. A single trailing `*` turns the
/// pattern into a prefix match; any other `*`, and any other glob
/// metacharacter, is matched literally. A pattern without the trailing `*`
/// matches exactly one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    /// Matches exactly this key.
    Exact(String),
    /// Matches every key starting with this prefix.
    Prefix(String),
}

impl KeyPattern {
    /// Trailing marker that makes a pattern a prefix match.
    pub const WILDCARD: char = '*';

    /// Parses a pattern string.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix(Self::WILDCARD) {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    /// Prepends `{namespace}:` to the key or prefix.
    #[must_use]
    pub fn namespaced(self, namespace: Option<&str>) -> Self {
        let Some(namespace) = namespace else {
            return self;
        };
        match self {
            Self::Exact(key) => Self::Exact(format!("{}:{}", namespace, key)),
            Self::Prefix(prefix) => Self::Prefix(format!("{}:{}", namespace, prefix)),
        }
    }

    /// Returns true if `key` is matched by this pattern.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Exact(exact) => key == exact,
            Self::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(key) => f.write_str(key),
            Self::Prefix(prefix) => write!(f, "{}{}", prefix, Self::WILDCARD),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(pattern: &str) -> Self {
        Self::parse(pattern)
    }
}
