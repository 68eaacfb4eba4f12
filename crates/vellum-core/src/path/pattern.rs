//! Allow-list patterns for signing paths.

use std::fmt;

use super::{cleanup, DerivationPath, PathOptions, ROOT};
use crate::error::CoreError;

/// Pattern text that admits every path.
pub const ANY_PATH: &str = "any";

/// One entry of a path allow-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches every path.
    Any,
    /// Matches exactly this path.
    Exact(DerivationPath),
    /// Matches `prefix/N` (or `prefix/N'` when `hardened`) for any `N`.
    Wildcard {
        /// Components before the wildcard; the path must match them exactly.
        prefix: DerivationPath,
        /// Hardness the final path component must have.
        hardened: bool,
    },
}

impl PathPattern {
    /// Normalize and parse pattern text.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the text is neither [`ANY_PATH`]
    /// nor a path whose last component may be a wildcard.
    pub fn parse(text: &str, max_depth: usize) -> Result<Self, CoreError> {
        if text == ANY_PATH {
            return Ok(Self::Any);
        }
        let options = PathOptions {
            max_depth,
            allow_wildcard: true,
        };
        let canonical = cleanup(text, &options)?;
        Self::from_canonical(&canonical)
    }

    /// Parse pattern text already in canonical form, without normalizing.
    pub(crate) fn from_canonical(text: &str) -> Result<Self, CoreError> {
        if text == ANY_PATH {
            return Ok(Self::Any);
        }
        if let Some(prefix) = text.strip_suffix("/*'") {
            return Ok(Self::Wildcard {
                prefix: DerivationPath::from_canonical(prefix)?,
                hardened: true,
            });
        }
        if let Some(prefix) = text.strip_suffix("/*") {
            return Ok(Self::Wildcard {
                prefix: DerivationPath::from_canonical(prefix)?,
                hardened: false,
            });
        }
        DerivationPath::from_canonical(text).map(Self::Exact)
    }

    /// Whether `path` is admitted by this pattern.
    ///
    /// A wildcard only matches a path exactly one component longer than its
    /// prefix, and only when the final component's hardness agrees.
    #[must_use]
    pub fn matches(&self, path: &DerivationPath) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => exact == path,
            Self::Wildcard { prefix, hardened } => path
                .components()
                .split_last()
                .is_some_and(|(last, head)| {
                    last.is_hardened() == *hardened && head == prefix.components()
                }),
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(ANY_PATH),
            Self::Exact(path) => write!(f, "{path}"),
            Self::Wildcard { prefix, hardened } => {
                write!(f, "{prefix}/*")?;
                if *hardened {
                    f.write_str("'")?;
                }
                Ok(())
            }
        }
    }
}

/// A set of allowed path patterns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathPolicy {
    patterns: Vec<PathPattern>,
}

impl PathPolicy {
    /// Build a policy from parsed patterns.
    #[must_use]
    pub const fn new(patterns: Vec<PathPattern>) -> Self {
        Self { patterns }
    }

    /// Parse every pattern, failing on the first bad one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] from [`PathPattern::parse`].
    pub fn parse<I, S>(patterns: I, max_depth: usize) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| PathPattern::parse(p.as_ref(), max_depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Patterns in declaration order.
    #[must_use]
    pub fn patterns(&self) -> &[PathPattern] {
        &self.patterns
    }

    /// Whether any pattern admits `path`. An empty policy admits nothing.
    #[must_use]
    pub fn allows(&self, path: &DerivationPath) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    /// Canonical text of every pattern.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        self.patterns.iter().map(ToString::to_string).collect()
    }
}

/// Match a normalized path against normalized pattern strings.
///
/// True when [`ANY_PATH`] is listed, when a pattern equals the path, or when
/// a wildcard pattern admits it. Both sides must already be canonical (as
/// produced by [`cleanup`] or [`PathPolicy::to_strings`]); patterns are not
/// re-normalized, and one that is not canonical matches nothing.
#[must_use]
pub fn match_path<S: AsRef<str>>(patterns: &[S], path: &str) -> bool {
    if patterns.iter().any(|p| p.as_ref() == ANY_PATH) {
        return true;
    }
    let Ok(path) = DerivationPath::from_canonical(if path.is_empty() { ROOT } else { path }) else {
        return false;
    };
    patterns.iter().any(|p| {
        PathPattern::from_canonical(p.as_ref()).is_ok_and(|pattern| pattern.matches(&path))
    })
}
