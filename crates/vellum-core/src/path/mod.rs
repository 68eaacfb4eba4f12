//! Hierarchical derivation paths: normalization, binary form, and policy.
//!
//! This module provides:
//! - [`cleanup`]: normalize path text to the canonical `m/44'/0'` form
//! - [`DerivationPath`] / [`PathComponent`]: the typed, validated path
//! - [`keypath_to_string`] / [`string_to_keypath`]: the 32-bit word form
//!   (fingerprint first, then one word per component, bit 31 = hardened)
//! - [`PathPattern`] / [`PathPolicy`] / [`match_path`]: allow-list matching
//!   with a final-position wildcard
//!
//! # Text Grammar
//!
//! ```text
//! path := ("m" | "m/") comp ("/" comp)* | ""
//! comp := digits ["'"] | "*" ["'"]
//! ```
//!
//! `p` and `h` are accepted as hardened markers and rewritten to `'`.
//! Wildcards are only legal in policy patterns, and only in last position.

mod pattern;

pub use pattern::{match_path, PathPattern, PathPolicy, ANY_PATH};

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::fingerprint::Fingerprint;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bit 31 of a component word marks a hardened step.
pub const HARDENED: u32 = 0x8000_0000;

/// Deepest path the firmware accepts.
pub const MAX_PATH_DEPTH: usize = 12;

/// Text form of the root path.
pub const ROOT: &str = "m";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Knobs for [`cleanup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathOptions {
    /// Maximum number of components, wildcard included.
    pub max_depth: usize,
    /// Accept `*` or `*'` as the final component.
    pub allow_wildcard: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_PATH_DEPTH,
            allow_wildcard: false,
        }
    }
}

impl PathOptions {
    /// Options for policy patterns: default depth, wildcard allowed.
    #[must_use]
    pub fn pattern() -> Self {
        Self {
            allow_wildcard: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize derivation path text.
///
/// - input must be ASCII; case is ignored
/// - `p`, `h` and `'` all mean hardened; output always uses `'`
/// - the `m/` prefix is optional on input and always present on output
/// - an empty input is the root, `"m"`
///
/// # Errors
///
/// Returns [`CoreError::Validation`] naming the problem: non-ASCII input,
/// characters outside the grammar, too many components, or an empty,
/// non-numeric, zero-padded, or out-of-range component.
pub fn cleanup(input: impl AsRef<[u8]>, options: &PathOptions) -> Result<String, CoreError> {
    let raw = input.as_ref();
    if !raw.is_ascii() {
        return Err(CoreError::Validation("path must be ASCII".into()));
    }

    let text: String = raw
        .iter()
        .map(|b| match b.to_ascii_lowercase() {
            b'p' | b'h' => '\'',
            c => char::from(c),
        })
        .collect();
    if text.is_empty() {
        return Ok(ROOT.into());
    }
    check_characters(&text, options.allow_wildcard)?;

    let mut parts: Vec<&str> = text.split('/').collect();
    if parts.first() == Some(&ROOT) {
        parts.remove(0);
    }
    if parts.is_empty() {
        return Ok(ROOT.into());
    }

    if parts.len() > options.max_depth {
        return Err(CoreError::Validation(format!(
            "too deep: {} components (maximum {})",
            parts.len(),
            options.max_depth
        )));
    }

    for part in &parts {
        if part.is_empty() || *part == "'" {
            return Err(CoreError::Validation("empty path component".into()));
        }
        if options.allow_wildcard && part.contains('*') {
            if *part != "*" && *part != "*'" {
                return Err(CoreError::Validation(format!("bad wildcard: {part}")));
            }
            continue;
        }
        part.parse::<PathComponent>()?;
    }

    Ok(format!("{ROOT}/{}", parts.join("/")))
}

/// Reject anything outside `m`, digits, `/`, `'` and a trailing wildcard.
fn check_characters(text: &str, allow_wildcard: bool) -> Result<(), CoreError> {
    let bytes = text.as_bytes();
    let last = bytes.len().saturating_sub(1);

    for (i, &b) in bytes.iter().enumerate() {
        let ok = match b {
            b'0'..=b'9' | b'/' | b'\'' => true,
            b'm' => i == 0,
            b'*' => {
                allow_wildcard
                    && (i == last || (i.saturating_add(1) == last && bytes[last] == b'\''))
            }
            _ => false,
        };
        if !ok {
            return Err(CoreError::Validation(format!(
                "invalid character {:?} at offset {i}",
                char::from(b)
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One derivation step: a 31-bit index and a hardened flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PathComponent {
    index: u32,
    hardened: bool,
}

impl PathComponent {
    /// Build a component.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `index` has bit 31 set.
    pub fn new(index: u32, hardened: bool) -> Result<Self, CoreError> {
        if index & HARDENED != 0 {
            return Err(CoreError::Validation(format!(
                "component index {index} out of range"
            )));
        }
        Ok(Self { index, hardened })
    }

    /// Unpack a 32-bit word: low 31 bits are the index, bit 31 hardened.
    #[must_use]
    pub const fn from_raw(word: u32) -> Self {
        Self {
            index: word & !HARDENED,
            hardened: word & HARDENED != 0,
        }
    }

    /// Pack into a 32-bit word.
    #[must_use]
    pub const fn raw(self) -> u32 {
        if self.hardened {
            self.index | HARDENED
        } else {
            self.index
        }
    }

    /// The 31-bit index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Whether this step is hardened.
    #[must_use]
    pub const fn is_hardened(self) -> bool {
        self.hardened
    }
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)?;
        if self.hardened {
            f.write_str("'")?;
        }
        Ok(())
    }
}

/// Parses one canonical component (`44` or `44'`).
impl FromStr for PathComponent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = s
            .strip_suffix('\'')
            .map_or((s, false), |digits| (digits, true));

        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        let index = if canonical {
            digits.parse::<u32>().ok().filter(|i| i & HARDENED == 0)
        } else {
            None
        };

        index
            .map(|index| Self { index, hardened })
            .ok_or_else(|| CoreError::Validation(format!("bad component: {s}")))
    }
}

/// A concrete path below the implicit root `m`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<PathComponent>);

impl DerivationPath {
    /// The root path, `m`.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Normalize and parse path text. Wildcards are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] as described for [`cleanup`].
    pub fn parse(text: impl AsRef<[u8]>, max_depth: usize) -> Result<Self, CoreError> {
        let options = PathOptions {
            max_depth,
            allow_wildcard: false,
        };
        Self::from_canonical(&cleanup(text, &options)?)
    }

    /// Parse text already in canonical form.
    pub(crate) fn from_canonical(text: &str) -> Result<Self, CoreError> {
        if text == ROOT {
            return Ok(Self::root());
        }
        let body = text
            .strip_prefix("m/")
            .ok_or_else(|| CoreError::Validation(format!("not a canonical path: {text}")))?;
        body.split('/')
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Build from components.
    #[must_use]
    pub const fn from_components(components: Vec<PathComponent>) -> Self {
        Self(components)
    }

    /// Components in derivation order.
    #[must_use]
    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }

    /// Number of components below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Split a word-form keypath into its fingerprint and path.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `words` is empty.
    pub fn from_keypath(words: &[u32]) -> Result<(Fingerprint, Self), CoreError> {
        let (&xfp, rest) = words
            .split_first()
            .ok_or_else(|| CoreError::Validation("keypath missing fingerprint".into()))?;
        let path = rest.iter().copied().map(PathComponent::from_raw).collect();
        Ok((Fingerprint::new(xfp), Self(path)))
    }

    /// Word form: the fingerprint, then one packed word per component.
    #[must_use]
    pub fn to_keypath(&self, xfp: Fingerprint) -> Vec<u32> {
        std::iter::once(xfp.value())
            .chain(self.0.iter().map(|c| c.raw()))
            .collect()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROOT)?;
        for component in &self.0 {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, MAX_PATH_DEPTH)
    }
}

// ---------------------------------------------------------------------------
// Word form
// ---------------------------------------------------------------------------

/// Render a word-form keypath as text, skipping the leading fingerprint.
#[must_use]
pub fn keypath_to_string(words: &[u32]) -> String {
    let rest = words.get(1..).unwrap_or(&[]);
    DerivationPath(rest.iter().copied().map(PathComponent::from_raw).collect()).to_string()
}

/// Build a word-form keypath from a fingerprint and path text.
///
/// The `m` marker and empty segments (doubled or trailing slashes) are
/// skipped.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if any segment is not a component.
pub fn string_to_keypath(xfp: Fingerprint, path: &str) -> Result<Vec<u32>, CoreError> {
    let mut words = vec![xfp.value()];
    for segment in path.split('/') {
        if segment.is_empty() || segment == ROOT {
            continue;
        }
        words.push(segment.parse::<PathComponent>()?.raw());
    }
    Ok(words)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(s: &str) -> Result<String, CoreError> {
        cleanup(s, &PathOptions::default())
    }

    #[test]
    fn empty_is_root() {
        assert_eq!(clean("").unwrap(), "m");
        assert_eq!(clean("m").unwrap(), "m");
    }

    #[test]
    fn hardened_aliases_become_prime() {
        assert_eq!(clean("m/44h/0h/0h").unwrap(), "m/44'/0'/0'");
        assert_eq!(clean("44p/0p").unwrap(), "m/44'/0'");
        assert_eq!(clean("M/84H/1'/0P/7").unwrap(), "m/84'/1'/0'/7");
    }

    #[test]
    fn prefix_is_optional() {
        assert_eq!(clean("1/2/3").unwrap(), "m/1/2/3");
        assert_eq!(clean("m/1/2/3").unwrap(), "m/1/2/3");
    }

    #[test]
    fn rejects_out_of_range_component() {
        let result = clean("m/2147483648");
        assert!(
            matches!(result, Err(CoreError::Validation(ref msg)) if msg.contains("2147483648")),
            "out-of-range component must be named, got {result:?}"
        );
        assert_eq!(clean("m/2147483647'").unwrap(), "m/2147483647'");
    }

    #[test]
    fn rejects_too_deep() {
        let deep = vec!["0"; MAX_PATH_DEPTH + 1].join("/");
        assert!(matches!(clean(&deep), Err(CoreError::Validation(ref m)) if m.contains("deep")));
        let ok = vec!["0"; MAX_PATH_DEPTH].join("/");
        assert!(clean(&ok).is_ok());
    }

    #[test]
    fn custom_depth_is_honoured() {
        let options = PathOptions {
            max_depth: 2,
            allow_wildcard: false,
        };
        assert!(cleanup("m/1/2", &options).is_ok());
        assert!(cleanup("m/1/2/3", &options).is_err());
    }

    #[test]
    fn rejects_empty_components() {
        for bad in ["m/", "m//1", "/1", "1/", "m/'", "m/1/'/2"] {
            assert!(clean(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejects_junk() {
        for bad in ["m/1a", "x/1", "m/-1", "m/1 ", "m/01", "m/1''", "mm/1", "m/1/m"] {
            assert!(clean(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn rejects_non_ascii() {
        let result = cleanup("m/44\u{2032}".as_bytes(), &PathOptions::default());
        assert!(matches!(result, Err(CoreError::Validation(ref m)) if m.contains("ASCII")));
    }

    #[test]
    fn wildcard_only_when_allowed_and_last() {
        let pat = PathOptions::pattern();
        assert_eq!(cleanup("m/84h/0h/0h/*", &pat).unwrap(), "m/84'/0'/0'/*");
        assert_eq!(cleanup("84p/*h", &pat).unwrap(), "m/84'/*'");
        assert!(clean("m/84'/*").is_err());
        assert!(cleanup("m/*/1", &pat).is_err());
        assert!(cleanup("m/1*", &pat).is_err());
        assert!(cleanup("m/**", &pat).is_err());
    }

    #[test]
    fn component_word_packing() {
        let c = PathComponent::new(44, true).unwrap();
        assert_eq!(c.raw(), 0x8000_002C);
        assert_eq!(PathComponent::from_raw(0x8000_002C), c);
        assert_eq!(c.to_string(), "44'");
        assert!(PathComponent::new(HARDENED, false).is_err());
    }

    #[test]
    fn path_text_roundtrip() {
        let path: DerivationPath = "m/84h/0h/0h/1/5".parse().unwrap();
        assert_eq!(path.depth(), 5);
        assert_eq!(path.to_string(), "m/84'/0'/0'/1/5");
        assert_eq!(DerivationPath::root().to_string(), "m");
    }

    #[test]
    fn keypath_words_roundtrip() {
        let xfp = Fingerprint::new(0x0F05_6943);
        let path: DerivationPath = "m/44'/0'/0'/0/3".parse().unwrap();
        let words = path.to_keypath(xfp);
        assert_eq!(words[0], 0x0F05_6943);
        assert_eq!(words[1], 44 | HARDENED);

        let (back_xfp, back) = DerivationPath::from_keypath(&words).unwrap();
        assert_eq!(back_xfp, xfp);
        assert_eq!(back, path);
        assert_eq!(keypath_to_string(&words), "m/44'/0'/0'/0/3");
    }

    #[test]
    fn keypath_root_renders_as_m() {
        assert_eq!(keypath_to_string(&[0x1234]), "m");
        assert_eq!(keypath_to_string(&[]), "m");
        assert!(DerivationPath::from_keypath(&[]).is_err());
    }

    #[test]
    fn string_to_keypath_skips_empty_segments() {
        let xfp = Fingerprint::new(7);
        let words = string_to_keypath(xfp, "m/1'//2/").unwrap();
        assert_eq!(words, vec![7, 1 | HARDENED, 2]);
        assert!(string_to_keypath(xfp, "m/x").is_err());
    }
}
