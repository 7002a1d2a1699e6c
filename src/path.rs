//! # Jailed Paths
//!
//! The one path type every store receives.
//!
//! ## Overview
//!
//! A [`JailedPath`] is an ordered list of name segments relative to a fixed
//! root (the *jail*). Raw strings are parsed exactly once, here, so no backend
//! ever sees `..`, `.`, empty segments or an absolute path it could be tricked
//! into following.
//!
//! ## Resolution Rules
//!
//! | Input | Effect |
//! |-------|--------|
//! | `a/b` | descend into `a`, then `b` |
//! | `/a` | restart at the jail root, then descend into `a` |
//! | `.` or empty segment (`a//b`) | skipped |
//! | `..` | drop the last segment; at the root it is absorbed |
//! | `a\b` | same as `a/b`; backslash also separates |
//! | `C:` prefix on a segment | removed (`C:\x` is `/x`) |
//!
//! Backslashes and drive prefixes are normalized away so that no segment can
//! turn into a traversal or an absolute path once a backend maps it onto a
//! host path.
//!
//! ```rust
//! use resourcefs::JailedPath;
//!
//! let base = JailedPath::parse("/srv/app");
//! assert_eq!(base.resolve("../../../etc/passwd").to_string(), "/etc/passwd");
//! assert_eq!(JailedPath::root().resolve("../.."), JailedPath::root());
//! assert_eq!(JailedPath::parse("..\\..\\evil.txt").to_string(), "/evil.txt");
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Separator between segments in raw path strings and in zip entry names.
pub const SEPARATOR: char = '/';

/// Every character that splits segments on input.
pub(crate) const SEPARATORS: [char; 2] = [SEPARATOR, '\\'];

/// Returns `true` for segments that start with a drive prefix (`C:`).
pub(crate) fn has_drive_prefix(segment: &str) -> bool {
    matches!(segment.as_bytes(), [letter, b':', ..] if letter.is_ascii_alphabetic())
}

/// A normalized path that can never point outside its root.
///
/// Values are immutable; [`child`](Self::child), [`parent`](Self::parent) and
/// [`resolve`](Self::resolve) all return new paths. Equality, hashing and
/// ordering are structural over the segments, so two paths built in different
/// ways are interchangeable when their segments match.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JailedPath {
    segments: Vec<String>,
}

impl JailedPath {
    /// The jail root (zero segments).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a raw path against the root.
    pub fn parse(raw: &str) -> Self {
        Self::root().resolve(raw)
    }

    /// Resolve a raw `/`-separated path relative to this one.
    ///
    /// A leading `/` restarts at the jail root. `..` never climbs above the
    /// root. `\` separates like `/`, and drive prefixes are removed.
    pub fn resolve(&self, raw: &str) -> Self {
        let mut segments = if raw.starts_with(SEPARATORS) {
            Vec::new()
        } else {
            self.segments.clone()
        };
        for segment in raw.split(SEPARATORS) {
            let segment = if has_drive_prefix(segment) { &segment[2..] } else { segment };
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                name => segments.push(name.to_owned()),
            }
        }
        Self { segments }
    }

    /// Append a single name.
    ///
    /// Names that contain a separator or a drive prefix, or are `.`/`..`,
    /// are resolved as a relative path instead, so a child can never escape
    /// through its name.
    pub fn child(&self, name: &str) -> Self {
        if matches!(name, "" | "." | "..")
            || name.contains(SEPARATORS)
            || has_drive_prefix(name)
        {
            return self.resolve(name.trim_start_matches(SEPARATORS));
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_owned());
        Self { segments }
    }

    /// The containing path. The root is its own parent.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Append every segment of `other`.
    pub fn join(&self, other: &JailedPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// All segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments below the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the jail root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if `ancestor` is this path or one of its parents.
    pub fn starts_with(&self, ancestor: &JailedPath) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// The remainder of this path below `ancestor`.
    pub fn strip_prefix(&self, ancestor: &JailedPath) -> Option<JailedPath> {
        self.segments
            .strip_prefix(ancestor.segments.as_slice())
            .map(|rest| Self {
                segments: rest.to_vec(),
            })
    }

    /// Segments joined by `/` without a leading separator (`""` for the root).
    pub fn to_relative_string(&self) -> String {
        self.segments.join("/")
    }
}

impl fmt::Display for JailedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for JailedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JailedPath({self})")
    }
}

impl FromStr for JailedPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for JailedPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for JailedPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for JailedPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
