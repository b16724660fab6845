//! Semantic version parsing, comparison, and constraint matching.
//!
//! Versions follow `MAJOR.MINOR.PATCH[-prerelease][+build]`. Comparison
//! looks at the three numeric components only; prerelease and build
//! metadata are carried but never ordered. That is a documented limitation
//! of the host policy, not an oversight.

mod manager;

pub use manager::{UpdateInfo, UpdatePolicy, UpdateSource, VersionManager};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PluginError, PluginResult};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?(?:\+([0-9A-Za-z.-]+))?$")
        .expect("version regex is valid")
});

/// A parsed semantic version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
            build: None,
        }
    }

    /// Parses a version string. Missing minor/patch components are treated
    /// as 0; anything outside the grammar is an error, never coerced.
    pub fn parse(input: &str) -> PluginResult<Self> {
        let caps = VERSION_RE
            .captures(input.trim())
            .ok_or_else(|| PluginError::InvalidVersion {
                input: input.to_string(),
                reason: "does not match MAJOR.MINOR.PATCH[-pre][+build]".into(),
            })?;

        let component = |idx: usize| -> PluginResult<u64> {
            match caps.get(idx) {
                None => Ok(0),
                Some(m) => m.as_str().parse().map_err(|_| PluginError::InvalidVersion {
                    input: input.to_string(),
                    reason: format!("component '{}' is not a valid integer", m.as_str()),
                }),
            }
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            pre: caps.get(4).map(|m| m.as_str().to_string()),
            build: caps.get(5).map(|m| m.as_str().to_string()),
        })
    }

    /// Whether `input` parses as a version.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Orders by major, then minor, then patch. Prerelease and build
    /// metadata do not participate.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
    }
}

impl FromStr for Version {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}

/// Constraint operator. `Tilde` is a patch-level loose match; `Caret`
/// accepts compatible changes, with the usual 0.x tightening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintOp {
    Exact,
    NotEqual,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Tilde,
    Caret,
}

impl ConstraintOp {
    fn strip(input: &str) -> (Self, &str) {
        for (token, op) in [
            (">=", Self::GreaterEq),
            ("<=", Self::LessEq),
            ("!=", Self::NotEqual),
            (">", Self::Greater),
            ("<", Self::Less),
            ("=", Self::Exact),
            ("~", Self::Tilde),
            ("^", Self::Caret),
        ] {
            if let Some(rest) = input.strip_prefix(token) {
                return (op, rest);
            }
        }
        (Self::Exact, input)
    }
}

/// An `(operator, version)` pair parsed from a constraint string such as
/// `^1.2.0` or `>=2.0.0`. A missing operator means exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionConstraint {
    pub op: ConstraintOp,
    pub version: Version,
}

impl VersionConstraint {
    pub fn new(op: ConstraintOp, version: Version) -> Self {
        Self { op, version }
    }

    /// Parses an operator token plus a version. An invalid version portion
    /// is a parse error, never a silently-accepted default.
    pub fn parse(input: &str) -> PluginResult<Self> {
        let (op, rest) = ConstraintOp::strip(input.trim());
        let version = Version::parse(rest)?;
        Ok(Self { op, version })
    }

    /// Whether `version` satisfies this constraint.
    pub fn matches(&self, version: &Version) -> bool {
        let cmp = version.compare(&self.version);
        match self.op {
            ConstraintOp::Exact => cmp == Ordering::Equal,
            ConstraintOp::NotEqual => cmp != Ordering::Equal,
            ConstraintOp::Greater => cmp == Ordering::Greater,
            ConstraintOp::GreaterEq => cmp != Ordering::Less,
            ConstraintOp::Less => cmp == Ordering::Less,
            ConstraintOp::LessEq => cmp != Ordering::Greater,
            ConstraintOp::Tilde => {
                version.major == self.version.major
                    && version.minor == self.version.minor
                    && cmp != Ordering::Less
            }
            ConstraintOp::Caret => self.matches_caret(version, cmp),
        }
    }

    fn matches_caret(&self, version: &Version, cmp: Ordering) -> bool {
        if self.version.major != 0 {
            return version.major == self.version.major && cmp != Ordering::Less;
        }
        // 0.x: the minor is the locked component. A 0.0.x release has no
        // stable surface at all, so only the exact patch is accepted.
        if self.version.minor == 0 {
            version.major == 0 && version.minor == 0 && version.patch == self.version.patch
        } else {
            version.major == 0 && version.minor == self.version.minor && cmp != Ordering::Less
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            ConstraintOp::Exact => "=",
            ConstraintOp::NotEqual => "!=",
            ConstraintOp::Greater => ">",
            ConstraintOp::GreaterEq => ">=",
            ConstraintOp::Less => "<",
            ConstraintOp::LessEq => "<=",
            ConstraintOp::Tilde => "~",
            ConstraintOp::Caret => "^",
        };
        write!(f, "{}{}", op, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let v = Version::parse("1.2.3-beta.1+build.5").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert_eq!(v.pre.as_deref(), Some("beta.1"));
        assert_eq!(v.build.as_deref(), Some("build.5"));
    }

    #[test]
    fn test_parse_missing_components_default_to_zero() {
        let v = Version::parse("2").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (2, 0, 0));

        let v = Version::parse("2.1").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (2, 1, 0));
    }

    #[test]
    fn test_invalid_versions_rejected() {
        for bad in ["", "abc", "1.x.0", "1..2", "v1.0.0", "1.0.0 beta"] {
            assert!(!Version::is_valid(bad), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_compare_reflexive_and_antisymmetric() {
        let versions = ["0.0.1", "1.0.0", "1.2.3", "10.0.0"];
        for a in versions {
            let va = Version::parse(a).unwrap();
            assert_eq!(va.compare(&va), Ordering::Equal);
            for b in versions {
                let vb = Version::parse(b).unwrap();
                assert_eq!(va.compare(&vb), vb.compare(&va).reverse());
            }
        }
    }

    #[test]
    fn test_compare_ignores_prerelease() {
        let a = Version::parse("1.0.0-alpha").unwrap();
        let b = Version::parse("1.0.0").unwrap();
        assert_eq!(a.compare(&b), Ordering::Equal);
    }

    #[test]
    fn test_constraint_default_operator_is_exact() {
        let c = VersionConstraint::parse("1.2.3").unwrap();
        assert_eq!(c.op, ConstraintOp::Exact);
        assert!(c.matches(&Version::parse("1.2.3").unwrap()));
        assert!(!c.matches(&Version::parse("1.2.4").unwrap()));
    }

    #[test]
    fn test_constraint_invalid_version_fails() {
        assert!(VersionConstraint::parse("^not-a-version").is_err());
        assert!(VersionConstraint::parse(">=").is_err());
    }

    #[test]
    fn test_relational_operators() {
        let ge = VersionConstraint::parse(">=1.5.0").unwrap();
        assert!(ge.matches(&Version::parse("1.5.0").unwrap()));
        assert!(ge.matches(&Version::parse("2.0.0").unwrap()));
        assert!(!ge.matches(&Version::parse("1.4.9").unwrap()));

        let ne = VersionConstraint::parse("!=1.0.0").unwrap();
        assert!(!ne.matches(&Version::parse("1.0.0").unwrap()));
        assert!(ne.matches(&Version::parse("1.0.1").unwrap()));

        let lt = VersionConstraint::parse("<2.0.0").unwrap();
        assert!(lt.matches(&Version::parse("1.9.9").unwrap()));
        assert!(!lt.matches(&Version::parse("2.0.0").unwrap()));
    }

    #[test]
    fn test_tilde_patch_level_match() {
        let c = VersionConstraint::parse("~1.2.0").unwrap();
        assert!(c.matches(&Version::parse("1.2.0").unwrap()));
        assert!(c.matches(&Version::parse("1.2.5").unwrap()));
        assert!(!c.matches(&Version::parse("1.3.0").unwrap()));
        assert!(!c.matches(&Version::parse("1.1.9").unwrap()));
    }

    #[test]
    fn test_caret_compatible_change() {
        let c = VersionConstraint::parse("^1.2.0").unwrap();
        assert!(c.matches(&Version::parse("1.2.5").unwrap()));
        assert!(c.matches(&Version::parse("1.9.0").unwrap()));
        assert!(!c.matches(&Version::parse("2.0.0").unwrap()));
        assert!(!c.matches(&Version::parse("1.1.0").unwrap()));
    }

    #[test]
    fn test_caret_zero_major_locks_minor() {
        let c = VersionConstraint::parse("^0.3.1").unwrap();
        assert!(c.matches(&Version::parse("0.3.1").unwrap()));
        assert!(c.matches(&Version::parse("0.3.9").unwrap()));
        assert!(!c.matches(&Version::parse("0.4.0").unwrap()));
        assert!(!c.matches(&Version::parse("0.3.0").unwrap()));
        assert!(!c.matches(&Version::parse("1.3.1").unwrap()));
    }

    #[test]
    fn test_caret_zero_zero_requires_exact_patch() {
        let c = VersionConstraint::parse("^0.0.4").unwrap();
        assert!(c.matches(&Version::parse("0.0.4").unwrap()));
        assert!(!c.matches(&Version::parse("0.0.5").unwrap()));
        assert!(!c.matches(&Version::parse("0.1.0").unwrap()));
    }

    #[test]
    fn test_display_roundtrip() {
        let c = VersionConstraint::parse("^1.2.3").unwrap();
        assert_eq!(c.to_string(), "^1.2.3");
        let v = Version::parse("1.2.3-rc.1").unwrap();
        assert_eq!(v.to_string(), "1.2.3-rc.1");
    }
}
