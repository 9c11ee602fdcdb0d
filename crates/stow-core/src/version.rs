//! Version identifiers and their ordering.
//!
//! A project publishes immutable releases identified by a `major.minor.patch`
//! triple, plus one mutable branch addressed by the reserved [`SNAPSHOT`]
//! token. Only releases take part in ordering; the snapshot branch is always
//! retained and never ranked against them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The reserved identifier of the mutable branch.
pub const SNAPSHOT: &str = "master-SNAPSHOT";

// ─── ReleaseVersion ──────────────────────────────────────────────────────────

/// An immutable release, ordered by semantic precedence.
///
/// The derived ordering compares `major`, then `minor`, then `patch`
/// numerically, which is exactly the precedence releases are retained by.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion {
  pub major: u32,
  pub minor: u32,
  pub patch: u32,
}

impl ReleaseVersion {
  pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
    Self { major, minor, patch }
  }
}

impl FromStr for ReleaseVersion {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let malformed = || Error::MalformedVersion(s.to_owned());

    let mut parts = s.split('.');
    let mut next = || -> Result<u32> {
      let part = parts.next().ok_or_else(malformed)?;
      // `u32::from_str` accepts a leading `+`; version segments may not.
      if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
      }
      // "01" would print back as "1" and no longer match its stored row.
      if part.len() > 1 && part.starts_with('0') {
        return Err(malformed());
      }
      part.parse().map_err(|_| malformed())
    };

    let version = Self::new(next()?, next()?, next()?);
    if parts.next().is_some() {
      return Err(malformed());
    }
    Ok(version)
  }
}

impl fmt::Display for ReleaseVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
  }
}

impl TryFrom<String> for ReleaseVersion {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<ReleaseVersion> for String {
  fn from(v: ReleaseVersion) -> Self { v.to_string() }
}

// ─── VersionId ───────────────────────────────────────────────────────────────

/// Any version a document can belong to: a release or the snapshot branch.
///
/// Deliberately not `Ord`: the snapshot branch has no place in release
/// precedence. Use [`VersionId::as_release`] to order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionId {
  Snapshot,
  Release(ReleaseVersion),
}

impl VersionId {
  pub fn is_snapshot(&self) -> bool { matches!(self, Self::Snapshot) }

  pub fn as_release(&self) -> Option<ReleaseVersion> {
    match self {
      Self::Snapshot => None,
      Self::Release(v) => Some(*v),
    }
  }
}

impl FromStr for VersionId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    if s == SNAPSHOT {
      Ok(Self::Snapshot)
    } else {
      s.parse().map(Self::Release)
    }
  }
}

impl fmt::Display for VersionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Snapshot => f.write_str(SNAPSHOT),
      Self::Release(v) => v.fmt(f),
    }
  }
}

impl From<ReleaseVersion> for VersionId {
  fn from(v: ReleaseVersion) -> Self { Self::Release(v) }
}

impl TryFrom<String> for VersionId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { s.parse() }
}

impl From<VersionId> for String {
  fn from(v: VersionId) -> Self { v.to_string() }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// Parse `ids` and return the releases among them, oldest first.
///
/// The snapshot token is skipped. Any other identifier that is not a valid
/// release fails the whole call with [`Error::MalformedVersion`].
pub fn releases_oldest_first<I, S>(ids: I) -> Result<Vec<ReleaseVersion>>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut releases = Vec::new();
  for id in ids {
    if let VersionId::Release(v) = id.as_ref().parse()? {
      releases.push(v);
    }
  }
  releases.sort_unstable();
  Ok(releases)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_release_triples() {
    let v: ReleaseVersion = "2.10.3".parse().unwrap();
    assert_eq!(v, ReleaseVersion::new(2, 10, 3));
    assert_eq!(v.to_string(), "2.10.3");
  }

  #[test]
  fn parses_snapshot_token() {
    let v: VersionId = SNAPSHOT.parse().unwrap();
    assert!(v.is_snapshot());
    assert_eq!(v.as_release(), None);
    assert_eq!(v.to_string(), SNAPSHOT);
  }

  #[test]
  fn rejects_malformed_identifiers() {
    for bad in [
      "", "1", "1.2", "1.2.3.4", "1.x.3", "+1.2.3", "1..3", "v1.2.3", "SNAPSHOT", "01.2.3",
      "1.02.3", "1.2.00",
    ] {
      let err = bad.parse::<VersionId>().unwrap_err();
      assert!(matches!(err, Error::MalformedVersion(ref s) if s == bad), "{bad:?}");
    }
  }

  #[test]
  fn orders_numerically_not_lexically() {
    let ordered =
      releases_oldest_first(["2.10.0", "2.3.0", SNAPSHOT, "10.0.0", "2.3.1"]).unwrap();
    let names: Vec<String> = ordered.iter().map(ToString::to_string).collect();
    assert_eq!(names, ["2.3.0", "2.3.1", "2.10.0", "10.0.0"]);
  }

  #[test]
  fn ordering_surfaces_malformed_identifiers() {
    let err = releases_oldest_first(["1.0.0", "latest"]).unwrap_err();
    assert!(matches!(err, Error::MalformedVersion(ref s) if s == "latest"));
  }

  #[test]
  fn serde_uses_plain_strings() {
    let json = serde_json::to_string(&VersionId::Release(ReleaseVersion::new(1, 2, 3))).unwrap();
    assert_eq!(json, "\"1.2.3\"");
    let back: VersionId = serde_json::from_str("\"master-SNAPSHOT\"").unwrap();
    assert_eq!(back, VersionId::Snapshot);
    assert!(serde_json::from_str::<VersionId>("\"1.2\"").is_err());
  }
}
