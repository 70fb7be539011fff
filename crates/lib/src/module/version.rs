//! Module versions used for override resolution.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ModuleError;

/// An ordered, dotted numeric version.
///
/// Definitions may declare a plain integer (`version = 3`), a dotted string
/// (`version = "1.2.3"`) or an array (`version = { 1, 2, 3 }`). Components are
/// compared numerically from left to right and missing trailing components count
/// as zero, so `"1.2"` and `"1.2.0"` are the same version.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleVersion(Vec<u64>);

impl ModuleVersion {
  pub fn from_components(components: Vec<u64>) -> Result<Self, ModuleError> {
    if components.is_empty() {
      return Err(ModuleError::InvalidVersion {
        value: String::new(),
        reason: "a version needs at least one component".to_string(),
      });
    }
    Ok(Self(components))
  }

  /// Parse a dotted version such as `"2"`, `"1.4"` or `"v1.4.2"`.
  pub fn parse(value: &str) -> Result<Self, ModuleError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if digits.is_empty() {
      return Err(ModuleError::InvalidVersion {
        value: value.to_string(),
        reason: "empty version".to_string(),
      });
    }

    let components = digits
      .split('.')
      .map(|part| {
        part.parse::<u64>().map_err(|e| ModuleError::InvalidVersion {
          value: value.to_string(),
          reason: format!("component '{}' is not a non-negative integer: {}", part, e),
        })
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self(components))
  }

  pub fn components(&self) -> &[u64] {
    &self.0
  }

  fn significant(&self) -> &[u64] {
    let end = self.0.iter().rposition(|c| *c != 0).map_or(0, |i| i + 1);
    &self.0[..end]
  }
}

impl Default for ModuleVersion {
  fn default() -> Self {
    Self(vec![0])
  }
}

impl From<u64> for ModuleVersion {
  fn from(value: u64) -> Self {
    Self(vec![value])
  }
}

impl TryFrom<String> for ModuleVersion {
  type Error = ModuleError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<ModuleVersion> for String {
  fn from(version: ModuleVersion) -> Self {
    version.to_string()
  }
}

impl Ord for ModuleVersion {
  fn cmp(&self, other: &Self) -> Ordering {
    self.significant().cmp(other.significant())
  }
}

impl PartialOrd for ModuleVersion {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for ModuleVersion {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for ModuleVersion {}

impl fmt::Display for ModuleVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
    write!(f, "{}", parts.join("."))
  }
}
