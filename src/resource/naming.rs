//! Resource file naming.

use std::fmt;
use std::str::FromStr;

/// Produces candidate file names, most specific first.
pub trait ResourceNameResolver: Send + Sync + fmt::Debug {
    fn names(&self) -> Vec<String>;
}

/// `<prefix>.<extension>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicResourceNameResolver {
    prefix: String,
    extension: String,
}

impl BasicResourceNameResolver {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }
}

impl ResourceNameResolver for BasicResourceNameResolver {
    fn names(&self) -> Vec<String> {
        vec![format!("{}.{}", self.prefix, self.extension)]
    }
}

/// Application version used to pick a version-specific resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
}

impl FromStr for ApplicationVersion {
    type Err = String;

    /// Accepts `1`, `1.2`, `1.2.3`, ignoring `-pre` / `+build` suffixes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let core = s
            .trim()
            .split(|c: char| c == '-' || c == '+')
            .next()
            .unwrap_or_default();
        let mut parts = core.split('.');
        let mut next = |required: bool| -> Result<Option<u64>, String> {
            match parts.next() {
                Some(p) => p
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| format!("invalid version '{}'", s)),
                None if required => Err(format!("invalid version '{}'", s)),
                None => Ok(None),
            }
        };
        let major = next(true)?.unwrap_or_default();
        let minor = next(false)?;
        let patch = if minor.is_some() { next(false)? } else { None };
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

/// Tries `<prefix>-<major>.<minor>.<patch>`, then shorter versions, then
/// the bare `<prefix>`, all with `.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedResourceNameResolver {
    prefix: String,
    version: ApplicationVersion,
    extension: String,
}

impl VersionedResourceNameResolver {
    pub fn new(
        prefix: impl Into<String>,
        version: ApplicationVersion,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            version,
            extension: extension.into(),
        }
    }
}

impl ResourceNameResolver for VersionedResourceNameResolver {
    fn names(&self) -> Vec<String> {
        let v = self.version;
        let mut versions = Vec::with_capacity(3);
        if let (Some(minor), Some(patch)) = (v.minor, v.patch) {
            versions.push(format!("{}.{}.{}", v.major, minor, patch));
        }
        if let Some(minor) = v.minor {
            versions.push(format!("{}.{}", v.major, minor));
        }
        versions.push(v.major.to_string());

        let mut names: Vec<String> = versions
            .into_iter()
            .map(|version| format!("{}-{}.{}", self.prefix, version, self.extension))
            .collect();
        names.push(format!("{}.{}", self.prefix, self.extension));
        names
    }
}
