//! Android Gradle plugin versions
//!
//! Parsing, ordering and the compatibility gates that decide which model
//! protocol a module is synced with.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use r_droid_core::config::AgpVersionPolicy;
use tracing::warn;

use crate::error::{Result, SyncError};

/// Pre-release channel of a plugin version, ordered oldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreviewKind {
    Alpha,
    Beta,
    Rc,
    Dev,
}

impl PreviewKind {
    fn as_str(&self) -> &'static str {
        match self {
            PreviewKind::Alpha => "alpha",
            PreviewKind::Beta => "beta",
            PreviewKind::Rc => "rc",
            PreviewKind::Dev => "dev",
        }
    }
}

/// Parsed Android Gradle plugin version, e.g. `7.3.0-alpha04`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgpVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub preview: Option<(PreviewKind, u32)>,
}

impl AgpVersion {
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self { major, minor, micro, preview: None }
    }

    pub const fn preview(major: u32, minor: u32, micro: u32, kind: PreviewKind, number: u32) -> Self {
        Self { major, minor, micro, preview: Some((kind, number)) }
    }

    /// Lenient parse; `None` for strings that are not plugin versions
    pub fn try_parse(text: &str) -> Option<Self> {
        text.parse().ok()
    }

    pub fn is_preview(&self) -> bool {
        self.preview.is_some()
    }

    /// Same version with the preview qualifier dropped
    pub fn base(&self) -> Self {
        Self::new(self.major, self.minor, self.micro)
    }

    pub fn is_at_least(&self, other: &AgpVersion) -> bool {
        self >= other
    }
}

impl FromStr for AgpVersion {
    type Err = String;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        let text = text.trim();
        let (numbers, qualifier) = match text.split_once('-') {
            Some((numbers, qualifier)) => (numbers, Some(qualifier)),
            None => (text, None),
        };

        let mut parts = numbers.split('.');
        let mut next = |required: bool| -> std::result::Result<u32, String> {
            match parts.next() {
                Some(part) => part.parse::<u32>().map_err(|_| format!("invalid version segment '{}' in '{}'", part, text)),
                None if required => Err(format!("missing version segment in '{}'", text)),
                None => Ok(0),
            }
        };
        let major = next(true)?;
        let minor = next(true)?;
        let micro = next(false)?;
        if parts.next().is_some() {
            return Err(format!("too many version segments in '{}'", text));
        }

        let preview = match qualifier {
            None => None,
            Some(qualifier) => Some(parse_preview(qualifier).ok_or_else(|| format!("invalid preview qualifier in '{}'", text))?),
        };

        Ok(Self { major, minor, micro, preview })
    }
}

fn parse_preview(qualifier: &str) -> Option<(PreviewKind, u32)> {
    let qualifier = qualifier.to_ascii_lowercase();
    if qualifier == "dev" || qualifier == "snapshot" {
        return Some((PreviewKind::Dev, 0));
    }
    let split = qualifier.find(|c: char| c.is_ascii_digit())?;
    let (kind, number) = qualifier.split_at(split);
    let kind = match kind {
        "alpha" => PreviewKind::Alpha,
        "beta" => PreviewKind::Beta,
        "rc" => PreviewKind::Rc,
        _ => return None,
    };
    Some((kind, number.parse().ok()?))
}

impl Ord for AgpVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.micro)
            .cmp(&(other.major, other.minor, other.micro))
            .then_with(|| match (&self.preview, &other.preview) {
                (None, None) => Ordering::Equal,
                // a stable release sorts after all of its previews
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for AgpVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AgpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        match self.preview {
            Some((PreviewKind::Dev, _)) => write!(f, "-dev"),
            Some((kind, number)) => write!(f, "-{}{:02}", kind.as_str(), number),
            None => Ok(()),
        }
    }
}

/// First plugin version whose V2 models are usable
pub const MINIMUM_V2_MODELS: AgpVersion = AgpVersion::preview(7, 2, 0, PreviewKind::Alpha, 1);

/// First plugin version whose V2 models may be fetched concurrently
pub const MINIMUM_PARALLEL_SYNC: AgpVersion = AgpVersion::preview(7, 3, 0, PreviewKind::Alpha, 4);

pub fn can_fetch_v2_models(version: Option<&AgpVersion>) -> bool {
    version.map_or(false, |v| v.is_at_least(&MINIMUM_V2_MODELS))
}

pub fn can_use_parallel_sync(version: Option<&AgpVersion>) -> bool {
    version.map_or(false, |v| v.is_at_least(&MINIMUM_PARALLEL_SYNC))
}

/// How a plugin version relates to the versions this engine supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgpCompatibility {
    BeforeMinimum,
    DifferentPreview,
    Compatible,
}

pub fn compute_compatibility(current: &AgpVersion, minimum: &AgpVersion, latest_known: &AgpVersion) -> AgpCompatibility {
    if current < minimum {
        return AgpCompatibility::BeforeMinimum;
    }
    // Previews are only importable when they are exactly the preview this
    // build was made against or belong to an older release series.
    if current.is_preview() && current.base() >= latest_known.base() && current != latest_known {
        return AgpCompatibility::DifferentPreview;
    }
    AgpCompatibility::Compatible
}

/// Compatibility gate applied to every plugin version reported by a module
#[derive(Debug, Clone)]
pub struct CompatibilityChecker {
    minimum: AgpVersion,
    latest_known: AgpVersion,
    disable_forced_upgrades: bool,
}

impl CompatibilityChecker {
    pub fn new(policy: &AgpVersionPolicy, disable_forced_upgrades: bool) -> Result<Self> {
        let parse = |text: &str| {
            text.parse::<AgpVersion>()
                .map_err(|e| SyncError::InvalidModel(format!("bad AGP version policy: {}", e)))
        };
        Ok(Self {
            minimum: parse(&policy.minimum_supported)?,
            latest_known: parse(&policy.latest_known)?,
            disable_forced_upgrades,
        })
    }

    /// Fails the sync for unsupported plugin versions. Unparseable or
    /// absent versions are let through.
    pub fn check(&self, agp_version: Option<&str>) -> Result<()> {
        let Some(text) = agp_version else { return Ok(()) };
        let Some(version) = AgpVersion::try_parse(text) else {
            warn!("Cannot parse Android Gradle plugin version '{}', skipping compatibility check", text);
            return Ok(());
        };

        match compute_compatibility(&version, &self.minimum, &self.latest_known) {
            AgpCompatibility::BeforeMinimum => Err(SyncError::AgpVersionTooOld {
                version: version.to_string(),
                minimum: self.minimum.to_string(),
            }),
            AgpCompatibility::DifferentPreview if !self.disable_forced_upgrades => Err(SyncError::AgpVersionIncompatible {
                version: version.to_string(),
                latest_known: self.latest_known.to_string(),
            }),
            AgpCompatibility::DifferentPreview => {
                warn!("Android Gradle plugin {} is a different preview than {}, forced upgrade disabled", version, self.latest_known);
                Ok(())
            }
            AgpCompatibility::Compatible => Ok(()),
        }
    }
}
