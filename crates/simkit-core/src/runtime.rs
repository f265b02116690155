//! OS runtime values and resolution.
//!
//! A [`Runtime`] is the canonical descriptor of a simulated OS version.
//! Like device types, runtimes are resolved from loose descriptors via
//! [`RuntimeSpec`]; additionally, [`Runtime::latest`] answers "the newest
//! installed iOS" without the caller naming a version.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_true() -> bool {
    true
}

/// Canonical descriptor of a simulated OS version.
///
/// Equality and hashing are by `identifier` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runtime {
    /// Human-readable name (e.g. "iOS 17.0").
    pub name: String,
    /// Canonical identifier (e.g.
    /// "com.apple.CoreSimulator.SimRuntime.iOS-17-0").
    pub identifier: String,
    /// Version string (e.g. "17.0").
    pub version: String,
    /// Whether the runtime is installed and usable on this host.
    #[serde(default = "default_true", rename = "isAvailable")]
    pub is_available: bool,
}

impl PartialEq for Runtime {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Runtime {}

impl Hash for Runtime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

impl Runtime {
    /// The platform family, taken from the leading token of the name
    /// (e.g. "iOS", "watchOS", "tvOS").
    pub fn platform(&self) -> Option<&str> {
        self.name.split_whitespace().next()
    }

    /// Version components for numeric ordering, so "17.10" sorts above
    /// "17.2". Non-numeric components order lowest.
    fn version_key(&self) -> Vec<u32> {
        self.version
            .split('.')
            .map(|part| part.parse().unwrap_or(0))
            .collect()
    }

    /// Returns the highest-versioned available runtime of a platform
    /// family, or `None` when the family has no available runtime.
    pub fn latest<'a>(platform: &str, runtimes: &'a [Runtime]) -> Option<&'a Runtime> {
        runtimes
            .iter()
            .filter(|rt| rt.is_available)
            .filter(|rt| {
                rt.platform()
                    .is_some_and(|p| p.eq_ignore_ascii_case(platform))
            })
            .max_by_key(|rt| rt.version_key())
    }
}

/// A runtime given either as an already-resolved value or as a
/// human-readable descriptor still to be resolved.
#[derive(Debug, Clone)]
pub enum RuntimeSpec {
    /// Pass-through: no lookup is performed.
    Resolved(Runtime),
    /// Resolved against the enumerated runtimes: exact identifier, exact
    /// name, then unique case-insensitive substring of the name.
    Descriptor(String),
}

impl From<Runtime> for RuntimeSpec {
    fn from(runtime: Runtime) -> Self {
        Self::Resolved(runtime)
    }
}

impl From<&str> for RuntimeSpec {
    fn from(descriptor: &str) -> Self {
        Self::Descriptor(descriptor.to_string())
    }
}

impl From<String> for RuntimeSpec {
    fn from(descriptor: String) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl RuntimeSpec {
    /// Resolves this spec against the available runtimes.
    ///
    /// # Errors
    ///
    /// - [`Error::RuntimeNotFound`] when nothing matches
    /// - [`Error::RuntimeAmbiguous`] when a partial descriptor matches
    ///   more than one runtime
    pub fn resolve(self, available: &[Runtime]) -> Result<Runtime> {
        let spec = match self {
            Self::Resolved(runtime) => return Ok(runtime),
            Self::Descriptor(spec) => spec,
        };

        if let Some(exact) = available
            .iter()
            .find(|rt| rt.identifier == spec || rt.name == spec)
        {
            return Ok(exact.clone());
        }

        let lowered = spec.to_lowercase();
        let matches: Vec<&Runtime> = available
            .iter()
            .filter(|rt| rt.name.to_lowercase().contains(&lowered))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::RuntimeNotFound { spec }),
            [single] => Ok((*single).clone()),
            many => Err(Error::RuntimeAmbiguous {
                spec,
                candidates: many.iter().map(|rt| rt.name.clone()).collect(),
            }),
        }
    }
}
