//! Device type values and resolution.
//!
//! A [`DeviceType`] is the canonical descriptor of a simulated hardware
//! model. Callers rarely hold canonical identifiers up front, so
//! [`DeviceTypeSpec`] accepts either an already-resolved value or a
//! human-readable descriptor, resolved against the utility's enumeration
//! strictly before any device-creation call is issued.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Canonical descriptor of a simulated hardware model.
///
/// Equality and hashing are by `identifier` only; the name is descriptive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceType {
    /// Human-readable name (e.g. "iPhone 15 Pro").
    pub name: String,
    /// Canonical identifier (e.g.
    /// "com.apple.CoreSimulator.SimDeviceType.iPhone-15-Pro").
    pub identifier: String,
}

impl PartialEq for DeviceType {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for DeviceType {}

impl Hash for DeviceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
    }
}

/// A device type given either as an already-resolved value or as a
/// human-readable descriptor still to be resolved.
#[derive(Debug, Clone)]
pub enum DeviceTypeSpec {
    /// Pass-through: no lookup is performed.
    Resolved(DeviceType),
    /// Resolved against the enumerated device types: exact identifier,
    /// exact name, then unique case-insensitive substring of the name.
    Descriptor(String),
}

impl From<DeviceType> for DeviceTypeSpec {
    fn from(devicetype: DeviceType) -> Self {
        Self::Resolved(devicetype)
    }
}

impl From<&str> for DeviceTypeSpec {
    fn from(descriptor: &str) -> Self {
        Self::Descriptor(descriptor.to_string())
    }
}

impl From<String> for DeviceTypeSpec {
    fn from(descriptor: String) -> Self {
        Self::Descriptor(descriptor)
    }
}

impl DeviceTypeSpec {
    /// Resolves this spec against the available device types.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceTypeNotFound`] when nothing matches
    /// - [`Error::DeviceTypeAmbiguous`] when a partial descriptor matches
    ///   more than one device type
    pub fn resolve(self, available: &[DeviceType]) -> Result<DeviceType> {
        let spec = match self {
            Self::Resolved(devicetype) => return Ok(devicetype),
            Self::Descriptor(spec) => spec,
        };

        if let Some(exact) = available
            .iter()
            .find(|dt| dt.identifier == spec || dt.name == spec)
        {
            return Ok(exact.clone());
        }

        let lowered = spec.to_lowercase();
        let matches: Vec<&DeviceType> = available
            .iter()
            .filter(|dt| dt.name.to_lowercase().contains(&lowered))
            .collect();

        match matches.as_slice() {
            [] => Err(Error::DeviceTypeNotFound { spec }),
            [single] => Ok((*single).clone()),
            many => Err(Error::DeviceTypeAmbiguous {
                spec,
                candidates: many.iter().map(|dt| dt.name.clone()).collect(),
            }),
        }
    }
}
