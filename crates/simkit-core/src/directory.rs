//! Device lookup over the gateway's enumeration.
//!
//! A [`DeviceDirectory`] finds devices by any combination of udid, name,
//! runtime, and device type. All supplied filters must match (logical
//! AND). Each lookup performs one fresh enumeration and a side-effect-free
//! scan over it; results are never cached across calls, so a wait loop
//! that re-fetches through the directory always observes current state.
//!
//! Filtering by runtime or device type requires the gateway to carry an
//! explicit device-set path: the default-set listing does not expose those
//! attributes reliably (older toolchains omit `deviceTypeIdentifier`
//! entirely), so those filters are rejected up front rather than silently
//! matching nothing.

use crate::device::Device;
use crate::devicetype::DeviceType;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::simctl::Simctl;

/// Filter criteria for device lookup. All supplied criteria must match.
///
/// An empty filter matches every device (the AND of nothing holds
/// vacuously), which makes [`DeviceDirectory::find_all`] with a fresh
/// filter a plain enumeration.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    udid: Option<String>,
    name: Option<String>,
    runtime_identifier: Option<String>,
    devicetype_identifier: Option<String>,
}

impl DeviceFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches the exact udid.
    pub fn udid(mut self, udid: impl Into<String>) -> Self {
        self.udid = Some(udid.into());
        self
    }

    /// Matches the exact device name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Matches devices on the given runtime.
    pub fn runtime(mut self, runtime: &Runtime) -> Self {
        self.runtime_identifier = Some(runtime.identifier.clone());
        self
    }

    /// Matches devices of the given device type.
    pub fn devicetype(mut self, devicetype: &DeviceType) -> Self {
        self.devicetype_identifier = Some(devicetype.identifier.clone());
        self
    }

    /// Whether this filter matches a device. Every supplied criterion must
    /// hold; a device lacking runtime/device-type attribution cannot match
    /// a filter on those.
    pub fn matches(&self, device: &Device) -> bool {
        if let Some(udid) = &self.udid {
            if device.udid() != udid {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if device.name() != name {
                return false;
            }
        }
        if let Some(runtime_id) = &self.runtime_identifier {
            if device.runtime_identifier() != Some(runtime_id.as_str()) {
                return false;
            }
        }
        if let Some(devicetype_id) = &self.devicetype_identifier {
            if device.device_type_identifier() != Some(devicetype_id.as_str()) {
                return false;
            }
        }
        true
    }

    /// The first filter criterion the default device set cannot honor, if
    /// any.
    fn unavailable_without_set(&self) -> Option<&'static str> {
        if self.runtime_identifier.is_some() {
            Some("runtime")
        } else if self.devicetype_identifier.is_some() {
            Some("devicetype")
        } else {
            None
        }
    }
}

/// Finds and enumerates devices through a gateway.
#[derive(Debug, Clone)]
pub struct DeviceDirectory {
    simctl: Simctl,
}

impl DeviceDirectory {
    /// Creates a directory over the given gateway.
    pub fn new(simctl: Simctl) -> Self {
        Self { simctl }
    }

    /// Returns the first device matching the filter, or `None`.
    ///
    /// # Errors
    ///
    /// - [`Error::FilterUnavailable`] for runtime/devicetype filters when
    ///   the gateway has no device-set path
    /// - Any gateway enumeration error
    pub fn find(&self, filter: &DeviceFilter) -> Result<Option<Device>> {
        self.check_filter(filter)?;
        let devices = self.simctl.list_devices()?;
        Ok(devices.into_iter().find(|d| filter.matches(d)))
    }

    /// Returns all devices matching the filter.
    pub fn find_all(&self, filter: &DeviceFilter) -> Result<Vec<Device>> {
        self.check_filter(filter)?;
        let devices = self.simctl.list_devices()?;
        Ok(devices.into_iter().filter(|d| filter.matches(d)).collect())
    }

    /// Looks up one device by udid.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceNotFound`] when the udid does not exist
    pub fn by_udid(&self, udid: &str) -> Result<Device> {
        self.find(&DeviceFilter::new().udid(udid))?
            .ok_or_else(|| Error::DeviceNotFound {
                udid: udid.to_string(),
            })
    }

    fn check_filter(&self, filter: &DeviceFilter) -> Result<()> {
        if self.simctl.device_set().is_none() {
            if let Some(name) = filter.unavailable_without_set() {
                return Err(Error::FilterUnavailable { filter: name });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "devices": {
            "com.apple.CoreSimulator.SimRuntime.iOS-17-0": [
                {
                    "udid": "AAAA-1111",
                    "name": "Test Phone",
                    "state": "Shutdown",
                    "isAvailable": true,
                    "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15"
                },
                {
                    "udid": "BBBB-2222",
                    "name": "Other Phone",
                    "state": "Booted",
                    "isAvailable": true,
                    "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15-Pro"
                }
            ],
            "com.apple.CoreSimulator.SimRuntime.iOS-16-4": [
                {
                    "udid": "CCCC-3333",
                    "name": "Test Phone",
                    "state": "Shutdown",
                    "isAvailable": true,
                    "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15"
                }
            ]
        }
    }"#;

    fn fixture_devices() -> Vec<Device> {
        Simctl::for_tests()
            .parse_devices(FIXTURE.as_bytes())
            .unwrap()
    }

    fn runtime_17() -> Runtime {
        Runtime {
            name: "iOS 17.0".to_string(),
            identifier: "com.apple.CoreSimulator.SimRuntime.iOS-17-0".to_string(),
            version: "17.0".to_string(),
            is_available: true,
        }
    }

    fn iphone_15() -> DeviceType {
        DeviceType {
            name: "iPhone 15".to_string(),
            identifier: "com.apple.CoreSimulator.SimDeviceType.iPhone-15".to_string(),
        }
    }

    // -- Filter matching ----------------------------------------------------

    #[test]
    fn empty_filter_matches_everything() {
        let filter = DeviceFilter::new();
        assert!(fixture_devices().iter().all(|d| filter.matches(d)));
    }

    #[test]
    fn udid_filter_selects_one_device() {
        let filter = DeviceFilter::new().udid("BBBB-2222");
        let matched: Vec<_> = fixture_devices()
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name(), "Other Phone");
    }

    #[test]
    fn name_filter_can_match_several() {
        let filter = DeviceFilter::new().name("Test Phone");
        let matched: Vec<_> = fixture_devices()
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn all_filters_and_together() {
        let filter = DeviceFilter::new()
            .udid("AAAA-1111")
            .name("Test Phone")
            .runtime(&runtime_17())
            .devicetype(&iphone_15());
        let matched: Vec<_> = fixture_devices()
            .into_iter()
            .filter(|d| filter.matches(d))
            .collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].udid(), "AAAA-1111");
    }

    #[test]
    fn one_mismatched_filter_excludes_the_device() {
        // Same device, but the runtime belongs to a different group.
        let mut wrong_runtime = runtime_17();
        wrong_runtime.identifier = "com.apple.CoreSimulator.SimRuntime.iOS-16-4".to_string();

        let filter = DeviceFilter::new()
            .udid("AAAA-1111")
            .name("Test Phone")
            .runtime(&wrong_runtime);
        assert!(!fixture_devices().iter().any(|d| filter.matches(d)));

        let filter = DeviceFilter::new().udid("AAAA-1111").name("Wrong Name");
        assert!(!fixture_devices().iter().any(|d| filter.matches(d)));
    }

    #[test]
    fn device_without_attribution_cannot_match_devicetype_filter() {
        let json = r#"{
            "devices": {
                "com.apple.CoreSimulator.SimRuntime.iOS-17-0": [
                    {"udid": "X", "name": "Bare", "state": "Shutdown"}
                ]
            }
        }"#;
        let devices = Simctl::for_tests().parse_devices(json.as_bytes()).unwrap();
        let filter = DeviceFilter::new().devicetype(&iphone_15());
        assert!(!filter.matches(&devices[0]));
    }

    // -- Default-set filter limitation --------------------------------------

    #[test]
    fn runtime_filter_rejected_without_device_set() {
        let directory = DeviceDirectory::new(Simctl::for_tests());
        let filter = DeviceFilter::new().runtime(&runtime_17());

        match directory.find(&filter) {
            Err(Error::FilterUnavailable { filter }) => assert_eq!(filter, "runtime"),
            other => panic!("expected FilterUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn devicetype_filter_rejected_without_device_set() {
        let directory = DeviceDirectory::new(Simctl::for_tests());
        let filter = DeviceFilter::new().devicetype(&iphone_15());

        match directory.find_all(&filter) {
            Err(Error::FilterUnavailable { filter }) => assert_eq!(filter, "devicetype"),
            other => panic!("expected FilterUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn udid_and_name_filters_allowed_without_device_set() {
        // The rejection must fire before enumeration; a udid/name filter
        // proceeds to enumerate (and on a host without the utility that
        // surfaces as an Io/Command error, never FilterUnavailable).
        let directory = DeviceDirectory::new(Simctl::for_tests());
        let filter = DeviceFilter::new().udid("AAAA-1111").name("Test Phone");

        match directory.find(&filter) {
            Err(Error::FilterUnavailable { .. }) => {
                panic!("udid/name filters must not be rejected")
            }
            _ => {}
        }
    }
}
