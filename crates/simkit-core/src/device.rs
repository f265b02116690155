//! Simulator device aggregate and its lifecycle state machine.
//!
//! A [`Device`] is a snapshot of one simulator as reported by the utility's
//! device listing, together with the full set of lifecycle operations. Two
//! snapshots of the same device taken at different times compare equal:
//! identity is the udid, and `state`/`name` are observations, not identity.
//!
//! State-changing operations issue a single gateway call each. The
//! asynchronous ones ([`boot`](Device::boot), [`shutdown`](Device::shutdown),
//! [`kill`](Device::kill), [`launch_gui`](Device::launch_gui)) only *request*
//! a transition; the gateway call returning success means the utility
//! accepted the request, not that the device has reached the target state.
//! Callers observe completion with [`wait_until`](Device::wait_until), which
//! re-fetches a fresh snapshot on every sample.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use simkit_core::device::DeviceState;
//! use simkit_core::simctl::Simctl;
//!
//! # fn main() -> simkit_core::error::Result<()> {
//! let simctl = Simctl::new();
//! let device = simctl.create_device("Test Phone", "iPhone 15", "iOS 17.0")?;
//!
//! device.boot()?;
//! let booted = device.wait_until(
//!     |d| d.state() == DeviceState::Booted,
//!     Duration::from_secs(60),
//!     Duration::from_millis(500),
//! )?;
//! assert_eq!(booted.state(), DeviceState::Booted);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::DeviceDirectory;
use crate::error::{Error, Result};
use crate::poll::{self, Sampled};
use crate::settings::Settings;
use crate::simctl::Simctl;

/// The lifecycle state of a simulator device.
///
/// The utility reports states as strings; `Creating` is transient and only
/// observable while a create call is still materializing the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceState {
    /// The device is being materialized by a create call.
    Creating,
    /// The device exists and is powered off.
    Shutdown,
    /// A boot was requested and is in progress.
    Booting,
    /// The device is running.
    Booted,
    /// A shutdown was requested and is in progress.
    #[serde(rename = "Shutting Down")]
    ShuttingDown,
    /// A state this crate does not model, reported by a newer toolchain.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Creating => "Creating",
            Self::Shutdown => "Shutdown",
            Self::Booting => "Booting",
            Self::Booted => "Booted",
            Self::ShuttingDown => "Shutting Down",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// One device entry as deserialized from `simctl list devices -j`.
///
/// The listing groups devices under runtime identifier keys; the runtime is
/// attached separately when the map is flattened. `deviceTypeIdentifier` is
/// optional because default-set listings on older toolchains omit it, and
/// availability has appeared under two different keys across toolchain
/// generations.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeviceRecord {
    pub udid: String,
    pub name: String,
    pub state: DeviceState,
    #[serde(default, rename = "isAvailable")]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default, rename = "deviceTypeIdentifier")]
    pub device_type_identifier: Option<String>,
    #[serde(default, rename = "dataPath")]
    pub data_path: Option<PathBuf>,
    #[serde(default, rename = "lastBootedAt")]
    pub last_booted_at: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    /// Availability across both listing generations: modern `isAvailable`
    /// booleans win; the legacy `availability` string marks unavailable
    /// devices with "(unavailable, ...)".
    fn resolved_availability(&self) -> bool {
        if let Some(available) = self.is_available {
            return available;
        }
        match &self.availability {
            Some(s) => !s.contains("unavailable"),
            None => true,
        }
    }
}

/// A snapshot of one simulator device, with its lifecycle operations.
///
/// Obtained from [`Simctl::create_device`], [`Simctl::list_devices`], or a
/// [`DeviceDirectory`] lookup. Snapshots are independent values: mutating
/// operations that change the logical model update the caller's reference
/// ([`rename`](Self::rename)) or replace it ([`reset`](Self::reset)).
#[derive(Debug, Clone)]
pub struct Device {
    udid: String,
    name: String,
    state: DeviceState,
    is_available: bool,
    device_type_identifier: Option<String>,
    runtime_identifier: Option<String>,
    data_path: Option<PathBuf>,
    last_booted_at: Option<DateTime<Utc>>,
    simctl: Simctl,
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.udid == other.udid
    }
}

impl Eq for Device {}

impl Hash for Device {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.udid.hash(state);
    }
}

impl Device {
    pub(crate) fn from_record(
        record: DeviceRecord,
        runtime_identifier: Option<String>,
        simctl: Simctl,
    ) -> Self {
        let is_available = record.resolved_availability();
        Self {
            udid: record.udid,
            name: record.name,
            state: record.state,
            is_available,
            device_type_identifier: record.device_type_identifier,
            runtime_identifier,
            data_path: record.data_path,
            last_booted_at: record.last_booted_at,
            simctl,
        }
    }

    pub(crate) fn gateway(&self) -> &Simctl {
        &self.simctl
    }

    /// The unique device identifier, immutable for this device's lifetime.
    pub fn udid(&self) -> &str {
        &self.udid
    }

    /// The human-readable device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The state observed when this snapshot was taken.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Whether the device's runtime and device type are compatible and
    /// installed on this host.
    pub fn is_available(&self) -> bool {
        self.is_available
    }

    /// The canonical device type identifier, when the listing exposed it.
    pub fn device_type_identifier(&self) -> Option<&str> {
        self.device_type_identifier.as_deref()
    }

    /// The canonical runtime identifier, when the listing exposed it.
    pub fn runtime_identifier(&self) -> Option<&str> {
        self.runtime_identifier.as_deref()
    }

    /// The device's data directory, when the listing exposed it.
    pub fn data_path(&self) -> Option<&Path> {
        self.data_path.as_deref()
    }

    /// When the device was last booted, if ever.
    pub fn last_booted_at(&self) -> Option<DateTime<Utc>> {
        self.last_booted_at
    }

    /// Human-readable OS descriptor (e.g. "iOS 17.0"), reconstructed from
    /// the runtime identifier.
    pub fn os(&self) -> Option<String> {
        let id = self.runtime_identifier.as_deref()?;
        // Legacy listings group by display name ("iOS 10.3") rather than
        // by reverse-DNS identifier.
        let suffix = match id.rsplit_once('.') {
            Some((prefix, suffix)) if prefix.contains("SimRuntime") => suffix,
            _ => return Some(id.to_string()),
        };
        let mut parts = suffix.split('-');
        let family = parts.next()?;
        let version: Vec<&str> = parts.collect();
        if version.is_empty() {
            return Some(family.to_string());
        }
        Some(format!("{} {}", family, version.join(".")))
    }

    /// The settings subsystem for this device's preference stores.
    pub fn settings(&self) -> Settings<'_> {
        Settings::new(self)
    }

    // -----------------------------------------------------------------------
    // Lifecycle operations
    // -----------------------------------------------------------------------

    /// Fetches a fresh snapshot of this device by udid.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceNotFound`] if the udid no longer exists
    /// - Any gateway enumeration error
    pub fn refresh(&self) -> Result<Device> {
        DeviceDirectory::new(self.simctl.clone()).by_udid(&self.udid)
    }

    /// Requests a headless boot (`shutdown` → `booting` → eventually
    /// `booted`).
    ///
    /// Asynchronous: success means the utility accepted the request. Use
    /// [`wait_until`](Self::wait_until) to observe completion.
    pub fn boot(&self) -> Result<()> {
        self.simctl.boot(&self.udid)
    }

    /// Requests a graceful shutdown (`booted` → `shutting_down` →
    /// eventually `shutdown`).
    ///
    /// Asynchronous, like [`boot`](Self::boot).
    pub fn shutdown(&self) -> Result<()> {
        self.simctl.shutdown(&self.udid)
    }

    /// Force-terminates the device's backing processes from any state.
    ///
    /// Asynchronous: the reported state catches up to `shutdown` shortly
    /// after the processes die.
    pub fn kill(&self) -> Result<()> {
        self.simctl.kill(&self.udid)
    }

    /// Wipes the device's data, leaving it in `shutdown`.
    ///
    /// The device must already be shut down; this is checked against a
    /// fresh snapshot rather than relying on hidden auto-recovery in the
    /// utility.
    ///
    /// # Errors
    ///
    /// - [`Error::WrongState`] if the device is not in `Shutdown`
    pub fn erase(&self) -> Result<()> {
        let current = self.refresh()?;
        if current.state != DeviceState::Shutdown {
            return Err(Error::WrongState {
                operation: "erase",
                required: DeviceState::Shutdown,
                actual: current.state,
            });
        }
        self.simctl.erase(&self.udid)
    }

    /// Renames the device and updates this snapshot's name on success.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        self.simctl.rename(&self.udid, new_name)?;
        self.name = new_name.to_string();
        Ok(())
    }

    /// Deletes the device. The udid becomes invalid for all further
    /// lookups, so the snapshot is consumed.
    pub fn delete(self) -> Result<()> {
        self.simctl.delete(&self.udid)
    }

    /// Deletes this device and creates a replacement with identical name,
    /// device type, and runtime, under a new udid.
    ///
    /// Returns the replacement device; the old udid no longer resolves.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCommand`] if this snapshot's listing did not
    ///   expose the device type or runtime identifiers (default-set mode on
    ///   older toolchains), so the replacement cannot be specified
    pub fn reset(self) -> Result<Device> {
        let devicetype = self.device_type_identifier.clone().ok_or_else(|| {
            Error::UnsupportedCommand {
                command: "reset",
                reason: "device type attribution is unavailable in this listing".to_string(),
            }
        })?;
        let runtime = self.runtime_identifier.clone().ok_or_else(|| {
            Error::UnsupportedCommand {
                command: "reset",
                reason: "runtime attribution is unavailable in this listing".to_string(),
            }
        })?;
        let name = self.name.clone();
        let simctl = self.simctl.clone();
        self.delete()?;
        let udid = simctl.create(&name, &devicetype, &runtime)?;
        DeviceDirectory::new(simctl).by_udid(&udid)
    }

    /// Opens the Simulator application scoped to this device, which boots
    /// it with a visible window (`shutdown` → `booting`).
    ///
    /// Asynchronous, like [`boot`](Self::boot).
    pub fn launch_gui(&self) -> Result<()> {
        self.simctl.launch_gui(&self.udid)
    }

    /// Launches an installed application by bundle identifier.
    ///
    /// The device must be booted for the utility to accept this.
    pub fn launch_app(&self, bundle_id: &str) -> Result<()> {
        self.simctl.launch_app(&self.udid, bundle_id)
    }

    /// Installs an application bundle from a local path.
    pub fn install(&self, app_path: &Path) -> Result<()> {
        self.simctl.install(&self.udid, app_path)
    }

    /// Uninstalls an application by bundle identifier.
    pub fn uninstall(&self, bundle_id: &str) -> Result<()> {
        self.simctl.uninstall(&self.udid, bundle_id)
    }

    /// Opens a URL on the booted device.
    pub fn open_url(&self, url: &str) -> Result<()> {
        self.simctl.open_url(&self.udid, url)
    }

    /// Captures a screenshot of the booted device to `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCommand`] if the host toolchain predates
    ///   screenshot support; nothing is written in that case
    pub fn screenshot(&self, path: &Path) -> Result<()> {
        self.simctl.screenshot(&self.udid, path)
    }

    // -----------------------------------------------------------------------
    // Waiting
    // -----------------------------------------------------------------------

    /// Blocks until `predicate` holds for a fresh snapshot of this device,
    /// sampling every `interval`, giving up after `timeout`.
    ///
    /// Each sample re-fetches the device by udid; the in-memory snapshot's
    /// cached state is never trusted. Returns the satisfying snapshot.
    ///
    /// # Errors
    ///
    /// - [`Error::WaitTimeout`] carrying the last observed state when the
    ///   deadline elapses
    /// - [`Error::DeviceNotFound`] or gateway errors from a sample fetch,
    ///   propagated immediately
    pub fn wait_until<P>(&self, predicate: P, timeout: Duration, interval: Duration) -> Result<Device>
    where
        P: Fn(&Device) -> bool,
    {
        let started = Instant::now();
        match poll::sample_until(timeout, interval, || self.refresh(), predicate)? {
            Sampled::Satisfied(device) => Ok(device),
            Sampled::TimedOut(last) => Err(Error::WaitTimeout {
                waited: started.elapsed(),
                last_state: last.map(|d| d.state),
            }),
        }
    }

    /// Like [`wait_until`](Self::wait_until) with the default timeout and
    /// interval ([`poll::DEFAULT_TIMEOUT`], [`poll::DEFAULT_INTERVAL`]).
    pub fn wait<P>(&self, predicate: P) -> Result<Device>
    where
        P: Fn(&Device) -> bool,
    {
        self.wait_until(predicate, poll::DEFAULT_TIMEOUT, poll::DEFAULT_INTERVAL)
    }
}
