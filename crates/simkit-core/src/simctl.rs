//! Interface to Apple's `xcrun simctl` command-line tool.
//!
//! [`Simctl`] is the sole point of contact with the external device-control
//! utility. Each operation issues exactly one subprocess invocation,
//! checks the exit status, and either deserializes the output or maps the
//! utility's diagnostic text into [`Error::Command`]. Enumerations reflect
//! the state observed at call time; nothing is cached, so callers that
//! need fresher state re-invoke.
//!
//! # Requirements
//!
//! Xcode must be installed for `xcrun simctl` to be available.
//!
//! # Example
//!
//! ```no_run
//! use simkit_core::simctl::Simctl;
//!
//! # fn main() -> simkit_core::error::Result<()> {
//! let simctl = Simctl::new();
//!
//! // List all simulators
//! for device in simctl.list_devices()? {
//!     println!("{}: {} ({})", device.name(), device.udid(), device.state());
//! }
//!
//! // Create a device from loose descriptors
//! let device = simctl.create_device("CI Phone", "iPhone 15", "iOS 17.0")?;
//! device.boot()?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::device::{Device, DeviceRecord};
use crate::devicetype::{DeviceType, DeviceTypeSpec};
use crate::directory::DeviceDirectory;
use crate::error::{Error, Result};
use crate::runtime::{Runtime, RuntimeSpec};
use crate::xcode::XcodeVersion;

/// First toolchain version that ships `simctl io ... screenshot`.
const SCREENSHOT_MIN_XCODE: XcodeVersion = XcodeVersion::new(8, 2);

#[derive(Debug, Deserialize)]
struct DeviceList {
    // BTreeMap keeps enumeration order deterministic across calls.
    devices: BTreeMap<String, Vec<DeviceRecord>>,
}

#[derive(Debug, Deserialize)]
struct DeviceTypeList {
    devicetypes: Vec<DeviceType>,
}

#[derive(Debug, Deserialize)]
struct RuntimeList {
    runtimes: Vec<Runtime>,
}

/// Gateway to `xcrun simctl`.
///
/// Carries the optional device-set path (when absent, operations act on
/// the utility's default set) and the detected host toolchain version used
/// to gate commands that older toolchains lack. Cloning is cheap; a clone
/// rides inside every [`Device`] so lifecycle methods can issue commands.
#[derive(Debug, Clone)]
pub struct Simctl {
    device_set: Option<PathBuf>,
    xcode_version: Option<XcodeVersion>,
}

impl Simctl {
    /// Creates a gateway for the default device set, detecting the host
    /// toolchain version once.
    pub fn new() -> Self {
        Self {
            device_set: None,
            xcode_version: XcodeVersion::detect(),
        }
    }

    /// Creates a gateway scoped to an explicit device-set path.
    ///
    /// Every invocation passes `--set <path>`, and directory lookups gain
    /// the runtime/device-type filters that the default set cannot honor.
    pub fn with_device_set(path: impl Into<PathBuf>) -> Self {
        Self {
            device_set: Some(path.into()),
            xcode_version: XcodeVersion::detect(),
        }
    }

    /// Overrides the detected toolchain version. Primarily for tests.
    pub fn with_xcode_version(mut self, version: XcodeVersion) -> Self {
        self.xcode_version = Some(version);
        self
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            device_set: None,
            xcode_version: Some(XcodeVersion::new(15, 0)),
        }
    }

    /// The configured device-set path, if any.
    pub fn device_set(&self) -> Option<&Path> {
        self.device_set.as_deref()
    }

    /// The detected (or injected) host toolchain version, if known.
    pub fn xcode_version(&self) -> Option<XcodeVersion> {
        self.xcode_version
    }

    // -----------------------------------------------------------------------
    // Invocation plumbing
    // -----------------------------------------------------------------------

    /// Runs one `xcrun simctl` invocation, returning the raw output.
    fn invoke(&self, args: &[&str]) -> std::io::Result<std::process::Output> {
        let mut cmd = Command::new("xcrun");
        cmd.arg("simctl");
        if let Some(set) = &self.device_set {
            cmd.arg("--set").arg(set);
        }
        cmd.args(args);
        debug!(?args, "invoking simctl");
        cmd.output()
    }

    /// Runs one invocation and maps a non-zero exit into [`Error::Command`]
    /// carrying the utility's stderr intact.
    fn run(&self, action: &str, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.invoke(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(action, %stderr, "simctl command failed");
            return Err(Error::Command {
                action: action.to_string(),
                stderr,
            });
        }
        Ok(output.stdout)
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    /// Lists all devices across all runtimes, as observed at call time.
    pub fn list_devices(&self) -> Result<Vec<Device>> {
        let stdout = self.run("list devices", &["list", "devices", "-j"])?;
        self.parse_devices(&stdout)
    }

    /// Lists all known device types.
    pub fn list_devicetypes(&self) -> Result<Vec<DeviceType>> {
        let stdout = self.run("list devicetypes", &["list", "devicetypes", "-j"])?;
        parse_devicetypes(&stdout)
    }

    /// Lists all known runtimes.
    pub fn list_runtimes(&self) -> Result<Vec<Runtime>> {
        let stdout = self.run("list runtimes", &["list", "runtimes", "-j"])?;
        parse_runtimes(&stdout)
    }

    /// Parses device-list JSON into devices bound to this gateway.
    ///
    /// The listing groups devices under runtime identifier keys; each
    /// device inherits its group's runtime. Exposed primarily for testing.
    pub fn parse_devices(&self, json: &[u8]) -> Result<Vec<Device>> {
        let list: DeviceList = serde_json::from_slice(json)?;
        let devices = list
            .devices
            .into_iter()
            .flat_map(|(runtime_id, records)| {
                let simctl = self.clone();
                records.into_iter().map(move |record| {
                    Device::from_record(record, Some(runtime_id.clone()), simctl.clone())
                })
            })
            .collect();
        Ok(devices)
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Resolves a loose device-type spec against the current enumeration.
    ///
    /// No side effects; must succeed before any creation call is issued.
    pub fn resolve_devicetype(&self, spec: impl Into<DeviceTypeSpec>) -> Result<DeviceType> {
        match spec.into() {
            DeviceTypeSpec::Resolved(devicetype) => Ok(devicetype),
            descriptor => descriptor.resolve(&self.list_devicetypes()?),
        }
    }

    /// Resolves a loose runtime spec against the current enumeration.
    pub fn resolve_runtime(&self, spec: impl Into<RuntimeSpec>) -> Result<Runtime> {
        match spec.into() {
            RuntimeSpec::Resolved(runtime) => Ok(runtime),
            descriptor => descriptor.resolve(&self.list_runtimes()?),
        }
    }

    /// The highest-versioned available runtime of a platform family.
    ///
    /// # Errors
    ///
    /// - [`Error::RuntimeNotFound`] when the family has no available runtime
    pub fn latest_runtime(&self, platform: &str) -> Result<Runtime> {
        let runtimes = self.list_runtimes()?;
        Runtime::latest(platform, &runtimes)
            .cloned()
            .ok_or_else(|| Error::RuntimeNotFound {
                spec: format!("latest {}", platform),
            })
    }

    // -----------------------------------------------------------------------
    // Device creation
    // -----------------------------------------------------------------------

    /// Creates a device, resolving both specs strictly first.
    ///
    /// A failed resolution never reaches the utility's create command.
    /// Returns the first post-create snapshot; the device may still be
    /// `Creating` and settles into `Shutdown` shortly after, observable
    /// with [`Device::wait_until`].
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceTypeNotFound`] / [`Error::RuntimeNotFound`] (and
    ///   the ambiguous variants) before anything is created
    /// - [`Error::Command`] if the utility rejects the creation
    pub fn create_device(
        &self,
        name: &str,
        devicetype: impl Into<DeviceTypeSpec>,
        runtime: impl Into<RuntimeSpec>,
    ) -> Result<Device> {
        let devicetype = self.resolve_devicetype(devicetype)?;
        let runtime = self.resolve_runtime(runtime)?;
        let udid = self.create(name, &devicetype.identifier, &runtime.identifier)?;
        DeviceDirectory::new(self.clone()).by_udid(&udid)
    }

    /// Raw create: both identifiers must already be canonical. Returns the
    /// new device's udid, printed by the utility on stdout.
    pub(crate) fn create(
        &self,
        name: &str,
        devicetype_id: &str,
        runtime_id: &str,
    ) -> Result<String> {
        let stdout = self.run("create", &["create", name, devicetype_id, runtime_id])?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    // -----------------------------------------------------------------------
    // Lifecycle verbs
    // -----------------------------------------------------------------------

    /// Requests a boot. A device that is already booted is not an error.
    pub fn boot(&self, udid: &str) -> Result<()> {
        let output = self.invoke(&["boot", udid])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Already booted is not an error.
            if !stderr.contains("current state: Booted") {
                return Err(Error::Command {
                    action: "boot".to_string(),
                    stderr: stderr.into_owned(),
                });
            }
        }
        Ok(())
    }

    /// Requests a graceful shutdown.
    pub fn shutdown(&self, udid: &str) -> Result<()> {
        self.run("shutdown", &["shutdown", udid]).map(|_| ())
    }

    /// Force-terminates the device's backing `launchd_sim` process.
    ///
    /// The utility has no kill verb, so this signals the per-device
    /// launchd directly. A device with no backing process (already shut
    /// down) is not an error.
    pub fn kill(&self, udid: &str) -> Result<()> {
        let pattern = format!("launchd_sim.*{}", udid);
        debug!(udid, "killing launchd_sim");
        let output = Command::new("pkill").args(["-9", "-f", &pattern]).output()?;
        match output.status.code() {
            // 0 = killed, 1 = no matching process.
            Some(0) | Some(1) => Ok(()),
            _ => Err(Error::Command {
                action: "kill".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }

    /// Wipes a device's data.
    pub fn erase(&self, udid: &str) -> Result<()> {
        self.run("erase", &["erase", udid]).map(|_| ())
    }

    /// Renames a device.
    pub fn rename(&self, udid: &str, new_name: &str) -> Result<()> {
        self.run("rename", &["rename", udid, new_name]).map(|_| ())
    }

    /// Deletes a device.
    pub fn delete(&self, udid: &str) -> Result<()> {
        self.run("delete", &["delete", udid]).map(|_| ())
    }

    // -----------------------------------------------------------------------
    // App and interaction verbs
    // -----------------------------------------------------------------------

    /// Installs an app bundle onto a booted device.
    pub fn install(&self, udid: &str, app_path: &Path) -> Result<()> {
        self.run("install", &["install", udid, &app_path.to_string_lossy()])
            .map(|_| ())
    }

    /// Uninstalls an app by bundle identifier.
    pub fn uninstall(&self, udid: &str, bundle_id: &str) -> Result<()> {
        self.run("uninstall", &["uninstall", udid, bundle_id])
            .map(|_| ())
    }

    /// Launches an installed app by bundle identifier.
    pub fn launch_app(&self, udid: &str, bundle_id: &str) -> Result<()> {
        self.run("launch", &["launch", udid, bundle_id]).map(|_| ())
    }

    /// Opens a URL on a booted device.
    pub fn open_url(&self, udid: &str, url: &str) -> Result<()> {
        self.run("openurl", &["openurl", udid, url]).map(|_| ())
    }

    /// Captures a screenshot of a booted device to `path`.
    ///
    /// The capability is checked against the toolchain version before
    /// anything is invoked; on an unsupported host nothing is written.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedCommand`] when the toolchain predates 8.2 or
    ///   its version could not be detected
    pub fn screenshot(&self, udid: &str, path: &Path) -> Result<()> {
        match self.xcode_version {
            Some(version) if version >= SCREENSHOT_MIN_XCODE => {}
            Some(version) => {
                return Err(Error::UnsupportedCommand {
                    command: "screenshot",
                    reason: format!(
                        "requires Xcode {} or newer, found {}",
                        SCREENSHOT_MIN_XCODE, version
                    ),
                });
            }
            None => {
                return Err(Error::UnsupportedCommand {
                    command: "screenshot",
                    reason: "Xcode version could not be detected".to_string(),
                });
            }
        }
        self.run(
            "io screenshot",
            &["io", udid, "screenshot", &path.to_string_lossy()],
        )
        .map(|_| ())
    }

    /// Opens the Simulator application scoped to one device, booting it
    /// with a visible window.
    pub fn launch_gui(&self, udid: &str) -> Result<()> {
        debug!(udid, "opening Simulator app");
        let output = Command::new("open")
            .args(["-a", "Simulator", "--args", "-CurrentDeviceUDID", udid])
            .output()?;
        if !output.status.success() {
            return Err(Error::Command {
                action: "launch_gui".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

impl Default for Simctl {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses device-type-list JSON. Exposed primarily for testing.
pub fn parse_devicetypes(json: &[u8]) -> Result<Vec<DeviceType>> {
    let list: DeviceTypeList = serde_json::from_slice(json)?;
    Ok(list.devicetypes)
}

/// Parses runtime-list JSON. Exposed primarily for testing.
pub fn parse_runtimes(json: &[u8]) -> Result<Vec<Runtime>> {
    let list: RuntimeList = serde_json::from_slice(json)?;
    Ok(list.runtimes)
}
