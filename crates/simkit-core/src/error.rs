//! Error types shared across the crate.
//!
//! All fallible operations return [`Result`] with a single crate-level
//! [`Error`] enum, so callers can branch on a closed set of failure kinds:
//! resolution failures are fixed by correcting the spec, capability
//! failures by upgrading the toolchain, command failures carry the
//! utility's diagnostic text, and wait timeouts carry the last observed
//! device state.

use std::time::Duration;

use thiserror::Error;

use crate::device::DeviceState;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when managing simulator devices.
#[derive(Error, Debug)]
pub enum Error {
    /// No device type matched the supplied spec.
    #[error("Device type not found: {spec}")]
    DeviceTypeNotFound {
        /// The descriptor that failed to resolve.
        spec: String,
    },

    /// A partial device type spec matched more than one device type.
    #[error("Device type spec '{spec}' is ambiguous: matches {candidates:?}")]
    DeviceTypeAmbiguous {
        /// The descriptor that was ambiguous.
        spec: String,
        /// Names of the device types that matched.
        candidates: Vec<String>,
    },

    /// No runtime matched the supplied spec.
    #[error("Runtime not found: {spec}")]
    RuntimeNotFound {
        /// The descriptor that failed to resolve.
        spec: String,
    },

    /// A partial runtime spec matched more than one runtime.
    #[error("Runtime spec '{spec}' is ambiguous: matches {candidates:?}")]
    RuntimeAmbiguous {
        /// The descriptor that was ambiguous.
        spec: String,
        /// Names of the runtimes that matched.
        candidates: Vec<String>,
    },

    /// No device with the given udid exists in the enumerated set.
    #[error("Device not found: {udid}")]
    DeviceNotFound {
        /// The udid that was looked up.
        udid: String,
    },

    /// An operation was attempted in a device state it does not permit.
    #[error("Cannot {operation} while device is {actual} (requires {required})")]
    WrongState {
        /// The operation that was refused.
        operation: &'static str,
        /// The state the operation requires.
        required: DeviceState,
        /// The state the device was actually in.
        actual: DeviceState,
    },

    /// The host toolchain predates support for the requested command.
    ///
    /// Checked proactively, before the utility is invoked.
    #[error("Command '{command}' is not supported: {reason}")]
    UnsupportedCommand {
        /// The gated command.
        command: &'static str,
        /// Why the command is unavailable.
        reason: String,
    },

    /// A directory filter that the current device-set mode cannot honor.
    ///
    /// Filtering by runtime or device type requires an explicit device-set
    /// path; the default-set enumeration does not expose those attributes
    /// reliably.
    #[error("Filter '{filter}' requires an explicit device set path")]
    FilterUnavailable {
        /// The rejected filter.
        filter: &'static str,
    },

    /// A requested state transition did not complete within the deadline.
    #[error("Timed out after {waited:?} waiting for device (last state: {last_state:?})")]
    WaitTimeout {
        /// How long the wait ran before giving up.
        waited: Duration,
        /// The state observed on the final sample, if any sample succeeded.
        last_state: Option<DeviceState>,
    },

    /// The external utility rejected or failed the request.
    #[error("simctl {action} failed: {stderr}")]
    Command {
        /// The action that was attempted.
        action: String,
        /// The utility's diagnostic output, intact.
        stderr: String,
    },

    /// An I/O error occurred while invoking the utility or touching disk.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the utility's JSON output.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or write a preference store.
    #[error("Property list error: {0}")]
    Plist(#[from] plist::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_includes_spec() {
        let err = Error::DeviceTypeNotFound {
            spec: "iPhone 99".to_string(),
        };
        assert_eq!(err.to_string(), "Device type not found: iPhone 99");

        let err = Error::RuntimeNotFound {
            spec: "iOS 99.0".to_string(),
        };
        assert_eq!(err.to_string(), "Runtime not found: iOS 99.0");
    }

    #[test]
    fn ambiguous_display_lists_candidates() {
        let err = Error::DeviceTypeAmbiguous {
            spec: "iPhone".to_string(),
            candidates: vec!["iPhone 15".to_string(), "iPhone 15 Pro".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("iPhone 15"));
        assert!(msg.contains("iPhone 15 Pro"));
    }

    #[test]
    fn command_display_keeps_stderr_intact() {
        let err = Error::Command {
            action: "boot".to_string(),
            stderr: "Unable to boot device in current state: Booted".to_string(),
        };
        assert!(err.to_string().contains("current state: Booted"));
    }

    #[test]
    fn wait_timeout_display_carries_last_state() {
        let err = Error::WaitTimeout {
            waited: Duration::from_secs(30),
            last_state: Some(DeviceState::Booting),
        };
        assert!(err.to_string().contains("Booting"));
    }

    #[test]
    fn wrong_state_display_names_both_states() {
        let err = Error::WrongState {
            operation: "erase",
            required: DeviceState::Shutdown,
            actual: DeviceState::Booted,
        };
        let msg = err.to_string();
        assert!(msg.contains("erase"));
        assert!(msg.contains("Shutdown"));
        assert!(msg.contains("Booted"));
    }
}
