//! Model-level tests over canned listings: resolution before creation,
//! identity semantics, filter AND-logic, and poll-driven state observation,
//! all through the public API without touching a real simulator.

use std::collections::VecDeque;
use std::time::Duration;

use simkit_core::device::{Device, DeviceState};
use simkit_core::devicetype::DeviceTypeSpec;
use simkit_core::directory::DeviceFilter;
use simkit_core::error::Error;
use simkit_core::poll::{sample_until, Sampled};
use simkit_core::runtime::RuntimeSpec;
use simkit_core::simctl::{parse_devicetypes, parse_runtimes, Simctl};

const DEVICETYPES: &str = r#"{
    "devicetypes": [
        {"name": "iPhone 15", "identifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15"},
        {"name": "iPhone 15 Pro", "identifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15-Pro"}
    ]
}"#;

const RUNTIMES: &str = r#"{
    "runtimes": [
        {"name": "iOS 16.4", "identifier": "com.apple.CoreSimulator.SimRuntime.iOS-16-4", "version": "16.4", "isAvailable": true},
        {"name": "iOS 17.0", "identifier": "com.apple.CoreSimulator.SimRuntime.iOS-17-0", "version": "17.0", "isAvailable": true}
    ]
}"#;

fn device_listing(state: &str) -> String {
    format!(
        r#"{{
            "devices": {{
                "com.apple.CoreSimulator.SimRuntime.iOS-17-0": [
                    {{
                        "udid": "FIXED-UDID-1234",
                        "name": "Model Phone",
                        "state": "{state}",
                        "isAvailable": true,
                        "deviceTypeIdentifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-15"
                    }}
                ]
            }}
        }}"#
    )
}

fn snapshot_via(simctl: &Simctl, state: &str) -> Device {
    let devices = simctl.parse_devices(device_listing(state).as_bytes()).unwrap();
    devices.into_iter().next().unwrap()
}

fn snapshot(state: &str) -> Device {
    snapshot_via(&Simctl::with_device_set("/tmp/model-set"), state)
}

// ---------------------------------------------------------------------------
// Resolution fails fast, before any creation could be attempted
// ---------------------------------------------------------------------------

#[test]
fn unresolvable_devicetype_fails_with_typed_error() {
    let devicetypes = parse_devicetypes(DEVICETYPES.as_bytes()).unwrap();
    let result = DeviceTypeSpec::from("iPhone 99 Ultra").resolve(&devicetypes);
    assert!(matches!(result, Err(Error::DeviceTypeNotFound { .. })));
}

#[test]
fn unresolvable_runtime_fails_with_typed_error() {
    let runtimes = parse_runtimes(RUNTIMES.as_bytes()).unwrap();
    let result = RuntimeSpec::from("iOS 99.0").resolve(&runtimes);
    assert!(matches!(result, Err(Error::RuntimeNotFound { .. })));
}

#[test]
fn resolution_yields_canonical_identifiers() {
    let devicetypes = parse_devicetypes(DEVICETYPES.as_bytes()).unwrap();
    let runtimes = parse_runtimes(RUNTIMES.as_bytes()).unwrap();

    let devicetype = DeviceTypeSpec::from("iPhone 15").resolve(&devicetypes).unwrap();
    let runtime = RuntimeSpec::from("iOS 17.0").resolve(&runtimes).unwrap();

    assert_eq!(
        devicetype.identifier,
        "com.apple.CoreSimulator.SimDeviceType.iPhone-15"
    );
    assert_eq!(
        runtime.identifier,
        "com.apple.CoreSimulator.SimRuntime.iOS-17-0"
    );
}

// ---------------------------------------------------------------------------
// Snapshot identity survives state changes
// ---------------------------------------------------------------------------

#[test]
fn snapshots_across_states_compare_equal() {
    let before = snapshot("Shutdown");
    let after = snapshot("Booted");

    assert_eq!(before, after);
    assert_eq!(before.state(), DeviceState::Shutdown);
    assert_eq!(after.state(), DeviceState::Booted);
}

// ---------------------------------------------------------------------------
// Directory filters: all must match, one mismatch excludes
// ---------------------------------------------------------------------------

#[test]
fn fully_matching_filter_selects_the_device() {
    let devicetypes = parse_devicetypes(DEVICETYPES.as_bytes()).unwrap();
    let runtimes = parse_runtimes(RUNTIMES.as_bytes()).unwrap();
    let device = snapshot("Shutdown");

    let filter = DeviceFilter::new()
        .udid("FIXED-UDID-1234")
        .name("Model Phone")
        .runtime(&runtimes[1])
        .devicetype(&devicetypes[0]);
    assert!(filter.matches(&device));
}

#[test]
fn any_single_mismatch_excludes_the_device() {
    let devicetypes = parse_devicetypes(DEVICETYPES.as_bytes()).unwrap();
    let runtimes = parse_runtimes(RUNTIMES.as_bytes()).unwrap();
    let device = snapshot("Shutdown");

    let wrong_udid = DeviceFilter::new().udid("OTHER").name("Model Phone");
    assert!(!wrong_udid.matches(&device));

    let wrong_name = DeviceFilter::new().udid("FIXED-UDID-1234").name("Other");
    assert!(!wrong_name.matches(&device));

    // iOS 16.4 is not this device's runtime group.
    let wrong_runtime = DeviceFilter::new()
        .udid("FIXED-UDID-1234")
        .runtime(&runtimes[0]);
    assert!(!wrong_runtime.matches(&device));

    let wrong_devicetype = DeviceFilter::new()
        .udid("FIXED-UDID-1234")
        .devicetype(&devicetypes[1]);
    assert!(!wrong_devicetype.matches(&device));
}

// ---------------------------------------------------------------------------
// Poll engine over a scripted boot sequence
// ---------------------------------------------------------------------------

#[test]
fn wait_observes_boot_sequence_completing() {
    // Scripted transition: two Booting samples, then Booted.
    let simctl = Simctl::with_device_set("/tmp/model-set");
    let mut sequence: VecDeque<Device> = ["Booting", "Booting", "Booted"]
        .iter()
        .map(|state| snapshot_via(&simctl, state))
        .collect();

    let result = sample_until(
        Duration::from_secs(5),
        Duration::from_millis(1),
        || Ok::<_, Error>(sequence.pop_front().expect("sequence exhausted")),
        |d: &Device| d.state() == DeviceState::Booted,
    )
    .unwrap();

    match result {
        Sampled::Satisfied(device) => assert_eq!(device.state(), DeviceState::Booted),
        Sampled::TimedOut(_) => panic!("boot sequence should have completed"),
    }
}

#[test]
fn wait_timeout_reports_last_observed_state() {
    let simctl = Simctl::with_device_set("/tmp/model-set");
    let result = sample_until(
        Duration::from_millis(20),
        Duration::from_millis(1),
        || Ok::<_, Error>(snapshot_via(&simctl, "Booting")),
        |d: &Device| d.state() == DeviceState::Booted,
    )
    .unwrap();

    match result {
        Sampled::TimedOut(Some(last)) => assert_eq!(last.state(), DeviceState::Booting),
        other => panic!("expected timeout with last sample, got {:?}", other),
    }
}
