//! # simkit-core
//!
//! Core library for iOS Simulator lifecycle management on macOS.
//!
//! This crate drives `xcrun simctl` to create, configure, boot, interact
//! with, and destroy simulator devices. It models the device lifecycle as
//! a small state machine whose asynchronous transitions (boot, shutdown)
//! are observed by polling fresh device snapshots, resolves loose
//! device-type and runtime descriptors into canonical identifiers before
//! any device is created, and edits per-device preference stores for
//! keyboard and language configuration.
//!
//! ## Modules
//!
//! - [`simctl`] - Gateway to the `xcrun simctl` CLI; one method per external action
//! - [`device`] - Device aggregate, lifecycle state machine, and operations
//! - [`devicetype`] / [`runtime`] - Canonical descriptors and loose-spec resolution
//! - [`directory`] - Filtered device lookup over fresh enumerations
//! - [`poll`] - Generic bounded sampler behind `Device::wait_until`
//! - [`settings`] - Per-device preference-store mutations
//! - [`xcode`] - Host toolchain version, used to gate commands
//! - [`error`] - The closed set of caller-distinguishable failure kinds
//!
//! ## Requirements
//!
//! Xcode must be installed for `xcrun simctl` to be available.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use simkit_core::device::DeviceState;
//! use simkit_core::simctl::Simctl;
//!
//! # fn main() -> simkit_core::error::Result<()> {
//! let simctl = Simctl::new();
//!
//! // Loose descriptors are resolved before anything is created.
//! let device = simctl.create_device("CI Phone", "iPhone 15", "iOS 17.0")?;
//! let device = device.wait(|d| d.state() == DeviceState::Shutdown)?;
//!
//! device.settings().disable_keyboard_helpers()?;
//! device.boot()?;
//! let device = device.wait_until(
//!     |d| d.state() == DeviceState::Booted,
//!     Duration::from_secs(60),
//!     Duration::from_millis(500),
//! )?;
//!
//! device.open_url("https://example.com")?;
//! device.shutdown()?;
//! let device = device.wait(|d| d.state() == DeviceState::Shutdown)?;
//! device.delete()?;
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod devicetype;
pub mod directory;
pub mod error;
pub mod poll;
pub mod runtime;
pub mod settings;
pub mod simctl;
pub mod xcode;
