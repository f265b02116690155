//! Per-device preference stores.
//!
//! Simulator devices keep key-value settings in property-list files under
//! their data directory. [`Settings`] exposes the mutations this toolkit
//! needs: hardware keyboard attachment, the on-screen keyboard helpers
//! that interfere with scripted text input, and the device language.
//!
//! Every operation loads the store (creating an empty dictionary when the
//! file is absent), mutates the named keys, and flushes atomically via a
//! temp-file rename on every exit path. A failed mutation can therefore
//! never leave a truncated store behind, and the store's existence after
//! any operation is a guaranteed post-condition. Operations are
//! idempotent at the key level.

use std::path::{Path, PathBuf};

use plist::{Dictionary, Value};
use tracing::debug;
use uuid::Uuid;

use crate::device::Device;
use crate::error::Result;

/// Keyboard preferences, relative to the device data directory.
const PREFERENCES_PLIST: &str = "Library/Preferences/com.apple.Preferences.plist";

/// Global preferences (language, locale), relative to the data directory.
const GLOBAL_PREFERENCES_PLIST: &str = "Library/Preferences/.GlobalPreferences.plist";

const HARDWARE_KEYBOARD_KEY: &str = "ConnectHardwareKeyboard";

/// Keyboard helper features disabled as a group for scripted input.
const KEYBOARD_HELPER_KEYS: [&str; 4] = [
    "KeyboardAutocapitalization",
    "KeyboardAutocorrection",
    "KeyboardPrediction",
    "KeyboardPeriodShortcut",
];

const LANGUAGES_KEY: &str = "AppleLanguages";
const LOCALE_KEY: &str = "AppleLocale";

/// Settings subsystem for one device's preference stores.
///
/// Obtained from [`Device::settings`].
pub struct Settings<'a> {
    device: &'a Device,
}

impl<'a> Settings<'a> {
    pub(crate) fn new(device: &'a Device) -> Self {
        Self { device }
    }

    /// Attaches or detaches the hardware keyboard.
    pub fn update_hardware_keyboard(&self, enabled: bool) -> Result<()> {
        let path = self.preferences_plist()?;
        debug!(udid = self.device.udid(), enabled, "updating hardware keyboard");
        with_store(&path, |dict| {
            dict.insert(HARDWARE_KEYBOARD_KEY.to_string(), Value::Boolean(enabled));
            Ok(())
        })
    }

    /// Disables autocapitalization, autocorrection, prediction, and the
    /// period shortcut, so scripted text input arrives verbatim.
    pub fn disable_keyboard_helpers(&self) -> Result<()> {
        let path = self.preferences_plist()?;
        debug!(udid = self.device.udid(), "disabling keyboard helpers");
        with_store(&path, |dict| {
            for key in KEYBOARD_HELPER_KEYS {
                dict.insert(key.to_string(), Value::Boolean(false));
            }
            Ok(())
        })
    }

    /// Sets the device language and locale.
    pub fn set_language(&self, locale: &str) -> Result<()> {
        let path = self.global_preferences_plist()?;
        debug!(udid = self.device.udid(), locale, "setting language");
        with_store(&path, |dict| {
            dict.insert(
                LANGUAGES_KEY.to_string(),
                Value::Array(vec![Value::String(locale.to_string())]),
            );
            dict.insert(LOCALE_KEY.to_string(), Value::String(locale.to_string()));
            Ok(())
        })
    }

    /// Path to the device's keyboard preference store.
    pub fn preferences_plist(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(PREFERENCES_PLIST))
    }

    /// Path to the device's global preference store.
    pub fn global_preferences_plist(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(GLOBAL_PREFERENCES_PLIST))
    }

    /// The device data directory: the listing's `dataPath` when present,
    /// otherwise derived from the device-set location.
    fn data_dir(&self) -> Result<PathBuf> {
        if let Some(path) = self.device.data_path() {
            return Ok(path.to_path_buf());
        }
        let root = match self.device.gateway().device_set() {
            Some(set) => set.to_path_buf(),
            None => dirs::home_dir()
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "home directory could not be determined",
                    )
                })?
                .join("Library/Developer/CoreSimulator/Devices"),
        };
        Ok(root.join(self.device.udid()).join("data"))
    }
}

/// Loads the dictionary at `path` (empty when absent), applies `mutate`,
/// and flushes the result. The flush happens on every exit path, so the
/// store exists and parses afterward even when the mutation failed.
fn with_store<F>(path: &Path, mutate: F) -> Result<()>
where
    F: FnOnce(&mut Dictionary) -> Result<()>,
{
    let mut dict = if path.exists() {
        match Value::from_file(path)? {
            Value::Dictionary(dict) => dict,
            _ => Dictionary::new(),
        }
    } else {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Dictionary::new()
    };

    let outcome = mutate(&mut dict);
    let flushed = flush_atomic(path, &dict);
    outcome.and(flushed)
}

/// Writes the dictionary to a uuid-named sibling temp file, then renames
/// it over `path`, so readers never observe a partial store.
fn flush_atomic(path: &Path, dict: &Dictionary) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let temp = parent.join(format!(".simkit-{}.tmp", Uuid::new_v4()));
    Value::Dictionary(dict.clone()).to_file_binary(&temp)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}
