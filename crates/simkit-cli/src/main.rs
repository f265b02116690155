//! CLI for iOS Simulator lifecycle management via `xcrun simctl`.
//!
//! # Usage
//!
//! ```bash
//! # List devices, device types, or runtimes
//! simkit list
//! simkit list devicetypes
//! simkit list runtimes --format json
//!
//! # Create a device from loose descriptors and wait for it to settle
//! simkit create "CI Phone" "iPhone 15" "iOS 17.0" --wait
//!
//! # Boot and wait until the device is actually up
//! simkit boot <udid> --wait
//!
//! # Drive a booted device
//! simkit install <udid> ./MyApp.app
//! simkit launch-app <udid> com.example.myapp
//! simkit open-url <udid> https://example.com
//! simkit screenshot <udid> screen.png
//!
//! # Tear down
//! simkit shutdown <udid> --wait
//! simkit delete <udid>
//!
//! # Operate on an explicit device set
//! simkit --set /tmp/ci-devices list
//! SIMKIT_DEVICE_SET=/tmp/ci-devices simkit list
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use simkit_core::device::{Device, DeviceState};
use simkit_core::directory::DeviceDirectory;
use simkit_core::error::Result;
use simkit_core::simctl::Simctl;

/// Manage iOS Simulator devices via xcrun simctl.
#[derive(Parser)]
#[command(name = "simkit")]
#[command(about = "Manage iOS Simulator devices via xcrun simctl")]
#[command(version)]
struct Cli {
    /// Device set path (defaults to the ambient CoreSimulator set)
    #[arg(long, global = true, env = "SIMKIT_DEVICE_SET")]
    set: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ListTarget {
    Devices,
    Devicetypes,
    Runtimes,
}

#[derive(Subcommand)]
enum Command {
    /// List devices, device types, or runtimes
    List {
        /// What to list
        #[arg(default_value = "devices")]
        target: ListTarget,
    },

    /// Create a device; device type and runtime accept names, partial
    /// names, or canonical identifiers
    Create {
        /// Name for the new device
        name: String,
        /// Device type (e.g. "iPhone 15")
        devicetype: String,
        /// Runtime (e.g. "iOS 17.0")
        runtime: String,
        /// Block until the device settles into Shutdown
        #[arg(long)]
        wait: bool,
        /// Wait deadline in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// Show one device by udid
    Status {
        /// Device udid
        udid: String,
    },

    /// Boot a device headlessly
    Boot {
        /// Device udid
        udid: String,
        /// Block until the device reports Booted
        #[arg(long)]
        wait: bool,
        /// Wait deadline in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Request a graceful shutdown
    Shutdown {
        /// Device udid
        udid: String,
        /// Block until the device reports Shutdown
        #[arg(long)]
        wait: bool,
        /// Wait deadline in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// Force-terminate a device's backing processes
    Kill {
        /// Device udid
        udid: String,
    },

    /// Wipe a device's data (device must be shut down)
    Erase {
        /// Device udid
        udid: String,
    },

    /// Rename a device
    Rename {
        /// Device udid
        udid: String,
        /// New device name
        new_name: String,
    },

    /// Delete a device
    Delete {
        /// Device udid
        udid: String,
    },

    /// Delete a device and recreate it with the same name, device type,
    /// and runtime under a new udid
    Reset {
        /// Device udid
        udid: String,
    },

    /// Open the Simulator app scoped to a device
    Launch {
        /// Device udid
        udid: String,
    },

    /// Install an app bundle onto a booted device
    Install {
        /// Device udid
        udid: String,
        /// Path to the .app bundle
        app_path: PathBuf,
    },

    /// Uninstall an app from a booted device
    Uninstall {
        /// Device udid
        udid: String,
        /// App bundle identifier
        bundle_id: String,
    },

    /// Launch an installed app on a booted device
    LaunchApp {
        /// Device udid
        udid: String,
        /// App bundle identifier
        bundle_id: String,
    },

    /// Open a URL on a booted device
    OpenUrl {
        /// Device udid
        udid: String,
        /// URL to open
        url: String,
    },

    /// Capture a screenshot of a booted device
    Screenshot {
        /// Device udid
        udid: String,
        /// Output image path
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let simctl = match &cli.set {
        Some(path) => Simctl::with_device_set(path),
        None => Simctl::new(),
    };
    let directory = DeviceDirectory::new(simctl.clone());
    let format = cli.format;

    match cli.command {
        Command::List { target } => list(&simctl, target, format),

        Command::Create {
            name,
            devicetype,
            runtime,
            wait,
            timeout,
        } => {
            let device = simctl.create_device(&name, devicetype.as_str(), runtime.as_str())?;
            let device = if wait {
                wait_for_state(&device, DeviceState::Shutdown, timeout)?
            } else {
                device
            };
            print_device(&device, format);
            Ok(())
        }

        Command::Status { udid } => {
            let device = directory.by_udid(&udid)?;
            print_device(&device, format);
            Ok(())
        }

        Command::Boot {
            udid,
            wait,
            timeout,
        } => {
            let device = directory.by_udid(&udid)?;
            device.boot()?;
            if wait {
                let device = wait_for_state(&device, DeviceState::Booted, timeout)?;
                print_device(&device, format);
            }
            Ok(())
        }

        Command::Shutdown {
            udid,
            wait,
            timeout,
        } => {
            let device = directory.by_udid(&udid)?;
            device.shutdown()?;
            if wait {
                let device = wait_for_state(&device, DeviceState::Shutdown, timeout)?;
                print_device(&device, format);
            }
            Ok(())
        }

        Command::Kill { udid } => directory.by_udid(&udid)?.kill(),

        Command::Erase { udid } => directory.by_udid(&udid)?.erase(),

        Command::Rename { udid, new_name } => {
            let mut device = directory.by_udid(&udid)?;
            device.rename(&new_name)?;
            print_device(&device, format);
            Ok(())
        }

        Command::Delete { udid } => directory.by_udid(&udid)?.delete(),

        Command::Reset { udid } => {
            let device = directory.by_udid(&udid)?;
            let replacement = device.reset()?;
            print_device(&replacement, format);
            Ok(())
        }

        Command::Launch { udid } => directory.by_udid(&udid)?.launch_gui(),

        Command::Install { udid, app_path } => directory.by_udid(&udid)?.install(&app_path),

        Command::Uninstall { udid, bundle_id } => {
            directory.by_udid(&udid)?.uninstall(&bundle_id)
        }

        Command::LaunchApp { udid, bundle_id } => {
            directory.by_udid(&udid)?.launch_app(&bundle_id)
        }

        Command::OpenUrl { udid, url } => directory.by_udid(&udid)?.open_url(&url),

        Command::Screenshot { udid, output } => directory.by_udid(&udid)?.screenshot(&output),
    }
}

fn wait_for_state(device: &Device, state: DeviceState, timeout_secs: u64) -> Result<Device> {
    device.wait_until(
        |d| d.state() == state,
        Duration::from_secs(timeout_secs),
        Duration::from_millis(500),
    )
}

fn list(simctl: &Simctl, target: ListTarget, format: OutputFormat) -> Result<()> {
    match target {
        ListTarget::Devices => {
            let devices = simctl.list_devices()?;
            match format {
                OutputFormat::Json => {
                    let values: Vec<_> = devices.iter().map(device_json).collect();
                    println!("{}", serde_json::to_string_pretty(&values)?);
                }
                OutputFormat::Text => {
                    for device in &devices {
                        println!(
                            "{}  {}  {}  {}",
                            device.udid(),
                            device.state(),
                            device.os().unwrap_or_else(|| "?".to_string()),
                            device.name(),
                        );
                    }
                }
            }
        }
        ListTarget::Devicetypes => {
            let devicetypes = simctl.list_devicetypes()?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&devicetypes)?);
                }
                OutputFormat::Text => {
                    for dt in &devicetypes {
                        println!("{}  {}", dt.identifier, dt.name);
                    }
                }
            }
        }
        ListTarget::Runtimes => {
            let runtimes = simctl.list_runtimes()?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&runtimes)?);
                }
                OutputFormat::Text => {
                    for rt in &runtimes {
                        let marker = if rt.is_available { "" } else { "  (unavailable)" };
                        println!("{}  {}{}", rt.identifier, rt.name, marker);
                    }
                }
            }
        }
    }
    Ok(())
}

fn device_json(device: &Device) -> serde_json::Value {
    serde_json::json!({
        "udid": device.udid(),
        "name": device.name(),
        "state": device.state().to_string(),
        "os": device.os(),
        "isAvailable": device.is_available(),
        "deviceTypeIdentifier": device.device_type_identifier(),
        "runtimeIdentifier": device.runtime_identifier(),
        "lastBootedAt": device.last_booted_at().map(|t| t.to_rfc3339()),
    })
}

fn print_device(device: &Device, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&device_json(device)) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("error: {e}"),
        },
        OutputFormat::Text => {
            println!("udid:   {}", device.udid());
            println!("name:   {}", device.name());
            println!("state:  {}", device.state());
            if let Some(os) = device.os() {
                println!("os:     {os}");
            }
            println!("available: {}", device.is_available());
        }
    }
}
