//! 1-Wire sysfs device access.
//!
//! This module is the hardware boundary of the crate: it enumerates
//! DS18B20-class probes on the 1-Wire bus, writes the precision setting to a
//! probe's control file, and parses the kernel's `w1_slave` status record
//! into a Celsius reading. No retry or smoothing logic lives here; the
//! polling loop owns all of that.

use crate::error::{Result, SensorError};
use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// 1-Wire family code prefixes for DS18B20-class temperature sensors.
pub const W1_FAMILY_PREFIXES: [&str; 2] = ["28", "10"];

/// Default sysfs mount point of the 1-Wire bus.
pub const DEFAULT_BUS_ROOT: &str = "/sys/bus/w1/devices";

/// Directory name of the bus master that exposes slave status files.
const BUS_MASTER: &str = "w1_bus_master1";

/// Handle to the 1-Wire bus directory in sysfs.
///
/// The root defaults to [`DEFAULT_BUS_ROOT`] and can be overridden, which
/// keeps every code path testable against a plain directory tree.
#[derive(Debug, Clone)]
pub struct W1Bus {
    root: PathBuf,
}

impl Default for W1Bus {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_BUS_ROOT),
        }
    }
}

impl W1Bus {
    /// Create a bus handle rooted at the standard sysfs location.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus handle rooted at a custom directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Enumerate addresses of temperature sensors on the bus.
    ///
    /// Only entries whose name starts with a DS18B20 family code ("28" or
    /// "10") are returned. Any enumeration failure yields an empty list:
    /// discovery feeds address selection in a UI, so there is nothing useful
    /// to propagate.
    pub fn discover_sensors(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!("1-Wire bus enumeration failed: {}", err);
                return Vec::new();
            }
        };

        let mut addresses: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| {
                W1_FAMILY_PREFIXES
                    .iter()
                    .any(|prefix| name.starts_with(prefix))
            })
            .collect();
        addresses.sort();
        addresses
    }

    /// Create a probe handle for a single sensor on this bus.
    pub fn probe(&self, address: impl Into<String>) -> W1Probe {
        W1Probe {
            root: self.root.clone(),
            address: address.into(),
        }
    }
}

/// Handle to one physical sensor identified by its bus address.
#[derive(Debug, Clone)]
pub struct W1Probe {
    root: PathBuf,
    address: String,
}

impl W1Probe {
    /// The bus address of this probe.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Control file that accepts the precision setting.
    fn control_path(&self) -> PathBuf {
        self.root.join(&self.address).join("w1_slave")
    }

    /// Status file holding the latest conversion record.
    fn status_path(&self) -> PathBuf {
        self.root
            .join(BUS_MASTER)
            .join(&self.address)
            .join("w1_slave")
    }

    /// Write the ADC precision (9-12 bits) to the sensor's control file.
    ///
    /// Values outside 9-12 fail before any I/O is attempted. A failed write
    /// maps to [`SensorError::Precision`]; changing the precision usually
    /// requires root, so callers treat this as a soft failure.
    pub fn set_precision(&self, bits: u8) -> Result<()> {
        if !(9..=12).contains(&bits) {
            return Err(SensorError::config(format!(
                "sensor precision '{}' is out of range (9-12)",
                bits
            )));
        }

        fs::write(self.control_path(), format!("{}\n", bits)).map_err(|err| {
            SensorError::precision(format!(
                "could not write {} bit precision for {}: {}",
                bits, self.address, err
            ))
        })
    }

    /// Read the latest temperature conversion in Celsius.
    ///
    /// Returns `Ok(None)` when the record's CRC marker is not "YES", which
    /// means a conversion is still in progress or failed its checksum. That
    /// is a routine condition; the poll cadence is the retry mechanism.
    pub fn read_temperature(&self) -> Result<Option<f64>> {
        let content = fs::read_to_string(self.status_path())?;
        parse_status_record(&content)
    }
}

/// Parse a `w1_slave` status record into a Celsius reading.
///
/// The kernel format is two lines of hex bytes; token 11 of the first line
/// is "YES" once the CRC checks out, and the second line ends with a
/// `t=<millidegrees>` pair.
fn parse_status_record(content: &str) -> Result<Option<f64>> {
    let first_line = content.lines().next().unwrap_or("");
    let ready = first_line.split(' ').nth(11);
    if ready != Some("YES") {
        return Ok(None);
    }

    let raw = content
        .rsplit('=')
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SensorError::parse("status record has no '=' value"))?;
    let millidegrees: f64 = raw
        .parse()
        .map_err(|_| SensorError::parse(format!("bad millidegree value '{}'", raw)))?;

    Ok(Some(millidegrees / 1000.0))
}

/// Load the 1-Wire kernel modules, ignoring failures.
///
/// The modules may already be loaded, or the process may lack privilege;
/// neither should prevent an instance from starting. Idempotent, intended to
/// be called once by the host before any polling begins.
pub fn load_driver_modules() {
    for module in ["w1-gpio", "w1-therm"] {
        match Command::new("modprobe").arg(module).status() {
            Ok(status) if status.success() => {
                tracing::debug!("loaded kernel module {}", module);
            }
            Ok(status) => {
                tracing::debug!("modprobe {} exited with {}", module, status);
            }
            Err(err) => {
                tracing::debug!("modprobe {} could not run: {}", module, err);
            }
        }
    }
}
