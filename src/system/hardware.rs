//! Queries the I/O Registry for the platform serial number.
//!
//! The serial number is used only to name the output bundle
//! (`<serial>.sparsebundle`). The query is read-only and has no side effects.

use crate::error::{AppError, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Reads the platform serial number via `ioreg`.
pub struct HardwareQuery {
    ioreg_path: String,
}

impl HardwareQuery {
    pub fn new(ioreg_path: String) -> Self {
        Self { ioreg_path }
    }

    /// Runs `ioreg -rd1 -c IOPlatformExpertDevice` and extracts
    /// `IOPlatformSerialNumber` from its output.
    pub async fn platform_serial(&self) -> Result<String> {
        debug!("Querying platform serial via {}", self.ioreg_path);

        let output = Command::new(&self.ioreg_path)
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .await
            .map_err(|e| AppError::Hardware(format!("failed to run {}: {}", self.ioreg_path, e)))?;

        if !output.status.success() {
            return Err(AppError::Hardware(format!(
                "{} exited with {}",
                self.ioreg_path, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let serial = parse_platform_serial(&stdout).ok_or_else(|| {
            AppError::Hardware("IOPlatformSerialNumber not present in ioreg output".to_string())
        })?;

        info!("Platform serial number: {}", serial);
        Ok(serial)
    }
}

/// Extracts the quoted value of the `IOPlatformSerialNumber` key from ioreg's
/// plist-style text output.
fn parse_platform_serial(output: &str) -> Option<String> {
    for line in output.lines() {
        if !line.contains("\"IOPlatformSerialNumber\"") {
            continue;
        }
        let value = line.split('=').nth(1)?.trim().trim_matches('"');
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trimmed-down capture of `ioreg -rd1 -c IOPlatformExpertDevice`.
    const IOREG_OUTPUT: &str = r#"+-o MacBookPro15,1  <class IOPlatformExpertDevice, id 0x100000110, registered>
    {
      "IOPolledInterface" = "SMCPolledInterface is not serializable"
      "IOPlatformUUID" = "D21C9FE2-6A52-4F9A-B723-09E1C1D3E1AA"
      "serial-number" = <a1b2c3>
      "IOPlatformSerialNumber" = "C02XL0GTJGH5"
      "clock-frequency" = <00e1f505>
      "model" = <"MacBookPro15,1">
    }
"#;

    #[test]
    fn parses_serial_from_ioreg_output() {
        assert_eq!(
            parse_platform_serial(IOREG_OUTPUT),
            Some("C02XL0GTJGH5".to_string())
        );
    }

    #[test]
    fn missing_key_yields_none() {
        assert_eq!(parse_platform_serial("+-o Root  <class IORegistryEntry>"), None);
    }

    #[test]
    fn empty_value_yields_none() {
        let output = "\"IOPlatformSerialNumber\" = \"\"";
        assert_eq!(parse_platform_serial(output), None);
    }
}
