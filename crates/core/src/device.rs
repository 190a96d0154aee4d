//! Device model: product identity table and discovery.

use crate::dpi::ResolutionEncoding;
use crate::error::{Error, Result};
use crate::firmware::FirmwareVersion;
use crate::{pids, RAZER_VID};
use tracing::{debug, info};

/// Supported Naga family models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NagaModel {
    Classic,
    Epic,
    Naga2012,
    Hex,
    HexV2,
    Naga2014,
}

impl NagaModel {
    pub const ALL: &'static [NagaModel] = &[
        NagaModel::Classic,
        NagaModel::Epic,
        NagaModel::Naga2012,
        NagaModel::Hex,
        NagaModel::HexV2,
        NagaModel::Naga2014,
    ];

    /// Look up model from USB product ID.
    pub fn from_pid(pid: u16) -> Option<Self> {
        match pid {
            pids::NAGA_CLASSIC => Some(Self::Classic),
            pids::NAGA_EPIC => Some(Self::Epic),
            pids::NAGA_2012 => Some(Self::Naga2012),
            pids::NAGA_HEX => Some(Self::Hex),
            pids::NAGA_HEX_V2 => Some(Self::HexV2),
            pids::NAGA_2014 => Some(Self::Naga2014),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classic => "Naga",
            Self::Epic => "Naga Epic",
            Self::Naga2012 => "Naga 2012",
            Self::Hex => "Naga Hex",
            Self::HexV2 => "Naga Hex v2",
            Self::Naga2014 => "Naga 2014",
        }
    }

    /// USB Product ID.
    pub fn pid(&self) -> u16 {
        match self {
            Self::Classic => pids::NAGA_CLASSIC,
            Self::Epic => pids::NAGA_EPIC,
            Self::Naga2012 => pids::NAGA_2012,
            Self::Hex => pids::NAGA_HEX,
            Self::HexV2 => pids::NAGA_HEX_V2,
            Self::Naga2014 => pids::NAGA_2014,
        }
    }

    /// How this model's firmware expects resolution values.
    pub fn resolution_encoding(&self) -> ResolutionEncoding {
        match self {
            Self::Naga2014 => ResolutionEncoding::Raw,
            _ => ResolutionEncoding::Scaled,
        }
    }

    /// Number of DPI mapping slots.
    pub fn dpimapping_count(&self) -> usize {
        self.resolution_encoding().dpimapping_count()
    }

    /// Whether the thumb grid has a controllable LED.
    pub fn has_thumb_grid_led(&self) -> bool {
        matches!(self, Self::Naga2014)
    }

    /// Oldest firmware without known bugs, where one is documented.
    pub fn min_recommended_firmware(&self) -> Option<FirmwareVersion> {
        match self {
            Self::Epic => Some(FirmwareVersion::new(0x01, 0x04)),
            _ => None,
        }
    }
}

impl std::fmt::Display for NagaModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Information about a discovered Naga device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub model: NagaModel,
    pub vid: u16,
    pub pid: u16,
    pub path: String,
    pub serial: Option<String>,
}

/// Discover all connected Naga mice.
///
/// Enumerates USB HID devices and returns the configuration interface of
/// any recognized model.
pub fn discover_devices() -> Result<Vec<DeviceInfo>> {
    debug!("Starting HID device enumeration");
    let api = hidapi::HidApi::new().map_err(|e| Error::DeviceNotFound(e.to_string()))?;

    let mut devices = Vec::new();
    for info in api.device_list() {
        if info.vendor_id() != RAZER_VID || info.interface_number() > 0 {
            continue;
        }

        if let Some(model) = NagaModel::from_pid(info.product_id()) {
            info!(
                model = model.name(),
                vid = format_args!("0x{:04X}", info.vendor_id()),
                pid = format_args!("0x{:04X}", info.product_id()),
                path = %info.path().to_string_lossy(),
                "Found Razer device"
            );
            devices.push(DeviceInfo {
                model,
                vid: info.vendor_id(),
                pid: info.product_id(),
                path: info.path().to_string_lossy().into_owned(),
                serial: info.serial_number().map(|s| s.to_string()),
            });
        }
    }

    debug!(count = devices.len(), "Device enumeration complete");
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_from_known_pid() {
        assert_eq!(NagaModel::from_pid(0x0015), Some(NagaModel::Classic));
        assert_eq!(NagaModel::from_pid(0x0040), Some(NagaModel::Naga2014));
    }

    #[test]
    fn model_from_unknown_pid() {
        assert_eq!(NagaModel::from_pid(0x1234), None);
    }

    #[test]
    fn pid_table_is_consistent() {
        for model in NagaModel::ALL {
            assert_eq!(NagaModel::from_pid(model.pid()), Some(*model));
            assert!(!model.name().is_empty());
        }
    }

    #[test]
    fn only_2014_uses_raw_encoding() {
        for model in NagaModel::ALL {
            let expected = if *model == NagaModel::Naga2014 {
                (ResolutionEncoding::Raw, 82)
            } else {
                (ResolutionEncoding::Scaled, 56)
            };
            assert_eq!(
                (model.resolution_encoding(), model.dpimapping_count()),
                expected
            );
        }
    }

    #[test]
    fn only_2014_has_thumb_grid_led() {
        assert!(NagaModel::Naga2014.has_thumb_grid_led());
        assert!(!NagaModel::Classic.has_thumb_grid_led());
        assert!(!NagaModel::HexV2.has_thumb_grid_led());
    }

    #[test]
    fn only_epic_has_firmware_advisory() {
        assert_eq!(
            NagaModel::Epic.min_recommended_firmware(),
            Some(FirmwareVersion::new(1, 4))
        );
        assert_eq!(NagaModel::Hex.min_recommended_firmware(), None);
    }
}
