//! Capability interface every mouse driver exposes to the daemon layer.
//!
//! Setters only stage changes. Nothing reaches the hardware until
//! [`RazerMouse::commit`], and both setters and commit require the device
//! to be claimed.

use crate::dpi::{Axis, DpiMapping};
use crate::error::Result;
use crate::firmware::FirmwareVersion;
use crate::led::{Led, LedId, LedState};
use crate::profile::ProfileSettings;
use crate::report_rate::Frequency;
use serde::Serialize;

/// Advisory flags raised by a driver at attach.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MouseFlags {
    /// The firmware has known bugs and should be upgraded.
    pub suggest_firmware_update: bool,
}

/// A configurable mouse.
pub trait RazerMouse: Send {
    /// Unique identification string, `"<model>:<bus location>"`.
    fn id_string(&self) -> &str;

    /// Model display name.
    fn name(&self) -> &str;

    fn flags(&self) -> MouseFlags;

    fn fw_version(&self) -> FirmwareVersion;

    /// Take exclusive ownership. Claims nest; each needs a matching release.
    fn claim(&mut self) -> Result<()>;

    fn release(&mut self);

    fn is_claimed(&self) -> bool;

    /// Whether staged changes are waiting for a commit.
    fn commit_pending(&self) -> bool;

    /// Flush staged changes to the hardware; `force` resends everything.
    fn commit(&mut self, force: bool) -> Result<()>;

    /// Supported LEDs with their current state.
    fn leds(&self) -> Result<Vec<Led>>;

    fn set_led(&mut self, id: LedId, state: LedState) -> Result<()>;

    fn supported_frequencies(&self) -> Result<Vec<Frequency>>;

    fn supported_axes(&self) -> &[Axis];

    /// Selectable resolutions in DPI, one per mapping slot.
    fn supported_resolutions(&self) -> Result<Vec<u32>>;

    fn supported_dpimappings(&self) -> &[DpiMapping];

    fn profile_count(&self) -> u32;

    fn frequency(&self, profile: u32) -> Result<Frequency>;

    fn set_frequency(&mut self, profile: u32, freq: Frequency) -> Result<()>;

    fn dpimapping(&self, profile: u32, axis: Option<u32>) -> Result<Option<DpiMapping>>;

    fn set_dpimapping(&mut self, profile: u32, axis: Option<u32>, mapping: u32) -> Result<()>;
}

/// Run `f` with `mouse` claimed, releasing it afterwards whatever the outcome.
pub fn with_claim<M, R>(mouse: &mut M, f: impl FnOnce(&mut M) -> Result<R>) -> Result<R>
where
    M: RazerMouse + ?Sized,
{
    mouse.claim()?;
    let out = f(mouse);
    mouse.release();
    out
}

/// Serializable summary of a mouse's capabilities and current state.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub id: String,
    pub name: String,
    pub firmware: String,
    pub flags: MouseFlags,
    pub leds: Vec<Led>,
    pub supported_frequencies: Vec<Frequency>,
    pub supported_resolutions: Vec<u32>,
    pub axes: Vec<Axis>,
    pub profiles: Vec<ProfileSettings>,
}

impl DeviceSnapshot {
    pub fn capture<M: RazerMouse + ?Sized>(mouse: &M) -> Result<Self> {
        let profiles = (0..mouse.profile_count())
            .map(|nr| ProfileSettings::read(mouse, nr))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: mouse.id_string().to_string(),
            name: mouse.name().to_string(),
            firmware: mouse.fw_version().to_string(),
            flags: mouse.flags(),
            leds: mouse.leds()?,
            supported_frequencies: mouse.supported_frequencies()?,
            supported_resolutions: mouse.supported_resolutions()?,
            axes: mouse.supported_axes().to_vec(),
            profiles,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
