//! Settings profiles.
//!
//! The Naga stores exactly one profile (number 0); frequency and DPI
//! mappings are reached through it.

use crate::dpi::{DpiMapping, AXIS_X, AXIS_Y};
use crate::error::{Error, Result};
use crate::mouse::RazerMouse;
use crate::report_rate::Frequency;
use serde::{Deserialize, Serialize};

/// A mutable view of one profile on a mouse.
pub struct Profile<'a> {
    nr: u32,
    mouse: &'a mut dyn RazerMouse,
}

impl<'a> Profile<'a> {
    /// Open profile `nr`, failing if the mouse has no such profile.
    pub fn open(mouse: &'a mut dyn RazerMouse, nr: u32) -> Result<Self> {
        if nr >= mouse.profile_count() {
            return Err(Error::invalid(format!("unknown profile {nr}")));
        }
        Ok(Self { nr, mouse })
    }

    pub fn nr(&self) -> u32 {
        self.nr
    }

    pub fn frequency(&self) -> Result<Frequency> {
        self.mouse.frequency(self.nr)
    }

    /// Stage a new frequency; sent on the next commit.
    pub fn set_frequency(&mut self, freq: Frequency) -> Result<()> {
        self.mouse.set_frequency(self.nr, freq)
    }

    /// Mapping on `axis`, or the shared X/Y mapping when `axis` is `None`.
    pub fn dpimapping(&self, axis: Option<u32>) -> Result<Option<DpiMapping>> {
        self.mouse.dpimapping(self.nr, axis)
    }

    /// Stage mapping slot `mapping` on `axis`, or on both X and Y when `axis` is `None`.
    pub fn set_dpimapping(&mut self, axis: Option<u32>, mapping: u32) -> Result<()> {
        self.mouse.set_dpimapping(self.nr, axis, mapping)
    }

    pub fn settings(&self) -> Result<ProfileSettings> {
        ProfileSettings::read(&*self.mouse, self.nr)
    }
}

/// Plain-data copy of a profile's current selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub nr: u32,
    pub frequency: Frequency,
    /// Resolution selected on X, in DPI.
    pub dpi_x: Option<u32>,
    /// Resolution selected on Y, in DPI.
    pub dpi_y: Option<u32>,
}

impl ProfileSettings {
    pub fn read<M: RazerMouse + ?Sized>(mouse: &M, nr: u32) -> Result<Self> {
        Ok(Self {
            nr,
            frequency: mouse.frequency(nr)?,
            dpi_x: mouse.dpimapping(nr, Some(AXIS_X))?.map(|m| m.resolution),
            dpi_y: mouse.dpimapping(nr, Some(AXIS_Y))?.map(|m| m.resolution),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_serialization_roundtrip() {
        let settings = ProfileSettings {
            nr: 0,
            frequency: Frequency::Hz500,
            dpi_x: Some(1000),
            dpi_y: Some(1800),
        };
        let json = serde_json::to_string(&settings).expect("serialize settings");
        let back: ProfileSettings = serde_json::from_str(&json).expect("deserialize settings");
        assert_eq!(back, settings);
    }
}
