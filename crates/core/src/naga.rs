//! Razer Naga driver: live device state and the staged-commit machine.
//!
//! Setters validate and record a change in memory and mark the device as
//! having a pending commit. [`RazerMouse::commit`] then pushes the full state
//! to the hardware: the resolution first, then every supported LED, then the
//! polling frequency. A failed commit keeps the pending mark and does not
//! undo the commands that already went through.

use crate::clock::{Clock, SystemClock};
use crate::comm::CommandChannel;
use crate::device::NagaModel;
use crate::dpi::{
    dpimapping_table, find_mapping, Axis, DpiMapping, AXES, AXIS_X, AXIS_Y, DEFAULT_DPI,
};
use crate::error::{Error, Result};
use crate::firmware::{self, FirmwareVersion};
use crate::led::{led_packet, Led, LedId, LedState, LED_COUNT};
use crate::mouse::{MouseFlags, RazerMouse};
use crate::report_rate::{self, frequency_code, frequency_packet, Frequency};
use crate::transport::ControlTransport;
use tracing::{debug, info, warn};

/// The Naga keeps a single settings profile.
pub const PROFILE_COUNT: u32 = 1;

/// An attached Naga and the state last pushed to (or staged for) it.
pub struct NagaMouse<T, C = SystemClock> {
    channel: CommandChannel<T, C>,
    model: NagaModel,
    id_string: String,
    fw_version: FirmwareVersion,
    flags: MouseFlags,
    claim_count: u32,
    /// `None` marks an LED this model does not have.
    leds: [Option<LedState>; LED_COUNT],
    frequency: Frequency,
    dpimappings: Vec<DpiMapping>,
    cur_x: usize,
    cur_y: usize,
    commit_pending: bool,
}

impl<T: ControlTransport> NagaMouse<T, SystemClock> {
    /// Attach to the Naga behind `transport`, identified by its USB product id.
    pub fn attach(transport: T, pid: u16) -> Result<Self> {
        Self::attach_with_clock(transport, pid, SystemClock)
    }
}

impl<T: ControlTransport, C: Clock> NagaMouse<T, C> {
    /// Attach using `clock` for packet spacing and retry delays.
    ///
    /// Claims the device, probes the firmware version, pushes the default
    /// state and releases the claim again. Any failure along the way drops
    /// the half-built driver with the claim released.
    pub fn attach_with_clock(transport: T, pid: u16, clock: C) -> Result<Self> {
        let model = NagaModel::from_pid(pid).ok_or_else(|| {
            Error::DeviceNotFound(format!("unsupported Naga product id 0x{pid:04X}"))
        })?;
        let id_string = format!("{}:{}", model.name(), transport.bus_id());

        let dpimappings = dpimapping_table(model.resolution_encoding())?;
        let default_idx = find_mapping(&dpimappings, DEFAULT_DPI).unwrap_or(0);

        let mut leds = [Some(LedState::On); LED_COUNT];
        if !model.has_thumb_grid_led() {
            leds[LedId::ThumbGrid.index()] = None;
        }

        let mut mouse = Self {
            channel: CommandChannel::new(transport, clock),
            model,
            id_string,
            fw_version: FirmwareVersion::default(),
            flags: MouseFlags::default(),
            claim_count: 0,
            leds,
            frequency: Frequency::Hz1000,
            dpimappings,
            cur_x: default_idx,
            cur_y: default_idx,
            commit_pending: false,
        };

        mouse.claim()?;
        let res = mouse.init();
        mouse.release();
        res?;

        info!(
            id = %mouse.id_string,
            firmware = %mouse.fw_version,
            pid = format_args!("0x{pid:04X}"),
            "Attached Razer Naga"
        );
        Ok(mouse)
    }

    fn init(&mut self) -> Result<()> {
        self.fw_version = firmware::probe(&mut self.channel)?;

        if let Some(min) = self.model.min_recommended_firmware() {
            if self.fw_version < min {
                warn!(
                    model = self.model.name(),
                    firmware = %self.fw_version,
                    recommended = %min,
                    "Firmware has known bugs; please update"
                );
                self.flags.suggest_firmware_update = true;
            }
        }

        self.do_commit()
    }

    /// Give up the device and hand the transport back.
    pub fn detach(mut self) -> T {
        if self.claim_count > 0 {
            warn!(id = %self.id_string, claims = self.claim_count, "Detaching a claimed device");
            self.claim_count = 1;
            self.release();
        }
        debug!(id = %self.id_string, "Detached");
        self.channel.into_transport()
    }

    pub fn model(&self) -> NagaModel {
        self.model
    }

    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    fn ensure_claimed(&self) -> Result<()> {
        if self.claim_count == 0 {
            return Err(Error::Busy);
        }
        Ok(())
    }

    fn check_profile(&self, profile: u32) -> Result<()> {
        if profile >= PROFILE_COUNT {
            return Err(Error::invalid(format!("unknown profile {profile}")));
        }
        Ok(())
    }

    fn mapping_index(&self, mapping: u32) -> Result<usize> {
        usize::try_from(mapping)
            .ok()
            .filter(|idx| *idx < self.dpimappings.len())
            .ok_or_else(|| Error::invalid(format!("unknown DPI mapping {mapping}")))
    }

    fn do_commit(&mut self) -> Result<()> {
        let x_dpi = self.dpimappings[self.cur_x].resolution;
        let y_dpi = self.dpimappings[self.cur_y].resolution;
        debug!(
            id = %self.id_string,
            x_dpi,
            y_dpi,
            frequency = %self.frequency,
            "Committing device state"
        );

        let mut pkt = self.model.resolution_encoding().packet(x_dpi, y_dpi);
        self.channel.send_command(&mut pkt)?;

        for id in LedId::ALL {
            if let Some(state) = self.leds[id.index()] {
                let mut pkt = led_packet(id, state);
                self.channel.send_command(&mut pkt)?;
            }
        }

        let mut pkt = frequency_packet(self.frequency)?;
        self.channel.send_command(&mut pkt)?;

        self.commit_pending = false;
        Ok(())
    }
}

impl<T: ControlTransport, C: Clock> RazerMouse for NagaMouse<T, C> {
    fn id_string(&self) -> &str {
        &self.id_string
    }

    fn name(&self) -> &str {
        self.model.name()
    }

    fn flags(&self) -> MouseFlags {
        self.flags
    }

    fn fw_version(&self) -> FirmwareVersion {
        self.fw_version
    }

    fn claim(&mut self) -> Result<()> {
        if self.claim_count == 0 {
            self.channel.transport().claim()?;
            debug!(id = %self.id_string, "Claimed device");
        }
        self.claim_count += 1;
        Ok(())
    }

    fn release(&mut self) {
        match self.claim_count {
            0 => warn!(id = %self.id_string, "Release without a matching claim"),
            1 => {
                self.claim_count = 0;
                self.channel.transport().release();
                debug!(id = %self.id_string, "Released device");
            }
            _ => self.claim_count -= 1,
        }
    }

    fn is_claimed(&self) -> bool {
        self.claim_count > 0
    }

    fn commit_pending(&self) -> bool {
        self.commit_pending
    }

    fn commit(&mut self, force: bool) -> Result<()> {
        self.ensure_claimed()?;
        if !self.commit_pending && !force {
            return Ok(());
        }
        self.do_commit()
    }

    fn leds(&self) -> Result<Vec<Led>> {
        let mut out = Vec::new();
        out.try_reserve_exact(LED_COUNT)?;
        out.extend(LedId::ALL.iter().filter_map(|id| {
            self.leds[id.index()].map(|state| Led {
                id: *id,
                name: id.name(),
                state,
            })
        }));
        Ok(out)
    }

    fn set_led(&mut self, id: LedId, state: LedState) -> Result<()> {
        self.ensure_claimed()?;
        let slot = &mut self.leds[id.index()];
        if slot.is_none() {
            return Err(Error::invalid(format!(
                "{} has no {} LED",
                self.model.name(),
                id.name()
            )));
        }
        *slot = Some(state);
        self.commit_pending = true;
        debug!(led = id.name(), %state, "Staged LED change");
        Ok(())
    }

    fn supported_frequencies(&self) -> Result<Vec<Frequency>> {
        let mut out = Vec::new();
        out.try_reserve_exact(report_rate::SUPPORTED.len())?;
        out.extend_from_slice(&report_rate::SUPPORTED);
        Ok(out)
    }

    fn supported_axes(&self) -> &[Axis] {
        &AXES
    }

    fn supported_resolutions(&self) -> Result<Vec<u32>> {
        let mut out = Vec::new();
        out.try_reserve_exact(self.dpimappings.len())?;
        out.extend(self.dpimappings.iter().map(|m| m.resolution));
        Ok(out)
    }

    fn supported_dpimappings(&self) -> &[DpiMapping] {
        &self.dpimappings
    }

    fn profile_count(&self) -> u32 {
        PROFILE_COUNT
    }

    fn frequency(&self, profile: u32) -> Result<Frequency> {
        self.check_profile(profile)?;
        Ok(self.frequency)
    }

    fn set_frequency(&mut self, profile: u32, freq: Frequency) -> Result<()> {
        self.ensure_claimed()?;
        self.check_profile(profile)?;
        frequency_code(freq)?;
        self.frequency = freq;
        self.commit_pending = true;
        debug!(frequency = %freq, "Staged frequency change");
        Ok(())
    }

    fn dpimapping(&self, profile: u32, axis: Option<u32>) -> Result<Option<DpiMapping>> {
        self.check_profile(profile)?;
        let idx = match axis {
            None | Some(AXIS_X) => self.cur_x,
            Some(AXIS_Y) => self.cur_y,
            Some(_) => return Ok(None),
        };
        Ok(Some(self.dpimappings[idx]))
    }

    fn set_dpimapping(&mut self, profile: u32, axis: Option<u32>, mapping: u32) -> Result<()> {
        self.ensure_claimed()?;
        self.check_profile(profile)?;
        let idx = self.mapping_index(mapping)?;
        match axis {
            Some(AXIS_X) => self.cur_x = idx,
            Some(AXIS_Y) => self.cur_y = idx,
            Some(id) if !AXES.iter().any(|a| a.id == id) => {
                return Err(Error::invalid(format!("unknown axis {id}")));
            }
            // Axes without their own mapping follow the shared X/Y selection.
            _ => {
                self.cur_x = idx;
                self.cur_y = idx;
            }
        }
        self.commit_pending = true;
        debug!(
            axis = ?axis,
            dpi = self.dpimappings[idx].resolution,
            "Staged DPI mapping change"
        );
        Ok(())
    }
}
