//! naga CLI: command-line configuration tool for Razer Naga mice.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use naga_core::device::{discover_devices, DeviceInfo};
use naga_core::dpi::{find_mapping, AXIS_X, AXIS_Y};
use naga_core::led::{LedId, LedState};
use naga_core::mouse::{with_claim, DeviceSnapshot};
use naga_core::report_rate::Frequency;
use naga_core::transport::{ControlTransport, REQUEST_CLEAR_FEATURE, REQUEST_SET_CONFIGURATION};
use naga_core::{NagaMouse, RazerMouse};
use std::ffi::CString;
use std::time::Duration;
use tracing::warn;

/// Control transport over hidapi feature reports.
///
/// The Naga's vendor requests are HID class SET_REPORT/GET_REPORT on
/// interface 0 with value `0x0300`: feature report type, report id 0.
struct HidFeatureTransport {
    device: hidapi::HidDevice,
    bus_id: String,
}

impl HidFeatureTransport {
    fn open(info: &DeviceInfo) -> Result<Self> {
        let api = hidapi::HidApi::new().context("hidapi init")?;
        let path = CString::new(info.path.as_str()).context("device path")?;
        let device = api.open_path(&path).with_context(|| {
            format!(
                "open HID device (VID=0x{:04X} PID=0x{:04X})",
                info.vid, info.pid
            )
        })?;
        Ok(Self {
            device,
            bus_id: info.path.clone(),
        })
    }
}

fn hid_error(request: u8, value: u16, e: impl std::fmt::Display) -> naga_core::Error {
    naga_core::Error::Io {
        request,
        value,
        reason: e.to_string(),
    }
}

fn check_request(expected: u8, request: u8, value: u16) -> naga_core::Result<()> {
    if request != expected {
        return Err(hid_error(request, value, "unsupported control request"));
    }
    Ok(())
}

impl ControlTransport for HidFeatureTransport {
    fn control_out(
        &self,
        request: u8,
        value: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> naga_core::Result<usize> {
        check_request(REQUEST_SET_CONFIGURATION, request, value)?;
        let mut report = Vec::with_capacity(data.len() + 1);
        report.push((value & 0xFF) as u8);
        report.extend_from_slice(data);
        self.device
            .send_feature_report(&report)
            .map_err(|e| hid_error(request, value, e))?;
        Ok(data.len())
    }

    fn control_in(
        &self,
        request: u8,
        value: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> naga_core::Result<usize> {
        check_request(REQUEST_CLEAR_FEATURE, request, value)?;
        let mut report = vec![0u8; buf.len() + 1];
        report[0] = (value & 0xFF) as u8;
        let n = self
            .device
            .get_feature_report(&mut report)
            .map_err(|e| hid_error(request, value, e))?;
        // The returned length includes the report id byte.
        let n = n.saturating_sub(1).min(buf.len());
        buf[..n].copy_from_slice(&report[1..=n]);
        Ok(n)
    }

    fn bus_id(&self) -> String {
        self.bus_id.clone()
    }
}

#[derive(Parser)]
#[command(name = "naga", version, about = "Razer Naga mouse configuration")]
struct Cli {
    /// Product id of the mouse to use (e.g. 0x0040); defaults to the first one found.
    #[arg(long, global = true, value_parser = parse_pid)]
    pid: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected Naga mice.
    List {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show firmware, LEDs, frequency and resolution of a mouse.
    Info {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Switch an LED on or off.
    SetLed {
        /// LED: scroll, logo or thumb.
        led: String,
        #[arg(value_enum)]
        state: OnOff,
    },
    /// Set the polling frequency (125, 500 or 1000 Hz).
    SetFreq {
        /// Frequency in Hz.
        hz: u32,
    },
    /// Set the resolution, in steps of 100 DPI.
    SetDpi {
        dpi: u32,
        /// Only change one axis.
        #[arg(long, value_enum)]
        axis: Option<AxisArg>,
    },
    /// Push the full device state again.
    Commit {
        /// Resend even if nothing changed.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OnOff {
    On,
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
enum AxisArg {
    X,
    Y,
}

fn parse_pid(s: &str) -> std::result::Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid product id '{s}': {e}"))
}

fn open_mouse(pid: Option<u16>) -> Result<NagaMouse<HidFeatureTransport>> {
    let devices = discover_devices()?;
    let info = devices
        .iter()
        .find(|d| pid.map_or(true, |p| d.pid == p))
        .ok_or_else(|| anyhow::anyhow!("No matching Razer Naga found"))?;
    let transport = HidFeatureTransport::open(info)?;
    NagaMouse::attach(transport, info.pid)
        .with_context(|| format!("attach {}", info.model.name()))
}

/// Commit staged changes, re-issuing once after a transfer error.
fn commit(mouse: &mut NagaMouse<HidFeatureTransport>, force: bool) -> naga_core::Result<()> {
    match mouse.commit(force) {
        Err(e) if e.is_retryable() => {
            warn!("Commit failed, retrying: {e}");
            mouse.commit(force)
        }
        res => res,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { json } => {
            let devices = discover_devices()?;
            if json {
                let list: Vec<_> = devices
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "model": d.model.name(),
                            "vid": d.vid,
                            "pid": d.pid,
                            "path": d.path,
                            "serial": d.serial,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else if devices.is_empty() {
                println!("No Razer Naga mice found.");
                println!("Ensure the mouse is connected and you can access its hidraw node.");
            } else {
                for dev in &devices {
                    println!(
                        "{} (VID: 0x{:04X}, PID: 0x{:04X}, path: {})",
                        dev.model.name(),
                        dev.vid,
                        dev.pid,
                        dev.path
                    );
                }
            }
        }
        Commands::Info { json } => {
            let mouse = open_mouse(cli.pid)?;
            let snapshot = DeviceSnapshot::capture(&mouse)?;
            if json {
                println!("{}", snapshot.to_json()?);
            } else {
                println!("{} ({})", snapshot.name, snapshot.id);
                println!("  Firmware: {}", snapshot.firmware);
                if snapshot.flags.suggest_firmware_update {
                    println!("  Firmware update recommended");
                }
                for led in &snapshot.leds {
                    println!("  LED {}: {}", led.name, led.state);
                }
                for profile in &snapshot.profiles {
                    println!("  Profile {}:", profile.nr);
                    println!("    Frequency: {}", profile.frequency);
                    if let (Some(x), Some(y)) = (profile.dpi_x, profile.dpi_y) {
                        println!("    DPI: {x} x {y}");
                    }
                }
            }
        }
        Commands::SetLed { led, state } => {
            let id = LedId::from_name(&led).ok_or_else(|| {
                anyhow::anyhow!("Unknown LED '{led}'. Valid LEDs: scroll, logo, thumb")
            })?;
            let state = LedState::from_bool(matches!(state, OnOff::On));
            let mut mouse = open_mouse(cli.pid)?;
            with_claim(&mut mouse, |m| {
                m.set_led(id, state)?;
                commit(m, false)
            })?;
            println!("{} LED {state}", id.name());
        }
        Commands::SetFreq { hz } => {
            let freq = Frequency::from_hz(hz)?;
            let mut mouse = open_mouse(cli.pid)?;
            with_claim(&mut mouse, |m| {
                m.set_frequency(0, freq)?;
                commit(m, false)
            })?;
            println!("Polling frequency set to {freq}");
        }
        Commands::SetDpi { dpi, axis } => {
            let mut mouse = open_mouse(cli.pid)?;
            let table = mouse.supported_dpimappings();
            let slot = find_mapping(table, dpi).ok_or_else(|| {
                let max = table.last().map_or(0, |m| m.resolution);
                anyhow::anyhow!("{dpi} DPI not supported (100-{max} in steps of 100)")
            })?;
            let axis = axis.map(|a| match a {
                AxisArg::X => AXIS_X,
                AxisArg::Y => AXIS_Y,
            });
            let mapping = u32::try_from(slot)?;
            with_claim(&mut mouse, |m| {
                m.set_dpimapping(0, axis, mapping)?;
                commit(m, false)
            })?;
            println!("DPI set to {dpi}");
        }
        Commands::Commit { force } => {
            let mut mouse = open_mouse(cli.pid)?;
            with_claim(&mut mouse, |m| commit(m, force))?;
            println!("Device state committed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_accepts_hex_and_decimal() {
        assert_eq!(parse_pid("0x0040"), Ok(0x0040));
        assert_eq!(parse_pid("0X001F"), Ok(0x001F));
        assert_eq!(parse_pid("21"), Ok(0x0015));
        assert!(parse_pid("0xZZ").is_err());
        assert!(parse_pid("70000").is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["naga", "--pid", "0x0040", "set-dpi", "800", "--axis", "y"])
            .unwrap();
        assert_eq!(cli.pid, Some(0x0040));
        assert!(matches!(
            cli.command,
            Commands::SetDpi {
                dpi: 800,
                axis: Some(AxisArg::Y)
            }
        ));

        let cli = Cli::try_parse_from(["naga", "set-led", "scroll", "off"]).unwrap();
        assert!(matches!(cli.command, Commands::SetLed { state: OnOff::Off, .. }));
    }
}
