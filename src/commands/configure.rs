//! Configure command implementation

use super::info::describe;
use rspidev_core::{SpiBus, SpiDev};
use rspidev_linux::LinuxSpidevConfig;

/// Settings requested on the command line; `None` leaves a setting alone
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub mode: Option<u8>,
    pub speed_hz: Option<u32>,
    pub bits_per_word: Option<u8>,
    pub cs_high: Option<bool>,
    pub lsb_first: Option<bool>,
    pub three_wire: Option<bool>,
    pub loopback: Option<bool>,
    pub no_cs: Option<bool>,
}

impl Settings {
    fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.speed_hz.is_none()
            && self.bits_per_word.is_none()
            && self.cs_high.is_none()
            && self.lsb_first.is_none()
            && self.three_wire.is_none()
            && self.loopback.is_none()
            && self.no_cs.is_none()
    }

    fn to_config(&self) -> LinuxSpidevConfig {
        LinuxSpidevConfig {
            mode: self.mode,
            speed_hz: self.speed_hz,
            bits_per_word: self.bits_per_word,
            cs_high: self.cs_high,
            lsb_first: self.lsb_first,
            three_wire: self.three_wire,
            loopback: self.loopback,
            no_cs: self.no_cs,
            ..Default::default()
        }
    }
}

/// Apply `settings` to the device and print the result
pub fn cmd_configure<B: SpiBus>(
    dev: &mut SpiDev<B>,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    if settings.is_empty() {
        log::warn!("No settings given, device left unchanged");
    } else {
        settings.to_config().apply(dev)?;
        log::info!("Device settings updated");
    }
    print!("{}", describe(dev));
    Ok(())
}
