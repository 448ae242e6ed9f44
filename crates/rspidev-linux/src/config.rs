//! Device configuration from option strings
//!
//! A device is described the same way on the command line and in config
//! files: a device followed by comma-separated `key=value` pairs, for example
//! `0.0,speed=1000000,mode=3,cshigh=on`.

use crate::device::{parse_device, LinuxSpidev};
use crate::error::{ConfigError, Result};

use rspidev_core::{SpiBus, SpiDev};
use std::path::PathBuf;

/// Settings applied to a device after it is opened
///
/// Fields left as `None` keep whatever the kernel currently has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinuxSpidevConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: PathBuf,
    /// Maximum clock speed in Hz
    pub speed_hz: Option<u32>,
    /// Clock mode (0-3)
    pub mode: Option<u8>,
    /// Word size in bits
    pub bits_per_word: Option<u8>,
    /// Chip select active high
    pub cs_high: Option<bool>,
    /// LSB first
    pub lsb_first: Option<bool>,
    /// Shared SI/SO
    pub three_wire: Option<bool>,
    /// Controller loopback
    pub loopback: Option<bool>,
    /// No chip select
    pub no_cs: Option<bool>,
    /// Override for the transfer block size
    pub block_size: Option<usize>,
}

impl LinuxSpidevConfig {
    /// Create a configuration for the given device path
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Set the clock speed in Hz
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = Some(speed_hz);
        self
    }

    /// Set the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the word size
    pub fn with_bits_per_word(mut self, bits: u8) -> Self {
        self.bits_per_word = Some(bits);
        self
    }

    /// Open the device and apply this configuration
    pub fn open(&self) -> rspidev_core::Result<SpiDev<LinuxSpidev>> {
        let mut dev = SpiDev::from_bus(LinuxSpidev::open(&self.device)?)?;
        self.apply(&mut dev)?;
        log::info!(
            "spidev: Opened {} (mode={}, bits={}, speed={} kHz)",
            self.device.display(),
            dev.mode(),
            dev.bits_per_word(),
            dev.max_speed_hz() / 1000
        );
        Ok(dev)
    }

    /// Apply every configured setting to an open handle
    pub fn apply<B: SpiBus>(&self, dev: &mut SpiDev<B>) -> rspidev_core::Result<()> {
        if let Some(mode) = self.mode {
            dev.set_mode(mode)?;
        }
        if let Some(on) = self.cs_high {
            dev.set_cs_high(on)?;
        }
        if let Some(on) = self.lsb_first {
            dev.set_lsb_first(on)?;
        }
        if let Some(on) = self.three_wire {
            dev.set_three_wire(on)?;
        }
        if let Some(on) = self.loopback {
            dev.set_loopback(on)?;
        }
        if let Some(on) = self.no_cs {
            dev.set_no_cs(on)?;
        }
        if let Some(bits) = self.bits_per_word {
            dev.set_bits_per_word(bits)?;
        }
        if let Some(speed) = self.speed_hz {
            dev.set_max_speed_hz(speed)?;
        }
        if let Some(size) = self.block_size {
            dev.set_block_size(size);
        }
        Ok(())
    }
}

/// Parse a device specification: `DEVICE[,key=value...]`
pub fn parse_spec(spec: &str) -> Result<LinuxSpidevConfig> {
    let mut parts = spec.split(',');
    let device = parts.next().unwrap_or_default();

    let mut options = Vec::new();
    for part in parts.filter(|p| !p.trim().is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| ConfigError::Malformed(part.to_string()))?;
        options.push((key.trim(), value.trim()));
    }

    if device.contains('=') {
        // Spec given purely as options, e.g. "dev=0.0,speed=1000"
        let (key, value) = device
            .split_once('=')
            .ok_or_else(|| ConfigError::Malformed(device.to_string()))?;
        options.insert(0, (key.trim(), value.trim()));
        return parse_options(&options);
    }

    parse_options(&options_with_device(device, &options))
}

fn options_with_device<'a>(
    device: &'a str,
    options: &[(&'a str, &'a str)],
) -> Vec<(&'a str, &'a str)> {
    let mut all = Vec::with_capacity(options.len() + 1);
    all.push(("dev", device));
    all.extend_from_slice(options);
    all
}

/// Parse options from a list of key-value pairs
///
/// Recognised keys: `dev`, `speed` (Hz), `mode` (0-3), `bits`, `cshigh`,
/// `lsbfirst`, `threewire`, `loop`, `nocs`, `blocksize`. Unknown keys are
/// logged and ignored.
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxSpidevConfig> {
    let mut config = LinuxSpidevConfig::default();
    let mut has_device = false;

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = parse_device(value)?;
                has_device = true;
            }
            "speed" => config.speed_hz = Some(parse_number(key, value)?),
            "mode" => {
                let mode: u8 = parse_number(key, value)?;
                if mode > 3 {
                    return Err(invalid(key, value));
                }
                config.mode = Some(mode);
            }
            "bits" => {
                let bits: u8 = parse_number(key, value)?;
                if !(8..=32).contains(&bits) {
                    return Err(invalid(key, value));
                }
                config.bits_per_word = Some(bits);
            }
            "cshigh" => config.cs_high = Some(parse_bool(key, value)?),
            "lsbfirst" => config.lsb_first = Some(parse_bool(key, value)?),
            "threewire" => config.three_wire = Some(parse_bool(key, value)?),
            "loop" => config.loopback = Some(parse_bool(key, value)?),
            "nocs" => config.no_cs = Some(parse_bool(key, value)?),
            "blocksize" => {
                let size: usize = parse_number(key, value)?;
                if size == 0 {
                    return Err(invalid(key, value));
                }
                config.block_size = Some(size);
            }
            _ => {
                log::warn!("spidev: Unknown option: {}={}", key, value);
            }
        }
    }

    if !has_device {
        return Err(ConfigError::NoDevice);
    }

    Ok(config)
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Parse a decimal or `0x` hexadecimal number
fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: TryFrom<u64>,
{
    let parsed = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        value.parse::<u64>().ok()
    };
    parsed
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| invalid(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec_shorthand() {
        let config = parse_spec("0.1,speed=500000,mode=3,cshigh=on").unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/spidev0.1"));
        assert_eq!(config.speed_hz, Some(500_000));
        assert_eq!(config.mode, Some(3));
        assert_eq!(config.cs_high, Some(true));
        assert_eq!(config.lsb_first, None);
    }

    #[test]
    fn test_parse_spec_options_only() {
        let config = parse_spec("dev=/dev/spidev2.0,bits=16").unwrap();
        assert_eq!(config.device, PathBuf::from("/dev/spidev2.0"));
        assert_eq!(config.bits_per_word, Some(16));
    }

    #[test]
    fn test_parse_spec_plain_path() {
        let config = parse_spec("/dev/spidev1.0").unwrap();
        assert_eq!(config, LinuxSpidevConfig::new("/dev/spidev1.0"));
    }

    #[test]
    fn test_parse_options_errors() {
        assert_eq!(parse_options(&[("speed", "1")]), Err(ConfigError::NoDevice));
        assert!(matches!(
            parse_options(&[("dev", "0.0"), ("mode", "4")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_options(&[("dev", "0.0"), ("bits", "7")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_options(&[("dev", "0.0"), ("loop", "maybe")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse_spec("0.0,speed"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_number_hex() {
        let config =
            parse_options(&[("dev", "0.0"), ("speed", "0x1000"), ("blocksize", "160")]).unwrap();
        assert_eq!(config.speed_hz, Some(0x1000));
        assert_eq!(config.block_size, Some(160));
    }

    #[test]
    fn test_unknown_option_ignored() {
        let config = parse_options(&[("dev", "0.0"), ("frobnicate", "1")]).unwrap();
        assert_eq!(config, LinuxSpidevConfig::new("/dev/spidev0.0"));
    }
}
