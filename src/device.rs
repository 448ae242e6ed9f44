//! Opening the device named on the command line

use crate::cli::DeviceArgs;
use rspidev_core::{SpiBus, SpiDev};
use rspidev_linux::{parse_spec, LinuxSpidev};

/// Backend chosen at runtime
pub type BoxedBus = Box<dyn SpiBus + Send>;

/// Device handle used by every command
pub type Device = SpiDev<BoxedBus>;

/// Open the device described by `args`, applying any options in the string
pub fn open_device(args: &DeviceArgs, dummy: bool) -> Result<Device, Box<dyn std::error::Error>> {
    let config = parse_spec(&args.device)?;

    let bus: BoxedBus = if dummy {
        open_dummy()?
    } else {
        Box::new(LinuxSpidev::open(&config.device)?)
    };

    let mut dev = SpiDev::from_bus(bus)?;
    config.apply(&mut dev)?;

    log::info!(
        "Using {}{} (mode {}, {} bits, {} Hz)",
        config.device.display(),
        if dummy { " [loopback]" } else { "" },
        dev.mode(),
        dev.bits_per_word(),
        dev.max_speed_hz()
    );
    Ok(dev)
}

#[cfg(feature = "dummy")]
fn open_dummy() -> Result<BoxedBus, Box<dyn std::error::Error>> {
    Ok(Box::new(rspidev_dummy::Loopback::new_default()))
}

#[cfg(not(feature = "dummy"))]
fn open_dummy() -> Result<BoxedBus, Box<dyn std::error::Error>> {
    Err("rspidev was built without the dummy feature".into())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;

    #[test]
    fn test_open_dummy_applies_options() {
        let args = DeviceArgs {
            device: "0.0,mode=2,speed=0x10000,cshigh=1".to_string(),
        };
        let dev = open_device(&args, true).unwrap();
        assert_eq!(dev.mode(), 2);
        assert_eq!(dev.max_speed_hz(), 0x10000);
        assert!(dev.cs_high());
        assert_eq!(dev.fileno(), -1);
    }

    #[test]
    fn test_open_invalid_spec() {
        let args = DeviceArgs {
            device: "0.0,mode=9".to_string(),
        };
        assert!(open_device(&args, true).is_err());
    }
}
