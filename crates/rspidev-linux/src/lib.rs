//! rspidev-linux - Linux spidev backend
//!
//! The Linux SPI driver exposes SPI controllers through character devices
//! at `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//! This crate implements [`rspidev_core::SpiBus`] on top of those devices
//! with the `SPI_IOC_*` ioctls.
//!
//! # Example
//!
//! ```no_run
//! use rspidev_core::{SpiDev, TransferOptions};
//! use rspidev_linux::{LinuxConnector, LinuxSpidevConfig};
//!
//! // Open bus 0, chip select 0 with whatever the kernel has configured
//! let mut dev = SpiDev::open_with(&LinuxConnector, 0, 0)?;
//! let rx = dev.xfer2(&[0x9F, 0, 0, 0], TransferOptions::new())?;
//! println!("{:02X?}", rx);
//!
//! // Or open with settings from an option string
//! let config = rspidev_linux::parse_spec("0.1,speed=4000000,mode=3")?;
//! let mut dev = config.open()?;
//! dev.write_bytes(&[0x06])?;
//! # let _ = LinuxSpidevConfig::new("/dev/spidev0.0");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod config;
pub mod device;
pub mod error;
pub mod ioctl;

// Re-exports
pub use config::{parse_options, parse_spec, LinuxSpidevConfig};
pub use device::{parse_device, spidev_path, LinuxConnector, LinuxSpidev};
pub use error::{ConfigError, Result};
