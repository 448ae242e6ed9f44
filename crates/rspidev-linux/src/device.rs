//! Linux spidev backend
//!
//! This module provides [`LinuxSpidev`], an [`SpiBus`] over a
//! `/dev/spidevX.Y` character device.

use crate::error::ConfigError;
use crate::ioctl::{self, SpiIocTransfer};

use rspidev_core::{Connector, Error, Result, Segment, SpiBus};

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Path of the character device for `bus`.`device`
pub fn spidev_path(bus: u32, device: u32) -> PathBuf {
    PathBuf::from(format!("/dev/spidev{}.{}", bus, device))
}

/// Parse `/dev/spidevX.Y` or the `X.Y` shorthand
pub fn parse_device(spec: &str) -> std::result::Result<PathBuf, ConfigError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(ConfigError::NoDevice);
    }
    if spec.starts_with('/') {
        return Ok(PathBuf::from(spec));
    }

    let invalid = || ConfigError::InvalidDevice(spec.to_string());
    let (bus, device) = spec.split_once('.').ok_or_else(invalid)?;
    let bus: u32 = bus.parse().map_err(|_| invalid())?;
    let device: u32 = device.parse().map_err(|_| invalid())?;
    Ok(spidev_path(bus, device))
}

/// An open spidev character device
pub struct LinuxSpidev {
    /// File handle for the spidev device
    file: File,
    /// Path the device was opened from
    path: PathBuf,
}

impl LinuxSpidev {
    /// Open a spidev device read/write
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("spidev: Opening device {}", path.display());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open `/dev/spidev<bus>.<device>`
    pub fn open_bus(bus: u32, device: u32) -> Result<Self> {
        Self::open(spidev_path(bus, device))
    }

    /// Path the device was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl SpiBus for LinuxSpidev {
    fn read_mode(&mut self) -> Result<u8> {
        let mut mode = 0u8;
        unsafe {
            ioctl::spi_ioc_rd_mode(self.fd(), &mut mode)
                .map_err(|e| Error::os("SPI_IOC_RD_MODE", e as i32))?;
        }
        Ok(mode)
    }

    fn write_mode(&mut self, mode: u8) -> Result<()> {
        unsafe {
            ioctl::spi_ioc_wr_mode(self.fd(), &mode)
                .map_err(|e| Error::os("SPI_IOC_WR_MODE", e as i32))?;
        }
        Ok(())
    }

    fn read_bits_per_word(&mut self) -> Result<u8> {
        let mut bits = 0u8;
        unsafe {
            ioctl::spi_ioc_rd_bits_per_word(self.fd(), &mut bits)
                .map_err(|e| Error::os("SPI_IOC_RD_BITS_PER_WORD", e as i32))?;
        }
        Ok(bits)
    }

    fn write_bits_per_word(&mut self, bits: u8) -> Result<()> {
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(self.fd(), &bits)
                .map_err(|e| Error::os("SPI_IOC_WR_BITS_PER_WORD", e as i32))?;
        }
        Ok(())
    }

    fn read_max_speed_hz(&mut self) -> Result<u32> {
        let mut speed = 0u32;
        unsafe {
            ioctl::spi_ioc_rd_max_speed_hz(self.fd(), &mut speed)
                .map_err(|e| Error::os("SPI_IOC_RD_MAX_SPEED_HZ", e as i32))?;
        }
        Ok(speed)
    }

    fn write_max_speed_hz(&mut self, speed_hz: u32) -> Result<()> {
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(self.fd(), &speed_hz)
                .map_err(|e| Error::os("SPI_IOC_WR_MAX_SPEED_HZ", e as i32))?;
        }
        Ok(())
    }

    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()> {
        // The kernel structs point into `segments`, which stays borrowed
        // until the ioctl returns.
        let xfers: Vec<SpiIocTransfer> = segments
            .iter_mut()
            .map(SpiIocTransfer::from_segment)
            .collect();

        log::trace!(
            "spidev: SPI_IOC_MESSAGE({}) with {} bytes",
            xfers.len(),
            segments.iter().map(Segment::len).sum::<usize>()
        );

        unsafe {
            ioctl::spi_ioc_message(self.fd(), &xfers)
                .map_err(|e| Error::os("SPI_IOC_MESSAGE", e as i32))?;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file
            .read(buf)
            .map_err(|e| Error::Io { op: "read", source: e })
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.file
            .write(data)
            .map_err(|e| Error::Io { op: "write", source: e })
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.fd())
    }

    fn close(self) -> Result<()> {
        log::debug!("spidev: Closing {}", self.path.display());
        let fd = self.file.into_raw_fd();
        if unsafe { libc::close(fd) } == -1 {
            return Err(Error::Io {
                op: "close",
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn close_boxed(self: Box<Self>) -> Result<()> {
        (*self).close()
    }
}

/// Opens `/dev/spidevX.Y` devices by number
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxConnector;

impl Connector for LinuxConnector {
    type Bus = LinuxSpidev;

    fn connect(&self, bus: u32, device: u32) -> Result<LinuxSpidev> {
        LinuxSpidev::open_bus(bus, device)
    }
}
