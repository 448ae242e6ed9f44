//! Backend traits
//!
//! [`SpiBus`] is the seam between the device handle and the operating
//! system. Each method corresponds to exactly one system call on the
//! spidev character device, so the handle keeps all the policy (caching,
//! validation, chunking) and backends stay thin.

use crate::error::Result;
use crate::transfer::Segment;
use std::os::unix::io::RawFd;

/// Raw access to one SPI chip-select
pub trait SpiBus {
    /// `SPI_IOC_RD_MODE`
    fn read_mode(&mut self) -> Result<u8>;

    /// `SPI_IOC_WR_MODE`
    fn write_mode(&mut self, mode: u8) -> Result<()>;

    /// `SPI_IOC_RD_BITS_PER_WORD`
    fn read_bits_per_word(&mut self) -> Result<u8>;

    /// `SPI_IOC_WR_BITS_PER_WORD`
    fn write_bits_per_word(&mut self, bits: u8) -> Result<()>;

    /// `SPI_IOC_RD_MAX_SPEED_HZ`
    fn read_max_speed_hz(&mut self) -> Result<u32>;

    /// `SPI_IOC_WR_MAX_SPEED_HZ`
    fn write_max_speed_hz(&mut self, speed_hz: u32) -> Result<()>;

    /// Execute all segments as one `SPI_IOC_MESSAGE(n)`
    ///
    /// Callers never pass more than
    /// [`MAX_SEGMENTS_PER_MESSAGE`](crate::transfer::MAX_SEGMENTS_PER_MESSAGE)
    /// segments.
    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()>;

    /// Half-duplex `read(2)`; returns the number of bytes read
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Half-duplex `write(2)`; returns the number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Underlying file descriptor, if the backend has one
    fn raw_fd(&self) -> Option<RawFd> {
        None
    }

    /// Release the device, reporting any error from `close(2)`
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }

    /// [`close`](SpiBus::close) for a boxed, possibly unsized backend
    ///
    /// Backends that report close errors forward this to `close`.
    fn close_boxed(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Opens buses by bus and chip-select number
///
/// This lets code that only knows numbers (scripts, the CLI) open devices
/// without depending on a particular backend.
pub trait Connector {
    /// Backend produced by this connector
    type Bus: SpiBus;

    /// Open `/dev/spidev<bus>.<device>` or the backend's equivalent
    fn connect(&self, bus: u32, device: u32) -> Result<Self::Bus>;
}

impl<B: SpiBus + ?Sized> SpiBus for Box<B> {
    fn read_mode(&mut self) -> Result<u8> {
        (**self).read_mode()
    }

    fn write_mode(&mut self, mode: u8) -> Result<()> {
        (**self).write_mode(mode)
    }

    fn read_bits_per_word(&mut self) -> Result<u8> {
        (**self).read_bits_per_word()
    }

    fn write_bits_per_word(&mut self, bits: u8) -> Result<()> {
        (**self).write_bits_per_word(bits)
    }

    fn read_max_speed_hz(&mut self) -> Result<u32> {
        (**self).read_max_speed_hz()
    }

    fn write_max_speed_hz(&mut self, speed_hz: u32) -> Result<()> {
        (**self).write_max_speed_hz(speed_hz)
    }

    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()> {
        (**self).transfer(segments)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn raw_fd(&self) -> Option<RawFd> {
        (**self).raw_fd()
    }

    fn close(self) -> Result<()> {
        B::close_boxed(self)
    }

    fn close_boxed(self: Box<Self>) -> Result<()> {
        (*self).close()
    }
}
