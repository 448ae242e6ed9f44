//! Linux spidev ioctl definitions
//!
//! Mirrors `include/uapi/linux/spi/spidev.h`. Request numbers are generated
//! with nix so the direction and size encoding follow the target
//! architecture's `_IOC` layout.

use nix::{ioctl_read, ioctl_write_buf, ioctl_write_ptr};
use rspidev_core::Segment;

/// SPI ioctl magic number
pub const SPI_IOC_MAGIC: u8 = b'k';

/// ioctl type numbers
pub const SPI_IOC_TYPE_MESSAGE: u8 = 0;
pub const SPI_IOC_TYPE_MODE: u8 = 1;
pub const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
pub const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

ioctl_read!(spi_ioc_rd_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
ioctl_read!(
    spi_ioc_rd_bits_per_word,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_BITS_PER_WORD,
    u8
);
ioctl_write_ptr!(
    spi_ioc_wr_bits_per_word,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_BITS_PER_WORD,
    u8
);
ioctl_read!(
    spi_ioc_rd_max_speed_hz,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_MAX_SPEED_HZ,
    u32
);
ioctl_write_ptr!(
    spi_ioc_wr_max_speed_hz,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_MAX_SPEED_HZ,
    u32
);

// SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])
ioctl_write_buf!(
    spi_ioc_message,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_MESSAGE,
    SpiIocTransfer
);

/// `struct spi_ioc_transfer`
///
/// Buffer addresses are carried as `u64` on every architecture, so the
/// layout is 32 bytes everywhere.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct SpiIocTransfer {
    pub tx_buf: u64,
    pub rx_buf: u64,
    pub len: u32,
    pub speed_hz: u32,
    pub delay_usecs: u16,
    pub bits_per_word: u8,
    pub cs_change: u8,
    pub tx_nbits: u8,
    pub rx_nbits: u8,
    pub word_delay_usecs: u8,
    pub pad: u8,
}

impl SpiIocTransfer {
    /// Describe `segment` to the kernel
    ///
    /// The returned value holds raw addresses into the segment's buffers and
    /// must not outlive it.
    pub fn from_segment(segment: &mut Segment<'_>) -> Self {
        Self {
            tx_buf: segment.tx.as_ptr() as u64,
            rx_buf: segment.rx.as_mut_ptr() as u64,
            len: segment.len() as u32,
            speed_hz: segment.speed_hz,
            delay_usecs: segment.delay_usecs,
            bits_per_word: segment.bits_per_word,
            cs_change: segment.cs_change as u8,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_transfer_layout() {
        assert_eq!(size_of::<SpiIocTransfer>(), 32);
        assert_eq!(offset_of!(SpiIocTransfer, tx_buf), 0);
        assert_eq!(offset_of!(SpiIocTransfer, rx_buf), 8);
        assert_eq!(offset_of!(SpiIocTransfer, len), 16);
        assert_eq!(offset_of!(SpiIocTransfer, speed_hz), 20);
        assert_eq!(offset_of!(SpiIocTransfer, delay_usecs), 24);
        assert_eq!(offset_of!(SpiIocTransfer, bits_per_word), 26);
        assert_eq!(offset_of!(SpiIocTransfer, cs_change), 27);
        assert_eq!(offset_of!(SpiIocTransfer, tx_nbits), 28);
        assert_eq!(offset_of!(SpiIocTransfer, rx_nbits), 29);
        assert_eq!(offset_of!(SpiIocTransfer, word_delay_usecs), 30);
    }

    #[test]
    fn test_from_segment() {
        let tx = [0xAAu8, 0x55];
        let mut rx = [0u8; 2];
        let opts = rspidev_core::TransferOptions::new()
            .with_speed(1_000_000)
            .with_delay(5)
            .with_bits_per_word(8);
        let mut segment = Segment::duplex(&tx, &mut rx)
            .with_options(&opts)
            .with_cs_change(true);

        let xfer = SpiIocTransfer::from_segment(&mut segment);
        assert_eq!(xfer.tx_buf, tx.as_ptr() as u64);
        assert_eq!(xfer.len, 2);
        assert_eq!(xfer.speed_hz, 1_000_000);
        assert_eq!(xfer.delay_usecs, 5);
        assert_eq!(xfer.bits_per_word, 8);
        assert_eq!(xfer.cs_change, 1);
        assert_eq!(xfer.tx_nbits, 0);
        assert_eq!(xfer.rx_nbits, 0);
    }

    #[cfg(any(
        target_arch = "x86",
        target_arch = "x86_64",
        target_arch = "arm",
        target_arch = "aarch64"
    ))]
    #[test]
    fn test_request_numbers() {
        // Values from the C headers on the generic _IOC layout
        assert_eq!(
            nix::request_code_read!(SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, size_of::<u8>()) as u64,
            0x8001_6b01
        );
        assert_eq!(
            nix::request_code_write!(SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, size_of::<u8>()) as u64,
            0x4001_6b01
        );
        assert_eq!(
            nix::request_code_read!(
                SPI_IOC_MAGIC,
                SPI_IOC_TYPE_MAX_SPEED_HZ,
                size_of::<u32>()
            ) as u64,
            0x8004_6b04
        );
        // SPI_IOC_MESSAGE(1)
        assert_eq!(
            nix::request_code_write!(
                SPI_IOC_MAGIC,
                SPI_IOC_TYPE_MESSAGE,
                size_of::<SpiIocTransfer>()
            ) as u64,
            0x4020_6b00
        );
    }
}
