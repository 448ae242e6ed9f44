//! SPI mode bits as defined by `linux/spi/spidev.h`

use bitflags::bitflags;

bitflags! {
    /// Mode bits carried by `SPI_IOC_RD_MODE` / `SPI_IOC_WR_MODE`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiModeFlags: u8 {
        /// Clock phase
        const CPHA       = 0x01;
        /// Clock polarity
        const CPOL       = 0x02;
        /// Chip select is active high
        const CS_HIGH    = 0x04;
        /// Words are clocked out LSB first
        const LSB_FIRST  = 0x08;
        /// SI/SO signals shared
        const THREE_WIRE = 0x10;
        /// Loopback mode
        const LOOP       = 0x20;
        /// One device per bus, no chip select
        const NO_CS      = 0x40;
        /// Slave pulls low to pause
        const READY      = 0x80;

        /// CPOL=0, CPHA=0
        const MODE_0 = 0;
        /// CPOL=0, CPHA=1
        const MODE_1 = Self::CPHA.bits();
        /// CPOL=1, CPHA=0
        const MODE_2 = Self::CPOL.bits();
        /// CPOL=1, CPHA=1
        const MODE_3 = Self::CPOL.bits() | Self::CPHA.bits();
    }
}

impl Default for SpiModeFlags {
    fn default() -> Self {
        SpiModeFlags::MODE_0
    }
}

impl SpiModeFlags {
    /// Mask covering the clock polarity and phase bits
    pub const CLOCK_MASK: SpiModeFlags = SpiModeFlags::MODE_3;

    /// Clock mode number (0-3) encoded in these flags
    pub fn clock_mode(self) -> u8 {
        (self & Self::CLOCK_MASK).bits()
    }

    /// Replace the clock mode, keeping every other bit
    ///
    /// Only the low two bits of `mode` are used.
    pub fn with_clock_mode(self, mode: u8) -> Self {
        (self - Self::CLOCK_MASK) | Self::from_bits_truncate(mode & Self::CLOCK_MASK.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_values() {
        assert_eq!(SpiModeFlags::CPHA.bits(), 0x01);
        assert_eq!(SpiModeFlags::CPOL.bits(), 0x02);
        assert_eq!(SpiModeFlags::CS_HIGH.bits(), 0x04);
        assert_eq!(SpiModeFlags::LSB_FIRST.bits(), 0x08);
        assert_eq!(SpiModeFlags::THREE_WIRE.bits(), 0x10);
        assert_eq!(SpiModeFlags::LOOP.bits(), 0x20);
        assert_eq!(SpiModeFlags::NO_CS.bits(), 0x40);
        assert_eq!(SpiModeFlags::READY.bits(), 0x80);
        assert_eq!(SpiModeFlags::MODE_3.bits(), 3);
    }

    #[test]
    fn test_clock_mode() {
        let flags = SpiModeFlags::CS_HIGH | SpiModeFlags::MODE_2;
        assert_eq!(flags.clock_mode(), 2);

        let flags = flags.with_clock_mode(1);
        assert_eq!(flags.clock_mode(), 1);
        assert!(flags.contains(SpiModeFlags::CS_HIGH));
        assert!(!flags.contains(SpiModeFlags::CPOL));

        let flags = flags.with_clock_mode(0);
        assert_eq!(flags, SpiModeFlags::CS_HIGH);
    }
}
