//! The spidev device handle
//!
//! [`SpiDev`] owns one bus backend and mirrors the settings the kernel
//! reports for it. The cached mode, word size and speed always hold the last
//! value read from or successfully written to the device; a failed ioctl
//! leaves them untouched.

use crate::block;
use crate::bus::{Connector, SpiBus};
use crate::error::{Error, Result};
use crate::mode::SpiModeFlags;
use crate::transfer::{Segment, TransferOptions, MAX_SEGMENTS_PER_MESSAGE, MAX_TRANSFER_LEN};
use std::os::unix::io::RawFd;

/// Smallest and largest accepted `bits_per_word`
const BITS_PER_WORD_RANGE: std::ops::RangeInclusive<u8> = 8..=32;

/// An SPI device handle
///
/// A handle starts out closed ([`SpiDev::new`]) or is opened directly with
/// [`SpiDev::open_with`]. Dropping an open handle closes it.
pub struct SpiDev<B: SpiBus> {
    bus: Option<B>,
    mode: SpiModeFlags,
    bits_per_word: u8,
    max_speed_hz: u32,
    block_size: usize,
}

impl<B: SpiBus> Default for SpiDev<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SpiBus> SpiDev<B> {
    /// Create a closed handle
    pub fn new() -> Self {
        Self {
            bus: None,
            mode: SpiModeFlags::empty(),
            bits_per_word: 0,
            max_speed_hz: 0,
            block_size: block::block_size(),
        }
    }

    /// Create a handle around an already opened bus
    pub fn from_bus(bus: B) -> Result<Self> {
        let mut dev = Self::new();
        dev.attach(bus)?;
        Ok(dev)
    }

    /// Open `bus`.`device` through `connector`
    pub fn open_with<C>(connector: &C, bus: u32, device: u32) -> Result<Self>
    where
        C: Connector<Bus = B>,
    {
        let mut dev = Self::new();
        dev.open(connector, bus, device)?;
        Ok(dev)
    }

    /// Use a different transfer block size for chunked operations
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.set_block_size(block_size);
        self
    }

    /// Connect this handle to `bus`.`device`
    ///
    /// A previously open device is closed first.
    pub fn open<C>(&mut self, connector: &C, bus: u32, device: u32) -> Result<()>
    where
        C: Connector<Bus = B>,
    {
        let backend = connector.connect(bus, device)?;
        self.attach(backend)
    }

    /// Take ownership of `bus` and load its current settings
    pub fn attach(&mut self, mut bus: B) -> Result<()> {
        self.close()?;

        let mode = bus.read_mode()?;
        let bits_per_word = bus.read_bits_per_word()?;
        let max_speed_hz = bus.read_max_speed_hz()?;

        log::debug!(
            "spidev: Attached (mode={:#04x}, bits={}, speed={} Hz)",
            mode,
            bits_per_word,
            max_speed_hz
        );

        self.mode = SpiModeFlags::from_bits_retain(mode);
        self.bits_per_word = bits_per_word;
        self.max_speed_hz = max_speed_hz;
        self.bus = Some(bus);
        Ok(())
    }

    /// Disconnect from the device
    ///
    /// The cached settings are reset even when `close(2)` reports an error,
    /// since the descriptor is released either way. Closing a closed handle
    /// does nothing.
    pub fn close(&mut self) -> Result<()> {
        let bus = self.bus.take();
        self.mode = SpiModeFlags::empty();
        self.bits_per_word = 0;
        self.max_speed_hz = 0;

        match bus {
            Some(bus) => {
                log::debug!("spidev: Closing device");
                bus.close()
            }
            None => Ok(()),
        }
    }

    /// Whether a device is attached
    pub fn is_open(&self) -> bool {
        self.bus.is_some()
    }

    /// File descriptor of the open device, or -1
    pub fn fileno(&self) -> RawFd {
        self.bus.as_ref().and_then(|bus| bus.raw_fd()).unwrap_or(-1)
    }

    /// Borrow the backend
    pub fn bus(&self) -> Option<&B> {
        self.bus.as_ref()
    }

    /// Mutably borrow the backend
    pub fn bus_mut(&mut self) -> Option<&mut B> {
        self.bus.as_mut()
    }

    fn open_bus(&mut self) -> Result<&mut B> {
        self.bus.as_mut().ok_or(Error::NotOpen)
    }

    // ---------------------------------------------------------------------
    // Cached settings
    // ---------------------------------------------------------------------

    /// Clock mode (CPOL|CPHA), 0-3
    pub fn mode(&self) -> u8 {
        self.mode.clock_mode()
    }

    /// Every mode bit, as last reported by the device
    pub fn mode_flags(&self) -> SpiModeFlags {
        self.mode
    }

    /// Chip select is active high
    pub fn cs_high(&self) -> bool {
        self.mode.contains(SpiModeFlags::CS_HIGH)
    }

    /// SI/SO signals are shared
    pub fn three_wire(&self) -> bool {
        self.mode.contains(SpiModeFlags::THREE_WIRE)
    }

    /// Words are clocked out LSB first
    pub fn lsb_first(&self) -> bool {
        self.mode.contains(SpiModeFlags::LSB_FIRST)
    }

    /// Controller loopback is enabled
    pub fn loopback(&self) -> bool {
        self.mode.contains(SpiModeFlags::LOOP)
    }

    /// Chip select is disabled
    pub fn no_cs(&self) -> bool {
        self.mode.contains(SpiModeFlags::NO_CS)
    }

    /// Word size in bits
    pub fn bits_per_word(&self) -> u8 {
        self.bits_per_word
    }

    /// Maximum clock speed in Hz
    pub fn max_speed_hz(&self) -> u32 {
        self.max_speed_hz
    }

    /// Largest chunk used by [`write_bytes2`](Self::write_bytes2) and
    /// [`xfer3`](Self::xfer3)
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Override the chunk size; clamped to `1..=MAX_BLOCK_SIZE`
    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size.clamp(1, block::MAX_BLOCK_SIZE);
    }

    // ---------------------------------------------------------------------
    // Setters
    // ---------------------------------------------------------------------

    /// Set the clock mode (0-3), keeping every other mode bit
    pub fn set_mode(&mut self, mode: u8) -> Result<()> {
        if mode > SpiModeFlags::CLOCK_MASK.bits() {
            return Err(Error::InvalidMode(mode));
        }
        self.set_mode_flags(self.mode.with_clock_mode(mode))
    }

    /// Set chip select active high
    pub fn set_cs_high(&mut self, on: bool) -> Result<()> {
        self.set_flag(SpiModeFlags::CS_HIGH, on)
    }

    /// Share the SI/SO signals
    pub fn set_three_wire(&mut self, on: bool) -> Result<()> {
        self.set_flag(SpiModeFlags::THREE_WIRE, on)
    }

    /// Clock words out LSB first
    pub fn set_lsb_first(&mut self, on: bool) -> Result<()> {
        self.set_flag(SpiModeFlags::LSB_FIRST, on)
    }

    /// Enable controller loopback
    pub fn set_loopback(&mut self, on: bool) -> Result<()> {
        self.set_flag(SpiModeFlags::LOOP, on)
    }

    /// Disable chip select
    pub fn set_no_cs(&mut self, on: bool) -> Result<()> {
        self.set_flag(SpiModeFlags::NO_CS, on)
    }

    fn set_flag(&mut self, flag: SpiModeFlags, on: bool) -> Result<()> {
        let mut mode = self.mode;
        mode.set(flag, on);
        self.set_mode_flags(mode)
    }

    /// Write the full mode byte and verify the device accepted it
    ///
    /// The device is read back after the write; if it reports a different
    /// value the cache is left as it was and [`Error::ModeMismatch`] is
    /// returned.
    pub fn set_mode_flags(&mut self, mode: SpiModeFlags) -> Result<()> {
        let bus = self.open_bus()?;
        bus.write_mode(mode.bits())?;
        let actual = bus.read_mode()?;
        if actual != mode.bits() {
            return Err(Error::ModeMismatch {
                requested: mode.bits(),
                actual,
            });
        }

        log::debug!("spidev: Set mode to {:#04x}", actual);
        self.mode = mode;
        Ok(())
    }

    /// Set the word size; only touches the device when the value changes
    pub fn set_bits_per_word(&mut self, bits: u8) -> Result<()> {
        if !BITS_PER_WORD_RANGE.contains(&bits) {
            return Err(Error::InvalidBitsPerWord(bits));
        }
        if self.bits_per_word != bits {
            self.open_bus()?.write_bits_per_word(bits)?;
            log::debug!("spidev: Set bits per word to {}", bits);
            self.bits_per_word = bits;
        }
        Ok(())
    }

    /// Set the maximum clock speed; only touches the device when the value
    /// changes
    pub fn set_max_speed_hz(&mut self, speed_hz: u32) -> Result<()> {
        if self.max_speed_hz != speed_hz {
            self.open_bus()?.write_max_speed_hz(speed_hz)?;
            log::debug!("spidev: Set speed to {} Hz", speed_hz);
            self.max_speed_hz = speed_hz;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Half-duplex I/O
    // ---------------------------------------------------------------------

    /// Read `len` bytes; `len` is clamped to `1..=MAX_TRANSFER_LEN`
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let len = len.clamp(1, MAX_TRANSFER_LEN);
        let mut buf = vec![0u8; len];
        let actual = self.open_bus()?.read(&mut buf)?;
        if actual != len {
            return Err(Error::ShortRead {
                expected: len,
                actual,
            });
        }
        log::trace!("spidev: Read {} bytes", len);
        Ok(buf)
    }

    /// Write `data` with a single `write(2)`
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        check_single_shot(data)?;
        let bus = self.open_bus()?;
        write_exact(bus, data)
    }

    /// Write `data` of any length, one block at a time
    pub fn write_bytes2(&mut self, data: &[u8]) -> Result<()> {
        self.write_bytes2_with_progress(data, |_| {})
    }

    /// Like [`write_bytes2`](Self::write_bytes2), calling `progress` with
    /// the length of each block once it is written
    pub fn write_bytes2_with_progress<F>(&mut self, data: &[u8], mut progress: F) -> Result<()>
    where
        F: FnMut(usize),
    {
        if data.is_empty() {
            return Err(Error::EmptyData);
        }
        let block_size = self.block_size;
        let bus = self.open_bus()?;
        for block in data.chunks(block_size) {
            write_exact(bus, block)?;
            progress(block.len());
        }
        log::trace!(
            "spidev: Wrote {} bytes in blocks of {}",
            data.len(),
            block_size
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Full-duplex transfers
    // ---------------------------------------------------------------------

    /// Chained-message transfer
    ///
    /// Each byte is its own `spi_ioc_transfer`; chip select is released and
    /// reasserted between bytes and `delay_usecs` is inserted after each one.
    pub fn xfer(&mut self, data: &[u8], opts: TransferOptions) -> Result<Vec<u8>> {
        check_single_shot(data)?;
        let opts = self.resolve(opts);
        let mut rx = vec![0u8; data.len()];

        {
            let bus = self.open_bus()?;
            let mut segments: Vec<Segment<'_>> = data
                .chunks(1)
                .zip(rx.chunks_mut(1))
                .map(|(tx, rx)| {
                    Segment::duplex(tx, rx)
                        .with_options(&opts)
                        .with_cs_change(true)
                })
                .collect();

            for message in segments.chunks_mut(MAX_SEGMENTS_PER_MESSAGE) {
                // cs_change on the final transfer would keep chip select asserted
                if let Some(last) = message.last_mut() {
                    last.cs_change = false;
                }
                bus.transfer(message)?;
            }
        }

        self.release_cs_high();
        Ok(rx)
    }

    /// Single-message transfer with chip select held for the whole buffer
    pub fn xfer2(&mut self, data: &[u8], opts: TransferOptions) -> Result<Vec<u8>> {
        check_single_shot(data)?;
        let opts = self.resolve(opts);
        let mut rx = vec![0u8; data.len()];

        {
            let bus = self.open_bus()?;
            let mut segment = [Segment::duplex(data, &mut rx).with_options(&opts)];
            bus.transfer(&mut segment)?;
        }

        self.release_cs_high();
        Ok(rx)
    }

    /// Block-chunked transfer of any length
    ///
    /// The data is sent as consecutive single transfers of at most
    /// [`block_size`](Self::block_size) bytes and the received blocks are
    /// concatenated.
    pub fn xfer3(&mut self, data: &[u8], opts: TransferOptions) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(Error::EmptyData);
        }
        let opts = self.resolve(opts);
        let block_size = self.block_size;
        let mut rx = vec![0u8; data.len()];

        {
            let bus = self.open_bus()?;
            for (tx, rx) in data.chunks(block_size).zip(rx.chunks_mut(block_size)) {
                let mut segment = [Segment::duplex(tx, rx).with_options(&opts)];
                bus.transfer(&mut segment)?;
            }
        }

        log::trace!(
            "spidev: Transferred {} bytes in blocks of {}",
            data.len(),
            block_size
        );
        self.release_cs_high();
        Ok(rx)
    }

    /// Fill in zero option fields from the cached settings
    fn resolve(&self, opts: TransferOptions) -> TransferOptions {
        TransferOptions {
            speed_hz: if opts.speed_hz == 0 {
                self.max_speed_hz
            } else {
                opts.speed_hz
            },
            delay_usecs: opts.delay_usecs,
            bits_per_word: if opts.bits_per_word == 0 {
                self.bits_per_word
            } else {
                opts.bits_per_word
            },
        }
    }

    /// With an active-high chip select the kernel leaves CS asserted after a
    /// message; a zero-length read brings it back down.
    fn release_cs_high(&mut self) {
        if !self.cs_high() {
            return;
        }
        if let Some(bus) = self.bus.as_mut() {
            if let Err(e) = bus.read(&mut []) {
                log::debug!("spidev: CS release read failed: {}", e);
            }
        }
    }
}

impl<B: SpiBus> Drop for SpiDev<B> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("spidev: Error closing device: {}", e);
        }
    }
}

impl<B: SpiBus> std::fmt::Debug for SpiDev<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpiDev")
            .field("open", &self.is_open())
            .field("mode", &self.mode)
            .field("bits_per_word", &self.bits_per_word)
            .field("max_speed_hz", &self.max_speed_hz)
            .field("block_size", &self.block_size)
            .finish()
    }
}

fn check_single_shot(data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Error::EmptyData);
    }
    if data.len() > MAX_TRANSFER_LEN {
        return Err(Error::TooLong {
            len: data.len(),
            max: MAX_TRANSFER_LEN,
        });
    }
    Ok(())
}

fn write_exact<B: SpiBus + ?Sized>(bus: &mut B, data: &[u8]) -> Result<()> {
    let actual = bus.write(data)?;
    if actual != data.len() {
        return Err(Error::ShortWrite {
            expected: data.len(),
            actual,
        });
    }
    Ok(())
}
