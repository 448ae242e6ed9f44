//! Transfer descriptions passed to a bus backend
//!
//! A [`Segment`] is the safe counterpart of the kernel's `spi_ioc_transfer`:
//! it borrows the transmit and receive buffers for the duration of one
//! `SPI_IOC_MESSAGE` call, so a backend never sees dangling pointers.

/// Largest payload accepted by the single-shot operations (`write_bytes`,
/// `xfer`, `xfer2`) and the largest `read_bytes` request
pub const MAX_TRANSFER_LEN: usize = 4096;

/// Largest number of transfers the kernel accepts in one `SPI_IOC_MESSAGE`
///
/// The ioctl size field is 14 bits wide and each `spi_ioc_transfer` is 32
/// bytes, so the message must stay below 512 entries.
pub const MAX_SEGMENTS_PER_MESSAGE: usize = 511;

/// Per-call overrides for a transfer
///
/// A zero field means "use the value cached on the handle".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// Clock speed in Hz
    pub speed_hz: u32,
    /// Delay after each transfer before the next one (or before deselect)
    pub delay_usecs: u16,
    /// Word size in bits
    pub bits_per_word: u8,
}

impl TransferOptions {
    /// Options that use the handle's cached settings for everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the clock speed
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Set an inter-transfer delay
    pub fn with_delay(mut self, delay_usecs: u16) -> Self {
        self.delay_usecs = delay_usecs;
        self
    }

    /// Override the word size
    pub fn with_bits_per_word(mut self, bits_per_word: u8) -> Self {
        self.bits_per_word = bits_per_word;
        self
    }
}

/// One full-duplex transfer inside an `SPI_IOC_MESSAGE`
#[derive(Debug)]
pub struct Segment<'a> {
    /// Bytes clocked out
    pub tx: &'a [u8],
    /// Bytes clocked in; same length as `tx`
    pub rx: &'a mut [u8],
    /// Clock speed in Hz (0: device default)
    pub speed_hz: u32,
    /// Delay after this transfer
    pub delay_usecs: u16,
    /// Word size (0: device default)
    pub bits_per_word: u8,
    /// Deselect the device between this transfer and the next
    pub cs_change: bool,
}

impl<'a> Segment<'a> {
    /// Create a full-duplex segment
    ///
    /// `rx` must be the same length as `tx`; the kernel uses a single length
    /// for both directions.
    pub fn duplex(tx: &'a [u8], rx: &'a mut [u8]) -> Self {
        debug_assert_eq!(tx.len(), rx.len());
        Self {
            tx,
            rx,
            speed_hz: 0,
            delay_usecs: 0,
            bits_per_word: 0,
            cs_change: false,
        }
    }

    /// Apply resolved transfer options
    pub fn with_options(mut self, opts: &TransferOptions) -> Self {
        self.speed_hz = opts.speed_hz;
        self.delay_usecs = opts.delay_usecs;
        self.bits_per_word = opts.bits_per_word;
        self
    }

    /// Release chip select after this segment
    pub fn with_cs_change(mut self, cs_change: bool) -> Self {
        self.cs_change = cs_change;
        self
    }

    /// Number of bytes moved in each direction
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether the segment moves no data
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}
