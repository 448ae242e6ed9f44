//! rspidev-core - spidev handle independent of the backend
//!
//! This crate holds everything about driving a Linux `spidev` device that
//! does not involve an actual system call: the cached device settings, mode
//! bit handling, argument validation, block-size discovery and the three
//! transfer strategies. Backends implement [`SpiBus`]; the Linux one lives
//! in `rspidev-linux` and an in-memory loopback in `rspidev-dummy`.
//!
//! # Transfers
//!
//! | method | kernel messages | chip select |
//! |--------|-----------------|-------------|
//! | [`SpiDev::xfer`]  | one `spi_ioc_transfer` per byte, chained | released between bytes |
//! | [`SpiDev::xfer2`] | one `spi_ioc_transfer` for the whole buffer | held |
//! | [`SpiDev::xfer3`] | one message per block, any length | held within a block |
//!
//! # Example
//!
//! ```ignore
//! use rspidev_core::{SpiDev, TransferOptions};
//!
//! let mut dev = SpiDev::open_with(&connector, 0, 0)?;
//! dev.set_max_speed_hz(1_000_000)?;
//! let rx = dev.xfer2(&[0x9F, 0, 0, 0], TransferOptions::new())?;
//! ```

pub mod block;
pub mod bus;
pub mod device;
pub mod error;
pub mod mode;
pub mod transfer;

pub use block::{block_size, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
pub use bus::{Connector, SpiBus};
pub use device::SpiDev;
pub use error::{Error, Result};
pub use mode::SpiModeFlags;
pub use transfer::{Segment, TransferOptions, MAX_SEGMENTS_PER_MESSAGE, MAX_TRANSFER_LEN};

/// Version string reported to scripts
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
