//! CLI command implementations
//!
//! Every command works on an [`rspidev_core::SpiDev`] regardless of the
//! backend, so the loopback device exercises the same paths as hardware.

mod configure;
mod info;
mod read;
#[cfg(feature = "repl")]
mod repl;
mod write;
mod xfer;

pub use configure::{cmd_configure, Settings};
pub use info::cmd_info;
pub use read::cmd_read;
#[cfg(feature = "repl")]
pub use repl::cmd_repl;
pub use write::{cmd_send, cmd_write};
pub use xfer::cmd_xfer;

/// Format bytes as a hex dump, 16 per line with offsets
pub fn hex_dump(data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(i, line)| {
            let hex: Vec<String> = line.iter().map(|b| format!("{:02x}", b)).collect();
            format!("{:08x}  {}", i * 16, hex.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
