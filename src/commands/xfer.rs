//! Xfer command implementation

use super::hex_dump;
use crate::cli::TransferKind;
use rspidev_core::{SpiBus, SpiDev, TransferOptions};

/// Transfer `data` and print what came back
pub fn cmd_xfer<B: SpiBus>(
    dev: &mut SpiDev<B>,
    data: &[u8],
    kind: TransferKind,
    opts: TransferOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let rx = transfer(dev, data, kind, opts)?;
    println!("{}", hex_dump(&rx));
    Ok(())
}

fn transfer<B: SpiBus>(
    dev: &mut SpiDev<B>,
    data: &[u8],
    kind: TransferKind,
    opts: TransferOptions,
) -> rspidev_core::Result<Vec<u8>> {
    log::debug!("{:?} transfer of {} bytes", kind, data.len());
    match kind {
        TransferKind::Chained => dev.xfer(data, opts),
        TransferKind::Single => dev.xfer2(data, opts),
        TransferKind::Chunked => dev.xfer3(data, opts),
    }
}
