//! Read command implementation

use super::hex_dump;
use rspidev_core::{SpiBus, SpiDev, MAX_TRANSFER_LEN};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Read `length` bytes, writing them to `output` or printing a hex dump
pub fn cmd_read<B: SpiBus>(
    dev: &mut SpiDev<B>,
    length: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    if length == 0 || length > MAX_TRANSFER_LEN {
        log::warn!(
            "Read length {} out of range, clamping to 1-{}",
            length,
            MAX_TRANSFER_LEN
        );
    }

    let data = dev.read_bytes(length)?;

    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(&data)?;
            println!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => println!("{}", hex_dump(&data)),
    }

    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use rspidev_dummy::Loopback;

    #[test]
    fn test_read_to_file() {
        let mut bus = Loopback::new_default();
        bus.queue_read(&[1, 2, 3, 4]);
        let mut dev = SpiDev::from_bus(bus).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        cmd_read(&mut dev, 3, Some(&path)).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    }
}
