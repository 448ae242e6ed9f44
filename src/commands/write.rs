//! Write and send command implementations

use indicatif::{ProgressBar, ProgressStyle};
use rspidev_core::{SpiBus, SpiDev};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Write up to one transfer's worth of bytes
pub fn cmd_write<B: SpiBus>(
    dev: &mut SpiDev<B>,
    data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    dev.write_bytes(data)?;
    println!("Wrote {} bytes", data.len());
    Ok(())
}

/// Read file contents into a Vec
fn read_file(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    println!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

/// Send a whole file, one block at a time, with a progress bar
pub fn cmd_send<B: SpiBus>(
    dev: &mut SpiDev<B>,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = read_file(input)?;
    if data.is_empty() {
        return Err(format!("{:?} is empty", input).into());
    }

    let block_size = dev.block_size();
    log::debug!("Sending in blocks of {} bytes", block_size);

    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    dev.write_bytes2_with_progress(&data, |written| pb.inc(written as u64))?;

    pb.finish_with_message("Send complete");
    println!("Sent {} bytes", data.len());
    Ok(())
}
