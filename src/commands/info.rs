//! Info command implementation

use rspidev_core::{SpiBus, SpiDev};

/// Print the cached settings of an open device
pub fn cmd_info<B: SpiBus>(dev: &SpiDev<B>) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", describe(dev));
    Ok(())
}

fn yes_no(on: bool) -> &'static str {
    if on {
        "yes"
    } else {
        "no"
    }
}

/// Human-readable summary of the device settings
pub fn describe<B: SpiBus>(dev: &SpiDev<B>) -> String {
    let speed = dev.max_speed_hz();
    format!(
        "File descriptor: {}\n\
         Mode:            {} (mode byte {:#04x})\n\
         CS active high:  {}\n\
         LSB first:       {}\n\
         3-wire:          {}\n\
         Loopback:        {}\n\
         No CS:           {}\n\
         Bits per word:   {}\n\
         Max speed:       {} Hz ({} kHz)\n\
         Block size:      {} bytes\n",
        dev.fileno(),
        dev.mode(),
        dev.mode_flags().bits(),
        yes_no(dev.cs_high()),
        yes_no(dev.lsb_first()),
        yes_no(dev.three_wire()),
        yes_no(dev.loopback()),
        yes_no(dev.no_cs()),
        dev.bits_per_word(),
        speed,
        speed / 1000,
        dev.block_size()
    )
}
