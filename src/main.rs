//! rspidev - Linux spidev from the command line
//!
//! Opens `/dev/spidevX.Y` devices, inspects and changes their settings and
//! runs half- and full-duplex transfers. With the `repl` feature, devices can
//! also be scripted from Steel Scheme.
//!
//! # Architecture
//!
//! - `rspidev-core` holds the device handle, validation and transfer logic
//! - `rspidev-linux` talks to the kernel through the spidev ioctls
//! - `rspidev-dummy` is an in-memory loopback used by `--dummy` and tests
//! - `rspidev-repl` binds handles into a Scheme environment

mod cli;
mod commands;
mod device;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Settings;
use device::open_device;
use rspidev_core::TransferOptions;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Info { device } => {
            let dev = open_device(&device, cli.dummy)?;
            commands::cmd_info(&dev)
        }
        Commands::Configure {
            device,
            mode,
            speed,
            bits,
            cs_high,
            lsb_first,
            three_wire,
            loopback,
            no_cs,
        } => {
            let mut dev = open_device(&device, cli.dummy)?;
            let settings = Settings {
                mode,
                speed_hz: speed,
                bits_per_word: bits,
                cs_high,
                lsb_first,
                three_wire,
                loopback,
                no_cs,
            };
            commands::cmd_configure(&mut dev, &settings)
        }
        Commands::Read {
            device,
            length,
            output,
        } => {
            let mut dev = open_device(&device, cli.dummy)?;
            commands::cmd_read(&mut dev, length, output.as_deref())
        }
        Commands::Write { device, data } => {
            let mut dev = open_device(&device, cli.dummy)?;
            commands::cmd_write(&mut dev, &data.0)
        }
        Commands::Send { device, input } => {
            let mut dev = open_device(&device, cli.dummy)?;
            commands::cmd_send(&mut dev, &input)
        }
        Commands::Xfer {
            device,
            data,
            kind,
            speed,
            delay,
            bits,
        } => {
            let mut dev = open_device(&device, cli.dummy)?;
            let opts = TransferOptions::new()
                .with_speed(speed)
                .with_delay(delay)
                .with_bits_per_word(bits);
            commands::cmd_xfer(&mut dev, &data.0, kind, opts)
        }
        #[cfg(feature = "repl")]
        Commands::Repl { script } => commands::cmd_repl(script.as_deref(), cli.dummy),
    }
}
