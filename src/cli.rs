//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Bytes given on the command line as hex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

/// Parse hex such as "9f000000", "9f 00 00" or "0x9f,0x00"
pub fn parse_hex_bytes(s: &str) -> Result<HexBytes, String> {
    let digits: String = s
        .replace("0x", "")
        .replace("0X", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != ':')
        .collect();
    if digits.is_empty() {
        return Err("No data given".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in {:?}", s));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("Invalid hex: {:?}", s))
        })
        .collect::<Result<Vec<u8>, String>>()
        .map(HexBytes)
}

#[derive(Parser)]
#[command(name = "rspidev")]
#[command(author, version, about = "Linux spidev utility", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Use an in-memory loopback device instead of /dev/spidev
    #[arg(long, global = true)]
    pub dummy: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// SPI device: /dev/spidevX.Y or X.Y, optionally followed by
    /// ,key=value options (speed, mode, bits, cshigh, lsbfirst, threewire,
    /// loop, nocs, blocksize)
    #[arg(short, long, default_value = "0.0")]
    pub device: String,
}

/// Transfer style used by the xfer command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// One transfer per byte, chip select released between bytes
    Chained,
    /// One transfer for the whole buffer, chip select held
    Single,
    /// Block-size transfers, any length
    Chunked,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show device settings
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Change device settings
    Configure {
        #[command(flatten)]
        device: DeviceArgs,

        /// SPI mode (0-3)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=3))]
        mode: Option<u8>,

        /// Maximum clock speed in Hz (hex or decimal)
        #[arg(long, value_parser = parse_hex_u32)]
        speed: Option<u32>,

        /// Bits per word (8-32)
        #[arg(long, value_parser = clap::value_parser!(u8).range(8..=32))]
        bits: Option<u8>,

        /// Chip select active high
        #[arg(long)]
        cs_high: Option<bool>,

        /// Transmit LSB first
        #[arg(long)]
        lsb_first: Option<bool>,

        /// Shared SI/SO signals
        #[arg(long)]
        three_wire: Option<bool>,

        /// Controller loopback
        #[arg(long)]
        loopback: Option<bool>,

        /// No chip select
        #[arg(long)]
        no_cs: Option<bool>,
    },

    /// Read bytes from the device
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Number of bytes to read (1-4096)
        #[arg(short = 'n', long)]
        length: usize,

        /// Output file path (prints hex if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write bytes given as hex
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// Data as hex, e.g. "06" or "02 00 10 00 ff"
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,
    },

    /// Write a file of any size in block-size chunks
    Send {
        #[command(flatten)]
        device: DeviceArgs,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Full-duplex transfer, printing the received bytes
    Xfer {
        #[command(flatten)]
        device: DeviceArgs,

        /// Data as hex
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,

        /// Transfer style
        #[arg(long, value_enum, default_value_t = TransferKind::Single)]
        kind: TransferKind,

        /// Clock speed for this transfer in Hz (0 keeps the device setting)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        speed: u32,

        /// Delay after each transfer in microseconds
        #[arg(long, default_value_t = 0)]
        delay: u16,

        /// Bits per word for this transfer (0 keeps the device setting)
        #[arg(long, default_value_t = 0)]
        bits: u8,
    },

    /// Start the Scheme REPL or run a script
    #[cfg(feature = "repl")]
    Repl {
        /// Script to run instead of the interactive REPL
        script: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("9f 00"), Ok(HexBytes(vec![0x9f, 0])));
        assert_eq!(parse_hex_bytes("0x01,0x02"), Ok(HexBytes(vec![1, 2])));
        assert_eq!(parse_hex_bytes("DEADbeef").map(|h| h.0.len()), Ok(4));
        assert!(parse_hex_bytes("").is_err());
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "rspidev", "-v", "--dummy", "xfer", "-d", "1.0,speed=1000", "--kind", "chained",
            "01 02",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(cli.dummy);
        match cli.command {
            Commands::Xfer {
                device, data, kind, ..
            } => {
                assert_eq!(device.device, "1.0,speed=1000");
                assert_eq!(data, HexBytes(vec![1, 2]));
                assert_eq!(kind, TransferKind::Chained);
            }
            _ => panic!("expected xfer"),
        }

        assert!(Cli::try_parse_from(["rspidev", "configure", "--mode", "4"]).is_err());
        assert!(Cli::try_parse_from(["rspidev", "configure", "--bits", "7"]).is_err());
    }
}
