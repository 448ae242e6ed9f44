//! Transfer block-size discovery
//!
//! The spidev driver bounces every transfer through a kernel buffer whose
//! size is the `bufsiz` module parameter. Large writes and transfers are cut
//! into blocks of that size.

use once_cell::sync::OnceCell;
use std::path::Path;

/// Path to the kernel spidev buffer size parameter
pub const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Block size used when `bufsiz` cannot be read
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Upper bound on the block size, even if `bufsiz` allows more
pub const MAX_BLOCK_SIZE: usize = 65535;

static BLOCK_SIZE: OnceCell<usize> = OnceCell::new();

/// Block size for this process
///
/// Read from sysfs on first use and cached afterwards.
pub fn block_size() -> usize {
    *BLOCK_SIZE.get_or_init(|| {
        let size = read_block_size(Path::new(BUF_SIZE_SYSFS));
        log::debug!("spidev: Using block size {}", size);
        size
    })
}

/// Read a block size from `path`, falling back to [`DEFAULT_BLOCK_SIZE`]
pub fn read_block_size(path: &Path) -> usize {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_block_size(&content).unwrap_or_else(|| {
            log::warn!("spidev: Invalid buffer size in {}", path.display());
            DEFAULT_BLOCK_SIZE
        }),
        Err(e) => {
            log::debug!("spidev: Cannot read {}: {}", path.display(), e);
            DEFAULT_BLOCK_SIZE
        }
    }
}

/// Parse the contents of `bufsiz`
///
/// Returns `None` unless the first token is a positive integer. Values above
/// [`MAX_BLOCK_SIZE`] are capped.
pub fn parse_block_size(content: &str) -> Option<usize> {
    let value: i64 = content.split_whitespace().next()?.parse().ok()?;
    if value <= 0 {
        return None;
    }
    Some((value as u64).min(MAX_BLOCK_SIZE as u64) as usize)
}
