//! rspidev-dummy - In-memory loopback SPI bus for testing
//!
//! This crate provides a [`Loopback`] bus that behaves like a spidev device
//! with MOSI wired to MISO: every transfer receives exactly what it sent.
//! It records each call it sees, so tests can check how a handle drives the
//! kernel interface without real hardware.

use rspidev_core::{Connector, Error, Result, Segment, SpiBus};

use std::collections::VecDeque;
use std::os::unix::io::RawFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Initial state of a loopback device
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Mode byte reported before anything is written
    pub mode: u8,
    /// Word size reported before anything is written
    pub bits_per_word: u8,
    /// Clock speed reported before anything is written
    pub max_speed_hz: u32,
    /// Mode bits the "controller" supports; others read back as zero
    pub accepted_mode_mask: u8,
    /// Largest number of bytes a single `read` returns
    pub max_read: usize,
    /// Largest number of bytes a single `write` accepts
    pub max_write: usize,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            mode: 0,
            bits_per_word: 8,
            max_speed_hz: 500_000,
            accepted_mode_mask: 0xFF,
            max_read: usize::MAX,
            max_write: usize::MAX,
        }
    }
}

/// Backend operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ReadMode,
    WriteMode,
    ReadBitsPerWord,
    WriteBitsPerWord,
    ReadMaxSpeedHz,
    WriteMaxSpeedHz,
    Transfer,
    Read,
    Write,
    Close,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::ReadMode => "SPI_IOC_RD_MODE",
            Operation::WriteMode => "SPI_IOC_WR_MODE",
            Operation::ReadBitsPerWord => "SPI_IOC_RD_BITS_PER_WORD",
            Operation::WriteBitsPerWord => "SPI_IOC_WR_BITS_PER_WORD",
            Operation::ReadMaxSpeedHz => "SPI_IOC_RD_MAX_SPEED_HZ",
            Operation::WriteMaxSpeedHz => "SPI_IOC_WR_MAX_SPEED_HZ",
            Operation::Transfer => "SPI_IOC_MESSAGE",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Close => "close",
        }
    }
}

/// One transfer as the kernel would have seen it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSegment {
    pub tx: Vec<u8>,
    pub speed_hz: u32,
    pub delay_usecs: u16,
    pub bits_per_word: u8,
    pub cs_change: bool,
}

/// A call made on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    WriteMode(u8),
    WriteBitsPerWord(u8),
    WriteMaxSpeedHz(u32),
    /// One `SPI_IOC_MESSAGE(n)` with its segments
    Message(Vec<RecordedSegment>),
    /// `read(2)` of the given length
    Read(usize),
    /// `write(2)` of the given bytes
    Write(Vec<u8>),
}

/// Loopback SPI device
pub struct Loopback {
    config: LoopbackConfig,
    mode: u8,
    bits_per_word: u8,
    max_speed_hz: u32,
    fd: Option<RawFd>,
    read_data: VecDeque<u8>,
    calls: Vec<Call>,
    failures: Vec<(Operation, i32)>,
    closed: Option<Arc<AtomicUsize>>,
}

impl Loopback {
    /// Create a loopback device with the given initial state
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            mode: config.mode,
            bits_per_word: config.bits_per_word,
            max_speed_hz: config.max_speed_hz,
            config,
            fd: None,
            read_data: VecDeque::new(),
            calls: Vec::new(),
            failures: Vec::new(),
            closed: None,
        }
    }

    /// Create a loopback device in mode 0, 8 bits per word, 500 kHz
    pub fn new_default() -> Self {
        Self::new(LoopbackConfig::default())
    }

    /// Report `fd` as the device's file descriptor
    pub fn with_fd(mut self, fd: RawFd) -> Self {
        self.fd = Some(fd);
        self
    }

    /// Queue bytes returned by subsequent half-duplex reads
    ///
    /// Once the queue is empty, reads return zeros.
    pub fn queue_read(&mut self, data: &[u8]) {
        self.read_data.extend(data);
    }

    /// Make the next call of `op` fail with `errno`
    pub fn fail_next(&mut self, op: Operation, errno: i32) {
        self.failures.push((op, errno));
    }

    /// Every call recorded so far
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Forget the recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// All bytes passed to `write`, concatenated
    pub fn written(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Write(data) => Some(data.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Current mode byte as stored by the "controller"
    pub fn raw_mode(&self) -> u8 {
        self.mode
    }

    fn check(&mut self, op: Operation) -> Result<()> {
        match self.failures.iter().position(|(o, _)| *o == op) {
            Some(i) => {
                let (_, errno) = self.failures.remove(i);
                log::debug!("dummy: Failing {} with errno {}", op.name(), errno);
                Err(Error::os(op.name(), errno))
            }
            None => Ok(()),
        }
    }
}

impl SpiBus for Loopback {
    fn read_mode(&mut self) -> Result<u8> {
        self.check(Operation::ReadMode)?;
        Ok(self.mode)
    }

    fn write_mode(&mut self, mode: u8) -> Result<()> {
        self.check(Operation::WriteMode)?;
        self.calls.push(Call::WriteMode(mode));
        self.mode = mode & self.config.accepted_mode_mask;
        Ok(())
    }

    fn read_bits_per_word(&mut self) -> Result<u8> {
        self.check(Operation::ReadBitsPerWord)?;
        Ok(self.bits_per_word)
    }

    fn write_bits_per_word(&mut self, bits: u8) -> Result<()> {
        self.check(Operation::WriteBitsPerWord)?;
        self.calls.push(Call::WriteBitsPerWord(bits));
        self.bits_per_word = bits;
        Ok(())
    }

    fn read_max_speed_hz(&mut self) -> Result<u32> {
        self.check(Operation::ReadMaxSpeedHz)?;
        Ok(self.max_speed_hz)
    }

    fn write_max_speed_hz(&mut self, speed_hz: u32) -> Result<()> {
        self.check(Operation::WriteMaxSpeedHz)?;
        self.calls.push(Call::WriteMaxSpeedHz(speed_hz));
        self.max_speed_hz = speed_hz;
        Ok(())
    }

    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()> {
        self.check(Operation::Transfer)?;

        let mut recorded = Vec::with_capacity(segments.len());
        for segment in segments.iter_mut() {
            segment.rx.copy_from_slice(segment.tx);
            recorded.push(RecordedSegment {
                tx: segment.tx.to_vec(),
                speed_hz: segment.speed_hz,
                delay_usecs: segment.delay_usecs,
                bits_per_word: segment.bits_per_word,
                cs_change: segment.cs_change,
            });
        }
        self.calls.push(Call::Message(recorded));
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check(Operation::Read)?;
        self.calls.push(Call::Read(buf.len()));

        let len = buf.len().min(self.config.max_read);
        for byte in &mut buf[..len] {
            *byte = self.read_data.pop_front().unwrap_or(0);
        }
        Ok(len)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.check(Operation::Write)?;
        let len = data.len().min(self.config.max_write);
        self.calls.push(Call::Write(data[..len].to_vec()));
        Ok(len)
    }

    fn raw_fd(&self) -> Option<RawFd> {
        self.fd
    }

    fn close(mut self) -> Result<()> {
        if let Some(closed) = &self.closed {
            closed.fetch_add(1, Ordering::SeqCst);
        }
        self.check(Operation::Close)
    }

    fn close_boxed(self: Box<Self>) -> Result<()> {
        (*self).close()
    }
}

/// Hands out [`Loopback`] devices by number
///
/// Every connected device gets a distinct fake file descriptor.
#[derive(Debug, Clone)]
pub struct DummyConnector {
    config: LoopbackConfig,
    devices: Option<Vec<(u32, u32)>>,
    next_fd: Arc<AtomicI32>,
    closed: Arc<AtomicUsize>,
}

impl Default for DummyConnector {
    fn default() -> Self {
        Self::new(LoopbackConfig::default())
    }
}

impl DummyConnector {
    /// Connector that accepts any bus and device number
    pub fn new(config: LoopbackConfig) -> Self {
        Self {
            config,
            devices: None,
            next_fd: Arc::new(AtomicI32::new(100)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Only accept the listed `(bus, device)` pairs
    pub fn with_devices(mut self, devices: &[(u32, u32)]) -> Self {
        self.devices = Some(devices.to_vec());
        self
    }

    /// Number of devices from this connector that have been closed
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connector for DummyConnector {
    type Bus = Loopback;

    fn connect(&self, bus: u32, device: u32) -> Result<Loopback> {
        if let Some(devices) = &self.devices {
            if !devices.contains(&(bus, device)) {
                return Err(Error::Open {
                    path: PathBuf::from(format!("/dev/spidev{}.{}", bus, device)),
                    source: std::io::Error::from_raw_os_error(2),
                });
            }
        }

        let fd = self.next_fd.fetch_add(1, Ordering::SeqCst);
        log::debug!("dummy: Connected spidev{}.{} as fd {}", bus, device, fd);

        let mut dev = Loopback::new(self.config.clone()).with_fd(fd);
        dev.closed = Some(Arc::clone(&self.closed));
        Ok(dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rspidev_core::{SpiDev, SpiModeFlags, TransferOptions, MAX_TRANSFER_LEN};

    const EINVAL: i32 = 22;
    const EIO: i32 = 5;

    fn open() -> SpiDev<Loopback> {
        SpiDev::open_with(&DummyConnector::default(), 0, 0).unwrap()
    }

    fn bus(dev: &SpiDev<Loopback>) -> &Loopback {
        dev.bus().unwrap()
    }

    fn messages(dev: &SpiDev<Loopback>) -> Vec<Vec<RecordedSegment>> {
        bus(dev)
            .calls()
            .iter()
            .filter_map(|call| match call {
                Call::Message(segments) => Some(segments.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_open_loads_settings() {
        let config = LoopbackConfig {
            mode: 0x03,
            bits_per_word: 16,
            max_speed_hz: 1_000_000,
            ..Default::default()
        };
        let dev = SpiDev::open_with(&DummyConnector::new(config), 1, 2).unwrap();
        assert!(dev.is_open());
        assert_eq!(dev.mode(), 3);
        assert_eq!(dev.bits_per_word(), 16);
        assert_eq!(dev.max_speed_hz(), 1_000_000);
        assert!(!dev.cs_high());
        assert!(dev.fileno() >= 100);
    }

    #[test]
    fn test_open_missing_device() {
        let connector = DummyConnector::default().with_devices(&[(0, 0)]);
        let err = SpiDev::open_with(&connector, 0, 1).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
        assert_eq!(err.raw_os_error(), Some(2));
    }

    #[test]
    fn test_open_reopens() {
        let connector = DummyConnector::default();
        let mut dev = SpiDev::open_with(&connector, 0, 0).unwrap();
        let first = dev.fileno();
        dev.open(&connector, 0, 1).unwrap();
        assert_eq!(connector.closed_count(), 1);
        assert_ne!(dev.fileno(), first);
    }

    #[test]
    fn test_attach_failure_drops_bus() {
        let mut bus = Loopback::new_default();
        bus.fail_next(Operation::ReadMaxSpeedHz, EIO);
        let err = SpiDev::from_bus(bus).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(EIO));
    }

    #[test]
    fn test_xfer_loopback() {
        let mut dev = open();
        let data: Vec<u8> = (0..255).collect();
        let rx = dev.xfer(&data, TransferOptions::new()).unwrap();
        assert_eq!(rx, data);

        let messages = messages(&dev);
        assert_eq!(messages.len(), 1);
        let segments = &messages[0];
        assert_eq!(segments.len(), 255);
        assert!(segments.iter().all(|s| s.tx.len() == 1));
        assert!(segments[..254].iter().all(|s| s.cs_change));
        assert!(!segments[254].cs_change);
    }

    #[test]
    fn test_xfer_splits_long_chains() {
        let mut dev = open();
        let data = vec![0x5A; 1200];
        let rx = dev.xfer(&data, TransferOptions::new()).unwrap();
        assert_eq!(rx, data);

        let messages = messages(&dev);
        let sizes: Vec<usize> = messages.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![511, 511, 178]);

        // Chip select is released at the end of every message
        for segments in &messages {
            let (last, rest) = segments.split_last().unwrap();
            assert!(!last.cs_change);
            assert!(rest.iter().all(|s| s.cs_change));
        }
    }

    #[test]
    fn test_xfer2_loopback() {
        let mut dev = open();
        let data: Vec<u8> = (0..255).collect();
        let rx = dev.xfer2(&data, TransferOptions::new()).unwrap();
        assert_eq!(rx, data);

        let messages = messages(&dev);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].len(), 1);
        assert_eq!(messages[0][0].tx, data);
        assert!(!messages[0][0].cs_change);
    }

    #[test]
    fn test_single_shot_limits() {
        let mut dev = open();
        let opts = TransferOptions::new();
        assert!(matches!(dev.xfer(&[], opts), Err(Error::EmptyData)));
        assert!(matches!(dev.xfer2(&[], opts), Err(Error::EmptyData)));
        assert!(matches!(dev.xfer3(&[], opts), Err(Error::EmptyData)));
        assert!(matches!(dev.write_bytes(&[]), Err(Error::EmptyData)));
        assert!(matches!(dev.write_bytes2(&[]), Err(Error::EmptyData)));

        let long = vec![0u8; MAX_TRANSFER_LEN + 1];
        assert!(matches!(dev.xfer(&long, opts), Err(Error::TooLong { .. })));
        assert!(matches!(dev.xfer2(&long, opts), Err(Error::TooLong { .. })));
        assert!(matches!(dev.write_bytes(&long), Err(Error::TooLong { .. })));
        assert!(bus(&dev).calls().is_empty());

        let max = vec![0u8; MAX_TRANSFER_LEN];
        assert_eq!(dev.xfer2(&max, opts).unwrap().len(), MAX_TRANSFER_LEN);
    }

    #[test]
    fn test_xfer3_chunks() {
        let mut dev = open().with_block_size(100);
        let data: Vec<u8> = (0..250).map(|i| i as u8).collect();
        let rx = dev.xfer3(&data, TransferOptions::new()).unwrap();
        assert_eq!(rx, data);

        let sizes: Vec<usize> = messages(&dev).iter().map(|m| m[0].tx.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn test_xfer3_any_length() {
        let mut dev = open();
        let data: Vec<u8> = (0..10_000).map(|i| i as u8).collect();
        let rx = dev.xfer3(&data, TransferOptions::new()).unwrap();
        assert_eq!(rx, data);
        assert_eq!(messages(&dev).len(), data.len().div_ceil(dev.block_size()));
    }

    #[test]
    fn test_transfer_options() {
        let mut dev = open();
        dev.xfer2(&[1, 2], TransferOptions::new()).unwrap();
        dev.xfer2(
            &[3],
            TransferOptions::new()
                .with_speed(2_000_000)
                .with_delay(7)
                .with_bits_per_word(16),
        )
        .unwrap();

        let messages = messages(&dev);
        let cached = &messages[0][0];
        assert_eq!(cached.speed_hz, 500_000);
        assert_eq!(cached.bits_per_word, 8);
        assert_eq!(cached.delay_usecs, 0);

        let overridden = &messages[1][0];
        assert_eq!(overridden.speed_hz, 2_000_000);
        assert_eq!(overridden.bits_per_word, 16);
        assert_eq!(overridden.delay_usecs, 7);
        // Per-call overrides do not change the handle
        assert_eq!(dev.max_speed_hz(), 500_000);
    }

    #[test]
    fn test_cs_high_release_read() {
        let mut dev = open();
        dev.set_cs_high(true).unwrap();
        assert!(dev.cs_high());

        dev.bus_mut().unwrap().clear_calls();
        dev.xfer2(&[0xAA], TransferOptions::new()).unwrap();
        assert_eq!(bus(&dev).calls().last(), Some(&Call::Read(0)));

        // A failing release read is not reported
        dev.bus_mut().unwrap().fail_next(Operation::Read, EIO);
        assert_eq!(dev.xfer3(&[0x55], TransferOptions::new()).unwrap(), vec![0x55]);
    }

    #[test]
    fn test_no_release_read_without_cs_high() {
        let mut dev = open();
        dev.xfer(&[1, 2, 3], TransferOptions::new()).unwrap();
        assert!(!bus(&dev).calls().iter().any(|c| matches!(c, Call::Read(_))));
    }

    #[test]
    fn test_set_mode_keeps_flags() {
        let mut dev = open();
        dev.set_lsb_first(true).unwrap();
        dev.set_mode(3).unwrap();
        assert_eq!(dev.mode(), 3);
        assert!(dev.lsb_first());
        assert_eq!(bus(&dev).raw_mode(), 0x0B);

        dev.set_lsb_first(false).unwrap();
        assert_eq!(dev.mode_flags(), SpiModeFlags::MODE_3);

        assert!(matches!(dev.set_mode(4), Err(Error::InvalidMode(4))));
        assert_eq!(dev.mode(), 3);
    }

    #[test]
    fn test_flag_setters() {
        let mut dev = open();
        dev.set_three_wire(true).unwrap();
        dev.set_loopback(true).unwrap();
        dev.set_no_cs(true).unwrap();
        assert!(dev.three_wire());
        assert!(dev.loopback());
        assert!(dev.no_cs());
        assert_eq!(bus(&dev).raw_mode(), 0x70);

        dev.set_loopback(false).unwrap();
        assert!(!dev.loopback());
        assert_eq!(bus(&dev).raw_mode(), 0x50);
    }

    #[test]
    fn test_mode_not_accepted() {
        let config = LoopbackConfig {
            accepted_mode_mask: 0x0F,
            ..Default::default()
        };
        let mut dev = SpiDev::open_with(&DummyConnector::new(config), 0, 0).unwrap();
        dev.set_cs_high(true).unwrap();

        let err = dev.set_three_wire(true).unwrap_err();
        assert!(matches!(
            err,
            Error::ModeMismatch {
                requested: 0x14,
                actual: 0x04
            }
        ));
        assert!(!dev.three_wire());
        assert!(dev.cs_high());
    }

    #[test]
    fn test_mode_write_failure() {
        let mut dev = open();
        dev.bus_mut().unwrap().fail_next(Operation::WriteMode, EINVAL);
        let err = dev.set_mode(2).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(EINVAL));
        assert_eq!(dev.mode(), 0);
    }

    #[test]
    fn test_bits_per_word() {
        let mut dev = open();
        dev.set_bits_per_word(8).unwrap();
        assert!(bus(&dev).calls().is_empty());

        dev.set_bits_per_word(16).unwrap();
        assert_eq!(bus(&dev).calls(), &[Call::WriteBitsPerWord(16)]);
        assert_eq!(dev.bits_per_word(), 16);

        assert!(matches!(
            dev.set_bits_per_word(7),
            Err(Error::InvalidBitsPerWord(7))
        ));
        assert!(matches!(
            dev.set_bits_per_word(33),
            Err(Error::InvalidBitsPerWord(33))
        ));

        dev.bus_mut().unwrap().fail_next(Operation::WriteBitsPerWord, EINVAL);
        assert!(dev.set_bits_per_word(32).is_err());
        assert_eq!(dev.bits_per_word(), 16);
    }

    #[test]
    fn test_max_speed_hz() {
        let mut dev = open();
        dev.set_max_speed_hz(500_000).unwrap();
        assert!(bus(&dev).calls().is_empty());

        dev.set_max_speed_hz(8_000_000).unwrap();
        assert_eq!(dev.max_speed_hz(), 8_000_000);
        assert_eq!(bus(&dev).calls(), &[Call::WriteMaxSpeedHz(8_000_000)]);
    }

    #[test]
    fn test_read_bytes() {
        let mut dev = open();
        dev.bus_mut().unwrap().queue_read(&[0xDE, 0xAD]);
        assert_eq!(dev.read_bytes(3).unwrap(), vec![0xDE, 0xAD, 0x00]);

        // Lengths are clamped rather than rejected
        assert_eq!(dev.read_bytes(0).unwrap().len(), 1);
        assert_eq!(dev.read_bytes(5000).unwrap().len(), MAX_TRANSFER_LEN);
    }

    #[test]
    fn test_short_io() {
        let config = LoopbackConfig {
            max_read: 2,
            max_write: 3,
            ..Default::default()
        };
        let mut dev = SpiDev::open_with(&DummyConnector::new(config), 0, 0).unwrap();
        assert!(matches!(
            dev.read_bytes(4),
            Err(Error::ShortRead {
                expected: 4,
                actual: 2
            })
        ));
        assert!(matches!(
            dev.write_bytes(&[1, 2, 3, 4]),
            Err(Error::ShortWrite {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_write_bytes() {
        let mut dev = open();
        dev.write_bytes(&[0x06, 0x02]).unwrap();
        assert_eq!(bus(&dev).calls(), &[Call::Write(vec![0x06, 0x02])]);
    }

    #[test]
    fn test_write_bytes2_chunks() {
        let mut dev = open().with_block_size(4);
        let data: Vec<u8> = (0..10).collect();
        dev.write_bytes2(&data).unwrap();

        let writes: Vec<usize> = bus(&dev)
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::Write(d) => Some(d.len()),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![4, 4, 2]);
        assert_eq!(bus(&dev).written(), data);
    }

    #[test]
    fn test_close() {
        let connector = DummyConnector::default();
        let mut dev = SpiDev::open_with(&connector, 0, 0).unwrap();
        dev.set_mode(1).unwrap();

        dev.close().unwrap();
        assert!(!dev.is_open());
        assert_eq!(dev.fileno(), -1);
        assert_eq!(dev.mode(), 0);
        assert_eq!(dev.bits_per_word(), 0);
        assert_eq!(dev.max_speed_hz(), 0);
        assert_eq!(connector.closed_count(), 1);

        // Closing again is a no-op
        dev.close().unwrap();
        assert_eq!(connector.closed_count(), 1);

        assert!(matches!(dev.read_bytes(1), Err(Error::NotOpen)));
        assert!(matches!(dev.write_bytes(&[1]), Err(Error::NotOpen)));
        assert!(matches!(
            dev.xfer2(&[1], TransferOptions::new()),
            Err(Error::NotOpen)
        ));
        assert!(matches!(dev.set_mode(2), Err(Error::NotOpen)));
        assert!(matches!(dev.set_max_speed_hz(1), Err(Error::NotOpen)));
    }

    #[test]
    fn test_close_error_still_resets() {
        let mut dev = open();
        dev.bus_mut().unwrap().fail_next(Operation::Close, EIO);
        let err = dev.close().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(EIO));
        assert!(!dev.is_open());
        assert_eq!(dev.max_speed_hz(), 0);
    }

    #[test]
    fn test_close_error_through_box() {
        let mut bus = Loopback::new_default();
        bus.fail_next(Operation::Close, EIO);
        let boxed: Box<dyn SpiBus + Send> = Box::new(bus);
        let mut dev = SpiDev::from_bus(boxed).unwrap();

        let err = dev.close().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(EIO));
        assert!(!dev.is_open());
    }

    #[test]
    fn test_drop_closes() {
        let connector = DummyConnector::default();
        {
            let _dev = SpiDev::open_with(&connector, 0, 0).unwrap();
        }
        assert_eq!(connector.closed_count(), 1);
    }

    #[test]
    fn test_transfer_failure() {
        let mut dev = open();
        dev.bus_mut().unwrap().fail_next(Operation::Transfer, EIO);
        let err = dev.xfer2(&[1], TransferOptions::new()).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(EIO));
        assert!(err.to_string().starts_with("SPI_IOC_MESSAGE failed"));
    }
}
