//! spidev module for Steel Scheme
//!
//! Devices live in a handle table shared with the registered closures;
//! scripts refer to them by the integer id returned from `spi-open`.

use rspidev_core::{Connector, SpiDev, SpiModeFlags, TransferOptions, MAX_TRANSFER_LEN};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use steel::primitives::bytevectors;
use steel::rvals::SteelVal;
use steel::steel_vm::builtin::BuiltInModule;
use steel::steel_vm::register_fn::RegisterFn;

/// Name of the module with the device functions
pub const SPI_MODULE: &str = "rspidev/spi";

/// Name of the module with the mode constants
pub const CONSTS_MODULE: &str = "rspidev/consts";

/// Every function registered in [`SPI_MODULE`]
pub const FUNCTION_NAMES: &[&str] = &[
    "spi-open",
    "spi-open!",
    "spi-close",
    "spi-fileno",
    "spi-open?",
    "spi-read",
    "spi-write",
    "spi-write2",
    "spi-xfer",
    "spi-xfer2",
    "spi-xfer3",
    "spi-xfer*",
    "spi-xfer2*",
    "spi-xfer3*",
    "spi-mode",
    "spi-set-mode!",
    "spi-cshigh?",
    "spi-set-cshigh!",
    "spi-threewire?",
    "spi-set-threewire!",
    "spi-lsbfirst?",
    "spi-set-lsbfirst!",
    "spi-loop?",
    "spi-set-loop!",
    "spi-no-cs?",
    "spi-set-no-cs!",
    "spi-bits-per-word",
    "spi-set-bits-per-word!",
    "spi-max-speed-hz",
    "spi-set-max-speed-hz!",
    "spi-block-size",
    "make-bytes",
    "bytes-length",
    "bytes->hex",
    "hex->bytes",
    "spidev-help",
];

/// Every value registered in [`CONSTS_MODULE`]
pub const CONSTANT_NAMES: &[&str] = &[
    "SPI_CPHA",
    "SPI_CPOL",
    "SPI_CS_HIGH",
    "SPI_LSB_FIRST",
    "SPI_3WIRE",
    "SPI_LOOP",
    "SPI_NO_CS",
    "SPI_READY",
    "SPI_MODE_0",
    "SPI_MODE_1",
    "SPI_MODE_2",
    "SPI_MODE_3",
    "SPI_MAX_TRANSFER",
    "SPIDEV_VERSION",
];

/// Open devices, keyed by handle id
pub struct Registry<C: Connector> {
    connector: C,
    devices: BTreeMap<isize, SpiDev<C::Bus>>,
    next_id: isize,
}

/// Registry shared between the engine's closures
pub type SharedRegistry<C> = Arc<Mutex<Registry<C>>>;

impl<C: Connector> Registry<C> {
    /// Create an empty registry that opens devices through `connector`
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            devices: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Wrap the registry for sharing with the engine
    pub fn shared(connector: C) -> SharedRegistry<C> {
        Arc::new(Mutex::new(Self::new(connector)))
    }

    /// Open `bus`.`device` under a new handle id
    pub fn open(&mut self, bus: u32, device: u32) -> rspidev_core::Result<isize> {
        let dev = SpiDev::open_with(&self.connector, bus, device)?;
        let id = self.next_id;
        self.next_id += 1;
        log::debug!("repl: spidev{}.{} is handle {}", bus, device, id);
        self.devices.insert(id, dev);
        Ok(id)
    }

    /// Reopen an existing handle on `bus`.`device`
    pub fn reopen(&mut self, id: isize, bus: u32, device: u32) -> Result<(), String> {
        let dev = self
            .devices
            .get_mut(&id)
            .ok_or_else(|| unknown_handle(id))?;
        dev.open(&self.connector, bus, device)
            .map_err(|e| e.to_string())
    }

    /// Device behind handle `id`
    pub fn device(&mut self, id: isize) -> Result<&mut SpiDev<C::Bus>, String> {
        self.devices.get_mut(&id).ok_or_else(|| unknown_handle(id))
    }

    /// Number of handles, open or closed
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no handle has been created
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

fn unknown_handle(id: isize) -> String {
    format!("no such spidev handle: {}", id)
}

/// Run `f` on the device behind `handle`
fn with_device<C, T, F>(registry: &SharedRegistry<C>, handle: isize, f: F) -> Result<T, String>
where
    C: Connector,
    F: FnOnce(&mut SpiDev<C::Bus>) -> rspidev_core::Result<T>,
{
    let mut registry = registry
        .lock()
        .map_err(|e| format!("lock error: {}", e))?;
    let dev = registry.device(handle)?;
    f(dev).map_err(|e| e.to_string())
}

/// Create the device module bound to `registry`
pub fn create_spi_module<C>(registry: SharedRegistry<C>) -> BuiltInModule
where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let mut module = BuiltInModule::new(SPI_MODULE);

    register_lifecycle(&mut module, &registry);
    register_io(&mut module, &registry);
    register_settings(&mut module, &registry);
    register_byte_utilities(&mut module);

    module.register_fn("spidev-help", || {
        print_help();
        SteelVal::Void
    });

    module
}

fn register_lifecycle<C>(module: &mut BuiltInModule, registry: &SharedRegistry<C>)
where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let r = Arc::clone(registry);
    module.register_fn("spi-open", move |bus: isize, device: isize| -> Result<isize, String> {
        let (bus, device) = (to_u32("bus", bus)?, to_u32("device", device)?);
        let mut registry = r.lock().map_err(|e| format!("lock error: {}", e))?;
        registry.open(bus, device).map_err(|e| e.to_string())
    });

    let r = Arc::clone(registry);
    module.register_fn(
        "spi-open!",
        move |handle: isize, bus: isize, device: isize| -> Result<SteelVal, String> {
            let (bus, device) = (to_u32("bus", bus)?, to_u32("device", device)?);
            let mut registry = r.lock().map_err(|e| format!("lock error: {}", e))?;
            registry.reopen(handle, bus, device)?;
            Ok(SteelVal::Void)
        },
    );

    let r = Arc::clone(registry);
    module.register_fn("spi-close", move |handle: isize| {
        with_device(&r, handle, |dev| dev.close()).map(|_| SteelVal::Void)
    });

    let r = Arc::clone(registry);
    module.register_fn("spi-fileno", move |handle: isize| {
        with_device(&r, handle, |dev| Ok(dev.fileno() as isize))
    });

    let r = Arc::clone(registry);
    module.register_fn("spi-open?", move |handle: isize| {
        with_device(&r, handle, |dev| Ok(dev.is_open()))
    });
}

fn register_io<C>(module: &mut BuiltInModule, registry: &SharedRegistry<C>)
where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let r = Arc::clone(registry);
    module.register_fn("spi-read", move |handle: isize, len: isize| {
        // Out of range lengths are clamped like any other
        let len = len.max(0) as usize;
        with_device(&r, handle, |dev| dev.read_bytes(len)).map(|rx| bytes_to_steel(&rx))
    });

    let r = Arc::clone(registry);
    module.register_fn(
        "spi-write",
        move |handle: isize, data: SteelVal| -> Result<SteelVal, String> {
            let data = steel_to_bytes(&data)?;
            with_device(&r, handle, |dev| dev.write_bytes(&data)).map(|_| SteelVal::Void)
        },
    );

    let r = Arc::clone(registry);
    module.register_fn(
        "spi-write2",
        move |handle: isize, data: SteelVal| -> Result<SteelVal, String> {
            let data = steel_to_bytes(&data)?;
            with_device(&r, handle, |dev| dev.write_bytes2(&data)).map(|_| SteelVal::Void)
        },
    );

    register_transfer(module, registry, "spi-xfer", Kind::Chained);
    register_transfer(module, registry, "spi-xfer2", Kind::Single);
    register_transfer(module, registry, "spi-xfer3", Kind::Chunked);
}

/// Which transfer a function performs
#[derive(Debug, Clone, Copy)]
enum Kind {
    Chained,
    Single,
    Chunked,
}

fn transfer<C: Connector>(
    registry: &SharedRegistry<C>,
    handle: isize,
    kind: Kind,
    data: &SteelVal,
    opts: TransferOptions,
) -> Result<SteelVal, String> {
    let data = steel_to_bytes(data)?;
    let rx = with_device(registry, handle, |dev| match kind {
        Kind::Chained => dev.xfer(&data, opts),
        Kind::Single => dev.xfer2(&data, opts),
        Kind::Chunked => dev.xfer3(&data, opts),
    })?;
    Ok(bytes_to_steel(&rx))
}

/// Register `name` with cached settings and `name*` with explicit speed,
/// delay and word size
fn register_transfer<C>(
    module: &mut BuiltInModule,
    registry: &SharedRegistry<C>,
    name: &'static str,
    kind: Kind,
) where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let r = Arc::clone(registry);
    module.register_fn(name, move |handle: isize, data: SteelVal| {
        transfer(&r, handle, kind, &data, TransferOptions::new())
    });

    let starred: &'static str = match kind {
        Kind::Chained => "spi-xfer*",
        Kind::Single => "spi-xfer2*",
        Kind::Chunked => "spi-xfer3*",
    };
    let r = Arc::clone(registry);
    module.register_fn(
        starred,
        move |handle: isize,
              data: SteelVal,
              speed: isize,
              delay: isize,
              bits: isize|
              -> Result<SteelVal, String> {
            let opts = TransferOptions::new()
                .with_speed(to_u32("speed_hz", speed)?)
                .with_delay(
                    u16::try_from(delay)
                        .map_err(|_| format!("delay_usecs out of range: {}", delay))?,
                )
                .with_bits_per_word(
                    u8::try_from(bits)
                        .map_err(|_| format!("bits_per_word out of range: {}", bits))?,
                );
            transfer(&r, handle, kind, &data, opts)
        },
    );
}

fn register_settings<C>(module: &mut BuiltInModule, registry: &SharedRegistry<C>)
where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let r = Arc::clone(registry);
    module.register_fn("spi-mode", move |handle: isize| {
        with_device(&r, handle, |dev| Ok(dev.mode() as isize))
    });

    let r = Arc::clone(registry);
    module.register_fn(
        "spi-set-mode!",
        move |handle: isize, mode: isize| -> Result<SteelVal, String> {
            let mode = u8::try_from(mode).map_err(|_| {
                format!("The mode attribute must be an integer between 0 and 3 (got {})", mode)
            })?;
            with_device(&r, handle, |dev| dev.set_mode(mode)).map(|_| SteelVal::Void)
        },
    );

    let flags = [
        ("spi-cshigh?", "spi-set-cshigh!", SpiModeFlags::CS_HIGH),
        ("spi-threewire?", "spi-set-threewire!", SpiModeFlags::THREE_WIRE),
        ("spi-lsbfirst?", "spi-set-lsbfirst!", SpiModeFlags::LSB_FIRST),
        ("spi-loop?", "spi-set-loop!", SpiModeFlags::LOOP),
        ("spi-no-cs?", "spi-set-no-cs!", SpiModeFlags::NO_CS),
    ];
    for (getter, setter, flag) in flags {
        register_flag(module, registry, getter, setter, flag);
    }

    let r = Arc::clone(registry);
    module.register_fn("spi-bits-per-word", move |handle: isize| {
        with_device(&r, handle, |dev| Ok(dev.bits_per_word() as isize))
    });

    let r = Arc::clone(registry);
    module.register_fn(
        "spi-set-bits-per-word!",
        move |handle: isize, bits: isize| -> Result<SteelVal, String> {
            let bits = u8::try_from(bits)
                .map_err(|_| format!("invalid bits_per_word {} (8 to 32)", bits))?;
            with_device(&r, handle, |dev| dev.set_bits_per_word(bits)).map(|_| SteelVal::Void)
        },
    );

    let r = Arc::clone(registry);
    module.register_fn("spi-max-speed-hz", move |handle: isize| {
        with_device(&r, handle, |dev| Ok(dev.max_speed_hz() as isize))
    });

    let r = Arc::clone(registry);
    module.register_fn(
        "spi-set-max-speed-hz!",
        move |handle: isize, speed: isize| -> Result<SteelVal, String> {
            let speed = to_u32("max_speed_hz", speed)?;
            with_device(&r, handle, |dev| dev.set_max_speed_hz(speed)).map(|_| SteelVal::Void)
        },
    );

    let r = Arc::clone(registry);
    module.register_fn("spi-block-size", move |handle: isize| {
        with_device(&r, handle, |dev| Ok(dev.block_size() as isize))
    });
}

/// Register a getter and a boolean setter for one mode bit
fn register_flag<C>(
    module: &mut BuiltInModule,
    registry: &SharedRegistry<C>,
    getter: &'static str,
    setter: &'static str,
    flag: SpiModeFlags,
) where
    C: Connector + Send + 'static,
    C::Bus: Send + 'static,
{
    let r = Arc::clone(registry);
    module.register_fn(getter, move |handle: isize| {
        with_device(&r, handle, |dev| Ok(dev.mode_flags().contains(flag)))
    });

    let r = Arc::clone(registry);
    module.register_fn(setter, move |handle: isize, value: SteelVal| -> Result<SteelVal, String> {
        let on = match value {
            SteelVal::BoolV(on) => on,
            other => return Err(format!("{}: value must be boolean (got {})", setter, other)),
        };
        with_device(&r, handle, |dev| {
            let mut mode = dev.mode_flags();
            mode.set(flag, on);
            dev.set_mode_flags(mode)
        })
        .map(|_| SteelVal::Void)
    });
}

/// Register byte list helpers (independent of any device)
fn register_byte_utilities(module: &mut BuiltInModule) {
    module.register_fn("make-bytes", |len: isize, fill: isize| -> Result<SteelVal, String> {
        let len = usize::try_from(len).map_err(|_| format!("make-bytes: negative length {}", len))?;
        Ok(bytes_to_steel(&vec![fill as u8; len]))
    });

    module.register_fn("bytes-length", |data: SteelVal| -> Result<isize, String> {
        Ok(steel_to_bytes(&data)?.len() as isize)
    });

    module.register_fn("bytes->hex", |data: SteelVal| -> Result<String, String> {
        Ok(to_hex(&steel_to_bytes(&data)?))
    });

    module.register_fn("hex->bytes", |hex: String| -> Result<SteelVal, String> {
        parse_hex(&hex).map(|bytes| bytes_to_steel(&bytes))
    });
}

/// Create the constants module
pub fn create_constants_module() -> BuiltInModule {
    let mut module = BuiltInModule::new(CONSTS_MODULE);

    let flags = [
        ("SPI_CPHA", SpiModeFlags::CPHA),
        ("SPI_CPOL", SpiModeFlags::CPOL),
        ("SPI_CS_HIGH", SpiModeFlags::CS_HIGH),
        ("SPI_LSB_FIRST", SpiModeFlags::LSB_FIRST),
        ("SPI_3WIRE", SpiModeFlags::THREE_WIRE),
        ("SPI_LOOP", SpiModeFlags::LOOP),
        ("SPI_NO_CS", SpiModeFlags::NO_CS),
        ("SPI_READY", SpiModeFlags::READY),
        ("SPI_MODE_0", SpiModeFlags::MODE_0),
        ("SPI_MODE_1", SpiModeFlags::MODE_1),
        ("SPI_MODE_2", SpiModeFlags::MODE_2),
        ("SPI_MODE_3", SpiModeFlags::MODE_3),
    ];
    for (name, flag) in flags {
        module.register_value(name, SteelVal::IntV(flag.bits() as isize));
    }

    module.register_value("SPI_MAX_TRANSFER", SteelVal::IntV(MAX_TRANSFER_LEN as isize));
    module.register_value("SPIDEV_VERSION", SteelVal::StringV(rspidev_core::VERSION.into()));

    module
}

fn to_u32(what: &str, value: isize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{} out of range: {}", what, value))
}

/// Convert bytes to a Scheme list of integers
pub fn bytes_to_steel(bytes: &[u8]) -> SteelVal {
    SteelVal::ListV(bytes.iter().map(|&b| SteelVal::IntV(b as isize)).collect())
}

/// Convert a Scheme list of integers or a bytevector to bytes
///
/// Each list integer keeps only its low 8 bits.
pub fn steel_to_bytes(val: &SteelVal) -> Result<Vec<u8>, String> {
    match val {
        SteelVal::ListV(items) => items
            .iter()
            .map(|v| match v {
                SteelVal::IntV(i) => Ok(*i as u8),
                other => Err(format!("Non-Int/Long value in arguments: {}", other)),
            })
            .collect(),
        SteelVal::ByteVector(bytes) => {
            let list = bytevectors::bytes_to_list(bytes).map_err(|e| e.to_string())?;
            steel_to_bytes(&list)
        }
        other => Err(format!(
            "expected a list of integers or a bytevector, got {}",
            other
        )),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex such as "9f 00", "0x9f,0x00" or "9f00"
pub fn parse_hex(hex: &str) -> Result<Vec<u8>, String> {
    let digits: String = hex
        .replace("0x", "")
        .replace("0X", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != ':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex: {}", hex))
        })
        .collect()
}

fn print_help() {
    println!(
        r#"
spidev functions (handles come from spi-open):

  (spi-open bus device)            open /dev/spidev<bus>.<device>, returns a handle
  (spi-open! h bus device)         reopen handle h on another device
  (spi-close h)                    close the device; h stays valid but closed
  (spi-fileno h)                   file descriptor, -1 when closed
  (spi-open? h)                    whether h has an open device

  (spi-read h len)                 read len bytes (1-4096)
  (spi-write h bytes)              write up to 4096 bytes
  (spi-write2 h bytes)             write any length in block-size chunks
  (spi-xfer h bytes)               per-byte transfer, CS released between bytes
  (spi-xfer2 h bytes)              single transfer, CS held
  (spi-xfer3 h bytes)              any length in block-size chunks
  (spi-xfer* h bytes speed delay bits)   and spi-xfer2*, spi-xfer3*

  (spi-mode h)  (spi-set-mode! h 0-3)
  (spi-cshigh? h)    (spi-set-cshigh! h #t)
  (spi-threewire? h) (spi-set-threewire! h #t)
  (spi-lsbfirst? h)  (spi-set-lsbfirst! h #t)
  (spi-loop? h)      (spi-set-loop! h #t)
  (spi-no-cs? h)     (spi-set-no-cs! h #t)
  (spi-bits-per-word h)  (spi-set-bits-per-word! h 8-32)
  (spi-max-speed-hz h)   (spi-set-max-speed-hz! h hz)
  (spi-block-size h)

  (make-bytes len fill)  (bytes-length lst)  (bytes->hex lst)  (hex->bytes "9f 00")

Constants: SPI_CPHA SPI_CPOL SPI_CS_HIGH SPI_LSB_FIRST SPI_3WIRE SPI_LOOP
           SPI_NO_CS SPI_READY SPI_MODE_0..3 SPI_MAX_TRANSFER SPIDEV_VERSION
"#
    );
}
