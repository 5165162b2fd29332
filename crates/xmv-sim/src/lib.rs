use anyhow::{bail, Result};
use log::{info, warn};
use rand::Rng;

use xmv_core::{DeviceStatus, Region, PACKET_SIZE};
use xmv_hal::{Indicator, Platform, StorageClient};

// Device status codes. Opaque to the sequencer, non-zero means failure.
pub const ST_NOT_ALIGNED: u32 = 0x01;
pub const ST_OUT_OF_BOUNDS: u32 = 0x02;
pub const ST_NOT_MAPPED: u32 = 0x03;
pub const ST_NO_SYMBOL: u32 = 0x04;

/// In-memory NOR flash behind the StorageClient contract.
///
/// Erase fills a whole aligned unit with 0xFF; programming can only clear
/// bits (AND semantics); mapped reads and calls are refused until mapped
/// mode has been switched on. Fault injection covers the failure paths the
/// rig needs to demonstrate.
pub struct SimFlash {
    region: Region,
    erase_unit: u32,
    mem: Vec<u8>,
    mapped: bool,
    fail_erase: Option<u32>,
    fail_mode: Option<u32>,
    stuck_at_zero: Option<u32>,
    code_symbols: Vec<(u32, Box<dyn FnMut() + Send>)>,
}

impl SimFlash {
    pub fn new(base: u32, size: u32, erase_unit: u32) -> Result<Self> {
        if size == 0 || erase_unit == 0 {
            bail!("degenerate geometry: size {} erase unit {}", size, erase_unit);
        }
        if size % erase_unit != 0 {
            bail!("size {:#X} is not a multiple of the erase unit {:#X}", size, erase_unit);
        }
        if size / erase_unit < 2 {
            bail!("need at least two erase units; the first one is never touched");
        }
        if (erase_unit as usize) < PACKET_SIZE {
            bail!("erase unit {:#X} smaller than the packet size", erase_unit);
        }
        Ok(Self {
            region: Region::new(base, size),
            erase_unit,
            // Fresh device: all cells erased.
            mem: vec![0xFF; size as usize],
            mapped: false,
            fail_erase: None,
            fail_mode: None,
            stuck_at_zero: None,
            code_symbols: Vec::new(),
        })
    }

    /// Program a data symbol into the image, the way the flash programmer
    /// places linker sections before the system ever boots.
    pub fn place_data(&mut self, offset: u32, bytes: &[u8]) -> Result<u32> {
        let end = offset as usize + bytes.len();
        if end > self.mem.len() {
            bail!("symbol at {:#X}..{:#X} falls outside the device", offset, end);
        }
        self.mem[offset as usize..end].copy_from_slice(bytes);
        Ok(self.region.base + offset)
    }

    /// Register an executable symbol at an offset. Invoking the returned
    /// address in mapped mode runs the closure.
    pub fn place_code(&mut self, offset: u32, f: impl FnMut() + Send + 'static) -> Result<u32> {
        if offset >= self.region.size {
            bail!("code symbol offset {:#X} falls outside the device", offset);
        }
        let addr = self.region.base + offset;
        self.code_symbols.push((addr, Box::new(f)));
        Ok(addr)
    }

    pub fn inject_erase_failure(&mut self, code: u32) {
        self.fail_erase = Some(code);
    }

    pub fn inject_mode_failure(&mut self, code: u32) {
        self.fail_mode = Some(code);
    }

    /// Pin one cell of the write/verify window to 0x00, as a shorted NOR
    /// cell would read. `None` picks the byte at random.
    pub fn inject_stuck_byte(&mut self, index: Option<usize>) {
        let idx = index.unwrap_or_else(|| rand::thread_rng().gen_range(0..PACKET_SIZE));
        self.stuck_at_zero = Some(self.erase_unit + idx as u32);
    }

    fn in_bounds(&self, offset: u32, len: usize) -> bool {
        (offset as usize)
            .checked_add(len)
            .map(|end| end <= self.mem.len())
            .unwrap_or(false)
    }

    fn apply_stuck(&self, offset: u32, buf: &mut [u8]) {
        if let Some(stuck) = self.stuck_at_zero {
            if stuck >= offset && ((stuck - offset) as usize) < buf.len() {
                buf[(stuck - offset) as usize] = 0x00;
            }
        }
    }
}

impl StorageClient for SimFlash {
    fn region(&self) -> Region {
        self.region
    }

    fn erase_unit_size(&self, _offset: u32) -> u32 {
        self.erase_unit
    }

    fn erase(&mut self, offset: u32, len: u32) -> DeviceStatus {
        if let Some(code) = self.fail_erase {
            return DeviceStatus::Failure(code);
        }
        if offset % self.erase_unit != 0 || len % self.erase_unit != 0 {
            return DeviceStatus::Failure(ST_NOT_ALIGNED);
        }
        if !self.in_bounds(offset, len as usize) {
            return DeviceStatus::Failure(ST_OUT_OF_BOUNDS);
        }
        for b in &mut self.mem[offset as usize..(offset + len) as usize] {
            *b = 0xFF;
        }
        DeviceStatus::Success
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> DeviceStatus {
        if !self.in_bounds(offset, data.len()) {
            return DeviceStatus::Failure(ST_OUT_OF_BOUNDS);
        }
        // NOR programming clears bits, it never sets them.
        for (cell, b) in self.mem[offset as usize..offset as usize + data.len()]
            .iter_mut()
            .zip(data)
        {
            *cell &= *b;
        }
        DeviceStatus::Success
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> DeviceStatus {
        if !self.in_bounds(offset, buf.len()) {
            return DeviceStatus::Failure(ST_OUT_OF_BOUNDS);
        }
        buf.copy_from_slice(&self.mem[offset as usize..offset as usize + buf.len()]);
        self.apply_stuck(offset, buf);
        DeviceStatus::Success
    }

    fn enable_mapped_mode(&mut self, enable: bool) -> DeviceStatus {
        if let Some(code) = self.fail_mode {
            return DeviceStatus::Failure(code);
        }
        self.mapped = enable;
        DeviceStatus::Success
    }

    fn read_mapped(&mut self, addr: u32, buf: &mut [u8]) -> DeviceStatus {
        if !self.mapped {
            return DeviceStatus::Failure(ST_NOT_MAPPED);
        }
        if !self.region.contains(addr) {
            return DeviceStatus::Failure(ST_OUT_OF_BOUNDS);
        }
        let offset = (addr - self.region.base) as usize;
        let avail = (self.mem.len() - offset).min(buf.len());
        buf[..avail].copy_from_slice(&self.mem[offset..offset + avail]);
        buf[avail..].fill(0);
        self.apply_stuck(addr - self.region.base, &mut buf[..avail]);
        DeviceStatus::Success
    }

    fn invoke_mapped(&mut self, addr: u32) -> DeviceStatus {
        if !self.mapped {
            return DeviceStatus::Failure(ST_NOT_MAPPED);
        }
        match self.code_symbols.iter_mut().find(|(a, _)| *a == addr) {
            Some((_, f)) => {
                f();
                DeviceStatus::Success
            }
            None => DeviceStatus::Failure(ST_NO_SYMBOL),
        }
    }
}

/// Console stand-in for the board LED.
pub struct HostIndicator {
    lit: bool,
}

impl HostIndicator {
    pub fn new() -> Self {
        Self { lit: false }
    }
}

impl Default for HostIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for HostIndicator {
    fn set_error(&mut self) {
        self.lit = true;
        warn!(">>> [LED] ERROR (held)");
    }

    fn toggle_alive(&mut self) {
        self.lit = !self.lit;
        info!(">>> [LED] {}", if self.lit { "on" } else { "off" });
    }
}

pub struct HostPlatform;

impl Platform for HostPlatform {
    fn halt(&self) -> ! {
        // Diagnostic and indicator are already out; stop for good.
        std::process::exit(1);
    }

    fn delay_ms(&self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }
}
