#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;
use alloc::boxed::Box;

use log::info;

use xmv_core::{DeviceStatus, Packet, Region, XmvError};
use xmv_hal::StorageClient;

mod failsafe;
mod hexdump;

pub use failsafe::FailSafe;
use hexdump::log_hex;

/// Default toggle period of the alive indicator.
pub const ALIVE_PERIOD_MS: u32 = 1000;

/// Protocol progress. Failed is absorbing: it is recorded immediately
/// before FailSafe trips and nothing runs afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqState {
    Init,
    Erased,
    WrittenUnverified,
    Verified,
    Mapped,
    ReferencesValidated,
    Steady,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Data,
    Code,
}

/// An address expected to resolve inside the mapped window once mapped
/// mode is active. Where the symbol actually lands is a linker/loader
/// concern; only the address is checked here, not the content.
#[derive(Debug, Clone, Copy)]
pub struct ExternalRef {
    pub label: &'static str,
    pub addr: u32,
    pub kind: RefKind,
}

/// One-shot storage validation and mode-transition sequencer.
/// No loop, no re-entry: `run` executes the protocol exactly once, then
/// the caller hands control to `steady`.
pub struct MemorySequencer {
    storage: Box<dyn StorageClient>,
    failsafe: FailSafe,
    state: SeqState,
    region: Region,
    mapped: bool,
    tx: Packet,
    rx: Packet,
    alive_period_ms: u32,
}

impl MemorySequencer {
    pub fn new(storage: Box<dyn StorageClient>, failsafe: FailSafe) -> Self {
        let region = storage.region();
        Self {
            storage,
            failsafe,
            state: SeqState::Init,
            region,
            mapped: false,
            tx: Packet::default(),
            rx: Packet::default(),
            alive_period_ms: ALIVE_PERIOD_MS,
        }
    }

    pub fn with_alive_period(mut self, ms: u32) -> Self {
        self.alive_period_ms = ms;
        self
    }

    pub fn state(&self) -> SeqState {
        self.state
    }

    /// Mapped-mode flag. False until the transition succeeds, true for the
    /// remainder of execution, never reverts.
    pub fn mapped(&self) -> bool {
        self.mapped
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Erase, write, read back, compare, enter mapped mode, then validate
    /// and dereference every external reference. Any non-Success outcome
    /// anywhere trips FailSafe and never comes back.
    pub fn run(&mut self, refs: &[ExternalRef]) {
        let region = self.region;
        let erase_unit = self.storage.erase_unit_size(0);
        // Target sits one erase unit past the window start so the exercise
        // never touches data placed at the region base.
        let target = erase_unit;

        info!(
            "1. region: {} bytes mapped at 0x{:08X}, erase unit {} bytes",
            region.size, region.base, erase_unit
        );

        // Erase before write.
        info!("2. erasing {} bytes at offset 0x{:08X}", erase_unit, target);
        let st = self.storage.erase(target, erase_unit);
        self.check(st, XmvError::EraseFailed);
        self.state = SeqState::Erased;

        // Diagnostic read after erase. The erased-cell value is device
        // dependent, so the content is logged, not asserted; only the read
        // itself has to succeed.
        let mut scratch = Packet::default();
        let st = self.storage.read(target, &mut scratch.data);
        self.check(st, XmvError::ReadFailed);
        log_hex("read after erase", scratch.as_slice());

        // Deterministic payload, then program it.
        self.tx.fill_pattern();
        info!("3. writing {} bytes at offset 0x{:08X}", self.tx.data.len(), target);
        let st = self.storage.write(target, self.tx.as_slice());
        self.check(st, XmvError::WriteFailed);
        self.state = SeqState::WrittenUnverified;
        log_hex("written data", self.tx.as_slice());

        // Read back for verification.
        info!("4. reading back for verification");
        let st = self.storage.read(target, &mut self.rx.data);
        self.check(st, XmvError::ReadFailed);
        log_hex("received data", self.rx.as_slice());

        // Full-buffer equality, not a sampled or prefix check. Any
        // mismatch anywhere is one aggregate fault.
        if self.rx.data != self.tx.data {
            self.fail(XmvError::DataMismatch);
        }
        self.state = SeqState::Verified;
        info!("SUCCESS: read data matches written data");

        // Mode transition. The flag flips only after the call reports
        // Success, and never flips back.
        info!("5. entering mapped mode");
        let st = self.storage.enable_mapped_mode(true);
        self.check(st, XmvError::ModeTransitionFailed);
        self.mapped = true;
        self.state = SeqState::Mapped;

        // Guard against linker/placement misconfiguration: every reference
        // must resolve inside the window before it is dereferenced.
        for r in refs {
            if !region.contains(r.addr) {
                self.fail(XmvError::ReferenceOutOfRange(r.addr));
            }
            match r.kind {
                RefKind::Data => self.deref_data(r),
                RefKind::Code => self.invoke_code(r),
            }
        }
        self.state = SeqState::ReferencesValidated;
        info!("SUCCESS: data accessed in mapped mode");
    }

    fn deref_data(&mut self, r: &ExternalRef) {
        let mut buf = Packet::default();
        let st = self.storage.read_mapped(r.addr, &mut buf.data);
        self.check(st, XmvError::ReadFailed);

        info!("{} at 0x{:08X}:", r.label, r.addr);
        let len = buf.data.iter().position(|&b| b == 0).unwrap_or(buf.data.len());
        match core::str::from_utf8(&buf.data[..len]) {
            Ok(text) => info!("  {}", text),
            Err(_) => log_hex(r.label, &buf.data[..len]),
        }
    }

    fn invoke_code(&mut self, r: &ExternalRef) {
        info!("calling {} at 0x{:08X}", r.label, r.addr);
        let st = self.storage.invoke_mapped(r.addr);
        self.check(st, XmvError::ReadFailed);
    }

    /// One beat of the steady-state signaling loop: toggle, then wait out
    /// the period.
    pub fn alive_tick(&mut self) {
        self.state = SeqState::Steady;
        self.failsafe.alive_tick(self.alive_period_ms);
    }

    /// Steady state. Performs no further validation and never exits.
    pub fn steady(mut self) -> ! {
        loop {
            self.alive_tick();
        }
    }

    fn check(&mut self, st: DeviceStatus, fault: fn(u32) -> XmvError) {
        if let DeviceStatus::Failure(code) = st {
            self.fail(fault(code));
        }
    }

    fn fail(&mut self, fault: XmvError) -> ! {
        self.state = SeqState::Failed;
        self.failsafe.trip(fault)
    }
}
