#![no_std]
#![forbid(unsafe_code)]

use xmv_core::{DeviceStatus, Region};

/// The storage device, command-addressed until `enable_mapped_mode`
/// succeeds, memory-mapped after.
///
/// INVARIANT: every call blocks to completion and returns a deterministic
/// status. Bus-level timeouts are the implementor's problem.
pub trait StorageClient: Send {
    /// Mapped window of the device: lowest visible address plus byte size.
    fn region(&self) -> Region;

    /// Smallest unit erasable in one operation at `offset`.
    fn erase_unit_size(&self, offset: u32) -> u32;

    fn erase(&mut self, offset: u32, len: u32) -> DeviceStatus;

    fn write(&mut self, offset: u32, data: &[u8]) -> DeviceStatus;

    /// Fills `buf` completely on Success. Contents are undefined on Failure.
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> DeviceStatus;

    /// Transition between command-addressed and memory-mapped operation.
    fn enable_mapped_mode(&mut self, enable: bool) -> DeviceStatus;

    /// Dereference an absolute address inside the mapped window.
    /// Must fail while mapped mode is inactive.
    fn read_mapped(&mut self, addr: u32, buf: &mut [u8]) -> DeviceStatus;

    /// Execute code at an absolute address inside the mapped window.
    /// Must fail while mapped mode is inactive.
    fn invoke_mapped(&mut self, addr: u32) -> DeviceStatus;
}

/// Single binary visible signal. Two states only: "alive" (toggling
/// periodically) and "error" (held constant, never released).
pub trait Indicator: Send {
    fn set_error(&mut self);
    fn toggle_alive(&mut self);
}

/// Host services the sequencer cannot provide for itself.
pub trait Platform: Send {
    /// Cease all forward progress. No sequencer code runs after this.
    fn halt(&self) -> !;

    fn delay_ms(&self, ms: u32);
}
