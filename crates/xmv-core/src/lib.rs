#![no_std]
#![forbid(unsafe_code)]
#[cfg(feature = "std")]
extern crate std;

/// Write/verify exercise size. Much smaller than any erase unit.
pub const PACKET_SIZE: usize = 64;

/// Window of the address space at which the storage device is visible
/// once mapped mode is active. Obtained once at startup, immutable after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub base: u32,
    pub size: u32,
}

impl Region {
    pub fn new(base: u32, size: u32) -> Self {
        Self { base, size }
    }

    /// Address validator. True iff `base <= addr < base + size`.
    /// Upper bound is exclusive.
    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && (addr - self.base) < self.size
    }

    pub fn end(&self) -> u32 {
        self.base + self.size
    }
}

/// Fixed-length transfer buffer. Allocated before the sequence starts,
/// populated once, never resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub data: [u8; PACKET_SIZE],
}

impl Default for Packet {
    fn default() -> Self {
        Self { data: [0u8; PACKET_SIZE] }
    }
}

impl Packet {
    /// Deterministic payload: byte at index i == i mod 256.
    /// Fixed so the verify step is exact and repeatable across runs.
    pub fn fill_pattern(&mut self) {
        fill_pattern(&mut self.data);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

pub fn fill_pattern(buf: &mut [u8]) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b = i as u8;
    }
}

/// Outcome of a single StorageClient call. Consumed immediately by the
/// caller; the code is an opaque collaborator value, non-zero on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Success,
    Failure(u32),
}

impl DeviceStatus {
    pub fn from_code(code: u32) -> Self {
        if code == 0 {
            DeviceStatus::Success
        } else {
            DeviceStatus::Failure(code)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeviceStatus::Success)
    }

    pub fn code(&self) -> u32 {
        match self {
            DeviceStatus::Success => 0,
            DeviceStatus::Failure(c) => *c,
        }
    }
}

pub type XmvResult<T> = Result<T, XmvError>;

/// Fault taxonomy. Every variant is terminal: no retry, no local recovery,
/// all of them route to FailSafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmvError {
    EraseFailed(u32),
    ReadFailed(u32),
    WriteFailed(u32),
    DataMismatch,
    ModeTransitionFailed(u32),
    ReferenceOutOfRange(u32),
}

impl XmvError {
    pub fn label(&self) -> &'static str {
        match self {
            XmvError::EraseFailed(_) => "erase failed",
            XmvError::ReadFailed(_) => "read failed",
            XmvError::WriteFailed(_) => "write failed",
            XmvError::DataMismatch => "data mismatch",
            XmvError::ModeTransitionFailed(_) => "mapped mode entry failed",
            XmvError::ReferenceOutOfRange(_) => "reference not found in mapped region",
        }
    }

    /// Collaborator status code, or the offending address for a
    /// reference fault. Zero when the fault carries no code (mismatch).
    pub fn code(&self) -> u32 {
        match self {
            XmvError::EraseFailed(c)
            | XmvError::ReadFailed(c)
            | XmvError::WriteFailed(c)
            | XmvError::ModeTransitionFailed(c)
            | XmvError::ReferenceOutOfRange(c) => *c,
            XmvError::DataMismatch => 0,
        }
    }
}

impl core::fmt::Display for XmvError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for XmvError {}
