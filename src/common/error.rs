//! Typed error hierarchy for the simulator core.
//!
//! `anyhow` stays at the binary/test boundary; this is the precise,
//! matchable enum at the library boundary — the shape mirrors how
//! `willmccallion-rvsim`'s `common::error::Trap` gives every failure
//! mode its own variant instead of a string bag.

use thiserror::Error;

/// What went wrong during a `step`, a memory access, or binary loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    /// The combinational settle pass did not reach a fixed point within
    /// the iteration bound. Indicates a wiring bug (a feedback path that
    /// does not pass through a `Reg`).
    #[error("combinational settle did not converge (possible wiring loop)")]
    CombinationalLoop,

    /// Decode failed: no (opcode, funct3, funct7) entry matches.
    #[error("illegal instruction 0x{0:08x}")]
    IllegalInstruction(u32),

    /// An instruction fetch or data access targeted an address that does
    /// not satisfy its natural alignment.
    #[error("misaligned {kind} access at 0x{addr:08x}")]
    MisalignedAccess { kind: AccessKind, addr: u32 },

    /// An access fell outside the configured memory size. Not an
    /// architectural exception since no MMU is modeled; surfaced
    /// directly to the caller.
    #[error("out-of-bounds memory access at 0x{addr:08x} (len {len})")]
    OutOfBoundsMemory { addr: u32, len: usize },

    /// `load_binary`/`load_instructions` was given something that cannot
    /// be loaded as-is (missing file, or larger than memory).
    #[error("invalid binary image: {0}")]
    InvalidBinary(String),

    /// Access to a CSR number that the CSR file does not implement.
    #[error("unimplemented CSR 0x{0:03x}")]
    CsrFault(u16),
}

/// Which kind of access a [`SimError::MisalignedAccess`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Instruction,
    Load,
    Store,
}

impl std::fmt::Display for AccessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccessKind::Instruction => "instruction",
            AccessKind::Load => "load",
            AccessKind::Store => "store",
        };
        f.write_str(s)
    }
}

/// Shorthand used throughout the core.
pub type SimResult<T> = Result<T, SimError>;
