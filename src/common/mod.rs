//! Bit utilities and the error hierarchy. No state lives here; everything
//! is either a free function or a plain enum.

pub mod bits;
pub mod error;

pub use error::{AccessKind, SimError, SimResult};
