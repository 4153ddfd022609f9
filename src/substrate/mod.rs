//! The datapath modeling substrate: typed signal endpoints (`Port`,
//! `Wire`), the `Module` unit of combinational logic, the edge-triggered
//! `Reg`, and the kernel's fixed-point settle loop. Everything in the
//! five-stage pipeline and the single-cycle model is built from these
//! four pieces.

pub mod kernel;
pub mod module;
pub mod port;
pub mod reg;

pub use kernel::settle;
pub use module::Module;
pub use port::{Port, Wire};
pub use reg::Reg;
