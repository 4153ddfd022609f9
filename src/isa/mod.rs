//! RV32I instruction set: opcode tables, the pure decoder, ABI register
//! names, and the disassembler. Shared, unmodified, by both the pipeline
//! and the single-cycle model.

pub mod abi;
pub mod decode;
pub mod disasm;
pub mod opcodes;

pub use decode::{decode, CsrOp, Decoded, MemOp, WbSel};
pub use disasm::disassemble;
