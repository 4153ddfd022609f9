//! Byte-addressable main memory: one instruction-fetch read port, one
//! data read port, one data write port, little-endian. The pipeline's
//! fetch/MEM stages pre-check alignment themselves and turn a
//! misaligned access into an architectural exception before ever
//! reaching here, so these ports never see a misaligned address from
//! inside the pipeline; the alignment check below exists for callers
//! outside that path (a host poking memory directly), which get a
//! precise [`SimError::MisalignedAccess`] instead of a silently
//! misinterpreted read. Range-checking against the configured size is a
//! simulator-level error either way, not something the guest program can
//! recover from.

use crate::common::{AccessKind, SimError, SimResult};
use crate::core::stages::mem::width;
use crate::isa::opcodes::{FUNCT3_LB, FUNCT3_LBU, FUNCT3_LH, FUNCT3_LHU, FUNCT3_LW, FUNCT3_SB, FUNCT3_SH, FUNCT3_SW};

pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new(size: usize) -> Self {
        Memory { data: vec![0; size] }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn reset(&mut self) {
        self.data.iter_mut().for_each(|b| *b = 0);
    }

    /// Loads `bytes` starting at address 0, as `load_binary`/
    /// `load_instructions` do.
    pub fn load_image(&mut self, bytes: &[u8]) -> SimResult<()> {
        if bytes.len() > self.data.len() {
            return Err(SimError::InvalidBinary(format!(
                "image is {} bytes, memory is only {} bytes",
                bytes.len(),
                self.data.len()
            )));
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn check_bounds(&self, addr: u32, len: usize) -> SimResult<()> {
        let end = addr as usize + len;
        if end > self.data.len() {
            return Err(SimError::OutOfBoundsMemory { addr, len });
        }
        Ok(())
    }

    pub fn read_bytes(&self, addr: u32, len: usize) -> SimResult<&[u8]> {
        self.check_bounds(addr, len)?;
        Ok(&self.data[addr as usize..addr as usize + len])
    }

    /// Instruction-fetch read port: little-endian 4-byte word.
    pub fn read_inst(&self, addr: u32) -> SimResult<u32> {
        if addr % 4 != 0 {
            return Err(SimError::MisalignedAccess { kind: AccessKind::Instruction, addr });
        }
        let bytes = self.read_bytes(addr, 4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Data read port. Width and signedness come from the load's
    /// `funct3`; the MEM stage has already validated it is one of the
    /// five recognized load widths and that `addr` is aligned to it.
    pub fn read_data(&self, addr: u32, funct3: u32) -> SimResult<u32> {
        if addr % width(funct3) != 0 {
            return Err(SimError::MisalignedAccess { kind: AccessKind::Load, addr });
        }
        let value = match funct3 {
            FUNCT3_LB => self.read_bytes(addr, 1)?[0] as i8 as i32 as u32,
            FUNCT3_LBU => self.read_bytes(addr, 1)?[0] as u32,
            FUNCT3_LH => {
                let b = self.read_bytes(addr, 2)?;
                i16::from_le_bytes([b[0], b[1]]) as i32 as u32
            }
            FUNCT3_LHU => {
                let b = self.read_bytes(addr, 2)?;
                u16::from_le_bytes([b[0], b[1]]) as u32
            }
            FUNCT3_LW => self.read_inst(addr)?,
            _ => unreachable!("MEM stage only issues recognized load widths"),
        };
        Ok(value)
    }

    /// Data write port.
    pub fn write_data(&mut self, addr: u32, funct3: u32, value: u32) -> SimResult<()> {
        if addr % width(funct3) != 0 {
            return Err(SimError::MisalignedAccess { kind: AccessKind::Store, addr });
        }
        match funct3 {
            FUNCT3_SB => {
                self.check_bounds(addr, 1)?;
                self.data[addr as usize] = value as u8;
            }
            FUNCT3_SH => {
                self.check_bounds(addr, 2)?;
                let a = addr as usize;
                self.data[a..a + 2].copy_from_slice(&(value as u16).to_le_bytes());
            }
            FUNCT3_SW => {
                self.check_bounds(addr, 4)?;
                let a = addr as usize;
                self.data[a..a + 4].copy_from_slice(&value.to_le_bytes());
            }
            _ => unreachable!("MEM stage only issues recognized store widths"),
        }
        Ok(())
    }
}
