//! Hazard detection and control: load-use and general RAW stalling
//! (no forwarding), plus flush-on-redirect. The exact shape of the
//! checks here — the load-use check first, then a mutually exclusive
//! `else` between the ID/EX-stage and EX/MEM-stage general hazard, and
//! the `(inst & 0x3) == 0x3` validity gate on the instruction in IF/ID —
//! follows the original hazard unit this design was distilled from.

use crate::common::bits;
use crate::core::latches::{ExMem, IdEx, IfId};
use crate::isa::opcodes::{needs_rs1, needs_rs2, MemOp};
use crate::substrate::{Module, Port};

pub struct HazardUnit {
    pub ifid: Port<IfId>,
    pub idex: Port<IdEx>,
    pub exmem: Port<ExMem>,
    pub take_branch: Port<bool>,
    pub raise_exception: Port<bool>,
    pub trap_return: Port<bool>,

    pub stall_pc: Port<bool>,
    pub stall_ifid: Port<bool>,
    pub flush_ifid: Port<bool>,
    pub flush_idex: Port<bool>,
    pub flush_exmem: Port<bool>,
}

impl HazardUnit {
    pub fn new() -> Self {
        HazardUnit {
            ifid: Port::new(IfId::bubble()),
            idex: Port::new(IdEx::bubble()),
            exmem: Port::new(ExMem::bubble()),
            take_branch: Port::new(false),
            raise_exception: Port::new(false),
            trap_return: Port::new(false),
            stall_pc: Port::new(false),
            stall_ifid: Port::new(false),
            flush_ifid: Port::new(false),
            flush_idex: Port::new(false),
            flush_exmem: Port::new(false),
        }
    }
}

impl Default for HazardUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for HazardUnit {
    fn process(&mut self) -> bool {
        let ifid = self.ifid.read();
        let idex = self.idex.read();
        let exmem = self.exmem.read();

        let (opcode, rs1_idx, rs2_idx) = if (ifid.inst & 0x3) == 0x3 {
            (bits::opcode(ifid.inst), bits::rs1(ifid.inst), bits::rs2(ifid.inst))
        } else {
            (0, 0, 0)
        };

        let reads_rs1 = needs_rs1(opcode);
        let reads_rs2 = needs_rs2(opcode);

        let mut stall = false;

        if idex.mem == MemOp::Load && idex.rd != 0 {
            if (reads_rs1 && rs1_idx == idex.rd) || (reads_rs2 && rs2_idx == idex.rd) {
                stall = true;
            }
        } else if idex.we && idex.rd != 0 {
            if (reads_rs1 && rs1_idx == idex.rd) || (reads_rs2 && rs2_idx == idex.rd) {
                stall = true;
            }
        } else if exmem.we && exmem.rd != 0 && ((reads_rs1 && rs1_idx == exmem.rd) || (reads_rs2 && rs2_idx == exmem.rd)) {
            stall = true;
        }

        let redirect = self.take_branch.read() || self.raise_exception.read() || self.trap_return.read();

        if stall || redirect {
            tracing::debug!(stall, redirect, "hazard unit asserted");
        }

        let mut changed = false;
        changed |= self.stall_pc.write(stall);
        changed |= self.stall_ifid.write(stall);
        changed |= self.flush_idex.write(stall || redirect);
        changed |= self.flush_ifid.write(redirect);
        changed |= self.flush_exmem.write(false);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::opcodes::OPCODE_OP;

    fn r_type(rs1: u32, rs2: u32, rd: u32, opcode: u32) -> u32 {
        (rs2 << 20) | (rs1 << 15) | (0 << 12) | (rd << 7) | opcode
    }

    #[test]
    fn load_use_hazard_stalls_pc_and_ifid_flushes_idex() {
        let mut hz = HazardUnit::new();
        let mut idex = IdEx::bubble();
        idex.mem = MemOp::Load;
        idex.rd = 5;
        hz.idex.write(idex);
        let inst = r_type(5, 0, 6, OPCODE_OP); // add x6, x5, x0 reads rs1=x5
        hz.ifid.write(IfId { inst, pc: 0 });
        hz.process();
        assert!(hz.stall_pc.read());
        assert!(hz.stall_ifid.read());
        assert!(hz.flush_idex.read());
        assert!(!hz.flush_ifid.read());
    }

    #[test]
    fn general_hazard_against_exmem_when_idex_does_not_conflict() {
        let mut hz = HazardUnit::new();
        let mut exmem = ExMem::bubble();
        exmem.we = true;
        exmem.rd = 7;
        hz.exmem.write(exmem);
        let inst = r_type(7, 0, 8, OPCODE_OP);
        hz.ifid.write(IfId { inst, pc: 0 });
        hz.process();
        assert!(hz.stall_pc.read());
    }

    #[test]
    fn branch_taken_flushes_ifid_and_idex_without_stalling() {
        let mut hz = HazardUnit::new();
        hz.take_branch.write(true);
        hz.process();
        assert!(hz.flush_ifid.read());
        assert!(hz.flush_idex.read());
        assert!(!hz.stall_pc.read());
        assert!(!hz.flush_exmem.read());
    }

    #[test]
    fn no_hazard_when_rd_is_x0() {
        let mut hz = HazardUnit::new();
        let mut idex = IdEx::bubble();
        idex.mem = MemOp::Load;
        idex.rd = 0;
        hz.idex.write(idex);
        let inst = r_type(0, 0, 6, OPCODE_OP);
        hz.ifid.write(IfId { inst, pc: 0 });
        hz.process();
        assert!(!hz.stall_pc.read());
    }
}
