//! MEM stage: data memory access for loads and stores.

use std::cell::RefCell;
use std::rc::Rc;

use crate::common::SimError;
use crate::core::exception::MemFaultKind;
use crate::core::latches::{ExMem, MemWb};
use crate::core::memory::Memory;
use crate::isa::opcodes::MemOp;
use crate::substrate::{Module, Port};

/// Shared with [`crate::core::single_cycle`], which reuses this exact
/// table instead of redefining it.
pub(crate) fn width(funct3: u32) -> u32 {
    use crate::isa::opcodes::*;
    match funct3 {
        FUNCT3_SB | FUNCT3_LB | FUNCT3_LBU => 1,
        FUNCT3_SH | FUNCT3_LH | FUNCT3_LHU => 2,
        _ => 4,
    }
}

pub struct MemStage {
    pub exmem: Port<ExMem>,
    pub out: Port<MemWb>,
    pub fault: Port<MemFaultKind>,
    pub fault_pc: Port<i32>,

    memory: Rc<RefCell<Memory>>,
    error: RefCell<Option<SimError>>,
}

impl MemStage {
    pub fn new(memory: Rc<RefCell<Memory>>) -> Self {
        MemStage {
            exmem: Port::new(ExMem::bubble()),
            out: Port::new(MemWb::bubble()),
            fault: Port::new(MemFaultKind::None),
            fault_pc: Port::new(0),
            memory,
            error: RefCell::new(None),
        }
    }

    pub fn take_error(&self) -> Option<SimError> {
        self.error.borrow_mut().take()
    }
}

impl Module for MemStage {
    fn process(&mut self) -> bool {
        let exmem = self.exmem.read();
        let addr = exmem.alu_res;
        let misaligned = addr % width(exmem.funct3) != 0;
        let mem_fault_pc = (exmem.pc4 as i32) - 4;

        let mut mem_rdata = 0u32;
        let mut fault = MemFaultKind::None;

        match exmem.mem {
            MemOp::Load if misaligned => fault = MemFaultKind::Load,
            MemOp::Store if misaligned => fault = MemFaultKind::Store,
            MemOp::Load => match self.memory.borrow().read_data(addr, exmem.funct3) {
                Ok(v) => mem_rdata = v,
                Err(e) => *self.error.borrow_mut() = Some(e),
            },
            MemOp::Store => {
                if let Err(e) = self.memory.borrow_mut().write_data(addr, exmem.funct3, exmem.rs2) {
                    *self.error.borrow_mut() = Some(e);
                }
            }
            MemOp::None => {}
        }

        tracing::trace!(addr, mem = ?exmem.mem, fault = ?fault, "MEM accessed");

        let memwb = MemWb {
            pc4: exmem.pc4,
            alu_res: exmem.alu_res,
            mem_rdata,
            rd: exmem.rd,
            we: exmem.we,
            wb_sel: exmem.wb_sel,
            csr_read_val: exmem.csr_read_val,
            csr_op: exmem.csr_op,
            csr_addr: exmem.csr_addr,
            csr_wval: exmem.csr_wval,
            faulted: exmem.faulted,
        };

        let mut changed = false;
        changed |= self.out.write(memwb);
        changed |= self.fault.write(fault);
        changed |= self.fault_pc.write(mem_fault_pc);
        changed
    }
}
