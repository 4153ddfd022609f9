//! WB stage: selects the writeback value, commits the register-file
//! write, and applies the CSR write. Runs before ID each settle pass so
//! a same-cycle regfile write is visible to a same-cycle read.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::csr::CsrFile;
use crate::core::latches::MemWb;
use crate::core::regfile::Regfile;
use crate::isa::decode::CsrOp;
use crate::isa::decode::WbSel;
use crate::substrate::{Module, Port};

pub struct WbStage {
    pub memwb: Port<MemWb>,

    regfile: Rc<RefCell<Regfile>>,
    csr: Rc<RefCell<CsrFile>>,
}

impl WbStage {
    pub fn new(regfile: Rc<RefCell<Regfile>>, csr: Rc<RefCell<CsrFile>>) -> Self {
        WbStage {
            memwb: Port::new(MemWb::bubble()),
            regfile,
            csr,
        }
    }
}

impl Module for WbStage {
    fn process(&mut self) -> bool {
        let memwb = self.memwb.read();

        // A fault detected earlier in this instruction's life (EX-stage
        // CSR fault) gates both the regfile write and the CSR commit:
        // the exception unit has already latched mepc/mcause for it and
        // the faulting instruction must not retire.
        if memwb.faulted {
            return false;
        }

        if memwb.we {
            let value = match memwb.wb_sel {
                WbSel::Alu => memwb.alu_res,
                WbSel::PcPlus4 => memwb.pc4,
                WbSel::Mem => memwb.mem_rdata,
                WbSel::Csr => memwb.csr_read_val,
            };
            tracing::trace!(rd = memwb.rd, value, "WB committed");
            self.regfile.borrow_mut().write(memwb.rd, value);
        }

        if memwb.csr_op != CsrOp::None {
            // The address was already validated in EX; an unknown CSR
            // would have set `faulted` and short-circuited above.
            let _ = self.csr.borrow_mut().write(memwb.csr_addr, memwb.csr_wval);
        }

        // WB has no output ports of its own; it never reports "changed"
        // for settle-loop purposes.
        false
    }
}
