//! Branch/redirect unit: computes the PC the PC register will latch
//! next cycle, with exception entry and `MRET` return taking priority
//! over a taken branch, which in turn takes priority over sequential
//! `pc + 4`.

use crate::substrate::{Module, Port};

pub struct BranchUnit {
    pub pc: Port<u32>,
    pub take_branch: Port<bool>,
    pub branch_target: Port<u32>,
    pub exception_pending: Port<bool>,
    pub mtvec: Port<u32>,
    pub trap_return: Port<bool>,
    pub mepc: Port<u32>,

    pub npc: Port<u32>,
}

impl BranchUnit {
    pub fn new() -> Self {
        BranchUnit {
            pc: Port::new(0),
            take_branch: Port::new(false),
            branch_target: Port::new(0),
            exception_pending: Port::new(false),
            mtvec: Port::new(0),
            trap_return: Port::new(false),
            mepc: Port::new(0),
            npc: Port::new(0),
        }
    }
}

impl Default for BranchUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for BranchUnit {
    fn process(&mut self) -> bool {
        let next = if self.exception_pending.read() {
            self.mtvec.read()
        } else if self.trap_return.read() {
            self.mepc.read()
        } else if self.take_branch.read() {
            self.branch_target.read()
        } else {
            self.pc.read().wrapping_add(4)
        };

        self.npc.write(next)
    }
}
