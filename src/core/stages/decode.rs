//! ID stage: decodes the IF/ID instruction and reads the register file.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::latches::{IdEx, IfId};
use crate::core::regfile::Regfile;
use crate::isa::decode::decode;
use crate::substrate::{Module, Port};

pub struct IdStage {
    pub ifid: Port<IfId>,
    pub out: Port<IdEx>,
    pub ecall: Port<bool>,
    pub mret: Port<bool>,
    pub illegal: Port<bool>,
    pub pc: Port<i32>,

    regfile: Rc<RefCell<Regfile>>,
}

impl IdStage {
    pub fn new(regfile: Rc<RefCell<Regfile>>) -> Self {
        IdStage {
            ifid: Port::new(IfId::bubble()),
            out: Port::new(IdEx::bubble()),
            ecall: Port::new(false),
            mret: Port::new(false),
            illegal: Port::new(false),
            pc: Port::new(0),
            regfile,
        }
    }
}

impl Module for IdStage {
    fn process(&mut self) -> bool {
        let ifid = self.ifid.read();
        let d = decode(ifid.inst);

        let rf = self.regfile.borrow();
        let rs1 = rf.read(d.rs1_idx);
        let rs2 = rf.read(d.rs2_idx);
        drop(rf);

        let idex = IdEx {
            pc: ifid.pc,
            rs1,
            rs2,
            imm: d.imm,
            rd: d.rd,
            rs1_idx: d.rs1_idx,
            rs2_idx: d.rs2_idx,
            opcode: d.opcode,
            funct3: d.funct3,
            funct7: d.funct7,
            we: d.we,
            wb_sel: d.wb_sel,
            mem: d.mem,
            is_branch: d.is_branch,
            is_jump: d.is_jump,
            is_auipc: d.is_auipc,
            is_lui: d.is_lui,
            csr_op: d.csr_op,
            csr_addr: d.csr_addr,
            csr_uses_imm: d.csr_uses_imm,
        };

        tracing::trace!(pc = ifid.pc, opcode = d.opcode, rs1, rs2, "ID decoded");

        let mut changed = false;
        changed |= self.out.write(idex);
        changed |= self.ecall.write(d.is_ecall);
        changed |= self.mret.write(d.is_mret);
        changed |= self.illegal.write(d.illegal);
        changed |= self.pc.write(ifid.pc);
        changed
    }
}
