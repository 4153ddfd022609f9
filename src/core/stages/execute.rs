//! EX stage: ALU, branch condition evaluation, JAL/JALR target
//! computation, effective-address computation for loads/stores, and the
//! CSR read-modify-write.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::csr::CsrFile;
use crate::core::latches::{ExMem, IdEx};
use crate::isa::decode::CsrOp;
use crate::isa::opcodes::*;
use crate::substrate::{Module, Port};

pub struct ExStage {
    pub idex: Port<IdEx>,
    pub out: Port<ExMem>,
    pub take_branch: Port<bool>,
    pub csr_fault: Port<bool>,

    csr: Rc<RefCell<CsrFile>>,
}

impl ExStage {
    pub fn new(csr: Rc<RefCell<CsrFile>>) -> Self {
        ExStage {
            idex: Port::new(IdEx::bubble()),
            out: Port::new(ExMem::bubble()),
            take_branch: Port::new(false),
            csr_fault: Port::new(false),
            csr,
        }
    }
}

/// Shared with [`crate::core::single_cycle`], which reuses this exact
/// table instead of redefining it.
pub(crate) fn alu(opcode: u32, funct3: u32, funct7: u32, a: u32, b: u32) -> u32 {
    let sub_or_sra = funct7 == FUNCT7_ALT && opcode == OPCODE_OP;
    let shift_alt = funct7 == FUNCT7_ALT; // SRLI/SRAI also use this bit
    match funct3 {
        FUNCT3_ADD_SUB if sub_or_sra => a.wrapping_sub(b),
        FUNCT3_ADD_SUB => a.wrapping_add(b),
        FUNCT3_SLL => a.wrapping_shl(b & 0x1f),
        FUNCT3_SLT => ((a as i32) < (b as i32)) as u32,
        FUNCT3_SLTU => (a < b) as u32,
        FUNCT3_XOR => a ^ b,
        FUNCT3_SRL_SRA if shift_alt => ((a as i32).wrapping_shr(b & 0x1f)) as u32,
        FUNCT3_SRL_SRA => a.wrapping_shr(b & 0x1f),
        FUNCT3_OR => a | b,
        FUNCT3_AND => a & b,
        _ => 0,
    }
}

/// Shared with [`crate::core::single_cycle`]; see [`alu`].
pub(crate) fn branch_taken(funct3: u32, rs1: u32, rs2: u32) -> bool {
    match funct3 {
        FUNCT3_BEQ => rs1 == rs2,
        FUNCT3_BNE => rs1 != rs2,
        FUNCT3_BLT => (rs1 as i32) < (rs2 as i32),
        FUNCT3_BGE => (rs1 as i32) >= (rs2 as i32),
        FUNCT3_BLTU => rs1 < rs2,
        FUNCT3_BGEU => rs1 >= rs2,
        _ => false,
    }
}

impl Module for ExStage {
    fn process(&mut self) -> bool {
        let idex = self.idex.read();
        let pc4 = (idex.pc as u32).wrapping_add(4);
        let imm_u = idex.imm as u32;

        let mut take_branch = false;
        let mut alu_res;

        match idex.opcode {
            OPCODE_BRANCH => {
                take_branch = branch_taken(idex.funct3, idex.rs1, idex.rs2);
                alu_res = (idex.pc as u32).wrapping_add(imm_u);
            }
            OPCODE_JAL => {
                take_branch = true;
                alu_res = (idex.pc as u32).wrapping_add(imm_u);
            }
            OPCODE_JALR => {
                take_branch = true;
                alu_res = idex.rs1.wrapping_add(imm_u) & !1u32;
            }
            OPCODE_LOAD | OPCODE_STORE => {
                alu_res = idex.rs1.wrapping_add(imm_u);
            }
            OPCODE_AUIPC => {
                alu_res = (idex.pc as u32).wrapping_add(imm_u);
            }
            _ if idex.is_lui => {
                alu_res = imm_u;
            }
            OPCODE_OP_IMM | OPCODE_OP => {
                let b = if idex.opcode == OPCODE_OP { idex.rs2 } else { imm_u };
                alu_res = alu(idex.opcode, idex.funct3, idex.funct7, idex.rs1, b);
            }
            _ => {
                alu_res = 0;
            }
        }

        let mut csr_fault = false;
        let mut csr_read_val = 0u32;
        let mut csr_wval = 0u32;
        if idex.csr_op != CsrOp::None {
            let operand = if idex.csr_uses_imm { idex.rs1_idx } else { idex.rs1 };
            match self.csr.borrow().read(idex.csr_addr) {
                Ok(old) => {
                    csr_read_val = old;
                    alu_res = old;
                    csr_wval = match idex.csr_op {
                        CsrOp::Write => operand,
                        CsrOp::Set => old | operand,
                        CsrOp::Clear => old & !operand,
                        CsrOp::None => old,
                    };
                }
                Err(_) => csr_fault = true,
            }
        }

        let exmem = ExMem {
            pc4,
            alu_res,
            rs2: idex.rs2,
            rd: idex.rd,
            we: idex.we,
            wb_sel: idex.wb_sel,
            mem: idex.mem,
            funct3: idex.funct3,
            take_branch,
            csr_op: idex.csr_op,
            csr_addr: idex.csr_addr,
            csr_read_val,
            csr_wval,
            faulted: csr_fault,
        };

        tracing::trace!(pc = idex.pc, alu_res, take_branch, "EX computed");

        let mut changed = false;
        changed |= self.out.write(exmem);
        changed |= self.take_branch.write(take_branch);
        changed |= self.csr_fault.write(csr_fault);
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::csr::CsrFile;

    fn stage() -> ExStage {
        ExStage::new(Rc::new(RefCell::new(CsrFile::new(0))))
    }

    #[test]
    fn jalr_masks_low_bit_of_target() {
        let mut ex = stage();
        let mut idex = IdEx::bubble();
        idex.opcode = OPCODE_JALR;
        idex.rs1 = 5;
        idex.imm = 0;
        ex.idex.write(idex);
        ex.process();
        assert_eq!(ex.out.read().alu_res, 4);
        assert!(ex.take_branch.read());
    }

    #[test]
    fn sra_preserves_sign_across_shift_amounts() {
        for shamt in 0u32..32 {
            let a = -8i32 as u32;
            let r = alu(OPCODE_OP, FUNCT3_SRL_SRA, FUNCT7_ALT, a, shamt);
            assert_eq!(r as i32, (-8i32).wrapping_shr(shamt));
        }
    }

    #[test]
    fn sub_only_recognized_on_op_not_op_imm() {
        // OP-IMM never interprets funct7=ALT as "subtract"; there is no SUBI.
        let r = alu(OPCODE_OP_IMM, FUNCT3_ADD_SUB, FUNCT7_ALT, 10, 3);
        assert_eq!(r, 13);
    }

    #[test]
    fn branch_target_and_sequential_pc4_both_computed() {
        let mut ex = stage();
        let mut idex = IdEx::bubble();
        idex.opcode = OPCODE_BRANCH;
        idex.funct3 = FUNCT3_BEQ;
        idex.pc = 100;
        idex.imm = -4;
        idex.rs1 = 1;
        idex.rs2 = 1;
        ex.idex.write(idex);
        ex.process();
        let out = ex.out.read();
        assert!(out.take_branch);
        assert_eq!(out.alu_res, 96);
        assert_eq!(out.pc4, 104);
    }
}
