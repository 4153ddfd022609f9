//! Single-cycle reference model: the same decode/ALU/memory/CSR
//! building blocks as the pipeline, run straight through IF-ID-EX-MEM-WB
//! in one step with no latching and no hazard unit. Exists purely so the
//! pipeline's architectural results can be checked against an
//! implementation with no pipelining hazards to get wrong; it is not
//! part of the cycle-accurate pipeline model itself.

use std::cell::RefCell;
use std::rc::Rc;

use crate::common::SimResult;
use crate::config::Config;
use crate::core::csr::CsrFile;
use crate::core::memory::Memory;
use crate::core::regfile::Regfile;
use crate::core::stages::execute::{alu, branch_taken};
use crate::core::stages::mem::width;
use crate::isa::decode::{decode, CsrOp, WbSel};
use crate::isa::opcodes::*;

pub struct SingleCycle {
    pub regfile: Rc<RefCell<Regfile>>,
    pub memory: Rc<RefCell<Memory>>,
    pub csr: Rc<RefCell<CsrFile>>,
    pc: u32,
    config: Config,
    instructions_retired: u64,
}

impl SingleCycle {
    pub fn new(config: Config) -> Self {
        SingleCycle {
            regfile: Rc::new(RefCell::new(Regfile::new())),
            memory: Rc::new(RefCell::new(Memory::new(config.mem_size))),
            csr: Rc::new(RefCell::new(CsrFile::new(config.mtvec_reset))),
            pc: config.reset_pc,
            config,
            instructions_retired: 0,
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn instructions_retired(&self) -> u64 {
        self.instructions_retired
    }

    pub fn reset(&mut self) {
        self.regfile.borrow_mut().reset();
        self.csr.borrow_mut().reset();
        self.pc = self.config.reset_pc;
        self.instructions_retired = 0;
    }

    /// Executes exactly one instruction. Misalignment and illegal
    /// encodings become an architectural trap (PC redirected to
    /// `mtvec`, `mepc`/`mcause` latched) rather than a `SimError`;
    /// out-of-bounds memory access is a genuine `SimError`.
    pub fn step(&mut self) -> SimResult<()> {
        if self.pc % 4 != 0 {
            self.trap(CAUSE_INSTRUCTION_MISALIGNED, self.pc);
            return Ok(());
        }

        let inst = self.memory.borrow().read_inst(self.pc)?;
        let d = decode(inst);

        if d.is_ecall {
            self.trap(CAUSE_ECALL, self.pc);
            return Ok(());
        }
        if d.illegal {
            self.trap(CAUSE_ILLEGAL, self.pc);
            return Ok(());
        }
        if d.is_mret {
            self.pc = self.csr.borrow().mepc();
            return Ok(());
        }

        let rf = self.regfile.borrow();
        let rs1 = rf.read(d.rs1_idx);
        let rs2 = rf.read(d.rs2_idx);
        drop(rf);

        let imm_u = d.imm as u32;
        let pc4 = self.pc.wrapping_add(4);

        let mut next_pc = pc4;
        let mut alu_res;
        let mut mem_rdata = 0u32;

        match d.opcode {
            OPCODE_BRANCH => {
                alu_res = self.pc.wrapping_add(imm_u);
                if branch_taken(d.funct3, rs1, rs2) {
                    next_pc = alu_res;
                }
            }
            OPCODE_JAL => {
                alu_res = self.pc.wrapping_add(imm_u);
                next_pc = alu_res;
            }
            OPCODE_JALR => {
                alu_res = rs1.wrapping_add(imm_u) & !1u32;
                next_pc = alu_res;
            }
            OPCODE_LOAD | OPCODE_STORE => alu_res = rs1.wrapping_add(imm_u),
            OPCODE_AUIPC => alu_res = self.pc.wrapping_add(imm_u),
            _ if d.is_lui => alu_res = imm_u,
            OPCODE_OP_IMM | OPCODE_OP => {
                let b = if d.opcode == OPCODE_OP { rs2 } else { imm_u };
                alu_res = alu(d.opcode, d.funct3, d.funct7, rs1, b);
            }
            _ => alu_res = 0,
        }

        match d.mem {
            MemOp::Load => {
                if alu_res % width(d.funct3) != 0 {
                    self.trap(CAUSE_LOAD_MISALIGNED, self.pc);
                    return Ok(());
                }
                mem_rdata = self.memory.borrow().read_data(alu_res, d.funct3)?;
            }
            MemOp::Store => {
                if alu_res % width(d.funct3) != 0 {
                    self.trap(CAUSE_STORE_MISALIGNED, self.pc);
                    return Ok(());
                }
                self.memory.borrow_mut().write_data(alu_res, d.funct3, rs2)?;
            }
            MemOp::None => {}
        }

        let mut csr_read_val = 0u32;
        if d.csr_op != CsrOp::None {
            let operand = if d.csr_uses_imm { d.rs1_idx } else { rs1 };
            match self.csr.borrow().read(d.csr_addr) {
                Ok(old) => {
                    csr_read_val = old;
                    let new_val = match d.csr_op {
                        CsrOp::Write => operand,
                        CsrOp::Set => old | operand,
                        CsrOp::Clear => old & !operand,
                        CsrOp::None => old,
                    };
                    let _ = self.csr.borrow_mut().write(d.csr_addr, new_val);
                }
                Err(_) => {
                    self.trap(CAUSE_ILLEGAL, self.pc);
                    return Ok(());
                }
            }
        }

        if d.we {
            let value = match d.wb_sel {
                WbSel::Alu => alu_res,
                WbSel::PcPlus4 => pc4,
                WbSel::Mem => mem_rdata,
                WbSel::Csr => csr_read_val,
            };
            self.regfile.borrow_mut().write(d.rd, value);
        }

        self.pc = next_pc;
        self.instructions_retired += 1;
        Ok(())
    }

    pub fn run(&mut self, max_instructions: u64) -> SimResult<u64> {
        let mut executed = 0;
        while executed < max_instructions {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    fn trap(&mut self, cause: u32, pc: u32) {
        let mut csr = self.csr.borrow_mut();
        csr.set_mcause(cause);
        csr.set_mepc(pc);
        self.pc = csr.mtvec();
    }
}

const CAUSE_INSTRUCTION_MISALIGNED: u32 = 0;
const CAUSE_ILLEGAL: u32 = 2;
const CAUSE_ECALL: u32 = 11;
const CAUSE_LOAD_MISALIGNED: u32 = 4;
const CAUSE_STORE_MISALIGNED: u32 = 6;
