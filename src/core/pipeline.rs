//! The top-level pipeline: owns every stage, control unit, and latch,
//! and wires them together once per cycle via explicit port
//! reads/writes in a fixed order. The graph itself is feed-forward once
//! register boundaries are accounted for (the one exception being "WB
//! writes the register file before ID reads it," handled by simply
//! running the WB stage first), so [`crate::substrate::settle`] reaches
//! its fixed point in one or two passes; the wiring below is plain Rust,
//! not a `Port::connect` chain, because the processing order is fixed
//! and known ahead of time.

use std::cell::RefCell;
use std::rc::Rc;

use crate::common::{SimError, SimResult};
use crate::config::Config;
use crate::core::branch::BranchUnit;
use crate::core::csr::CsrFile;
use crate::core::exception::{ExceptionUnit, MemFaultKind};
use crate::core::hazard::HazardUnit;
use crate::core::latches::{ExMem, ExMemReg, IdEx, IdExReg, IfId, IfIdReg, MemWb, MemWbReg};
use crate::core::memory::Memory;
use crate::core::regfile::Regfile;
use crate::core::stages::{ExStage, IdStage, IfStage, MemStage, WbStage};
use crate::substrate::{settle, Module, Reg, Wire};

/// Module count fed to the settle loop's iteration bound: five stages,
/// three control units, four pipeline registers.
const MODULE_COUNT: usize = 12;

pub struct Pipeline {
    pub regfile: Rc<RefCell<Regfile>>,
    pub memory: Rc<RefCell<Memory>>,
    pub csr: Rc<RefCell<CsrFile>>,

    if_stage: IfStage,
    id_stage: IdStage,
    ex_stage: ExStage,
    mem_stage: MemStage,
    wb_stage: WbStage,

    hazard: HazardUnit,
    branch: BranchUnit,
    exception: ExceptionUnit,

    ifid_reg: IfIdReg,
    idex_reg: IdExReg,
    exmem_reg: ExMemReg,
    memwb_reg: MemWbReg,

    pc_reg: Rc<Reg<u32>>,
    /// The gated "next PC to latch" signal. The hazard-gated glue writes
    /// here instead of touching `pc_reg` directly; `pc_reg.write_next`
    /// is registered against it once, in [`Self::new`], as an
    /// `on_change` callback.
    pc_update: Wire<u32>,

    config: Config,
    cycles: u64,
    instructions_retired: u64,
    stall_cycles: u64,
    flush_cycles: u64,
    last_error: Option<SimError>,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let regfile = Rc::new(RefCell::new(Regfile::new()));
        let memory = Rc::new(RefCell::new(Memory::new(config.mem_size)));
        let csr = Rc::new(RefCell::new(CsrFile::new(config.mtvec_reset)));

        let pc_reg = Rc::new(Reg::new(config.reset_pc));
        let pc_update = Wire::new(config.reset_pc);
        let pc_reg_for_glue = Rc::clone(&pc_reg);
        pc_update.on_change(move |next_pc| pc_reg_for_glue.write_next(next_pc));

        Pipeline {
            if_stage: IfStage::new(Rc::clone(&memory)),
            id_stage: IdStage::new(Rc::clone(&regfile)),
            ex_stage: ExStage::new(Rc::clone(&csr)),
            mem_stage: MemStage::new(Rc::clone(&memory)),
            wb_stage: WbStage::new(Rc::clone(&regfile), Rc::clone(&csr)),

            hazard: HazardUnit::new(),
            branch: BranchUnit::new(),
            exception: ExceptionUnit::new(Rc::clone(&csr)),

            ifid_reg: IfIdReg::new(IfId::bubble()),
            idex_reg: IdExReg::new(Default::default()),
            exmem_reg: ExMemReg::new(Default::default()),
            memwb_reg: MemWbReg::new(Default::default()),

            pc_reg,
            pc_update,

            regfile,
            memory,
            csr,
            config,
            cycles: 0,
            instructions_retired: 0,
            stall_cycles: 0,
            flush_cycles: 0,
            last_error: None,
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn instructions_retired(&self) -> u64 {
        self.instructions_retired
    }

    pub fn stall_cycles(&self) -> u64 {
        self.stall_cycles
    }

    pub fn flush_cycles(&self) -> u64 {
        self.flush_cycles
    }

    pub fn last_error(&self) -> Option<SimError> {
        self.last_error.clone()
    }

    pub fn pc(&self) -> u32 {
        self.pc_reg.read()
    }

    pub fn reset(&mut self) {
        self.regfile.borrow_mut().reset();
        self.csr.borrow_mut().reset();
        self.pc_reg.reset();
        self.ifid_reg.reset();
        self.idex_reg.reset();
        self.exmem_reg.reset();
        self.memwb_reg.reset();
        self.cycles = 0;
        self.instructions_retired = 0;
        self.stall_cycles = 0;
        self.flush_cycles = 0;
        self.last_error = None;
    }

    /// One full settle of the combinational graph, without advancing the
    /// clock — used both by [`Self::step`] and by a caller that wants to
    /// re-stabilize outputs after poking state directly (e.g. right after
    /// `load_binary`, before the first `step`).
    pub fn run_comb_logic(&mut self) -> SimResult<()> {
        settle(MODULE_COUNT, || self.run_pass())?;
        if let Some(e) = self.if_stage.take_error() {
            return Err(e);
        }
        if let Some(e) = self.mem_stage.take_error() {
            return Err(e);
        }
        Ok(())
    }

    /// Advances one clock cycle: settle the combinational graph, then
    /// commit every register. Returns the stashed error (if any) without
    /// committing, leaving state as of the last successful cycle.
    pub fn step(&mut self) -> SimResult<()> {
        self.begin_cycle();

        if let Err(e) = self.run_comb_logic() {
            self.last_error = Some(e.clone());
            return Err(e);
        }

        let retiring = self.memwb_reg.current();
        let stalled = self.hazard.stall_pc.read();
        let flushed = self.hazard.flush_ifid.read() || self.hazard.flush_idex.read();

        self.commit();

        self.cycles += 1;
        if stalled {
            self.stall_cycles += 1;
        }
        if flushed {
            self.flush_cycles += 1;
        }
        if retiring.we && !retiring.faulted {
            self.instructions_retired += 1;
        }

        Ok(())
    }

    fn begin_cycle(&self) {
        self.pc_reg.begin_cycle();
        self.ifid_reg.begin_cycle();
        self.idex_reg.begin_cycle();
        self.exmem_reg.begin_cycle();
        self.memwb_reg.begin_cycle();
    }

    fn commit(&self) {
        self.pc_reg.commit();
        self.ifid_reg.commit();
        self.idex_reg.commit();
        self.exmem_reg.commit();
        self.memwb_reg.commit();
    }

    /// One evaluation of every combinational module, in the order that
    /// makes a single pass sufficient: WB before ID (write-before-read
    /// within the cycle), then the stages in pipeline order, then the
    /// control units that consume their outputs, then the four latch
    /// muxes, then the PC register's next-value write.
    fn run_pass(&mut self) -> bool {
        let mut changed = false;

        self.wb_stage.memwb.write(self.memwb_reg.current());
        changed |= self.wb_stage.process();

        self.if_stage.pc.write(self.pc_reg.read());
        changed |= self.if_stage.process();

        self.id_stage.ifid.write(self.ifid_reg.current());
        changed |= self.id_stage.process();

        self.ex_stage.idex.write(self.idex_reg.current());
        changed |= self.ex_stage.process();

        self.mem_stage.exmem.write(self.exmem_reg.current());
        changed |= self.mem_stage.process();

        self.exception.if_misaligned.write(self.if_stage.misaligned.read());
        self.exception.if_pc.write(self.if_stage.out.read().pc);
        self.exception.id_ecall.write(self.id_stage.ecall.read());
        self.exception.id_illegal.write(self.id_stage.illegal.read());
        self.exception.id_mret.write(self.id_stage.mret.read());
        self.exception.id_pc.write(self.id_stage.out.read().pc);
        self.exception.ex_csr_fault.write(self.ex_stage.csr_fault.read());
        self.exception.ex_pc.write(self.ex_stage.idex.read().pc);
        self.exception.mem_fault.write(self.mem_stage.fault.read());
        self.exception.mem_pc.write(self.mem_stage.fault_pc.read());
        changed |= self.exception.process();

        self.hazard.ifid.write(self.ifid_reg.current());
        self.hazard.idex.write(self.idex_reg.current());
        self.hazard.exmem.write(self.exmem_reg.current());
        self.hazard.take_branch.write(self.ex_stage.take_branch.read());
        self.hazard.raise_exception.write(self.exception.raise_exception.read());
        self.hazard.trap_return.write(self.exception.trap_return.read());
        changed |= self.hazard.process();

        self.branch.pc.write(self.pc_reg.read());
        self.branch.take_branch.write(self.ex_stage.take_branch.read());
        self.branch.branch_target.write(self.ex_stage.out.read().alu_res);
        self.branch.exception_pending.write(self.exception.raise_exception.read());
        self.branch.mtvec.write(self.exception.mtvec());
        self.branch.trap_return.write(self.exception.trap_return.read());
        self.branch.mepc.write(self.exception.mepc());
        changed |= self.branch.process();

        self.ifid_reg.input.write(self.if_stage.out.read());
        self.ifid_reg.stall.write(self.hazard.stall_ifid.read());
        self.ifid_reg.flush.write(self.hazard.flush_ifid.read());
        changed |= self.ifid_reg.process();

        self.idex_reg.input.write(self.id_stage.out.read());
        self.idex_reg.stall.write(false);
        self.idex_reg.flush.write(self.hazard.flush_idex.read());
        changed |= self.idex_reg.process();

        self.exmem_reg.input.write(self.ex_stage.out.read());
        self.exmem_reg.stall.write(false);
        self.exmem_reg.flush.write(self.hazard.flush_exmem.read());
        changed |= self.exmem_reg.process();

        self.memwb_reg.input.write(self.mem_stage.out.read());
        self.memwb_reg.stall.write(false);
        self.memwb_reg.flush.write(false);
        changed |= self.memwb_reg.process();

        if !self.hazard.stall_pc.read() {
            self.pc_update.write(self.branch.npc.read());
        }

        changed
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            pc: self.pc_reg.read(),
            regs: self.regfile.borrow().snapshot(),
            ifid: self.ifid_reg.current(),
            idex: self.idex_reg.current(),
            exmem: self.exmem_reg.current(),
            memwb: self.memwb_reg.current(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSnapshot {
    pub pc: u32,
    pub regs: [u32; 32],
    pub ifid: IfId,
    pub idex: IdEx,
    pub exmem: ExMem,
    pub memwb: MemWb,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::opcodes::OPCODE_OP_IMM;

    fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
        (((imm as u32) & 0xfff) << 20) | (rs1 << 15) | (0 << 12) | (rd << 7) | OPCODE_OP_IMM
    }

    #[test]
    fn addi_chain_retires_after_five_cycles_of_fill() {
        let mut p = Pipeline::new(Config::default());
        let program = [addi(1, 0, 1), addi(2, 1, 1), addi(3, 2, 1)];
        let mut bytes = Vec::new();
        for w in program {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        p.memory.borrow_mut().load_image(&bytes).unwrap();

        // Each instruction depends on its predecessor's result and there
        // is no forwarding, so the hazard unit stalls ID until the
        // producer's write has gone through WB. Twenty cycles is ample
        // slack for three such instructions to clear the pipeline.
        for _ in 0..20 {
            p.step().unwrap();
        }

        assert_eq!(p.regfile.borrow().read(1), 1);
        assert_eq!(p.regfile.borrow().read(2), 2);
        assert_eq!(p.regfile.borrow().read(3), 3);
    }

    #[test]
    fn load_use_hazard_stalls_exactly_one_cycle() {
        let mut p = Pipeline::new(Config::default());
        use crate::isa::opcodes::{OPCODE_LOAD, OPCODE_OP};
        let lw = (0u32 << 20) | (0 << 15) | (2 << 12) | (5 << 7) | OPCODE_LOAD; // lw x5, 0(x0)
        let add = (0u32 << 25) | (5 << 20) | (5 << 15) | (0 << 12) | (6 << 7) | OPCODE_OP; // add x6, x5, x5
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&lw.to_le_bytes());
        bytes.extend_from_slice(&add.to_le_bytes());
        p.memory.borrow_mut().load_image(&bytes).unwrap();

        p.step().unwrap(); // IF: lw
        p.step().unwrap(); // IF: add, ID: lw
        assert!(!p.hazard.stall_pc.read());
        p.step().unwrap(); // ID sees add vs EX=lw -> load-use stall expected
        assert!(p.hazard.stall_pc.read());
    }

    #[test]
    fn branch_taken_flushes_two_instructions() {
        let mut p = Pipeline::new(Config::default());
        use crate::isa::opcodes::OPCODE_BRANCH;
        // beq x0, x0, +8 (always taken)
        let beq = (0u32 << 25) | (0 << 20) | (0 << 15) | (0 << 12) | (0b0_0100 << 8) | OPCODE_BRANCH;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&beq.to_le_bytes());
        bytes.extend_from_slice(&addi(1, 0, 99).to_le_bytes()); // would-be delay slot, must be flushed
        p.memory.borrow_mut().load_image(&bytes).unwrap();

        for _ in 0..4 {
            p.step().unwrap();
        }
        assert_eq!(p.regfile.borrow().read(1), 0);
    }
}
