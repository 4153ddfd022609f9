//! The public facade: loads a program into the pipeline, steps/runs it,
//! and exposes the read-only inspection API a host (viewer, test
//! harness, CLI) uses instead of poking the pipeline directly.

use std::path::Path;

use tracing::info;

use crate::common::{SimError, SimResult};
use crate::config::Config;
use crate::core::pipeline::{Pipeline, PipelineSnapshot};
use crate::isa::decode::{decode, Decoded};
use crate::stats::Stats;

pub struct Simulator {
    pipeline: Pipeline,
    config: Config,
    stats: Stats,
    last_error: Option<SimError>,
}

impl Simulator {
    pub fn new(config: Config) -> Self {
        Simulator {
            pipeline: Pipeline::new(config),
            config,
            stats: Stats::new(),
            last_error: None,
        }
    }

    /// Reads `path` and writes its bytes into memory starting at address
    /// 0, little-endian RV32I instruction words with no header.
    pub fn load_binary(&mut self, path: impl AsRef<Path>) -> SimResult<()> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| SimError::InvalidBinary(e.to_string()))?;
        self.load_instructions(&bytes)
    }

    pub fn load_instructions(&mut self, bytes: &[u8]) -> SimResult<()> {
        self.pipeline.memory.borrow_mut().load_image(bytes)
    }

    pub fn reset(&mut self) {
        self.pipeline.reset();
        self.stats.reset();
        self.last_error = None;
    }

    pub fn step(&mut self) -> SimResult<()> {
        let result = self.pipeline.step();
        self.sync_stats();
        match &result {
            Ok(()) => info!(
                cycle = self.stats.cycles,
                pc = self.pipeline.pc(),
                retired = self.stats.instructions_retired,
                "cycle complete"
            ),
            Err(e) => {
                self.last_error = Some(e.clone());
                tracing::warn!(error = %e, "step failed");
            }
        }
        result
    }

    /// Steps up to `max_cycles` times, stopping early on the first
    /// error. Returns the number of cycles actually executed.
    pub fn run(&mut self, max_cycles: u64) -> SimResult<u64> {
        let mut executed = 0;
        for _ in 0..max_cycles {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    pub fn run_comb_logic(&mut self) -> SimResult<()> {
        self.pipeline.run_comb_logic()
    }

    pub fn read_reg(&self, i: u32) -> u32 {
        self.pipeline.regfile.borrow().read(i)
    }

    pub fn read_pc(&self) -> u32 {
        self.pipeline.pc()
    }

    pub fn read_data_mem(&self, addr: u32, n: usize) -> SimResult<Vec<u8>> {
        Ok(self.pipeline.memory.borrow().read_bytes(addr, n)?.to_vec())
    }

    pub fn read_inst_mem(&self, addr: u32, n: usize) -> SimResult<Vec<u8>> {
        Ok(self.pipeline.memory.borrow().read_bytes(addr, n)?.to_vec())
    }

    /// Strictly decodes the instruction at `addr`, independent of the
    /// pipeline's own fetch/decode path: for a debugger or disassembler
    /// front end that wants to inspect an address without stepping the
    /// machine. Unlike a fetch inside the pipeline, a misaligned address
    /// or an unrecognized encoding is reported directly rather than
    /// turned into an architectural exception.
    pub fn decode_at(&self, addr: u32) -> SimResult<Decoded> {
        let inst = self.pipeline.memory.borrow().read_inst(addr)?;
        let d = decode(inst);
        if d.illegal {
            return Err(SimError::IllegalInstruction(inst));
        }
        Ok(d)
    }

    pub fn get_cycles(&self) -> u64 {
        self.stats.cycles
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.pipeline.snapshot()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn last_error(&self) -> Option<&SimError> {
        self.last_error.as_ref()
    }

    fn sync_stats(&mut self) {
        self.stats.cycles = self.pipeline.cycles();
        self.stats.instructions_retired = self.pipeline.instructions_retired();
        self.stats.stall_cycles = self.pipeline.stall_cycles();
        self.stats.flush_cycles = self.pipeline.flush_cycles();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::opcodes::OPCODE_OP_IMM;

    fn addi(rd: u32, rs1: u32, imm: i32) -> u32 {
        (((imm as u32) & 0xfff) << 20) | (rs1 << 15) | (0 << 12) | (rd << 7) | OPCODE_OP_IMM
    }

    #[test]
    fn load_instructions_then_run_advances_cycles() {
        let mut sim = Simulator::new(Config::default());
        sim.load_instructions(&addi(1, 0, 5).to_le_bytes()).unwrap();
        sim.run(10).unwrap();
        assert_eq!(sim.get_cycles(), 10);
        assert_eq!(sim.read_reg(1), 5);
    }

    #[test]
    fn reset_clears_cycles_and_registers() {
        let mut sim = Simulator::new(Config::default());
        sim.load_instructions(&addi(1, 0, 5).to_le_bytes()).unwrap();
        sim.run(10).unwrap();
        sim.reset();
        assert_eq!(sim.get_cycles(), 0);
        assert_eq!(sim.read_reg(1), 0);
    }

    #[test]
    fn out_of_bounds_fetch_surfaces_through_step() {
        let mut sim = Simulator::new(Config { mem_size: 4, ..Config::default() });
        let err = sim.run(100);
        assert!(err.is_err());
        assert!(sim.last_error().is_some());
    }

    #[test]
    fn decode_at_rejects_unrecognized_encoding() {
        let mut sim = Simulator::new(Config::default());
        let garbage = 0b1111111u32; // opcode bits all set, no such encoding
        sim.load_instructions(&garbage.to_le_bytes()).unwrap();
        assert_eq!(sim.decode_at(0), Err(SimError::IllegalInstruction(garbage)));
    }

    #[test]
    fn decode_at_rejects_misaligned_address() {
        let sim = Simulator::new(Config::default());
        use crate::common::AccessKind;
        assert_eq!(
            sim.decode_at(2),
            Err(SimError::MisalignedAccess { kind: AccessKind::Instruction, addr: 2 })
        );
    }

    #[test]
    fn decode_at_returns_decoded_fields_for_a_known_instruction() {
        let mut sim = Simulator::new(Config::default());
        sim.load_instructions(&addi(1, 0, 5).to_le_bytes()).unwrap();
        let d = sim.decode_at(0).unwrap();
        assert!(d.we);
        assert_eq!(d.rd, 1);
    }
}
