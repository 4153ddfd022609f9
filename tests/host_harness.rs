//! Exercises the host-facing error path the way a CLI or debugger
//! wrapper around this crate would: precise `SimError`s from the
//! library, aggregated with `anyhow::Context` at the call site instead
//! of matched on.

use anyhow::{Context, Result};
use rv32i_pipe_sim::{Config, Simulator};

fn load_and_run(bytes: &[u8], cycles: u64) -> Result<Simulator> {
    let mut sim = Simulator::new(Config::default());
    sim.load_instructions(bytes).context("loading program image")?;
    sim.run(cycles).context("running simulator")?;
    Ok(sim)
}

#[test]
fn host_harness_surfaces_a_readable_chain_on_oversized_image() {
    let oversized = vec![0u8; Config::default().mem_size + 4];
    let err = load_and_run(&oversized, 1).unwrap_err();
    assert!(err.to_string().contains("loading program image"));
}

#[test]
fn host_harness_runs_clean_program_without_error() {
    let addi_x1_5 = 0x0050_0093u32; // addi x1, x0, 5
    let result = load_and_run(&addi_x1_5.to_le_bytes(), 5);
    assert!(result.is_ok());
}
