//! ABI register names, used by the disassembler and by snapshot rendering.

const NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// The ABI name for register index `idx` (0..=31). Indices outside that
/// range are a decoder bug, not a runtime condition, so this panics.
pub fn name(idx: u32) -> &'static str {
    NAMES[idx as usize]
}
