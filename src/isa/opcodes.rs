//! RV32I opcode/funct3/funct7 constants and the instruction-class sets
//! used by the hazard unit (`needs_rs1`/`needs_rs2`).

pub const OPCODE_LOAD: u32 = 0b000_0011;
pub const OPCODE_OP_IMM: u32 = 0b001_0011;
pub const OPCODE_AUIPC: u32 = 0b001_0111;
pub const OPCODE_STORE: u32 = 0b010_0011;
pub const OPCODE_OP: u32 = 0b011_0011;
pub const OPCODE_LUI: u32 = 0b011_0111;
pub const OPCODE_BRANCH: u32 = 0b110_0011;
pub const OPCODE_JALR: u32 = 0b110_0111;
pub const OPCODE_JAL: u32 = 0b110_1111;
pub const OPCODE_SYSTEM: u32 = 0b111_0011;

// funct3 for OP / OP-IMM.
pub const FUNCT3_ADD_SUB: u32 = 0x0;
pub const FUNCT3_SLL: u32 = 0x1;
pub const FUNCT3_SLT: u32 = 0x2;
pub const FUNCT3_SLTU: u32 = 0x3;
pub const FUNCT3_XOR: u32 = 0x4;
pub const FUNCT3_SRL_SRA: u32 = 0x5;
pub const FUNCT3_OR: u32 = 0x6;
pub const FUNCT3_AND: u32 = 0x7;

// funct3 for LOAD.
pub const FUNCT3_LB: u32 = 0x0;
pub const FUNCT3_LH: u32 = 0x1;
pub const FUNCT3_LW: u32 = 0x2;
pub const FUNCT3_LBU: u32 = 0x4;
pub const FUNCT3_LHU: u32 = 0x5;

// funct3 for STORE.
pub const FUNCT3_SB: u32 = 0x0;
pub const FUNCT3_SH: u32 = 0x1;
pub const FUNCT3_SW: u32 = 0x2;

// funct3 for BRANCH.
pub const FUNCT3_BEQ: u32 = 0x0;
pub const FUNCT3_BNE: u32 = 0x1;
pub const FUNCT3_BLT: u32 = 0x4;
pub const FUNCT3_BGE: u32 = 0x5;
pub const FUNCT3_BLTU: u32 = 0x6;
pub const FUNCT3_BGEU: u32 = 0x7;

pub const FUNCT7_NORMAL: u32 = 0x00;
pub const FUNCT7_ALT: u32 = 0x20; // SUB, SRA

/// SYSTEM instructions are distinguished by the full immediate field
/// (funct3 is always 0 for ECALL/MRET in the base ISA).
pub const SYSTEM_IMM_ECALL: u32 = 0x000;
pub const SYSTEM_IMM_EBREAK: u32 = 0x001;
pub const SYSTEM_IMM_MRET: u32 = 0x302;

/// The canonical NOP encoding: `ADDI x0, x0, 0`.
pub const NOP_INST: u32 = 0x0000_0013;

pub const ECALL_INST: u32 = 0x0000_0073;
pub const MRET_INST: u32 = 0x3020_0073;

/// Whether an instruction with this opcode reads `rs1`. Used by the
/// hazard unit to decide whether a RAW hazard on `rs1` applies.
pub fn needs_rs1(opcode: u32) -> bool {
    matches!(
        opcode,
        OPCODE_OP | OPCODE_OP_IMM | OPCODE_LOAD | OPCODE_STORE | OPCODE_BRANCH | OPCODE_JALR
    )
}

/// Whether an instruction with this opcode reads `rs2`.
pub fn needs_rs2(opcode: u32) -> bool {
    matches!(opcode, OPCODE_OP | OPCODE_STORE | OPCODE_BRANCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rs1_rs2_requirement_sets() {
        assert!(needs_rs1(OPCODE_OP_IMM));
        assert!(!needs_rs2(OPCODE_OP_IMM));
        assert!(needs_rs1(OPCODE_BRANCH));
        assert!(needs_rs2(OPCODE_BRANCH));
        assert!(!needs_rs1(OPCODE_LUI));
        assert!(!needs_rs2(OPCODE_JAL));
    }
}
