//! Textual rendering of a 32-bit instruction word: `(mnemonic, operands)`.
//!
//! Used by the inspection/trace facade (`Simulator::snapshot`/logging) and
//! by nothing inside the execution path itself — disassembly never
//! influences simulated behavior.

use crate::isa::abi;
use crate::isa::decode::{decode, CsrOp, Decoded};
use crate::isa::opcodes::*;

/// `(mnemonic, operand_string)`. Unknown encodings come back as
/// `("UNKNOWN", "unknown instruction (0x...)")`.
pub fn disassemble(inst: u32) -> (String, String) {
    if inst == NOP_INST {
        return ("NOP".to_string(), String::new());
    }
    if inst == ECALL_INST {
        return ("ECALL".to_string(), String::new());
    }
    if inst == MRET_INST {
        return ("MRET".to_string(), String::new());
    }

    let d = decode(inst);
    if d.illegal {
        return ("UNKNOWN".to_string(), format!("unknown instruction (0x{inst:08x})"));
    }

    let rd = abi::name(d.rd);
    let rs1 = abi::name(d.rs1_idx);
    let rs2 = abi::name(d.rs2_idx);

    match d.opcode {
        OPCODE_OP => (op_mnemonic(&d), format!("{rd}, {rs1}, {rs2}")),
        OPCODE_OP_IMM => {
            if matches!(d.funct3, FUNCT3_SLL | FUNCT3_SRL_SRA) {
                let shamt = d.imm & 0x1f;
                (op_imm_shift_mnemonic(&d), format!("{rd}, {rs1}, {shamt}"))
            } else {
                (op_imm_mnemonic(d.funct3), format!("{rd}, {rs1}, {}", d.imm))
            }
        }
        OPCODE_LOAD => (load_mnemonic(d.funct3), format!("{rd}, {}({rs1})", d.imm)),
        OPCODE_STORE => (store_mnemonic(d.funct3), format!("{rs2}, {}({rs1})", d.imm)),
        OPCODE_BRANCH => (branch_mnemonic(d.funct3), format!("{rs1}, {rs2}, {}", d.imm)),
        OPCODE_LUI => ("LUI".to_string(), format!("{rd}, 0x{:x}", (d.imm as u32) >> 12)),
        OPCODE_AUIPC => ("AUIPC".to_string(), format!("{rd}, 0x{:x}", (d.imm as u32) >> 12)),
        OPCODE_JAL => ("JAL".to_string(), format!("{rd}, {}", d.imm)),
        OPCODE_JALR => ("JALR".to_string(), format!("{rd}, {}({rs1})", d.imm)),
        OPCODE_SYSTEM => csr_text(&d, rd, rs1),
        _ => ("UNKNOWN".to_string(), format!("unknown instruction (0x{inst:08x})")),
    }
}

fn op_mnemonic(d: &Decoded) -> String {
    let name = match d.funct3 {
        FUNCT3_ADD_SUB if d.funct7 == FUNCT7_ALT => "SUB",
        FUNCT3_ADD_SUB => "ADD",
        FUNCT3_SLL => "SLL",
        FUNCT3_SLT => "SLT",
        FUNCT3_SLTU => "SLTU",
        FUNCT3_XOR => "XOR",
        FUNCT3_SRL_SRA if d.funct7 == FUNCT7_ALT => "SRA",
        FUNCT3_SRL_SRA => "SRL",
        FUNCT3_OR => "OR",
        FUNCT3_AND => "AND",
        _ => "UNKNOWN",
    };
    name.to_string()
}

fn op_imm_mnemonic(funct3: u32) -> String {
    let name = match funct3 {
        FUNCT3_ADD_SUB => "ADDI",
        FUNCT3_SLT => "SLTI",
        FUNCT3_SLTU => "SLTIU",
        FUNCT3_XOR => "XORI",
        FUNCT3_OR => "ORI",
        FUNCT3_AND => "ANDI",
        _ => "UNKNOWN",
    };
    name.to_string()
}

fn op_imm_shift_mnemonic(d: &Decoded) -> String {
    let name = match d.funct3 {
        FUNCT3_SLL => "SLLI",
        FUNCT3_SRL_SRA if d.funct7 == FUNCT7_ALT => "SRAI",
        FUNCT3_SRL_SRA => "SRLI",
        _ => "UNKNOWN",
    };
    name.to_string()
}

fn load_mnemonic(funct3: u32) -> String {
    let name = match funct3 {
        FUNCT3_LB => "LB",
        FUNCT3_LH => "LH",
        FUNCT3_LW => "LW",
        FUNCT3_LBU => "LBU",
        FUNCT3_LHU => "LHU",
        _ => "UNKNOWN",
    };
    name.to_string()
}

fn store_mnemonic(funct3: u32) -> String {
    let name = match funct3 {
        FUNCT3_SB => "SB",
        FUNCT3_SH => "SH",
        FUNCT3_SW => "SW",
        _ => "UNKNOWN",
    };
    name.to_string()
}

fn branch_mnemonic(funct3: u32) -> String {
    let name = match funct3 {
        FUNCT3_BEQ => "BEQ",
        FUNCT3_BNE => "BNE",
        FUNCT3_BLT => "BLT",
        FUNCT3_BGE => "BGE",
        FUNCT3_BLTU => "BLTU",
        FUNCT3_BGEU => "BGEU",
        _ => "UNKNOWN",
    };
    name.to_string()
}

fn csr_text(d: &Decoded, rd: &str, rs1: &str) -> (String, String) {
    if d.is_ecall {
        return ("ECALL".to_string(), String::new());
    }
    if d.is_mret {
        return ("MRET".to_string(), String::new());
    }
    let src = if d.csr_uses_imm {
        format!("{}", d.rs1_idx)
    } else {
        rs1.to_string()
    };
    let name = match d.csr_op {
        CsrOp::Write if d.csr_uses_imm => "CSRRWI",
        CsrOp::Write => "CSRRW",
        CsrOp::Set if d.csr_uses_imm => "CSRRSI",
        CsrOp::Set => "CSRRS",
        CsrOp::Clear if d.csr_uses_imm => "CSRRCI",
        CsrOp::Clear => "CSRRC",
        CsrOp::None => "UNKNOWN",
    };
    (name.to_string(), format!("{rd}, 0x{:03x}, {src}", d.csr_addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_renders_as_nop() {
        assert_eq!(disassemble(NOP_INST), ("NOP".to_string(), String::new()));
    }

    #[test]
    fn ecall_and_mret_special_cased() {
        assert_eq!(disassemble(ECALL_INST).0, "ECALL");
        assert_eq!(disassemble(MRET_INST).0, "MRET");
    }

    #[test]
    fn unknown_opcode_renders_unknown() {
        let (mnem, ops) = disassemble(0b1111111);
        assert_eq!(mnem, "UNKNOWN");
        assert!(ops.starts_with("unknown instruction"));
    }

    #[test]
    fn addi_renders_with_abi_names_and_immediate() {
        // addi x1, x0, 5
        let inst = (5u32 << 20) | (0 << 15) | (0 << 12) | (1 << 7) | OPCODE_OP_IMM;
        let (mnem, ops) = disassemble(inst);
        assert_eq!(mnem, "ADDI");
        assert_eq!(ops, "ra, zero, 5");
    }

    fn r_type(funct7: u32, rs2: u32, rs1: u32, funct3: u32, rd: u32, opcode: u32) -> u32 {
        (funct7 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    fn i_type(opcode: u32, funct3: u32, rd: u32, rs1: u32, imm: i32) -> u32 {
        (((imm as u32) & 0xfff) << 20) | (rs1 << 15) | (funct3 << 12) | (rd << 7) | opcode
    }

    fn s_type(funct3: u32, rs1: u32, rs2: u32, imm: i32, opcode: u32) -> u32 {
        let u = imm as u32;
        let hi = (u >> 5) & 0x7f;
        let lo = u & 0x1f;
        (hi << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (lo << 7) | opcode
    }

    fn b_type(funct3: u32, rs1: u32, rs2: u32, offset: i32) -> u32 {
        let u = offset as u32;
        let b12 = (u >> 12) & 1;
        let b11 = (u >> 11) & 1;
        let b10_5 = (u >> 5) & 0x3f;
        let b4_1 = (u >> 1) & 0xf;
        (b12 << 31) | (b10_5 << 25) | (rs2 << 20) | (rs1 << 15) | (funct3 << 12) | (b4_1 << 8) | (b11 << 7) | OPCODE_BRANCH
    }

    fn u_type(opcode: u32, rd: u32, imm20: u32) -> u32 {
        (imm20 << 12) | (rd << 7) | opcode
    }

    fn j_type(rd: u32, offset: i32) -> u32 {
        let u = offset as u32;
        let b20 = (u >> 20) & 1;
        let b19_12 = (u >> 12) & 0xff;
        let b11 = (u >> 11) & 1;
        let b10_1 = (u >> 1) & 0x3ff;
        (b20 << 31) | (b10_1 << 21) | (b11 << 20) | (b19_12 << 12) | (rd << 7) | OPCODE_JAL
    }

    /// One representative instruction per RV32I class, round-tripped
    /// through `disassemble`: the encoded operands must come back out
    /// exactly as ABI names and decimal/hex immediates, for every
    /// encoding shape (R/I/S/B/U/J) and every major opcode group.
    #[test]
    fn disassemble_round_trips_one_instruction_per_class() {
        let cases: &[(u32, &str, &str)] = &[
            // R-type: OP
            (r_type(FUNCT7_NORMAL, 2, 1, FUNCT3_ADD_SUB, 3, OPCODE_OP), "ADD", "gp, ra, sp"),
            (r_type(FUNCT7_ALT, 2, 1, FUNCT3_ADD_SUB, 3, OPCODE_OP), "SUB", "gp, ra, sp"),
            (r_type(FUNCT7_NORMAL, 2, 1, FUNCT3_AND, 3, OPCODE_OP), "AND", "gp, ra, sp"),
            // I-type: OP-IMM, including a shift variant
            (i_type(OPCODE_OP_IMM, FUNCT3_ADD_SUB, 1, 0, 5), "ADDI", "ra, zero, 5"),
            (i_type(OPCODE_OP_IMM, FUNCT3_SLL, 1, 2, 3), "SLLI", "ra, sp, 3"),
            (i_type(OPCODE_OP_IMM, FUNCT3_SRL_SRA, 1, 2, (FUNCT7_ALT << 5) as i32 | 4), "SRAI", "ra, sp, 4"),
            // I-type: LOAD
            (i_type(OPCODE_LOAD, FUNCT3_LW, 1, 2, 4), "LW", "ra, 4(sp)"),
            // S-type: STORE
            (s_type(FUNCT3_SW, 2, 1, 8, OPCODE_STORE), "SW", "ra, 8(sp)"),
            // B-type: BRANCH
            (b_type(FUNCT3_BEQ, 1, 2, 8), "BEQ", "ra, sp, 8"),
            // U-type: LUI, AUIPC
            (u_type(OPCODE_LUI, 3, 0x12345), "LUI", "gp, 0x12345"),
            (u_type(OPCODE_AUIPC, 3, 0x1), "AUIPC", "gp, 0x1"),
            // J-type: JAL
            (j_type(1, 16), "JAL", "ra, 16"),
            // I-type: JALR
            (i_type(OPCODE_JALR, 0, 2, 1, 4), "JALR", "sp, 4(ra)"),
            // SYSTEM: CSR read-modify-write, register and immediate forms
            (i_type(OPCODE_SYSTEM, 0x1, 2, 1, 0x300), "CSRRW", "sp, 0x300, ra"),
            (i_type(OPCODE_SYSTEM, 0x5, 2, 5, 0x300), "CSRRWI", "sp, 0x300, 5"),
        ];

        for &(inst, expected_mnem, expected_ops) in cases {
            let (mnem, ops) = disassemble(inst);
            assert_eq!(mnem, expected_mnem, "mnemonic mismatch for 0x{inst:08x}");
            assert_eq!(ops, expected_ops, "operand mismatch for 0x{inst:08x}");
        }
    }
}
