//! Pure instruction decode: maps a raw 32-bit word to the control signals
//! and immediate that the ID stage latches into `IDEX_t`. Shared by the
//! pipeline's ID stage and the single-cycle model so the two can never
//! drift apart on what a given encoding means.

use crate::common::bits;
use crate::isa::opcodes::*;

/// Selects the writeback source multiplexer input, mirrors `IDEX_t.wb_sel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WbSel {
    #[default]
    Alu = 0,
    PcPlus4 = 1,
    Mem = 2,
    Csr = 3,
}

/// Selects the data-memory operation, mirrors `IDEX_t.mem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemOp {
    #[default]
    None = 0,
    Load = 1,
    Store = 2,
}

/// CSR read-modify-write flavor for `CSRRW`/`CSRRS`/`CSRRC` and their
/// immediate variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsrOp {
    #[default]
    None,
    Write,
    Set,
    Clear,
}

/// The fully-decoded control signals and fields for one instruction.
/// Everything here is stateless and derived purely from `inst`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Decoded {
    pub opcode: u32,
    pub funct3: u32,
    pub funct7: u32,
    pub rd: u32,
    pub rs1_idx: u32,
    pub rs2_idx: u32,
    pub imm: i32,
    pub we: bool,
    pub wb_sel: WbSel,
    pub mem: MemOp,
    pub is_branch: bool,
    /// JAL/JALR: EX asserts `take_branch` unconditionally.
    pub is_jump: bool,
    pub is_auipc: bool,
    pub is_lui: bool,
    pub is_ecall: bool,
    pub is_mret: bool,
    pub csr_op: CsrOp,
    pub csr_addr: u16,
    /// CSRRWI/CSRRSI/CSRRCI: the `rs1` field is a 5-bit zero-extended
    /// immediate, not a register index.
    pub csr_uses_imm: bool,
    /// Set when no (opcode, funct3, funct7) table entry matches. The ID
    /// stage is responsible for deciding whether this should actually
    /// raise (it must not raise for the bubble NOP, which always decodes
    /// legally).
    pub illegal: bool,
}

/// Decodes `inst` into its control signals. Never panics: unrecognized
/// encodings come back with `illegal: true` and otherwise-default fields.
pub fn decode(inst: u32) -> Decoded {
    let opcode = bits::opcode(inst);
    let funct3 = bits::funct3(inst);
    let funct7 = bits::funct7(inst);
    let rd = bits::rd(inst);
    let rs1_idx = bits::rs1(inst);
    let rs2_idx = bits::rs2(inst);

    let mut d = Decoded {
        opcode,
        funct3,
        funct7,
        rd,
        rs1_idx,
        rs2_idx,
        ..Decoded::default()
    };

    match opcode {
        OPCODE_OP_IMM => {
            d.imm = bits::imm_i(inst);
            d.we = true;
            d.wb_sel = WbSel::Alu;
        }
        OPCODE_OP => {
            d.we = true;
            d.wb_sel = WbSel::Alu;
        }
        OPCODE_LOAD => {
            d.imm = bits::imm_i(inst);
            d.we = true;
            d.wb_sel = WbSel::Mem;
            d.mem = MemOp::Load;
            d.illegal = !matches!(funct3, FUNCT3_LB | FUNCT3_LH | FUNCT3_LW | FUNCT3_LBU | FUNCT3_LHU);
        }
        OPCODE_STORE => {
            d.imm = bits::imm_s(inst);
            d.mem = MemOp::Store;
            d.illegal = !matches!(funct3, FUNCT3_SB | FUNCT3_SH | FUNCT3_SW);
        }
        OPCODE_BRANCH => {
            d.imm = bits::imm_b(inst);
            d.is_branch = true;
            d.illegal = !matches!(
                funct3,
                FUNCT3_BEQ | FUNCT3_BNE | FUNCT3_BLT | FUNCT3_BGE | FUNCT3_BLTU | FUNCT3_BGEU
            );
        }
        OPCODE_LUI => {
            d.imm = bits::imm_u(inst);
            d.we = true;
            d.wb_sel = WbSel::Alu;
            d.is_lui = true;
        }
        OPCODE_AUIPC => {
            d.imm = bits::imm_u(inst);
            d.we = true;
            d.wb_sel = WbSel::Alu;
            d.is_auipc = true;
        }
        OPCODE_JAL => {
            d.imm = bits::imm_j(inst);
            d.we = true;
            d.wb_sel = WbSel::PcPlus4;
            d.is_jump = true;
        }
        OPCODE_JALR => {
            d.imm = bits::imm_i(inst);
            d.we = true;
            d.wb_sel = WbSel::PcPlus4;
            d.is_jump = true;
            d.illegal = funct3 != 0;
        }
        OPCODE_SYSTEM => decode_system(inst, funct3, &mut d),
        _ => d.illegal = true,
    }

    d
}

fn decode_system(inst: u32, funct3: u32, d: &mut Decoded) {
    if funct3 == 0 {
        let imm12 = bits::field(inst, 31, 20);
        match imm12 {
            SYSTEM_IMM_ECALL => d.is_ecall = true,
            SYSTEM_IMM_MRET => d.is_mret = true,
            _ => d.illegal = true,
        }
        return;
    }

    d.csr_addr = bits::field(inst, 31, 20) as u16;
    d.we = true;
    d.wb_sel = WbSel::Csr;
    match funct3 {
        0x1 => d.csr_op = CsrOp::Write,
        0x2 => d.csr_op = CsrOp::Set,
        0x3 => d.csr_op = CsrOp::Clear,
        0x5 => {
            d.csr_op = CsrOp::Write;
            d.csr_uses_imm = true;
        }
        0x6 => {
            d.csr_op = CsrOp::Set;
            d.csr_uses_imm = true;
        }
        0x7 => {
            d.csr_op = CsrOp::Clear;
            d.csr_uses_imm = true;
        }
        _ => d.illegal = true,
    }
}
