//! Maps a real (non-pseudo) mnemonic and its operands onto a [`Decoded`]
//! record, inverting the same format tables `riscy_core::decode` uses to go
//! the other way.
//!
//! An operand that isn't yet a known address (a bare symbol, or a local
//! label reference) comes back as a [`SymbolRef`] alongside a `Decoded`
//! whose `imm` is a zero placeholder; the caller is responsible for
//! recording a fixup and patching it in once the symbol resolves.

use riscy_core::decode::{opcode, Decoded, Format};

use crate::error::AsmError;
use crate::token::Operand;

/// What role an unresolved operand plays, so the assembler knows which
/// [`crate::fixup::FixupKind`] to record for it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SymbolRole {
    Branch,
    Jal,
    PcRelHi,
    PcRelLo,
}

/// The symbol or local-label name an instruction's immediate still refers
/// to, plus the role that determines how it's resolved.
#[derive(Clone, Debug)]
pub struct SymbolRef {
    pub role: SymbolRole,
    pub name: String,
}

fn reg(operands: &[Operand], i: usize) -> Option<u8> {
    match operands.get(i) {
        Some(Operand::Register(r)) => Some(*r),
        _ => None,
    }
}

fn imm(operands: &[Operand], i: usize) -> Option<i64> {
    match operands.get(i) {
        Some(Operand::Immediate(v)) => Some(*v),
        _ => None,
    }
}

fn symbol_name(op: &Operand) -> Option<String> {
    match op {
        Operand::Symbol(s) => Some(s.clone()),
        Operand::LocalRef { number, forward } => {
            Some(format!("{number}{}", if *forward { 'f' } else { 'b' }))
        }
        _ => None,
    }
}

fn bad_operands(file: &str, line: usize, mnemonic: &str) -> AsmError {
    AsmError::TooManyOperands {
        file: file.to_string(),
        line,
        mnemonic: mnemonic.to_string(),
    }
}

struct RType {
    funct3: u8,
    funct7: u8,
}

fn r_type(mnemonic: &str, is_w: bool) -> Option<RType> {
    let base = match mnemonic.trim_end_matches('w') {
        "add" => RType { funct3: 0, funct7: 0 },
        "sub" => RType { funct3: 0, funct7: 32 },
        "sll" => RType { funct3: 1, funct7: 0 },
        "slt" => RType { funct3: 2, funct7: 0 },
        "sltu" => RType { funct3: 3, funct7: 0 },
        "xor" => RType { funct3: 4, funct7: 0 },
        "srl" => RType { funct3: 5, funct7: 0 },
        "sra" => RType { funct3: 5, funct7: 32 },
        "or" => RType { funct3: 6, funct7: 0 },
        "and" => RType { funct3: 7, funct7: 0 },
        _ => return None,
    };
    // slt/sltu/xor/or/and have no `_w` RV64 counterpart.
    if is_w && !matches!(base.funct3, 0 | 1 | 5) {
        return None;
    }
    Some(base)
}

struct MType {
    funct3: u8,
}

fn m_type(mnemonic: &str, is_w: bool) -> Option<MType> {
    let name = mnemonic.trim_end_matches('w');
    let funct3 = match name {
        "mul" => 0,
        "mulh" => 1,
        "mulhsu" => 2,
        "mulhu" => 3,
        "div" => 4,
        "divu" => 5,
        "rem" => 6,
        "remu" => 7,
        _ => return None,
    };
    // MULHW/MULHSUW/MULHUW don't exist.
    if is_w && matches!(funct3, 1 | 2 | 3) {
        return None;
    }
    Some(MType { funct3 })
}

struct IType {
    funct3: u8,
    shift: Option<bool>, // Some(arithmetic) for shift ops, None otherwise
}

fn i_type(mnemonic: &str) -> Option<IType> {
    let name = mnemonic.trim_end_matches('w');
    Some(match name {
        "addi" => IType { funct3: 0, shift: None },
        "slti" => IType { funct3: 2, shift: None },
        "sltiu" => IType { funct3: 3, shift: None },
        "xori" => IType { funct3: 4, shift: None },
        "ori" => IType { funct3: 6, shift: None },
        "andi" => IType { funct3: 7, shift: None },
        "slli" => IType { funct3: 1, shift: Some(false) },
        "srli" => IType { funct3: 5, shift: Some(false) },
        "srai" => IType { funct3: 5, shift: Some(true) },
        _ => return None,
    })
}

/// Builds a [`Decoded`] for one real instruction. `rv64` selects whether
/// `_w`-suffixed mnemonics and the wider register-width pseudo behaviors
/// are legal. Returns the decoded record plus an unresolved symbol
/// reference, if this instruction's immediate is still a forward operand.
pub fn build(
    file: &str,
    line: usize,
    mnemonic: &str,
    operands: &[Operand],
    rv64: bool,
) -> Result<(Decoded, Option<SymbolRef>), AsmError> {
    let is_w = rv64 && mnemonic.ends_with('w');

    // `la`/`call`/`tail` expand their low half to `addi rd, rd, %pcrel_lo(sym)`;
    // recognize that synthetic 3-operand form before the generic I-type path.
    if mnemonic == "addi" {
        if let Some(op @ Operand::Symbol(_)) = operands.get(2) {
            let rd = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let rs1 = reg(operands, 1).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let symbol = symbol_ref(file, line, mnemonic, op, SymbolRole::PcRelLo)?;
            return Ok((
                Decoded {
                    valid: true,
                    opcode: opcode::ARITH_LOG_I,
                    format: Format::I,
                    imm: 0,
                    rd,
                    rs1,
                    rs2: 0,
                    funct3: 0,
                    funct7: 0,
                },
                Some(symbol),
            ));
        }
    }

    if let Some(m) = m_type(mnemonic, is_w) {
        let rd = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
        let rs1 = reg(operands, 1).ok_or_else(|| bad_operands(file, line, mnemonic))?;
        let rs2 = reg(operands, 2).ok_or_else(|| bad_operands(file, line, mnemonic))?;
        let opc = if is_w { opcode::ARITH_LOG_R_W } else { opcode::ARITH_LOG_R };
        return Ok((
            Decoded {
                valid: true,
                opcode: opc,
                format: Format::R,
                imm: 0,
                rd,
                rs1,
                rs2,
                funct3: m.funct3,
                funct7: 1,
            },
            None,
        ));
    }

    if let Some(r) = r_type(mnemonic, is_w) {
        let rd = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
        let rs1 = reg(operands, 1).ok_or_else(|| bad_operands(file, line, mnemonic))?;
        let rs2 = reg(operands, 2).ok_or_else(|| bad_operands(file, line, mnemonic))?;
        let opc = if is_w { opcode::ARITH_LOG_R_W } else { opcode::ARITH_LOG_R };
        return Ok((
            Decoded {
                valid: true,
                opcode: opc,
                format: Format::R,
                imm: 0,
                rd,
                rs1,
                rs2,
                funct3: r.funct3,
                funct7: r.funct7,
            },
            None,
        ));
    }

    if let Some(i) = i_type(mnemonic) {
        let rd = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
        let rs1 = reg(operands, 1).ok_or_else(|| bad_operands(file, line, mnemonic))?;
        let opc = if is_w { opcode::ARITH_LOG_I_W } else { opcode::ARITH_LOG_I };
        let raw_imm = if let Some(arithmetic) = i.shift {
            let shamt = imm(operands, 2).ok_or_else(|| bad_operands(file, line, mnemonic))? as u32;
            let shamt_mask = if is_w { 0x1F } else if rv64 { 0x3F } else { 0x1F };
            let mut v = shamt & shamt_mask;
            if arithmetic {
                v |= 0x400;
            }
            v
        } else {
            let v = imm(operands, 2).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            if !(-2048..2048).contains(&v) {
                return Err(AsmError::ImmediateOutOfRange {
                    file: file.to_string(),
                    line,
                    mnemonic: mnemonic.to_string(),
                });
            }
            (v as u32) & 0xFFF
        };
        return Ok((
            Decoded {
                valid: true,
                opcode: opc,
                format: Format::I,
                imm: raw_imm,
                rd,
                rs1,
                rs2: 0,
                funct3: i.funct3,
                funct7: 0,
            },
            None,
        ));
    }

    match mnemonic {
        "lb" | "lh" | "lw" | "lbu" | "lhu" | "ld" | "lwu" => {
            let rd = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let Some(Operand::Memory { offset, base }) = operands.get(1) else {
                return Err(bad_operands(file, line, mnemonic));
            };
            let funct3 = match mnemonic {
                "lb" => 0,
                "lh" => 1,
                "lw" => 2,
                "ld" => 3,
                "lbu" => 4,
                "lhu" => 5,
                "lwu" => 6,
                _ => unreachable!(),
            };
            Ok((
                Decoded {
                    valid: true,
                    opcode: opcode::LOAD,
                    format: Format::I,
                    imm: (*offset as u32) & 0xFFF,
                    rd,
                    rs1: *base,
                    rs2: 0,
                    funct3,
                    funct7: 0,
                },
                None,
            ))
        }
        "sb" | "sh" | "sw" | "sd" => {
            let rs2 = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let Some(Operand::Memory { offset, base }) = operands.get(1) else {
                return Err(bad_operands(file, line, mnemonic));
            };
            let funct3 = match mnemonic {
                "sb" => 0,
                "sh" => 1,
                "sw" => 2,
                "sd" => 3,
                _ => unreachable!(),
            };
            Ok((
                Decoded {
                    valid: true,
                    opcode: opcode::STORE,
                    format: Format::S,
                    imm: (*offset as u32) & 0xFFF,
                    rd: 0,
                    rs1: *base,
                    rs2,
                    funct3,
                    funct7: 0,
                },
                None,
            ))
        }
        "beq" | "bne" | "blt" | "bge" | "bltu" | "bgeu" => {
            let rs1 = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let rs2 = reg(operands, 1).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let target = operands.get(2).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let funct3 = match mnemonic {
                "beq" => 0,
                "bne" => 1,
                "blt" => 4,
                "bge" => 5,
                "bltu" => 6,
                "bgeu" => 7,
                _ => unreachable!(),
            };
            let symbol = symbol_ref(file, line, mnemonic, target, SymbolRole::Branch)?;
            Ok((
                Decoded {
                    valid: true,
                    opcode: opcode::BRANCH,
                    format: Format::B,
                    imm: 0,
                    rd: 0,
                    rs1,
                    rs2,
                    funct3,
                    funct7: 0,
                },
                Some(symbol),
            ))
        }
        "lui" | "auipc" => {
            let rd = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let (raw_imm, symbol) = match operands.get(1) {
                Some(Operand::Immediate(v)) => ((*v as u32) & 0xFFFF_F000, None),
                Some(op) => {
                    let sym = symbol_ref(file, line, mnemonic, op, SymbolRole::PcRelHi)?;
                    (0, Some(sym))
                }
                None => return Err(bad_operands(file, line, mnemonic)),
            };
            let opc = if mnemonic == "lui" { opcode::LUI } else { opcode::AUIPC };
            Ok((
                Decoded {
                    valid: true,
                    opcode: opc,
                    format: Format::U,
                    imm: raw_imm,
                    rd,
                    rs1: 0,
                    rs2: 0,
                    funct3: 0,
                    funct7: 0,
                },
                symbol,
            ))
        }
        "jal" => {
            let rd = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let target = operands.get(1).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            let symbol = symbol_ref(file, line, mnemonic, target, SymbolRole::Jal)?;
            Ok((
                Decoded {
                    valid: true,
                    opcode: opcode::JAL,
                    format: Format::J,
                    imm: 0,
                    rd,
                    rs1: 0,
                    rs2: 0,
                    funct3: 0,
                    funct7: 0,
                },
                Some(symbol),
            ))
        }
        "jalr" => {
            let rd = reg(operands, 0).ok_or_else(|| bad_operands(file, line, mnemonic))?;
            // The synthetic 3-operand form `jalr rd, rs1, %pcrel_lo(sym)`,
            // produced by `call`/`tail` expansion, where `rs1` (the scratch
            // register holding the paired `auipc`'s result) differs from `rd`.
            if operands.len() == 3 {
                let rs1 = reg(operands, 1).ok_or_else(|| bad_operands(file, line, mnemonic))?;
                let op = operands.get(2).ok_or_else(|| bad_operands(file, line, mnemonic))?;
                let symbol = symbol_ref(file, line, mnemonic, op, SymbolRole::PcRelLo)?;
                return Ok((
                    Decoded {
                        valid: true,
                        opcode: opcode::JALR,
                        format: Format::I,
                        imm: 0,
                        rd,
                        rs1,
                        rs2: 0,
                        funct3: 0,
                        funct7: 0,
                    },
                    Some(symbol),
                ));
            }
            match operands.get(1) {
                Some(Operand::Memory { offset, base }) => Ok((
                    Decoded {
                        valid: true,
                        opcode: opcode::JALR,
                        format: Format::I,
                        imm: (*offset as u32) & 0xFFF,
                        rd,
                        rs1: *base,
                        rs2: 0,
                        funct3: 0,
                        funct7: 0,
                    },
                    None,
                )),
                Some(op) => {
                    let symbol = symbol_ref(file, line, mnemonic, op, SymbolRole::PcRelLo)?;
                    Ok((
                        Decoded {
                            valid: true,
                            opcode: opcode::JALR,
                            format: Format::I,
                            imm: 0,
                            rd,
                            rs1: rd,
                            rs2: 0,
                            funct3: 0,
                            funct7: 0,
                        },
                        Some(symbol),
                    ))
                }
                None => Err(bad_operands(file, line, mnemonic)),
            }
        }
        "ecall" => Ok((env_insn(0), None)),
        "ebreak" => Ok((env_insn(1), None)),
        _ => Err(AsmError::UnknownMnemonic {
            file: file.to_string(),
            line,
            mnemonic: mnemonic.to_string(),
        }),
    }
}

fn env_insn(imm: u32) -> Decoded {
    Decoded {
        valid: true,
        opcode: opcode::ENVIRONMENT,
        format: Format::I,
        imm,
        rd: 0,
        rs1: 0,
        rs2: 0,
        funct3: 0,
        funct7: 0,
    }
}

fn symbol_ref(
    file: &str,
    line: usize,
    mnemonic: &str,
    op: &Operand,
    role: SymbolRole,
) -> Result<SymbolRef, AsmError> {
    symbol_name(op)
        .map(|name| SymbolRef { role, name })
        .ok_or_else(|| bad_operands(file, line, mnemonic))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addi_builds_matching_decoded() {
        let ops = vec![Operand::Register(1), Operand::Register(0), Operand::Immediate(5)];
        let (d, sym) = build("t.s", 1, "addi", &ops, false).unwrap();
        assert_eq!(riscy_core::decode::encode(&d), 0x0050_0093);
        assert!(sym.is_none());
    }

    #[test]
    fn srai_sets_bit_10_of_imm() {
        let ops = vec![Operand::Register(1), Operand::Register(1), Operand::Immediate(3)];
        let (d, _) = build("t.s", 1, "srai", &ops, false).unwrap();
        assert_eq!(d.imm, 0x403);
    }

    #[test]
    fn srli_leaves_bit_10_clear() {
        let ops = vec![Operand::Register(1), Operand::Register(1), Operand::Immediate(3)];
        let (d, _) = build("t.s", 1, "srli", &ops, false).unwrap();
        assert_eq!(d.imm, 3);
    }

    #[test]
    fn beq_with_symbol_operand_returns_branch_role() {
        let ops = vec![
            Operand::Register(1),
            Operand::Register(2),
            Operand::Symbol("loop".to_string()),
        ];
        let (_, sym) = build("t.s", 1, "beq", &ops, false).unwrap();
        assert!(matches!(sym, Some(SymbolRef { role: SymbolRole::Branch, .. })));
    }

    #[test]
    fn mul_uses_funct7_one() {
        let ops = vec![Operand::Register(3), Operand::Register(1), Operand::Register(2)];
        let (d, _) = build("t.s", 1, "mul", &ops, false).unwrap();
        assert_eq!(d.funct7, 1);
        assert_eq!(d.funct3, 0);
    }

    #[test]
    fn unknown_mnemonic_is_rejected() {
        let err = build("t.s", 1, "frobnicate", &[], false).unwrap_err();
        assert!(matches!(err, AsmError::UnknownMnemonic { .. }));
    }
}
