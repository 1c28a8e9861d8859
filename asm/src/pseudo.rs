//! Expands pseudo-instructions into one or more real instructions.
//!
//! Anything not recognized here passes through unchanged; [`crate::table`]
//! is the one that finally rejects a truly unknown mnemonic.

use crate::error::AsmError;
use crate::fixup::pcrel_hi_lo;
use crate::token::Operand;

const ZERO: u8 = 0;
const RA: u8 = 1;
const T1: u8 = 6;
const T6: u8 = 31;

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

fn symbol_operand(operands: &[Operand], i: usize) -> Option<Operand> {
    match operands.get(i) {
        op @ Some(Operand::Symbol(_)) | op @ Some(Operand::LocalRef { .. }) => op.cloned(),
        _ => None,
    }
}

fn bad(file: &str, line: usize, mnemonic: &str) -> AsmError {
    AsmError::TooManyOperands {
        file: file.to_string(),
        line,
        mnemonic: mnemonic.to_string(),
    }
}

/// Expands `li rd, imm` for a 12-bit-fit, 32-bit-fit, or (RV64 only) the
/// wider value that needs `t6` as scratch.
fn expand_li(rd: u8, value: i64, rv64: bool) -> Vec<(String, Vec<Operand>)> {
    if (-2048..2048).contains(&value) {
        return vec![addi(rd, ZERO, value)];
    }
    if !rv64 || i32::try_from(value).is_ok() {
        return expand_li32(rd, value);
    }

    // 64-bit case: split into a high part (shifted left 32) and a low
    // 32-bit part, each loaded independently, combined by an `add` that
    // relies on plain two's-complement wraparound.
    let lower = i64::from(value as i32);
    let upper = (value - lower) >> 32;
    let mut seq = expand_li32(rd, upper);
    seq.push((
        "slli".to_string(),
        vec![Operand::Register(rd), Operand::Register(rd), Operand::Immediate(32)],
    ));
    seq.extend(expand_li32(T6, lower));
    seq.push((
        "add".to_string(),
        vec![Operand::Register(rd), Operand::Register(rd), Operand::Register(T6)],
    ));
    seq
}

/// Loads a value known to fit in 32 bits into `rd`: either `addi` alone, or
/// `lui` + `addi` using the same `%hi`/`%lo` rounding as PC-relative pairs.
fn expand_li32(rd: u8, value: i64) -> Vec<(String, Vec<Operand>)> {
    if (-2048..2048).contains(&value) {
        return vec![addi(rd, ZERO, value)];
    }
    let (hi, lo) = pcrel_hi_lo(value);
    vec![
        ("lui".to_string(), vec![Operand::Register(rd), Operand::Immediate(hi)]),
        addi(rd, rd, lo),
    ]
}

fn addi(rd: u8, rs1: u8, value: i64) -> (String, Vec<Operand>) {
    (
        "addi".to_string(),
        vec![Operand::Register(rd), Operand::Register(rs1), Operand::Immediate(value)],
    )
}

fn branch(name: &str, rs1: u8, rs2: u8, target: Operand) -> (String, Vec<Operand>) {
    (
        name.to_string(),
        vec![Operand::Register(rs1), Operand::Register(rs2), target],
    )
}

/// Expands `la rd, sym` / `call sym` / `tail sym` into an `auipc` paired
/// with a second instruction that completes the PC-relative address: both
/// reference the same symbol, the first (`%pcrel_hi`) at this instruction's
/// own address, the second (`%pcrel_lo`) relative to it.
fn expand_pcrel_pair(
    hi_rd: u8,
    lo_op: &str,
    lo_rd: u8,
    lo_rs1: u8,
    symbol: Operand,
) -> Vec<(String, Vec<Operand>)> {
    vec![
        ("auipc".to_string(), vec![Operand::Register(hi_rd), symbol.clone()]),
        (
            lo_op.to_string(),
            vec![Operand::Register(lo_rd), Operand::Register(lo_rs1), symbol],
        ),
    ]
}

/// Expands one pseudo-instruction. `rv64` gates `sext.w`/`zext.w` and the
/// 64-bit `li` case; `xlen` is 32 or 64, used by the `sext`/`zext` shift
/// amounts.
pub fn expand(
    file: &str,
    line: usize,
    mnemonic: &str,
    operands: &[Operand],
    rv64: bool,
) -> Result<Vec<(String, Vec<Operand>)>, AsmError> {
    let xlen: i64 = if rv64 { 64 } else { 32 };

    let out = match mnemonic {
        "li" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let value = imm(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            expand_li(rd, value, rv64)
        }
        "mv" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            vec![addi(rd, rs, 0)]
        }
        "nop" => vec![addi(ZERO, ZERO, 0)],
        "neg" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            vec![(
                "sub".to_string(),
                vec![Operand::Register(rd), Operand::Register(ZERO), Operand::Register(rs)],
            )]
        }
        "not" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            vec![(
                "xori".to_string(),
                vec![Operand::Register(rd), Operand::Register(rs), Operand::Immediate(-1)],
            )]
        }
        "seqz" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            vec![(
                "sltiu".to_string(),
                vec![Operand::Register(rd), Operand::Register(rs), Operand::Immediate(1)],
            )]
        }
        "snez" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            vec![(
                "sltu".to_string(),
                vec![Operand::Register(rd), Operand::Register(ZERO), Operand::Register(rs)],
            )]
        }
        "sext.b" | "sext.h" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            let width = if mnemonic == "sext.b" { 8 } else { 16 };
            let shift = xlen - width;
            vec![
                (
                    "slli".to_string(),
                    vec![Operand::Register(rd), Operand::Register(rs), Operand::Immediate(shift)],
                ),
                (
                    "srai".to_string(),
                    vec![Operand::Register(rd), Operand::Register(rd), Operand::Immediate(shift)],
                ),
            ]
        }
        "sext.w" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            vec![("addiw".to_string(), vec![Operand::Register(rd), Operand::Register(rs), Operand::Immediate(0)])]
        }
        "zext.b" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            vec![(
                "andi".to_string(),
                vec![Operand::Register(rd), Operand::Register(rs), Operand::Immediate(0xFF)],
            )]
        }
        "zext.h" | "zext.w" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let rs = reg(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            let shift = if mnemonic == "zext.h" { xlen - 16 } else { 32 };
            vec![
                (
                    "slli".to_string(),
                    vec![Operand::Register(rd), Operand::Register(rs), Operand::Immediate(shift)],
                ),
                (
                    "srli".to_string(),
                    vec![Operand::Register(rd), Operand::Register(rd), Operand::Immediate(shift)],
                ),
            ]
        }
        "j" => {
            let target = operands.first().cloned().ok_or_else(|| bad(file, line, mnemonic))?;
            vec![("jal".to_string(), vec![Operand::Register(ZERO), target])]
        }
        "jr" => {
            let rs = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            vec![(
                "jalr".to_string(),
                vec![Operand::Register(ZERO), Operand::Memory { offset: 0, base: rs }],
            )]
        }
        "ret" => vec![(
            "jalr".to_string(),
            vec![Operand::Register(ZERO), Operand::Memory { offset: 0, base: RA }],
        )],
        "call" => {
            let target = symbol_operand(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            expand_pcrel_pair(T1, "jalr", RA, T1, target)
        }
        "tail" => {
            let target = symbol_operand(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            expand_pcrel_pair(T1, "jalr", ZERO, T1, target)
        }
        "la" => {
            let rd = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let target = symbol_operand(operands, 1).ok_or_else(|| bad(file, line, mnemonic))?;
            expand_pcrel_pair(rd, "addi", rd, rd, target)
        }
        "beqz" | "bnez" | "blez" | "bgez" | "bltz" | "bgtz" => {
            let rs = reg(operands, 0).ok_or_else(|| bad(file, line, mnemonic))?;
            let target = operands.get(1).cloned().ok_or_else(|| bad(file, line, mnemonic))?;
            match mnemonic {
                "beqz" => vec![branch("beq", rs, ZERO, target)],
                "bnez" => vec![branch("bne", rs, ZERO, target)],
                "blez" => vec![branch("bge", ZERO, rs, target)],
                "bgez" => vec![branch("bge", rs, ZERO, target)],
                "bltz" => vec![branch("blt", rs, ZERO, target)],
                "bgtz" => vec![branch("blt", ZERO, rs, target)],
                _ => unreachable!(),
            }
        }
        _ => vec![(mnemonic.to_string(), operands.to_vec())],
    };
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn li_small_value_is_one_addi() {
        let seq = expand_li(5, 100, false);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].0, "addi");
    }

    #[test]
    fn li_32_bit_value_is_lui_addi() {
        let seq = expand_li(5, 0x1234_5000, false);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].0, "lui");
        assert_eq!(seq[1].0, "addi");
    }

    #[test]
    fn li_64_bit_value_uses_t6_and_add() {
        let seq = expand_li(5, 0x1234_5678_9ABC_DEF0u64 as i64, true);
        assert_eq!(seq.last().unwrap().0, "add");
        assert!(seq.iter().any(|(m, _)| m == "slli"));
        assert!(seq
            .iter()
            .any(|(_, ops)| ops.iter().any(|o| matches!(o, Operand::Register(31)))));
    }

    #[test]
    fn ret_expands_to_jalr_x0_0_ra() {
        let seq = expand("t.s", 1, "ret", &[], false).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].0, "jalr");
        assert!(matches!(seq[0].1[1], Operand::Memory { offset: 0, base: 1 }));
    }

    #[test]
    fn la_expands_to_auipc_addi_pair_sharing_symbol() {
        let ops = vec![Operand::Register(10), Operand::Symbol("buf".to_string())];
        let seq = expand("t.s", 1, "la", &ops, false).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].0, "auipc");
        assert_eq!(seq[1].0, "addi");
    }

    #[test]
    fn beqz_becomes_beq_against_x0() {
        let ops = vec![Operand::Register(5), Operand::Symbol("loop".to_string())];
        let seq = expand("t.s", 1, "beqz", &ops, false).unwrap();
        assert_eq!(seq[0].0, "beq");
        assert!(matches!(seq[0].1[1], Operand::Register(0)));
    }
}
