//! The M (integer multiply/divide) extension.

use crate::decode::{opcode, Decoded, Format};
use crate::ext::{Extension, ExtState};
use crate::mul::{
    divide_signed, divide_unsigned, multiply_signed, multiply_signed_unsigned, multiply_unsigned,
};
use crate::word::Word;

/// `funct3` values for the eight R-type M-extension operations.
mod funct3 {
    pub const MUL: u8 = 0;
    pub const MULH: u8 = 1;
    pub const MULHSU: u8 = 2;
    pub const MULHU: u8 = 3;
    pub const DIV: u8 = 4;
    pub const DIVU: u8 = 5;
    pub const REM: u8 = 6;
    pub const REMU: u8 = 7;
}

/// `funct7` identifying the M extension within `ARITH_LOG_R`/`_W`.
const M_FUNCT7: u8 = 1;

/// Whether RV64's word-narrowed `_W` opcodes should be recognized. RV32
/// variants construct this with `word_variant = false`.
#[derive(Clone, Copy, Debug, Default)]
pub struct M {
    pub word_variant: bool,
}

impl M {
    #[must_use]
    pub fn new(word_variant: bool) -> Self {
        Self { word_variant }
    }
}

impl<W: Word> Extension<W> for M {
    fn name(&self) -> &'static str {
        "M"
    }

    fn decode(&self, word: u32) -> Option<Decoded> {
        let op = (word & 0x7F) as u8;
        let is_w = self.word_variant && op == opcode::ARITH_LOG_R_W;
        if op != opcode::ARITH_LOG_R && !is_w {
            return None;
        }
        let funct7 = ((word >> 25) & 0x7F) as u8;
        if funct7 != M_FUNCT7 {
            return None;
        }
        let funct3 = ((word >> 12) & 0x7) as u8;
        if is_w && !matches!(funct3, funct3::MUL | funct3::DIV | funct3::DIVU | funct3::REM | funct3::REMU) {
            // MULHW/MULHSUW/MULHUW don't exist in the ISA.
            return None;
        }
        Some(Decoded {
            valid: true,
            opcode: op,
            format: Format::R,
            imm: 0,
            rd: ((word >> 7) & 0x1F) as u8,
            rs1: ((word >> 15) & 0x1F) as u8,
            rs2: ((word >> 20) & 0x1F) as u8,
            funct3,
            funct7,
        })
    }

    fn execute(&mut self, insn: &Decoded, state: &mut ExtState<'_, W>) -> bool {
        let a = state.regs.load(insn.rs1);
        let b = state.regs.load(insn.rs2);
        let is_w = self.word_variant && insn.opcode == opcode::ARITH_LOG_R_W;
        let result = if is_w {
            word_variant_op::<W>(insn.funct3, a, b)
        } else {
            full_width_op(insn.funct3, a, b)
        };
        let Some(result) = result else {
            return false;
        };
        state.regs.store(insn.rd, result);
        true
    }
}

fn full_width_op<W: Word>(funct3: u8, a: W, b: W) -> Option<W> {
    Some(match funct3 {
        funct3::MUL => multiply_unsigned(a, b).1,
        funct3::MULH => multiply_signed(a, b).0,
        funct3::MULHSU => multiply_signed_unsigned(a, b).0,
        funct3::MULHU => multiply_unsigned(a, b).0,
        funct3::DIV => divide_signed(a, b).0,
        funct3::DIVU => divide_unsigned(a, b).0,
        funct3::REM => divide_signed(a, b).1,
        funct3::REMU => divide_unsigned(a, b).1,
        _ => return None,
    })
}

/// `-W` forms operate on the low 32 bits, extended to 64 (signed ops
/// sign-extend, unsigned ops zero-extend), then sign-extend the 32-bit
/// result back to `W`. Only meaningful when `W = u64`; RV32 never asks for
/// the word-variant opcodes.
fn word_variant_op<W: Word>(funct3: u8, a: W, b: W) -> Option<W> {
    let a32 = a.to_u64() as u32;
    let b32 = b.to_u64() as u32;
    let result32: u32 = match funct3 {
        funct3::MUL => a32.wrapping_mul(b32),
        funct3::DIV => {
            if b32 == 0 {
                u32::MAX
            } else if a32 == 0x8000_0000 && b32 == 0xFFFF_FFFF {
                a32
            } else {
                ((a32 as i32).wrapping_div(b32 as i32)) as u32
            }
        }
        funct3::DIVU => {
            if b32 == 0 {
                u32::MAX
            } else {
                a32 / b32
            }
        }
        funct3::REM => {
            if b32 == 0 {
                a32
            } else if a32 == 0x8000_0000 && b32 == 0xFFFF_FFFF {
                0
            } else {
                ((a32 as i32).wrapping_rem(b32 as i32)) as u32
            }
        }
        funct3::REMU => {
            if b32 == 0 {
                a32
            } else {
                a32 % b32
            }
        }
        _ => return None,
    };
    Some(W::from_i64(i64::from(result32 as i32)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reg::RegisterFile;

    #[test]
    fn decode_recognizes_mul_funct7_one() {
        // MUL x3, x1, x2 = funct7=1, rs2=2, rs1=1, funct3=0, rd=3, opcode=0x33
        let word = (1u32 << 25) | (2 << 20) | (1 << 15) | (0 << 12) | (3 << 7) | 0x33;
        let m = M::new(false);
        let d = Extension::<u32>::decode(&m, word).expect("should decode");
        assert_eq!(d.funct3, funct3::MUL);
        assert_eq!(d.rs1, 1);
        assert_eq!(d.rs2, 2);
        assert_eq!(d.rd, 3);
    }

    #[test]
    fn execute_mul_writes_low_word_product() {
        let mut regs = RegisterFile::<u32>::rv_i();
        regs.store(1, 6);
        regs.store(2, 7);
        let mut m = M::new(false);
        let insn = Decoded {
            valid: true,
            opcode: opcode::ARITH_LOG_R,
            format: Format::R,
            imm: 0,
            rd: 3,
            rs1: 1,
            rs2: 2,
            funct3: funct3::MUL,
            funct7: M_FUNCT7,
        };
        let mut state = ExtState { regs: &mut regs };
        assert!(Extension::<u32>::execute(&mut m, &insn, &mut state));
        assert_eq!(state.regs.load(3), 42);
    }
}
