//! Data-emitting directives: `.byte/.half/.word/.dword/.ascii/.asciz/.string`.
//!
//! Each directive appends bytes to the data section's output buffer. A
//! bare numeric argument is emitted immediately; a symbol argument is
//! emitted as a zero placeholder with a [`Fixup`](crate::fixup::Fixup)
//! recorded for the second pass.

use riscy_core::word::Word;

use crate::error::AsmError;
use crate::fixup::{Fixup, FixupKind, Section};
use crate::token::Operand;

/// Byte width of the cells `.byte/.half/.word/.dword` emit.
fn width_of(name: &str) -> Option<u8> {
    match name {
        "byte" => Some(1),
        "half" => Some(2),
        "word" => Some(4),
        "dword" => Some(8),
        _ => None,
    }
}

/// Emits one data directive's bytes into `out`, pushing a [`Fixup`] for any
/// symbol argument. `base_offset` is `out`'s length before this call, used
/// to compute each argument's offset for fixups on multi-argument lines.
/// `little_endian` selects the byte order for `.byte/.half/.word/.dword`
/// immediate operands, matching the order [`crate::fixup::patch`] applies
/// to symbol-valued ones.
pub fn emit<W: Word>(
    file: &str,
    line_no: usize,
    name: &str,
    args: &[Operand],
    out: &mut Vec<u8>,
    fixups: &mut Vec<Fixup<W>>,
    little_endian: bool,
) -> Result<(), AsmError> {
    if let Some(width) = width_of(name) {
        for arg in args {
            let offset = out.len();
            match arg {
                Operand::Immediate(value) => {
                    let le = (*value as u64).to_le_bytes();
                    let n = width as usize;
                    if little_endian {
                        out.extend_from_slice(&le[..n]);
                    } else {
                        let mut be: Vec<u8> = le[..n].to_vec();
                        be.reverse();
                        out.extend_from_slice(&be);
                    }
                }
                Operand::Symbol(symbol) => {
                    out.extend(std::iter::repeat(0u8).take(width as usize));
                    fixups.push(Fixup {
                        section: Section::Data,
                        offset,
                        symbol: symbol.clone(),
                        kind: FixupKind::DataAbs { width },
                        decoded: riscy_core::decode::Decoded::invalid(),
                        line: line_no,
                    });
                }
                _ => {
                    return Err(AsmError::MalformedNumber {
                        file: file.to_string(),
                        line: line_no,
                        text: format!("{arg:?}"),
                    })
                }
            }
        }
        return Ok(());
    }

    match name {
        "ascii" | "asciz" | "string" => {
            for arg in args {
                let Operand::String(bytes) = arg else {
                    return Err(AsmError::MalformedNumber {
                        file: file.to_string(),
                        line: line_no,
                        text: format!("{arg:?}"),
                    });
                };
                out.extend_from_slice(bytes);
                if name != "ascii" {
                    out.push(0);
                }
            }
            Ok(())
        }
        _ => Err(AsmError::UnknownMnemonic {
            file: file.to_string(),
            line: line_no,
            mnemonic: format!(".{name}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_directive_emits_little_endian_bytes() {
        let mut out = Vec::new();
        let mut fixups: Vec<Fixup<u32>> = Vec::new();
        emit(
            "t.s",
            1,
            "word",
            &[Operand::Immediate(0x1234_5678)],
            &mut out,
            &mut fixups,
            true,
        )
        .unwrap();
        assert_eq!(out, vec![0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn word_directive_honors_big_endian() {
        let mut out = Vec::new();
        let mut fixups: Vec<Fixup<u32>> = Vec::new();
        emit(
            "t.s",
            1,
            "word",
            &[Operand::Immediate(0x1234_5678)],
            &mut out,
            &mut fixups,
            false,
        )
        .unwrap();
        assert_eq!(out, vec![0x12, 0x34, 0x56, 0x78]);
    }

    #[test]
    fn asciz_appends_null_terminator() {
        let mut out = Vec::new();
        let mut fixups: Vec<Fixup<u32>> = Vec::new();
        emit(
            "t.s",
            1,
            "asciz",
            &[Operand::String(b"hi".to_vec())],
            &mut out,
            &mut fixups,
            true,
        )
        .unwrap();
        assert_eq!(out, vec![b'h', b'i', 0]);
    }

    #[test]
    fn symbol_argument_to_dword_records_a_fixup() {
        let mut out = Vec::new();
        let mut fixups: Vec<Fixup<u32>> = Vec::new();
        emit(
            "t.s",
            1,
            "dword",
            &[Operand::Symbol("target".to_string())],
            &mut out,
            &mut fixups,
            true,
        )
        .unwrap();
        assert_eq!(out.len(), 8);
        assert_eq!(fixups.len(), 1);
        assert!(matches!(fixups[0].kind, FixupKind::DataAbs { width: 8 }));
    }
}
