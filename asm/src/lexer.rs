//! Turns one source line into a [`Line`](crate::token::Line).
//!
//! Grounded on the same approach the debugger's command language uses for
//! its own grammar (a `pest` grammar plus a small `Pairs`-walking
//! translator): the grammar recognizes shape, this module assigns meaning
//! and reports the assembler's own error taxonomy instead of a raw
//! `pest::error::Error`.

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::error::AsmError;
use crate::token::{register_alias, Directive, Instruction, Label, Line, Operand, Stmt};

#[derive(Parser)]
#[grammar = "lang.pest"]
struct Grammar;

/// Lexes a single source line. `file` and `line_no` are only used to
/// annotate errors.
pub fn lex_line(file: &str, line_no: usize, text: &str) -> Result<Line, AsmError> {
    let mut pairs = Grammar::parse(Rule::Line, text).map_err(|err| AsmError::Syntax {
        file: file.to_string(),
        line: line_no,
        cause: err.to_string(),
    })?;
    let line_pair = pairs.next().expect("Line rule always produces a pair");
    line(file, line_no, line_pair.into_inner())
}

fn line(file: &str, line_no: usize, mut pairs: Pairs<Rule>) -> Result<Line, AsmError> {
    let mut out = Line::default();
    for pair in pairs.by_ref() {
        match pair.as_rule() {
            Rule::Label => out.label = Some(label(file, line_no, pair)?),
            Rule::Stmt => out.stmt = Some(stmt(file, line_no, pair)?),
            Rule::EOI => {}
            rule => unreachable!("unexpected top-level rule {rule:?}"),
        }
    }
    Ok(out)
}

fn label(file: &str, line_no: usize, pair: Pair<Rule>) -> Result<Label, AsmError> {
    let inner = pair.into_inner().next().expect("Label has one child");
    match inner.as_rule() {
        Rule::GlobalLabel => {
            let text = inner.as_str();
            let name = text.trim_end_matches(':').to_string();
            if register_alias(&name).is_some() {
                return Err(AsmError::LabelIsRegisterAlias {
                    file: file.to_string(),
                    line: line_no,
                    symbol: name,
                });
            }
            Ok(Label::Global(name))
        }
        Rule::LocalLabel => {
            let text = inner.as_str();
            let digits = text.trim_end_matches(':');
            let n: u64 = digits.parse().expect("grammar guarantees digits");
            if n == 0 || n > 99 {
                return Err(AsmError::LocalLabelRange {
                    file: file.to_string(),
                    line: line_no,
                    number: n,
                });
            }
            Ok(Label::Local(n as u8))
        }
        rule => unreachable!("unexpected Label child {rule:?}"),
    }
}

fn stmt(file: &str, line_no: usize, pair: Pair<Rule>) -> Result<Stmt, AsmError> {
    let inner = pair.into_inner().next().expect("Stmt has one child");
    match inner.as_rule() {
        Rule::Directive => directive(file, line_no, inner).map(Stmt::Directive),
        Rule::Instruction => instruction(file, line_no, inner).map(Stmt::Instruction),
        rule => unreachable!("unexpected Stmt child {rule:?}"),
    }
}

fn directive(file: &str, line_no: usize, pair: Pair<Rule>) -> Result<Directive, AsmError> {
    let mut inner = pair.into_inner();
    let name_pair = inner.next().expect("Directive has a name");
    let name = name_pair.as_str().trim_start_matches('.').to_string();
    let mut args = Vec::new();
    if let Some(args_pair) = inner.next() {
        for arg in args_pair.into_inner() {
            args.push(operand(file, line_no, arg)?);
        }
    }
    Ok(Directive { name, args })
}

fn instruction(file: &str, line_no: usize, pair: Pair<Rule>) -> Result<Instruction, AsmError> {
    let mut inner = pair.into_inner();
    let mnemonic = inner
        .next()
        .expect("Instruction has a mnemonic")
        .as_str()
        .to_string();
    let mut operands = Vec::new();
    if let Some(ops_pair) = inner.next() {
        for op in ops_pair.into_inner() {
            operands.push(operand(file, line_no, op)?);
        }
    }
    Ok(Instruction { mnemonic, operands })
}

fn operand(file: &str, line_no: usize, pair: Pair<Rule>) -> Result<Operand, AsmError> {
    let inner = pair.into_inner().next().expect("Operand has one child");
    match inner.as_rule() {
        Rule::MemOperand => {
            let mut parts = inner.into_inner();
            let imm = int_lit(file, line_no, parts.next().expect("offset"))?;
            let reg = parts.next().expect("base register");
            let base = register(file, line_no, reg)?;
            Ok(Operand::Memory { offset: imm, base })
        }
        Rule::LocalLabelRef => {
            let text = inner.as_str();
            let forward = text.ends_with('f');
            let number: u8 = text[..text.len() - 1]
                .parse()
                .expect("grammar guarantees digits");
            Ok(Operand::LocalRef { number, forward })
        }
        Rule::Register => Ok(Operand::Register(register(file, line_no, inner)?)),
        Rule::CharLit => {
            let byte = char_lit(file, line_no, inner.as_str())?;
            Ok(Operand::Immediate(i64::from(byte)))
        }
        Rule::StringLit => {
            let bytes = string_lit(file, line_no, inner.as_str())?;
            Ok(Operand::String(bytes))
        }
        Rule::IntLit => Ok(Operand::Immediate(int_lit(file, line_no, inner)?)),
        Rule::Ident => Ok(Operand::Symbol(inner.as_str().to_string())),
        rule => unreachable!("unexpected Operand child {rule:?}"),
    }
}

fn register(file: &str, line_no: usize, pair: Pair<Rule>) -> Result<u8, AsmError> {
    let text = pair.as_str();
    if let Some(rest) = text.strip_prefix('x') {
        return rest.parse().map_err(|_| AsmError::MalformedNumber {
            file: file.to_string(),
            line: line_no,
            text: text.to_string(),
        });
    }
    register_alias(text).ok_or_else(|| AsmError::ExpectedRegister {
        file: file.to_string(),
        line: line_no,
        found: text.to_string(),
    })
}

fn int_lit(file: &str, line_no: usize, pair: Pair<Rule>) -> Result<i64, AsmError> {
    let text = pair.as_str();
    parse_int(text).ok_or_else(|| AsmError::MalformedNumber {
        file: file.to_string(),
        line: line_no,
        text: text.to_string(),
    })
}

/// Parses a decimal, `0x`, `0b`, or `0`-prefixed octal literal, with an
/// optional leading `-` on the decimal form.
fn parse_int(text: &str) -> Option<i64> {
    if let Some(rest) = text.strip_prefix("0x") {
        i64::from_str_radix(rest, 16).ok()
    } else if let Some(rest) = text.strip_prefix("0b") {
        i64::from_str_radix(rest, 2).ok()
    } else if text.len() > 1 && text.starts_with('0') && !text.starts_with("0x") {
        i64::from_str_radix(&text[1..], 8).ok()
    } else {
        text.parse().ok()
    }
}

/// Decodes the single (possibly escaped) character inside `'...'`.
fn char_lit(file: &str, line_no: usize, quoted: &str) -> Result<u8, AsmError> {
    let body = &quoted[1..quoted.len() - 1];
    let bytes = decode_escapes(file, line_no, body)?;
    match bytes.as_slice() {
        [byte] => Ok(*byte),
        _ => Err(AsmError::MultiCharLiteral {
            file: file.to_string(),
            line: line_no,
        }),
    }
}

/// Decodes the body of a `"..."` string literal.
fn string_lit(file: &str, line_no: usize, quoted: &str) -> Result<Vec<u8>, AsmError> {
    let body = &quoted[1..quoted.len() - 1];
    decode_escapes(file, line_no, body)
}

/// Expands C-style escape sequences (`\n \t \r \0 \xNN \NNN \' \" \\ \? \a
/// \b \f \v`) in `body` into raw bytes.
fn decode_escapes(file: &str, line_no: usize, body: &str) -> Result<Vec<u8>, AsmError> {
    let mut out = Vec::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let esc = chars.next().ok_or(AsmError::InvalidEscape {
            file: file.to_string(),
            line: line_no,
        })?;
        let byte = match esc {
            'n' => b'\n',
            't' => b'\t',
            'r' => b'\r',
            '0' => 0,
            '\'' => b'\'',
            '"' => b'"',
            '\\' => b'\\',
            '?' => b'?',
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0C,
            'v' => 0x0B,
            'x' => {
                let mut hex = String::new();
                for _ in 0..2 {
                    match chars.peek() {
                        Some(h) if h.is_ascii_hexdigit() => hex.push(chars.next().unwrap()),
                        _ => break,
                    }
                }
                u8::from_str_radix(&hex, 16).map_err(|_| AsmError::InvalidEscape {
                    file: file.to_string(),
                    line: line_no,
                })?
            }
            d if d.is_ascii_digit() => {
                let mut oct = String::from(d);
                for _ in 0..2 {
                    match chars.peek() {
                        Some(o) if o.is_digit(8) => oct.push(chars.next().unwrap()),
                        _ => break,
                    }
                }
                u8::from_str_radix(&oct, 8).map_err(|_| AsmError::InvalidEscape {
                    file: file.to_string(),
                    line: line_no,
                })?
            }
            _ => {
                return Err(AsmError::InvalidEscape {
                    file: file.to_string(),
                    line: line_no,
                })
            }
        };
        out.push(byte);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_global_label_and_instruction() {
        let line = lex_line("t.s", 1, "start: addi x1, x0, 5").unwrap();
        assert!(matches!(line.label, Some(Label::Global(ref n)) if n == "start"));
        let Some(Stmt::Instruction(insn)) = line.stmt else {
            panic!("expected instruction");
        };
        assert_eq!(insn.mnemonic, "addi");
        assert_eq!(insn.operands.len(), 3);
    }

    #[test]
    fn lexes_local_label_and_branch_ref() {
        let line = lex_line("t.s", 1, "1: beq x0, x0, 1b").unwrap();
        assert!(matches!(line.label, Some(Label::Local(1))));
        let Some(Stmt::Instruction(insn)) = line.stmt else {
            panic!("expected instruction");
        };
        assert!(matches!(
            insn.operands.last(),
            Some(Operand::LocalRef {
                number: 1,
                forward: false
            })
        ));
    }

    #[test]
    fn lexes_memory_operand() {
        let line = lex_line("t.s", 1, "lw x1, 4(x2)").unwrap();
        let Some(Stmt::Instruction(insn)) = line.stmt else {
            panic!("expected instruction");
        };
        assert!(matches!(
            insn.operands[1],
            Operand::Memory { offset: 4, base: 2 }
        ));
    }

    #[test]
    fn lexes_directive_with_string() {
        let line = lex_line("t.s", 1, r#".asciz "hi\n""#).unwrap();
        let Some(Stmt::Directive(dir)) = line.stmt else {
            panic!("expected directive");
        };
        assert_eq!(dir.name, "asciz");
        assert!(matches!(&dir.args[0], Operand::String(b) if b == b"hi\n"));
    }

    #[test]
    fn decodes_hex_literal() {
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("010"), Some(8));
        assert_eq!(parse_int("-5"), Some(-5));
    }

    #[test]
    fn rejects_multi_char_literal() {
        let err = lex_line("t.s", 1, "li x1, 'ab'").unwrap_err();
        assert!(matches!(err, AsmError::MultiCharLiteral { .. }));
    }
}
