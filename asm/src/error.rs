//! The assembler's error taxonomy.
//!
//! Every variant carries the source file and line number so the top-level
//! driver can print "`file`:`line`: `cause`" without threading that context
//! through every call site. File handles are never held across an error
//! boundary: the driver reads the whole source into a `String` up front and
//! writes output at the very end, so there is nothing to explicitly close.

use thiserror::Error;

/// An error produced while lexing, assembling, or resolving a source file.
#[derive(Debug, Error)]
pub enum AsmError {
    #[error("{file}:{line}: syntax error: {cause}")]
    Syntax {
        file: String,
        line: usize,
        cause: String,
    },
    #[error("{file}:{line}: invalid escape sequence")]
    InvalidEscape { file: String, line: usize },
    #[error("{file}:{line}: unclosed quote or parenthesis")]
    Unclosed { file: String, line: usize },
    #[error("{file}:{line}: character literal must contain exactly one character")]
    MultiCharLiteral { file: String, line: usize },
    #[error("{file}:{line}: too many operands for `{mnemonic}`")]
    TooManyOperands {
        file: String,
        line: usize,
        mnemonic: String,
    },
    #[error("{file}:{line}: malformed numeric literal `{text}`")]
    MalformedNumber {
        file: String,
        line: usize,
        text: String,
    },
    #[error("{file}:{line}: duplicate symbol `{symbol}`")]
    DuplicateSymbol {
        file: String,
        line: usize,
        symbol: String,
    },
    #[error("{file}:{line}: label `{symbol}` collides with a register alias")]
    LabelIsRegisterAlias {
        file: String,
        line: usize,
        symbol: String,
    },
    #[error("{file}:{line}: local label `{number}` out of range (1-99)")]
    LocalLabelRange {
        file: String,
        line: usize,
        number: u64,
    },
    #[error("{file}:{line}: immediate out of range for `{mnemonic}`")]
    ImmediateOutOfRange {
        file: String,
        line: usize,
        mnemonic: String,
    },
    #[error("{file}: unresolved forward reference to `{symbol}` (from line {line})")]
    UnresolvedReference {
        file: String,
        line: usize,
        symbol: String,
    },
    #[error("{file}:{line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic {
        file: String,
        line: usize,
        mnemonic: String,
    },
    #[error("{file}:{line}: register operand expected, found `{found}`")]
    ExpectedRegister {
        file: String,
        line: usize,
        found: String,
    },
    #[error("could not read `{file}`: {cause}")]
    Io { file: String, cause: String },
}

pub type Result<T, E = AsmError> = std::result::Result<T, E>;
