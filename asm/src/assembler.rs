//! The two-pass driver: lexes every line, expands pseudo-instructions,
//! encodes real ones, and resolves symbols via a single forward scan plus
//! a [`crate::fixup`] vector instead of the original's checkpoint-and-replay.
//!
//! Local numeric labels resolve inline as the scan passes over them:
//! backward references (`Nb`) are patched the moment they're lexed, since
//! the label they name must already have a definition; forward references
//! (`Nf`) are queued and patched the moment the matching `N:` is reached.
//! Global symbols, which can be referenced before they're defined anywhere
//! in the file, are deferred to a final resolution pass over the fixup
//! vector once the whole file has been scanned.

use std::collections::HashMap;

use riscy_core::decode::encode;
use riscy_core::loader::Regions;
use riscy_core::mem::Endian;
use riscy_core::word::Word;

use crate::directive;
use crate::error::AsmError;
use crate::fixup::{self, Fixup, FixupKind, Section};
use crate::lexer::lex_line;
use crate::pseudo;
use crate::symtab::SymTab;
use crate::table::{self, SymbolRole};
use crate::token::{Label, Line, Stmt};

/// Output of assembling one source file: the instruction stream and the
/// data-directive stream, each as raw bytes ready for the loader.
pub struct Assembled {
    pub program: Vec<u8>,
    pub data: Vec<u8>,
}

/// Assembles `source` (the contents of one `.s` file). `rv64` selects the
/// `_w`-suffixed real mnemonics and the wider `li`/`sext`/`zext` forms;
/// `little_endian` must match the target machine's configured endianness.
pub fn assemble<W: Word>(
    file: &str,
    source: &str,
    rv64: bool,
    little_endian: bool,
) -> Result<Assembled, AsmError> {
    let (program_base, data_base) = section_bases::<W>();

    let mut program = Vec::new();
    let mut data = Vec::new();
    let mut symtab = SymTab::<W>::new();
    let mut local_defs: HashMap<u8, W> = HashMap::new();
    let mut pending_forward: HashMap<u8, Vec<Fixup<W>>> = HashMap::new();
    let mut global_fixups: Vec<Fixup<W>> = Vec::new();
    let mut pending_labels: Vec<Label> = Vec::new();

    for (i, text) in source.lines().enumerate() {
        let line_no = i + 1;
        let Line { label, stmt } = lex_line(file, line_no, text)?;

        if let Some(label) = label {
            pending_labels.push(label);
        }

        let Some(stmt) = stmt else { continue };

        let addr = match &stmt {
            Stmt::Directive(_) => data_base.wrapping_add(W::from_u64(data.len() as u64)),
            Stmt::Instruction(_) => program_base.wrapping_add(W::from_u64(program.len() as u64)),
        };
        for label in pending_labels.drain(..) {
            define_label(
                file,
                line_no,
                label,
                addr,
                &mut symtab,
                &mut local_defs,
                &mut pending_forward,
                if matches!(stmt, Stmt::Directive(_)) { &mut data } else { &mut program },
                little_endian,
            )?;
        }

        match stmt {
            Stmt::Directive(dir) => {
                let mut fixups = Vec::new();
                directive::emit(
                    file,
                    line_no,
                    &dir.name,
                    &dir.args,
                    &mut data,
                    &mut fixups,
                    little_endian,
                )?;
                global_fixups.extend(fixups);
            }
            Stmt::Instruction(insn) => {
                for (mnemonic, operands) in pseudo::expand(file, line_no, &insn.mnemonic, &insn.operands, rv64)? {
                    let pc = program_base.wrapping_add(W::from_u64(program.len() as u64));
                    let (decoded, symbol) = table::build(file, line_no, &mnemonic, &operands, rv64)?;
                    let offset = program.len();
                    let word = encode(&decoded);
                    let bytes = if little_endian { word.to_le_bytes() } else { word.to_be_bytes() };
                    program.extend_from_slice(&bytes);

                    let Some(symbol) = symbol else { continue };
                    let kind = match symbol.role {
                        SymbolRole::Branch => FixupKind::Branch { pc },
                        SymbolRole::Jal => FixupKind::Jal { pc },
                        SymbolRole::PcRelHi => FixupKind::PcRelHi20 { pc },
                        SymbolRole::PcRelLo => FixupKind::PcRelLo12 { pc_of_hi: pc.wrapping_sub(W::from_u64(4)) },
                    };
                    let fixup = Fixup {
                        section: Section::Program,
                        offset,
                        symbol: symbol.name.clone(),
                        kind,
                        decoded,
                        line: line_no,
                    };
                    resolve_or_defer(
                        file,
                        fixup,
                        &symtab,
                        &local_defs,
                        &mut pending_forward,
                        &mut global_fixups,
                        &mut program,
                        little_endian,
                    )?;
                }
            }
        }
    }

    if let Some((&number, _)) = pending_forward.iter().find(|(_, v)| !v.is_empty()) {
        let fixup = &pending_forward[&number][0];
        return Err(AsmError::UnresolvedReference {
            file: file.to_string(),
            line: fixup.line,
            symbol: format!("{number}f"),
        });
    }

    for fixup in &global_fixups {
        let Some(addr) = symtab.get(&fixup.symbol) else {
            return Err(AsmError::UnresolvedReference {
                file: file.to_string(),
                line: fixup.line,
                symbol: fixup.symbol.clone(),
            });
        };
        let buf = match fixup.section {
            Section::Program => &mut program,
            Section::Data => &mut data,
        };
        fixup::patch(buf, fixup, addr, little_endian);
    }

    Ok(Assembled { program, data })
}

/// The fixed base addresses local/global symbols resolve against: the
/// user-program and global-data regions from the loader's memory map.
/// This assembler targets the one machine `spec.md` describes, not a
/// relocatable object format, so these addresses double as link-time
/// bases.
fn section_bases<W: Word>() -> (W, W) {
    if W::BITS == 64 {
        let regions = Regions::<u64>::rv64_default();
        (
            W::from_u64(regions.user_program.start),
            W::from_u64(regions.global_data.start),
        )
    } else {
        let regions = Regions::<u32>::rv32_default();
        (
            W::from_u64(u64::from(regions.user_program.start)),
            W::from_u64(u64::from(regions.global_data.start)),
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn define_label<W: Word>(
    file: &str,
    line_no: usize,
    label: Label,
    addr: W,
    symtab: &mut SymTab<W>,
    local_defs: &mut HashMap<u8, W>,
    pending_forward: &mut HashMap<u8, Vec<Fixup<W>>>,
    buf: &mut Vec<u8>,
    little_endian: bool,
) -> Result<(), AsmError> {
    match label {
        Label::Global(name) => {
            if !symtab.define(&name, addr) {
                return Err(AsmError::DuplicateSymbol {
                    file: file.to_string(),
                    line: line_no,
                    symbol: name,
                });
            }
        }
        Label::Local(number) => {
            local_defs.insert(number, addr);
            for fixup in pending_forward.remove(&number).unwrap_or_default() {
                fixup::patch(buf, &fixup, addr, little_endian);
            }
        }
    }
    Ok(())
}

/// Resolves `fixup` now if it names a local backward reference or an
/// already-defined local forward one; queues it for later otherwise
/// (global symbols always defer to the end-of-file pass; unmet local
/// forward references wait on [`define_label`]).
#[allow(clippy::too_many_arguments)]
fn resolve_or_defer<W: Word>(
    file: &str,
    fixup: Fixup<W>,
    symtab: &SymTab<W>,
    local_defs: &HashMap<u8, W>,
    pending_forward: &mut HashMap<u8, Vec<Fixup<W>>>,
    global_fixups: &mut Vec<Fixup<W>>,
    program: &mut [u8],
    little_endian: bool,
) -> Result<(), AsmError> {
    if let Some(rest) = fixup.symbol.strip_suffix('b') {
        if let Ok(number) = rest.parse::<u8>() {
            let Some(&addr) = local_defs.get(&number) else {
                return Err(AsmError::UnresolvedReference {
                    file: file.to_string(),
                    line: fixup.line,
                    symbol: fixup.symbol.clone(),
                });
            };
            fixup::patch(program, &fixup, addr, little_endian);
            return Ok(());
        }
    }
    if let Some(rest) = fixup.symbol.strip_suffix('f') {
        if let Ok(number) = rest.parse::<u8>() {
            pending_forward.entry(number).or_default().push(fixup);
            return Ok(());
        }
    }
    symtab.get(&fixup.symbol).map_or_else(
        || {
            global_fixups.push(fixup);
            Ok(())
        },
        |addr| {
            fixup::patch(program, &fixup, addr, little_endian);
            Ok(())
        },
    )
}
