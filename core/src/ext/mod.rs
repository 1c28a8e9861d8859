//! Extensions as values: a non-owning chain-of-responsibility fallen back to
//! by the base decoder/executor.
//!
//! The original models an extension as a virtual-inheritance component
//! holding raw pointers into the CPU's state. The design note's
//! language-neutral equivalent is a value type with two operations and a
//! non-owning borrow of the CPU's mutable state; since the engine is
//! strictly single-threaded and synchronous, a plain `&mut` borrow per call
//! is sufficient; no shared ownership or locking is needed.

pub mod m;

use crate::decode::Decoded;
use crate::reg::RegisterFile;
use crate::word::Word;

/// State an extension is allowed to mutate while it handles an instruction.
pub struct ExtState<'a, W> {
    pub regs: &'a mut RegisterFile<W>,
}

/// A decoder/executor extension polled when the base engine falls through.
pub trait Extension<W: Word> {
    /// Human-readable name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Attempts to decode `word` as one of this extension's instructions.
    /// Returns `None` if this extension doesn't recognize the opcode/funct
    /// combination.
    fn decode(&self, word: u32) -> Option<Decoded>;

    /// Executes a previously `decode`d instruction. Returns `true` on
    /// success (the base engine stops polling), `false` if this extension
    /// turns out not to be able to execute it after all.
    fn execute(&mut self, insn: &Decoded, state: &mut ExtState<'_, W>) -> bool;
}
