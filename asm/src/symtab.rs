//! The global symbol table.
//!
//! Local numeric labels (`1:`, referenced as `1f`/`1b`) don't live here:
//! they can repeat within a file, so they're tracked separately by the
//! driver as it scans (see `spec.md`'s testable property on `1f`/`1b`
//! resolution).

use std::collections::HashMap;

use riscy_core::word::Word;

/// Maps global symbol names to the address they were defined at.
#[derive(Clone, Debug, Default)]
pub struct SymTab<W> {
    symbols: HashMap<String, W>,
}

impl<W: Word> SymTab<W> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: HashMap::new(),
        }
    }

    /// Defines `name` at `addr`. Returns `false` if it was already defined.
    pub fn define(&mut self, name: &str, addr: W) -> bool {
        self.symbols.insert(name.to_string(), addr).is_none()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<W> {
        self.symbols.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_redefinition() {
        let mut tab = SymTab::<u32>::new();
        assert!(tab.define("loop", 0x100));
        assert!(!tab.define("loop", 0x200));
        assert_eq!(tab.get("loop"), Some(0x100));
    }
}
