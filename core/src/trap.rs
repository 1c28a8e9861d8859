//! The eight-bit interrupt-flag byte and the priority-ordered trap handler.

use crate::mem::Memory;
use crate::word::Word;

/// A bit of the interrupt-flag byte at memory address 1.
///
/// Variant order is the handling priority from the data model:
/// `SAZ, II, SF, MSP, EB, EC, TP, RP`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flag {
    /// Store-at-zero attempted (null-pointer write). Fatal.
    Saz,
    /// Illegal instruction. Fatal.
    Ii,
    /// Segmentation fault. Fatal.
    Sf,
    /// User code wrote to `x2` (stack pointer). Fatal.
    Msp,
    /// Breakpoint encountered. Recoverable.
    Eb,
    /// Environment call made. Recoverable.
    Ec,
    /// Terminate program. Control.
    Tp,
    /// Restart program. Control.
    Rp,
}

impl Flag {
    /// Flags in their handling priority, highest first.
    pub const PRIORITY: [Flag; 8] = [
        Flag::Saz,
        Flag::Ii,
        Flag::Sf,
        Flag::Msp,
        Flag::Eb,
        Flag::Ec,
        Flag::Tp,
        Flag::Rp,
    ];

    fn bit(self) -> u8 {
        match self {
            Flag::Saz => 0,
            Flag::Ii => 1,
            Flag::Sf => 2,
            Flag::Msp => 3,
            Flag::Eb => 4,
            Flag::Ec => 5,
            Flag::Tp => 6,
            Flag::Rp => 7,
        }
    }

    /// Fatal flags stop the run and print a diagnostic.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Flag::Saz | Flag::Ii | Flag::Sf | Flag::Msp)
    }

    /// Human-readable name, used in fatal diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Flag::Saz => "SAZ",
            Flag::Ii => "II",
            Flag::Sf => "SF",
            Flag::Msp => "MSP",
            Flag::Eb => "EB",
            Flag::Ec => "EC",
            Flag::Tp => "TP",
            Flag::Rp => "RP",
        }
    }
}

/// Address of the interrupt-flag byte in the shared memory map.
pub const FLAG_ADDR: u64 = 1;

/// Reads and writes the flag byte at [`FLAG_ADDR`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Flags;

impl Flags {
    #[must_use]
    pub fn get<W: Word>(mem: &mut Memory<W>, flag: Flag) -> bool {
        let byte = mem.read_byte(W::from_u64(FLAG_ADDR));
        byte & (1 << flag.bit()) != 0
    }

    pub fn set<W: Word>(mem: &mut Memory<W>, flag: Flag, value: bool) {
        let mut byte = mem.read_byte(W::from_u64(FLAG_ADDR));
        if value {
            byte |= 1 << flag.bit();
        } else {
            byte &= !(1 << flag.bit());
        }
        // Write directly into the cell: going through `write_byte` would
        // treat address 1 as any other address, which is exactly what we
        // want here (address 1 is not the redirected address 0).
        mem.write_byte(W::from_u64(FLAG_ADDR), byte);
    }

    pub fn clear<W: Word>(mem: &mut Memory<W>, flag: Flag) {
        Self::set(mem, flag, false);
    }

    /// The highest-priority set flag, if any.
    #[must_use]
    pub fn pending<W: Word>(mem: &mut Memory<W>) -> Option<Flag> {
        Flag::PRIORITY.into_iter().find(|&f| Self::get(mem, f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_round_trip() {
        let mut mem = Memory::<u32>::new();
        assert!(!Flags::get(&mut mem, Flag::Ec));
        Flags::set(&mut mem, Flag::Ec, true);
        assert!(Flags::get(&mut mem, Flag::Ec));
        Flags::clear(&mut mem, Flag::Ec);
        assert!(!Flags::get(&mut mem, Flag::Ec));
    }

    #[test]
    fn pending_respects_priority_order() {
        let mut mem = Memory::<u32>::new();
        Flags::set(&mut mem, Flag::Rp, true);
        Flags::set(&mut mem, Flag::Sf, true);
        assert_eq!(Flags::pending(&mut mem), Some(Flag::Sf));
    }
}
