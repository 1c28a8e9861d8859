//! The debugger's contract, as seen by the trap handler.
//!
//! The debugger's own UI (menu rendering, numeric parsing) is an external
//! collaborator and out of scope; what the CPU needs is the narrow
//! synchronous contract it exposes: given the current PC and a way to peek
//! registers/memory, it may request the run be terminated or restarted,
//! then returns. Modeled after `original_source/Components/RISC_V.h`'s
//! `menu_options` enum (continue / step / dump registers / dump memory
//! range / quit), minus the "step" action since this engine has no
//! separate single-step mode outside the debugger loop itself.

use crate::mem::Memory;
use crate::reg::RegisterFile;
use crate::word::Word;

/// What the debugger decided to do before returning control.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DebugAction {
    /// Resume normal execution.
    #[default]
    Continue,
    /// Set `TP`: stop the run.
    Terminate,
    /// Set `RP`: stop the run and restart it.
    Restart,
}

/// Read-only view of machine state the debugger may inspect.
pub struct DebugView<'a, W> {
    pub pc: W,
    pub regs: &'a RegisterFile<W>,
    pub mem: &'a Memory<W>,
}

/// The synchronous routine invoked when `EB` (breakpoint) is handled.
pub trait DebugHost<W: Word> {
    /// Enters the debugger's interactive loop and returns the chosen
    /// action once the user continues, terminates, or restarts.
    fn breakpoint(&mut self, view: DebugView<'_, W>) -> DebugAction;
}

/// A debugger that always continues immediately; used for headless runs
/// and tests where `EB` should not block.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDebugHost;

impl<W: Word> DebugHost<W> for NullDebugHost {
    fn breakpoint(&mut self, _view: DebugView<'_, W>) -> DebugAction {
        DebugAction::Continue
    }
}

/// Lets a driver pick its debug host at runtime (e.g. `--debug` selecting
/// between [`NullDebugHost`] and a CLI-provided console implementation)
/// without making [`crate::cpu::Cpu`] itself trait-object-unfriendly.
impl<W: Word> DebugHost<W> for Box<dyn DebugHost<W>> {
    fn breakpoint(&mut self, view: DebugView<'_, W>) -> DebugAction {
        (**self).breakpoint(view)
    }
}
