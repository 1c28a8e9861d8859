//! Typed errors for memory, execution, and program loading.

use thiserror::Error;

/// An error raised by a [memory](crate::mem::Memory) operation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MemError {
    /// The address lies outside any mapped region and the access requires
    /// one (used by region-checked accessors; raw [`Memory`](crate::mem::Memory)
    /// reads/writes never fail on their own).
    #[error("address out of mapped region")]
    Unmapped,
}

/// An error raised while executing a single instruction.
///
/// Most execution failures are not Rust errors at all: they are expressed as
/// interrupt flags (`II`, `SF`, `MSP`, `SAZ`) so the trap handler can act on
/// them per the priority order in the data model. `ExecError` covers the
/// narrower set of conditions that cannot be expressed as a flag, such as an
/// extension misbehaving.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ExecError {
    /// An extension's `execute` reported success but left the machine in an
    /// inconsistent state (defensive; should not occur with correct
    /// extensions).
    #[error("extension {0} returned an inconsistent result")]
    Extension(&'static str),
}

/// An error raised while loading program images into memory.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LoadError {
    /// One of the four fixed input files could not be opened.
    #[error("could not read {path}: {cause}")]
    Missing { path: String, cause: String },
    /// A file's contents would exceed its destination region.
    #[error("{path} ({len} bytes) overflows its region ({region_len} bytes)")]
    Overflow {
        path: String,
        len: usize,
        region_len: u64,
    },
}
