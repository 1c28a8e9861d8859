//! # Riscy
//!
//! A RISC-V instruction-set emulator with a companion two-pass assembler.
//!
//! This crate is a thin facade: the emulation engine lives in
//! [`riscy_core`](crate::core), the assembler in [`riscy_asm`](crate::asm).
//! What's here is the glue a driver needs to go from on-disk configuration to
//! a running [`core::Cpu`]: picking an ISA variant, wiring up extensions, and
//! assembling sources before load.
//!
//! # Examples
//!
//! ```no_run
//! use riscy::cfg::Config;
//! use riscy::core::debug::NullDebugHost;
//! use riscy::variant;
//!
//! let cfg = Config::default();
//! let mut variant = variant::build(&cfg, Box::new(NullDebugHost), Box::new(NullDebugHost));
//! variant.start().unwrap();
//! ```

#![warn(clippy::pedantic)]

pub use riscy_asm as asm;
pub use riscy_core as core;

pub mod cfg;
pub mod variant;
