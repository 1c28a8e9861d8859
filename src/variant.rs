//! Builds a concrete [`Cpu`](crate::core::cpu::Cpu) from a [`Config`].
//!
//! The engine is generic over word width, so there is no single `Cpu` type:
//! [`Variant`] is the sum of the four concrete instantiations a driver can
//! end up with, each behind its own word width. The debugger's console UI
//! is an external collaborator that lives in the CLI crate, not here
//! (`spec.md` §6); this module only needs a boxed [`DebugHost`] for each
//! word width so a driver can plug in [`NullDebugHost`] for headless runs
//! or its own interactive host for `--debug`.

use crate::cfg::{Config, Isa};
use crate::core::cpu::Cpu;
use crate::core::debug::DebugHost;
use crate::core::error::LoadError;
use crate::core::ext::m::M;
use crate::core::ext::Extension;
use crate::core::loader::Regions;
use crate::core::reg::RegisterFile;

/// One of the four base ISA variants, each wired up with its requested
/// extensions and ready to [`start`](Variant::start).
pub enum Variant {
    Rv32i(Cpu<u32, Box<dyn DebugHost<u32>>>),
    Rv32e(Cpu<u32, Box<dyn DebugHost<u32>>>),
    Rv64i(Cpu<u64, Box<dyn DebugHost<u64>>>),
    Rv64e(Cpu<u64, Box<dyn DebugHost<u64>>>),
}

impl Variant {
    /// Loads the four program images and runs until a fatal trap or `TP`.
    pub fn start(&mut self) -> Result<(), LoadError> {
        match self {
            Variant::Rv32i(cpu) | Variant::Rv32e(cpu) => cpu.start(),
            Variant::Rv64i(cpu) | Variant::Rv64e(cpu) => cpu.start(),
        }
    }
}

/// Constructs the [`Variant`] named by `cfg`. `debug32`/`debug64` are the
/// debug hosts to install for whichever word width `cfg` selects; only one
/// is actually used. A headless caller passes `Box::new(NullDebugHost)` for
/// both.
#[must_use]
pub fn build(
    cfg: &Config,
    debug32: Box<dyn DebugHost<u32>>,
    debug64: Box<dyn DebugHost<u64>>,
) -> Variant {
    let isa = cfg.isa.unwrap_or_default();
    let endian = cfg.endian.unwrap_or_default().into();
    let paths = cfg.paths.resolve();
    let is_word_variant = matches!(isa, Isa::Rv64i | Isa::Rv64e);

    match isa {
        Isa::Rv32i => Variant::Rv32i(
            Cpu::with_debug_host(
                RegisterFile::rv_i(),
                Regions::rv32_default(),
                extensions_32(cfg),
                debug32,
                is_word_variant,
            )
            .with_paths(paths)
            .with_endian(endian),
        ),
        Isa::Rv32e => Variant::Rv32e(
            Cpu::with_debug_host(
                RegisterFile::rv_e(),
                Regions::rv32_default(),
                extensions_32(cfg),
                debug32,
                is_word_variant,
            )
            .with_paths(paths)
            .with_endian(endian),
        ),
        Isa::Rv64i => Variant::Rv64i(
            Cpu::with_debug_host(
                RegisterFile::rv_i(),
                Regions::rv64_default(),
                extensions_64(cfg),
                debug64,
                is_word_variant,
            )
            .with_paths(paths)
            .with_endian(endian),
        ),
        Isa::Rv64e => Variant::Rv64e(
            Cpu::with_debug_host(
                RegisterFile::rv_e(),
                Regions::rv64_default(),
                extensions_64(cfg),
                debug64,
                is_word_variant,
            )
            .with_paths(paths)
            .with_endian(endian),
        ),
    }
}

fn extensions_32(cfg: &Config) -> Vec<Box<dyn Extension<u32>>> {
    let mut exts: Vec<Box<dyn Extension<u32>>> = Vec::new();
    if cfg.ext.m {
        exts.push(Box::new(M::new(false)));
    }
    exts
}

fn extensions_64(cfg: &Config) -> Vec<Box<dyn Extension<u64>>> {
    let mut exts: Vec<Box<dyn Extension<u64>>> = Vec::new();
    if cfg.ext.m {
        exts.push(Box::new(M::new(true)));
    }
    exts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::debug::NullDebugHost;

    fn headless(cfg: &Config) -> Variant {
        build(cfg, Box::new(NullDebugHost), Box::new(NullDebugHost))
    }

    #[test]
    fn default_config_builds_rv32i() {
        let cfg = Config::default();
        let variant = headless(&cfg);
        assert!(matches!(variant, Variant::Rv32i(_)));
    }

    #[test]
    fn rv64_with_m_extension_builds() {
        let cfg = Config {
            isa: Some(Isa::Rv64i),
            ext: crate::cfg::Extensions { m: true },
            ..Config::default()
        };
        let variant = headless(&cfg);
        assert!(matches!(variant, Variant::Rv64i(_)));
    }
}
