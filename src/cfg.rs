//! Emulator configuration.
//!
//! Mirrors the split the core engine already makes: an [`Isa`] selects the
//! word width and register-file size, an [`Endian`] selects byte order, and
//! [`Extensions`] lists which optional instruction-set extensions to wire up.
//! Fields are all [`Option`] so a file-loaded [`Config`] and a CLI-supplied
//! one can be [merged](Config::merge), preferring whichever side already set
//! a value.

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::loader::ProgramPaths;
use crate::core::mem::Endian as CoreEndian;

/// Which base integer ISA variant to build.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Isa {
    /// RV32I: 32-bit words, 32 registers.
    #[default]
    Rv32i,
    /// RV32E: 32-bit words, 16 registers.
    Rv32e,
    /// RV64I: 64-bit words, 32 registers.
    Rv64i,
    /// RV64E: 64-bit words, 16 registers.
    Rv64e,
}

/// Byte order for memory and loaded binaries.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl From<Endian> for CoreEndian {
    fn from(value: Endian) -> Self {
        match value {
            Endian::Little => CoreEndian::Little,
            Endian::Big => CoreEndian::Big,
        }
    }
}

/// Optional instruction-set extensions to enable.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Extensions {
    /// The M (multiply/divide) extension.
    pub m: bool,
}

/// File paths overriding the loader's defaults.
///
/// Any field left `None` falls back to [`ProgramPaths::default`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub bootloader: Option<PathBuf>,
    pub program: Option<PathBuf>,
    pub program_data: Option<PathBuf>,
    pub interrupt_handler: Option<PathBuf>,
}

impl Paths {
    fn merge(&mut self, other: Self) {
        self.bootloader = self.bootloader.take().or(other.bootloader);
        self.program = self.program.take().or(other.program);
        self.program_data = self.program_data.take().or(other.program_data);
        self.interrupt_handler = self.interrupt_handler.take().or(other.interrupt_handler);
    }

    #[must_use]
    pub fn resolve(&self) -> ProgramPaths {
        let default = ProgramPaths::default();
        ProgramPaths {
            bootloader: self.bootloader.clone().unwrap_or(default.bootloader),
            program: self.program.clone().unwrap_or(default.program),
            program_data: self.program_data.clone().unwrap_or(default.program_data),
            interrupt_handler: self
                .interrupt_handler
                .clone()
                .unwrap_or(default.interrupt_handler),
        }
    }
}

/// Top-level configuration, loadable from a TOML file and overridable from
/// the command line.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub isa: Option<Isa>,
    pub endian: Option<Endian>,
    pub ext: Extensions,
    pub paths: Paths,
}

impl Config {
    /// Parses configuration data from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` is not valid TOML or contains unknown
    /// fields.
    pub fn parse(body: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(body)
    }

    /// Combines two configuration instances, preferring values already set
    /// on `self` over those from `other`.
    pub fn merge(&mut self, other: Self) {
        self.isa = self.isa.take().or(other.isa);
        self.endian = self.endian.take().or(other.endian);
        self.ext.m = self.ext.m || other.ext.m;
        self.paths.merge(other.paths);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_self() {
        let mut a = Config {
            isa: Some(Isa::Rv64i),
            ..Config::default()
        };
        let b = Config {
            isa: Some(Isa::Rv32e),
            endian: Some(Endian::Big),
            ..Config::default()
        };
        a.merge(b);
        assert_eq!(a.isa, Some(Isa::Rv64i));
        assert_eq!(a.endian, Some(Endian::Big));
    }

    #[test]
    fn parse_empty_body_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.isa, None);
        assert!(!cfg.ext.m);
    }
}
