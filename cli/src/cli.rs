//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// The `--variant` values, mirroring [`riscy::cfg::Isa`](riscy::cfg::Isa).
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Variant {
    Rv32i,
    Rv32e,
    Rv64i,
    Rv64e,
}

/// The `--extension` values, mirroring [`riscy::cfg::Extensions`](riscy::cfg::Extensions).
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Extension {
    M,
}

/// A RISC-V instruction-set emulator.
///
/// Loads the four fixed program images described by a configuration file,
/// optionally assembling a source file into the program and data images
/// first, then runs the selected ISA variant until a fatal trap.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Configuration file.
    ///
    /// Selects the ISA variant, byte order, enabled extensions, and the
    /// four program image paths. Missing fields fall back to defaults.
    #[arg(long, value_name = "PATH", default_value = "riscy.toml")]
    pub conf: PathBuf,

    /// ISA variant to run, overriding the configuration file.
    #[arg(long, value_enum)]
    pub variant: Option<Variant>,

    /// Instruction-set extension to enable, overriding the configuration
    /// file. May be repeated.
    #[arg(long = "extension", value_enum)]
    pub extensions: Vec<Extension>,

    /// Break into an interactive console debugger on `EBREAK` instead of
    /// continuing past it.
    #[arg(long)]
    pub debug: bool,

    /// Assembly source file.
    ///
    /// If given, it is assembled before loading; the resulting program and
    /// data images are written to the paths configured for them, replacing
    /// any files already there.
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,
}
