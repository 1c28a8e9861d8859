#![warn(clippy::pedantic)]

use std::fs;

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use log::info;
use riscy::asm::assemble;
use riscy::cfg::{Config, Endian, Extensions, Isa};
use riscy::core::debug::{DebugHost, NullDebugHost};
use riscy::variant;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::console::ConsoleDebugHost;

mod cli;
mod console;

/// Builds the [`Config`] carried directly on the command line, so it can be
/// merged over the file-loaded one with CLI-wins-over-file precedence.
fn cli_overrides(args: &Cli) -> Config {
    Config {
        isa: args.variant.map(|v| match v {
            cli::Variant::Rv32i => Isa::Rv32i,
            cli::Variant::Rv32e => Isa::Rv32e,
            cli::Variant::Rv64i => Isa::Rv64i,
            cli::Variant::Rv64e => Isa::Rv64e,
        }),
        ext: Extensions {
            m: args.extensions.iter().any(|e| matches!(e, cli::Extension::M)),
        },
        ..Config::default()
    }
}

fn main() -> Result<()> {
    // Install panic and error report handlers
    color_eyre::install()?;
    // Initialize logger
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Parse args
    let args = Cli::parse();

    // Load configuration, falling back to defaults if the file is absent
    let file_cfg = match fs::read_to_string(&args.conf) {
        Ok(body) => Config::parse(&body)
            .with_context(|| format!("failed to parse configuration: `{}`", args.conf.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed to read configuration: `{}`", args.conf.display())
            })
        }
    };
    // CLI flags win over the file: they go in as `self`, so `merge` keeps
    // them over whatever the file also set.
    let mut cfg = cli_overrides(&args);
    cfg.merge(file_cfg);

    // Assemble the source file, if given, into the configured program images
    if let Some(source) = &args.source {
        let rv64 = matches!(cfg.isa.unwrap_or_default(), Isa::Rv64i | Isa::Rv64e);
        let little_endian = matches!(cfg.endian.unwrap_or_default(), Endian::Little);
        let text = fs::read_to_string(source)
            .with_context(|| format!("failed to read source: `{}`", source.display()))?;
        let file = source.display().to_string();
        let assembled = if rv64 {
            assemble::<u64>(&file, &text, rv64, little_endian)
        } else {
            assemble::<u32>(&file, &text, rv64, little_endian)
        }
        .with_context(|| format!("failed to assemble: `{}`", source.display()))?;

        let paths = cfg.paths.resolve();
        fs::write(&paths.program, &assembled.program)
            .with_context(|| format!("failed to write: `{}`", paths.program.display()))?;
        fs::write(&paths.program_data, &assembled.data)
            .with_context(|| format!("failed to write: `{}`", paths.program_data.display()))?;
        info!(
            "assembled `{}`: {} bytes of program, {} bytes of data",
            source.display(),
            assembled.program.len(),
            assembled.data.len()
        );
    }

    // Build and run the selected variant
    let (debug32, debug64): (Box<dyn DebugHost<u32>>, Box<dyn DebugHost<u64>>) = if args.debug {
        (Box::new(ConsoleDebugHost), Box::new(ConsoleDebugHost))
    } else {
        (Box::new(NullDebugHost), Box::new(NullDebugHost))
    };
    variant::build(&cfg, debug32, debug64)
        .start()
        .context("execution failed")?;

    Ok(())
}
