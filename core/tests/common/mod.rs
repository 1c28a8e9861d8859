//! Shared scaffolding for end-to-end tests: assembles a source string into
//! the bootloader image and runs a [`Cpu`] against it via real temporary
//! files, since [`Cpu::start`] always loads its four images from disk.

use std::fs;

use riscy_core::cpu::Cpu;
use riscy_core::debug::NullDebugHost;
use riscy_core::decode::{encode, opcode, Decoded, Format};
use riscy_core::loader::{ProgramPaths, Regions};
use riscy_core::mem::Endian;
use riscy_core::reg::RegisterFile;
use tempfile::TempDir;

/// A [`Cpu`] plus the temp directory backing its program images, kept
/// alive for the test's duration (dropping it deletes the files).
pub struct Harness {
    pub cpu: Cpu<u32, NullDebugHost>,
    _dir: TempDir,
}

/// Like [`Harness`], but for the RV64 variant.
pub struct Harness64 {
    pub cpu: Cpu<u64, NullDebugHost>,
    _dir: TempDir,
}

/// Assembles `src` as the bootloader image (where execution starts) and
/// wires up an otherwise-empty RV32I machine to run it.
pub fn rv32(src: &str) -> Harness {
    let dir = TempDir::new().unwrap();
    let assembled = riscy_asm::assemble::<u32>("test.s", src, false, true).unwrap();

    let bootloader = dir.path().join("bootloader");
    fs::write(&bootloader, &assembled.program).unwrap();
    let empty = dir.path().join("empty");
    fs::write(&empty, []).unwrap();

    let paths = ProgramPaths {
        bootloader,
        program: empty.clone(),
        program_data: empty.clone(),
        interrupt_handler: empty,
    };

    let cpu = Cpu::with_debug_host(
        RegisterFile::rv_i(),
        Regions::rv32_default(),
        Vec::new(),
        NullDebugHost,
        false,
    )
    .with_paths(paths)
    .with_endian(Endian::Little);

    Harness { cpu, _dir: dir }
}

/// Assembles `src` as the bootloader image of an otherwise-empty RV64I
/// machine, mirroring [`rv32`].
pub fn rv64(src: &str) -> Harness64 {
    let dir = TempDir::new().unwrap();
    let assembled = riscy_asm::assemble::<u64>("test.s", src, true, true).unwrap();

    let bootloader = dir.path().join("bootloader");
    fs::write(&bootloader, &assembled.program).unwrap();
    let empty = dir.path().join("empty");
    fs::write(&empty, []).unwrap();

    let paths = ProgramPaths {
        bootloader,
        program: empty.clone(),
        program_data: empty.clone(),
        interrupt_handler: empty,
    };

    let cpu = Cpu::with_debug_host(
        RegisterFile::rv_i(),
        Regions::rv64_default(),
        Vec::new(),
        NullDebugHost,
        true,
    )
    .with_paths(paths)
    .with_endian(Endian::Little);

    Harness64 { cpu, _dir: dir }
}

/// Like [`rv32`], but places `src` in the user-program image instead, with
/// a bootloader that jumps straight into it. Used for scenarios that must
/// observe the CPU executing while the PC is in the user-program region.
pub fn rv32_user(src: &str) -> Harness {
    rv32_user_with_handler(src, &[])
}

/// Like [`rv32_user`], additionally loading `handler` as the raw bytes of
/// the interrupt-handler image, for scenarios that exercise an `ECALL`
/// round trip.
pub fn rv32_user_with_handler(src: &str, handler: &[u8]) -> Harness {
    let dir = TempDir::new().unwrap();
    let assembled = riscy_asm::assemble::<u32>("test.s", src, false, true).unwrap();

    let regions = Regions::<u32>::rv32_default();
    // Hand-encode the jump rather than assembling it: the assembler always
    // links labels against the user-program region's base address (the
    // only region it knows about), so it can't express "jump from the
    // bootloader into user-program" as a labeled `jal`.
    let offset = regions.user_program.start - regions.bootloader.start;
    let jump = Decoded {
        valid: true,
        opcode: opcode::JAL,
        format: Format::J,
        imm: offset,
        rd: 0,
        rs1: 0,
        rs2: 0,
        funct3: 0,
        funct7: 0,
    };

    let bootloader = dir.path().join("bootloader");
    fs::write(&bootloader, encode(&jump).to_le_bytes()).unwrap();
    let program = dir.path().join("program");
    fs::write(&program, &assembled.program).unwrap();
    let interrupt_handler = dir.path().join("interrupt_handler");
    fs::write(&interrupt_handler, handler).unwrap();
    let empty = dir.path().join("empty");
    fs::write(&empty, []).unwrap();

    let paths = ProgramPaths {
        bootloader,
        program,
        program_data: empty,
        interrupt_handler,
    };

    let cpu = Cpu::with_debug_host(
        RegisterFile::rv_i(),
        Regions::rv32_default(),
        Vec::new(),
        NullDebugHost,
        false,
    )
    .with_paths(paths)
    .with_endian(Endian::Little);

    Harness { cpu, _dir: dir }
}
