//! Reads the four fixed program images into their memory regions.

use std::fs;
use std::path::{Path, PathBuf};

use arange::Arange;

use crate::error::LoadError;
use crate::mem::{Endian, Memory};
use crate::word::Word;

/// The four fixed input file paths (`spec.md` §6).
#[derive(Clone, Debug)]
pub struct ProgramPaths {
    pub bootloader: PathBuf,
    pub program: PathBuf,
    pub program_data: PathBuf,
    pub interrupt_handler: PathBuf,
}

impl Default for ProgramPaths {
    fn default() -> Self {
        Self {
            bootloader: PathBuf::from("./Programs/bootloader"),
            program: PathBuf::from("./Programs/program"),
            program_data: PathBuf::from("./Programs/program_data"),
            interrupt_handler: PathBuf::from("./Programs/interrupt_handler"),
        }
    }
}

/// The four fixed memory regions a loaded image lands in.
#[derive(Clone, Copy, Debug)]
pub struct Regions<W> {
    pub bootloader: Arange<W>,
    pub user_program: Arange<W>,
    pub global_data: Arange<W>,
    pub interrupt_handler: Arange<W>,
}

impl Regions<u32> {
    /// The default RV32 layout from `spec.md` §3.
    #[must_use]
    pub fn rv32_default() -> Self {
        Self {
            bootloader: Arange::new(0x0000_0004, 0x0000_07FF),
            user_program: Arange::new(0x0000_0800, 0x4000_07FF),
            global_data: Arange::new(0x4000_0800, 0x8000_07FF),
            interrupt_handler: Arange::new(0xFFFF_F800, 0xFFFF_FFFF),
        }
    }
}

impl Regions<u64> {
    /// The RV64 layout: the same four windows, widened to 64 bits. The
    /// spec only tabulates the RV32 defaults; RV64 keeps the same region
    /// sizes anchored at the same low addresses since nothing in the
    /// spec calls for relocating them upward.
    #[must_use]
    pub fn rv64_default() -> Self {
        Self {
            bootloader: Arange::new(0x0000_0004, 0x0000_07FF),
            user_program: Arange::new(0x0000_0800, 0x4000_07FF),
            global_data: Arange::new(0x4000_0800, 0x8000_07FF),
            interrupt_handler: Arange::new(0xFFFF_FFFF_FFFF_F800, 0xFFFF_FFFF_FFFF_FFFF),
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|e| LoadError::Missing {
        path: path.display().to_string(),
        cause: e.to_string(),
    })
}

/// Loads `bytes` into memory starting at `region.start`, four bytes (one
/// instruction) at a time, using the machine's endianness. Fails if `bytes`
/// would overflow `region`.
fn load_instructions<W: Word>(
    mem: &mut Memory<W>,
    bytes: &[u8],
    region: Arange<W>,
    endian: Endian,
    path: &Path,
) -> Result<(), LoadError> {
    check_fits(bytes, region, path)?;
    for (i, chunk) in bytes.chunks(4).enumerate() {
        let mut word_bytes = [0u8; 4];
        word_bytes[..chunk.len()].copy_from_slice(chunk);
        let value = match endian {
            Endian::Little => u32::from_le_bytes(word_bytes),
            Endian::Big => u32::from_be_bytes(word_bytes),
        };
        let addr = region.start.wrapping_add(w_from_usize::<W>(i * 4));
        mem.write_word(addr, W::from_u64(u64::from(value)), 4, endian);
    }
    Ok(())
}

/// Loads `bytes` into memory starting at `region.start`, one byte at a time.
fn load_bytes<W: Word>(
    mem: &mut Memory<W>,
    bytes: &[u8],
    region: Arange<W>,
    path: &Path,
) -> Result<(), LoadError> {
    check_fits(bytes, region, path)?;
    for (i, byte) in bytes.iter().enumerate() {
        let addr = region.start.wrapping_add(w_from_usize::<W>(i));
        mem.write_byte(addr, *byte);
    }
    Ok(())
}

fn check_fits<W: Word>(bytes: &[u8], region: Arange<W>, path: &Path) -> Result<(), LoadError> {
    let region_len = region.len().to_u64();
    if bytes.len() as u64 > region_len {
        return Err(LoadError::Overflow {
            path: path.display().to_string(),
            len: bytes.len(),
            region_len,
        });
    }
    Ok(())
}

fn w_from_usize<W: Word>(v: usize) -> W {
    W::from_u64(v as u64)
}

/// Reads and loads all four program images. On success, returns the
/// bootloader region's start address, which becomes the initial PC.
pub fn load_all<W: Word>(
    mem: &mut Memory<W>,
    paths: &ProgramPaths,
    regions: &Regions<W>,
    endian: Endian,
) -> Result<W, LoadError> {
    let bootloader = read_file(&paths.bootloader)?;
    let program = read_file(&paths.program)?;
    let program_data = read_file(&paths.program_data)?;
    let interrupt_handler = read_file(&paths.interrupt_handler)?;

    load_instructions(mem, &bootloader, regions.bootloader, endian, &paths.bootloader)?;
    load_instructions(mem, &program, regions.user_program, endian, &paths.program)?;
    load_bytes(mem, &program_data, regions.global_data, &paths.program_data)?;
    load_instructions(
        mem,
        &interrupt_handler,
        regions.interrupt_handler,
        endian,
        &paths.interrupt_handler,
    )?;

    Ok(regions.bootloader.start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_rejected() {
        let region = Arange::new(0u32, 3); // 4 bytes
        let mut mem = Memory::<u32>::new();
        let err = load_instructions(&mut mem, &[0; 8], region, Endian::Little, Path::new("x"));
        assert!(matches!(err, Err(LoadError::Overflow { .. })));
    }

    #[test]
    fn fits_exactly_is_accepted() {
        let region = Arange::new(0u32, 3);
        let mut mem = Memory::<u32>::new();
        assert!(load_instructions(&mut mem, &[1, 2, 3, 4], region, Endian::Little, Path::new("x")).is_ok());
        assert_eq!(mem.peek_byte(3), 4);
    }
}
