//! The CPU engine: ties together the register file, memory, ALU,
//! decoder, extensions, and trap handler into the fetch/decode/execute
//! loop and the `start()`/restart lifecycle.
//!
//! A generic engine parameterized by word width and a set of
//! decoder/executor extensions, per the design note, rather than open-coded
//! RV32/RV64 subclasses: RV64 is modeled as `Cpu<u64, _>` constructed with
//! `word_variant = true`, which only changes which opcodes the decoder and
//! executor additionally recognize.

use tell::error;

use crate::alu::{Alu, Op as AluOp};
use crate::debug::{DebugAction, DebugHost, DebugView};
use crate::decode::{decode_rv32, decode_rv64, encode as encode_insn, opcode, Decoded};
use crate::error::LoadError;
use crate::ext::{ExtState, Extension};
use crate::loader::{self, ProgramPaths, Regions};
use crate::mem::{Endian, Memory};
use crate::reg::{Counter, RegisterFile};
use crate::trap::{Flag, Flags};
use crate::word::Word;

/// Sign-bit mask positions fed to the ALU's `SXT` operation, avoiding magic
/// literals in the executor (`spec.md`'s constants table).
struct Constants<W> {
    imm12: W,
    imm13: W,
    imm21: W,
    imm32: W,
}

impl<W: Word> Constants<W> {
    fn new() -> Self {
        Self {
            imm12: W::from_u64(0x800),
            imm13: W::from_u64(0x1000),
            imm21: W::from_u64(0x10_0000),
            imm32: W::from_u64(0x8000_0000),
        }
    }
}

/// What the executor decided the PC should do after this instruction.
enum Flow<W> {
    /// Advance by the counter's stride (4).
    Advance,
    /// Write this target directly; no stride added.
    Jump(W),
    /// Leave the PC untouched; some later phase (the trap handler, for
    /// `EBREAK`) decides whether to advance it.
    Inhibit,
}

/// A RISC-V core: `RV32I`/`RV32E`/`RV64I`/`RV64E` depending on `W` and the
/// register-file width chosen at construction, plus whichever extensions
/// (e.g. [`crate::ext::m::M`]) were installed.
pub struct Cpu<W, D> {
    pc: Counter<W>,
    ir: u32,
    regs: RegisterFile<W>,
    mem: Memory<W>,
    alu: Alu<W>,
    constants: Constants<W>,
    regions: Regions<W>,
    extensions: Vec<Box<dyn Extension<W>>>,
    endian: Endian,
    is_word_variant: bool,
    ecall_return: W,
    debug: D,
    restart_latch: bool,
    paths: ProgramPaths,
}

impl<W: Word, D: DebugHost<W>> Cpu<W, D> {
    fn build(
        regs: RegisterFile<W>,
        regions: Regions<W>,
        extensions: Vec<Box<dyn Extension<W>>>,
        debug: D,
        is_word_variant: bool,
    ) -> Self {
        Self {
            pc: Counter::new(W::from_u64(4)),
            ir: 0,
            regs,
            mem: Memory::new(),
            alu: Alu::new(),
            constants: Constants::new(),
            regions,
            extensions,
            endian: Endian::Little,
            is_word_variant,
            ecall_return: W::ZERO,
            debug,
            restart_latch: false,
            paths: ProgramPaths::default(),
        }
    }

    /// Overrides the four fixed input paths (tests and the CLI use this;
    /// the default is `./Programs/*`).
    pub fn with_paths(mut self, paths: ProgramPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Overrides the assembler/emulator endianness (default little).
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    /// Direct memory access, for the debugger and for tests.
    pub fn memory(&mut self) -> &mut Memory<W> {
        &mut self.mem
    }

    /// Direct register access, for the debugger and for tests.
    pub fn registers(&self) -> &RegisterFile<W> {
        &self.regs
    }

    #[must_use]
    pub fn pc(&self) -> W {
        self.pc.load()
    }

    /// Loads the four program images and runs until a fatal trap, `TP`, or
    /// the debugger requests termination; re-enters automatically on `RP`.
    pub fn start(&mut self) -> Result<(), LoadError> {
        loop {
            self.reset();
            let entry = loader::load_all(&mut self.mem, &self.paths, &self.regions, self.endian)?;
            self.pc.store(entry);
            self.run();
            if !self.restart_latch {
                return Ok(());
            }
            self.restart_latch = false;
        }
    }

    fn reset(&mut self) {
        self.mem.reset();
        self.regs.reset();
        self.pc.store(W::ZERO);
        self.ecall_return = W::ZERO;
    }

    fn run(&mut self) {
        loop {
            if self.step() {
                break;
            }
        }
    }

    /// Runs exactly one fetch/decode/execute/trap cycle. Returns `true` if
    /// the run should stop.
    fn step(&mut self) -> bool {
        let pc = self.pc.load();
        self.ir = self.mem.read_word(pc, 4, self.endian).to_u64() as u32;
        let flow = self.execute(self.ir, pc);
        match flow {
            Flow::Advance => {
                self.pc.count();
            }
            Flow::Jump(target) => {
                self.pc.store(target);
            }
            Flow::Inhibit => {}
        }
        self.handle_traps(pc)
    }

    fn decode(&self, word: u32) -> Decoded {
        if self.is_word_variant {
            decode_rv64(word)
        } else {
            decode_rv32(word)
        }
    }

    /// Guard rails plus opcode dispatch for a single instruction. `pc` is
    /// this instruction's own address (pre-increment).
    fn execute(&mut self, word: u32, pc: W) -> Flow<W> {
        let mut insn = self.decode(word);
        let mut ext_owner = None;
        if !insn.valid {
            for (i, ext) in self.extensions.iter().enumerate() {
                if let Some(d) = ext.decode(word) {
                    insn = d;
                    ext_owner = Some(i);
                    break;
                }
            }
        }

        // Guard rail 1: still unrecognized after the extension poll.
        if !insn.valid {
            Flags::set(&mut self.mem, Flag::Ii, true);
            return Flow::Advance;
        }

        // Guard rail 2: user code may never write the stack pointer.
        if self.regions.user_program.contains(pc) && insn.rd == 2 {
            Flags::set(&mut self.mem, Flag::Msp, true);
            return Flow::Advance;
        }

        if let Some(idx) = ext_owner {
            let mut state = ExtState {
                regs: &mut self.regs,
            };
            if !self.extensions[idx].execute(&insn, &mut state) {
                Flags::set(&mut self.mem, Flag::Ii, true);
            }
            return Flow::Advance;
        }

        self.execute_base(&insn, pc)
    }

    fn sign_extend(&mut self, value: W, mask: W) -> W {
        self.alu.set_operand1(value);
        self.alu.operate(AluOp::Sxt, mask)
    }

    fn execute_base(&mut self, insn: &Decoded, pc: W) -> Flow<W> {
        match insn.opcode {
            opcode::ARITH_LOG_R | opcode::ARITH_LOG_R_W => self.exec_arith_r(insn),
            opcode::ARITH_LOG_I | opcode::ARITH_LOG_I_W => self.exec_arith_i(insn),
            opcode::LOAD => self.exec_load(insn, pc),
            opcode::STORE => self.exec_store(insn, pc),
            opcode::BRANCH => self.exec_branch(insn, pc),
            opcode::LUI => {
                let imm = self.sign_extend(insn.imm_as::<W>(), self.constants.imm32);
                self.regs.store(insn.rd, imm);
                Flow::Advance
            }
            opcode::AUIPC => {
                let imm = self.sign_extend(insn.imm_as::<W>(), self.constants.imm32);
                self.regs.store(insn.rd, pc.wrapping_add(imm));
                Flow::Advance
            }
            opcode::JAL => {
                let imm21 = W::from_u64(u64::from(insn.imm));
                let offset = self.sign_extend(imm21, self.constants.imm21);
                self.regs.store(insn.rd, pc.wrapping_add(W::from_u64(4)));
                Flow::Jump(pc.wrapping_add(offset))
            }
            opcode::JALR => {
                let imm12 = W::from_u64(u64::from(insn.imm));
                let offset = self.sign_extend(imm12, self.constants.imm12);
                let base = self.regs.load(insn.rs1);
                let target = base.wrapping_add(offset) & !W::ONE;
                self.regs.store(insn.rd, pc.wrapping_add(W::from_u64(4)));
                Flow::Jump(target)
            }
            opcode::ENVIRONMENT => {
                if insn.imm & 1 == 0 {
                    Flags::set(&mut self.mem, Flag::Ec, true);
                    Flow::Advance
                } else {
                    Flags::set(&mut self.mem, Flag::Eb, true);
                    Flow::Inhibit
                }
            }
            _ => {
                Flags::set(&mut self.mem, Flag::Ii, true);
                Flow::Advance
            }
        }
    }

    fn shift_mask(&self, is_w: bool) -> u64 {
        if is_w {
            0x1F
        } else {
            u64::from(W::BITS - 1)
        }
    }

    fn exec_arith_r(&mut self, insn: &Decoded) -> Flow<W> {
        let is_w = insn.opcode == opcode::ARITH_LOG_R_W;
        let rs1v = self.regs.load(insn.rs1);
        let rs2v = self.regs.load(insn.rs2);
        let sub = insn.funct7 == 32;

        if is_w {
            let a = rs1v.to_u64() as u32;
            let b = rs2v.to_u64() as u32;
            let mask = self.shift_mask(true) as u32;
            let result32: u32 = match insn.funct3 {
                0 if sub => a.wrapping_sub(b),
                0 => a.wrapping_add(b),
                1 => a.wrapping_shl(b & mask),
                5 if sub => ((a as i32) >> (b & mask)) as u32,
                5 => a.wrapping_shr(b & mask),
                _ => {
                    Flags::set(&mut self.mem, Flag::Ii, true);
                    return Flow::Advance;
                }
            };
            self.regs
                .store(insn.rd, W::from_i64(i64::from(result32 as i32)));
            return Flow::Advance;
        }

        self.alu.set_operand1(rs1v);
        let result = match insn.funct3 {
            0 if sub => self.alu.operate(AluOp::Sub, rs2v),
            0 => self.alu.operate(AluOp::Add, rs2v),
            1 => self.alu.operate(AluOp::Sll, rs2v),
            2 => self.alu.operate(AluOp::Lt, rs2v),
            3 => self.alu.operate(AluOp::Ltu, rs2v),
            4 => self.alu.operate(AluOp::Xor, rs2v),
            5 if sub => self.alu.operate(AluOp::Sra, rs2v),
            5 => self.alu.operate(AluOp::Srl, rs2v),
            6 => self.alu.operate(AluOp::Or, rs2v),
            7 => self.alu.operate(AluOp::And, rs2v),
            _ => {
                Flags::set(&mut self.mem, Flag::Ii, true);
                return Flow::Advance;
            }
        };
        self.regs.store(insn.rd, result);
        Flow::Advance
    }

    fn exec_arith_i(&mut self, insn: &Decoded) -> Flow<W> {
        let is_w = insn.opcode == opcode::ARITH_LOG_I_W;
        let rs1v = self.regs.load(insn.rs1);
        let imm12 = W::from_u64(u64::from(insn.imm));
        let sext_imm = self.sign_extend(imm12, self.constants.imm12);
        let shamt_mask = self.shift_mask(is_w) as u32;
        let shamt = (insn.imm & shamt_mask) as u32;
        let arithmetic_shift = (insn.imm >> 10) & 1 == 1;

        if is_w {
            let a = rs1v.to_u64() as u32;
            let result32: u32 = match insn.funct3 {
                0 => a.wrapping_add(sext_imm.to_u64() as u32),
                1 => a.wrapping_shl(shamt),
                5 if arithmetic_shift => ((a as i32) >> shamt) as u32,
                5 => a.wrapping_shr(shamt),
                _ => {
                    Flags::set(&mut self.mem, Flag::Ii, true);
                    return Flow::Advance;
                }
            };
            self.regs
                .store(insn.rd, W::from_i64(i64::from(result32 as i32)));
            return Flow::Advance;
        }

        self.alu.set_operand1(rs1v);
        let result = match insn.funct3 {
            0 => self.alu.operate(AluOp::Add, sext_imm),
            1 => self.alu.operate(AluOp::Sll, W::from_u64(u64::from(shamt))),
            2 => self.alu.operate(AluOp::Lt, sext_imm),
            3 => self.alu.operate(AluOp::Ltu, sext_imm),
            4 => self.alu.operate(AluOp::Xor, sext_imm),
            5 if arithmetic_shift => self.alu.operate(AluOp::Sra, W::from_u64(u64::from(shamt))),
            5 => self.alu.operate(AluOp::Srl, W::from_u64(u64::from(shamt))),
            6 => self.alu.operate(AluOp::Or, sext_imm),
            7 => self.alu.operate(AluOp::And, sext_imm),
            _ => {
                Flags::set(&mut self.mem, Flag::Ii, true);
                return Flow::Advance;
            }
        };
        self.regs.store(insn.rd, result);
        Flow::Advance
    }

    fn effective_address(&mut self, insn: &Decoded) -> W {
        let imm12 = W::from_u64(u64::from(insn.imm));
        let offset = self.sign_extend(imm12, self.constants.imm12);
        self.regs.load(insn.rs1).wrapping_add(offset)
    }

    /// Returns `Some(flag)` if this access must be refused, `None` if it
    /// may proceed. Only active while the PC is in the user-program region;
    /// bootloader and interrupt-handler code are unchecked.
    fn guard(&self, pc: W, addr: W, is_store: bool) -> Option<Flag> {
        if !self.regions.user_program.contains(pc) {
            return None;
        }
        if self.regions.user_program.contains(addr) || self.regions.global_data.contains(addr) {
            return None;
        }
        if is_store && addr == W::ZERO {
            Some(Flag::Saz)
        } else {
            Some(Flag::Sf)
        }
    }

    fn exec_load(&mut self, insn: &Decoded, pc: W) -> Flow<W> {
        let addr = self.effective_address(insn);
        if let Some(flag) = self.guard(pc, addr, false) {
            Flags::set(&mut self.mem, flag, true);
            return Flow::Advance;
        }
        let is_w = self.is_word_variant;
        let value = match insn.funct3 {
            0 => {
                // LB
                let byte = self.mem.read_byte(addr);
                self.sign_extend(W::from_u64(u64::from(byte)), W::from_u64(0x80))
            }
            1 => {
                // LH
                let half = self.mem.read_word(addr, 2, self.endian);
                self.sign_extend(half, W::from_u64(0x8000))
            }
            2 => {
                // LW
                let word = self.mem.read_word(addr, 4, self.endian);
                self.sign_extend(word, self.constants.imm32)
            }
            3 if is_w => self.mem.read_word(addr, 8, self.endian), // LD
            4 => W::from_u64(u64::from(self.mem.read_byte(addr))), // LBU
            5 => self.mem.read_word(addr, 2, self.endian),         // LHU
            6 if is_w => self.mem.read_word(addr, 4, self.endian), // LWU
            _ => {
                Flags::set(&mut self.mem, Flag::Ii, true);
                return Flow::Advance;
            }
        };
        self.regs.store(insn.rd, value);
        Flow::Advance
    }

    fn exec_store(&mut self, insn: &Decoded, pc: W) -> Flow<W> {
        let addr = self.effective_address(insn);
        if let Some(flag) = self.guard(pc, addr, true) {
            Flags::set(&mut self.mem, flag, true);
            return Flow::Advance;
        }
        let value = self.regs.load(insn.rs2);
        let is_w = self.is_word_variant;
        match insn.funct3 {
            0 => self.mem.write_word(addr, value, 1, self.endian),
            1 => self.mem.write_word(addr, value, 2, self.endian),
            2 => self.mem.write_word(addr, value, 4, self.endian),
            3 if is_w => self.mem.write_word(addr, value, 8, self.endian),
            _ => {
                Flags::set(&mut self.mem, Flag::Ii, true);
                return Flow::Advance;
            }
        }
        Flow::Advance
    }

    fn exec_branch(&mut self, insn: &Decoded, pc: W) -> Flow<W> {
        let a = self.regs.load(insn.rs1);
        let b = self.regs.load(insn.rs2);
        let taken = match insn.funct3 {
            0 => a == b,                      // BEQ
            1 => a != b,                      // BNE
            4 => (a.to_i64()) < (b.to_i64()),  // BLT
            5 => (a.to_i64()) >= (b.to_i64()), // BGE
            6 => a < b,                        // BLTU
            7 => a >= b,                       // BGEU
            _ => {
                Flags::set(&mut self.mem, Flag::Ii, true);
                return Flow::Advance;
            }
        };
        if !taken {
            return Flow::Advance;
        }
        let imm13 = W::from_u64(u64::from(insn.imm));
        let offset = self.sign_extend(imm13, self.constants.imm13);
        Flow::Jump(pc.wrapping_add(offset))
    }

    /// Reads the flag byte and acts on the highest-priority set flag.
    /// Returns `true` if the run should stop.
    fn handle_traps(&mut self, pc: W) -> bool {
        let Some(flag) = Flags::pending(&mut self.mem) else {
            return false;
        };

        if flag.is_fatal() {
            error!("{}: PC = {:#x}", flag.name(), pc.to_u64());
            return true;
        }

        match flag {
            Flag::Eb => {
                Flags::clear(&mut self.mem, Flag::Eb);
                let action = self.debug.breakpoint(DebugView {
                    pc: self.pc.load(),
                    regs: &self.regs,
                    mem: &self.mem,
                });
                match action {
                    DebugAction::Continue => {
                        self.pc.count();
                        false
                    }
                    DebugAction::Terminate => {
                        Flags::set(&mut self.mem, Flag::Tp, true);
                        true
                    }
                    DebugAction::Restart => {
                        Flags::set(&mut self.mem, Flag::Rp, true);
                        self.restart_latch = true;
                        true
                    }
                }
            }
            Flag::Ec => {
                Flags::clear(&mut self.mem, Flag::Ec);
                let current = self.pc.load();
                if self.regions.user_program.contains(current) {
                    self.ecall_return = current;
                    self.pc.store(self.regions.interrupt_handler.start);
                } else if self.regions.interrupt_handler.contains(current) {
                    self.pc.store(self.ecall_return);
                } else {
                    error!("illegal use of ECALL: PC = {:#x}", current.to_u64());
                    return true;
                }
                false
            }
            Flag::Tp => {
                error!("terminate requested: PC = {:#x}", pc.to_u64());
                true
            }
            Flag::Rp => {
                Flags::clear(&mut self.mem, Flag::Rp);
                self.restart_latch = true;
                true
            }
            _ => unreachable!("fatal flags handled above"),
        }
    }
}

impl Decoded {
    /// Widens the raw decoded immediate (stored as `u32`) to this machine's
    /// word type, without sign extension (the executor's job, via `SXT`).
    fn imm_as<T: Word>(&self) -> T {
        T::from_u64(u64::from(self.imm))
    }
}

impl Cpu<u32, crate::debug::NullDebugHost> {
    /// Builds an `RV32I` core (32 registers) with a headless debugger.
    #[must_use]
    pub fn rv32i(extensions: Vec<Box<dyn Extension<u32>>>) -> Self {
        Self::build(
            RegisterFile::rv_i(),
            Regions::rv32_default(),
            extensions,
            crate::debug::NullDebugHost,
            false,
        )
    }

    /// Builds an `RV32E` core (16 registers) with a headless debugger.
    #[must_use]
    pub fn rv32e(extensions: Vec<Box<dyn Extension<u32>>>) -> Self {
        Self::build(
            RegisterFile::rv_e(),
            Regions::rv32_default(),
            extensions,
            crate::debug::NullDebugHost,
            false,
        )
    }
}

impl Cpu<u64, crate::debug::NullDebugHost> {
    /// Builds an `RV64I` core (32 registers) with a headless debugger.
    #[must_use]
    pub fn rv64i(extensions: Vec<Box<dyn Extension<u64>>>) -> Self {
        Self::build(
            RegisterFile::rv_i(),
            Regions::rv64_default(),
            extensions,
            crate::debug::NullDebugHost,
            true,
        )
    }

    /// Builds an `RV64E` core (16 registers) with a headless debugger.
    #[must_use]
    pub fn rv64e(extensions: Vec<Box<dyn Extension<u64>>>) -> Self {
        Self::build(
            RegisterFile::rv_e(),
            Regions::rv64_default(),
            extensions,
            crate::debug::NullDebugHost,
            true,
        )
    }
}

impl<W: Word, D: DebugHost<W>> Cpu<W, D> {
    /// Builds a core with a custom [`DebugHost`] (the CLI's interactive
    /// console debugger, or a test double).
    #[must_use]
    pub fn with_debug_host(
        regs: RegisterFile<W>,
        regions: Regions<W>,
        extensions: Vec<Box<dyn Extension<W>>>,
        debug: D,
        is_word_variant: bool,
    ) -> Self {
        Self::build(regs, regions, extensions, debug, is_word_variant)
    }
}

/// Re-encodes a decoded record; re-exported so callers don't need to reach
/// into [`crate::decode`] separately when round-tripping a fetched word.
#[must_use]
pub fn encode(d: &Decoded) -> u32 {
    encode_insn(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    impl<W: Word, D: DebugHost<W>> Cpu<W, D> {
        /// Test-only single step that pokes a word directly into memory at
        /// the user-program start and executes it, bypassing `start()`'s
        /// file-based loader.
        fn step_with(&mut self, word: u32) {
            let start = self.regions.user_program.start;
            self.pc.store(start);
            self.mem.write_word(start, W::from_u64(u64::from(word)), 4, self.endian);
            self.step();
        }
    }

    #[test]
    fn addi_sets_register_and_advances_pc() {
        let mut cpu = Cpu::<u32, _>::rv32i(vec![]);
        cpu.step_with(0x0050_0093); // ADDI x1, x0, 5
        assert_eq!(cpu.registers().load(1), 5);
        assert_eq!(cpu.pc(), cpu.regions.user_program.start.wrapping_add(4));
    }

    #[test]
    fn slli_shifts_by_immediate() {
        let mut cpu = Cpu::<u32, _>::rv32i(vec![]);
        cpu.registers_mut().store(1, 0x0F);
        // SLLI x3, x1, 3
        cpu.step_with(encode_slli());
        assert_eq!(cpu.registers().load(3), 0x78);
        assert_eq!(cpu.registers().load(1), 0x0F);
    }

    fn encode_slli() -> u32 {
        use crate::decode::{opcode, Decoded, Format};
        encode(&Decoded {
            valid: true,
            opcode: opcode::ARITH_LOG_I,
            format: Format::I,
            imm: 3,
            rd: 3,
            rs1: 1,
            rs2: 0,
            funct3: 1,
            funct7: 0,
        })
    }

    #[test]
    fn store_at_zero_sets_saz_and_run_stops() {
        let mut cpu = Cpu::<u32, _>::rv32i(vec![]);
        // SB x1, 0(x0) with PC in the bootloader region (unchecked region,
        // so the store reaches memory and memory's own redirect fires).
        cpu.pc.store(0x4);
        cpu.mem.write_word(0x4, 0x0010_0023, 4, cpu.endian); // SB x1, 0(x0)
        let stop = cpu.step();
        assert!(stop);
        assert_eq!(cpu.mem.peek_byte(1) & 0x01, 0x01);
    }

    impl<W: Word, D: DebugHost<W>> Cpu<W, D> {
        fn registers_mut(&mut self) -> &mut RegisterFile<W> {
            &mut self.regs
        }
    }
}
