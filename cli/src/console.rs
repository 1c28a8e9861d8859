//! A minimal stdin-driven debugger, selected by `--debug`.
//!
//! Mirrors the original's five-option console menu (continue / step / dump
//! registers / dump memory range / quit), minus "step": this engine has no
//! separate single-step mode outside the debugger loop itself.

use std::io::{self, BufRead, Write};

use riscy_core::debug::{DebugAction, DebugHost, DebugView};
use riscy_core::word::Word;

/// Breaks into an interactive prompt on every `EBREAK`.
#[derive(Default)]
pub struct ConsoleDebugHost;

impl<W: Word> DebugHost<W> for ConsoleDebugHost {
    fn breakpoint(&mut self, view: DebugView<'_, W>) -> DebugAction {
        let stdin = io::stdin();
        loop {
            print!("breakpoint at {:#x} > ", view.pc.to_u64());
            let _ = io::stdout().flush();

            let mut line = String::new();
            if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                // EOF on stdin: behave as `quit`.
                return DebugAction::Terminate;
            }

            match line.trim() {
                "" => continue,
                "c" | "continue" => return DebugAction::Continue,
                "q" | "quit" => return DebugAction::Terminate,
                "restart" => return DebugAction::Restart,
                "r" | "registers" => dump_registers(&view),
                cmd if cmd == "m" || cmd.starts_with("m ") => dump_memory(&view, cmd),
                other => println!(
                    "unknown command `{other}` (c[ontinue], r[egisters], m <addr> <len>, restart, q[uit])"
                ),
            }
        }
    }
}

fn dump_registers<W: Word>(view: &DebugView<'_, W>) {
    for i in 0..32u8 {
        println!("x{i:<2} = {:#x}", view.regs.load(i).to_u64());
    }
}

fn dump_memory<W: Word>(view: &DebugView<'_, W>, cmd: &str) {
    let mut args = cmd.split_whitespace().skip(1);
    let (Some(start), Some(len)) = (args.next(), args.next()) else {
        println!("usage: m <addr-hex> <len>");
        return;
    };
    let Ok(start) = u64::from_str_radix(start.trim_start_matches("0x"), 16) else {
        println!("bad address: {start}");
        return;
    };
    let Ok(len) = len.parse::<u64>() else {
        println!("bad length: {len}");
        return;
    };
    for offset in 0..len {
        let addr = W::from_u64(start.wrapping_add(offset));
        print!("{:02x} ", view.mem.peek_byte(addr));
    }
    println!();
}
