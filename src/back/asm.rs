//! The 64-bit RISC-V (RV64) emitter.
//!
//! A pure formatting pass: two walks over the global dictionary for the
//! data section, then one linear walk over the allocated IR for the text
//! section.  Output is GNU assembler syntax.
//!
//! # Call stack frame
//!
//! The stack grows down and every frame is 16-byte aligned.  Relative to
//! the frame pointer (`s0`, which holds the entry `sp`):
//!
//! ```txt
//!   s0 -  8   return address
//!   s0 - 16   caller's s0
//!   s0 - 20   frame slot 0 (first parameter, then locals)
//!   s0 - 24   frame slot 1
//!   ...
//!   sp        16 + round_up(4 * nslots, 16) below s0
//! ```
//!
//! Frame slots are 4-byte `int` words accessed with `lw`/`sw`; the 8-byte
//! slots used to save `ra`/`s0` and the call-site spill area use `ld`/`sd`.
//!
//! # Calling convention
//!
//! Arguments go in `a0..a7` and the result comes back in `a0`.  The caller
//! saves whatever scratch registers are live around a call: the allocator's
//! snapshot lists them, and the call site reserves `n*8 + 8` bytes, parks
//! `ra` at the bottom, spills the snapshot in order, and reloads in reverse
//! after the call.

use derive_more::Display;

use crate::common::Id;
use crate::middle::tir::{ArithOp, Frame, Inst, Program, Reg};

use super::regalloc::UsedRegs;

/// Word and pointer size for this processor.
const WORD_SIZE: i32 = 8;

/// Frame slots hold C `int`s.
const LOCAL_SIZE: i32 = 4;

/// Registers the generated code touches, in register-file order.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Register {
    #[display("ra")]
    Ra,
    #[display("sp")]
    Sp,
    #[display("t0")]
    T0,
    #[display("t1")]
    T1,
    #[display("t2")]
    T2,
    #[display("s0")]
    S0,
    #[display("a0")]
    A0,
    #[display("a1")]
    A1,
    #[display("a2")]
    A2,
    #[display("a3")]
    A3,
    #[display("a4")]
    A4,
    #[display("a5")]
    A5,
    #[display("a6")]
    A6,
    #[display("a7")]
    A7,
    #[display("t3")]
    T3,
    #[display("t4")]
    T4,
    #[display("t5")]
    T5,
    #[display("t6")]
    T6,
}

use Register::*;

/// The scratch pool, indexed by what allocation leaves in `Reg`.  Argument
/// slots take the tail so that argument `i` maps to index `14 - i`.
pub static TEMP_REGS: [Register; 15] = [
    T0, T1, T2, T3, T4, T5, T6, A7, A6, A5, A4, A3, A2, A1, A0,
];

#[derive(Display)]
pub enum EmitError {
    #[display("no storage for identifier '{_0}'")]
    UnknownSymbol(Id),
    #[display("no frame recorded for function '{_0}'")]
    UnknownFrame(Id),
    #[display("call to '{_0}' carries no register snapshot")]
    MissingSnapshot(Id),
    #[display("register index {_0} outside the scratch pool")]
    BadRegister(u32),
    #[display("argument slot {_0} has no argument register")]
    BadArgSlot(usize),
    #[display("return instruction outside a function")]
    StrayReturn,
}

impl std::fmt::Debug for EmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Render the allocated program as assembly text.
pub fn emit(program: &Program, used: &UsedRegs) -> Result<String, EmitError> {
    let mut emitter = Emitter {
        program,
        used,
        out: String::new(),
        frame: None,
    };
    emitter.run()?;
    tracing::debug!(bytes = emitter.out.len(), "emitted assembly");
    Ok(emitter.out)
}

fn temp_reg(r: Reg) -> Result<Register, EmitError> {
    TEMP_REGS
        .get(r.0 as usize)
        .copied()
        .ok_or(EmitError::BadRegister(r.0))
}

fn arg_reg(slot: usize) -> Result<Register, EmitError> {
    TEMP_REGS
        .len()
        .checked_sub(slot + 1)
        .and_then(|i| TEMP_REGS.get(i).copied())
        .ok_or(EmitError::BadArgSlot(slot))
}

fn round_up16(bytes: i32) -> i32 {
    (bytes + 15) & !15
}

struct Emitter<'a> {
    program: &'a Program,
    used: &'a UsedRegs,
    out: String,
    frame: Option<FrameCtx<'a>>,
}

struct FrameCtx<'a> {
    frame: &'a Frame,
    size: i32,
}

impl<'a> Emitter<'a> {
    fn put(&mut self, line: impl AsRef<str>) {
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    fn run(&mut self) -> Result<(), EmitError> {
        self.data_section();
        let program = self.program;
        for inst in &program.insts {
            self.inst(inst)?;
        }
        Ok(())
    }

    // Initialized globals become `.word`s in .data; the rest are `.comm`.
    fn data_section(&mut self) {
        let globals = &self.program.symbols.globals;
        if globals.is_empty() {
            return;
        }

        self.put("\t.section .data");
        for (name, var) in globals {
            if let Some(value) = var.init {
                if value != 0 {
                    self.put(format!("{name}:"));
                    self.put(format!("\t.word\t{value}"));
                }
            }
        }
        for (name, var) in globals {
            if var.init.unwrap_or(0) == 0 {
                self.put(format!("\t.comm {name}, 4, 4"));
            }
        }
        self.put("");
    }

    fn inst(&mut self, inst: &Inst) -> Result<(), EmitError> {
        match inst {
            Inst::FuncDef { name } => self.func_def(*name)?,
            Inst::FuncEnd { name } => {
                self.put(format!("\t.size {name}, . - {name}"));
                self.put("");
                self.frame = None;
            }

            Inst::Ret { value } => self.ret(*value)?,
            Inst::Call { dst, callee, snapshot } => self.call(*dst, *callee, *snapshot)?,

            Inst::Arg { slot, src } => {
                let line = format!("\tmv\t{}, {}", arg_reg(*slot)?, temp_reg(*src)?);
                self.put(line);
            }
            Inst::Param { addr, slot, .. } => {
                let line = format!("\tsw\t{}, 0({})", arg_reg(*slot)?, temp_reg(*addr)?);
                self.put(line);
            }

            Inst::Imm { dst, value } => {
                let line = format!("\tli\t{}, {}", temp_reg(*dst)?, value);
                self.put(line);
            }
            Inst::Mov { dst, src } => {
                let line = format!("\tmv\t{}, {}", temp_reg(*dst)?, temp_reg(*src)?);
                self.put(line);
            }
            Inst::LoadAddr { dst, name } => self.load_addr(*dst, *name)?,

            Inst::Bin { op, dst, src } => {
                let (dst, src) = (temp_reg(*dst)?, temp_reg(*src)?);
                match op {
                    // non-strict comparison: strict test, then flip
                    ArithOp::Slet => {
                        self.put(format!("\tslt\t{dst}, {dst}, {src}"));
                        self.put(format!("\txori\t{dst}, {dst}, 1"));
                    }
                    op => self.put(format!("\t{op}\t{dst}, {dst}, {src}")),
                }
            }
            Inst::Not { dst } => {
                let dst = temp_reg(*dst)?;
                self.put(format!("\tnot\t{dst}, {dst}"));
            }

            Inst::Store { addr, src } => {
                let line = format!("\tsw\t{}, 0({})", temp_reg(*src)?, temp_reg(*addr)?);
                self.put(line);
            }
            Inst::Load { dst, addr } => {
                let line = format!("\tlw\t{}, 0({})", temp_reg(*dst)?, temp_reg(*addr)?);
                self.put(line);
            }

            Inst::Beqz { cond, target } => {
                let line = format!("\tbeqz\t{}, {target}", temp_reg(*cond)?);
                self.put(line);
            }
            Inst::Jump { target } => self.put(format!("\tj\t{target}")),
            Inst::Label { label } => self.put(format!("{label}:")),

            Inst::Kill { .. } | Inst::KillArg { .. } | Inst::Nop => {}
        }
        Ok(())
    }

    fn func_def(&mut self, name: Id) -> Result<(), EmitError> {
        let frame = self
            .program
            .symbols
            .frames
            .get(&name)
            .ok_or(EmitError::UnknownFrame(name))?;
        let size = WORD_SIZE * 2 + round_up16(LOCAL_SIZE * frame.nslots as i32);

        self.put("\t.section .text");
        self.put(format!("\t.global {name}"));
        self.put(format!("\t.type {name}, @function"));
        self.put(format!("{name}:"));
        self.put(format!("\tsd\tra, -{WORD_SIZE}(sp)"));
        self.put(format!("\tsd\ts0, -{}(sp)", WORD_SIZE * 2));
        self.put("\tmv\ts0, sp");
        self.put(format!("\taddi\tsp, sp, -{size}"));

        self.frame = Some(FrameCtx { frame, size });
        Ok(())
    }

    fn ret(&mut self, value: Option<Reg>) -> Result<(), EmitError> {
        let Some(ctx) = &self.frame else {
            return Err(EmitError::StrayReturn);
        };
        let size = ctx.size;

        if let Some(r) = value {
            let line = format!("\tmv\ta0, {}", temp_reg(r)?);
            self.put(line);
        }
        self.put(format!("\tld\tra, -{WORD_SIZE}(s0)"));
        self.put(format!("\tld\ts0, -{}(s0)", WORD_SIZE * 2));
        self.put(format!("\taddi\tsp, sp, {size}"));
        self.put("\tret");
        Ok(())
    }

    /// Caller-saved spill and reload around a call: `ra` at the bottom of a
    /// fresh stack area, then each live register in snapshot order.
    fn call(&mut self, dst: Reg, callee: Id, snapshot: Option<usize>) -> Result<(), EmitError> {
        let live = snapshot
            .and_then(|index| self.used.get(index))
            .ok_or(EmitError::MissingSnapshot(callee))?;
        let area = live.len() as i32 * WORD_SIZE + WORD_SIZE;

        self.put(format!("\taddi\tsp, sp, -{area}"));
        self.put("\tsd\tra, 0(sp)");
        for (j, &index) in live.iter().enumerate() {
            let reg = temp_reg(Reg(index as u32))?;
            self.put(format!("\tsd\t{reg}, {}(sp)", (j as i32 + 1) * WORD_SIZE));
        }

        self.put(format!("\tcall\t{callee}"));

        for (j, &index) in live.iter().enumerate().rev() {
            let reg = temp_reg(Reg(index as u32))?;
            self.put(format!("\tld\t{reg}, {}(sp)", (j as i32 + 1) * WORD_SIZE));
        }
        self.put("\tld\tra, 0(sp)");
        self.put(format!("\taddi\tsp, sp, {area}"));

        let line = format!("\tmv\t{}, a0", temp_reg(dst)?);
        self.put(line);
        Ok(())
    }

    /// Frame-resident names resolve to an `s0`-relative slot address;
    /// file-scope names to their link-time symbol.
    fn load_addr(&mut self, dst: Reg, name: Id) -> Result<(), EmitError> {
        let dst = temp_reg(dst)?;

        if let Some(slot) = self.frame.as_ref().and_then(|c| c.frame.slot(name)) {
            let offset = WORD_SIZE * 2 + LOCAL_SIZE * (slot as i32 + 1);
            self.put(format!("\taddi\t{dst}, s0, -{offset}"));
            return Ok(());
        }

        if self.program.symbols.globals.contains_key(&name) {
            self.put(format!("\tla\t{dst}, {name}"));
            return Ok(());
        }

        Err(EmitError::UnknownSymbol(name))
    }
}
