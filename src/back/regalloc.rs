//! The register allocator.
//!
//! A single linear scan over the IR that binds virtual registers to the
//! 15-register scratch pool on first use and releases them at their kill
//! markers.  Operand fields are rewritten in place from virtual numbers to
//! pool indices; `Kill` becomes `Nop`.
//!
//! Argument slots take the tail of the pool, so argument `i` is forced to
//! index `14 - i` (`a0` backwards through `a7`).

use std::fmt::Debug;

use derive_more::Display;

use crate::common::Map;
use crate::middle::tir::{Inst, Program, Reg};

/// Size of the scratch pool: `t0..t6` plus `a7..a0`.
pub const NUM_TEMP_REGS: usize = 15;

#[derive(Display)]
pub enum RegAllocError {
    #[display("out of registers: more than {NUM_TEMP_REGS} values live at once")]
    Exhausted,
    #[display("argument register for argument {_0} is already occupied")]
    ArgumentCollision(usize),
    #[display("virtual register r{_0} used before it was allocated")]
    Unallocated(u32),
}

impl Debug for RegAllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Per-call-site snapshots of the pool, recorded at every `Call` and
/// consumed by the emitter to save and restore exactly the live registers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UsedRegs {
    sets: Vec<Vec<usize>>,
}

impl UsedRegs {
    /// The pool indices that were live when snapshot `index` was taken.
    pub fn get(&self, index: usize) -> Option<&[usize]> {
        self.sets.get(index).map(Vec::as_slice)
    }
}

/// Bind every virtual register in the program to a pool index.
pub fn allocate(program: &mut Program) -> Result<UsedRegs, RegAllocError> {
    let mut a = Allocator::default();

    for inst in &mut program.insts {
        match inst {
            Inst::Imm { dst, .. } | Inst::LoadAddr { dst, .. } => a.alloc(dst)?,

            Inst::Arg { slot, src } => {
                a.alloc(src)?;
                a.force_arg(*slot)?;
            }

            Inst::Call { dst, snapshot, .. } => {
                // The snapshot is taken before the destination is bound, so
                // a call's own result register is not spilled around it.
                *snapshot = Some(a.record());
                a.alloc(dst)?;
            }

            Inst::Mov { dst, src } | Inst::Bin { dst, src, .. } => {
                a.alloc(dst)?;
                a.alloc(src)?;
            }

            Inst::Load { dst, addr } => {
                a.alloc(dst)?;
                a.alloc(addr)?;
            }

            Inst::Store { addr, src } => {
                a.lookup(addr)?;
                a.alloc(src)?;
            }

            Inst::Ret { value: Some(r) } => a.lookup(r)?,
            Inst::Beqz { cond, .. } => a.lookup(cond)?,
            Inst::Not { dst } => a.lookup(dst)?,
            Inst::Param { addr, .. } => a.lookup(addr)?,

            Inst::Kill { reg } => {
                a.release(*reg)?;
                *inst = Inst::Nop;
            }

            Inst::KillArg { slot } => a.release_arg(*slot),

            Inst::Ret { value: None }
            | Inst::Jump { .. }
            | Inst::Label { .. }
            | Inst::FuncDef { .. }
            | Inst::FuncEnd { .. }
            | Inst::Nop => {}
        }
    }

    tracing::debug!(snapshots = a.snapshots.len(), "allocated registers");

    Ok(UsedRegs { sets: a.snapshots })
}

#[derive(Default)]
struct Allocator {
    /// virtual register number -> pool index
    map: Map<u32, usize>,
    used: [bool; NUM_TEMP_REGS],
    snapshots: Vec<Vec<usize>>,
}

impl Allocator {
    /// Bind `reg` to its pool index, claiming the first free one on first
    /// use, and rewrite the operand in place.
    fn alloc(&mut self, reg: &mut Reg) -> Result<(), RegAllocError> {
        if let Some(&index) = self.map.get(&reg.0) {
            reg.0 = index as u32;
            return Ok(());
        }

        let Some(index) = self.used.iter().position(|&used| !used) else {
            return Err(RegAllocError::Exhausted);
        };
        self.used[index] = true;
        self.map.insert(reg.0, index);
        reg.0 = index as u32;
        Ok(())
    }

    /// Rewrite an operand that must already have a binding.
    fn lookup(&self, reg: &mut Reg) -> Result<(), RegAllocError> {
        let Some(&index) = self.map.get(&reg.0) else {
            return Err(RegAllocError::Unallocated(reg.0));
        };
        reg.0 = index as u32;
        Ok(())
    }

    /// Claim the argument register for `slot`.  Failing here instead of
    /// handing out a bogus index keeps a collision from reaching the
    /// emitter.
    fn force_arg(&mut self, slot: usize) -> Result<(), RegAllocError> {
        let index = NUM_TEMP_REGS - 1 - slot;
        if self.used[index] {
            return Err(RegAllocError::ArgumentCollision(slot));
        }
        self.used[index] = true;
        Ok(())
    }

    fn release(&mut self, reg: Reg) -> Result<(), RegAllocError> {
        let Some(&index) = self.map.get(&reg.0) else {
            return Err(RegAllocError::Unallocated(reg.0));
        };
        self.used[index] = false;
        Ok(())
    }

    fn release_arg(&mut self, slot: usize) {
        self.used[NUM_TEMP_REGS - 1 - slot] = false;
    }

    fn record(&mut self) -> usize {
        let live: Vec<usize> = (0..NUM_TEMP_REGS).filter(|&i| self.used[i]).collect();
        self.snapshots.push(live);
        self.snapshots.len() - 1
    }
}
