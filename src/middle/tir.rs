//! The tiny IR.
//!
//! A flat three-address instruction stream.  Register operands are virtual
//! numbers as produced by the lowering pass; the register allocator rewrites
//! them in place into indices of the physical pool (0..=14), which is the
//! only backwards mutation in the pipeline.

use std::fmt;

use derive_more::Display;

use crate::common::{Id, Map};

/// A register operand.  Holds a virtual register number before allocation
/// and a physical pool index after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[display("r{_0}")]
pub struct Reg(pub u32);

/// A label ordinal; printed as `.L{n}` in the generated assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
#[display(".L{_0}")]
pub struct LabelId(pub u32);

/// Binary operations with destination = left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ArithOp {
    #[display("add")]
    Add,
    #[display("sub")]
    Sub,
    #[display("mul")]
    Mul,
    #[display("div")]
    Div,
    #[display("rem")]
    Rem,
    #[display("and")]
    And,
    #[display("or")]
    Or,
    #[display("xor")]
    Xor,
    /// set if less than
    #[display("slt")]
    Slt,
    /// set if greater or equal; expands to `slt` + `xori , 1` at emit time
    #[display("slet")]
    Slet,
    #[display("sll")]
    Shl,
    #[display("srl")]
    Shr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    /// dst := constant
    Imm { dst: Reg, value: i32 },
    /// dst := src
    Mov { dst: Reg, src: Reg },
    /// dst := dst op src
    Bin { op: ArithOp, dst: Reg, src: Reg },
    /// dst := bitwise complement of dst
    Not { dst: Reg },
    /// dst := mem[addr]
    Load { dst: Reg, addr: Reg },
    /// mem[addr] := src
    Store { addr: Reg, src: Reg },
    /// dst := address of the named variable
    LoadAddr { dst: Reg, name: Id },
    /// branch to target if cond == 0
    Beqz { cond: Reg, target: LabelId },
    Jump { target: LabelId },
    Label { label: LabelId },
    Ret { value: Option<Reg> },
    /// release the physical register bound to this virtual register;
    /// rewritten to `Nop` by the allocator
    Kill { reg: Reg },
    /// release the argument register for slot `slot`
    KillArg { slot: usize },
    FuncDef { name: Id },
    FuncEnd { name: Id },
    /// dst := call callee; `snapshot` indexes the allocator's used-register
    /// side table once allocation has run
    Call {
        dst: Reg,
        callee: Id,
        snapshot: Option<usize>,
    },
    /// place the already-evaluated argument `src` into argument slot `slot`
    Arg { slot: usize, src: Reg },
    /// store incoming argument `slot` into the parameter's memory slot
    Param { addr: Reg, slot: usize, name: Id },
    Nop,
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Inst::*;

        match self {
            Imm { dst, value } => write!(f, "imm {dst}, {value}"),
            Mov { dst, src } => write!(f, "mov {dst}, {src}"),
            Bin { op, dst, src } => write!(f, "{op} {dst}, {src}"),
            Not { dst } => write!(f, "not {dst}"),
            Load { dst, addr } => write!(f, "load {dst}, [{addr}]"),
            Store { addr, src } => write!(f, "store [{addr}], {src}"),
            LoadAddr { dst, name } => write!(f, "loadaddr {dst}, {name}"),
            Beqz { cond, target } => write!(f, "beqz {cond}, {target}"),
            Jump { target } => write!(f, "jump {target}"),
            Label { label } => write!(f, "label {label}"),
            Ret { value: Some(r) } => write!(f, "return {r}"),
            Ret { value: None } => write!(f, "return"),
            Kill { reg } => write!(f, "kill {reg}"),
            KillArg { slot } => write!(f, "kill_arg {slot}"),
            FuncDef { name } => write!(f, "func_def {name}"),
            FuncEnd { name } => write!(f, "func_end {name}"),
            Call { dst, callee, snapshot } => match snapshot {
                Some(s) => write!(f, "call {dst}, {callee} (regs {s})"),
                None => write!(f, "call {dst}, {callee}"),
            },
            Arg { slot, src } => write!(f, "arg {slot}, {src}"),
            Param { addr, slot, name } => write!(f, "param [{addr}], {slot}, {name}"),
            Nop => write!(f, "nop"),
        }
    }
}

/// A file-scope variable.  `init` is the constant initializer, if any; the
/// emitter places nonzero-initialized globals in `.data` and the rest in
/// `.comm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalVar {
    pub init: Option<i32>,
}

/// Frame layout of one function: every parameter and local gets a 4-byte
/// slot, parameters first in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub slots: Map<Id, usize>,
    pub nslots: usize,
}

impl Frame {
    pub fn slot(&self, name: Id) -> Option<usize> {
        self.slots.get(&name).copied()
    }
}

/// Names known to the compilation: globals at scope level 0 and one frame
/// per function for scope level 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolTable {
    pub globals: Map<Id, GlobalVar>,
    pub frames: Map<Id, Frame>,
}

/// A lowered program: the instruction stream plus the symbol dictionary the
/// emitter needs for the data section and frame addressing.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub insts: Vec<Inst>,
    pub symbols: SymbolTable,
}
