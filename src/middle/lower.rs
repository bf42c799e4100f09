//! Lowering from the AST to the tiny IR.
//!
//! A single forward walk that hands out virtual register numbers and label
//! ordinals from monotonic counters and records globals and per-function
//! frame slots in the symbol table as it encounters declarations.

use std::fmt::Debug;

use derive_more::Display;

use crate::common::{Id, Map};
use crate::front::ast::{
    self, BinOp, CompoundStmt, Declaration, Expr, FuncDef, Stmt, UnaryOp,
};
use crate::middle::tir::{
    ArithOp, Frame, GlobalVar, Inst, LabelId, Program, Reg, SymbolTable,
};

/// Incoming arguments beyond `a7` would need stack slots in the caller.
const MAX_ARGS: usize = 8;

#[derive(Display)]
pub enum LowerError {
    #[display("uninitialized identifier: {_0}")]
    Undeclared(Id),
    #[display("redeclaration of '{_0}'")]
    Redeclaration(Id),
    #[display("assignment target must be an identifier")]
    AssignTargetNotIdent,
    #[display("assignment cannot be used as a value")]
    AssignAsValue,
    #[display("too many arguments in call to '{_0}' (at most {MAX_ARGS})")]
    TooManyArgs(Id),
    #[display("too many parameters in definition of '{_0}' (at most {MAX_ARGS})")]
    TooManyParams(Id),
    #[display("initializer for global '{_0}' must be an integer constant")]
    NonConstGlobalInit(Id),
}

impl Debug for LowerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Lower a parsed translation unit to the linear IR.
pub fn lower(program: &ast::Program) -> Result<Program, LowerError> {
    let mut ctx = Lowering::default();

    for decl in &program.decls {
        match decl {
            ast::ExternalDecl::Var(d) => ctx.global(d)?,
            ast::ExternalDecl::Func(f) => ctx.func(f)?,
        }
    }

    tracing::debug!(insts = ctx.insts.len(), "lowered");

    Ok(Program {
        insts: ctx.insts,
        symbols: SymbolTable {
            globals: ctx.globals,
            frames: ctx.frames,
        },
    })
}

#[derive(Default)]
struct Lowering {
    insts: Vec<Inst>,
    globals: Map<Id, GlobalVar>,
    frames: Map<Id, Frame>,
    current: Option<CurrentFn>,
    rn: u32,
    ln: u32,
}

struct CurrentFn {
    name: Id,
    frame: Frame,
}

impl Lowering {
    fn push(&mut self, inst: Inst) {
        self.insts.push(inst);
    }

    fn fresh_reg(&mut self) -> Reg {
        let r = Reg(self.rn);
        self.rn += 1;
        r
    }

    fn fresh_label(&mut self) -> LabelId {
        let l = LabelId(self.ln);
        self.ln += 1;
        l
    }

    fn kill(&mut self, reg: Reg) {
        self.push(Inst::Kill { reg });
    }

    fn is_declared(&self, name: Id) -> bool {
        let in_frame = self
            .current
            .as_ref()
            .is_some_and(|c| c.frame.slots.contains_key(&name));
        in_frame || self.globals.contains_key(&name)
    }

    /// Record a file-scope declaration.  The instruction stream is
    /// untouched; the emitter materializes globals from the symbol table.
    fn global(&mut self, d: &Declaration) -> Result<(), LowerError> {
        for init in &d.inits {
            if self.globals.contains_key(&init.name) || self.frames.contains_key(&init.name) {
                return Err(LowerError::Redeclaration(init.name));
            }
            let value = match &init.init {
                None => None,
                Some(e) => Some(
                    const_value(e).ok_or(LowerError::NonConstGlobalInit(init.name))?,
                ),
            };
            self.globals.insert(init.name, GlobalVar { init: value });
        }
        Ok(())
    }

    fn func(&mut self, f: &FuncDef) -> Result<(), LowerError> {
        if self.frames.contains_key(&f.name) || self.globals.contains_key(&f.name) {
            return Err(LowerError::Redeclaration(f.name));
        }
        if f.params.len() > MAX_ARGS {
            return Err(LowerError::TooManyParams(f.name));
        }

        self.push(Inst::FuncDef { name: f.name });
        self.current = Some(CurrentFn {
            name: f.name,
            frame: Frame::default(),
        });

        // Copy each incoming argument register into its frame slot.
        for (i, p) in f.params.iter().enumerate() {
            self.declare_local(p.name)?;
            let t = self.fresh_reg();
            self.push(Inst::LoadAddr { dst: t, name: p.name });
            self.push(Inst::Param {
                addr: t,
                slot: i,
                name: p.name,
            });
            self.kill(t);
            self.push(Inst::KillArg { slot: i });
        }

        self.compound(&f.body)?;

        // A body that can fall off the end still needs an epilogue.
        if !self.ends_with_return() {
            self.push(Inst::Ret { value: None });
        }
        self.push(Inst::FuncEnd { name: f.name });

        if let Some(done) = self.current.take() {
            self.frames.insert(done.name, done.frame);
        }
        Ok(())
    }

    /// Does the instruction stream end in a `Ret`, looking through kills?
    /// A trailing label is a jump target, so control may still arrive there.
    fn ends_with_return(&self) -> bool {
        self.insts
            .iter()
            .rev()
            .find(|inst| !matches!(inst, Inst::Kill { .. } | Inst::Nop))
            .is_some_and(|inst| matches!(inst, Inst::Ret { .. }))
    }

    fn declare_local(&mut self, name: Id) -> Result<(), LowerError> {
        let Some(current) = self.current.as_mut() else {
            return Err(LowerError::Undeclared(name));
        };
        if current.frame.slots.contains_key(&name) {
            return Err(LowerError::Redeclaration(name));
        }
        let slot = current.frame.nslots;
        current.frame.slots.insert(name, slot);
        current.frame.nslots += 1;
        Ok(())
    }

    fn compound(&mut self, c: &CompoundStmt) -> Result<(), LowerError> {
        for d in &c.decls {
            for init in &d.inits {
                self.declare_local(init.name)?;
                if let Some(e) = &init.init {
                    self.store_to(init.name, e)?;
                }
            }
        }
        for s in &c.stmts {
            self.stmt(s)?;
        }
        Ok(())
    }

    fn stmt(&mut self, s: &Stmt) -> Result<(), LowerError> {
        match s {
            Stmt::Compound(c) => self.compound(c),
            Stmt::Expr(None) => Ok(()),
            Stmt::Expr(Some(Expr::Assign { target, value })) => self.assign(target, value),
            Stmt::Expr(Some(e)) => {
                let r = self.expr(e)?;
                self.kill(r);
                Ok(())
            }
            Stmt::Return(Some(e)) => {
                let r = self.expr(e)?;
                self.push(Inst::Ret { value: Some(r) });
                self.kill(r);
                Ok(())
            }
            Stmt::Return(None) => {
                self.push(Inst::Ret { value: None });
                Ok(())
            }
            Stmt::If { cond, then, els } => {
                let rc = self.expr(cond)?;
                let l1 = self.fresh_label();
                self.push(Inst::Beqz {
                    cond: rc,
                    target: l1,
                });
                self.kill(rc);
                self.stmt(then)?;
                if let Some(els) = els {
                    let l2 = self.fresh_label();
                    self.push(Inst::Jump { target: l2 });
                    self.push(Inst::Label { label: l1 });
                    self.stmt(els)?;
                    self.push(Inst::Label { label: l2 });
                } else {
                    self.push(Inst::Label { label: l1 });
                }
                Ok(())
            }
        }
    }

    /// `target = value`: the value is evaluated first, then the target as an
    /// ordinary (discarded) identifier load, then the address for the store.
    /// All three registers are released.
    fn assign(&mut self, target: &Expr, value: &Expr) -> Result<(), LowerError> {
        let Expr::Ident(name) = target else {
            return Err(LowerError::AssignTargetNotIdent);
        };
        let rhs = self.expr(value)?;
        let lhs = self.expr(target)?;
        let t = self.fresh_reg();
        self.push(Inst::LoadAddr { dst: t, name: *name });
        self.push(Inst::Store { addr: t, src: rhs });
        self.kill(lhs);
        self.kill(rhs);
        self.kill(t);
        Ok(())
    }

    /// Store an initializer value to a just-declared local.
    fn store_to(&mut self, name: Id, value: &Expr) -> Result<(), LowerError> {
        let r = self.expr(value)?;
        let t = self.fresh_reg();
        self.push(Inst::LoadAddr { dst: t, name });
        self.push(Inst::Store { addr: t, src: r });
        self.kill(r);
        self.kill(t);
        Ok(())
    }

    /// Lower an expression in a value position and return the register
    /// holding its result.
    fn expr(&mut self, e: &Expr) -> Result<Reg, LowerError> {
        match e {
            // An assignment releases everything it touches, so it has no
            // usable result register.
            Expr::Assign { .. } => Err(LowerError::AssignAsValue),

            Expr::Const(value) => {
                let dst = self.fresh_reg();
                self.push(Inst::Imm { dst, value: *value });
                Ok(dst)
            }

            Expr::Ident(name) => {
                if !self.is_declared(*name) {
                    return Err(LowerError::Undeclared(*name));
                }
                let addr = self.fresh_reg();
                let dst = self.fresh_reg();
                self.push(Inst::LoadAddr { dst: addr, name: *name });
                self.push(Inst::Load { dst, addr });
                self.kill(addr);
                Ok(dst)
            }

            Expr::Unary { op, operand } => {
                // No left operand in the source; synthesize a zero.
                let dst = self.fresh_reg();
                self.push(Inst::Imm { dst, value: 0 });
                let rhs = self.expr(operand)?;
                let op = match op {
                    UnaryOp::Plus => ArithOp::Add,
                    UnaryOp::Neg => ArithOp::Sub,
                };
                self.push(Inst::Bin { op, dst, src: rhs });
                self.kill(rhs);
                Ok(dst)
            }

            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),

            Expr::Call { callee, args } => {
                if args.len() > MAX_ARGS {
                    return Err(LowerError::TooManyArgs(*callee));
                }
                for (slot, arg) in args.iter().enumerate() {
                    let src = self.expr(arg)?;
                    self.push(Inst::Arg { slot, src });
                    self.kill(src);
                    self.push(Inst::KillArg { slot });
                }
                let dst = self.fresh_reg();
                self.push(Inst::Call {
                    dst,
                    callee: *callee,
                    snapshot: None,
                });
                Ok(dst)
            }
        }
    }

    fn binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Reg, LowerError> {
        let l = self.expr(lhs)?;
        let r = self.expr(rhs)?;

        let simple = |op| (op, l, r);
        let (op, dst, src) = match op {
            BinOp::Add => simple(ArithOp::Add),
            BinOp::Sub => simple(ArithOp::Sub),
            BinOp::Mul => simple(ArithOp::Mul),
            BinOp::Div => simple(ArithOp::Div),
            BinOp::Rem => simple(ArithOp::Rem),
            BinOp::And => simple(ArithOp::And),
            BinOp::Or | BinOp::LogicalOr => simple(ArithOp::Or),
            BinOp::Xor => simple(ArithOp::Xor),
            BinOp::Shl => simple(ArithOp::Shl),
            BinOp::Shr => simple(ArithOp::Shr),

            // a && b == !(!a | !b)
            BinOp::LogicalAnd => {
                self.push(Inst::Not { dst: l });
                self.push(Inst::Not { dst: r });
                self.push(Inst::Bin {
                    op: ArithOp::Or,
                    dst: l,
                    src: r,
                });
                self.push(Inst::Not { dst: l });
                self.kill(r);
                return Ok(l);
            }

            // a == b and a != b both subtract; equality complements
            BinOp::Eq => {
                self.push(Inst::Bin {
                    op: ArithOp::Sub,
                    dst: l,
                    src: r,
                });
                self.push(Inst::Not { dst: l });
                self.kill(r);
                return Ok(l);
            }
            BinOp::Ne => simple(ArithOp::Sub),

            // slt computes strict less-than; the non-strict form expands to
            // slt + xori at emit time.  > and <= swap the operands.
            BinOp::Lt => simple(ArithOp::Slt),
            BinOp::Gt => (ArithOp::Slt, r, l),
            BinOp::Ge => simple(ArithOp::Slet),
            BinOp::Le => (ArithOp::Slet, r, l),
        };

        self.push(Inst::Bin { op, dst, src });
        self.kill(src);
        Ok(dst)
    }
}

/// Fold the constant initializer forms `k`, `+k`, and `-k`.
fn const_value(e: &Expr) -> Option<i32> {
    match e {
        Expr::Const(k) => Some(*k),
        Expr::Unary { op, operand } => match (op, operand.as_ref()) {
            (UnaryOp::Plus, Expr::Const(k)) => Some(*k),
            (UnaryOp::Neg, Expr::Const(k)) => Some(k.wrapping_neg()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::intern;
    use crate::front::{lex::tokenize, parse::parse};
    use ArithOp::*;
    use Inst::*;

    fn lower_str(input: &str) -> Result<Program, LowerError> {
        lower(&parse(&tokenize(input).unwrap()).unwrap())
    }

    fn insts(input: &str) -> Vec<Inst> {
        lower_str(input).unwrap().insts
    }

    fn r(n: u32) -> Reg {
        Reg(n)
    }

    #[test]
    fn return_of_a_constant() {
        assert_eq!(insts("int main(){ return 0; }"), vec![
            Inst::FuncDef { name: intern("main") },
            Imm { dst: r(0), value: 0 },
            Ret { value: Some(r(0)) },
            Kill { reg: r(0) },
            FuncEnd { name: intern("main") },
        ]);
    }

    #[test]
    fn identifier_reference_loads_through_its_address() {
        let g = intern("g");
        assert_eq!(insts("int g; int main(){ return g; }"), vec![
            Inst::FuncDef { name: intern("main") },
            LoadAddr { dst: r(0), name: g },
            Load { dst: r(1), addr: r(0) },
            Kill { reg: r(0) },
            Ret { value: Some(r(1)) },
            Kill { reg: r(1) },
            FuncEnd { name: intern("main") },
        ]);
    }

    #[test]
    fn undeclared_identifier_is_fatal() {
        assert!(matches!(
            lower_str("int main(){ return x; }"),
            Err(LowerError::Undeclared(_))
        ));
    }

    #[test]
    fn binary_op_reuses_lhs_and_kills_rhs() {
        assert_eq!(insts("int main(){ return 1+2; }"), vec![
            Inst::FuncDef { name: intern("main") },
            Imm { dst: r(0), value: 1 },
            Imm { dst: r(1), value: 2 },
            Bin { op: Add, dst: r(0), src: r(1) },
            Kill { reg: r(1) },
            Ret { value: Some(r(0)) },
            Kill { reg: r(0) },
            FuncEnd { name: intern("main") },
        ]);
    }

    #[test]
    fn unary_minus_synthesizes_a_zero() {
        assert_eq!(insts("int main(){ return -5; }"), vec![
            Inst::FuncDef { name: intern("main") },
            Imm { dst: r(0), value: 0 },
            Imm { dst: r(1), value: 5 },
            Bin { op: Sub, dst: r(0), src: r(1) },
            Kill { reg: r(1) },
            Ret { value: Some(r(0)) },
            Kill { reg: r(0) },
            FuncEnd { name: intern("main") },
        ]);
    }

    #[test]
    fn logical_and_is_not_not_or_not() {
        let found = insts("int main(){ return 1 && 2; }");
        let core: Vec<Inst> = found[3..7].to_vec();
        assert_eq!(core, vec![
            Not { dst: r(0) },
            Not { dst: r(1) },
            Bin { op: Or, dst: r(0), src: r(1) },
            Not { dst: r(0) },
        ]);
    }

    #[test]
    fn equality_subtracts_then_complements() {
        let found = insts("int main(){ return 1 == 2; }");
        assert_eq!(found[3..5].to_vec(), vec![
            Bin { op: Sub, dst: r(0), src: r(1) },
            Not { dst: r(0) },
        ]);

        let found = insts("int main(){ return 1 != 2; }");
        assert_eq!(found[3], Bin { op: Sub, dst: r(0), src: r(1) });
        assert_eq!(found[4], Kill { reg: r(1) });
    }

    #[test]
    fn greater_than_swaps_operands() {
        let found = insts("int main(){ return 1 > 2; }");
        assert_eq!(found[3], Bin { op: Slt, dst: r(1), src: r(0) });
        assert_eq!(found[4], Kill { reg: r(0) });
        assert_eq!(found[5], Ret { value: Some(r(1)) });
    }

    #[test]
    fn less_or_equal_swaps_and_uses_slet() {
        let found = insts("int main(){ return 1 <= 2; }");
        assert_eq!(found[3], Bin { op: Slet, dst: r(1), src: r(0) });
    }

    #[test]
    fn if_else_label_protocol() {
        assert_eq!(insts("int main(){ if (1) return 1; else return 2; }"), vec![
            Inst::FuncDef { name: intern("main") },
            Imm { dst: r(0), value: 1 },
            Beqz { cond: r(0), target: LabelId(0) },
            Kill { reg: r(0) },
            Imm { dst: r(1), value: 1 },
            Ret { value: Some(r(1)) },
            Kill { reg: r(1) },
            Jump { target: LabelId(1) },
            Label { label: LabelId(0) },
            Imm { dst: r(2), value: 2 },
            Ret { value: Some(r(2)) },
            Kill { reg: r(2) },
            Label { label: LabelId(1) },
            // the join label is a jump target, so the epilogue is synthesized
            Ret { value: None },
            FuncEnd { name: intern("main") },
        ]);
    }

    #[test]
    fn if_without_else_places_one_label() {
        let found = insts("int main(){ if (0) return 1; return 2; }");
        let labels: Vec<&Inst> = found
            .iter()
            .filter(|i| matches!(i, Label { .. } | Jump { .. } | Beqz { .. }))
            .collect();
        assert_eq!(labels, vec![
            &Beqz { cond: r(0), target: LabelId(0) },
            &Label { label: LabelId(0) },
        ]);
    }

    #[test]
    fn call_protocol_fills_argument_slots_in_order() {
        let f = intern("f");
        assert_eq!(insts("int main(){ return f(1, 2); }"), vec![
            Inst::FuncDef { name: intern("main") },
            Imm { dst: r(0), value: 1 },
            Arg { slot: 0, src: r(0) },
            Kill { reg: r(0) },
            KillArg { slot: 0 },
            Imm { dst: r(1), value: 2 },
            Arg { slot: 1, src: r(1) },
            Kill { reg: r(1) },
            KillArg { slot: 1 },
            Call { dst: r(2), callee: f, snapshot: None },
            Ret { value: Some(r(2)) },
            Kill { reg: r(2) },
            FuncEnd { name: intern("main") },
        ]);
    }

    #[test]
    fn parameters_are_stored_to_their_slots() {
        let a = intern("a");
        let found = insts("int f(int a){ return a; }");
        assert_eq!(found[1..5].to_vec(), vec![
            LoadAddr { dst: r(0), name: a },
            Param { addr: r(0), slot: 0, name: a },
            Kill { reg: r(0) },
            KillArg { slot: 0 },
        ]);
    }

    #[test]
    fn parameters_and_locals_share_the_frame() {
        let program = lower_str("int f(int a, int b){ int c; c = 1; return a+b+c; }").unwrap();
        let frame = &program.symbols.frames[&intern("f")];
        assert_eq!(frame.nslots, 3);
        assert_eq!(frame.slot(intern("a")), Some(0));
        assert_eq!(frame.slot(intern("b")), Some(1));
        assert_eq!(frame.slot(intern("c")), Some(2));
    }

    #[test]
    fn assignment_evaluates_value_then_target() {
        let a = intern("a");
        let found = insts("int main(){ int a; a = 5; return 0; }");
        assert_eq!(found[1..10].to_vec(), vec![
            Imm { dst: r(0), value: 5 },
            LoadAddr { dst: r(1), name: a },
            Load { dst: r(2), addr: r(1) },
            Kill { reg: r(1) },
            LoadAddr { dst: r(3), name: a },
            Store { addr: r(3), src: r(0) },
            Kill { reg: r(2) },
            Kill { reg: r(0) },
            Kill { reg: r(3) },
        ]);
    }

    #[test]
    fn local_initializer_stores_without_a_target_load() {
        let a = intern("a");
        let found = insts("int main(){ int a = 5; return 0; }");
        assert_eq!(found[1..6].to_vec(), vec![
            Imm { dst: r(0), value: 5 },
            LoadAddr { dst: r(1), name: a },
            Store { addr: r(1), src: r(0) },
            Kill { reg: r(0) },
            Kill { reg: r(1) },
        ]);
    }

    #[test]
    fn expression_statement_releases_its_result() {
        let found = insts("int main(){ f(); return 0; }");
        assert_eq!(found[1..3].to_vec(), vec![
            Call { dst: r(0), callee: intern("f"), snapshot: None },
            Kill { reg: r(0) },
        ]);
    }

    #[test]
    fn globals_record_their_initializers() {
        let program = lower_str("int a = 3, b, c = 0; int d = -1; int main(){ return 0; }")
            .unwrap();
        let globals = &program.symbols.globals;
        assert_eq!(globals[&intern("a")].init, Some(3));
        assert_eq!(globals[&intern("b")].init, None);
        assert_eq!(globals[&intern("c")].init, Some(0));
        assert_eq!(globals[&intern("d")].init, Some(-1));
    }

    #[test]
    fn non_constant_global_initializer_is_fatal() {
        assert!(matches!(
            lower_str("int g = f(); int main(){ return 0; }"),
            Err(LowerError::NonConstGlobalInit(_))
        ));
        assert!(matches!(
            lower_str("int g = 1+2; int main(){ return 0; }"),
            Err(LowerError::NonConstGlobalInit(_))
        ));
    }

    #[test]
    fn assignment_has_no_value() {
        assert!(matches!(
            lower_str("int main(){ int a, b; a = b = 1; }"),
            Err(LowerError::AssignAsValue)
        ));
        assert!(matches!(
            lower_str("int main(){ int a; return a = 1; }"),
            Err(LowerError::AssignAsValue)
        ));
    }

    #[test]
    fn redeclarations_are_fatal() {
        assert!(matches!(
            lower_str("int a; int a; int main(){ return 0; }"),
            Err(LowerError::Redeclaration(_))
        ));
        assert!(matches!(
            lower_str("int main(){ int a; int a; }"),
            Err(LowerError::Redeclaration(_))
        ));
        assert!(matches!(
            lower_str("int f(){ return 0; } int f(){ return 1; } int main(){ return 0; }"),
            Err(LowerError::Redeclaration(_))
        ));
    }

    #[test]
    fn too_many_call_arguments_is_fatal() {
        assert!(matches!(
            lower_str("int main(){ return f(1,2,3,4,5,6,7,8,9); }"),
            Err(LowerError::TooManyArgs(_))
        ));
    }

    #[test]
    fn local_shadows_global() {
        let program = lower_str("int a = 7; int main(){ int a; a = 1; return a; }").unwrap();
        // the frame owns `a`, so loads resolve to the slot, not the global
        assert_eq!(program.symbols.frames[&intern("main")].slot(intern("a")), Some(0));
        assert_eq!(program.symbols.globals[&intern("a")].init, Some(7));
    }

    // stream invariants: labels placed once, jumps target existing labels,
    // one FuncEnd per FuncDef, kills precede any further use
    #[test]
    fn stream_invariants_hold_for_a_larger_program() {
        let src = "int g = 1;
                   int f(int a){ if (a <= 0) return 1; else return a * f(a - 1); }
                   int main(){ int x; x = f(5); return x && g; }";
        let program = lower_str(src).unwrap();

        let mut placed = Vec::new();
        let mut targets = Vec::new();
        let mut defs = 0;
        let mut ends = 0;
        for inst in &program.insts {
            match inst {
                Label { label } => placed.push(*label),
                Jump { target } | Beqz { target, .. } => targets.push(*target),
                Inst::FuncDef { .. } => defs += 1,
                FuncEnd { .. } => ends += 1,
                _ => {}
            }
        }
        let unique: crate::common::Set<_> = placed.iter().collect();
        assert_eq!(unique.len(), placed.len(), "labels must be placed once");
        for t in targets {
            assert!(placed.contains(&t), "jump to a label that is never placed");
        }
        assert_eq!(defs, 2);
        assert_eq!(ends, 2);

        // no register is used after its kill
        let mut killed = Vec::new();
        for inst in &program.insts {
            let used: Vec<Reg> = match inst {
                Imm { dst, .. } | Not { dst } | LoadAddr { dst, .. } => vec![*dst],
                Mov { dst, src } | Bin { dst, src, .. } => vec![*dst, *src],
                Load { dst, addr } => vec![*dst, *addr],
                Store { addr, src } => vec![*addr, *src],
                Beqz { cond, .. } => vec![*cond],
                Ret { value: Some(r) } => vec![*r],
                Call { dst, .. } => vec![*dst],
                Arg { src, .. } => vec![*src],
                Param { addr, .. } => vec![*addr],
                _ => vec![],
            };
            for u in used {
                assert!(!killed.contains(&u), "register {u} used after kill");
            }
            if let Kill { reg } = inst {
                killed.push(*reg);
            }
        }
    }
}
