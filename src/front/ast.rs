//! The abstract syntax tree.

use derive_more::Display;

use crate::common::Id;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub decls: Vec<ExternalDecl>,
}

/// A top-level item of a translation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalDecl {
    Func(FuncDef),
    Var(Declaration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: Id,
    pub params: Vec<Param>,
    pub body: CompoundStmt,
}

/// A function parameter.  The only type in the language is `int`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Id,
}

/// One `int a = e, b, c = f;` declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub inits: Vec<InitDeclarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitDeclarator {
    pub name: Id,
    pub init: Option<Expr>,
}

/// `{ declarations... statements... }` — declarations come first.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundStmt {
    pub decls: Vec<Declaration>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Compound(CompoundStmt),
    /// An expression statement; `None` for the empty statement `;`.
    Expr(Option<Expr>),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Const(i32),
    Ident(Id),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Id,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnaryOp {
    #[display("+")]
    Plus,
    #[display("-")]
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum BinOp {
    #[display("+")]
    Add,
    #[display("-")]
    Sub,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
    #[display("%")]
    Rem,
    #[display("&")]
    And,
    #[display("|")]
    Or,
    #[display("^")]
    Xor,
    #[display("||")]
    LogicalOr,
    #[display("&&")]
    LogicalAnd,
    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<")]
    Lt,
    #[display(">")]
    Gt,
    #[display("<=")]
    Le,
    #[display(">=")]
    Ge,
    #[display("<<")]
    Shl,
    #[display(">>")]
    Shr,
}

impl Program {
    /// Render the tree one node per line, children indented below their
    /// parent.  Used by the `-z` stage dump.
    pub fn tree(&self) -> String {
        let mut out = String::new();
        for decl in &self.decls {
            match decl {
                ExternalDecl::Func(f) => f.write_tree(&mut out, 0),
                ExternalDecl::Var(d) => d.write_tree(&mut out, 0),
            }
        }
        out
    }
}

fn line(out: &mut String, indent: usize, text: &str) {
    for _ in 0..indent {
        out.push(' ');
    }
    out.push_str(text);
    out.push('\n');
}

impl FuncDef {
    fn write_tree(&self, out: &mut String, indent: usize) {
        line(out, indent, &format!("func_def: {}", self.name));
        for p in &self.params {
            line(out, indent + 1, &format!("param: {}", p.name));
        }
        self.body.write_tree(out, indent + 1);
    }
}

impl Declaration {
    fn write_tree(&self, out: &mut String, indent: usize) {
        for init in &self.inits {
            line(out, indent, &format!("var_dec: {}", init.name));
            if let Some(e) = &init.init {
                e.write_tree(out, indent + 1);
            }
        }
    }
}

impl CompoundStmt {
    fn write_tree(&self, out: &mut String, indent: usize) {
        line(out, indent, "compound");
        for d in &self.decls {
            d.write_tree(out, indent + 1);
        }
        for s in &self.stmts {
            s.write_tree(out, indent + 1);
        }
    }
}

impl Stmt {
    fn write_tree(&self, out: &mut String, indent: usize) {
        match self {
            Stmt::Compound(c) => c.write_tree(out, indent),
            Stmt::Expr(None) => line(out, indent, "empty"),
            Stmt::Expr(Some(e)) => {
                line(out, indent, "expression");
                e.write_tree(out, indent + 1);
            }
            Stmt::Return(e) => {
                line(out, indent, "return");
                if let Some(e) = e {
                    e.write_tree(out, indent + 1);
                }
            }
            Stmt::If { cond, then, els } => {
                line(out, indent, "if");
                cond.write_tree(out, indent + 1);
                line(out, indent + 1, "then:");
                then.write_tree(out, indent + 2);
                if let Some(els) = els {
                    line(out, indent + 1, "else:");
                    els.write_tree(out, indent + 2);
                }
            }
        }
    }
}

impl Expr {
    fn write_tree(&self, out: &mut String, indent: usize) {
        match self {
            Expr::Const(v) => line(out, indent, &format!("const: {v}")),
            Expr::Ident(name) => line(out, indent, &format!("ident: {name}")),
            Expr::Unary { op, operand } => {
                line(out, indent, &format!("unary: {op}"));
                operand.write_tree(out, indent + 1);
            }
            Expr::Binary { op, lhs, rhs } => {
                line(out, indent, &format!("binary: {op}"));
                lhs.write_tree(out, indent + 1);
                rhs.write_tree(out, indent + 1);
            }
            Expr::Assign { target, value } => {
                line(out, indent, "assign");
                target.write_tree(out, indent + 1);
                value.write_tree(out, indent + 1);
            }
            Expr::Call { callee, args } => {
                line(out, indent, &format!("call: {callee}"));
                for a in args {
                    a.write_tree(out, indent + 1);
                }
            }
        }
    }
}
