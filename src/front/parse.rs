//! The parser

use std::fmt::Debug;

use derive_more::derive::Display;

use super::ast::*;
use super::lex::{Token, TokenKind};
use crate::common::Id;

#[derive(Display)]
#[display("parse error: {}", self.0)]
pub struct ParseError(pub String);

impl Debug for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Parse a whole translation unit from the lexed token sequence.
///
/// The token slice must end with the `Eof` sentinel `tokenize` appends.
pub fn parse(tokens: &[Token]) -> Result<Program, ParseError> {
    let mut parser = Parser { tokens, pos: 0 };
    let program = parser.translation_unit()?;
    tracing::debug!(decls = program.decls.len(), "parsed");
    Ok(program)
}

struct Parser<'a, 'src> {
    tokens: &'a [Token<'src>],
    pos: usize,
}

impl<'a, 'src> Parser<'a, 'src> {
    fn peek(&self) -> &Token<'src> {
        &self.tokens[self.pos]
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn advance(&mut self) -> Token<'src> {
        let token = self.tokens[self.pos];
        // Eof is a sentinel; never step past it.
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume the cursor only if the current token is `kind`.
    fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>, ParseError> {
        let t = *self.peek();
        if t.kind == kind {
            self.pos += 1;
            Ok(t)
        } else {
            Err(ParseError(format!(
                "unexpected token '{}' at line {}, column {}: expected '{}'",
                t.text, t.line, t.col, kind
            )))
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        let t = self.peek();
        ParseError(format!(
            "{message} at line {}, column {}",
            t.line, t.col
        ))
    }

    fn ident(&mut self) -> Result<Id, ParseError> {
        let t = self.expect(TokenKind::Ident)?;
        t.name
            .ok_or_else(|| ParseError("identifier token without a name".into()))
    }

    // translation_unit := external_declaration+
    fn translation_unit(&mut self) -> Result<Program, ParseError> {
        let mut decls = vec![self.external_declaration()?];
        while !self.check(TokenKind::Eof) {
            decls.push(self.external_declaration()?);
        }
        Ok(Program { decls })
    }

    // external_declaration := function_definition | declaration
    //
    // Both start with `int IDENT`; a following '(' with a '{' after the
    // parameter list means a function definition.
    fn external_declaration(&mut self) -> Result<ExternalDecl, ParseError> {
        self.expect(TokenKind::Int)?;

        if self.eat(TokenKind::Semicolon) {
            return Ok(ExternalDecl::Var(Declaration { inits: vec![] }));
        }

        let name = self.ident()?;

        if self.check(TokenKind::LParen) {
            let params = self.parameter_suffix()?;
            if self.check(TokenKind::LBrace) {
                let body = self.compound_statement()?;
                return Ok(ExternalDecl::Func(FuncDef { name, params, body }));
            }
            return Err(self.error_here("function prototypes are not supported"));
        }

        Ok(ExternalDecl::Var(self.init_declarator_tail(name)?))
    }

    // '(' parameter_list? ')'
    fn parameter_suffix(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                self.expect(TokenKind::Int)?;
                let name = self.ident()?;
                params.push(Param { name });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    // The rest of an init_declarator_list whose first declarator name is
    // already consumed.
    fn init_declarator_tail(&mut self, first: Id) -> Result<Declaration, ParseError> {
        let mut inits = vec![self.init_declarator(first)?];
        while self.eat(TokenKind::Comma) {
            let name = self.ident()?;
            if self.check(TokenKind::LParen) {
                return Err(self.error_here("function prototypes are not supported"));
            }
            inits.push(self.init_declarator(name)?);
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(Declaration { inits })
    }

    // init_declarator := declarator ( '=' assignment_expression )?
    fn init_declarator(&mut self, name: Id) -> Result<InitDeclarator, ParseError> {
        let init = if self.eat(TokenKind::Equal) {
            Some(self.assignment_expression()?)
        } else {
            None
        };
        Ok(InitDeclarator { name, init })
    }

    // declaration := type_specifier init_declarator_list? ';'
    fn declaration(&mut self) -> Result<Declaration, ParseError> {
        self.expect(TokenKind::Int)?;
        if self.eat(TokenKind::Semicolon) {
            return Ok(Declaration { inits: vec![] });
        }
        let name = self.ident()?;
        if self.check(TokenKind::LParen) {
            return Err(self.error_here("function prototypes are not supported"));
        }
        self.init_declarator_tail(name)
    }

    // compound_statement := '{' declaration_list? statement_list? '}'
    fn compound_statement(&mut self) -> Result<CompoundStmt, ParseError> {
        self.expect(TokenKind::LBrace)?;

        let mut decls = Vec::new();
        while self.check(TokenKind::Int) {
            decls.push(self.declaration()?);
        }

        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                return Err(self.error_here("unexpected end of input in compound statement"));
            }
            stmts.push(self.statement()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(CompoundStmt { decls, stmts })
    }

    // statement := compound_statement | jump_statement | selection_statement
    //            | expression_statement
    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.kind() {
            TokenKind::LBrace => Ok(Stmt::Compound(self.compound_statement()?)),
            TokenKind::Return => self.jump_statement(),
            TokenKind::If => self.selection_statement(),
            _ => self.expression_statement(),
        }
    }

    // jump_statement := RETURN ';' | RETURN expression ';'
    fn jump_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::Return)?;
        if self.eat(TokenKind::Semicolon) {
            return Ok(Stmt::Return(None));
        }
        let e = self.expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Return(Some(e)))
    }

    // selection_statement := IF '(' expression ')' statement (ELSE statement)?
    fn selection_statement(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.expression()?;
        self.expect(TokenKind::RParen)?;
        let then = Box::new(self.statement()?);
        let els = if self.eat(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If { cond, then, els })
    }

    // expression_statement := ';' | expression ';'
    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.eat(TokenKind::Semicolon) {
            return Ok(Stmt::Expr(None));
        }
        let e = self.expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Expr(Some(e)))
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment_expression()
    }

    // assignment_expression := conditional_expression
    //                        | unary_expression ASSIGN_OP assignment_expression
    //
    // Assignment-target detection rewinds: parse a unary_expression, and if
    // the next token is not an assignment operator, restore the cursor and
    // parse the conditional chain from scratch.
    fn assignment_expression(&mut self) -> Result<Expr, ParseError> {
        let saved = self.pos;

        if let Ok(target) = self.unary_expression() {
            if let Some(op) = assignment_op(self.kind()) {
                self.advance();
                let value = self.assignment_expression()?;
                return Ok(desugar_assign(target, op, value));
            }
        }

        self.pos = saved;
        self.conditional_expression()
    }

    fn conditional_expression(&mut self) -> Result<Expr, ParseError> {
        self.logical_or_expression()
    }

    fn logical_or_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.logical_and_expression()?;
        while self.eat(TokenKind::OrOr) {
            let rhs = self.logical_and_expression()?;
            lhs = binary(BinOp::LogicalOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn logical_and_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.inclusive_or_expression()?;
        while self.eat(TokenKind::AndAnd) {
            let rhs = self.inclusive_or_expression()?;
            lhs = binary(BinOp::LogicalAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn inclusive_or_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.exclusive_or_expression()?;
        while self.eat(TokenKind::Or) {
            let rhs = self.exclusive_or_expression()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn exclusive_or_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.and_expression()?;
        while self.eat(TokenKind::Xor) {
            let rhs = self.and_expression()?;
            lhs = binary(BinOp::Xor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.equality_expression()?;
        while self.eat(TokenKind::And) {
            let rhs = self.equality_expression()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.relational_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.relational_expression()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn relational_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.shift_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::Less => BinOp::Lt,
                TokenKind::Greater => BinOp::Gt,
                TokenKind::LessEq => BinOp::Le,
                TokenKind::GreaterEq => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.shift_expression()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn shift_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.additive_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => break,
            };
            self.advance();
            let rhs = self.additive_expression()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn additive_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.multiplicative_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative_expression()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn multiplicative_expression(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary_expression()?;
        loop {
            let op = match self.kind() {
                TokenKind::Mul => BinOp::Mul,
                TokenKind::Div => BinOp::Div,
                TokenKind::Mod => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.unary_expression()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    // unary := postfix | ('+'|'-') unary
    fn unary_expression(&mut self) -> Result<Expr, ParseError> {
        let op = match self.kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.postfix_expression(),
        };
        self.advance();
        let operand = Box::new(self.unary_expression()?);
        Ok(Expr::Unary { op, operand })
    }

    // postfix := primary ( '(' argument_list? ')' )*
    fn postfix_expression(&mut self) -> Result<Expr, ParseError> {
        let mut e = self.primary_expression()?;
        while self.eat(TokenKind::LParen) {
            let mut args = Vec::new();
            if !self.check(TokenKind::RParen) {
                loop {
                    args.push(self.assignment_expression()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
            e = match e {
                Expr::Ident(callee) => Expr::Call { callee, args },
                _ => return Err(self.error_here("call target must be a function name")),
            };
        }
        Ok(e)
    }

    // primary := '(' expression ')' | IDENT | INT_LIT
    fn primary_expression(&mut self) -> Result<Expr, ParseError> {
        match self.kind() {
            TokenKind::LParen => {
                self.advance();
                let e = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(e)
            }
            TokenKind::Num => {
                let t = self.advance();
                Ok(Expr::Const(t.value))
            }
            TokenKind::Ident => {
                let name = self.ident()?;
                Ok(Expr::Ident(name))
            }
            _ => Err(self.error_here(&format!(
                "expected expression, got '{}'",
                self.peek().text
            ))),
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Which assignment operator is this token, if any?  `None` in the `Some`
/// means plain `=`.
fn assignment_op(kind: TokenKind) -> Option<Option<BinOp>> {
    match kind {
        TokenKind::Equal => Some(None),
        TokenKind::MulAssign => Some(Some(BinOp::Mul)),
        TokenKind::DivAssign => Some(Some(BinOp::Div)),
        TokenKind::ModAssign => Some(Some(BinOp::Rem)),
        TokenKind::AddAssign => Some(Some(BinOp::Add)),
        TokenKind::SubAssign => Some(Some(BinOp::Sub)),
        TokenKind::LeftAssign => Some(Some(BinOp::Shl)),
        TokenKind::RightAssign => Some(Some(BinOp::Shr)),
        _ => None,
    }
}

/// `x op= y` becomes `x = x op y` at AST construction time; the target
/// appears twice, so it is cloned for the read-only copy.
fn desugar_assign(target: Expr, op: Option<BinOp>, value: Expr) -> Expr {
    let value = match op {
        None => value,
        Some(op) => binary(op, target.clone(), value),
    };
    Expr::Assign {
        target: Box::new(target),
        value: Box::new(value),
    }
}
