//! The lexer.

use derive_more::Display;
use regex::Regex;

use crate::common::{intern, Id};

/// Tokens in the program
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display("kind: '{kind}', text: '{text}'")]
pub struct Token<'src> {
    /// What token class this token belongs to.
    pub kind: TokenKind,
    /// What part of the input this token carries.
    pub text: &'src str,
    /// Literal value; only meaningful for `Num`.
    pub value: i32,
    /// Interned name for identifiers and keywords.
    pub name: Option<Id>,
    /// Source line, starting at 1.
    pub line: u32,
    /// Byte offset from the start of the line.
    pub col: u32,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum TokenKind {
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Mul,
    #[display("/")]
    Div,
    #[display("%")]
    Mod,
    #[display("=")]
    Equal,
    #[display("|")]
    Or,
    #[display("&")]
    And,
    #[display("^")]
    Xor,
    #[display("!")]
    Not,
    #[display("~")]
    Inv,
    #[display("*=")]
    MulAssign,
    #[display("/=")]
    DivAssign,
    #[display("%=")]
    ModAssign,
    #[display("+=")]
    AddAssign,
    #[display("-=")]
    SubAssign,
    #[display("<<=")]
    LeftAssign,
    #[display(">>=")]
    RightAssign,
    #[display("||")]
    OrOr,
    #[display("&&")]
    AndAnd,
    #[display("==")]
    EqEq,
    #[display("!=")]
    NotEq,
    #[display(">")]
    Greater,
    #[display("<")]
    Less,
    #[display(">=")]
    GreaterEq,
    #[display("<=")]
    LessEq,
    #[display("<<")]
    Shl,
    #[display(">>")]
    Shr,
    #[display("num")]
    Num,
    #[display("string")]
    Str,
    #[display("char")]
    Char,
    #[display(";")]
    Semicolon,
    #[display(":")]
    Colon,
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,
    #[display("\"")]
    DoubleQuote,
    #[display("'")]
    SingleQuote,
    #[display(",")]
    Comma,
    #[display("id")]
    Ident,
    #[display("return")]
    Return,
    #[display("if")]
    If,
    #[display("else")]
    Else,
    #[display("goto")]
    Goto,
    #[display("int")]
    Int,
    #[display("eof")]
    Eof,
}

/// Reserved words; anything else alphabetic becomes an identifier.
const KEYWORDS: [(&str, TokenKind); 5] = [
    ("return", TokenKind::Return),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("goto", TokenKind::Goto),
    ("int", TokenKind::Int),
];

#[derive(Display)]
pub enum LexError {
    #[display("lex error: unrecognized input '{_0}' at line {_1}, column {_2}")]
    Unrecognized(String, u32, u32),
    #[display("lex error: unterminated block comment at line {_0}, column {_1}")]
    UnterminatedComment(u32, u32),
    #[display("lex error: integer literal '{_0}' out of range at line {_1}, column {_2}")]
    IntOutOfRange(String, u32, u32),
}

impl std::fmt::Debug for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    line: u32,
    line_start: usize,
    whitespace: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        use TokenKind::*;

        // Longest match falls out of table order: three-byte operators
        // first, then two-byte, then single symbols, then literals and
        // identifiers.
        let table: &[(&str, TokenKind)] = &[
            (r"\A<<=", LeftAssign),
            (r"\A>>=", RightAssign),
            (r"\A\|\|", OrOr),
            (r"\A&&", AndAnd),
            (r"\A==", EqEq),
            (r"\A!=", NotEq),
            (r"\A<=", LessEq),
            (r"\A>=", GreaterEq),
            (r"\A\*=", MulAssign),
            (r"\A/=", DivAssign),
            (r"\A%=", ModAssign),
            (r"\A\+=", AddAssign),
            (r"\A-=", SubAssign),
            (r"\A<<", Shl),
            (r"\A>>", Shr),
            (r"\A\+", Plus),
            (r"\A-", Minus),
            (r"\A\*", Mul),
            (r"\A/", Div),
            (r"\A%", Mod),
            (r"\A;", Semicolon),
            (r"\A:", Colon),
            (r"\A\(", LParen),
            (r"\A\)", RParen),
            (r"\A\{", LBrace),
            (r"\A\}", RBrace),
            (r"\A'", SingleQuote),
            (r#"\A""#, DoubleQuote),
            (r"\A=", Equal),
            (r"\A&", And),
            (r"\A\|", Or),
            (r"\A\^", Xor),
            (r"\A!", Not),
            (r"\A~", Inv),
            (r"\A<", Less),
            (r"\A>", Greater),
            (r"\A,", Comma),
            (r"\A[0-9]+", Num),
            (r"\A[A-Za-z_][A-Za-z0-9_]*", Ident),
        ];

        Lexer {
            input,
            pos: 0,
            line: 1,
            line_start: 0,
            whitespace: Regex::new(r"\A(?:[ \t\f\r\n\v]+|/\*(?s:.)*?\*/)*").unwrap(),
            matchers: table
                .iter()
                .map(|&(pat, kind)| (Regex::new(pat).unwrap(), kind))
                .collect(),
        }
    }

    /// Has the lexer reached the end of input?
    pub fn end_of_input(&self) -> bool {
        self.pos == self.input.len()
    }

    /// Consume `len` bytes, keeping the line and column bookkeeping current.
    fn advance(&mut self, len: usize) {
        let consumed = &self.input[self.pos..self.pos + len];
        for (i, b) in consumed.bytes().enumerate() {
            if b == b'\n' {
                self.line += 1;
                self.line_start = self.pos + i + 1;
            }
        }
        self.pos += len;
    }

    // Skip block comments and whitespace
    fn skip_whitespace(&mut self) {
        if let Some(m) = self.whitespace.find(&self.input[self.pos..]) {
            self.advance(m.end());
        }
    }

    fn col(&self) -> u32 {
        (self.pos - self.line_start) as u32
    }

    /// The rest of the current line, for diagnostics.
    fn rest_of_line(&self) -> String {
        let rest = &self.input[self.pos..];
        rest.lines().next().unwrap_or(rest).to_owned()
    }

    /// Get the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, LexError> {
        self.skip_whitespace();

        if self.end_of_input() {
            return Ok(None);
        }

        let rest = &self.input[self.pos..];

        // A terminated comment would have been consumed above.
        if rest.starts_with("/*") {
            return Err(LexError::UnterminatedComment(self.line, self.col()));
        }

        let matched = self
            .matchers
            .iter()
            .find_map(|(re, kind)| re.find(rest).map(|m| (m.end(), *kind)));
        let Some((len, kind)) = matched else {
            return Err(LexError::Unrecognized(
                self.rest_of_line(),
                self.line,
                self.col(),
            ));
        };

        let text = &rest[..len];
        let (line, col) = (self.line, self.col());

        let mut token = Token {
            kind,
            text,
            value: 0,
            name: None,
            line,
            col,
        };

        match kind {
            TokenKind::Num => {
                token.value = text
                    .parse::<i32>()
                    .map_err(|_| LexError::IntOutOfRange(text.to_owned(), line, col))?;
            }
            TokenKind::Ident => {
                if let Some(&(word, kw)) = KEYWORDS.iter().find(|&&(word, _)| word == text) {
                    token.kind = kw;
                    token.name = Some(intern(word));
                } else {
                    token.name = Some(intern(text));
                }
            }
            _ => {}
        }

        self.advance(len);
        Ok(Some(token))
    }
}

/// Lex the whole input, appending the `Eof` sentinel the parser relies on.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    while let Some(token) = lexer.next()? {
        tokens.push(token);
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: "EOF",
        value: 0,
        name: None,
        line: lexer.line,
        col: lexer.col(),
    });

    tracing::debug!(tokens = tokens.len(), "lexed");

    Ok(tokens)
}
