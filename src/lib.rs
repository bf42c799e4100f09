//! This is the compiler as a library.  See `src/bin` for the executable
//! driver.
//!
//! The pipeline is strictly forward:
//!
//! ```txt
//! source --lex--> tokens --parse--> AST --lower--> IR --allocate--> IR'
//!        --emit--> assembly
//! ```
//!
//! The only backwards mutation is the register allocator rewriting IR
//! operands in place; everything else produces a fresh artifact for the
//! next stage.

pub mod back;
pub mod common;
pub mod front;
pub mod middle;

use derive_more::{Display, From};

use back::asm::EmitError;
use back::regalloc::RegAllocError;
use front::lex::LexError;
use front::parse::ParseError;
use middle::lower::LowerError;

/// Any fatal error from any stage.  All of them abort the compilation; the
/// driver prints the message and exits non-zero.
#[derive(Display, From)]
pub enum CompileError {
    #[display("{_0}")]
    Lex(LexError),
    #[display("{_0}")]
    Parse(ParseError),
    #[display("{_0}")]
    Lower(LowerError),
    #[display("{_0}")]
    RegAlloc(RegAllocError),
    #[display("{_0}")]
    Emit(EmitError),
}

impl std::fmt::Debug for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

/// Compile a source string to RV64 assembly text.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let tokens = front::lex::tokenize(source)?;
    let program = front::parse::parse(&tokens)?;
    let mut ir = middle::lower::lower(&program)?;
    let regs = back::regalloc::allocate(&mut ir)?;
    Ok(back::asm::emit(&ir, &regs)?)
}
