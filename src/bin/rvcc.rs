//! The compiler driver.  Takes a source file (or a literal code string) and
//! writes RISC-V assembly to standard output.
//!
//! Run with `--help` for more info.

use std::fs;
use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rvcc::back::asm::{emit, TEMP_REGS};
use rvcc::back::regalloc::{allocate, UsedRegs};
use rvcc::front::lex::{tokenize, Token};
use rvcc::front::parse::parse;
use rvcc::middle::lower::lower;
use rvcc::middle::tir;
use rvcc::CompileError;

/// Every `-z` diagnostic line goes out as an assembler comment.
const COMMENT: &str = "# ";

#[derive(Debug, Parser)]
#[command(version, about = "compile a C subset to RISC-V assembly", long_about = None)]
struct Args {
    /// source file path, or the code itself if no such file exists
    input: String,

    /// dump the token stream, AST, and IR (before and after register
    /// allocation) to stdout as assembler comments
    #[arg(short = 'z')]
    dump: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            process::exit(code);
        }
    };

    // A readable file wins; otherwise the argument text is the source.
    let source = fs::read_to_string(&args.input).unwrap_or_else(|_| args.input.clone());

    match run(&source, args.dump) {
        Ok(asm) => print!("{asm}"),
        Err(e) => {
            eprintln!("\x1b[1;31m{e}\x1b[m");
            process::exit(1);
        }
    }
}

fn run(source: &str, dump: bool) -> Result<String, CompileError> {
    let tokens = tokenize(source)?;
    if dump {
        dump_tokens(&tokens);
    }

    let program = parse(&tokens)?;
    if dump {
        header("node");
        for line in program.tree().lines() {
            println!("{COMMENT}{line}");
        }
    }

    let mut ir = lower(&program)?;
    if dump {
        header("ir");
        dump_ir(&ir, None);
    }

    let regs = allocate(&mut ir)?;
    if dump {
        header("ir after regalloc");
        dump_ir(&ir, Some(&regs));
    }

    Ok(emit(&ir, &regs)?)
}

fn header(stage: &str) {
    println!("{COMMENT}=====[{stage}]=====");
}

fn dump_tokens(tokens: &[Token]) {
    header("token");
    for (i, token) in tokens.iter().enumerate() {
        println!("{COMMENT}{i:02}: {token}");
    }
}

fn dump_ir(ir: &tir::Program, regs: Option<&UsedRegs>) {
    for inst in &ir.insts {
        println!("{COMMENT}{inst}");

        // after allocation, show what each call site will save
        let tir::Inst::Call { snapshot: Some(s), .. } = inst else {
            continue;
        };
        if let Some(live) = regs.and_then(|r| r.get(*s)) {
            let names: Vec<String> = live
                .iter()
                .map(|&i| match TEMP_REGS.get(i) {
                    Some(reg) => reg.to_string(),
                    None => format!("?{i}"),
                })
                .collect();
            println!("{COMMENT}  regs: {}", names.join(" "));
        }
    }
}
