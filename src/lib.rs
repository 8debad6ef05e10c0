//! Drift: lexer, parser, semantic pass, bytecode compiler and
//! stack-based virtual machine, grounded on `original_source/` and
//! shaped after the grounding crate's module layout.

pub mod ast;
pub mod builtins;
pub mod bytecode;
pub mod errors;
pub mod lexer;
pub mod module_loader;
pub mod object;
pub mod parser;
pub mod repl;
pub mod semantic;
pub mod token;
pub mod tracer;
pub mod types;
pub mod vm;

use std::rc::Rc;

use bytecode::{Compiler, Entity};
use errors::DriftError;
use lexer::Lexer;
use parser::Parser;
use semantic::Analysis;
use tracer::{NoopTracer, VmTracer};
use vm::VM;

/// Lexes, parses, and semantically analyzes `source` down to its
/// compiled `Entity`, without executing it. Exposed separately from
/// `Interpreter::run` so callers (the `-d`/`-b` CLI flags, tests) can
/// inspect tokens, the AST, or the disassembly before running.
pub fn compile(source: &str) -> Result<Entity, DriftError> {
    let tokens = Lexer::new(source).tokenize()?;
    let stmts = Parser::new(tokens).parse_program()?;
    let stmts = Analysis::run(stmts)?;
    let entity = Compiler::new().compile_program(&stmts)?;
    Ok(entity)
}

/// Ties the whole pipeline to a single, reusable virtual machine: the
/// thing both the REPL and file-mode runner drive. Reusing one
/// `Interpreter` across several `run` calls keeps the root symbol table
/// (and any modules registered along the way) alive between inputs,
/// matching the source's REPL behavior of handing the running `vm` a
/// freshly compiled entity rather than starting over.
pub struct Interpreter {
    pub vm: VM,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_tracer(Box::new(NoopTracer))
    }

    pub fn with_tracer(tracer: Box<dyn VmTracer>) -> Self {
        Self { vm: VM::new(builtins::root_table(), tracer) }
    }

    pub fn set_tracer(&mut self, tracer: Box<dyn VmTracer>) {
        self.vm.tracer = tracer;
    }

    /// Compiles and runs `source` against this interpreter's VM. When
    /// `debug` is set, tokens and the parsed statements are dumped to
    /// stderr before compilation; when `dis` is set, the compiled
    /// entity's disassembly is dumped before execution.
    pub fn run(&mut self, source: &str, debug: bool, dis: bool) -> Result<(), DriftError> {
        let tokens = Lexer::new(source).tokenize()?;
        if debug {
            eprintln!("{tokens:#?}");
        }
        let stmts = Parser::new(tokens).parse_program()?;
        if debug {
            eprintln!("{stmts:#?}");
        }
        let stmts = Analysis::run(stmts)?;
        let entity = Compiler::new().compile_program(&stmts)?;
        if dis {
            eprintln!("{}", entity.disassemble());
        }
        self.vm.load_main(Rc::new(entity));
        self.vm.run()?;
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
