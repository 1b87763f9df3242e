//! # ACCIR - Accumulator Assembly to IR
//!
//! Lowers a small accumulator-based symbolic assembly language into a
//! basic-block intermediate representation with explicit terminators.
//!
//! ## Example
//!
//! ```text
//! START 100
//! MOVER AREG, ONE
//! ADD AREG, B
//! STOP
//! ONE DC 1
//! B DC 2
//! END
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Source (.asm)
//!     ↓ scanner
//! Logical lines
//!     ↓ parser
//! Program (instructions, data table, label table)
//!     ↓ planner
//! BlockPlan (entry, one block per label, exit)
//!     ↓ lowering
//! Basic blocks
//!     ↓ normalizer
//! Module ──→ printer (.ll) / JSON / executor
//! ```

pub mod analysis;
pub mod compiler;
pub mod config;
pub mod error;
pub mod exec;
pub mod ir;
pub mod lowering;
pub mod normalizer;
pub mod opcode;
pub mod parser;
pub mod planner;
pub mod program;
pub mod scanner;

pub use analysis::ProgramStats;
pub use compiler::{Compilation, Compiler};
pub use config::{CompileOptions, Config, RunOptions};
pub use error::{Error, Errors, ExecutionError, ParseErrorKind, ResolutionErrorKind, Result, StructuralError};
pub use exec::{Execution, Executor};
pub use ir::{BasicBlock, BlockId, Function, Global, Inst, Module, Operation, Terminator};
pub use lowering::Warning;
pub use opcode::{Directive, Opcode};
pub use parser::Parser;
pub use program::{DataDefinition, DataKind, Instruction, Program};

/// Parse assembly source into a [`Program`]
pub fn parse(source: &str) -> std::result::Result<Program, Errors> {
    parser::parse_program(source)
}

/// Compile assembly source into a [`Module`] with default options
pub fn compile(source: &str) -> std::result::Result<Module, Errors> {
    Compiler::new().compile(source).map(|compilation| compilation.module)
}

/// Compile assembly source straight to its textual IR
pub fn compile_to_ir(source: &str) -> std::result::Result<String, Errors> {
    compile(source).map(|module| module.to_string())
}

/// Statistics of a parsed program
pub fn analyze(source: &str) -> std::result::Result<ProgramStats, Errors> {
    parse(source).map(|program| ProgramStats::from_program(&program))
}

/// Compile and run with the given step budget
pub fn execute(source: &str, step_limit: usize) -> std::result::Result<Execution, Errors> {
    let module = compile(source)?;
    Ok(Executor::new(&module).with_step_limit(step_limit).run()?)
}
