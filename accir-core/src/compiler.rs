//! Compiler driver
//!
//! Runs the pipeline phases in order and stops at the first phase that
//! reports errors, so a partial module is never returned.
//!
//! ```text
//! source ─ parse ─> Program ─ plan ─> BlockPlan ─ lower ─> blocks ─ normalize ─> Module
//! ```

use tracing::{debug, info_span};

use crate::config::CompileOptions;
use crate::error::Errors;
use crate::ir::{Function, Global, GlobalKind, Module};
use crate::lowering::{Warning, lower};
use crate::normalizer::normalize;
use crate::opcode::ACCUMULATOR;
use crate::parser::Parser;
use crate::planner::BlockPlan;
use crate::program::{DataKind, Program};

/// Everything produced by one compilation
#[derive(Debug, Clone)]
pub struct Compilation {
    pub program: Program,
    pub module: Module,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn parse(&self, source: &str) -> Result<Program, Errors> {
        Parser::new().parse(source)
    }

    /// Lower an already parsed program. The program is only read, so
    /// lowering it twice yields equal modules.
    pub fn lower(&self, program: &Program) -> Result<(Module, Vec<Warning>), Errors> {
        let _span = info_span!("lower", module = %self.options.module_name).entered();

        let plan = BlockPlan::build(program, &self.options)?;
        let lowered = lower(program, &plan)?;

        let mut function = Function {
            name: self.options.function_name.clone(),
            accumulator: ACCUMULATOR.to_string(),
            entry: plan.entry(),
            exit: plan.exit(),
            blocks: lowered.blocks,
        };
        normalize(&mut function)?;

        let globals = program
            .data_definitions()
            .iter()
            .map(|data| Global {
                name: data.name.clone(),
                initializer: data.initializer(),
                kind: match data.kind {
                    DataKind::Constant { .. } => GlobalKind::Constant,
                    DataKind::Storage { count } => GlobalKind::Storage {
                        declared_count: count,
                    },
                },
            })
            .collect();

        let module = Module {
            name: self.options.module_name.clone(),
            globals,
            function,
        };
        debug!(
            blocks = module.blocks().len(),
            globals = module.globals.len(),
            warnings = lowered.warnings.len(),
            "emitted module"
        );
        Ok((module, lowered.warnings))
    }

    pub fn compile(&self, source: &str) -> Result<Compilation, Errors> {
        let program = self.parse(source)?;
        let (module, warnings) = self.lower(&program)?;
        Ok(Compilation {
            program,
            module,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_reach_module() {
        let options = CompileOptions::default()
            .with_module_name("demo")
            .with_function_name("start");
        let compilation = Compiler::with_options(options).compile("STOP").unwrap();

        assert_eq!(compilation.module.name, "demo");
        assert_eq!(compilation.module.function.name, "start");
        assert!(compilation.module.to_string().contains("define i32 @start()"));
    }

    #[test]
    fn test_parse_errors_stop_pipeline() {
        let errors = Compiler::new().compile("MOVER AREG\nBC ANY, NOWHERE\n").unwrap_err();
        // Resolution never runs when parsing failed
        assert_eq!(errors.len(), 1);
        assert!(errors.first().unwrap().is_parse());
    }

    #[test]
    fn test_storage_kind_kept() {
        let compilation = Compiler::new().compile("BUF DS 16\n").unwrap();
        let global = compilation.module.global("BUF").unwrap();
        assert_eq!(global.initializer, 0);
        assert_eq!(global.kind, GlobalKind::Storage { declared_count: 16 });
    }
}
