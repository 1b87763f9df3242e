//! Reference executor for emitted modules
//!
//! Interprets a [`Module`] block by block: globals start at their
//! initializers, AREG at 0, arithmetic wraps at 32 bits and comparisons are
//! signed. Every executed IR instruction (terminators included) costs one
//! step; a run that exceeds the step budget fails instead of hanging.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::DEFAULT_STEP_LIMIT;
use crate::error::{ExecutionError, Result};
use crate::ir::{Inst, Module, Operation, Slot, Temp, Terminator, Value};

/// Final machine state after `ret`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Execution {
    /// Value returned by the function
    pub status: i32,
    /// Final AREG
    pub accumulator: i32,
    /// Final globals, in declaration order
    pub globals: Vec<(String, i32)>,
    /// Executed IR instructions
    pub steps: usize,
}

impl Execution {
    pub fn global(&self, name: &str) -> Option<i32> {
        self.globals
            .iter()
            .find(|(global, _)| global == name)
            .map(|(_, value)| *value)
    }
}

impl fmt::Display for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.globals {
            writeln!(f, "{:<12} = {}", name, value)?;
        }
        writeln!(f, "{:<12} = {}", "AREG", self.accumulator)?;
        write!(f, "status {} after {} step(s)", self.status, self.steps)
    }
}

pub struct Executor<'m> {
    module: &'m Module,
    step_limit: usize,
    /// Global name -> position in `globals`
    slots: HashMap<&'m str, usize>,
    globals: Vec<i32>,
    accumulator: i32,
    temps: HashMap<Temp, i32>,
    steps: usize,
}

impl<'m> Executor<'m> {
    pub fn new(module: &'m Module) -> Self {
        let slots = module
            .globals
            .iter()
            .enumerate()
            .map(|(i, global)| (global.name.as_str(), i))
            .collect();
        Self {
            module,
            step_limit: DEFAULT_STEP_LIMIT,
            slots,
            globals: module.globals.iter().map(|global| global.initializer).collect(),
            accumulator: 0,
            temps: HashMap::new(),
            steps: 0,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Run from `entry` until the function returns
    pub fn run(mut self) -> Result<Execution> {
        let module = self.module;
        let function = &module.function;
        let mut current = function.entry;

        'blocks: loop {
            let block = function
                .block(current)
                .ok_or(ExecutionError::UnknownBlock(current.0))?;
            trace!(block = %block.name, steps = self.steps, "enter block");

            for inst in block.insts() {
                self.tick()?;
                match inst {
                    Inst::Op(op) => self.execute(op, &block.name)?,
                    Inst::Term(term) => match *term {
                        Terminator::Branch { target } => {
                            current = target;
                            continue 'blocks;
                        }
                        Terminator::CondBranch {
                            condition,
                            then_block,
                            else_block,
                        } => {
                            let taken = self.temp(condition, &block.name)? != 0;
                            current = if taken { then_block } else { else_block };
                            continue 'blocks;
                        }
                        Terminator::Return { status } => {
                            debug!(status, steps = self.steps, "execution finished");
                            return Ok(self.finish(status));
                        }
                    },
                }
            }

            return Err(ExecutionError::MissingTerminator {
                block: block.name.clone(),
            }
            .into());
        }
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.step_limit {
            return Err(ExecutionError::StepLimitExceeded {
                limit: self.step_limit,
            }
            .into());
        }
        Ok(())
    }

    fn execute(&mut self, op: &Operation, block: &str) -> Result<()> {
        match op {
            Operation::Load { dest, slot } => {
                let value = self.read(slot)?;
                self.temps.insert(*dest, value);
            }
            Operation::Store { value, slot } => {
                let value = self.value(*value, block)?;
                self.write(slot, value)?;
            }
            Operation::Binary { dest, op, lhs, rhs } => {
                let result = op.apply(self.value(*lhs, block)?, self.value(*rhs, block)?);
                self.temps.insert(*dest, result);
            }
            Operation::Compare {
                dest,
                predicate,
                lhs,
                rhs,
            } => {
                let result = predicate.evaluate(self.value(*lhs, block)?, self.value(*rhs, block)?);
                self.temps.insert(*dest, i32::from(result));
            }
        }
        Ok(())
    }

    fn value(&self, value: Value, block: &str) -> Result<i32> {
        match value {
            Value::Const(value) => Ok(value),
            Value::Temp(temp) => self.temp(temp, block),
        }
    }

    fn temp(&self, temp: Temp, block: &str) -> Result<i32> {
        self.temps.get(&temp).copied().ok_or_else(|| {
            ExecutionError::UndefinedTemporary {
                block: block.to_string(),
                temp: temp.0,
            }
            .into()
        })
    }

    fn global_index(&self, name: &str) -> Result<usize> {
        self.slots
            .get(name)
            .copied()
            .ok_or_else(|| ExecutionError::UnknownGlobal(name.to_string()).into())
    }

    fn read(&self, slot: &Slot) -> Result<i32> {
        match slot {
            Slot::Accumulator => Ok(self.accumulator),
            Slot::Global(name) => Ok(self.globals[self.global_index(name)?]),
        }
    }

    fn write(&mut self, slot: &Slot, value: i32) -> Result<()> {
        match slot {
            Slot::Accumulator => self.accumulator = value,
            Slot::Global(name) => {
                let index = self.global_index(name)?;
                self.globals[index] = value;
            }
        }
        Ok(())
    }

    fn finish(self, status: i32) -> Execution {
        let globals = self
            .module
            .globals
            .iter()
            .zip(self.globals)
            .map(|(global, value)| (global.name.clone(), value))
            .collect();
        Execution {
            status,
            accumulator: self.accumulator,
            globals,
            steps: self.steps,
        }
    }
}

/// Execute `module` with the default step budget
pub fn run(module: &Module) -> Result<Execution> {
    Executor::new(module).run()
}
