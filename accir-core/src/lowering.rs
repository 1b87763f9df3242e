//! Instruction lowering engine
//!
//! Walks the program in source order with a cursor on the current block,
//! starting at `entry`. Crossing a label boundary makes fallthrough explicit
//! (`br label %NEXT`) when the current block is still open. Every opcode
//! reads and writes the single accumulator slot through
//! [`AccumulatorRegister`], which lives exactly as long as one
//! [`LoweringContext`].
//!
//! ```text
//! MOVER AREG, X      %t0 = load @X          store %t0 -> AREG
//! ADD   AREG, 5      %t1 = load AREG        %t2 = add %t1, 5   store %t2 -> AREG
//! COMP  AREG, Y      %t3 = load AREG        %t4 = load @Y      %t5 = icmp sge %t3, %t4
//! BC    ANY, LOOP    br %t5, LOOP, exit     (br LOOP without a pending COMP)
//! STOP               br exit                cursor -> exit
//! ```
//!
//! Resolution errors are collected across the whole program; nothing is
//! returned unless every operand resolved.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::error::{Error, Errors, ResolutionErrorKind, StructuralError};
use crate::ir::{BasicBlock, BinaryOp, BlockId, Operation, Predicate, Slot, Temp, Terminator, Value};
use crate::opcode::Opcode;
use crate::planner::BlockPlan;
use crate::program::{Instruction, Program, looks_like_literal, parse_literal};

/// Non-fatal diagnostics produced while lowering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Instruction after a terminator with no label in between
    UnreachableInstruction {
        line: usize,
        opcode: Opcode,
        block: String,
    },
    /// Literal operand that does not fit a 64-bit integer
    LiteralFallback {
        line: usize,
        opcode: Opcode,
        operand: String,
        value: i32,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnreachableInstruction { line, opcode, block } => write!(
                f,
                "line {}: unreachable {} after the terminator of block '{}'",
                line, opcode, block
            ),
            Warning::LiteralFallback {
                line,
                opcode,
                operand,
                value,
            } => write!(
                f,
                "line {}: {} literal '{}' is not a valid integer, using {}",
                line, opcode, operand, value
            ),
        }
    }
}

/// Output of a successful lowering pass
#[derive(Debug, Clone)]
pub struct LoweredBlocks {
    pub blocks: Vec<BasicBlock>,
    pub warnings: Vec<Warning>,
}

/// The implicit AREG slot
#[derive(Debug, Default)]
pub struct AccumulatorRegister {
    loads: usize,
    stores: usize,
}

impl AccumulatorRegister {
    fn load(&mut self, dest: Temp) -> Operation {
        self.loads += 1;
        Operation::Load {
            dest,
            slot: Slot::Accumulator,
        }
    }

    fn store(&mut self, value: Value) -> Operation {
        self.stores += 1;
        Operation::Store {
            value,
            slot: Slot::Accumulator,
        }
    }

    pub fn loads(&self) -> usize {
        self.loads
    }

    pub fn stores(&self) -> usize {
        self.stores
    }
}

/// A resolved source operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand<'p> {
    Symbol(&'p str),
    Literal(i32),
}

/// An instruction whose operands all resolved
#[derive(Debug, Clone, Copy)]
enum Resolved<'p> {
    Mover(Operand<'p>),
    Movem(&'p str),
    Arithmetic(BinaryOp, Operand<'p>),
    Comp(Operand<'p>),
    Bc(BlockId),
    Stop,
}

pub struct LoweringContext<'a> {
    program: &'a Program,
    plan: &'a BlockPlan,
    blocks: Vec<BasicBlock>,
    cursor: BlockId,
    /// Result of the last COMP in the current block, consumed by BC
    pending: Option<Temp>,
    next_temp: u32,
    accumulator: AccumulatorRegister,
    errors: Errors,
    warnings: Vec<Warning>,
}

impl<'a> LoweringContext<'a> {
    pub fn new(program: &'a Program, plan: &'a BlockPlan) -> Self {
        let blocks = plan
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| BasicBlock::new(BlockId(i), name.as_str()))
            .collect();
        Self {
            program,
            plan,
            blocks,
            cursor: plan.entry(),
            pending: None,
            next_temp: 0,
            accumulator: AccumulatorRegister::default(),
            errors: Errors::new(),
            warnings: Vec::new(),
        }
    }

    pub fn lower(mut self) -> Result<LoweredBlocks, Errors> {
        let program = self.program;
        let instructions = program.instructions();
        for (index, instruction) in instructions.iter().enumerate() {
            self.enter_blocks_at(index);
            self.lower_instruction(instruction);
        }
        // Labels after the last instruction still get their blocks entered
        self.enter_blocks_at(instructions.len());

        debug!(
            instructions = instructions.len(),
            temporaries = self.next_temp,
            areg_loads = self.accumulator.loads(),
            areg_stores = self.accumulator.stores(),
            warnings = self.warnings.len(),
            errors = self.errors.len(),
            "lowered instructions"
        );

        let LoweringContext {
            blocks,
            errors,
            warnings,
            ..
        } = self;
        errors.into_multi_result(LoweredBlocks { blocks, warnings })
    }

    fn current(&self) -> &BasicBlock {
        &self.blocks[self.cursor.0]
    }

    fn current_mut(&mut self) -> &mut BasicBlock {
        &mut self.blocks[self.cursor.0]
    }

    fn fresh_temp(&mut self) -> Temp {
        let temp = Temp(self.next_temp);
        self.next_temp += 1;
        temp
    }

    fn emit(&mut self, op: Operation) {
        self.current_mut().push_op(op);
    }

    fn terminate(&mut self, term: Terminator) {
        self.current_mut().push_terminator(term);
    }

    fn move_cursor(&mut self, target: BlockId) {
        self.cursor = target;
        self.pending = None;
    }

    /// Switch to every block that begins at `index`, making fallthrough explicit
    fn enter_blocks_at(&mut self, index: usize) {
        let plan = self.plan;
        for &target in plan.boundaries_at(index) {
            if self.cursor != plan.exit() && !self.current().is_terminated() {
                trace!(from = %self.current().name, to = ?plan.name(target), "explicit fallthrough");
                self.terminate(Terminator::Branch { target });
            }
            self.move_cursor(target);
        }
    }

    fn lower_instruction(&mut self, instruction: &'a Instruction) {
        let resolved = match self.resolve(instruction) {
            Ok(resolved) => resolved,
            Err(error) => {
                self.errors.push(error);
                return;
            }
        };

        if self.current().is_terminated() {
            let block = self.current().name.clone();
            warn!(
                line = instruction.line,
                opcode = %instruction.opcode,
                block = %block,
                "unreachable instruction"
            );
            self.warnings.push(Warning::UnreachableInstruction {
                line: instruction.line,
                opcode: instruction.opcode,
                block,
            });
            if let Resolved::Stop = resolved {
                let exit = self.plan.exit();
                self.move_cursor(exit);
            }
            return;
        }

        trace!(line = instruction.line, block = %self.current().name, "{}", instruction);
        self.emit_resolved(resolved);
    }

    fn resolve(&mut self, instruction: &'a Instruction) -> Result<Resolved<'a>, Error> {
        let line = instruction.line;
        let operand = |i: usize| instruction.operand(i).unwrap_or_default();

        Ok(match instruction.opcode {
            Opcode::Mover => Resolved::Mover(self.resolve_source(instruction, operand(1), None)?),
            Opcode::Movem => {
                let dst = operand(1);
                if !self.program.is_data(dst) {
                    return Err(unknown_operand(instruction, dst));
                }
                Resolved::Movem(dst)
            }
            Opcode::Add => {
                let src = self.resolve_source(instruction, operand(1), Some(0))?;
                Resolved::Arithmetic(BinaryOp::Add, src)
            }
            Opcode::Sub => {
                let src = self.resolve_source(instruction, operand(1), Some(0))?;
                Resolved::Arithmetic(BinaryOp::Sub, src)
            }
            // Multiplicative identity, unlike ADD/SUB
            Opcode::Mult => {
                let src = self.resolve_source(instruction, operand(1), Some(1))?;
                Resolved::Arithmetic(BinaryOp::Mul, src)
            }
            Opcode::Comp => Resolved::Comp(self.resolve_source(instruction, operand(1), None)?),
            Opcode::Bc => {
                let label = operand(1);
                let target = self.plan.block_for_label(label).ok_or_else(|| {
                    Error::resolution(
                        line,
                        ResolutionErrorKind::UndefinedLabel {
                            label: label.to_string(),
                        },
                    )
                })?;
                if self.cursor == self.plan.exit() {
                    return Err(StructuralError::BranchFromExit { line }.into());
                }
                Resolved::Bc(target)
            }
            Opcode::Stop => Resolved::Stop,
        })
    }

    /// Data symbol first, then integer literal, then the opcode's fallback
    fn resolve_source(
        &mut self,
        instruction: &Instruction,
        text: &'a str,
        fallback: Option<i32>,
    ) -> Result<Operand<'a>, Error> {
        if self.program.is_data(text) {
            return Ok(Operand::Symbol(text));
        }
        if let Some(value) = parse_literal(text) {
            return Ok(Operand::Literal(value));
        }
        match fallback {
            Some(value) if looks_like_literal(text) => {
                warn!(line = instruction.line, operand = text, value, "literal fallback");
                self.warnings.push(Warning::LiteralFallback {
                    line: instruction.line,
                    opcode: instruction.opcode,
                    operand: text.to_string(),
                    value,
                });
                Ok(Operand::Literal(value))
            }
            _ => Err(unknown_operand(instruction, text)),
        }
    }

    /// Materialize an operand as a value, loading symbols
    fn value_of(&mut self, operand: Operand<'_>) -> Value {
        match operand {
            Operand::Literal(value) => Value::Const(value),
            Operand::Symbol(name) => {
                let dest = self.fresh_temp();
                self.emit(Operation::Load {
                    dest,
                    slot: Slot::Global(name.to_string()),
                });
                Value::Temp(dest)
            }
        }
    }

    fn load_accumulator(&mut self) -> Value {
        let dest = self.fresh_temp();
        let op = self.accumulator.load(dest);
        self.emit(op);
        Value::Temp(dest)
    }

    fn store_accumulator(&mut self, value: Value) {
        let op = self.accumulator.store(value);
        self.emit(op);
    }

    fn emit_resolved(&mut self, resolved: Resolved<'_>) {
        match resolved {
            Resolved::Mover(src) => {
                let value = self.value_of(src);
                self.store_accumulator(value);
            }
            Resolved::Movem(dst) => {
                let value = self.load_accumulator();
                self.emit(Operation::Store {
                    value,
                    slot: Slot::Global(dst.to_string()),
                });
            }
            Resolved::Arithmetic(op, src) => {
                let lhs = self.load_accumulator();
                let rhs = self.value_of(src);
                let dest = self.fresh_temp();
                self.emit(Operation::Binary { dest, op, lhs, rhs });
                self.store_accumulator(Value::Temp(dest));
            }
            Resolved::Comp(src) => {
                let lhs = self.load_accumulator();
                let rhs = self.value_of(src);
                let dest = self.fresh_temp();
                self.emit(Operation::Compare {
                    dest,
                    predicate: Predicate::Sge,
                    lhs,
                    rhs,
                });
                self.pending = Some(dest);
            }
            Resolved::Bc(target) => {
                let term = match self.pending.take() {
                    Some(condition) => Terminator::CondBranch {
                        condition,
                        then_block: target,
                        else_block: self.plan.exit(),
                    },
                    None => Terminator::Branch { target },
                };
                self.terminate(term);
            }
            Resolved::Stop => {
                let exit = self.plan.exit();
                if self.cursor != exit {
                    self.terminate(Terminator::Branch { target: exit });
                    self.move_cursor(exit);
                }
            }
        }
    }
}

fn unknown_operand(instruction: &Instruction, operand: &str) -> Error {
    Error::resolution(
        instruction.line,
        ResolutionErrorKind::UnknownOperand {
            opcode: instruction.opcode,
            operand: operand.to_string(),
        },
    )
}

/// Lower a planned program into unnormalized blocks
pub fn lower(program: &Program, plan: &BlockPlan) -> Result<LoweredBlocks, Errors> {
    LoweringContext::new(program, plan).lower()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use crate::ir::Inst;
    use crate::parser::parse_program;

    fn lower_source(source: &str) -> Result<LoweredBlocks, Errors> {
        let program = parse_program(source).unwrap();
        let plan = BlockPlan::build(&program, &CompileOptions::default()).unwrap();
        lower(&program, &plan)
    }

    fn block<'b>(lowered: &'b LoweredBlocks, name: &str) -> &'b BasicBlock {
        lowered.blocks.iter().find(|b| b.name == name).unwrap()
    }

    #[test]
    fn test_mover_symbol_and_literal() {
        let lowered = lower_source("MOVER AREG, X\nMOVER AREG, -4\nX DC 3\n").unwrap();
        let entry = block(&lowered, "entry");
        assert_eq!(
            entry.insts(),
            [
                Inst::Op(Operation::Load {
                    dest: Temp(0),
                    slot: Slot::Global("X".into())
                }),
                Inst::Op(Operation::Store {
                    value: Value::Temp(Temp(0)),
                    slot: Slot::Accumulator
                }),
                Inst::Op(Operation::Store {
                    value: Value::Const(-4),
                    slot: Slot::Accumulator
                }),
            ]
        );
        // Open until normalized
        assert!(!entry.is_terminated());
    }

    #[test]
    fn test_movem_loads_accumulator() {
        let lowered = lower_source("MOVEM AREG, Y\nY DS 1\n").unwrap();
        let ops: Vec<_> = block(&lowered, "entry").operations().cloned().collect();
        assert_eq!(
            ops,
            [
                Operation::Load {
                    dest: Temp(0),
                    slot: Slot::Accumulator
                },
                Operation::Store {
                    value: Value::Temp(Temp(0)),
                    slot: Slot::Global("Y".into())
                },
            ]
        );
    }

    #[test]
    fn test_comp_then_bc_is_conditional() {
        let lowered = lower_source("LOOP: COMP AREG, 10\nBC GE, LOOP\n").unwrap();
        let term = block(&lowered, "LOOP").terminator().cloned().unwrap();
        assert_eq!(
            term,
            Terminator::CondBranch {
                condition: Temp(1),
                then_block: BlockId(1),
                else_block: BlockId(2),
            }
        );
        // entry falls through explicitly
        assert_eq!(
            block(&lowered, "entry").terminator(),
            Some(&Terminator::Branch { target: BlockId(1) })
        );
    }

    #[test]
    fn test_bc_without_comp_is_unconditional() {
        let lowered = lower_source("BC ANY, DONE\nDONE: STOP\n").unwrap();
        assert_eq!(
            block(&lowered, "entry").terminator(),
            Some(&Terminator::Branch { target: BlockId(1) })
        );
    }

    #[test]
    fn test_pending_comparison_cleared_at_label() {
        let lowered = lower_source("COMP AREG, 1\nNEXT: BC ANY, NEXT\n").unwrap();
        assert_eq!(
            block(&lowered, "NEXT").terminator(),
            Some(&Terminator::Branch { target: BlockId(1) })
        );
    }

    #[test]
    fn test_literal_fallback_is_asymmetric() {
        let lowered = lower_source("ADD AREG, 99999999999999999999\nMULT AREG, 1x\n").unwrap();
        assert_eq!(lowered.warnings.len(), 2);
        let binaries: Vec<_> = block(&lowered, "entry")
            .operations()
            .filter_map(|op| match op {
                Operation::Binary { op, rhs, .. } => Some((*op, *rhs)),
                _ => None,
            })
            .collect();
        assert_eq!(
            binaries,
            [(BinaryOp::Add, Value::Const(0)), (BinaryOp::Mul, Value::Const(1))]
        );
    }

    #[test]
    fn test_unknown_operands_are_batched() {
        let errors = lower_source("MOVER AREG, NOPE\nCOMP AREG, 7q\nMOVEM AREG, 5\n").unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(Error::is_resolution));
        assert_eq!(errors.iter().map(|e| e.line().unwrap()).collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[test]
    fn test_undefined_label() {
        let errors = lower_source("BC ANY, MISSING\n").unwrap_err();
        assert_eq!(
            errors.first(),
            Some(&Error::resolution(
                1,
                ResolutionErrorKind::UndefinedLabel {
                    label: "MISSING".into()
                }
            ))
        );
    }

    #[test]
    fn test_stop_moves_to_exit() {
        let lowered = lower_source("STOP\nMOVER AREG, 1\n").unwrap();
        assert_eq!(
            block(&lowered, "entry").terminator(),
            Some(&Terminator::Branch { target: BlockId(1) })
        );
        assert_eq!(block(&lowered, "exit").operations().count(), 1);
        assert!(lowered.warnings.is_empty());
    }

    #[test]
    fn test_branch_from_exit_is_structural() {
        let errors = lower_source("L: STOP\nBC ANY, L\n").unwrap_err();
        assert_eq!(
            errors.first(),
            Some(&Error::Structural(StructuralError::BranchFromExit { line: 2 }))
        );
    }

    #[test]
    fn test_unreachable_instruction_warns() {
        let lowered = lower_source("BC ANY, L\nADD AREG, 1\nL: STOP\n").unwrap();
        assert_eq!(lowered.warnings.len(), 1);
        assert!(matches!(
            lowered.warnings[0],
            Warning::UnreachableInstruction { line: 2, opcode: Opcode::Add, .. }
        ));
        assert_eq!(block(&lowered, "entry").operations().count(), 0);
    }

    #[test]
    fn test_unreachable_operands_still_resolve() {
        let errors = lower_source("BC ANY, L\nADD AREG, GHOST\nL: STOP\n").unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_trailing_label_entered() {
        let lowered = lower_source("MOVER AREG, 1\nDONE:\n").unwrap();
        assert_eq!(
            block(&lowered, "entry").terminator(),
            Some(&Terminator::Branch { target: BlockId(1) })
        );
        assert!(!block(&lowered, "DONE").is_terminated());
    }
}
