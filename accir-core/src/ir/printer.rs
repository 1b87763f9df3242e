//! Textual rendering of a [`Module`]
//!
//! LLVM-flavoured and deterministic: the output is a pure function of the
//! module, so compiling the same program twice prints the same bytes.
//!
//! ```text
//! ; ModuleID = 'classical_module'
//! source_filename = "classical_module"
//!
//! @ONE = internal global i32 1
//!
//! define i32 @main() {
//! entry:
//!   %AREG = alloca i32
//!   store i32 0, ptr %AREG
//!   %t0 = load i32, ptr @ONE
//!   store i32 %t0, ptr %AREG
//!   br label %exit
//!
//! exit:
//!   ret i32 0
//! }
//! ```
//!
//! Blocks named after source labels print as `label_NAME`, so a label such as
//! `t0` never clashes with a temporary or the accumulator slot.

use std::fmt::{self, Display, Formatter, Write};

use super::{BasicBlock, BlockId, Function, Global, GlobalKind, Inst, Module, Operation, Slot, Terminator, Value};

const LABEL_PREFIX: &str = "label_";

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(value) => write!(f, "{}", value),
            Value::Temp(temp) => write!(f, "{}", temp),
        }
    }
}

impl Display for Global {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{} = internal global i32 {}", self.name, self.initializer)?;
        if let GlobalKind::Storage { declared_count } = self.kind
            && declared_count != 1
        {
            write!(f, " ; DS {}", declared_count)?;
        }
        Ok(())
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;
        writeln!(f)?;

        if !self.globals.is_empty() {
            for global in &self.globals {
                writeln!(f, "{}", global)?;
            }
            writeln!(f)?;
        }

        FunctionPrinter::new(&self.function).fmt(f)
    }
}

struct FunctionPrinter<'a> {
    function: &'a Function,
}

impl<'a> FunctionPrinter<'a> {
    fn new(function: &'a Function) -> Self {
        Self { function }
    }

    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "define i32 @{}() {{", self.function.name)?;
        for (i, block) in self.function.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            self.block(f, block)?;
        }
        writeln!(f, "}}")
    }

    fn block(&self, f: &mut Formatter<'_>, block: &BasicBlock) -> fmt::Result {
        writeln!(f, "{}:", self.label(block.id))?;
        if block.id == self.function.entry {
            writeln!(f, "  %{} = alloca i32", self.function.accumulator)?;
            writeln!(f, "  store i32 0, ptr %{}", self.function.accumulator)?;
        }
        let mut line = String::new();
        for inst in block.insts() {
            line.clear();
            match inst {
                Inst::Op(op) => self.operation(&mut line, op)?,
                Inst::Term(term) => self.terminator(&mut line, term)?,
            }
            writeln!(f, "  {}", line)?;
        }
        Ok(())
    }

    fn label(&self, id: BlockId) -> String {
        let name = self.function.block_name(id);
        if id == self.function.entry || id == self.function.exit {
            name.to_string()
        } else {
            format!("{}{}", LABEL_PREFIX, name)
        }
    }

    fn slot(&self, slot: &Slot) -> String {
        match slot {
            Slot::Accumulator => format!("%{}", self.function.accumulator),
            Slot::Global(name) => format!("@{}", name),
        }
    }

    fn operation(&self, out: &mut String, op: &Operation) -> fmt::Result {
        match op {
            Operation::Load { dest, slot } => {
                write!(out, "{} = load i32, ptr {}", dest, self.slot(slot))
            }
            Operation::Store { value, slot } => {
                write!(out, "store i32 {}, ptr {}", value, self.slot(slot))
            }
            Operation::Binary { dest, op, lhs, rhs } => {
                write!(out, "{} = {} i32 {}, {}", dest, op.mnemonic(), lhs, rhs)
            }
            Operation::Compare {
                dest,
                predicate,
                lhs,
                rhs,
            } => write!(out, "{} = icmp {} i32 {}, {}", dest, predicate.mnemonic(), lhs, rhs),
        }
    }

    fn terminator(&self, out: &mut String, term: &Terminator) -> fmt::Result {
        match term {
            Terminator::Branch { target } => {
                write!(out, "br label %{}", self.label(*target))
            }
            Terminator::CondBranch {
                condition,
                then_block,
                else_block,
            } => write!(
                out,
                "br i1 {}, label %{}, label %{}",
                condition,
                self.label(*then_block),
                self.label(*else_block)
            ),
            Terminator::Return { status } => write!(out, "ret i32 {}", status),
        }
    }
}
