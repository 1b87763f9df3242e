//! Basic-block intermediate representation
//!
//! ```text
//! Module
//!  ├── globals     one i32 per data definition, in declaration order
//!  └── function    i32 @main()
//!       └── blocks entry, one per label (first appearance), exit
//!            └── insts  operations, then exactly one terminator
//! ```
//!
//! Memory is addressed through [`Slot`]s: the function-local accumulator or a
//! module global. Values flow through [`Temp`]oraries numbered in generation
//! order. Arithmetic is 32-bit and wraps.

pub mod printer;

use std::fmt;

use serde::Serialize;

/// Index of a block inside its function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(pub usize);

/// SSA temporary, rendered as `%tN`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Temp(pub u32);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%t{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Const(i32),
    Temp(Temp),
}

/// Addressable 32-bit memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Slot {
    /// The function-local AREG slot
    Accumulator,
    /// A module global
    Global(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
}

impl BinaryOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
        }
    }

    /// Two's-complement wraparound, never traps
    pub fn apply(&self, lhs: i32, rhs: i32) -> i32 {
        match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
        }
    }
}

/// Comparison predicates. COMP lowers to one canonical predicate only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Signed `lhs >= rhs`
    Sge,
}

impl Predicate {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Sge => "sge",
        }
    }

    pub fn evaluate(&self, lhs: i32, rhs: i32) -> bool {
        match self {
            Self::Sge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "inst", rename_all = "snake_case")]
pub enum Operation {
    Load {
        dest: Temp,
        slot: Slot,
    },
    Store {
        value: Value,
        slot: Slot,
    },
    Binary {
        dest: Temp,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
    },
    Compare {
        dest: Temp,
        predicate: Predicate,
        lhs: Value,
        rhs: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "inst", rename_all = "snake_case")]
pub enum Terminator {
    Branch {
        target: BlockId,
    },
    CondBranch {
        condition: Temp,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return {
        status: i32,
    },
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Branch { target } => vec![*target],
            Self::CondBranch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Self::Return { .. } => Vec::new(),
        }
    }
}

/// Block entry: an operation or a terminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Inst {
    Op(Operation),
    Term(Terminator),
}

impl Inst {
    pub fn is_terminator(&self) -> bool {
        matches!(self, Inst::Term(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    insts: Vec<Inst>,
}

impl BasicBlock {
    pub fn new(id: BlockId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            insts: Vec::new(),
        }
    }

    pub fn insts(&self) -> &[Inst] {
        &self.insts
    }

    /// Non-terminator entries, in order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.insts.iter().filter_map(|inst| match inst {
            Inst::Op(op) => Some(op),
            Inst::Term(_) => None,
        })
    }

    /// The final terminator, if the block ends in one
    pub fn terminator(&self) -> Option<&Terminator> {
        match self.insts.last() {
            Some(Inst::Term(term)) => Some(term),
            _ => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminator().is_some()
    }

    pub fn terminator_count(&self) -> usize {
        self.insts.iter().filter(|inst| inst.is_terminator()).count()
    }

    pub fn successors(&self) -> Vec<BlockId> {
        self.terminator().map(Terminator::successors).unwrap_or_default()
    }

    pub(crate) fn push_op(&mut self, op: Operation) {
        self.insts.push(Inst::Op(op));
    }

    pub(crate) fn push_terminator(&mut self, term: Terminator) {
        self.insts.push(Inst::Term(term));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GlobalKind {
    Constant,
    /// DS collapses to a scalar; the declared count is kept for tooling
    Storage { declared_count: u32 },
}

/// Internal 32-bit global
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Global {
    pub name: String,
    pub initializer: i32,
    pub kind: GlobalKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    /// Name of the local accumulator slot
    pub accumulator: String,
    pub entry: BlockId,
    pub exit: BlockId,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0)
    }

    pub fn block_by_name(&self, name: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|block| block.name == name)
    }

    pub fn block_name(&self, id: BlockId) -> &str {
        self.block(id).map(|block| block.name.as_str()).unwrap_or("<unknown>")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub function: Function,
}

impl Module {
    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|global| global.name == name)
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.function.blocks
    }

    pub fn block(&self, name: &str) -> Option<&BasicBlock> {
        self.function.block_by_name(name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
