//! Parsed program model
//!
//! A [`Program`] is built once by the parser and read-only afterwards. It owns
//! the instruction sequence, the data-definition table and the label table.
//! Both tables keep first-appearance order next to a name index, so every
//! consumer iterates them deterministically.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::StructuralError;
use crate::opcode::{Directive, Opcode};

/// A parsed instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// 0-2 symbols or literals, trimmed
    pub operands: Vec<String>,
    /// Label attached to this instruction, if any
    pub label: Option<String>,
    /// Source line (diagnostics only)
    pub line: usize,
}

impl Instruction {
    pub fn operand(&self, index: usize) -> Option<&str> {
        self.operands.get(index).map(String::as_str)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{}: ", label)?;
        }
        write!(f, "{}", self.opcode)?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataKind {
    /// `DC value`
    Constant { value: i32 },
    /// `DS count`, zero-initialized
    Storage { count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataDefinition {
    pub name: String,
    pub kind: DataKind,
    pub line: usize,
}

impl DataDefinition {
    pub fn directive(&self) -> Directive {
        match self.kind {
            DataKind::Constant { .. } => Directive::Dc,
            DataKind::Storage { .. } => Directive::Ds,
        }
    }

    /// Initial value of the lowered global
    pub fn initializer(&self) -> i32 {
        match self.kind {
            DataKind::Constant { value } => value,
            DataKind::Storage { .. } => 0,
        }
    }
}

/// Label table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    pub name: String,
    /// Index of the instruction that logically follows the label
    pub index: usize,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
    data: Vec<DataDefinition>,
    data_index: HashMap<String, usize>,
    labels: Vec<Label>,
    label_index: HashMap<String, usize>,
    start_address: u32,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Data definitions in declaration order
    pub fn data_definitions(&self) -> &[DataDefinition] {
        &self.data
    }

    pub fn data(&self, name: &str) -> Option<&DataDefinition> {
        self.data_index.get(name).map(|&i| &self.data[i])
    }

    pub fn is_data(&self, name: &str) -> bool {
        self.data_index.contains_key(name)
    }

    /// Labels in first-appearance order
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&Label> {
        self.label_index.get(name).map(|&i| &self.labels[i])
    }

    /// Instruction index a label is bound to
    pub fn label_target(&self, name: &str) -> Option<usize> {
        self.label(name).map(|label| label.index)
    }

    /// Informational only
    pub fn start_address(&self) -> u32 {
        self.start_address
    }

    pub(crate) fn set_start_address(&mut self, address: u32) {
        self.start_address = address;
    }

    pub(crate) fn push_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Bind `name` to the next instruction to be pushed
    pub(crate) fn define_label(&mut self, name: &str, line: usize) -> Result<(), StructuralError> {
        if let Some(existing) = self.label(name) {
            return Err(StructuralError::DuplicateLabel {
                label: name.to_string(),
                first_line: existing.line,
                line,
            });
        }
        self.label_index.insert(name.to_string(), self.labels.len());
        self.labels.push(Label {
            name: name.to_string(),
            index: self.instructions.len(),
            line,
        });
        Ok(())
    }

    pub(crate) fn define_data(&mut self, definition: DataDefinition) -> Result<(), StructuralError> {
        if let Some(existing) = self.data(&definition.name) {
            return Err(StructuralError::DuplicateData {
                name: definition.name,
                first_line: existing.line,
                line: definition.line,
            });
        }
        self.data_index.insert(definition.name.clone(), self.data.len());
        self.data.push(definition);
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether an operand is written as an integer literal: a digit, optionally
/// preceded by a sign
pub fn looks_like_literal(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    digits.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Parse an integer literal, wrapping to 32-bit two's complement
pub fn parse_literal(text: &str) -> Option<i32> {
    text.parse::<i64>().ok().map(|value| value as i32)
}
