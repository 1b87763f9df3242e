//! Program statistics

use std::fmt;

use serde::Serialize;

use crate::opcode::OpcodeCategory;
use crate::program::{DataKind, Program};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgramStats {
    pub total_instructions: usize,
    /// ADD, SUB, MULT
    pub arithmetic_operations: usize,
    /// MOVER, MOVEM
    pub memory_operations: usize,
    /// COMP, BC
    pub control_flow: usize,
    pub data_definitions: usize,
    pub constants: usize,
    pub storage: usize,
    pub labels: usize,
    pub start_address: u32,
}

impl ProgramStats {
    pub fn from_program(program: &Program) -> Self {
        let mut stats = Self {
            total_instructions: program.instructions().len(),
            data_definitions: program.data_definitions().len(),
            labels: program.labels().len(),
            start_address: program.start_address(),
            ..Self::default()
        };

        for instruction in program.instructions() {
            match instruction.opcode.category() {
                OpcodeCategory::Arithmetic => stats.arithmetic_operations += 1,
                OpcodeCategory::Memory => stats.memory_operations += 1,
                OpcodeCategory::Control => stats.control_flow += 1,
                OpcodeCategory::Halt => {}
            }
        }
        for data in program.data_definitions() {
            match data.kind {
                DataKind::Constant { .. } => stats.constants += 1,
                DataKind::Storage { .. } => stats.storage += 1,
            }
        }
        stats
    }
}

impl fmt::Display for ProgramStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Start address:         {}", self.start_address)?;
        writeln!(f, "Total instructions:    {}", self.total_instructions)?;
        writeln!(f, "  Arithmetic:          {}", self.arithmetic_operations)?;
        writeln!(f, "  Memory:              {}", self.memory_operations)?;
        writeln!(f, "  Control flow:        {}", self.control_flow)?;
        writeln!(
            f,
            "Data definitions:      {} ({} DC, {} DS)",
            self.data_definitions, self.constants, self.storage
        )?;
        write!(f, "Labels:                {}", self.labels)
    }
}
