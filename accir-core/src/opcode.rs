//! Opcodes and directives of the accumulator assembly language
//!
//! The instruction set is closed: every consumer matches exhaustively on
//! [`Opcode`], so adding a mnemonic is a compile error until every pass
//! handles it.

use std::fmt;

use serde::Serialize;

/// Name of the single implicit accumulator register
pub const ACCUMULATOR: &str = "AREG";

/// Opcode categories, used by program statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpcodeCategory {
    /// ADD, SUB, MULT
    Arithmetic,
    /// MOVER, MOVEM
    Memory,
    /// COMP, BC
    Control,
    /// STOP
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Opcode {
    // ═══════════════════════════════════════════════════════════════
    // MEMORY
    // ═══════════════════════════════════════════════════════════════
    /// Move memory (or literal) to register
    Mover,
    /// Move register to memory
    Movem,

    // ═══════════════════════════════════════════════════════════════
    // ARITHMETIC
    // ═══════════════════════════════════════════════════════════════
    Add,
    Sub,
    Mult,

    // ═══════════════════════════════════════════════════════════════
    // CONTROL
    // ═══════════════════════════════════════════════════════════════
    /// Compare AREG with an operand
    Comp,
    /// Branch on condition
    Bc,
    /// Stop execution
    Stop,
}

impl Opcode {
    pub const ALL: [Opcode; 8] = [
        Opcode::Mover,
        Opcode::Movem,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mult,
        Opcode::Comp,
        Opcode::Bc,
        Opcode::Stop,
    ];

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        Some(match mnemonic {
            "MOVER" => Self::Mover,
            "MOVEM" => Self::Movem,
            "ADD" => Self::Add,
            "SUB" => Self::Sub,
            "MULT" => Self::Mult,
            "COMP" => Self::Comp,
            "BC" => Self::Bc,
            "STOP" => Self::Stop,
            _ => return None,
        })
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Mover => "MOVER",
            Self::Movem => "MOVEM",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mult => "MULT",
            Self::Comp => "COMP",
            Self::Bc => "BC",
            Self::Stop => "STOP",
        }
    }

    /// Exact operand count
    pub fn arity(&self) -> usize {
        match self {
            Self::Stop => 0,
            _ => 2,
        }
    }

    /// Whether the first operand names the accumulator
    pub fn uses_accumulator(&self) -> bool {
        !matches!(self, Self::Bc | Self::Stop)
    }

    pub fn category(&self) -> OpcodeCategory {
        match self {
            Self::Mover | Self::Movem => OpcodeCategory::Memory,
            Self::Add | Self::Sub | Self::Mult => OpcodeCategory::Arithmetic,
            Self::Comp | Self::Bc => OpcodeCategory::Control,
            Self::Stop => OpcodeCategory::Halt,
        }
    }

    /// One-line usage summary
    pub fn synopsis(&self) -> &'static str {
        match self {
            Self::Mover => "MOVER AREG, src    AREG <- src (symbol or literal)",
            Self::Movem => "MOVEM AREG, dst    dst <- AREG",
            Self::Add => "ADD AREG, src      AREG <- AREG + src",
            Self::Sub => "SUB AREG, src      AREG <- AREG - src",
            Self::Mult => "MULT AREG, src     AREG <- AREG * src",
            Self::Comp => "COMP AREG, src     pending <- AREG >= src (signed)",
            Self::Bc => "BC cond, label     pending ? label : exit",
            Self::Stop => "STOP               branch to exit",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Data directives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Directive {
    /// Define Constant
    Dc,
    /// Define Storage
    Ds,
}

impl Directive {
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        match mnemonic {
            "DC" => Some(Self::Dc),
            "DS" => Some(Self::Ds),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Dc => "DC",
            Self::Ds => "DS",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
