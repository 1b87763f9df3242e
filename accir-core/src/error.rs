//! Error types for the ACCIR compiler
//!
//! Three families mirror the pipeline: parse errors (one source line is
//! malformed), resolution errors (an operand or branch target names nothing),
//! and structural errors (the label/data tables or the control-flow graph are
//! inconsistent). Every variant carries enough context to name the construct
//! and, where one exists, the source line.

use std::fmt;

use thiserror::Error;

use crate::opcode::Opcode;

pub type Result<T> = std::result::Result<T, Error>;

/// Collection of multiple errors for batch reporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors {
    errors: Vec<Error>,
}

impl Errors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection
    pub fn push(&mut self, error: impl Into<Error>) {
        self.errors.push(error.into());
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Get all errors
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    pub fn first(&self) -> Option<&Error> {
        self.errors.first()
    }

    /// Ok with `value` if nothing was collected, the whole batch otherwise
    pub fn into_multi_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found {} error(s):", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            writeln!(f, "\n[{}] error[{}]: {}", i + 1, error.code(), error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Errors {}

impl From<Error> for Errors {
    fn from(error: Error) -> Self {
        let mut errors = Errors::new();
        errors.push(error);
        errors
    }
}

impl IntoIterator for Errors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed source line
    #[error("parse error at line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },

    /// Operand or branch target that resolves to nothing
    #[error("resolution error at line {line}: {kind}")]
    Resolution { line: usize, kind: ResolutionErrorKind },

    /// Inconsistent label/data tables or control-flow graph
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// Failure while executing an emitted module
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// accir.toml error
    #[error("configuration error: {0}")]
    Config(String),

    /// Unreadable input file
    #[error("I/O error: {0}")]
    Io(String),
}

/// Specific parse error kinds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("invalid START address '{0}'")]
    InvalidStartAddress(String),

    #[error("unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("{opcode} expects {expected} operand(s), found {found}")]
    InsufficientOperands {
        opcode: Opcode,
        expected: usize,
        found: usize,
    },

    #[error("{opcode} takes {expected} operand(s), found {found}")]
    TooManyOperands {
        opcode: Opcode,
        expected: usize,
        found: usize,
    },

    #[error("empty operand in {opcode}")]
    EmptyOperand { opcode: Opcode },

    #[error("{opcode} operates on AREG only, found '{register}'")]
    UnsupportedRegister { opcode: Opcode, register: String },

    #[error("malformed data definition '{text}' (expected NAME DC|DS VALUE)")]
    MalformedDataDefinition { text: String },

    #[error("invalid DC value '{value}' for '{name}'")]
    InvalidConstant { name: String, value: String },

    #[error("invalid DS size '{value}' for '{name}' (expected a positive count)")]
    InvalidStorageSize { name: String, value: String },

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Specific resolution error kinds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionErrorKind {
    #[error("{opcode}: operand '{operand}' is neither a known symbol nor an integer literal")]
    UnknownOperand { opcode: Opcode, operand: String },

    #[error("branch target '{label}' is not a defined label")]
    UndefinedLabel { label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("duplicate label '{label}' at line {line} (first defined at line {first_line})")]
    DuplicateLabel {
        label: String,
        first_line: usize,
        line: usize,
    },

    #[error("duplicate data definition '{name}' at line {line} (first defined at line {first_line})")]
    DuplicateData {
        name: String,
        first_line: usize,
        line: usize,
    },

    #[error("'{name}' is both a label (line {label_line}) and a data definition (line {data_line})")]
    NamespaceCollision {
        name: String,
        label_line: usize,
        data_line: usize,
    },

    #[error("'{name}' at line {line} is a reserved name")]
    ReservedName { name: String, line: usize },

    #[error("BC at line {line} follows STOP; the exit block cannot branch")]
    BranchFromExit { line: usize },

    #[error("block '{block}' is malformed: {reason}")]
    MalformedBlock { block: String, reason: String },

    #[error("block '{block}' branches to unknown block #{target}")]
    UnknownBlock { block: String, target: usize },

    #[error("block '{block}' has no path to exit")]
    NoPathToExit { block: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: usize },

    #[error("block '{block}' ended without a terminator")]
    MissingTerminator { block: String },

    #[error("jump to unknown block #{0}")]
    UnknownBlock(usize),

    #[error("unknown global '@{0}'")]
    UnknownGlobal(String),

    #[error("temporary '%t{temp}' used before definition in block '{block}'")]
    UndefinedTemporary { block: String, temp: u32 },
}

impl Error {
    pub(crate) fn parse(line: usize, kind: ParseErrorKind) -> Self {
        Error::Parse { line, kind }
    }

    pub(crate) fn resolution(line: usize, kind: ResolutionErrorKind) -> Self {
        Error::Resolution { line, kind }
    }

    /// Source line the error points at, when it has one
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Parse { line, .. } | Error::Resolution { line, .. } => Some(*line),
            Error::Structural(err) => match err {
                StructuralError::DuplicateLabel { line, .. }
                | StructuralError::DuplicateData { line, .. }
                | StructuralError::ReservedName { line, .. }
                | StructuralError::BranchFromExit { line } => Some(*line),
                StructuralError::NamespaceCollision { label_line, .. } => Some(*label_line),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::Resolution { .. })
    }

    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Parse { kind, .. } => match kind {
                ParseErrorKind::InvalidStartAddress(_) => "E101",
                ParseErrorKind::UnknownOpcode(_) => "E102",
                ParseErrorKind::InsufficientOperands { .. } => "E103",
                ParseErrorKind::TooManyOperands { .. } => "E104",
                ParseErrorKind::EmptyOperand { .. } => "E105",
                ParseErrorKind::UnsupportedRegister { .. } => "E106",
                ParseErrorKind::MalformedDataDefinition { .. } => "E107",
                ParseErrorKind::InvalidConstant { .. } => "E108",
                ParseErrorKind::InvalidStorageSize { .. } => "E109",
                ParseErrorKind::InvalidIdentifier(_) => "E110",
            },
            Error::Resolution { kind, .. } => match kind {
                ResolutionErrorKind::UnknownOperand { .. } => "E201",
                ResolutionErrorKind::UndefinedLabel { .. } => "E202",
            },
            Error::Structural(err) => match err {
                StructuralError::DuplicateLabel { .. } => "E301",
                StructuralError::DuplicateData { .. } => "E302",
                StructuralError::NamespaceCollision { .. } => "E303",
                StructuralError::ReservedName { .. } => "E304",
                StructuralError::BranchFromExit { .. } => "E305",
                StructuralError::MalformedBlock { .. } => "E306",
                StructuralError::UnknownBlock { .. } => "E307",
                StructuralError::NoPathToExit { .. } => "E308",
            },
            Error::Execution(err) => match err {
                ExecutionError::StepLimitExceeded { .. } => "E401",
                ExecutionError::MissingTerminator { .. } => "E402",
                ExecutionError::UnknownBlock(_) => "E403",
                ExecutionError::UnknownGlobal(_) => "E404",
                ExecutionError::UndefinedTemporary { .. } => "E405",
            },
            Error::Config(_) => "E501",
            Error::Io(_) => "E502",
        }
    }
}

impl From<StructuralError> for Errors {
    fn from(error: StructuralError) -> Self {
        Error::Structural(error).into()
    }
}

impl From<ExecutionError> for Errors {
    fn from(error: ExecutionError) -> Self {
        Error::Execution(error).into()
    }
}
