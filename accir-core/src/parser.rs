//! Structural parser
//!
//! Consumes scanned lines and builds a [`Program`]. Accepted statement shapes:
//!
//! ```text
//! LABEL: REST            ; label on its own line or before a statement
//! LABEL OPCODE ...       ; label without colon, detected by the opcode after it
//! NAME DC|DS VALUE       ; data definition
//! OPCODE OP[, OP]        ; plain instruction
//! ```
//!
//! A label is bound to the index of the next instruction pushed, so the same
//! block boundary comes out whether the label shares a line with its
//! instruction or not. `END` stops parsing; later lines are never looked at.
//! Every malformed line is reported, not just the first.

use tracing::debug;

use crate::error::{Error, Errors, ParseErrorKind, Result};
use crate::opcode::{ACCUMULATOR, Directive, Opcode};
use crate::program::{DataDefinition, DataKind, Instruction, Program, is_identifier, parse_literal};
use crate::scanner::{LineKind, Scanner};

#[derive(Default)]
pub struct Parser {
    program: Program,
    errors: Errors,
    /// Most recent label still waiting for its instruction
    pending_label: Option<String>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whole source text
    pub fn parse(mut self, source: &str) -> std::result::Result<Program, Errors> {
        for line in Scanner::new(source) {
            let result = match line.kind {
                LineKind::End => {
                    debug!(line = line.number, "END reached, stopping");
                    break;
                }
                LineKind::Start { operand } => self.parse_start(operand, line.number),
                LineKind::Statement(text) => self.parse_statement(text, line.number),
            };
            if let Err(error) = result {
                self.errors.push(error);
            }
        }

        debug!(
            instructions = self.program.instructions().len(),
            data = self.program.data_definitions().len(),
            labels = self.program.labels().len(),
            errors = self.errors.len(),
            "parsed program"
        );

        let Parser { program, errors, .. } = self;
        errors.into_multi_result(program)
    }

    fn parse_start(&mut self, operand: Option<&str>, line: usize) -> Result<()> {
        if let Some(text) = operand {
            let address = text.parse::<u32>().map_err(|_| {
                Error::parse(line, ParseErrorKind::InvalidStartAddress(text.to_string()))
            })?;
            self.program.set_start_address(address);
        }
        Ok(())
    }

    fn parse_statement(&mut self, text: &str, line: usize) -> Result<()> {
        let (label, rest) = split_label(text, line)?;

        if let Some(label) = label {
            self.program.define_label(label, line)?;
            self.pending_label = Some(label.to_string());
        }
        if rest.is_empty() {
            return Ok(());
        }

        let tokens: Vec<&str> = rest.split_whitespace().collect();
        let is_data = tokens
            .iter()
            .take(2)
            .any(|token| Directive::from_mnemonic(token).is_some());

        if is_data {
            self.parse_data_definition(&tokens, rest, line)
        } else {
            self.parse_instruction(rest, line)
        }
    }

    fn parse_data_definition(&mut self, tokens: &[&str], text: &str, line: usize) -> Result<()> {
        let (name, directive, value) = match tokens {
            [name, directive, value] => match Directive::from_mnemonic(directive) {
                Some(directive) => (*name, directive, *value),
                None => return Err(malformed(text, line)),
            },
            _ => return Err(malformed(text, line)),
        };

        if !is_identifier(name) {
            return Err(Error::parse(
                line,
                ParseErrorKind::InvalidIdentifier(name.to_string()),
            ));
        }

        let kind = match directive {
            Directive::Dc => {
                let value = parse_literal(value).ok_or_else(|| {
                    Error::parse(
                        line,
                        ParseErrorKind::InvalidConstant {
                            name: name.to_string(),
                            value: value.to_string(),
                        },
                    )
                })?;
                DataKind::Constant { value }
            }
            Directive::Ds => {
                let count = value.parse::<u32>().ok().filter(|&count| count > 0).ok_or_else(|| {
                    Error::parse(
                        line,
                        ParseErrorKind::InvalidStorageSize {
                            name: name.to_string(),
                            value: value.to_string(),
                        },
                    )
                })?;
                DataKind::Storage { count }
            }
        };

        self.program.define_data(DataDefinition {
            name: name.to_string(),
            kind,
            line,
        })?;
        Ok(())
    }

    fn parse_instruction(&mut self, text: &str, line: usize) -> Result<()> {
        let (mnemonic, operand_text) = match text.split_once(char::is_whitespace) {
            Some((mnemonic, rest)) => (mnemonic, rest.trim()),
            None => (text, ""),
        };

        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| {
            Error::parse(line, ParseErrorKind::UnknownOpcode(mnemonic.to_string()))
        })?;

        let operands: Vec<String> = if operand_text.is_empty() {
            Vec::new()
        } else {
            operand_text
                .split(',')
                .map(|operand| operand.trim().to_string())
                .collect()
        };

        if operands.iter().any(String::is_empty) {
            return Err(Error::parse(line, ParseErrorKind::EmptyOperand { opcode }));
        }

        let expected = opcode.arity();
        if operands.len() < expected {
            return Err(Error::parse(
                line,
                ParseErrorKind::InsufficientOperands {
                    opcode,
                    expected,
                    found: operands.len(),
                },
            ));
        }
        if operands.len() > expected {
            return Err(Error::parse(
                line,
                ParseErrorKind::TooManyOperands {
                    opcode,
                    expected,
                    found: operands.len(),
                },
            ));
        }

        if opcode.uses_accumulator() && operands[0] != ACCUMULATOR {
            return Err(Error::parse(
                line,
                ParseErrorKind::UnsupportedRegister {
                    opcode,
                    register: operands[0].clone(),
                },
            ));
        }

        self.program.push_instruction(Instruction {
            opcode,
            operands,
            label: self.pending_label.take(),
            line,
        });
        Ok(())
    }
}

/// Split `LABEL: REST` or `LABEL OPCODE ...` into label and remainder
fn split_label(text: &str, line: usize) -> Result<(Option<&str>, &str)> {
    if let Some((head, tail)) = text.split_once(':') {
        let head = head.trim();
        if !is_identifier(head) {
            return Err(Error::parse(
                line,
                ParseErrorKind::InvalidIdentifier(head.to_string()),
            ));
        }
        return Ok((Some(head), tail.trim()));
    }

    let mut tokens = text.split_whitespace();
    let (Some(first), Some(second)) = (tokens.next(), tokens.next()) else {
        return Ok((None, text));
    };
    if Opcode::from_mnemonic(first).is_some() || Opcode::from_mnemonic(second).is_none() {
        return Ok((None, text));
    }
    if !is_identifier(first) {
        return Err(Error::parse(
            line,
            ParseErrorKind::InvalidIdentifier(first.to_string()),
        ));
    }
    Ok((Some(first), text[first.len()..].trim()))
}

fn malformed(text: &str, line: usize) -> Error {
    Error::parse(
        line,
        ParseErrorKind::MalformedDataDefinition {
            text: text.to_string(),
        },
    )
}

/// Parse source text into a [`Program`]
pub fn parse_program(source: &str) -> std::result::Result<Program, Errors> {
    Parser::new().parse(source)
}
