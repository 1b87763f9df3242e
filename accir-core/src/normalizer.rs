//! Terminator normalizer
//!
//! The only pass allowed to insert fallback terminators. Every block left
//! open by lowering is closed: `exit` with `ret i32 0`, any other block with
//! `br label %exit`. The repaired function is then verified:
//!
//! - exactly one terminator per block, and it is the last entry
//! - every branch target is a block of the function
//! - `ret` appears in `exit` only, and `exit` ends in one
//! - every block has a path to `exit`

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{Errors, StructuralError};
use crate::ir::{BlockId, Function, Terminator};

/// Status returned by the exit block
pub const EXIT_STATUS: i32 = 0;

/// Close open blocks, then verify. Returns the number of repaired blocks.
pub fn normalize(function: &mut Function) -> Result<usize, Errors> {
    let exit = function.exit;
    let mut repaired = 0;

    for block in &mut function.blocks {
        if block.is_terminated() {
            continue;
        }
        let term = if block.id == exit {
            Terminator::Return { status: EXIT_STATUS }
        } else {
            Terminator::Branch { target: exit }
        };
        block.push_terminator(term);
        repaired += 1;
    }

    debug!(blocks = function.blocks.len(), repaired, "normalized terminators");
    verify(function)?;
    Ok(repaired)
}

/// Check the well-formedness of a finished function
pub fn verify(function: &Function) -> Result<(), Errors> {
    let mut errors = Errors::new();
    let count = function.blocks.len();

    if function.exit.0 >= count || function.entry.0 >= count {
        errors.push(StructuralError::MalformedBlock {
            block: function.name.clone(),
            reason: "entry or exit block is missing".to_string(),
        });
        return Err(errors);
    }

    for (index, block) in function.blocks.iter().enumerate() {
        let malformed = |reason: String| StructuralError::MalformedBlock {
            block: block.name.clone(),
            reason,
        };

        if block.id != BlockId(index) {
            errors.push(malformed(format!("id #{} stored at position {}", block.id.0, index)));
            continue;
        }

        let terminators = block.terminator_count();
        let Some(term) = block.terminator() else {
            errors.push(malformed(if terminators == 0 {
                "missing terminator".to_string()
            } else {
                "operation after terminator".to_string()
            }));
            continue;
        };
        if terminators > 1 {
            errors.push(malformed(format!("{} terminators", terminators)));
            continue;
        }

        match term {
            Terminator::Return { .. } if block.id != function.exit => {
                errors.push(malformed("return outside the exit block".to_string()));
            }
            Terminator::Branch { .. } | Terminator::CondBranch { .. } if block.id == function.exit => {
                errors.push(malformed("exit block must return".to_string()));
            }
            _ => {}
        }

        for target in term.successors() {
            if target.0 >= count {
                errors.push(StructuralError::UnknownBlock {
                    block: block.name.clone(),
                    target: target.0,
                });
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    for id in blocks_without_exit_path(function) {
        errors.push(StructuralError::NoPathToExit {
            block: function.block_name(id).to_string(),
        });
    }
    errors.into_multi_result(())
}

/// Reverse breadth-first search from `exit`
fn blocks_without_exit_path(function: &Function) -> Vec<BlockId> {
    let count = function.blocks.len();
    let mut predecessors = vec![Vec::new(); count];
    for block in &function.blocks {
        for target in block.successors() {
            predecessors[target.0].push(block.id);
        }
    }

    let mut reaches_exit = vec![false; count];
    let mut queue = VecDeque::from([function.exit]);
    reaches_exit[function.exit.0] = true;
    while let Some(id) = queue.pop_front() {
        for &pred in &predecessors[id.0] {
            if !reaches_exit[pred.0] {
                reaches_exit[pred.0] = true;
                queue.push_back(pred);
            }
        }
    }

    (0..count)
        .filter(|&i| !reaches_exit[i])
        .map(BlockId)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ir::{BasicBlock, Operation, Slot, Temp, Value};

    fn function(blocks: Vec<BasicBlock>) -> Function {
        let exit = BlockId(blocks.len() - 1);
        Function {
            name: "main".into(),
            accumulator: "AREG".into(),
            entry: BlockId(0),
            exit,
            blocks,
        }
    }

    fn open_blocks(names: &[&str]) -> Vec<BasicBlock> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| BasicBlock::new(BlockId(i), *name))
            .collect()
    }

    #[test]
    fn test_repairs_open_blocks() {
        let mut f = function(open_blocks(&["entry", "UNUSED", "exit"]));
        assert_eq!(normalize(&mut f).unwrap(), 3);

        assert_eq!(f.blocks[0].terminator(), Some(&Terminator::Branch { target: BlockId(2) }));
        assert_eq!(f.blocks[1].terminator(), Some(&Terminator::Branch { target: BlockId(2) }));
        assert_eq!(f.blocks[2].terminator(), Some(&Terminator::Return { status: 0 }));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut f = function(open_blocks(&["entry", "exit"]));
        normalize(&mut f).unwrap();
        let once = f.clone();
        assert_eq!(normalize(&mut f).unwrap(), 0);
        assert_eq!(f, once);
    }

    #[test]
    fn test_self_loop_has_no_path_to_exit() {
        let mut blocks = open_blocks(&["entry", "SPIN", "exit"]);
        blocks[1].push_terminator(Terminator::Branch { target: BlockId(1) });
        let mut f = function(blocks);

        let errors = normalize(&mut f).unwrap_err();
        assert_eq!(
            errors.first(),
            Some(&Error::Structural(StructuralError::NoPathToExit {
                block: "SPIN".into()
            }))
        );
    }

    #[test]
    fn test_operation_after_terminator() {
        let mut blocks = open_blocks(&["entry", "exit"]);
        blocks[0].push_terminator(Terminator::Branch { target: BlockId(1) });
        blocks[0].push_op(Operation::Store {
            value: Value::Const(1),
            slot: Slot::Accumulator,
        });
        blocks[1].push_terminator(Terminator::Return { status: 0 });

        let errors = verify(&function(blocks)).unwrap_err();
        assert_eq!(errors.first().map(Error::code), Some("E306"));
    }

    #[test]
    fn test_unknown_target_and_stray_return() {
        let mut blocks = open_blocks(&["entry", "L", "exit"]);
        blocks[0].push_terminator(Terminator::CondBranch {
            condition: Temp(0),
            then_block: BlockId(9),
            else_block: BlockId(2),
        });
        blocks[1].push_terminator(Terminator::Return { status: 0 });
        blocks[2].push_terminator(Terminator::Return { status: 0 });

        let errors = verify(&function(blocks)).unwrap_err();
        let codes: Vec<_> = errors.iter().map(Error::code).collect();
        assert_eq!(codes, ["E307", "E306"]);
    }
}
