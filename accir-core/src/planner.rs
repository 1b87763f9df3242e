//! Control-flow block planner
//!
//! Allocates the block set of the emitted function before any instruction is
//! lowered: `entry`, one block per distinct label in label-table order, then
//! `exit`. The plan also records, for every instruction index, which blocks
//! begin there, so forward branches resolve against a complete table.
//!
//! Structural checks on the label and data tables run here; any violation
//! stops the pipeline before lowering starts.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::CompileOptions;
use crate::error::{Errors, StructuralError};
use crate::ir::BlockId;
use crate::opcode::ACCUMULATOR;
use crate::program::Program;

pub const ENTRY_BLOCK: &str = "entry";
pub const EXIT_BLOCK: &str = "exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    names: Vec<String>,
    by_label: HashMap<String, BlockId>,
    /// Instruction index -> blocks starting there, in label-table order
    boundaries: BTreeMap<usize, Vec<BlockId>>,
}

impl BlockPlan {
    pub fn build(program: &Program, options: &CompileOptions) -> Result<Self, Errors> {
        let mut errors = Errors::new();
        let reserved = [ENTRY_BLOCK, EXIT_BLOCK, ACCUMULATOR, options.function_name.as_str()];

        for label in program.labels() {
            if reserved.contains(&label.name.as_str()) {
                errors.push(StructuralError::ReservedName {
                    name: label.name.clone(),
                    line: label.line,
                });
            } else if let Some(data) = program.data(&label.name) {
                errors.push(StructuralError::NamespaceCollision {
                    name: label.name.clone(),
                    label_line: label.line,
                    data_line: data.line,
                });
            }
        }
        for data in program.data_definitions() {
            if reserved.contains(&data.name.as_str()) {
                errors.push(StructuralError::ReservedName {
                    name: data.name.clone(),
                    line: data.line,
                });
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut plan = Self {
            names: vec![ENTRY_BLOCK.to_string()],
            by_label: HashMap::with_capacity(program.labels().len()),
            boundaries: BTreeMap::new(),
        };
        for label in program.labels() {
            let id = BlockId(plan.names.len());
            plan.names.push(label.name.clone());
            plan.by_label.insert(label.name.clone(), id);
            plan.boundaries.entry(label.index).or_default().push(id);
        }
        plan.names.push(EXIT_BLOCK.to_string());

        debug!(
            blocks = plan.names.len(),
            labels = program.labels().len(),
            "planned control-flow blocks"
        );
        Ok(plan)
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn exit(&self) -> BlockId {
        BlockId(self.names.len() - 1)
    }

    /// Number of planned blocks, entry and exit included
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Block names in creation order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, id: BlockId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    pub fn block_for_label(&self, label: &str) -> Option<BlockId> {
        self.by_label.get(label).copied()
    }

    /// Blocks whose first instruction is `index`
    pub fn boundaries_at(&self, index: usize) -> &[BlockId] {
        self.boundaries.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::parser::parse_program;

    fn plan(source: &str) -> Result<BlockPlan, Errors> {
        let program = parse_program(source).unwrap();
        BlockPlan::build(&program, &CompileOptions::default())
    }

    #[test]
    fn test_blocks_in_label_order() {
        let plan = plan("BC ANY, LATER\nFIRST: STOP\nLATER: STOP\n").unwrap();
        assert_eq!(plan.names(), ["entry", "FIRST", "LATER", "exit"]);
        assert_eq!(plan.block_for_label("LATER"), Some(BlockId(2)));
        assert_eq!(plan.exit(), BlockId(3));
        assert_eq!(plan.boundaries_at(1), [BlockId(1)]);
        assert_eq!(plan.boundaries_at(2), [BlockId(2)]);
        assert!(plan.boundaries_at(0).is_empty());
    }

    #[test]
    fn test_stacked_labels_share_boundary() {
        let plan = plan("A:\nB:\nSTOP\n").unwrap();
        assert_eq!(plan.boundaries_at(0), [BlockId(1), BlockId(2)]);
    }

    #[test]
    fn test_no_labels() {
        let plan = plan("STOP").unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.name(plan.entry()), Some("entry"));
        assert_eq!(plan.name(plan.exit()), Some("exit"));
    }

    #[test]
    fn test_namespace_collision() {
        let errors = plan("X: STOP\nX DC 1\n").unwrap_err();
        assert!(matches!(
            errors.first(),
            Some(Error::Structural(StructuralError::NamespaceCollision {
                label_line: 1,
                data_line: 2,
                ..
            }))
        ));
    }

    #[test]
    fn test_reserved_names() {
        let errors = plan("exit: STOP\nmain DC 1\n").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.code() == "E304"));

        let program = parse_program("main: STOP").unwrap();
        let options = CompileOptions::default().with_function_name("run");
        assert!(BlockPlan::build(&program, &options).is_ok());
    }
}
