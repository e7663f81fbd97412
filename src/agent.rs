//! The local agent (`spec.md` §4.4): drives one basic block's instructions
//! through a [`NumberingTable`] in two strict phases. All instructions are
//! admitted first, building up the encoding list; only once the block is
//! fully built does reconstruction begin. This is required by extensions
//! like identity propagation, which may need to resolve a later entry's
//! value while reconstructing an earlier one.

use crate::error::Result;
use crate::extensions::NumberingExtension;
use crate::ir::{BasicBlock, Instruction};
use crate::primitives::Identifier;
use crate::table::NumberingTable;

/// Runs one block's instructions through a fresh table built from
/// `extensions`, in two phases: build, then reconstruct.
pub fn run_block(block: &BasicBlock, extensions: Vec<Box<dyn NumberingExtension>>) -> Result<BasicBlock> {
    let mut table = NumberingTable::new(extensions);

    // Phase 1: admit every instruction, recording the identifier (if any)
    // later reconstruction should materialize at that position.
    let mut encoding: Vec<Option<Identifier>> = Vec::with_capacity(block.body.len());
    for instr in &block.body {
        encoding.push(table.add_entry(instr));
    }

    // Phase 2: reconstruct. Instructions ignored by the table (jmp/br) are
    // carried over verbatim; everything else is rebuilt from its entry.
    let mut new_body = Vec::with_capacity(block.body.len());
    for (instr, id) in block.body.iter().zip(encoding.into_iter()) {
        match id {
            Some(id) => new_body.push(table.reconstruct_instruction(&id)?),
            None => new_body.push(instr.clone()),
        }
    }

    Ok(BasicBlock {
        label: block.label.clone(),
        body: new_body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Literal, Type};

    fn no_extensions() -> Vec<Box<dyn NumberingExtension>> {
        vec![]
    }

    #[test]
    fn duplicate_computation_collapses_to_a_copy() {
        let block = BasicBlock {
            label: None,
            body: vec![
                Instruction::Const {
                    dest: "a".into(),
                    ty: Type::Int,
                    value: Literal::Int(4),
                },
                Instruction::Const {
                    dest: "b".into(),
                    ty: Type::Int,
                    value: Literal::Int(2),
                },
                Instruction::Binary {
                    op: BinaryOp::Add,
                    dest: "sum1".into(),
                    ty: Type::Int,
                    lhs: "a".into(),
                    rhs: "b".into(),
                },
                Instruction::Binary {
                    op: BinaryOp::Add,
                    dest: "sum2".into(),
                    ty: Type::Int,
                    lhs: "a".into(),
                    rhs: "b".into(),
                },
            ],
        };

        let rebuilt = run_block(&block, no_extensions()).unwrap();
        assert_eq!(rebuilt.body.len(), 4);
        assert_eq!(
            rebuilt.body[3],
            Instruction::Id {
                dest: "sum2".into(),
                ty: Type::Int,
                src: "sum1".into(),
            }
        );
    }

    #[test]
    fn jmp_passes_through_untouched() {
        let block = BasicBlock {
            label: None,
            body: vec![Instruction::Jmp {
                label: "done".into(),
            }],
        };
        let rebuilt = run_block(&block, no_extensions()).unwrap();
        assert_eq!(rebuilt.body, block.body);
    }
}
