//! The numbering table (`spec.md` §4.2): a per-block hash-consed table with
//! entry lifecycle, conflict renaming, and instruction reconstruction.

use crate::builder::{self, BuildArg};
use crate::error::{BrilError, Result};
use crate::extensions::{NumberingExtension, Phase};
use crate::ir::Instruction;
use crate::primitives::{Identifier, Operand, Primitive, Value};
use std::collections::HashMap;

/// One row of the table: a dense number, the canonical `Value`, and the
/// canonical user-visible destination name.
#[derive(Debug, Clone)]
pub struct Entry {
    pub number: usize,
    pub value: Value,
    pub variable: String,
}

/// Operators this table does not admit: `jmp`/`br` carry no value to
/// number, only control flow.
const IGNORED_OPERATORS: [&str; 2] = ["jmp", "br"];

/// Born empty at the start of each block, grown monotonically, discarded
/// at block end. Extensions are owned by the table for the duration of one
/// block's run and must be `reset` between blocks (the local agent does
/// this, or a caller may simply build a fresh table per block).
pub struct NumberingTable {
    entries: Vec<Entry>,
    value_index: HashMap<Value, usize>,
    identifier_index: HashMap<Identifier, usize>,
    extensions: Vec<Box<dyn NumberingExtension>>,
}

impl NumberingTable {
    pub fn new(extensions: Vec<Box<dyn NumberingExtension>>) -> Self {
        NumberingTable {
            entries: Vec::new(),
            value_index: HashMap::new(),
            identifier_index: HashMap::new(),
            extensions,
        }
    }

    pub fn reset_extensions(&mut self) {
        for ext in self.extensions.iter_mut() {
            ext.reset();
        }
    }

    pub fn get_entry_by_identifier(&self, id: &Identifier) -> Option<&Entry> {
        self.identifier_index.get(id).map(|&idx| &self.entries[idx])
    }

    pub fn get_entry_by_value(&self, value: &Value) -> Option<&Entry> {
        self.value_index.get(value).map(|&idx| &self.entries[idx])
    }

    fn apply_phase(&mut self, phase: Phase, mut value: Value) -> Value {
        let mut extensions = std::mem::take(&mut self.extensions);
        for ext in extensions.iter_mut() {
            if ext.phase() == phase {
                value = ext.update(value, self);
            }
        }
        self.extensions = extensions;
        value
    }

    /// Resolve an operand name to its canonical `Identifier`: a numeric
    /// identifier if the name is already bound in this block, otherwise a
    /// named identifier referring to a block-external definition.
    fn resolve_operand(&self, name: &str) -> Identifier {
        let local = Identifier::Name(name.to_string());
        match self.identifier_index.get(&local) {
            Some(&idx) => Identifier::Number(self.entries[idx].number),
            None => local,
        }
    }

    fn encode(&self, instr: &Instruction) -> Value {
        let op = instr.operator().to_string();
        let ty = instr.dest_type();

        if let Instruction::Const { value, .. } = instr {
            return Value::new(op, vec![Operand::Primitive(Primitive(*value))], ty);
        }

        let operands = instr
            .arguments()
            .into_iter()
            .map(|name| Operand::Identifier(self.resolve_operand(name)))
            .collect();
        Value::new(op, operands, ty)
    }

    /// Admit `instr` into the table. Returns the identifier later
    /// reconstruction should use, or `None` if `instr`'s operator is not
    /// subject to LVN (`jmp`, `br`).
    pub fn add_entry(&mut self, instr: &Instruction) -> Option<Identifier> {
        if IGNORED_OPERATORS.contains(&instr.operator()) {
            return None;
        }

        let name = match instr.destination() {
            Some(dest) => dest.to_string(),
            None => format!("lvn.{}", self.entries.len()),
        };

        // Conflict repair: if `name` already denotes an entry in this
        // block, that entry is about to be shadowed by this instruction's
        // definition, so rename its canonical variable out of the way.
        if let Some(&conflict_idx) = self.identifier_index.get(&Identifier::Name(name.clone())) {
            let conflict_number = self.entries[conflict_idx].number;
            let renamed = format!("lvn.{conflict_number}");
            self.entries[conflict_idx].variable = renamed.clone();
            self.identifier_index
                .insert(Identifier::Name(renamed), conflict_idx);
        }

        let value = self.encode(instr);
        let value = self.apply_phase(Phase::PreBuild, value);

        if let Some(&existing_idx) = self.value_index.get(&value) {
            self.identifier_index
                .insert(Identifier::Name(name.clone()), existing_idx);
            return Some(Identifier::Name(name));
        }

        let number = self.entries.len();
        let entry = Entry {
            number,
            value: value.clone(),
            variable: name.clone(),
        };
        self.entries.push(entry);
        self.value_index.insert(value, number);
        self.identifier_index
            .insert(Identifier::Number(number), number);
        self.identifier_index.insert(Identifier::Name(name), number);
        Some(Identifier::Number(number))
    }

    /// Produce the rewritten instruction that belongs at the position
    /// which originally produced `id` (an identifier previously returned
    /// by [`NumberingTable::add_entry`]).
    pub fn reconstruct_instruction(&mut self, id: &Identifier) -> Result<Instruction> {
        let idx = *self.identifier_index.get(id).ok_or_else(|| {
            BrilError::IRInvariantViolation(format!(
                "dangling identifier {id:?} during LVN reconstruction"
            ))
        })?;

        let value = self.entries[idx].value.clone();
        let value = self.apply_phase(Phase::Reconstruction, value);

        let mut uses = Vec::with_capacity(value.operands.len());
        for operand in &value.operands {
            let use_arg = match operand {
                Operand::Primitive(Primitive(lit)) => BuildArg::Literal(*lit),
                Operand::Identifier(Identifier::Number(n)) => {
                    let used_entry = self.entries.get(*n).ok_or_else(|| {
                        BrilError::IRInvariantViolation(format!(
                            "reconstruction referenced unknown table row #{n}"
                        ))
                    })?;
                    BuildArg::Name(used_entry.variable.clone())
                }
                Operand::Identifier(Identifier::Name(name)) => BuildArg::Name(name.clone()),
            };
            uses.push(use_arg);
        }

        let entry = &self.entries[idx];
        if id.is_number() {
            // First materialization of this entry.
            return builder::build_by_name(
                &value.op,
                Some(entry.variable.clone()),
                uses,
                value.ty,
            );
        }

        let dest = id
            .as_name()
            .expect("named identifier must carry a name")
            .to_string();
        if value.op == "id" || value.op == "const" {
            // Cheap copies/constants are re-materialized directly.
            builder::build_by_name(&value.op, Some(dest), uses, value.ty)
        } else {
            // Standard reuse: copy from the canonical variable.
            builder::build_by_name(
                "id",
                Some(dest),
                vec![BuildArg::Name(entry.variable.clone())],
                value.ty,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Literal, Type};

    fn const_instr(dest: &str, value: i64) -> Instruction {
        Instruction::Const {
            dest: dest.into(),
            ty: Type::Int,
            value: Literal::Int(value),
        }
    }

    fn add_instr(dest: &str, lhs: &str, rhs: &str) -> Instruction {
        Instruction::Binary {
            op: BinaryOp::Add,
            dest: dest.into(),
            ty: Type::Int,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    #[test]
    fn jmp_and_br_are_not_admitted() {
        let mut table = NumberingTable::new(vec![]);
        let jmp = Instruction::Jmp { label: "l".into() };
        assert!(table.add_entry(&jmp).is_none());
    }

    #[test]
    fn repeated_value_coalesces_to_one_entry() {
        let mut table = NumberingTable::new(vec![]);
        table.add_entry(&const_instr("a", 4));
        table.add_entry(&const_instr("b", 4));
        let id1 = table.add_entry(&add_instr("sum1", "a", "b")).unwrap();
        let id2 = table.add_entry(&add_instr("sum2", "a", "b")).unwrap();
        // Without commutativity, identical-order operands still coalesce.
        assert_eq!(
            table.get_entry_by_identifier(&id1).unwrap().number,
            table.get_entry_by_identifier(&id2).unwrap().number
        );
    }

    #[test]
    fn reassignment_renames_shadowed_entry() {
        let mut table = NumberingTable::new(vec![]);
        let first = table.add_entry(&const_instr("a", 1)).unwrap();
        let _second = table.add_entry(&const_instr("a", 2)).unwrap();
        // The first entry's canonical variable was renamed away from "a".
        let first_entry = table.get_entry_by_identifier(&first).unwrap();
        assert_eq!(first_entry.variable, "lvn.0");
    }

    #[test]
    fn reconstruct_numeric_identifier_emits_first_materialization() {
        let mut table = NumberingTable::new(vec![]);
        let id = table.add_entry(&const_instr("a", 4)).unwrap();
        let instr = table.reconstruct_instruction(&id).unwrap();
        assert_eq!(instr, const_instr("a", 4));
    }

    #[test]
    fn dangling_identifier_errors() {
        let mut table = NumberingTable::new(vec![]);
        let bogus = Identifier::Number(42);
        assert!(table.reconstruct_instruction(&bogus).is_err());
    }
}
