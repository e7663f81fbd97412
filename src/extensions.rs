//! Extensions (`spec.md` §4.3): pluggable transforms on `Value`s,
//! classified by phase. The pass wiring applies all extensions of a phase
//! in registration order; no extension may mutate the table, only its own
//! per-run caches (which must be cleared in `reset`).

use crate::ir::Literal;
use crate::primitives::{Identifier, Operand, Primitive, Value};
use crate::table::NumberingTable;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreBuild,
    Reconstruction,
    PostBuild,
}

pub trait NumberingExtension {
    fn phase(&self) -> Phase;
    fn update(&mut self, value: Value, table: &NumberingTable) -> Value;
    fn reset(&mut self);
}

/* -------------------------------------------------------------------------- */
/*                               Commutativity                                */
/* -------------------------------------------------------------------------- */

/// Reorders the two operands of a commutative binary op so the "smaller"
/// one (per `Identifier` ordering) comes first, letting `op x y` and
/// `op y x` hash-cons to the same entry.
///
/// `sub` and `div` are included here even though that is not
/// mathematically sound commutativity — it is a deliberate, preserved
/// design choice of the source this was distilled from (`spec.md` §9).
#[derive(Default)]
pub struct Commutativity;

impl Commutativity {
    const COMMUTABLE: [&'static str; 7] =
        ["add", "mul", "sub", "div", "and", "or", "xor"];
}

impl NumberingExtension for Commutativity {
    fn phase(&self) -> Phase {
        Phase::PreBuild
    }

    fn update(&mut self, mut value: Value, _table: &NumberingTable) -> Value {
        if !Self::COMMUTABLE.contains(&value.op.as_str()) || value.operands.len() != 2 {
            return value;
        }
        if let (Operand::Identifier(a), Operand::Identifier(b)) =
            (&value.operands[0], &value.operands[1])
        {
            if b < a {
                value.operands.swap(0, 1);
            }
        }
        value
    }

    fn reset(&mut self) {}
}

/* -------------------------------------------------------------------------- */
/*                           Identity propagation                            */
/* -------------------------------------------------------------------------- */

/// Walks through chains of `id` entries during reconstruction and replaces
/// each operand with its ultimate non-`id` source identifier. Caches
/// resolved sources per block; the cache must be cleared between blocks.
#[derive(Default)]
pub struct IdentityPropagation {
    sources: HashMap<Identifier, Identifier>,
}

impl IdentityPropagation {
    fn find_source(&mut self, id: &Identifier, table: &NumberingTable) -> Identifier {
        if let Some(found) = self.sources.get(id) {
            return found.clone();
        }

        let Some(n) = id.as_number() else {
            self.sources.insert(id.clone(), id.clone());
            return id.clone();
        };

        let referred = table
            .get_entry_by_identifier(&Identifier::Number(n))
            .expect("numeric identifier must resolve to a table entry");
        if !referred.value.is_id() {
            self.sources.insert(id.clone(), id.clone());
            return id.clone();
        }

        let next = referred.value.operands[0]
            .identifier()
            .expect("`id` value's operand is always an identifier")
            .clone();
        let source = self.find_source(&next, table);
        self.sources.insert(id.clone(), source.clone());
        source
    }
}

impl NumberingExtension for IdentityPropagation {
    fn phase(&self) -> Phase {
        Phase::Reconstruction
    }

    fn update(&mut self, mut value: Value, table: &NumberingTable) -> Value {
        if value.is_const() {
            return value;
        }
        let new_operands = value
            .operands
            .into_iter()
            .map(|operand| match operand {
                Operand::Identifier(id) => {
                    Operand::Identifier(self.find_source(&id, table))
                }
                primitive => primitive,
            })
            .collect();
        value.operands = new_operands;
        value
    }

    fn reset(&mut self) {
        self.sources.clear();
    }
}

/* -------------------------------------------------------------------------- */
/*                          Constant propagation                             */
/* -------------------------------------------------------------------------- */

const SIMULATED_OPS: [&str; 13] = [
    "add", "sub", "mul", "div", "and", "or", "xor", "not", "lt", "gt", "eq", "le", "ge",
];

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// Evaluates a constant-foldable operator over already-resolved literal
/// arguments, or `None` if the operator/arity/types don't support folding
/// (including `div` by zero, which this crate chooses to leave unfolded
/// rather than evaluate — `spec.md` §9 leaves this case unspecified).
fn simulate(op: &str, args: &[Literal]) -> Option<Literal> {
    use Literal::{Bool, Int};
    match (op, args) {
        ("not", [Bool(a)]) => Some(Bool(!a)),
        ("add", [Int(a), Int(b)]) => Some(Int(a + b)),
        ("sub", [Int(a), Int(b)]) => Some(Int(a - b)),
        ("mul", [Int(a), Int(b)]) => Some(Int(a * b)),
        ("div", [Int(a), Int(b)]) => {
            if *b == 0 {
                None
            } else {
                Some(Int(floor_div(*a, *b)))
            }
        }
        ("and", [Bool(a), Bool(b)]) => Some(Bool(*a && *b)),
        ("or", [Bool(a), Bool(b)]) => Some(Bool(*a || *b)),
        ("xor", [Bool(a), Bool(b)]) => Some(Bool(*a ^ *b)),
        ("lt", [Int(a), Int(b)]) => Some(Bool(a < b)),
        ("gt", [Int(a), Int(b)]) => Some(Bool(a > b)),
        ("le", [Int(a), Int(b)]) => Some(Bool(a <= b)),
        ("ge", [Int(a), Int(b)]) => Some(Bool(a >= b)),
        ("eq", [a, b]) => Some(Bool(a == b)),
        _ => None,
    }
}

enum Resolved {
    Known(Literal),
    Unknown,
}

/// Resolves operands against `const` entries and, when all operands are
/// literals, folds the expression. Also applies the source's short-circuit
/// heuristics when only one operand is known: `or` with a `true` literal,
/// `and` with a `false` literal, and `eq`/`le`/`ge` over syntactically
/// identical operands (regardless of whether either side is a constant).
#[derive(Default)]
pub struct ConstantPropagation;

impl NumberingExtension for ConstantPropagation {
    fn phase(&self) -> Phase {
        Phase::PreBuild
    }

    fn update(&mut self, value: Value, table: &NumberingTable) -> Value {
        if !SIMULATED_OPS.contains(&value.op.as_str()) {
            return value;
        }

        if matches!(value.op.as_str(), "eq" | "le" | "ge")
            && value.operands.len() == 2
            && value.operands[0] == value.operands[1]
        {
            return const_bool(true, value.ty);
        }

        let resolved: Vec<Resolved> = value
            .operands
            .iter()
            .map(|operand| resolve_operand(operand, table))
            .collect();

        if value.op == "or"
            && resolved
                .iter()
                .any(|r| matches!(r, Resolved::Known(Literal::Bool(true))))
        {
            return const_bool(true, value.ty);
        }
        if value.op == "and"
            && resolved
                .iter()
                .any(|r| matches!(r, Resolved::Known(Literal::Bool(false))))
        {
            return const_bool(false, value.ty);
        }

        if resolved.iter().all(|r| matches!(r, Resolved::Known(_))) {
            let args: Vec<Literal> = resolved
                .into_iter()
                .map(|r| match r {
                    Resolved::Known(lit) => lit,
                    Resolved::Unknown => unreachable!(),
                })
                .collect();
            if let Some(result) = simulate(&value.op, &args) {
                return Value::new(
                    "const",
                    vec![Operand::Primitive(Primitive(result))],
                    value.ty,
                );
            }
        }

        value
    }

    fn reset(&mut self) {}
}

fn const_bool(b: bool, ty: Option<crate::ir::Type>) -> Value {
    Value::new(
        "const",
        vec![Operand::Primitive(Primitive(Literal::Bool(b)))],
        ty,
    )
}

fn resolve_operand(operand: &Operand, table: &NumberingTable) -> Resolved {
    match operand {
        Operand::Primitive(Primitive(lit)) => Resolved::Known(*lit),
        Operand::Identifier(id) => match table.get_entry_by_identifier(id) {
            Some(entry) if entry.value.is_const() => match &entry.value.operands[0] {
                Operand::Primitive(Primitive(lit)) => Resolved::Known(*lit),
                Operand::Identifier(_) => Resolved::Unknown,
            },
            _ => Resolved::Unknown,
        },
    }
}

/* -------------------------------------------------------------------------- */
/*                         Identity-to-constant                              */
/* -------------------------------------------------------------------------- */

/// If the entry's value is `id` and the chain terminates at a `const`,
/// emit that constant directly instead of an `id` copy.
#[derive(Default)]
pub struct IdentityToConstant;

impl NumberingExtension for IdentityToConstant {
    fn phase(&self) -> Phase {
        Phase::Reconstruction
    }

    fn update(&mut self, value: Value, table: &NumberingTable) -> Value {
        if !value.is_id() {
            return value;
        }

        let mut current = value.clone();
        loop {
            if !current.is_id() {
                return value;
            }
            let Some(id) = current.operands[0].identifier() else {
                return value;
            };
            let Some(entry) = table.get_entry_by_identifier(id) else {
                return value;
            };
            current = entry.value.clone();
            if current.is_const() {
                return current;
            }
        }
    }

    fn reset(&mut self) {}
}
