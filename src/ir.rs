//! The in-memory program model: instructions, basic blocks, functions, and
//! modules (`spec.md` §3).
//!
//! `Module` owns an ordered sequence of `Function`s. `Function` owns an
//! ordered sequence of `BasicBlock`s plus its `(name, type)` argument list.
//! `BasicBlock` owns at most one leading label and an ordered sequence of
//! body instructions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primitive Bril types. Core Bril only has `int` and `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Bool,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
        }
    }
}

/// A literal value, as carried by `const` instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Binary arithmetic/comparison/logical operators.
///
/// Note: the source this spec was distilled from treats `sub` and `div` as
/// commutable during LVN canonicalization, which is mathematically wrong.
/// That behavior is preserved deliberately (`spec.md` §9) — operand order
/// for these two operators is not semantically meaningful downstream of
/// this crate's LVN pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Eq => "eq",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    pub fn from_str(op: &str) -> Option<Self> {
        Some(match op {
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "div" => BinaryOp::Div,
            "eq" => BinaryOp::Eq,
            "lt" => BinaryOp::Lt,
            "le" => BinaryOp::Le,
            "gt" => BinaryOp::Gt,
            "ge" => BinaryOp::Ge,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "xor" => BinaryOp::Xor,
            _ => return None,
        })
    }

    /// Commutative for LVN canonicalization purposes. Per `spec.md` §4.3,
    /// `sub` and `div` are included here even though that is not
    /// mathematically sound — it is a deliberate design choice of this
    /// system that downstream consumers must tolerate.
    pub fn is_commutative_for_canonicalization(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Mul
                | BinaryOp::Sub
                | BinaryOp::Div
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
        }
    }

    pub fn from_str(op: &str) -> Option<Self> {
        match op {
            "not" => Some(UnaryOp::Not),
            _ => None,
        }
    }
}

/// One Bril instruction. `Label` is block-structural and is carried
/// separately by `BasicBlock`, but still appears here as a variant so that
/// a flat `instrs` JSON array can be parsed uniformly before blocks are
/// formed.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Const {
        dest: String,
        ty: Type,
        value: Literal,
    },
    Id {
        dest: String,
        ty: Type,
        src: String,
    },
    Print {
        arg: String,
    },
    Label {
        name: String,
    },
    Jmp {
        label: String,
    },
    Br {
        cond: String,
        label_t: String,
        label_f: String,
    },
    Binary {
        op: BinaryOp,
        dest: String,
        ty: Type,
        lhs: String,
        rhs: String,
    },
    Unary {
        op: UnaryOp,
        dest: String,
        ty: Type,
        arg: String,
    },
}

impl Instruction {
    /// The operator string this instruction serializes as.
    pub fn operator(&self) -> &'static str {
        match self {
            Instruction::Const { .. } => "const",
            Instruction::Id { .. } => "id",
            Instruction::Print { .. } => "print",
            Instruction::Label { .. } => "label",
            Instruction::Jmp { .. } => "jmp",
            Instruction::Br { .. } => "br",
            Instruction::Binary { op, .. } => op.as_str(),
            Instruction::Unary { op, .. } => op.as_str(),
        }
    }

    pub fn destination(&self) -> Option<&str> {
        match self {
            Instruction::Const { dest, .. }
            | Instruction::Id { dest, .. }
            | Instruction::Binary { dest, .. }
            | Instruction::Unary { dest, .. } => Some(dest),
            Instruction::Print { .. }
            | Instruction::Label { .. }
            | Instruction::Jmp { .. }
            | Instruction::Br { .. } => None,
        }
    }

    pub fn dest_type(&self) -> Option<Type> {
        match self {
            Instruction::Const { ty, .. }
            | Instruction::Id { ty, .. }
            | Instruction::Binary { ty, .. }
            | Instruction::Unary { ty, .. } => Some(*ty),
            _ => None,
        }
    }

    /// Operand *names* read by this instruction, in order. `Const` reads no
    /// names (its operand is a literal, carried separately); labels used by
    /// `Jmp`/`Br` are not variable names either and are excluded.
    pub fn arguments(&self) -> Vec<&str> {
        match self {
            Instruction::Const { .. } => vec![],
            Instruction::Id { src, .. } => vec![src.as_str()],
            Instruction::Print { arg } => vec![arg.as_str()],
            Instruction::Label { .. } | Instruction::Jmp { .. } => vec![],
            Instruction::Br { cond, .. } => vec![cond.as_str()],
            Instruction::Binary { lhs, rhs, .. } => {
                vec![lhs.as_str(), rhs.as_str()]
            }
            Instruction::Unary { arg, .. } => vec![arg.as_str()],
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Instruction::Label { .. })
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Jmp { .. } | Instruction::Br { .. })
    }
}

/// A maximal straight-line instruction sequence: at most one leading label,
/// then body instructions ending (optionally) in a terminator.
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub label: Option<Instruction>,
    pub body: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.body.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub args: Vec<(String, Type)>,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Function {
            name: name.into(),
            args: Vec::new(),
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminators_are_jmp_and_br() {
        let jmp = Instruction::Jmp {
            label: "l".into(),
        };
        let br = Instruction::Br {
            cond: "c".into(),
            label_t: "t".into(),
            label_f: "f".into(),
        };
        let add = Instruction::Binary {
            op: BinaryOp::Add,
            dest: "d".into(),
            ty: Type::Int,
            lhs: "a".into(),
            rhs: "b".into(),
        };
        assert!(jmp.is_terminator());
        assert!(br.is_terminator());
        assert!(!add.is_terminator());
    }

    #[test]
    fn const_has_no_name_arguments() {
        let c = Instruction::Const {
            dest: "a".into(),
            ty: Type::Int,
            value: Literal::Int(4),
        };
        assert!(c.arguments().is_empty());
        assert_eq!(c.destination(), Some("a"));
    }

    #[test]
    fn sub_and_div_are_commutative_for_canonicalization() {
        assert!(BinaryOp::Sub.is_commutative_for_canonicalization());
        assert!(BinaryOp::Div.is_commutative_for_canonicalization());
        assert!(!BinaryOp::Eq.is_commutative_for_canonicalization());
    }
}
