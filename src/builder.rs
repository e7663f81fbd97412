//! Instruction builder (`spec.md` §4.1).
//!
//! Constructs IR nodes by operator name, used by reconstruction in the
//! numbering table. Labels are block-structural, not constructed here;
//! asking the builder for one is a programmer error.

use crate::error::{BrilError, Result};
use crate::ir::{BinaryOp, Instruction, Literal, Type, UnaryOp};

/// One operand passed to the builder: either a variable name or (for
/// `const`'s first operand) a literal value.
#[derive(Debug, Clone)]
pub enum BuildArg {
    Name(String),
    Literal(Literal),
}

impl BuildArg {
    fn into_name(self) -> String {
        match self {
            BuildArg::Name(name) => name,
            BuildArg::Literal(lit) => panic!(
                "expected a name argument, found literal {lit:?} (programmer error)"
            ),
        }
    }

    fn into_literal(self) -> Literal {
        match self {
            BuildArg::Literal(lit) => lit,
            BuildArg::Name(name) => {
                panic!("expected a literal argument, found name {name:?} (programmer error)")
            }
        }
    }
}

impl From<&str> for BuildArg {
    fn from(name: &str) -> Self {
        BuildArg::Name(name.to_string())
    }
}

impl From<String> for BuildArg {
    fn from(name: String) -> Self {
        BuildArg::Name(name)
    }
}

impl From<Literal> for BuildArg {
    fn from(value: Literal) -> Self {
        BuildArg::Literal(value)
    }
}

/// Builds an [`Instruction`] from an operator name, a destination, an
/// ordered list of uses, and a destination type.
///
/// Branch/jump take uses positionally: `Jmp(uses[0])`,
/// `Br(uses[0], uses[1], uses[2])`. Unary and binary arithmetic follow
/// their operand arities. `const`'s first "use" is a literal, not a name.
pub fn build_by_name(
    operator: &str,
    dest: Option<String>,
    mut uses: Vec<BuildArg>,
    dest_type: Option<Type>,
) -> Result<Instruction> {
    if operator == "label" {
        return Err(BrilError::IRInvariantViolation(
            "cannot build a Label instruction via the instruction builder".into(),
        ));
    }

    match operator {
        "jmp" => {
            let label = uses.remove(0).into_name();
            Ok(Instruction::Jmp { label })
        }
        "br" => {
            let cond = uses.remove(0).into_name();
            let label_t = uses.remove(0).into_name();
            let label_f = uses.remove(0).into_name();
            Ok(Instruction::Br {
                cond,
                label_t,
                label_f,
            })
        }
        "const" => {
            let value = uses.remove(0).into_literal();
            Ok(Instruction::Const {
                dest: dest.expect("const requires a destination"),
                ty: dest_type.expect("const requires a destination type"),
                value,
            })
        }
        "id" => {
            let src = uses.remove(0).into_name();
            Ok(Instruction::Id {
                dest: dest.expect("id requires a destination"),
                ty: dest_type.expect("id requires a destination type"),
                src,
            })
        }
        "print" => {
            let arg = uses.remove(0).into_name();
            Ok(Instruction::Print { arg })
        }
        _ if UnaryOp::from_str(operator).is_some() => {
            let op = UnaryOp::from_str(operator).unwrap();
            let arg = uses.remove(0).into_name();
            Ok(Instruction::Unary {
                op,
                dest: dest.expect("unary op requires a destination"),
                ty: dest_type.expect("unary op requires a destination type"),
                arg,
            })
        }
        _ if BinaryOp::from_str(operator).is_some() => {
            let op = BinaryOp::from_str(operator).unwrap();
            let lhs = uses.remove(0).into_name();
            let rhs = uses.remove(0).into_name();
            Ok(Instruction::Binary {
                op,
                dest: dest.expect("binary op requires a destination"),
                ty: dest_type.expect("binary op requires a destination type"),
                lhs,
                rhs,
            })
        }
        other => Err(BrilError::IRInvariantViolation(format!(
            "instruction builder cannot handle operator `{other}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_const() {
        let instr = build_by_name(
            "const",
            Some("a".into()),
            vec![Literal::Int(4).into()],
            Some(Type::Int),
        )
        .unwrap();
        assert_eq!(
            instr,
            Instruction::Const {
                dest: "a".into(),
                ty: Type::Int,
                value: Literal::Int(4)
            }
        );
    }

    #[test]
    fn builds_binary_add() {
        let instr = build_by_name(
            "add",
            Some("c".into()),
            vec!["a".into(), "b".into()],
            Some(Type::Int),
        )
        .unwrap();
        assert_eq!(
            instr,
            Instruction::Binary {
                op: BinaryOp::Add,
                dest: "c".into(),
                ty: Type::Int,
                lhs: "a".into(),
                rhs: "b".into(),
            }
        );
    }

    #[test]
    fn refuses_to_build_label() {
        let result = build_by_name("label", None, vec![], None);
        assert!(matches!(result, Err(BrilError::IRInvariantViolation(_))));
    }

    #[test]
    fn builds_jmp_and_br_positionally() {
        let jmp = build_by_name("jmp", None, vec!["l".into()], None).unwrap();
        assert_eq!(
            jmp,
            Instruction::Jmp {
                label: "l".into()
            }
        );

        let br = build_by_name(
            "br",
            None,
            vec!["c".into(), "t".into(), "f".into()],
            None,
        )
        .unwrap();
        assert_eq!(
            br,
            Instruction::Br {
                cond: "c".into(),
                label_t: "t".into(),
                label_f: "f".into(),
            }
        );
    }
}
