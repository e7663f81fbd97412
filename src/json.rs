//! JSON I/O for Bril programs, plus `.bril` surface-syntax ingestion via a
//! `bril2json` subprocess on `PATH`. Bril's wire format shapes each
//! instruction's fields by its `op` string rather than by a single tagged
//! enum, so parsing walks `serde_json::Value` directly instead of a derived
//! `Deserialize` impl.

use crate::error::{BrilError, Result};
use crate::ir::{BasicBlock, BinaryOp, Function, Instruction, Literal, Module, Type, UnaryOp};
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

pub fn parse_module(json_text: &str) -> Result<Module> {
    let root: Value =
        serde_json::from_str(json_text).map_err(|e| BrilError::ParseError(e.to_string()))?;
    let functions = root
        .get("functions")
        .and_then(Value::as_array)
        .ok_or_else(|| BrilError::ParseError("program is missing a `functions` array".into()))?;

    let mut module = Module::new();
    for f in functions {
        module.functions.push(parse_function(f)?);
    }
    Ok(module)
}

fn parse_function(f: &Value) -> Result<Function> {
    let name = f
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| BrilError::ParseError("function is missing a name".into()))?;
    let mut function = Function::new(name);

    if let Some(args) = f.get("args").and_then(Value::as_array) {
        for arg in args {
            let arg_name = arg
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| BrilError::ParseError("function arg is missing a name".into()))?;
            let ty = parse_type(arg.get("type").ok_or_else(|| {
                BrilError::ParseError(format!("arg `{arg_name}` is missing a type"))
            })?)?;
            function.args.push((arg_name.to_string(), ty));
        }
    }

    let instrs = f
        .get("instrs")
        .and_then(Value::as_array)
        .ok_or_else(|| BrilError::ParseError(format!("function `{name}` has no instrs")))?;
    let flat = instrs
        .iter()
        .map(parse_instr)
        .collect::<Result<Vec<_>>>()?;
    function.blocks = split_into_blocks(flat);
    Ok(function)
}

fn parse_type(v: &Value) -> Result<Type> {
    match v.as_str() {
        Some("int") => Ok(Type::Int),
        Some("bool") => Ok(Type::Bool),
        _ => Err(BrilError::ParseError(format!("unsupported type `{v}`"))),
    }
}

fn string_array(v: &Value, field: &str) -> Vec<String> {
    v.get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_instr(v: &Value) -> Result<Instruction> {
    if let Some(label) = v.get("label").and_then(Value::as_str) {
        return Ok(Instruction::Label {
            name: label.to_string(),
        });
    }

    let op = v
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| BrilError::ParseError("instruction is missing `op`".into()))?;
    let args = string_array(v, "args");
    let labels = string_array(v, "labels");
    let dest = v.get("dest").and_then(Value::as_str).map(str::to_string);
    let ty = v.get("type").map(parse_type).transpose()?;

    let missing = |what: &str| BrilError::ParseError(format!("`{op}` is missing {what}"));

    match op {
        "const" => {
            let raw = v.get("value").ok_or_else(|| missing("a value"))?;
            let ty = ty.ok_or_else(|| missing("a type"))?;
            let value = match ty {
                Type::Bool => raw
                    .as_bool()
                    .map(Literal::Bool)
                    .ok_or_else(|| BrilError::ParseError("const bool value is not a bool".into()))?,
                Type::Int => raw
                    .as_i64()
                    .map(Literal::Int)
                    .ok_or_else(|| BrilError::ParseError("const int value is not an int".into()))?,
            };
            Ok(Instruction::Const {
                dest: dest.ok_or_else(|| missing("a dest"))?,
                ty,
                value,
            })
        }
        "id" => Ok(Instruction::Id {
            dest: dest.ok_or_else(|| missing("a dest"))?,
            ty: ty.ok_or_else(|| missing("a type"))?,
            src: args.first().cloned().ok_or_else(|| missing("an arg"))?,
        }),
        "print" => Ok(Instruction::Print {
            arg: args.first().cloned().ok_or_else(|| missing("an arg"))?,
        }),
        "jmp" => Ok(Instruction::Jmp {
            label: labels.first().cloned().ok_or_else(|| missing("a label"))?,
        }),
        "br" => {
            if labels.len() < 2 {
                return Err(missing("two labels"));
            }
            Ok(Instruction::Br {
                cond: args.first().cloned().ok_or_else(|| missing("an arg"))?,
                label_t: labels[0].clone(),
                label_f: labels[1].clone(),
            })
        }
        _ if UnaryOp::from_str(op).is_some() => Ok(Instruction::Unary {
            op: UnaryOp::from_str(op).unwrap(),
            dest: dest.ok_or_else(|| missing("a dest"))?,
            ty: ty.ok_or_else(|| missing("a type"))?,
            arg: args.first().cloned().ok_or_else(|| missing("an arg"))?,
        }),
        _ if BinaryOp::from_str(op).is_some() => {
            if args.len() < 2 {
                return Err(missing("two args"));
            }
            Ok(Instruction::Binary {
                op: BinaryOp::from_str(op).unwrap(),
                dest: dest.ok_or_else(|| missing("a dest"))?,
                ty: ty.ok_or_else(|| missing("a type"))?,
                lhs: args[0].clone(),
                rhs: args[1].clone(),
            })
        }
        other => Err(BrilError::ParseError(format!("unknown operator `{other}`"))),
    }
}

/// Splits a flat instruction stream into basic blocks: a label starts a new
/// block, and a terminator (`jmp`/`br`) ends the current one.
fn split_into_blocks(instrs: Vec<Instruction>) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut current = BasicBlock::new();

    for instr in instrs {
        if instr.is_label() {
            if !current.is_empty() {
                blocks.push(current);
            }
            current = BasicBlock {
                label: Some(instr),
                body: Vec::new(),
            };
            continue;
        }

        let terminator = instr.is_terminator();
        current.body.push(instr);
        if terminator {
            blocks.push(current);
            current = BasicBlock::new();
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

pub fn dump_module(module: &Module) -> Value {
    json!({
        "functions": module.functions.iter().map(dump_function).collect::<Vec<_>>(),
    })
}

fn dump_function(f: &Function) -> Value {
    let args: Vec<Value> = f
        .args
        .iter()
        .map(|(name, ty)| json!({"name": name, "type": dump_type(*ty)}))
        .collect();

    let mut instrs = Vec::new();
    for block in &f.blocks {
        if let Some(label) = &block.label {
            instrs.push(dump_instr(label));
        }
        for instr in &block.body {
            instrs.push(dump_instr(instr));
        }
    }

    json!({"name": f.name, "args": args, "instrs": instrs})
}

fn dump_type(ty: Type) -> &'static str {
    match ty {
        Type::Int => "int",
        Type::Bool => "bool",
    }
}

fn dump_instr(instr: &Instruction) -> Value {
    match instr {
        Instruction::Label { name } => json!({"label": name}),
        Instruction::Const { dest, ty, value } => json!({
            "op": "const", "dest": dest, "type": dump_type(*ty), "value": dump_literal(*value),
        }),
        Instruction::Id { dest, ty, src } => json!({
            "op": "id", "dest": dest, "type": dump_type(*ty), "args": [src],
        }),
        Instruction::Print { arg } => json!({"op": "print", "args": [arg]}),
        Instruction::Jmp { label } => json!({"op": "jmp", "labels": [label]}),
        Instruction::Br {
            cond,
            label_t,
            label_f,
        } => json!({"op": "br", "args": [cond], "labels": [label_t, label_f]}),
        Instruction::Binary {
            op,
            dest,
            ty,
            lhs,
            rhs,
        } => json!({
            "op": op.as_str(), "dest": dest, "type": dump_type(*ty), "args": [lhs, rhs],
        }),
        Instruction::Unary { op, dest, ty, arg } => json!({
            "op": op.as_str(), "dest": dest, "type": dump_type(*ty), "args": [arg],
        }),
    }
}

fn dump_literal(lit: Literal) -> Value {
    match lit {
        Literal::Int(n) => json!(n),
        Literal::Bool(b) => json!(b),
    }
}

/// Reads a program from disk, shelling out to `bril2json` for `.bril`
/// surface syntax and parsing JSON directly otherwise.
pub fn read_program(path: &Path) -> Result<Module> {
    if !path.exists() {
        return Err(BrilError::InputNotFound(path.to_path_buf()));
    }

    let is_surface_syntax = path.extension().and_then(|e| e.to_str()) == Some("bril");
    let json_text = if is_surface_syntax {
        run_bril2json(path)?
    } else {
        std::fs::read_to_string(path).map_err(|e| BrilError::ParseError(e.to_string()))?
    };
    parse_module(&json_text)
}

fn run_bril2json(path: &Path) -> Result<String> {
    let source =
        std::fs::read_to_string(path).map_err(|e| BrilError::ParseError(e.to_string()))?;

    let mut child = Command::new("bril2json")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| {
            BrilError::ParseError(format!("failed to launch `bril2json` on PATH: {e}"))
        })?;

    child
        .stdin
        .take()
        .expect("child stdin was requested as piped")
        .write_all(source.as_bytes())
        .map_err(|e| BrilError::ParseError(format!("failed to write to bril2json: {e}")))?;

    let output = child
        .wait_with_output()
        .map_err(|e| BrilError::ParseError(format!("bril2json did not exit cleanly: {e}")))?;
    if !output.status.success() {
        return Err(BrilError::ParseError(
            "bril2json exited with a non-zero status".into(),
        ));
    }
    String::from_utf8(output.stdout)
        .map_err(|e| BrilError::ParseError(format!("bril2json produced invalid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "functions": [{
            "name": "main",
            "args": [],
            "instrs": [
                {"op": "const", "dest": "a", "type": "int", "value": 4},
                {"op": "const", "dest": "b", "type": "int", "value": 2},
                {"op": "add", "dest": "sum", "type": "int", "args": ["a", "b"]},
                {"op": "print", "args": ["sum"]}
            ]
        }]
    }"#;

    #[test]
    fn parses_a_single_block_function() {
        let module = parse_module(SAMPLE).unwrap();
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[0].blocks.len(), 1);
        assert_eq!(module.functions[0].blocks[0].body.len(), 4);
    }

    #[test]
    fn labels_and_terminators_split_blocks() {
        let json_text = r#"{
            "functions": [{
                "name": "main",
                "args": [],
                "instrs": [
                    {"op": "jmp", "labels": ["next"]},
                    {"label": "next"},
                    {"op": "print", "args": ["x"]}
                ]
            }]
        }"#;
        let module = parse_module(json_text).unwrap();
        let blocks = &module.functions[0].blocks;
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].label.is_none());
        assert!(blocks[1].label.is_some());
    }

    #[test]
    fn round_trips_through_dump_and_parse() {
        let module = parse_module(SAMPLE).unwrap();
        let dumped = dump_module(&module);
        let reparsed = parse_module(&dumped.to_string()).unwrap();
        assert_eq!(
            reparsed.functions[0].blocks[0].body.len(),
            module.functions[0].blocks[0].body.len()
        );
    }

    #[test]
    fn missing_file_is_reported_distinctly() {
        let result = read_program(Path::new("/nonexistent/path/does/not/exist.json"));
        assert!(matches!(result, Err(BrilError::InputNotFound(_))));
    }

    #[test]
    fn fixtures_in_test_directory_all_parse_and_round_trip() {
        let entries = match std::fs::read_dir("test") {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = std::fs::read_to_string(&path).unwrap();
            let module = parse_module(&text)
                .unwrap_or_else(|e| panic!("{} failed to parse: {e}", path.display()));
            let dumped = dump_module(&module).to_string();
            parse_module(&dumped)
                .unwrap_or_else(|e| panic!("{} failed to round-trip: {e}", path.display()));
        }
    }
}
