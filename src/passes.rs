//! Passes over a whole [`Module`] (`spec.md` §4.5, §4.6): the LVN pass, the
//! TDCE pass, and the pass manager that composes them. A composite pass is
//! itself a [`Pass`], so `PassManager` can be registered as one entry inside
//! another manager.

use crate::agent;
use crate::error::Result;
use crate::extensions::{Commutativity, ConstantPropagation, IdentityPropagation, IdentityToConstant, NumberingExtension};
use crate::ir::{Function, Instruction, Module};
use std::collections::{HashMap, HashSet};

pub trait Pass {
    fn run(&mut self, module: &mut Module) -> Result<()>;
}

type ExtensionFactory = fn() -> Vec<Box<dyn NumberingExtension>>;

fn plain_extensions() -> Vec<Box<dyn NumberingExtension>> {
    vec![
        Box::new(Commutativity),
        Box::new(IdentityPropagation::default()),
    ]
}

fn constant_propagation_extensions() -> Vec<Box<dyn NumberingExtension>> {
    vec![
        Box::new(Commutativity),
        Box::new(ConstantPropagation),
        Box::new(IdentityPropagation::default()),
        Box::new(IdentityToConstant),
    ]
}

/// Local value numbering, applied block by block. Does not itself run
/// TDCE; see [`PassManager`] for the composite most callers want.
pub struct LvnPass {
    extensions: ExtensionFactory,
}

impl LvnPass {
    pub fn plain() -> Self {
        LvnPass {
            extensions: plain_extensions,
        }
    }

    pub fn with_constant_propagation() -> Self {
        LvnPass {
            extensions: constant_propagation_extensions,
        }
    }
}

impl Pass for LvnPass {
    fn run(&mut self, module: &mut Module) -> Result<()> {
        for function in &mut module.functions {
            for block in &mut function.blocks {
                *block = agent::run_block(block, (self.extensions)())?;
            }
        }
        Ok(())
    }
}

/// Trivial dead code elimination: a fixed point of two criteria applied per
/// function — global unused-definition elimination, and per-block dead
/// store elimination — each round tombstoning instructions and the loop
/// ending in an implicit sweep (removed instructions are dropped from the
/// block's `Vec` directly rather than carried as a separate marker).
#[derive(Default)]
pub struct TdcePass;

impl TdcePass {
    fn eliminate_unused_definitions(function: &mut Function) -> bool {
        let mut used: HashSet<String> = HashSet::new();
        for block in &function.blocks {
            for instr in &block.body {
                for arg in instr.arguments() {
                    used.insert(arg.to_string());
                }
            }
        }

        let mut changed = false;
        for block in &mut function.blocks {
            let before = block.body.len();
            block.body.retain(|instr| match instr.destination() {
                Some(dest) => used.contains(dest),
                None => true,
            });
            changed |= block.body.len() != before;
        }
        changed
    }

    fn eliminate_dead_stores(function: &mut Function) -> bool {
        let mut changed = false;
        for block in &mut function.blocks {
            let mut last_def: HashMap<String, usize> = HashMap::new();
            let mut dead: HashSet<usize> = HashSet::new();

            for (idx, instr) in block.body.iter().enumerate() {
                for arg in instr.arguments() {
                    last_def.remove(arg);
                }
                if let Some(dest) = instr.destination() {
                    if let Some(prev_idx) = last_def.insert(dest.to_string(), idx) {
                        dead.insert(prev_idx);
                    }
                }
            }

            if dead.is_empty() {
                continue;
            }
            changed = true;
            let mut idx = 0;
            block.body.retain(|_: &Instruction| {
                let keep = !dead.contains(&idx);
                idx += 1;
                keep
            });
        }
        changed
    }
}

impl Pass for TdcePass {
    fn run(&mut self, module: &mut Module) -> Result<()> {
        for function in &mut module.functions {
            loop {
                let global = Self::eliminate_unused_definitions(function);
                let local = Self::eliminate_dead_stores(function);
                if !global && !local {
                    break;
                }
            }
        }
        Ok(())
    }
}

/// An ordered composite of passes, itself a [`Pass`] so it can be nested.
/// The LVN composite most callers want is `lvn` then `tdce`, in order.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        PassManager { passes: Vec::new() }
    }

    pub fn add_pass(&mut self, pass: Box<dyn Pass>) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn lvn() -> Self {
        let mut manager = PassManager::new();
        manager
            .add_pass(Box::new(LvnPass::plain()))
            .add_pass(Box::new(TdcePass));
        manager
    }

    pub fn lvn_const() -> Self {
        let mut manager = PassManager::new();
        manager
            .add_pass(Box::new(LvnPass::with_constant_propagation()))
            .add_pass(Box::new(TdcePass));
        manager
    }

    pub fn lvn_only() -> Self {
        let mut manager = PassManager::new();
        manager.add_pass(Box::new(LvnPass::plain()));
        manager
    }

    pub fn tdce() -> Self {
        let mut manager = PassManager::new();
        manager.add_pass(Box::new(TdcePass));
        manager
    }
}

impl Pass for PassManager {
    fn run(&mut self, module: &mut Module) -> Result<()> {
        for pass in &mut self.passes {
            pass.run(module)?;
        }
        Ok(())
    }
}
