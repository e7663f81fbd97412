//! End-to-end pipeline tests: parse a fixture, run a pass composite over
//! it, and check the resulting instruction stream.

use bril_lvn::json;
use bril_lvn::passes::{Pass, PassManager};
use pretty_assertions::assert_eq;
use std::path::Path;

fn run(fixture: &str, mut manager: PassManager) -> Vec<String> {
    let path = Path::new("test").join(fixture);
    let mut module = json::read_program(&path).unwrap();
    manager.run(&mut module).unwrap();
    module.functions[0]
        .blocks
        .iter()
        .flat_map(|b| b.body.iter())
        .map(|instr| format!("{:?}", instr))
        .collect()
}

#[test]
fn commutative_operands_merge_into_one_entry() {
    let body = run("commutative_merge.json", PassManager::lvn_only());
    let adds: Vec<_> = body.iter().filter(|s| s.contains("Binary")).collect();
    assert_eq!(adds.len(), 1, "both additions should hash-cons together: {body:?}");
}

#[test]
fn reassignment_does_not_corrupt_the_earlier_binding() {
    let body = run("reassignment_rename.json", PassManager::lvn_only());
    // y must still read the original x (value 1), not the reassigned one.
    assert!(body.iter().any(|s| s.contains("dest: \"z\"")));
    assert_eq!(body.len(), 5);
}

#[test]
fn copy_chains_collapse_under_identity_propagation() {
    let body = run("copy_propagation.json", PassManager::lvn());
    // After LVN+TDCE the redundant id copies should be gone or coalesced;
    // only the final print and its producer need to survive.
    assert!(body.iter().any(|s| s.contains("Print")));
}

#[test]
fn constant_expressions_fold_under_lvn_const() {
    let body = run("constant_folding.json", PassManager::lvn_const());
    let folded = body
        .iter()
        .any(|s| s.contains("Const") && s.contains("Int(42)"));
    assert!(folded, "6 * 7 should fold to 42: {body:?}");
}

#[test]
fn or_with_a_true_literal_short_circuits() {
    let body = run("short_circuit.json", PassManager::lvn_const());
    let folded = body
        .iter()
        .any(|s| s.contains("Const") && s.contains("Bool(true)"));
    assert!(folded, "or with a true literal should fold to true: {body:?}");
}

#[test]
fn dead_store_chain_collapses_to_the_final_write() {
    let body = run("dead_store_chain.json", PassManager::tdce());
    assert_eq!(body.len(), 2, "only the last const and the print should survive: {body:?}");
}

#[test]
fn global_unused_definition_criterion_spans_block_boundaries() {
    let body = run("cross_block_liveness.json", PassManager::tdce());
    // "dead" is defined once and never read anywhere in the function, so
    // the global criterion (which scans argument names across every block,
    // not just the defining one) must remove it even though it is never
    // shadowed within its own block.
    assert!(
        !body.iter().any(|s| s.contains("dest: \"dead\"")),
        "unused cross-block definition should be eliminated: {body:?}"
    );
    // "live" is defined in the first block but only read in the successor
    // block after the jmp/label boundary; the global criterion must not
    // mistake it for dead just because it has no local consumer.
    assert!(
        body.iter().any(|s| s.contains("dest: \"live\"")),
        "definition consumed only in a later block must survive: {body:?}"
    );
}
