use std::{path::PathBuf, process::Command};

use pretty_assertions::assert_eq;

use aigprove::{
    Aig,
    miter::build_miter,
    prove::{ProofOutcome, ProveParams, check_equivalence},
};

fn circuit(name: &str) -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "assets", "circuits", name]
        .iter()
        .collect()
}

fn load(name: &str) -> Aig {
    Aig::from_file(circuit(name)).unwrap()
}

#[test]
fn ascii_and_binary_half_adders_are_equivalent() {
    let mut params = ProveParams::default();
    let (outcome, _) = check_equivalence(
        &load("half-adder.aag"),
        &load("half-adder.aig"),
        &mut params,
    )
    .unwrap();
    assert_eq!(outcome, ProofOutcome::Unsat);
}

#[test]
fn restructured_half_adder_is_equivalent() {
    let mut params = ProveParams::default();
    let (outcome, _) = check_equivalence(
        &load("half-adder.aag"),
        &load("half-adder-alt.aag"),
        &mut params,
    )
    .unwrap();
    assert_eq!(outcome, ProofOutcome::Unsat);
}

#[test]
fn buggy_half_adder_is_caught() {
    let a = load("half-adder.aag");
    let b = load("half-adder-bug.aag");
    let mut params = ProveParams::default();
    let (outcome, _) = check_equivalence(&a, &b, &mut params).unwrap();
    let ProofOutcome::Sat(model) = outcome else {
        panic!("expected a counterexample, got {}", outcome);
    };
    // The carry is replaced by an or: they differ iff exactly one input is set
    assert!(model.values()[0] ^ model.values()[1]);
    assert_eq!(
        build_miter(&a, &b).unwrap().evaluate(model.values()).unwrap(),
        vec![true]
    );
}

#[test]
fn cli_reports_verdicts() {
    let bin = env!("CARGO_BIN_EXE_aigprove");

    let output = Command::new(bin)
        .arg("cec")
        .arg(circuit("half-adder.aag"))
        .arg(circuit("half-adder-alt.aag"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Networks are equivalent."), "{}", stdout);

    let output = Command::new(bin)
        .arg("cec")
        .arg(circuit("half-adder.aag"))
        .arg(circuit("half-adder-bug.aag"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("NOT equivalent"), "{}", stdout);
    assert!(stdout.contains("counterexample: "), "{}", stdout);
}

#[test]
fn cli_writes_the_final_network() {
    let bin = env!("CARGO_BIN_EXE_aigprove");
    let out = std::env::temp_dir().join(format!("aigprove-cli-{}.aag", std::process::id()));

    let status = Command::new(bin)
        .args(["cec", "--rewriting", "false", "--write"])
        .arg(&out)
        .arg(circuit("half-adder.aag"))
        .arg(circuit("half-adder.aig"))
        .status()
        .unwrap();
    assert!(status.success());

    // Structurally identical circuits give a constant miter
    let written = Aig::from_file(&out).unwrap();
    assert_eq!(written.output_count(), 1);
    assert_eq!(written.output_constant(0), Some(false));
    std::fs::remove_file(&out).unwrap();
}

#[test]
fn cli_rejects_missing_files() {
    let output = Command::new(env!("CARGO_BIN_EXE_aigprove"))
        .arg("prove")
        .arg(circuit("does-not-exist.aag"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
