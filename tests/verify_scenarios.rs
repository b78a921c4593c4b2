//! End-to-end verification scenarios
//!
//! Each test runs a complete source file through the session: lexer, parser,
//! resolver, backward transformer and the SDP-backed entailment checks.

use nqpv::session::{CommandOutcome, Session};
use nqpv::Verdict;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

fn work_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("nqpv-scenarios").join(tag);
    std::fs::create_dir_all(&dir).expect("can create scenario directory");
    dir
}

fn run_in(dir: PathBuf, source: &str) -> Vec<CommandOutcome> {
    let mut session = Session::new(dir);
    session.run(source).expect("source parses")
}

fn run(source: &str) -> Vec<CommandOutcome> {
    run_in(work_dir("plain"), source)
}

fn verdict_of(outcomes: &[CommandOutcome], name: &str) -> Verdict {
    for outcome in outcomes {
        if let CommandOutcome::Verified {
            name: n, verdict, ..
        } = outcome
        {
            if n == name {
                return *verdict;
            }
        }
    }
    panic!("no verdict recorded for proof '{name}'");
}

#[test]
fn x_flips_zero_to_one() {
    let outcomes = run("def pf := proof [q] : { P0[q] }; q *= X; { P1[q] } end");
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Holds);
}

#[test]
fn x_does_not_preserve_p0() {
    let outcomes = run("def pf := proof [q] : { P0[q] }; q *= X; { P0[q] } end");
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::DoesNotHold);
}

#[test]
fn trivially_invariant_loop_holds() {
    let outcomes = run(
        "def pf := proof [q] : \
            { I[q] }; \
            { inv: I[q] }; \
            while M10[q] do q *= H end; \
            { P0[q] } \
        end",
    );
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Holds);
}

#[test]
fn weak_invariant_is_undetermined() {
    let outcomes = run(
        "def pf := proof [q] : \
            { I[q] }; \
            { inv: Zero[q] }; \
            while M10[q] do q *= H end; \
            { P0[q] } \
        end",
    );
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Undetermined);
}

/// Write a 1-qubit Hermitian |psi><psi| to a tensor file
fn write_pure_state_file(dir: &PathBuf, name: &str, theta: f64, phi: f64) {
    // ket = (cos t, sin t * e^{i p}), H = |ket><ket|
    let (a_re, a_im) = (theta.cos(), 0.0);
    let (b_re, b_im) = (theta.sin() * phi.cos(), theta.sin() * phi.sin());
    // outer product with the conjugate transpose
    let entries_re = [
        a_re * a_re + a_im * a_im,
        a_re * b_re + a_im * b_im,
        b_re * a_re + b_im * a_im,
        b_re * b_re + b_im * b_im,
    ];
    let entries_im = [
        0.0,
        a_im * b_re - a_re * b_im,
        b_im * a_re - b_re * a_im,
        0.0,
    ];
    let json = format!(
        r#"{{"qubits": 1, "measurement": false, "re": [{}, {}, {}, {}], "im": [{}, {}, {}, {}]}}"#,
        entries_re[0],
        entries_re[1],
        entries_re[2],
        entries_re[3],
        entries_im[0],
        entries_im[1],
        entries_im[2],
        entries_im[3],
    );
    std::fs::write(dir.join(name), json).expect("can write tensor file");
}

#[test]
fn bit_flip_correction_preserves_random_state() {
    let dir = work_dir("bitflip");
    let mut rng = rand::rngs::StdRng::seed_from_u64(20220225);
    let theta: f64 = rng.gen::<f64>() * std::f64::consts::PI;
    let phi: f64 = rng.gen::<f64>() * 2.0 * std::f64::consts::PI;
    write_pure_state_file(&dir, "Hrand.json", theta, phi);

    let source = r#"
        def Hrand := load "Hrand.json" end
        def pf := proof [q q1 q2] :
            { Hrand[q] };
            [q1 q2] :=0;
            [q q1] *= CX;
            [q q2] *= CX;
            ( skip # q *= X # q1 *= X # q2 *= X );
            [q q1] *= CX;
            [q q2] *= CX;
            [q1 q2 q] *= CCX;
            { Hrand[q] }
        end
    "#;
    let outcomes = run_in(dir, source);
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Holds);
}

#[test]
fn deutsch_algorithm_holds() {
    let dir = work_dir("deutsch");
    // Hpost = diag(1, 0, 0, 1) on [q q1]
    let json = r#"{"qubits": 2, "measurement": false,
        "re": [1.0, 0.0, 0.0, 0.0,
               0.0, 0.0, 0.0, 0.0,
               0.0, 0.0, 0.0, 0.0,
               0.0, 0.0, 0.0, 1.0],
        "im": [0.0, 0.0, 0.0, 0.0,
               0.0, 0.0, 0.0, 0.0,
               0.0, 0.0, 0.0, 0.0,
               0.0, 0.0, 0.0, 0.0]}"#;
    std::fs::write(dir.join("Hpost.json"), json).expect("can write tensor file");

    // The answer wire q ends in |0> for the constant oracle and |1> for the
    // balanced one; each branch finishes by rewriting the ancilla so that it
    // mirrors the answer.
    let source = r#"
        def Hpost := load "Hpost.json" end
        def pf := proof [q q1] :
            { I[q] };
            [q q1] :=0;
            q1 *= X;
            q *= H;
            q1 *= H;
            (
                skip; q *= H; q1 *= H; q1 *= X
                #
                [q q1] *= CX; q *= H; q1 *= H
            );
            { Hpost[q q1] }
        end
    "#;
    let outcomes = run_in(dir, source);
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Holds);
}

#[test]
fn abort_satisfies_any_postcondition() {
    let outcomes = run("def pf := proof [q] : { Pp[q] }; abort; { P0[q] } end");
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Holds);
}

#[test]
fn skip_keeps_the_postcondition() {
    let holds = run("def pf := proof [q] : { P0[q] }; skip; { P0[q] } end");
    assert_eq!(verdict_of(&holds, "pf"), Verdict::Holds);
    let fails = run("def pf := proof [q] : { I[q] }; skip; { P0[q] } end");
    assert_eq!(verdict_of(&fails, "pf"), Verdict::DoesNotHold);
}

#[test]
fn intermediate_assertion_cuts_the_proof() {
    let good = run(
        "def pf := proof [q] : { P0[q] }; q *= X; { P1[q] }; q *= X; { P0[q] } end",
    );
    assert_eq!(verdict_of(&good, "pf"), Verdict::Holds);
    // an assertion too weak to entail the following precondition fails
    let bad = run(
        "def pf := proof [q] : { P0[q] }; q *= X; { I[q] }; q *= X; { P0[q] } end",
    );
    assert_eq!(verdict_of(&bad, "pf"), Verdict::DoesNotHold);
}

#[test]
fn nondeterministic_choice_requires_all_branches() {
    // one branch breaks the triple, so the whole choice does
    let outcomes = run(
        "def pf := proof [q] : { P0[q] }; ( skip # q *= X ); { P0[q] } end",
    );
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::DoesNotHold);
    // with a weaker postcondition every branch is safe
    let outcomes = run(
        "def pf := proof [q] : { P0[q] }; ( skip # q *= X ); { I[q] } end",
    );
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Holds);
}

#[test]
fn if_rule_combines_branch_preconditions() {
    // measure in the computational basis, then repair the qubit to |0>
    let outcomes = run(
        "def pf := proof [q] : \
            { I[q] }; \
            if M01[q] then skip else q *= X end; \
            { P0[q] } \
        end",
    );
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Holds);
}

#[test]
fn successful_proof_is_bound_and_shown() {
    let outcomes = run(
        "def pf := proof [q] : { P0[q] }; q *= X; { P1[q] } end show pf end",
    );
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::Holds);
    match &outcomes[1] {
        CommandOutcome::Shown { text, .. } => {
            assert!(text.contains("proof [q]"));
            assert!(text.contains("*= X"));
        }
        other => panic!("expected the proof outline, got a different outcome: {:?}", matches_name(other)),
    }
}

#[test]
fn failed_proof_is_not_bound() {
    let outcomes = run(
        "def pf := proof [q] : { P0[q] }; q *= X; { P0[q] } end show pf end",
    );
    assert_eq!(verdict_of(&outcomes, "pf"), Verdict::DoesNotHold);
    assert!(matches!(outcomes[1], CommandOutcome::Failed { .. }));
}

#[test]
fn proof_outline_interleaves_preconditions() {
    let mut session = Session::new(work_dir("outline"));
    let outcomes = session
        .run("def pf := proof [q] : { P0[q] }; q *= X; q *= X; { P0[q] } end")
        .unwrap();
    match &outcomes[0] {
        CommandOutcome::Verified { outline, .. } => {
            // one computed precondition line per statement
            assert_eq!(outline.matches("*= X").count(), 2);
            assert!(outline.contains("{ P0[q] }"));
        }
        _ => panic!("expected a verified proof"),
    }
}

fn matches_name(outcome: &CommandOutcome) -> &'static str {
    match outcome {
        CommandOutcome::Defined { .. } => "Defined",
        CommandOutcome::Verified { .. } => "Verified",
        CommandOutcome::Shown { .. } => "Shown",
        CommandOutcome::Saved { .. } => "Saved",
        CommandOutcome::SettingChanged { .. } => "SettingChanged",
        CommandOutcome::Failed { .. } => "Failed",
    }
}
