//! End-to-end scenarios through the whole pipeline, asserting on the
//! emitted assembly text.

use rvcc::compile;

fn lines(source: &str) -> Vec<String> {
    compile(source).unwrap().lines().map(str::to_owned).collect()
}

/// The driver scenarios that ship with the compiler.  Each source is a
/// complete program whose `main` leaves the expected value in `a0`.
const SCENARIOS: [&str; 7] = [
    "int main(){ return 0; }",
    "int main(){ return 4*3+1*2; }",
    "int main(){ return 10%3*3; }",
    "int main(){ return 1<<3; }",
    "int main(){ int a; a=5; a*=2; return a; }",
    "int f(int a){ if (a<=0) return 1; else return a*f(a-1); } int main(){ return f(5); }",
    "int main(){ if (1) return 1; else return 0; }",
];

#[test]
fn all_scenarios_compile() {
    for source in SCENARIOS {
        let out = compile(source).unwrap();
        assert!(out.contains("\t.global main"), "no main in output for {source}");
        assert!(out.contains("\tret"), "no ret in output for {source}");
    }
}

#[test]
fn output_starts_with_a_section_directive() {
    for source in SCENARIOS {
        let out = lines(source);
        assert_eq!(out[0], "\t.section .text", "for {source}");
    }
    let out = lines("int g = 1; int main(){ return g; }");
    assert_eq!(out[0], "\t.section .data");
}

#[test]
fn every_function_is_sized_and_typed() {
    let out = lines(SCENARIOS[5]);
    for name in ["f", "main"] {
        assert!(out.contains(&format!("\t.global {name}")));
        assert!(out.contains(&format!("\t.type {name}, @function")));
        assert!(out.contains(&format!("\t.size {name}, . - {name}")));
        assert!(out.contains(&format!("{name}:")));
    }
}

#[test]
fn every_branch_target_is_a_placed_label() {
    let sources = [
        SCENARIOS[5],
        SCENARIOS[6],
        "int main(){ if (1) if (2) return 3; else return 4; return 5; }",
    ];
    for source in sources {
        let out = lines(source);
        let placed: Vec<String> = out
            .iter()
            .filter(|l| l.starts_with(".L") && l.ends_with(':'))
            .map(|l| l.trim_end_matches(':').to_owned())
            .collect();

        let mut unique = placed.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), placed.len(), "label placed twice in {source}");

        for line in &out {
            let target = if let Some(rest) = line.strip_prefix("\tj\t") {
                rest.to_owned()
            } else if let Some((_, rest)) = line.split_once("\tbeqz\t") {
                rest.split(", ").nth(1).unwrap_or_default().to_owned()
            } else {
                continue;
            };
            assert!(placed.contains(&target), "jump to unplaced {target} in {source}");
        }
    }
}

#[test]
fn prologue_and_epilogue_are_symmetric() {
    for source in SCENARIOS {
        let out = lines(source);
        let reserves: Vec<i32> = out
            .iter()
            .filter_map(|l| l.strip_prefix("\taddi\tsp, sp, -"))
            .filter_map(|n| n.parse().ok())
            .collect();
        let releases: Vec<i32> = out
            .iter()
            .filter_map(|l| l.strip_prefix("\taddi\tsp, sp, "))
            .filter(|n| !n.starts_with('-'))
            .filter_map(|n| n.parse().ok())
            .collect();
        // every reserved byte count is released somewhere (calls pair
        // exactly; frames may release once per return path)
        for r in &reserves {
            assert!(releases.contains(r), "{r} reserved but never released in {source}");
        }

        // frame reservations (the addi right after the fp setup) keep sp
        // 16-byte aligned
        for (i, line) in out.iter().enumerate() {
            if line == "\tmv\ts0, sp" {
                let frame: i32 = out[i + 1]
                    .strip_prefix("\taddi\tsp, sp, -")
                    .and_then(|n| n.parse().ok())
                    .unwrap();
                assert_eq!(frame % 16, 0, "unaligned frame in {source}");
            }
        }
    }
}

#[test]
fn literal_only_main_computes_into_a0() {
    // the last thing before the epilogue's ra reload is the move into a0
    let out = lines("int main(){ return 4*3+1*2; }");
    let mv_at = out.iter().position(|l| l == "\tmv\ta0, t0").unwrap();
    assert_eq!(out[mv_at + 1], "\tld\tra, -8(s0)");
}

#[test]
fn local_variable_scenario_uses_the_stack_frame() {
    let out = lines(SCENARIOS[4]);
    assert!(out.iter().any(|l| l.starts_with("\taddi\tt") && l.contains("s0, -20")));
    assert!(out.iter().all(|l| !l.contains(".comm")), "locals must not be .comm");
}

#[test]
fn factorial_passes_its_argument_in_a0() {
    let out = lines(SCENARIOS[5]);
    assert!(out.contains(&"\tcall\tf".to_owned()));
    // both call sites marshal the argument into a0 before the call
    let calls: Vec<usize> = out
        .iter()
        .enumerate()
        .filter(|(_, l)| *l == "\tcall\tf")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(calls.len(), 2);
    for at in calls {
        let before = &out[at.saturating_sub(6)..at];
        assert!(
            before.iter().any(|l| l.starts_with("\tmv\ta0, ")),
            "no argument move before call at line {at}"
        );
    }
}

#[test]
fn errors_abort_the_pipeline() {
    // one representative per stage
    assert!(compile("int main(){ return @; }").is_err()); // lex
    assert!(compile("int main(){ return 1 }").is_err()); // parse
    assert!(compile("int main(){ return x; }").is_err()); // lower
    let mut deep = String::from("16");
    for n in (1..16).rev() {
        deep = format!("{n}+({deep})");
    }
    assert!(compile(&format!("int main(){{ return {deep}; }}")).is_err()); // regalloc
}

#[test]
fn uninitialized_identifier_matches_the_classic_diagnostic() {
    let err = compile("int main(){ return x; }").unwrap_err();
    assert_eq!(err.to_string(), "uninitialized identifier: x");
}
