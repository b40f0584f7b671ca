use reductor_tests::{CheckResult, pass_rate, run_all_checks};

/// Runs the invariant/law/scenario battery and prints a pass/fail table.
/// Returns the process exit code: 0 if every check passed, 1 otherwise.
pub fn run(output: Option<&str>) -> i32 {
    let results = run_all_checks();
    let rate = pass_rate(&results);
    let all_passed = results.iter().all(|r| r.passed);

    for r in &results {
        let mark = if r.passed { "PASS" } else { "FAIL" };
        println!("[{mark}] {} — {}", r.name, r.details);
    }
    println!(
        "\n{}/{} checks passed ({:.0}%)",
        results.iter().filter(|r| r.passed).count(),
        results.len(),
        rate * 100.0
    );

    if let Some(path) = output {
        if let Err(e) = write_json(&results, path) {
            log::error!("failed to write check report to {path}: {e}");
        }
    }

    if all_passed { 0 } else { 1 }
}

fn write_json(results: &[CheckResult], path: &str) -> std::io::Result<()> {
    let entries: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.name,
                "passed": r.passed,
                "details": r.details,
            })
        })
        .collect();
    let report = serde_json::json!({
        "pass_rate": pass_rate(results),
        "checks": entries,
    });
    std::fs::write(path, serde_json::to_string_pretty(&report)?)
}
