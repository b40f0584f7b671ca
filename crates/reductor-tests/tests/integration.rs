//! Integration tests for reductor-tests.
//!
//! These drive the public battery surface (`run_all_checks`, `pass_rate`)
//! the way the `reductor check` CLI subcommand does, plus a couple of
//! individual scenario/invariant/law functions called directly.

use reductor_tests::{
    invariant_pcb_exclusive_location, law_decrement_saturates_at_floor, pass_rate,
    run_all_checks, scenario_pcb_reuse,
};

#[test]
fn full_battery_reports_a_result_for_every_check_and_all_pass() {
    let results = run_all_checks();
    assert!(!results.is_empty(), "the battery must not be empty");
    for result in &results {
        assert!(
            result.passed,
            "check '{}' failed: {}",
            result.name, result.details
        );
    }
    assert_eq!(pass_rate(&results), 1.0);
}

#[test]
fn individual_scenario_can_be_run_standalone() {
    let result = scenario_pcb_reuse();
    assert!(result.passed, "{}", result.details);
}

#[test]
fn individual_invariant_can_be_run_standalone() {
    let result = invariant_pcb_exclusive_location();
    assert!(result.passed, "{}", result.details);
}

#[test]
fn individual_law_can_be_run_standalone() {
    let result = law_decrement_saturates_at_floor();
    assert!(result.passed, "{}", result.details);
}
