//! Architecture rules for the tally workspace

use architectural_enforcement::find_violations;

const PRODUCTION_DIRS: &[&str] = &["tally/core/src", "tally/daemon/src", "console/src"];

#[test]
fn test_no_blocking_sleep_in_production_code() {
    let violations = find_violations(PRODUCTION_DIRS, &["std::thread::sleep", "thread::sleep("]);
    assert!(
        violations.is_empty(),
        "blocking sleep stalls the runtime, use tokio::time:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_no_unwrap_in_production_code() {
    let violations = find_violations(PRODUCTION_DIRS, &[".unwrap()", ".expect("]);
    assert!(
        violations.is_empty(),
        "propagate errors instead of panicking:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_core_is_independent_of_http_server() {
    let violations = find_violations(&["tally/core/src"], &["axum", "tower_http", "tally_daemon"]);
    assert!(
        violations.is_empty(),
        "tally-core must not depend on the server stack:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_console_does_not_embed_server() {
    let violations = find_violations(&["console/src"], &["tally_daemon", "TimerStreamProducer"]);
    assert!(
        violations.is_empty(),
        "the console talks to the server over HTTP only:\n{}",
        violations.join("\n")
    );
}
