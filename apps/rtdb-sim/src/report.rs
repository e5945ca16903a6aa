//! Human-readable run summary.

use std::fmt::Write;

use rtdb_harness_core::harness::{Outcome, SuiteReport};

/// Renders every suite and scenario outcome, ending with an overall verdict.
pub fn format_summary(reports: &[SuiteReport]) -> String {
    let mut out = String::new();
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for suite in reports {
        let _ = writeln!(out, "Suite: {} (timeout {:?})", suite.name, suite.timeout);
        for scenario in &suite.scenarios {
            match &scenario.outcome {
                Outcome::Passed => {
                    passed += 1;
                    let _ = writeln!(
                        out,
                        "  ✅ PASS: {} ({:?})",
                        scenario.name, scenario.elapsed
                    );
                }
                Outcome::Failed { phase, error } => {
                    failed += 1;
                    let _ = writeln!(
                        out,
                        "  ❌ FAIL: {} during {} ({:?})",
                        scenario.name, phase, scenario.elapsed
                    );
                    let _ = writeln!(out, "     {}", error);
                }
                Outcome::Skipped { reason } => {
                    skipped += 1;
                    let _ = writeln!(out, "  ⏭  SKIP: {} ({})", scenario.name, reason);
                }
            }
            if let Some(error) = &scenario.teardown_error {
                let _ = writeln!(out, "     teardown: {}", error);
            }
        }
    }

    let _ = writeln!(
        out,
        "Results: {} passed, {} failed, {} skipped",
        passed, failed, skipped
    );
    out
}

pub fn all_passed(reports: &[SuiteReport]) -> bool {
    reports.iter().all(SuiteReport::passed)
}
