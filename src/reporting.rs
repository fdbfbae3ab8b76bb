//! Handing offenses to whoever owns test status.
//!
//! An offense that names the example it came from fails that example (once,
//! with every error attached). The rest are reported as suite-level failures
//! with their location.

use colored::Colorize;
use std::io::Write;

use crate::method_call::{MethodCall, VerificationError};

pub trait OffenseReporter {
    /// Mark `example` failed with all errors attributed to it
    fn example_failed(&mut self, example: &str, errors: &[VerificationError]);

    /// Report an error no example can be blamed for
    fn suite_failure(&mut self, location: Option<&str>, error: &VerificationError);
}

/// Counts of what [`report_offenses`] reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub failed_examples: usize,
    pub suite_failures: usize,
}

impl ReportSummary {
    pub fn is_clean(&self) -> bool {
        self.failed_examples == 0 && self.suite_failures == 0
    }
}

/// Report offenses in order of first appearance. Calls without an attached
/// error are skipped.
pub fn report_offenses(offenses: &[MethodCall], reporter: &mut dyn OffenseReporter) -> ReportSummary {
    let mut by_example: Vec<(&str, Vec<VerificationError>)> = Vec::new();
    let mut summary = ReportSummary::default();

    for call in offenses {
        let Some(error) = call.metadata.error.as_ref() else {
            continue;
        };
        match call.metadata.example.as_deref() {
            Some(example) => match by_example.iter_mut().find(|(e, _)| *e == example) {
                Some((_, errors)) => errors.push(error.clone()),
                None => by_example.push((example, vec![error.clone()])),
            },
            None => {
                reporter.suite_failure(call.metadata.location.as_deref(), error);
                summary.suite_failures += 1;
            }
        }
    }

    for (example, errors) in &by_example {
        reporter.example_failed(example, errors);
    }
    summary.failed_examples = by_example.len();
    summary
}

/// Keeps reported failures in memory
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub failed_examples: Vec<(String, Vec<VerificationError>)>,
    pub suite_failures: Vec<(Option<String>, VerificationError)>,
}

impl OffenseReporter for CollectingReporter {
    fn example_failed(&mut self, example: &str, errors: &[VerificationError]) {
        self.failed_examples.push((example.to_string(), errors.to_vec()));
    }

    fn suite_failure(&mut self, location: Option<&str>, error: &VerificationError) {
        self.suite_failures
            .push((location.map(str::to_string), error.clone()));
    }
}

/// Writes failures as readable text
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self {
            out: std::io::stderr(),
        }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OffenseReporter for ConsoleReporter<W> {
    fn example_failed(&mut self, example: &str, errors: &[VerificationError]) {
        let _ = writeln!(self.out, "{} {}", "FAILED".red().bold(), example.bold());
        for error in errors {
            for line in error.to_string().lines() {
                let _ = writeln!(self.out, "    {}", line);
            }
        }
    }

    fn suite_failure(&mut self, location: Option<&str>, error: &VerificationError) {
        let _ = writeln!(
            self.out,
            "{} {}",
            "SUITE FAILURE".red().bold(),
            location.unwrap_or("<unknown location>").dimmed()
        );
        for line in error.to_string().lines() {
            let _ = writeln!(self.out, "    {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractError;
    use crate::core::CallTarget;
    use pretty_assertions::assert_eq;

    fn offense(example: Option<&str>, method: &str) -> MethodCall {
        let mut call = MethodCall::new(CallTarget::instance("TaxCalculator"), method, vec![])
            .with_example(example.map(str::to_string))
            .with_location("tests/accountant.rs:12");
        call.metadata.error = Some(
            ContractError::NoMethodCalls {
                method_desc: call.describe(),
            }
            .into(),
        );
        call
    }

    #[test]
    fn test_groups_by_example() {
        let offenses = vec![
            offense(Some("Accountant#net_pay"), "for_income"),
            offense(None, "rate"),
            offense(Some("Accountant#net_pay"), "tax_rate_for"),
            offense(Some("Accountant#gross"), "for_income"),
        ];
        let mut reporter = CollectingReporter::default();

        let summary = report_offenses(&offenses, &mut reporter);

        assert_eq!(
            summary,
            ReportSummary {
                failed_examples: 2,
                suite_failures: 1
            }
        );
        assert_eq!(reporter.failed_examples[0].0, "Accountant#net_pay");
        assert_eq!(reporter.failed_examples[0].1.len(), 2);
        assert_eq!(reporter.failed_examples[1].0, "Accountant#gross");
        assert_eq!(
            reporter.suite_failures[0].0.as_deref(),
            Some("tests/accountant.rs:12")
        );
    }

    #[test]
    fn test_calls_without_error_are_skipped() {
        let clean = MethodCall::new(CallTarget::instance("T"), "m", vec![]);
        let mut reporter = CollectingReporter::default();

        assert!(report_offenses(&[clean], &mut reporter).is_clean());
    }

    #[test]
    fn test_console_output_lists_errors() {
        colored::control::set_override(false);
        let mut reporter = ConsoleReporter::new(Vec::new());
        report_offenses(&[offense(Some("ex"), "for_income")], &mut reporter);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.starts_with("FAILED ex\n"));
        assert!(text.contains("    No method calls captured for TaxCalculator#for_income"));
    }
}
