use colored::*;
use std::time::Duration;

#[derive(Debug)]
pub struct TestResult {
    pub scenario: String,
    pub passed: bool,
    pub message: Option<String>,
    pub duration: Duration,
}

impl TestResult {
    pub fn pass(scenario: &str, duration: Duration) -> Self {
        Self {
            scenario: scenario.to_string(),
            passed: true,
            message: None,
            duration,
        }
    }

    pub fn fail(scenario: &str, duration: Duration, message: impl Into<String>) -> Self {
        Self {
            scenario: scenario.to_string(),
            passed: false,
            message: Some(message.into()),
            duration,
        }
    }
}

pub fn print_test_summary(results: &[TestResult]) {
    for result in results {
        let status = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!(
            "[{}] {} ({:.2?})",
            status, result.scenario, result.duration
        );
        if let Some(message) = &result.message {
            println!("       {}", message.yellow());
        }
    }

    let passed = results.iter().filter(|r| r.passed).count();
    println!("\n{} of {} scenario(s) passed", passed, results.len());
}
