//! Standalone coverage alert: reads its configuration from environment
//! variables, checks the average coverage against a threshold, and mails a
//! warning when it falls below. Not part of the report pipeline; wire it to
//! whatever trigger suits your setup.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use covdeck::config::EmailConfig;
use covdeck::errors::CovError;
use covdeck::logging::{ConsoleSink, LogSink, Logger};
use covdeck::notify::send_notification;
use covdeck::table::reader::read_coverage_table;

const DEFAULT_FILE: &str = "test_coverage.xlsx";
const DEFAULT_SHEET: &str = "Coverage";
const DEFAULT_THRESHOLD: f64 = 80.0;
const DEFAULT_PORT: u16 = 587;

fn required_var(name: &str) -> Result<String, CovError> {
    env::var(name).map_err(|_| CovError::MissingSetting(name.to_string()))
}

fn main() -> Result<(), CovError> {
    let logger = Logger::new(Arc::new(ConsoleSink::new(false)) as Arc<dyn LogSink>);

    let file = PathBuf::from(env::var("COVERAGE_FILE").unwrap_or_else(|_| DEFAULT_FILE.to_string()));
    let sheet = env::var("COVERAGE_SHEET").unwrap_or_else(|_| DEFAULT_SHEET.to_string());
    let threshold = match env::var("COVERAGE_THRESHOLD") {
        Ok(raw) => raw.parse::<f64>().map_err(|_| {
            CovError::Validation(format!("Invalid COVERAGE_THRESHOLD: {}", raw))
        })?,
        Err(_) => DEFAULT_THRESHOLD,
    };

    let table = read_coverage_table(&file, &sheet, &logger)?;
    let average = table.overall_mean();
    println!("Average Coverage: {:.2}%", average);

    if average.is_nan() || average >= threshold {
        println!("Coverage is above threshold. No email notification sent.");
        return Ok(());
    }

    let email = EmailConfig {
        recipients: vec![required_var("EMAIL_RECIPIENT")?],
        smtp_server: required_var("EMAIL_HOST")?,
        smtp_port: env::var("EMAIL_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_PORT),
        username: required_var("EMAIL_USERNAME")?,
        password: required_var("EMAIL_PASSWORD")?,
    };

    let body = format!(
        "Warning: The average test coverage is {:.2}%, which is below the threshold of {}%.",
        average, threshold
    );
    send_notification(&email, "Test Coverage Alert", &body, None, &logger)?;
    println!("Email notification sent.");
    Ok(())
}
