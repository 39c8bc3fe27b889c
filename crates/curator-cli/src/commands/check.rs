use crate::errors::CliError;
use clap::Parser;
use colored::Colorize;
use curator_config::Config;
use curator_logger as logger;
use curator_manifest::check::DEFAULT_CHECK_FIELD;
use curator_manifest::{check_manifests, CheckReport};
use serde_yaml::Value;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
pub struct CheckCommand {
    /// Manifests to check
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Fields to print for each dataset
    #[arg(short, long, num_args = 1.., default_values_t = [DEFAULT_CHECK_FIELD.to_string()])]
    pub fields: Vec<String>,

    /// Prefix label used to expand file paths
    #[arg(short, long)]
    pub prefix: Option<String>,
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None => "-".dimmed().to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => serde_yaml::to_string(other)
            .map(|s| s.trim_end().replace('\n', " "))
            .unwrap_or_default(),
    }
}

fn print_report(report: &CheckReport) {
    for summary in &report.datasets {
        println!(
            "{} {}",
            summary.name.bold(),
            format!("({})", summary.manifest.display()).dimmed()
        );
        for (field, value) in &summary.fields {
            println!("  {}: {}", field.cyan(), display_value(value.as_ref()));
        }
    }
}

pub fn handle_check(cmd: CheckCommand, config: &Config) -> Result<(), CliError> {
    let prefix = cmd.prefix.clone().or_else(|| config.prefix.clone());
    let report = check_manifests(&cmd.files, &cmd.fields, prefix.as_deref());
    print_report(&report);

    if report.is_ok() {
        logger::success(&format!(
            "{} dataset(s) in {} manifest(s) look fine",
            report.datasets.len(),
            cmd.files.len()
        ));
        return Ok(());
    }

    for issue in &report.issues {
        logger::error(&issue.to_string());
    }
    println!("{} errors have occurred", report.issues.len());
    Err(CliError::CheckFailed(report.issues.len()))
}
