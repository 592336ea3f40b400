use std::path::Path;
use std::process::Command;

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, PartialEq)]
enum DependencyStatus {
    Installed,
    Missing,
}

#[derive(Tabled)]
struct DependencyRow {
    #[tabled(rename = "Dependency")]
    name: String,
    #[tabled(rename = "Status")]
    status: String, // Plain text, no ANSI codes
    #[tabled(rename = "Description")]
    description: String,
}

fn check_command(cmd: &str, args: &[&str]) -> DependencyStatus {
    Command::new(cmd)
        .args(args)
        .output()
        .map(|output| {
            if output.status.success() {
                DependencyStatus::Installed
            } else {
                DependencyStatus::Missing
            }
        })
        .unwrap_or(DependencyStatus::Missing)
}

fn status_text(status: DependencyStatus) -> &'static str {
    match status {
        DependencyStatus::Installed => "✓ OK",
        DependencyStatus::Missing => "✗ MISSING",
    }
}

fn colorize_table_output(table_str: &str) -> String {
    table_str
        .lines()
        .map(|line| {
            if line.contains("✓ OK") {
                line.replace("✓ OK", &"✓ OK".green().to_string())
            } else if line.contains("✗ MISSING") {
                line.replace("✗ MISSING", &"✗ MISSING".red().to_string())
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check that the external document compilers and the settings document
/// are in place before a run is attempted.
pub fn check_dependencies(config_path: &Path) {
    println!("\n{}\n", "covdeck Dependency Check".bold());

    let tools = [
        (
            "pdflatex",
            check_command("pdflatex", &["--version"]),
            "Compiles the report to PDF",
        ),
        (
            "pandoc",
            check_command("pandoc", &["--version"]),
            "Exports the report to HTML",
        ),
    ];

    let mut all_installed = true;
    let mut rows = Vec::new();
    for (name, status, description) in &tools {
        if *status == DependencyStatus::Missing {
            all_installed = false;
        }
        rows.push(DependencyRow {
            name: name.to_string(),
            status: status_text(*status).to_string(),
            description: description.to_string(),
        });
    }

    let config_status = if config_path.exists() {
        DependencyStatus::Installed
    } else {
        all_installed = false;
        DependencyStatus::Missing
    };
    rows.push(DependencyRow {
        name: config_path.display().to_string(),
        status: status_text(config_status).to_string(),
        description: "Settings document".to_string(),
    });

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", colorize_table_output(&table.to_string()));

    println!();
    if all_installed {
        println!("{}", "✓ All dependencies are in place!".green());
    } else {
        println!(
            "{}",
            "✗ Some dependencies are missing. Please install them.".red()
        );
    }
}
