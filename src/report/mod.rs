use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tera::{Context, Tera};

use crate::errors::CovError;
use crate::logging::Logger;
use crate::table::CoverageTable;

pub const REPORT_TITLE: &str = "Test Coverage Report";

/// The two files derived from one report document: same base name,
/// swapped extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledArtifacts {
    pub pdf: PathBuf,
    pub html: PathBuf,
}

pub fn pdf_path_for(report_path: &Path) -> PathBuf {
    report_path.with_extension("pdf")
}

pub fn html_path_for(report_path: &Path) -> PathBuf {
    report_path.with_extension("html")
}

/// Fill the report template with the table's summary statistics, the
/// heatmap reference and the rendered table, and write the document source.
///
/// The template must provide exactly the placeholders `title`, `summary`,
/// `image_path` and `inline_table`; an unknown placeholder in the template
/// fails the render.
pub fn compose_report(
    table: &CoverageTable,
    image_path: &Path,
    output_dir: &Path,
    template_path: &Path,
    output_filename: &str,
    logger: &Logger,
) -> Result<PathBuf, CovError> {
    if !template_path.exists() {
        logger.error(&format!(
            "Report template does not exist: {}",
            template_path.display()
        ));
        return Err(CovError::InputNotFound(template_path.to_path_buf()));
    }
    fs::create_dir_all(output_dir)?;

    let template = fs::read_to_string(template_path)?;

    let mut context = Context::new();
    context.insert("title", REPORT_TITLE);
    context.insert("summary", &table.describe().to_latex());
    context.insert("image_path", &image_path.display().to_string());
    context.insert("inline_table", &table.to_latex());

    // The dialect is LaTeX, so HTML autoescaping stays off.
    let rendered = Tera::one_off(&template, &context, false)?;

    let report_path = output_dir.join(output_filename);
    fs::write(&report_path, rendered)?;
    logger.info(&format!("Report generated at {}", report_path.display()));
    Ok(report_path)
}

/// Compile the report document to a portable document with pdflatex.
pub fn compile_pdf(report_path: &Path, logger: &Logger) -> Result<PathBuf, CovError> {
    let (workdir, file_name) = split_report_path(report_path)?;
    run_tool(
        "pdflatex",
        &["-interaction=nonstopmode".to_string(), file_name],
        workdir,
    )?;
    let pdf = pdf_path_for(report_path);
    logger.info(&format!("Report compiled to {}", pdf.display()));
    Ok(pdf)
}

/// Convert the report document to HTML with pandoc, next to the source.
pub fn export_html(report_path: &Path, logger: &Logger) -> Result<PathBuf, CovError> {
    let (workdir, file_name) = split_report_path(report_path)?;
    let html = html_path_for(report_path);
    let html_name = html
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report.html".to_string());
    run_tool(
        "pandoc",
        &[file_name, "-s".to_string(), "-o".to_string(), html_name],
        workdir,
    )?;
    logger.info(&format!("Report exported to HTML at {}", html.display()));
    Ok(html)
}

/// Both compiler invocations in sequence. This is the sub-step the
/// interactive console offloads to a worker thread.
pub fn compile_and_export(
    report_path: &Path,
    logger: &Logger,
) -> Result<CompiledArtifacts, CovError> {
    let pdf = compile_pdf(report_path, logger)?;
    let html = export_html(report_path, logger)?;
    Ok(CompiledArtifacts { pdf, html })
}

fn split_report_path(report_path: &Path) -> Result<(&Path, String), CovError> {
    let workdir = report_path.parent().ok_or_else(|| {
        CovError::Validation(format!(
            "Report path has no parent directory: {}",
            report_path.display()
        ))
    })?;
    let file_name = report_path
        .file_name()
        .ok_or_else(|| {
            CovError::Validation(format!(
                "Report path has no file name: {}",
                report_path.display()
            ))
        })?
        .to_string_lossy()
        .into_owned();
    Ok((workdir, file_name))
}

/// Run an external tool, keeping "the tool is not installed" and "the tool
/// ran and failed" apart so callers can message the user correctly.
fn run_tool(tool: &str, args: &[String], workdir: &Path) -> Result<(), CovError> {
    let mut command = Command::new(tool);
    command.args(args);
    command.current_dir(workdir);

    let output = match command.output() {
        Ok(output) => output,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(CovError::ToolNotFound(tool.to_string()));
        }
        Err(err) => return Err(CovError::IoError(err)),
    };

    if !output.status.success() {
        let detail = if output.stderr.is_empty() {
            output_tail(&output.stdout)
        } else {
            output_tail(&output.stderr)
        };
        return Err(CovError::ToolFailed {
            tool: tool.to_string(),
            code: output.status.code(),
            detail,
        });
    }
    Ok(())
}

fn output_tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    lines
        .iter()
        .skip(lines.len().saturating_sub(15))
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogSink, MemorySink};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn test_logger() -> Logger {
        Logger::new(Arc::new(MemorySink::new(32)) as Arc<dyn LogSink>)
    }

    fn sample_table() -> CoverageTable {
        CoverageTable::new(
            vec!["test_login".to_string()],
            vec!["auth".to_string(), "billing".to_string()],
            vec![vec![80.0, 60.0]],
        )
        .unwrap()
    }

    const TEMPLATE: &str = "\\title{ {{ title }} }\n{{ summary }}\n\\includegraphics{ {{- image_path -}} }\n{{ inline_table }}\n";

    #[test]
    fn composition_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.tex");
        fs::write(&template_path, TEMPLATE).unwrap();
        let out_dir = dir.path().join("report");
        let image = dir.path().join("heatmap.png");

        let first = compose_report(
            &sample_table(),
            &image,
            &out_dir,
            &template_path,
            "report.tex",
            &test_logger(),
        )
        .unwrap();
        let first_bytes = fs::read(&first).unwrap();

        let second = compose_report(
            &sample_table(),
            &image,
            &out_dir,
            &template_path,
            "report.tex",
            &test_logger(),
        )
        .unwrap();
        let second_bytes = fs::read(&second).unwrap();

        assert_eq!(first, out_dir.join("report.tex"));
        assert_eq!(first_bytes, second_bytes);

        let text = String::from_utf8(first_bytes).unwrap();
        assert!(text.contains("Test Coverage Report"));
        assert!(text.contains(&format!("\\includegraphics{{{}}}", image.display())));
        // Summary and inline table both render as tabular blocks.
        assert_eq!(text.matches("\\begin{tabular}").count(), 2);
    }

    #[test]
    fn missing_template_is_a_not_found_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = compose_report(
            &sample_table(),
            Path::new("heatmap.png"),
            dir.path(),
            &dir.path().join("missing.tex"),
            "report.tex",
            &test_logger(),
        );
        assert!(matches!(result, Err(CovError::InputNotFound(_))));
    }

    #[test]
    fn undefined_placeholder_fails_the_render() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.tex");
        fs::write(&template_path, "{{ title }} {{ bogus_placeholder }}").unwrap();

        let result = compose_report(
            &sample_table(),
            Path::new("heatmap.png"),
            dir.path(),
            &template_path,
            "report.tex",
            &test_logger(),
        );
        assert!(matches!(result, Err(CovError::Template(_))));
    }

    #[test]
    fn artifact_paths_share_the_base_name() {
        let report = Path::new("/tmp/out/report.tex");
        assert_eq!(pdf_path_for(report), Path::new("/tmp/out/report.pdf"));
        assert_eq!(html_path_for(report), Path::new("/tmp/out/report.html"));
    }

    #[test]
    fn absent_tool_is_distinguishable_from_a_failing_tool() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_tool("covdeck-no-such-tool", &[], dir.path());
        assert!(
            matches!(result, Err(CovError::ToolNotFound(tool)) if tool == "covdeck-no-such-tool")
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_reports_its_exit_status() {
        let dir = tempfile::tempdir().unwrap();

        let result = run_tool("false", &[], dir.path());
        match result {
            Err(CovError::ToolFailed { tool, code, .. }) => {
                assert_eq!(tool, "false");
                assert_eq!(code, Some(1));
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }
}
