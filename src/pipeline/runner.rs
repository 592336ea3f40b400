use std::path::PathBuf;

use crate::config::Config;
use crate::errors::CovError;
use crate::logging::Logger;
use crate::notify::send_notification;
use crate::plot::{render_heatmap, HeatmapOptions};
use crate::report::{compile_pdf, compose_report, export_html, REPORT_TITLE};
use crate::table::reader::read_coverage_table;

use super::{RunState, Step};

const NOTIFICATION_BODY: &str =
    "The latest test coverage report has been generated and is attached.";

/// Unattended pipeline run: every step in fixed order, halting the rest of
/// the chain on the first failure.
pub struct BatchRunner {
    config_path: PathBuf,
    heatmap_options: HeatmapOptions,
    logger: Logger,
}

impl BatchRunner {
    pub fn new(config_path: PathBuf, logger: Logger) -> Self {
        Self {
            config_path,
            heatmap_options: HeatmapOptions::default(),
            logger,
        }
    }

    pub fn run(&self) -> Result<(), CovError> {
        let total = Step::ALL.len() + 1;
        let mut state = RunState::Idle;

        let config = Config::load(&self.config_path, &self.logger)?;
        state = state.on_config_loaded()?;
        self.logger
            .info(&format!("[1/{}] Configuration loaded", total));

        let table = self.advance(&mut state, Step::LoadData, 2, "Spreadsheet data loaded", || {
            read_coverage_table(&config.excel_file, &config.sheet_name, &self.logger)
        })?;

        self.advance(&mut state, Step::RenderHeatmap, 3, "Heatmap generated", || {
            render_heatmap(
                &table,
                &config.heatmap_output,
                &self.heatmap_options,
                &self.logger,
            )
        })?;

        let report_path =
            self.advance(&mut state, Step::ComposeReport, 4, "Report generated", || {
                compose_report(
                    &table,
                    &config.heatmap_output,
                    &config.report_output_dir,
                    &config.latex_template,
                    &config.report_filename,
                    &self.logger,
                )
            })?;
        // The table is not needed past composition.
        drop(table);

        let pdf = self.advance(&mut state, Step::CompilePdf, 5, "Report compiled", || {
            compile_pdf(&report_path, &self.logger)
        })?;

        self.advance(&mut state, Step::ExportHtml, 6, "Report exported to HTML", || {
            export_html(&report_path, &self.logger).map(|_| ())
        })?;

        self.advance(&mut state, Step::Notify, 7, "Notification sent", || {
            let email = config.email()?;
            send_notification(
                email,
                REPORT_TITLE,
                NOTIFICATION_BODY,
                Some(pdf.as_path()),
                &self.logger,
            )
        })?;

        state.finish()?;
        self.logger.info("Pipeline complete");
        Ok(())
    }

    fn advance<T>(
        &self,
        state: &mut RunState,
        step: Step,
        index: usize,
        postfix: &str,
        action: impl FnOnce() -> Result<T, CovError>,
    ) -> Result<T, CovError> {
        match action() {
            Ok(value) => {
                *state = state.clone().on_success(step)?;
                self.logger.info(&format!(
                    "[{}/{}] {}",
                    index,
                    Step::ALL.len() + 1,
                    postfix
                ));
                Ok(value)
            }
            Err(err) => {
                *state = state.clone().on_failure(step, &err.to_string());
                self.logger.error(&format!(
                    "Pipeline halted at '{}': {}",
                    step.description(),
                    err
                ));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogSink, MemorySink};
    use rust_xlsxwriter::Workbook;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    const TEMPLATE: &str = "\\title{ {{ title }} }\n{{ summary }}\n\\includegraphics{ {{- image_path -}} }\n{{ inline_table }}\n";

    fn test_logger() -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new(64));
        (Logger::new(sink.clone() as Arc<dyn LogSink>), sink)
    }

    fn write_workbook(path: &Path) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Coverage").unwrap();
        sheet.write_string(0, 0, "test").unwrap();
        for (col, label) in ["auth", "billing", "api"].iter().enumerate() {
            sheet.write_string(0, col as u16 + 1, *label).unwrap();
        }
        for row in 0..3u32 {
            sheet
                .write_string(row + 1, 0, format!("test_{}", row))
                .unwrap();
            for col in 0..3u16 {
                sheet
                    .write_number(row + 1, col + 1, (10 * (row + 1)) as f64 + col as f64)
                    .unwrap();
            }
        }
        workbook.save(path).unwrap();
    }

    fn write_setup(dir: &Path, excel_name: &str) -> PathBuf {
        fs::create_dir_all(dir.join("templates")).unwrap();
        fs::write(dir.join("templates/report_template.tex"), TEMPLATE).unwrap();
        let config = format!(
            "excel_file: {}\nsheet_name: Coverage\nheatmap_output: out/heatmap.png\nlatex_template: templates/report_template.tex\nreport_output_dir: out\nreport_filename: report.tex\n",
            excel_name
        );
        let config_path = dir.join("config.yaml");
        fs::write(&config_path, config).unwrap();
        config_path
    }

    #[test]
    fn missing_spreadsheet_aborts_before_any_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_setup(dir.path(), "does_not_exist.xlsx");

        let (logger, _) = test_logger();
        let runner = BatchRunner::new(config_path, logger);
        let result = runner.run();

        assert!(matches!(result, Err(CovError::InputNotFound(_))));
        assert!(!dir.path().join("out/heatmap.png").exists());
        assert!(!dir.path().join("out/report.tex").exists());
    }

    #[test]
    fn missing_sheet_aborts_with_the_available_names() {
        let dir = tempfile::tempdir().unwrap();
        write_workbook(&dir.path().join("coverage.xlsx"));
        let config_path = write_setup(dir.path(), "coverage.xlsx");
        let config_text = fs::read_to_string(&config_path)
            .unwrap()
            .replace("sheet_name: Coverage", "sheet_name: Bogus");
        fs::write(&config_path, config_text).unwrap();

        let (logger, _) = test_logger();
        let result = BatchRunner::new(config_path, logger).run();

        match result {
            Err(CovError::SheetNotFound { available, .. }) => {
                assert_eq!(available, vec!["Coverage".to_string()]);
            }
            other => panic!("expected SheetNotFound, got {:?}", other),
        }
    }

    // The test environment does not promise pdflatex, pandoc or a mail
    // server; whichever boundary is hit first, everything up to the
    // compiler must already be on disk.
    #[test]
    fn artifacts_up_to_the_compiler_boundary_survive_a_failed_run() {
        let dir = tempfile::tempdir().unwrap();
        write_workbook(&dir.path().join("coverage.xlsx"));
        let config_path = write_setup(dir.path(), "coverage.xlsx");

        let (logger, sink) = test_logger();
        let result = BatchRunner::new(config_path, logger).run();

        assert!(result.is_err());
        assert!(dir.path().join("out/heatmap.png").exists());
        let report = fs::read_to_string(dir.path().join("out/report.tex")).unwrap();
        assert!(report.contains("Test Coverage Report"));
        assert!(report.contains("\\begin{tabular}"));
        assert!(sink
            .tail(64)
            .iter()
            .any(|line| line.contains("Report generated")));
    }
}
