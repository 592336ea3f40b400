use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use colored::Colorize;
use crossbeam_channel::{unbounded, Receiver, TryRecvError};

use crate::config::Config;
use crate::errors::CovError;
use crate::logging::{LogSink, Logger, MemorySink};
use crate::notify::send_notification;
use crate::pipeline::{RunState, Step};
use crate::plot::{render_heatmap, HeatmapOptions};
use crate::report::{compile_and_export, compose_report, pdf_path_for, CompiledArtifacts, REPORT_TITLE};
use crate::table::reader::read_coverage_table;

const NOTIFICATION_BODY: &str =
    "The latest test coverage report has been generated and is attached.";
const LOG_PANEL_LINES: usize = 8;

/// User actions, one per menu entry of the command center.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectInput(PathBuf),
    Analyze,
    GenerateReport,
    Notify,
}

enum WorkerEvent {
    CompileFinished(Result<CompiledArtifacts, CovError>),
}

/// Pure command-center core: consumes [`Action`]s, drives the run-state
/// machine, and exposes status/progress/alert for whatever front end sits
/// on top. No terminal I/O in here.
pub struct CommandCenter {
    config: Config,
    state: RunState,
    logger: Logger,
    status: String,
    alert: Option<String>,
    worker: Option<Receiver<WorkerEvent>>,
    heatmap_options: HeatmapOptions,
}

impl CommandCenter {
    pub fn new(config: Config, logger: Logger) -> Self {
        Self {
            config,
            state: RunState::ConfigLoaded,
            logger,
            status: "Ready".to_string(),
            alert: None,
            worker: None,
            heatmap_options: HeatmapOptions::default(),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.state.progress_percent()
    }

    /// The pending modal alert, cleared on read.
    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    pub fn compiling(&self) -> bool {
        self.worker.is_some()
    }

    pub fn handle(&mut self, action: Action) {
        match action {
            Action::SelectInput(path) => self.select_input(path),
            Action::Analyze => self.analyze(),
            Action::GenerateReport => self.generate_report(),
            Action::Notify => self.notify_colleagues(),
        }
    }

    /// Drain finished worker results. Returns true when something arrived.
    pub fn poll_worker(&mut self) -> bool {
        let Some(receiver) = &self.worker else {
            return false;
        };
        let event = match receiver.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                self.worker = None;
                self.fail(Step::CompilePdf, "compile worker exited unexpectedly");
                return true;
            }
        };
        self.worker = None;
        self.finish_compile(event);
        true
    }

    /// Block until the in-flight compile worker reports back.
    pub fn wait_for_worker(&mut self) {
        if let Some(receiver) = self.worker.take() {
            match receiver.recv() {
                Ok(event) => self.finish_compile(event),
                Err(_) => self.fail(Step::CompilePdf, "compile worker exited unexpectedly"),
            }
        }
    }

    fn finish_compile(&mut self, event: WorkerEvent) {
        let WorkerEvent::CompileFinished(result) = event;
        match result {
            Ok(artifacts) => {
                match self
                    .state
                    .clone()
                    .on_success(Step::CompilePdf)
                    .and_then(|state| state.on_success(Step::ExportHtml))
                {
                    Ok(state) => {
                        self.state = state;
                        self.status = format!(
                            "Report compiled successfully ({})",
                            artifacts.pdf.display()
                        );
                        self.logger.info("Report compiled successfully");
                    }
                    Err(err) => self.fail(Step::CompilePdf, &err.to_string()),
                }
            }
            Err(err) => self.fail(Step::CompilePdf, &err.to_string()),
        }
    }

    fn select_input(&mut self, path: PathBuf) {
        self.config.excel_file = path;
        self.status = format!("Selected: {}", self.config.excel_file.display());
        self.logger.info(&format!(
            "Spreadsheet updated to: {}",
            self.config.excel_file.display()
        ));
    }

    /// Read the spreadsheet and render the heatmap.
    fn analyze(&mut self) {
        if self.compiling() {
            self.refuse("A report compilation is still running");
            return;
        }
        self.status = "Loading data and generating heatmap...".to_string();
        // Re-running the analysis starts a fresh pass over the input.
        self.state = RunState::ConfigLoaded;

        let table = match read_coverage_table(
            &self.config.excel_file,
            &self.config.sheet_name,
            &self.logger,
        ) {
            Ok(table) => table,
            Err(err) => return self.fail(Step::LoadData, &err.to_string()),
        };
        self.state = RunState::DataLoaded;

        if let Err(err) = render_heatmap(
            &table,
            &self.config.heatmap_output,
            &self.heatmap_options,
            &self.logger,
        ) {
            return self.fail(Step::RenderHeatmap, &err.to_string());
        }
        self.state = RunState::HeatmapReady;
        self.status = "Heatmap generated successfully!".to_string();
    }

    /// Compose the report, then compile + export on a worker thread so the
    /// front end stays responsive while pdflatex runs.
    fn generate_report(&mut self) {
        if self.compiling() {
            self.refuse("A report compilation is already running");
            return;
        }
        match &self.state {
            RunState::ConfigLoaded | RunState::DataLoaded | RunState::Failed(_) => {
                self.refuse("Run the analysis before generating a report");
                return;
            }
            _ => {}
        }
        self.status = "Generating report...".to_string();
        // Regenerating rewinds to the post-analysis stage.
        self.state = RunState::HeatmapReady;

        // The table was discarded after the analysis step; read it again.
        let table = match read_coverage_table(
            &self.config.excel_file,
            &self.config.sheet_name,
            &self.logger,
        ) {
            Ok(table) => table,
            Err(err) => return self.fail(Step::ComposeReport, &err.to_string()),
        };

        let report_path = match compose_report(
            &table,
            &self.config.heatmap_output,
            &self.config.report_output_dir,
            &self.config.latex_template,
            &self.config.report_filename,
            &self.logger,
        ) {
            Ok(path) => path,
            Err(err) => return self.fail(Step::ComposeReport, &err.to_string()),
        };
        self.state = RunState::ReportWritten;
        self.status = "Compiling report...".to_string();

        let (sender, receiver) = unbounded();
        let worker_logger = self.logger.clone();
        thread::spawn(move || {
            let result = compile_and_export(&report_path, &worker_logger);
            // The receiver may be gone if the console quit; nothing to do.
            let _ = sender.send(WorkerEvent::CompileFinished(result));
        });
        self.worker = Some(receiver);
    }

    fn notify_colleagues(&mut self) {
        if self.compiling() {
            self.refuse("Wait for the report compilation to finish");
            return;
        }
        if self.state != RunState::Exported {
            self.refuse("Generate and compile the report before notifying");
            return;
        }
        self.status = "Sending notifications...".to_string();

        let attachment = pdf_path_for(&self.config.report_path());
        let result = self.config.email().and_then(|email| {
            send_notification(
                email,
                REPORT_TITLE,
                NOTIFICATION_BODY,
                Some(attachment.as_path()),
                &self.logger,
            )
        });
        match result {
            Ok(()) => {
                self.state = RunState::Notified;
                self.status = "Notifications sent successfully!".to_string();
            }
            Err(err) => self.fail(Step::Notify, &err.to_string()),
        }
    }

    fn fail(&mut self, step: Step, message: &str) {
        self.logger
            .error(&format!("{} failed: {}", step.description(), message));
        self.state = self.state.clone().on_failure(step, message);
        self.status = format!("Error: {}", step.description().to_lowercase());
        self.alert = Some(message.to_string());
    }

    /// An action refused in the current state; not a pipeline failure.
    fn refuse(&mut self, message: &str) {
        self.logger.warn(message);
        self.alert = Some(message.to_string());
    }
}

/// Terminal front end: menu, status line, progress indicator and log panel
/// around the [`CommandCenter`].
pub fn run_console(config_path: &Path) -> Result<(), CovError> {
    let panel = Arc::new(MemorySink::new(200));
    let logger = Logger::new(panel.clone() as Arc<dyn LogSink>);

    let config = Config::load(config_path, &logger)?;
    let mut center = CommandCenter::new(config, logger);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        center.poll_worker();
        render(&mut center, &panel);

        print!("{} ", ">".bold());
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let choice = line?;

        match choice.trim() {
            "1" => {
                print!("Path to spreadsheet: ");
                io::stdout().flush()?;
                match lines.next() {
                    Some(path_line) => {
                        let path = PathBuf::from(path_line?.trim());
                        center.handle(Action::SelectInput(path));
                    }
                    None => break,
                }
            }
            "2" => center.handle(Action::Analyze),
            "3" => center.handle(Action::GenerateReport),
            "4" => center.handle(Action::Notify),
            "5" | "q" | "quit" => break,
            "" => {}
            other => println!("Unknown choice: {}", other),
        }
    }

    if center.compiling() {
        println!("Waiting for the report compilation to finish...");
        center.wait_for_worker();
        render(&mut center, &panel);
    }
    Ok(())
}

fn render(center: &mut CommandCenter, panel: &MemorySink) {
    println!();
    println!("{}", "Coverage Command Center".bold());
    println!("  1) Select spreadsheet");
    println!("  2) Load & analyze coverage");
    println!("  3) Generate report");
    println!("  4) Notify colleagues");
    println!("  5) Quit");

    if let Some(alert) = center.take_alert() {
        println!();
        println!("{}", format!("  ! {}", alert).red().bold());
    }

    println!();
    println!("  Status: {}", center.status());
    println!(
        "  Progress: {} {}%",
        progress_bar(center.progress_percent()),
        center.progress_percent()
    );

    let tail = panel.tail(LOG_PANEL_LINES);
    if !tail.is_empty() {
        println!("  {}", "Log".bold());
        for line in tail {
            println!("    {}", line.dimmed());
        }
    }
}

fn progress_bar(percent: u8) -> String {
    let filled = (percent as usize * 20) / 100;
    format!(
        "[{}{}]",
        "#".repeat(filled).green(),
        "-".repeat(20 - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;
    use pretty_assertions::assert_eq;
    use rust_xlsxwriter::Workbook;
    use std::fs;

    const TEMPLATE: &str =
        "{{ title }}\n{{ summary }}\n{{ image_path }}\n{{ inline_table }}\n";

    fn test_logger() -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new(64));
        (Logger::new(sink.clone() as Arc<dyn LogSink>), sink)
    }

    fn workbook_at(path: &Path) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Coverage").unwrap();
        sheet.write_string(0, 0, "test").unwrap();
        sheet.write_string(0, 1, "auth").unwrap();
        sheet.write_string(1, 0, "test_login").unwrap();
        sheet.write_number(1, 1, 80).unwrap();
        workbook.save(path).unwrap();
    }

    fn center_in(dir: &Path) -> CommandCenter {
        workbook_at(&dir.join("coverage.xlsx"));
        fs::write(dir.join("template.tex"), TEMPLATE).unwrap();
        let config = Config {
            excel_file: dir.join("coverage.xlsx"),
            sheet_name: "Coverage".to_string(),
            heatmap_output: dir.join("out/heatmap.png"),
            latex_template: dir.join("template.tex"),
            report_output_dir: dir.join("out"),
            report_filename: "report.tex".to_string(),
            email: Some(EmailConfig {
                recipients: vec!["team@example.com".to_string()],
                smtp_server: "smtp.example.com".to_string(),
                smtp_port: 587,
                username: "reports@example.com".to_string(),
                password: "hunter2".to_string(),
            }),
        };
        let (logger, _) = test_logger();
        CommandCenter::new(config, logger)
    }

    #[test]
    fn starts_ready() {
        let dir = tempfile::tempdir().unwrap();
        let center = center_in(dir.path());
        assert_eq!(center.status(), "Ready");
        assert_eq!(center.state(), &RunState::ConfigLoaded);
    }

    #[test]
    fn select_input_updates_the_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let mut center = center_in(dir.path());

        center.handle(Action::SelectInput(PathBuf::from("/elsewhere/other.xlsx")));

        assert_eq!(center.config.excel_file, PathBuf::from("/elsewhere/other.xlsx"));
        assert!(center.status().contains("other.xlsx"));
    }

    #[test]
    fn analyze_renders_the_heatmap_and_advances_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut center = center_in(dir.path());

        center.handle(Action::Analyze);

        assert_eq!(center.state(), &RunState::HeatmapReady);
        assert!(dir.path().join("out/heatmap.png").exists());
        assert!(center.take_alert().is_none());
    }

    #[test]
    fn analyze_failure_alerts_and_resets_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut center = center_in(dir.path());
        center.handle(Action::SelectInput(dir.path().join("missing.xlsx")));

        center.handle(Action::Analyze);

        assert!(matches!(center.state(), RunState::Failed(_)));
        assert_eq!(center.progress_percent(), 0);
        assert!(center.take_alert().unwrap().contains("missing.xlsx"));
    }

    #[test]
    fn analyze_can_be_retried_after_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut center = center_in(dir.path());
        center.handle(Action::SelectInput(dir.path().join("missing.xlsx")));
        center.handle(Action::Analyze);
        assert!(matches!(center.state(), RunState::Failed(_)));

        center.handle(Action::SelectInput(dir.path().join("coverage.xlsx")));
        center.handle(Action::Analyze);

        assert_eq!(center.state(), &RunState::HeatmapReady);
    }

    #[test]
    fn report_requires_a_prior_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let mut center = center_in(dir.path());

        center.handle(Action::GenerateReport);

        assert_eq!(center.state(), &RunState::ConfigLoaded);
        assert!(center.take_alert().unwrap().contains("analysis"));
    }

    #[test]
    fn generate_report_composes_and_hands_off_to_the_worker() {
        let dir = tempfile::tempdir().unwrap();
        let mut center = center_in(dir.path());
        center.handle(Action::Analyze);

        center.handle(Action::GenerateReport);
        assert!(dir.path().join("out/report.tex").exists());

        center.wait_for_worker();
        // pdflatex is not promised in the test environment: either the
        // worker compiled both artifacts or the failure surfaced as an
        // alert with progress reset.
        let state = center.state().clone();
        match state {
            RunState::Exported => assert!(center.take_alert().is_none()),
            RunState::Failed(_) => {
                assert_eq!(center.progress_percent(), 0);
                assert!(center.take_alert().is_some());
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn notify_is_refused_until_the_report_is_exported() {
        let dir = tempfile::tempdir().unwrap();
        let mut center = center_in(dir.path());
        center.handle(Action::Analyze);

        center.handle(Action::Notify);

        assert!(center.take_alert().unwrap().contains("report"));
        assert_eq!(center.state(), &RunState::HeatmapReady);
    }
}
