use crate::errors::CovError;

mod runner;

pub use runner::BatchRunner;

/// One forward transition of the pipeline. Configuration loading is not a
/// step: a runner cannot exist without a loaded configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    LoadData,
    RenderHeatmap,
    ComposeReport,
    CompilePdf,
    ExportHtml,
    Notify,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::LoadData,
        Step::RenderHeatmap,
        Step::ComposeReport,
        Step::CompilePdf,
        Step::ExportHtml,
        Step::Notify,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            Step::LoadData => "Load spreadsheet data",
            Step::RenderHeatmap => "Generate heatmap",
            Step::ComposeReport => "Generate report",
            Step::CompilePdf => "Compile report to PDF",
            Step::ExportHtml => "Export report to HTML",
            Step::Notify => "Send email notification",
        }
    }
}

/// Linear, terminal-on-failure run state. The machine itself never touches
/// I/O; the runners feed it step outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Idle,
    ConfigLoaded,
    DataLoaded,
    HeatmapReady,
    ReportWritten,
    Compiled,
    Exported,
    Notified,
    Done,
    Failed(String),
}

impl RunState {
    /// The only step allowed to run next, if any.
    pub fn expected_step(&self) -> Option<Step> {
        match self {
            RunState::ConfigLoaded => Some(Step::LoadData),
            RunState::DataLoaded => Some(Step::RenderHeatmap),
            RunState::HeatmapReady => Some(Step::ComposeReport),
            RunState::ReportWritten => Some(Step::CompilePdf),
            RunState::Compiled => Some(Step::ExportHtml),
            RunState::Exported => Some(Step::Notify),
            RunState::Idle
            | RunState::Notified
            | RunState::Done
            | RunState::Failed(_) => None,
        }
    }

    pub fn on_config_loaded(self) -> Result<RunState, CovError> {
        match self {
            RunState::Idle => Ok(RunState::ConfigLoaded),
            other => Err(CovError::State(format!(
                "Configuration can only be loaded from Idle, not {:?}",
                other
            ))),
        }
    }

    pub fn on_success(self, step: Step) -> Result<RunState, CovError> {
        if self.expected_step() != Some(step) {
            return Err(CovError::State(format!(
                "Step {:?} cannot run in state {:?}",
                step, self
            )));
        }
        Ok(match step {
            Step::LoadData => RunState::DataLoaded,
            Step::RenderHeatmap => RunState::HeatmapReady,
            Step::ComposeReport => RunState::ReportWritten,
            Step::CompilePdf => RunState::Compiled,
            Step::ExportHtml => RunState::Exported,
            Step::Notify => RunState::Notified,
        })
    }

    pub fn on_failure(self, step: Step, message: &str) -> RunState {
        RunState::Failed(format!("{}: {}", step.description(), message))
    }

    pub fn finish(self) -> Result<RunState, CovError> {
        match self {
            RunState::Notified => Ok(RunState::Done),
            other => Err(CovError::State(format!(
                "Run can only finish from Notified, not {:?}",
                other
            ))),
        }
    }

    /// Position on the progress indicator. A failed run shows 0 again.
    pub fn progress_percent(&self) -> u8 {
        let milestone = match self {
            RunState::Idle | RunState::Failed(_) => 0,
            RunState::ConfigLoaded => 1,
            RunState::DataLoaded => 2,
            RunState::HeatmapReady => 3,
            RunState::ReportWritten => 4,
            RunState::Compiled => 5,
            RunState::Exported => 6,
            RunState::Notified => 7,
            RunState::Done => 8,
        };
        (milestone * 100 / 8) as u8
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_walk_reaches_done() {
        let mut state = RunState::Idle.on_config_loaded().unwrap();
        for step in Step::ALL {
            assert_eq!(state.expected_step(), Some(step));
            state = state.on_success(step).unwrap();
        }
        assert_eq!(state, RunState::Notified);
        let state = state.finish().unwrap();
        assert_eq!(state, RunState::Done);
        assert_eq!(state.progress_percent(), 100);
        assert!(state.is_terminal());
    }

    #[test]
    fn out_of_order_steps_are_rejected() {
        let state = RunState::Idle.on_config_loaded().unwrap();
        assert!(matches!(
            state.clone().on_success(Step::Notify),
            Err(CovError::State(_))
        ));
        assert!(matches!(
            state.on_success(Step::CompilePdf),
            Err(CovError::State(_))
        ));
        assert!(matches!(
            RunState::Idle.on_success(Step::LoadData),
            Err(CovError::State(_))
        ));
    }

    #[test]
    fn failure_is_terminal_and_resets_progress() {
        let state = RunState::ConfigLoaded.on_success(Step::LoadData).unwrap();
        assert_eq!(state.progress_percent(), 25);

        let failed = state.on_failure(Step::RenderHeatmap, "disk full");
        assert_eq!(
            failed,
            RunState::Failed("Generate heatmap: disk full".to_string())
        );
        assert_eq!(failed.progress_percent(), 0);
        assert!(failed.is_terminal());
        assert_eq!(failed.expected_step(), None);
    }

    #[test]
    fn finish_requires_notified() {
        assert!(RunState::Exported.finish().is_err());
        assert!(RunState::Idle.finish().is_err());
    }

    #[test]
    fn config_reload_requires_idle() {
        assert!(RunState::DataLoaded.on_config_loaded().is_err());
    }

    #[test]
    fn progress_is_monotonic_along_the_happy_path() {
        let mut state = RunState::Idle;
        let mut last = state.progress_percent();
        state = state.on_config_loaded().unwrap();
        for step in Step::ALL {
            assert!(state.progress_percent() > last);
            last = state.progress_percent();
            state = state.on_success(step).unwrap();
        }
        assert!(state.finish().unwrap().progress_percent() > last);
    }
}
