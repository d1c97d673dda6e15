//! Upload-and-analyze controller.
//!
//! Owns the selected file, the in-flight flag and the current result set. The UI
//! thread is the only owner; the network exchange happens on the analysis worker and
//! comes back through [`AnalysisController::finish_analysis`].

use chrono::{DateTime, Local};
use std::time::Instant;

use crate::analysis::{AnalysisOutcome, AnalysisRequest, SampleRecord, SelectedFile, count_anomalies};
use crate::ui::UICommand;

/// Notice shown when the user asks for an analysis before choosing a file.
pub const NO_FILE_NOTICE: &str = "Please select a file first!";
/// Notice shown for every failed analysis, whatever the cause.
pub const BACKEND_FAILURE_NOTICE: &str = "Failed to connect to backend.";

/// Hands an analysis request to whoever performs it.
pub trait AnalysisDispatch {
    /// Returns `false` if the request could not be accepted.
    fn dispatch(&mut self, request: AnalysisRequest) -> bool;
}

impl AnalysisDispatch for crate::UICommandQueueSender {
    fn dispatch(&mut self, request: AnalysisRequest) -> bool {
        self.try_send(UICommand::Analyze(request)).is_ok()
    }
}

/// Whether a request is outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting { file: SelectedFile, started_at: Instant },
}

/// Local reasons for not starting an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    NoFileSelected,
    AlreadySubmitting,
    DispatchFailed,
}

impl SubmitError {
    /// Text for the alert window, if the user should be told.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            SubmitError::NoFileSelected => Some(NO_FILE_NOTICE),
            SubmitError::AlreadySubmitting => None,
            SubmitError::DispatchFailed => Some(BACKEND_FAILURE_NOTICE),
        }
    }
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::NoFileSelected => write!(f, "No file selected"),
            SubmitError::AlreadySubmitting => write!(f, "An analysis is already in progress"),
            SubmitError::DispatchFailed => write!(f, "Analysis worker did not accept the request"),
        }
    }
}

pub struct AnalysisController {
    selected_file: Option<SelectedFile>,
    submission: SubmissionState,
    results: Vec<SampleRecord>,
    last_completed_at: Option<DateTime<Local>>,
    results_generation: u64,
}

impl Default for AnalysisController {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisController {
    pub fn new() -> Self {
        Self {
            selected_file: None,
            submission: SubmissionState::Idle,
            results: Vec::new(),
            last_completed_at: None,
            results_generation: 0,
        }
    }

    /// Remember the file chosen in the picker.
    ///
    /// Allowed at any time; a request already in flight keeps the file it was issued with.
    pub fn select_file(&mut self, file: SelectedFile) {
        log::debug!("Selected file {}", file.path.display());
        self.selected_file = Some(file);
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    #[cfg(test)]
    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.submission, SubmissionState::Submitting { .. })
    }

    pub fn results(&self) -> &[SampleRecord] {
        &self.results
    }

    /// Number of samples flagged as new organisms in the current results.
    pub fn anomaly_count(&self) -> usize {
        count_anomalies(&self.results)
    }

    pub fn last_completed_at(&self) -> Option<DateTime<Local>> {
        self.last_completed_at
    }

    /// Incremented every time the result set is replaced.
    pub fn results_generation(&self) -> u64 {
        self.results_generation
    }

    /// Start an analysis of the selected file.
    ///
    /// # Parameters
    ///
    /// * `dispatcher` - Receives the request when it is accepted
    ///
    /// # Returns
    ///
    /// `Ok(())` once the request has been handed over, otherwise the reason nothing
    /// was sent. Only an accepted request changes state.
    pub fn submit_analysis(&mut self, dispatcher: &mut dyn AnalysisDispatch) -> Result<(), SubmitError> {
        if self.is_submitting() {
            return Err(SubmitError::AlreadySubmitting);
        }
        let file = self.selected_file.clone().ok_or(SubmitError::NoFileSelected)?;

        self.submission = SubmissionState::Submitting {
            file: file.clone(),
            started_at: Instant::now(),
        };

        log::info!("Submitting {} for analysis", file.name);
        if !dispatcher.dispatch(AnalysisRequest { file }) {
            log::error!("Analysis request could not be queued");
            self.submission = SubmissionState::Idle;
            return Err(SubmitError::DispatchFailed);
        }
        Ok(())
    }

    /// Apply the worker's answer.
    ///
    /// On success the result set is replaced wholesale. On failure the previous
    /// results stay and the generic failure notice is returned. Either way the
    /// controller is idle afterwards.
    pub fn finish_analysis(&mut self, outcome: AnalysisOutcome) -> Option<&'static str> {
        let file = match std::mem::replace(&mut self.submission, SubmissionState::Idle) {
            SubmissionState::Submitting { file, started_at } => {
                log::debug!("Analysis of {} completed after {:?}", file.name, started_at.elapsed());
                file
            }
            SubmissionState::Idle => {
                log::warn!("Ignoring analysis completion while no request is outstanding");
                return None;
            }
        };

        match outcome {
            Ok(records) => {
                log::info!(
                    "Analysis of {} returned {} samples, {} new organisms",
                    file.name,
                    records.len(),
                    count_anomalies(&records)
                );
                self.results = records;
                self.results_generation += 1;
                self.last_completed_at = Some(Local::now());
                None
            }
            Err(e) => {
                log::error!("Analysis of {} failed: {}", file.name, e);
                Some(BACKEND_FAILURE_NOTICE)
            }
        }
    }
}
