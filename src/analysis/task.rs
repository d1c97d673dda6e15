//! Background task performing analysis requests off the UI thread.
//!
//! Runs on its own Embassy executor thread. The HTTP exchange is blocking, which is
//! fine here: the task is the only one on its executor and the controller never has
//! more than one request outstanding.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use super::client::{AnalysisBackend, AnalysisClient, AnalysisError};
use super::types::AnalysisRequest;
use super::AnalysisOutcome;
use crate::ui::{UICommand, UIRefreshState};
use crate::{UICommandQueueReceiver, UIRefreshQueueSender};

/// Main analysis task.
///
/// # Parameters
///
/// * `client` - Client bound to the configured service endpoint
/// * `ui_command_rx` - Channel delivering `UICommand::Analyze` requests
/// * `ui_refresh_tx` - Channel for reporting each outcome back to the UI
#[embassy_executor::task]
pub async fn analysis_task(client: AnalysisClient, ui_command_rx: UICommandQueueReceiver, ui_refresh_tx: UIRefreshQueueSender) {
    log::info!("Analysis task started, endpoint: {}", client.endpoint());

    loop {
        match ui_command_rx.receive().await {
            UICommand::Analyze(request) => {
                let started = Instant::now();
                let outcome = run_analysis(&client, &request);
                log::debug!(
                    "Analysis of {} finished in {} ms ({})",
                    request.file.name,
                    started.elapsed().as_millis(),
                    if outcome.is_ok() { "ok" } else { "failed" }
                );
                ui_refresh_tx.send(UIRefreshState::AnalysisFinished(outcome)).await;
            }
        }
    }
}

/// Run one request against `backend`, always producing an outcome.
///
/// A panic inside the backend is reported as [`AnalysisError::Interrupted`] so the
/// UI still receives a completion and leaves the submitting state.
pub fn run_analysis(backend: &dyn AnalysisBackend, request: &AnalysisRequest) -> AnalysisOutcome {
    match std::panic::catch_unwind(AssertUnwindSafe(|| backend.analyze(request))) {
        Ok(outcome) => outcome,
        Err(_) => {
            log::error!("Analysis backend panicked while processing {}", request.file.name);
            Err(AnalysisError::Interrupted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{SampleRecord, SampleStatus, SelectedFile};
    use std::cell::Cell;

    struct CountingBackend {
        calls: Cell<usize>,
    }

    impl AnalysisBackend for CountingBackend {
        fn analyze(&self, _request: &AnalysisRequest) -> Result<Vec<SampleRecord>, AnalysisError> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![SampleRecord {
                status: SampleStatus::NewOrganism,
                pca_x: 0.0,
                pca_y: 0.0,
                latitude: 0.0,
                longitude: 160.0,
                location: "Uncharted Zone X".to_string(),
                sequence: None,
            }])
        }
    }

    struct PanickingBackend;

    impl AnalysisBackend for PanickingBackend {
        fn analyze(&self, _request: &AnalysisRequest) -> Result<Vec<SampleRecord>, AnalysisError> {
            panic!("decoder blew up");
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            file: SelectedFile::from_path("edna_data.csv"),
        }
    }

    #[test]
    fn outcome_is_passed_through() {
        let backend = CountingBackend { calls: Cell::new(0) };
        let outcome = run_analysis(&backend, &request());
        assert_eq!(backend.calls.get(), 1);
        assert_eq!(outcome.unwrap().len(), 1);
    }

    #[test]
    fn panic_becomes_interrupted_error() {
        let outcome = run_analysis(&PanickingBackend, &request());
        assert!(matches!(outcome, Err(AnalysisError::Interrupted)));
    }
}
