//! Analysis module: talks to the remote eDNA analysis service.
//!
//! - `types`: wire format of the service (sample records, response envelope)
//! - `client`: blocking multipart upload client and the `AnalysisBackend` seam
//! - `task`: background Embassy task that serves the UI's analysis requests

pub mod client;
pub mod task;
pub mod types;

pub use client::{AnalysisClient, AnalysisError};
pub use task::analysis_task;
pub use types::{AnalysisRequest, SampleRecord, SampleStatus, SelectedFile, count_anomalies};

/// Result of one analysis round-trip as delivered to the UI.
pub type AnalysisOutcome = Result<Vec<SampleRecord>, AnalysisError>;
