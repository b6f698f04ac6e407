use crate::batch_plan::BatchRange;
use serde::{Deserialize, Serialize};

pub const NO_FILES_MESSAGE: &str = "No image files found in the selected folder";

/// Terminal value of one scan run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanSummary {
    Completed {
        total_processed: usize,
        positives_found: usize,
    },
    NoFiles,
    Failed {
        message: String,
    },
}

impl ScanSummary {
    pub fn is_success(&self) -> bool {
        matches!(self, ScanSummary::Completed { .. })
    }

    pub fn to_response(&self) -> ScanResponse {
        match self {
            ScanSummary::Completed {
                total_processed,
                positives_found,
            } => ScanResponse {
                success: true,
                bunnies_found: Some(*positives_found),
                total_processed: Some(*total_processed),
                error: None,
            },
            ScanSummary::NoFiles => ScanResponse::failure(NO_FILES_MESSAGE),
            ScanSummary::Failed { message } => ScanResponse::failure(message),
        }
    }
}

/// Wire form of a scan outcome as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bunnies_found: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_processed: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResponse {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            bunnies_found: None,
            total_processed: None,
            error: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub index: usize,
    pub range: BatchRange,
    pub flagged: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed_copies: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub input: String,
    pub output: String,
    pub sensitivity: String,
    pub started: String,
    pub finished: String,
    pub total_files: usize,
    pub batches: Vec<BatchReport>,
    pub summary: ScanSummary,
}
