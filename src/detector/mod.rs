pub mod http;
pub mod types;

use crate::config::Sensitivity;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub use types::{BatchItem, Detection, DetectionResponse, DetectionResult, HealthStatus};

pub trait Detector {
    fn health(&self) -> Result<HealthStatus>;
    fn detect_batch(
        &self,
        items: Vec<BatchItem>,
        sensitivity: Sensitivity,
    ) -> Result<DetectionResponse>;
}

/// Reads every file of one batch into memory, in order.
pub fn load_batch(files: &[PathBuf]) -> Result<Vec<BatchItem>> {
    files
        .iter()
        .map(|path| {
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(BatchItem {
                file_name: base_name(path),
                bytes,
            })
        })
        .collect()
}

pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Checks a response against the batch it answers and hands back its results.
pub fn accept_response(resp: DetectionResponse, expected: usize) -> Result<Vec<DetectionResult>> {
    if !resp.success {
        return Err(anyhow!(
            "detection service reported failure: {}",
            resp.error.as_deref().unwrap_or("no error message")
        ));
    }
    if resp.results.len() != expected {
        return Err(anyhow!(
            "detection service returned {} results for a batch of {}",
            resp.results.len(),
            expected
        ));
    }
    Ok(resp.results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(success: bool, n: usize) -> DetectionResponse {
        DetectionResponse {
            success,
            results: vec![DetectionResult::default(); n],
            error: (!success).then(|| "model not loaded".to_string()),
            total_processed: None,
            bunnies_found: None,
        }
    }

    #[test]
    fn rejects_reported_failure() {
        let err = accept_response(response(false, 0), 0).unwrap_err();
        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(accept_response(response(true, 2), 3).is_err());
        assert_eq!(accept_response(response(true, 3), 3).unwrap().len(), 3);
    }

    #[test]
    fn parses_service_payload() {
        let raw = r#"{"success":true,"results":[
            {"filename":"a.jpg","has_bunny":true,"detections":[{"bbox":[1,2,3,4],"confidence":0.4,"class":"bunny"},{"confidence":0.9}]},
            {"filename":"b.jpg","error":"cannot identify image file","has_bunny":false}
        ],"total_processed":2,"bunnies_found":1}"#;
        let resp: DetectionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].top_confidence(), Some(0.9));
        assert_eq!(resp.results[0].detections[0].class_name.as_deref(), Some("bunny"));
        assert!(resp.results[1].error.is_some());
        assert_eq!(resp.results[1].top_confidence(), None);
    }
}
