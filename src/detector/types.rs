use serde::{Deserialize, Serialize};

/// One file of a batch, loaded into memory for submission.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<DetectionResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub total_processed: Option<u64>,
    #[serde(default)]
    pub bunnies_found: Option<u64>,
}

/// Verdict for one submitted file; `results[i]` belongs to part `i` of the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub has_bunny: bool,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl DetectionResult {
    pub fn top_confidence(&self) -> Option<f64> {
        self.detections
            .iter()
            .map(|d| d.confidence)
            .fold(None, |best, c| Some(best.map_or(c, |b: f64| b.max(c))))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub confidence: f64,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    #[serde(default, rename = "class")]
    pub class_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub model_path: Option<String>,
}
