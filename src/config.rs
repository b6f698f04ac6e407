use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub scan: Scan,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    pub fn batch_size(&self) -> usize {
        self.scan.batch_size.max(1)
    }
}

/// How much evidence the user wants before an image counts as a hit.
///
/// The detection service defines what each level means; the scanner only
/// forwards it when `service.sensitivity_field` is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    High,
    Medium,
    Low,
}

impl Sensitivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::High => "high",
            Sensitivity::Medium => "medium",
            Sensitivity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub url: String,
    pub health_url: String,
    pub field_name: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub sensitivity_field: String,
}
impl Default for Service {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5001/detect-batch".into(),
            health_url: "http://127.0.0.1:5001/health".into(),
            field_name: "images".into(),
            timeout_seconds: 120,
            connect_timeout_seconds: 10,
            sensitivity_field: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scan {
    pub batch_size: usize,
    pub extensions: Vec<String>,
    pub inter_batch_delay_ms: u64,
    pub follow_links: bool,
    pub run_timeout_seconds: u64,
    pub default_sensitivity: Sensitivity,
}
impl Default for Scan {
    fn default() -> Self {
        Self {
            batch_size: 20,
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            inter_batch_delay_ms: 100,
            follow_links: false,
            run_timeout_seconds: 0,
            default_sensitivity: Sensitivity::Medium,
        }
    }
}

/// What to do when a positive's base name already exists in the output folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    Overwrite,
    Skip,
    Rename,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub on_collision: CollisionPolicy,
    pub create_output_dir: bool,
    pub emit_events: bool,
    pub report_path: String,
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            on_collision: CollisionPolicy::Overwrite,
            create_output_dir: true,
            emit_events: true,
            report_path: "".into(),
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
