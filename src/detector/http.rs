use super::{types::*, Detector};
use crate::config::{Config, Sensitivity};
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{multipart, Client, Response};
use std::time::Duration;
use tracing::debug;

/// Talks to the detection service over HTTP, one blocking request per batch.
pub struct HttpDetector {
    client: Client,
    url: String,
    health_url: String,
    field_name: String,
    sensitivity_field: Option<String>,
}

impl HttpDetector {
    pub fn new(cfg: &Config) -> Result<Self> {
        let svc = &cfg.service;
        if svc.field_name.trim().is_empty() {
            return Err(anyhow!("service.field_name must not be empty"));
        }

        let timeout = (svc.timeout_seconds > 0).then(|| Duration::from_secs(svc.timeout_seconds));
        let connect_timeout = (svc.connect_timeout_seconds > 0)
            .then(|| Duration::from_secs(svc.connect_timeout_seconds));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .with_context(|| "building HTTP client")?;

        let sensitivity_field = Some(svc.sensitivity_field.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        Ok(Self {
            client,
            url: svc.url.clone(),
            health_url: svc.health_url.clone(),
            field_name: svc.field_name.clone(),
            sensitivity_field,
        })
    }

    fn build_form(&self, items: Vec<BatchItem>, sensitivity: Sensitivity) -> Result<multipart::Form> {
        let mut form = multipart::Form::new();
        for item in items {
            let mime = mime_for(&item.file_name);
            let part = multipart::Part::bytes(item.bytes)
                .file_name(item.file_name)
                .mime_str(mime)
                .with_context(|| format!("invalid mime type {mime}"))?;
            form = form.part(self.field_name.clone(), part);
        }
        if let Some(field) = &self.sensitivity_field {
            form = form.text(field.clone(), sensitivity.as_str());
        }
        Ok(form)
    }
}

impl Detector for HttpDetector {
    fn health(&self) -> Result<HealthStatus> {
        let resp = self
            .client
            .get(&self.health_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .with_context(|| format!("GET {}", self.health_url))?;
        decode_json(resp, &self.health_url)
    }

    fn detect_batch(
        &self,
        items: Vec<BatchItem>,
        sensitivity: Sensitivity,
    ) -> Result<DetectionResponse> {
        let count = items.len();
        let form = self.build_form(items, sensitivity)?;
        debug!("POST {} parts={count}", self.url);

        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .with_context(|| format!("POST {}", self.url))?;
        decode_json(resp, &self.url)
    }
}

fn decode_json<O: for<'de> serde::Deserialize<'de>>(resp: Response, url: &str) -> Result<O> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(anyhow!("HTTP error from {url}: status {status}, body: {}", body.trim()));
    }
    let body = resp
        .bytes()
        .with_context(|| format!("reading response body from {url}"))?;
    serde_json::from_slice(&body).with_context(|| format!("parsing JSON response from {url}"))
}

fn mime_for(file_name: &str) -> &'static str {
    match crate::util::extension_lower(std::path::Path::new(file_name)).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for("a.JPEG"), "image/jpeg");
        assert_eq!(mime_for("b.png"), "image/png");
        assert_eq!(mime_for("c"), "application/octet-stream");
    }

    #[test]
    fn blank_field_name_is_rejected() {
        let mut cfg = Config::default();
        cfg.service.field_name = " ".into();
        assert!(HttpDetector::new(&cfg).is_err());
    }
}
