use crate::{
    apply::apply_results,
    batch_plan::{BatchPlan, BatchRange},
    config::{Config, Sensitivity},
    detector::{accept_response, load_batch, Detector},
    discover::discover_images,
    progress::{ProgressSink, ScanProgress},
    report::{BatchReport, ScanReport, ScanSummary},
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sensitivity: Sensitivity,
}

/// Shared flag checked before every batch; cancelling lets the in-flight
/// batch finish and then ends the run as a failure.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

pub struct ScanOutcome {
    pub summary: ScanSummary,
    pub report: ScanReport,
}

/// Drives discovery, batch submission, copying and progress for one scan at a
/// time.
pub struct Orchestrator<D: Detector> {
    cfg: Config,
    detector: D,
    busy: AtomicBool,
    cancel: CancelToken,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<D: Detector> Orchestrator<D> {
    pub fn new(cfg: &Config, detector: D) -> Self {
        Self {
            cfg: cfg.clone(),
            detector,
            busy: AtomicBool::new(false),
            cancel: CancelToken::default(),
        }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs one scan to a terminal summary.
    ///
    /// Only fails outright when another scan is already in flight on this
    /// orchestrator; every other problem ends up in the returned summary.
    /// Files copied before a failure stay in place.
    pub fn run(&self, req: &ScanRequest, sink: &dyn ProgressSink) -> Result<ScanOutcome> {
        let _guard = self.acquire()?;
        self.cancel.reset();

        let started = now_rfc3339();
        info!(
            "starting scan input={} output={} sensitivity={}",
            req.input.display(),
            req.output.display(),
            req.sensitivity.as_str()
        );

        let mut batches = Vec::new();
        let mut total_files = 0usize;
        let summary = match self.scan(req, sink, &mut total_files, &mut batches) {
            Ok(summary) => summary,
            Err(err) => {
                let message = format!("{err:#}");
                error!("scan failed: {message}");
                ScanSummary::Failed { message }
            }
        };

        match &summary {
            ScanSummary::Completed {
                total_processed,
                positives_found,
            } => info!("processing complete: {positives_found} bunnies in {total_processed} files"),
            ScanSummary::NoFiles => info!("no image files found"),
            ScanSummary::Failed { .. } => {}
        }

        let report = ScanReport {
            input: req.input.display().to_string(),
            output: req.output.display().to_string(),
            sensitivity: req.sensitivity.as_str().to_string(),
            started,
            finished: now_rfc3339(),
            total_files,
            batches,
            summary: summary.clone(),
        };

        Ok(ScanOutcome { summary, report })
    }

    fn acquire(&self) -> Result<RunGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| anyhow!("a scan is already running"))?;
        Ok(RunGuard(&self.busy))
    }

    fn scan(
        &self,
        req: &ScanRequest,
        sink: &dyn ProgressSink,
        total_files: &mut usize,
        reports: &mut Vec<BatchReport>,
    ) -> Result<ScanSummary> {
        let t0 = Instant::now();

        let files = discover_images(&self.cfg, &req.input)
            .with_context(|| format!("scanning {}", req.input.display()))?;
        if files.is_empty() {
            return Ok(ScanSummary::NoFiles);
        }
        *total_files = files.len();

        self.prepare_output(&req.input, &req.output)?;

        let total = files.len();
        let plan = BatchPlan::new(total, self.cfg.batch_size());
        info!(
            "starting batch processing of {total} files in {} batches",
            plan.len()
        );
        debug!(?plan, "batch plan");

        sink.on_progress(ScanProgress {
            processed: 0,
            total,
            bunnies_found: 0,
        });

        let mut positives = 0usize;
        let mut processed = 0usize;

        for (i, range) in plan.batches.iter().enumerate() {
            if let Err(err) = self.check_continue(t0) {
                sink.on_error(&format!("{err:#}"));
                return Err(err);
            }

            let report = match self.process_batch(i, *range, &files, req) {
                Ok(report) => report,
                Err(err) => {
                    sink.on_error(&format!("Error processing batch: {err:#}"));
                    sink.on_progress(ScanProgress {
                        processed,
                        total,
                        bunnies_found: positives,
                    });
                    return Err(err);
                }
            };

            positives += report.copied;
            processed = range.end;
            reports.push(report);

            sink.on_progress(ScanProgress {
                processed,
                total,
                bunnies_found: positives,
            });

            let delay = self.cfg.scan.inter_batch_delay_ms;
            if delay > 0 && i + 1 < plan.len() {
                std::thread::sleep(Duration::from_millis(delay));
            }
        }

        Ok(ScanSummary::Completed {
            total_processed: total,
            positives_found: positives,
        })
    }

    fn check_continue(&self, t0: Instant) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(anyhow!("scan cancelled"));
        }
        let limit = self.cfg.scan.run_timeout_seconds;
        if limit > 0 && t0.elapsed().as_secs() >= limit {
            return Err(anyhow!("scan timeout exceeded: {limit}s"));
        }
        Ok(())
    }

    fn prepare_output(&self, input: &Path, out: &Path) -> Result<()> {
        if self.cfg.output.create_output_dir {
            ensure_dir(out)?;
        } else if !out.is_dir() {
            return Err(anyhow!("output is not a directory: {}", out.display()));
        }
        // Flat copies into the input root would overwrite source images.
        let same = match (input.canonicalize(), out.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if same {
            return Err(anyhow!(
                "output folder must differ from the input folder: {}",
                out.display()
            ));
        }
        Ok(())
    }

    fn process_batch(
        &self,
        index: usize,
        range: BatchRange,
        files: &[PathBuf],
        req: &ScanRequest,
    ) -> Result<BatchReport> {
        let started = Instant::now();
        let batch = &files[range.as_range()];
        info!(
            "processing batch {}: {} to {} of {}",
            index,
            range.offset,
            range.end,
            files.len()
        );

        let items = load_batch(batch)?;
        let resp = self
            .detector
            .detect_batch(items, req.sensitivity)
            .with_context(|| {
                format!("submitting batch {index} (files {}..{})", range.offset, range.end)
            })?;
        let results = accept_response(resp, batch.len())?;
        let applied = apply_results(batch, &results, &req.output, self.cfg.output.on_collision)?;

        info!(
            "batch {} done: flagged={} copied={} failed={}",
            index,
            applied.flagged,
            applied.positives(),
            applied.failed
        );

        Ok(BatchReport {
            index,
            range,
            flagged: applied.flagged,
            copied: applied.positives(),
            skipped: applied.skipped,
            failed_copies: applied.failed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}
