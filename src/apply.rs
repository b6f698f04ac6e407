use crate::{
    config::CollisionPolicy,
    detector::{base_name, DetectionResult},
    util::same_contents,
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppliedBatch {
    /// Positives now present in the output folder.
    pub copied: Vec<PathBuf>,
    /// Items the service flagged positive, whether or not the copy worked.
    pub flagged: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl AppliedBatch {
    pub fn positives(&self) -> usize {
        self.copied.len()
    }
}

/// Copies every file whose positional result is flagged into `out_dir`.
///
/// `files` and `results` must be the same length. Copy failures are logged and
/// left out of the positive count; they never abort the batch.
pub fn apply_results(
    files: &[PathBuf],
    results: &[DetectionResult],
    out_dir: &Path,
    policy: CollisionPolicy,
) -> Result<AppliedBatch> {
    if files.len() != results.len() {
        return Err(anyhow!(
            "result count {} does not match batch size {}",
            results.len(),
            files.len()
        ));
    }

    let mut applied = AppliedBatch::default();

    for (src, res) in files.iter().zip(results) {
        let name = base_name(src);
        if let Some(err) = &res.error {
            warn!("service could not process {name}: {err}");
        }
        if !res.has_bunny {
            debug!("no bunny detected in: {name}");
            continue;
        }
        applied.flagged += 1;

        match copy_positive(src, &name, out_dir, policy) {
            Ok(Some(dest)) => {
                info!(
                    "copied bunny image: {name} (confidence: {})",
                    res.top_confidence()
                        .map(|c| format!("{c:.3}"))
                        .unwrap_or_else(|| "n/a".into())
                );
                applied.copied.push(dest);
            }
            Ok(None) => {
                info!("skipped {name}: already present in output folder");
                applied.skipped += 1;
            }
            Err(err) => {
                warn!("copy failed for {}: {err:#}", src.display());
                applied.failed += 1;
            }
        }
    }

    Ok(applied)
}

fn copy_positive(
    src: &Path,
    name: &str,
    out_dir: &Path,
    policy: CollisionPolicy,
) -> Result<Option<PathBuf>> {
    let dest = out_dir.join(name);
    if is_same_file(src, &dest) {
        return Ok(Some(dest));
    }

    let dest = match policy {
        CollisionPolicy::Overwrite => dest,
        CollisionPolicy::Skip if dest.exists() => return Ok(None),
        CollisionPolicy::Skip => dest,
        CollisionPolicy::Rename => match rename_target(src, &dest)? {
            RenameTarget::Present(existing) => return Ok(Some(existing)),
            RenameTarget::Free(free) => free,
        },
    };

    std::fs::copy(src, &dest)
        .with_context(|| format!("copy {} -> {}", src.display(), dest.display()))?;
    Ok(Some(dest))
}

/// Copying a file onto itself truncates it before it is read.
fn is_same_file(src: &Path, dest: &Path) -> bool {
    match (src.canonicalize(), dest.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

enum RenameTarget {
    Present(PathBuf),
    Free(PathBuf),
}

/// Walks `dest`, `stem-1.ext`, `stem-2.ext`, ... and stops at the first name
/// that is free or already holds the same bytes as `src`.
fn rename_target(src: &Path, dest: &Path) -> Result<RenameTarget> {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = dest
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = dest.to_path_buf();
    let mut n = 0u32;
    loop {
        if !candidate.exists() {
            return Ok(RenameTarget::Free(candidate));
        }
        if same_contents(src, &candidate)? {
            return Ok(RenameTarget::Present(candidate));
        }
        n += 1;
        candidate = dest.with_file_name(format!("{stem}-{n}{ext}"));
    }
}
