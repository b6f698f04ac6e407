use crate::{config::Config, util::extension_lower};
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Recursively collects files under `root` whose extension is in the
/// configured allow-list.
///
/// Entries are visited depth-first in file-name order so repeated scans of the
/// same tree produce the same list. Unreadable directories, broken links and
/// link cycles are logged and skipped; only a missing or non-directory root is
/// an error.
pub fn discover_images(cfg: &Config, root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(anyhow!("input is not a directory: {}", root.display()));
    }

    let allowed = normalized_extensions(&cfg.scan.extensions);
    let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let mut files = Vec::new();

    let walker = WalkDir::new(&root)
        .follow_links(cfg.scan.follow_links)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                let at = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".into());
                warn!("skipping unreadable entry {at}: {err}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(ext) = extension_lower(entry.path()) {
            if allowed.iter().any(|a| *a == ext) {
                debug!("found image: {}", entry.path().display());
                files.push(entry.into_path());
            }
        }
    }

    info!("total images found: {}", files.len());
    Ok(files)
}

fn normalized_extensions(exts: &[String]) -> Vec<String> {
    exts.iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_tolerate_dots_and_case() {
        let exts = vec![".JPG".to_string(), " png ".to_string(), "".to_string()];
        assert_eq!(normalized_extensions(&exts), vec!["jpg", "png"]);
    }
}
