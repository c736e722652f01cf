//! Source document loading for the ingestion pipeline.
//!
//! Walks the configured data directory, keeps files matching the include
//! globs (PDF, Markdown, plain text by default), and extracts their text.
//! A file that fails extraction is reported and skipped; it does not abort
//! the scan.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::IngestConfig;

/// A loaded source document ready for splitting.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the data directory, used as the chunk source label.
    pub source: String,
    pub text: String,
}

/// Scan the data directory and load every matching document.
///
/// Results are sorted by relative path so repeated runs process files in a
/// deterministic order.
pub fn scan_data_dir(config: &IngestConfig) -> Result<Vec<SourceDocument>> {
    let root = &config.data_dir;
    if !root.exists() {
        bail!("data directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let mut documents = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if !include_set.is_match(&rel_str) {
            continue;
        }

        match extract_text(path) {
            Ok(text) => documents.push(SourceDocument {
                source: rel_str,
                text,
            }),
            Err(e) => {
                eprintln!("skipping {}: {}", rel_str, e);
            }
        }
    }

    documents.sort_by(|a, b| a.source.cmp(&b.source));

    Ok(documents)
}

/// Extract plain text from a single file based on its extension.
pub fn extract_text(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => {
            let bytes = std::fs::read(path)?;
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))
        }
        "md" | "txt" => Ok(std::fs::read_to_string(path)?),
        other => bail!("unsupported file extension: .{}", other),
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ingest_config(dir: &Path) -> IngestConfig {
        IngestConfig {
            data_dir: dir.to_path_buf(),
            ..IngestConfig::default()
        }
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "beta").unwrap();
        fs::write(tmp.path().join("a.md"), "alpha").unwrap();
        fs::write(tmp.path().join("ignore.csv"), "nope").unwrap();

        let docs = scan_data_dir(&ingest_config(tmp.path())).unwrap();
        let sources: Vec<&str> = docs.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["a.md", "b.txt"]);
        assert_eq!(docs[0].text, "alpha");
    }

    #[test]
    fn test_missing_dir_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let gone = tmp.path().join("missing");
        assert!(scan_data_dir(&ingest_config(&gone)).is_err());
    }

    #[test]
    fn test_bad_pdf_is_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("broken.pdf"), b"not a pdf").unwrap();
        fs::write(tmp.path().join("ok.txt"), "fine").unwrap();

        let docs = scan_data_dir(&ingest_config(tmp.path())).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "ok.txt");
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data.bin");
        fs::write(&path, "x").unwrap();
        assert!(extract_text(&path).is_err());
    }
}
