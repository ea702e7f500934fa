//! Loads documents to ingest from `*.json` / `*.jsonl` files.
//!
//! A `.json` file holds either one document object or an array of them; a
//! `.jsonl` file holds one document object per non-empty line. Files are
//! visited in sorted path order so ingestion is reproducible.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::NewDocument;

#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    /// Category used when a record leaves it empty; `None` takes the parent directory name.
    pub fallback_category: Option<String>,
}

#[derive(Default)]
pub struct DocumentLoader {
    config: LoaderConfig,
}

impl DocumentLoader {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: LoaderConfig) -> Self { Self { config } }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<NewDocument>> {
        self.load_directory_limited(data_dir, usize::MAX)
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<NewDocument>> {
        let mut files = self.list_document_files(data_dir);
        if files.is_empty() {
            warn!("No .json/.jsonl files found under {}", data_dir.display());
            return Ok(vec![]);
        }
        if files.len() > limit {
            files.truncate(limit);
            info!("Limited to first {} files", limit);
        }
        let mut documents = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            info!("Loading file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let mut loaded = self.load_file(file_path)?;
            let fallback = self.fallback_category(file_path, data_dir);
            for doc in &mut loaded {
                if doc.category.trim().is_empty() {
                    doc.category = fallback.clone();
                }
            }
            documents.extend(loaded);
        }
        info!("Loaded {} documents from {} files", documents.len(), files.len());
        Ok(documents)
    }

    pub fn load_file(&self, file_path: &Path) -> Result<Vec<NewDocument>> {
        let raw = fs::read_to_string(file_path).with_context(|| format!("reading {}", file_path.display()))?;
        let is_jsonl = file_path.extension().and_then(|s| s.to_str()) == Some("jsonl");
        if is_jsonl {
            return raw
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(n, line)| {
                    serde_json::from_str::<NewDocument>(line)
                        .with_context(|| format!("{}:{}: invalid document", file_path.display(), n + 1))
                })
                .collect();
        }
        let value: serde_json::Value =
            serde_json::from_str(&raw).with_context(|| format!("{}: invalid JSON", file_path.display()))?;
        let docs: serde_json::Result<Vec<NewDocument>> = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value::<NewDocument>(value).map(|d| vec![d])
        };
        docs.with_context(|| format!("{}: invalid document", file_path.display()))
    }

    fn fallback_category(&self, file_path: &Path, data_dir: &Path) -> String {
        if let Some(category) = &self.config.fallback_category {
            return category.clone();
        }
        let relative_path = file_path.strip_prefix(data_dir).unwrap_or(file_path);
        relative_path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "misc".to_string())
    }

    fn list_document_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")))
            .collect();
        files.sort();
        files
    }
}
