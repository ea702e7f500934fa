//! Process wiring shared by the `ragdb` and `ragdb-bench` binaries: builds the
//! embedder and backend once from settings and hands them to the services.
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragdb_core::config::{resolve_with_base, BackendKind, Settings};
use ragdb_core::data_loader::DocumentLoader;
use ragdb_core::traits::{Embedder, SearchBackend};
use ragdb_core::types::BulkReport;
use ragdb_elastic::ElasticBackend;
use ragdb_embed::get_default_embedder;
use ragdb_local::LocalBackend;
use ragdb_query::{DocumentService, OrchestratorConfig, SearchOrchestrator};

pub mod latency;

pub const INGEST_BATCH: usize = 32;

/// `RUST_LOG` wins; otherwise `log.level` from settings.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub struct Services {
    pub settings: Settings,
    pub embedder: Arc<dyn Embedder>,
    pub backend: Arc<dyn SearchBackend>,
    pub documents: DocumentService,
    pub orchestrator: SearchOrchestrator,
}

impl Services {
    /// The local backend lives in memory, so it is seeded from
    /// `data.documents_dir` (relative to `base_dir`) on every start.
    pub async fn build(settings: Settings, base_dir: &Path) -> Result<Self> {
        let embedder = get_default_embedder(&settings.embedding)?;
        let backend: Arc<dyn SearchBackend> = match settings.backend.kind {
            BackendKind::Elastic => Arc::new(ElasticBackend::new(&settings.elasticsearch)?),
            BackendKind::Local => Arc::new(LocalBackend::new(settings.elasticsearch.index.clone())?),
        };
        let config = OrchestratorConfig::from_settings(&settings);
        let documents = DocumentService::new(
            embedder.clone(),
            backend.clone(),
            settings.embedding.dimension,
            config.request_timeout,
        );
        let orchestrator = SearchOrchestrator::new(embedder.clone(), backend.clone(), config);
        let services = Self { settings, embedder, backend, documents, orchestrator };
        if services.settings.backend.kind == BackendKind::Local {
            services.documents.ensure_index(false).await?;
            let dir = resolve_with_base(base_dir, &services.settings.data.documents_dir);
            if dir.is_dir() {
                let report = services.ingest_dir(&dir, usize::MAX, false).await?;
                info!("Seeded local backend with {} documents from {}", report.indexed, dir.display());
            }
        }
        Ok(services)
    }

    /// Loads `*.json`/`*.jsonl` files under `dir` (at most `file_limit`
    /// files) and ingests them in batches.
    pub async fn ingest_dir(&self, dir: &Path, file_limit: usize, show_progress: bool) -> Result<BulkReport> {
        let docs = DocumentLoader::new().load_directory_limited(dir, file_limit)?;
        let pb = if show_progress { ProgressBar::new(docs.len() as u64) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        let mut total = BulkReport::default();
        for batch in docs.chunks(INGEST_BATCH) {
            let report = self.documents.ingest(batch.to_vec()).await?;
            total.indexed += report.indexed;
            total.failed += report.failed;
            total.ids.extend(report.ids);
            pb.inc(batch.len() as u64);
        }
        pb.finish_with_message(format!("{} indexed, {} failed", total.indexed, total.failed));
        Ok(total)
    }
}
