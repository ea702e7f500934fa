use std::fs;

use tempfile::TempDir;

use ragdb_cli::Services;
use ragdb_core::config::{BackendKind, Settings};
use ragdb_core::traits::{Embedder, SearchBackend};
use ragdb_core::types::{SearchQuery, SearchType};

fn local_settings(dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.backend.kind = BackendKind::Local;
    settings.embedding.fake = true;
    settings.embedding.dimension = 48;
    settings.data.documents_dir = dir.path().display().to_string();
    settings
}

#[tokio::test]
async fn local_services_seed_from_documents_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("docs.json"),
        r#"[
            {"id":"doc_1","title":"Solar power","content":"Photovoltaic panels convert sunlight","category":"science"},
            {"id":"doc_2","title":"Kubernetes","content":"Container orchestration at scale","category":"technology"}
        ]"#,
    )
    .unwrap();

    let services = Services::build(local_settings(&tmp), tmp.path()).await.unwrap();
    assert_eq!(services.backend.name(), "local");
    assert_eq!(services.embedder.dim(), 48);

    let stats = services.documents.stats().await.unwrap();
    assert_eq!(stats.document_count, 2);

    let response = services
        .orchestrator
        .search(&SearchQuery::new("sunlight").with_search_type(SearchType::Text).with_min_score(0.0))
        .await
        .unwrap();
    assert_eq!(response.results[0].id, "doc_1");

    fs::write(
        tmp.path().join("more.jsonl"),
        "{\"title\":\"Rust\",\"content\":\"Memory safety\",\"category\":\"technology\"}\n",
    )
    .unwrap();
    let report = services.ingest_dir(tmp.path(), usize::MAX, false).await.unwrap();
    assert_eq!(report.indexed, 3, "re-ingesting keeps supplied ids and adds the new record");
    assert_eq!(services.documents.stats().await.unwrap().document_count, 3);
}

#[tokio::test]
async fn missing_documents_dir_leaves_local_backend_empty() {
    let tmp = TempDir::new().unwrap();
    let mut settings = local_settings(&tmp);
    settings.data.documents_dir = tmp.path().join("absent").display().to_string();
    let services = Services::build(settings, tmp.path()).await.unwrap();
    assert_eq!(services.documents.stats().await.unwrap().document_count, 0);
}
