use ragdb_core::filter::Predicate;
use ragdb_core::traits::{Embedder, SearchBackend};
use ragdb_core::fusion::FusionWeights;
use ragdb_core::types::{Document, HybridQuery, TextQuery, VectorQuery};
use ragdb_embed::FakeEmbedder;
use ragdb_local::LocalBackend;

const DIM: usize = 64;

fn corpus(embedder: &FakeEmbedder) -> Vec<Document> {
    let raw = [
        ("doc_001", "Machine learning basics", "Neural networks learn patterns from data", "technology", vec!["ai", "ml"]),
        ("doc_002", "Climate science", "Ocean temperatures and carbon cycles shape the climate", "science", vec!["climate"]),
        ("doc_003", "Market trends", "Quarterly business growth and market trends", "business", vec!["markets"]),
        ("doc_004", "Deep learning", "Deep neural networks for vision and language", "technology", vec!["ai"]),
    ];
    raw.into_iter()
        .map(|(id, title, content, category, tags)| {
            let mut doc = Document {
                id: id.into(),
                title: title.into(),
                content: content.into(),
                category: category.into(),
                tags: tags.into_iter().map(String::from).collect(),
                metadata: Default::default(),
                embedding: None,
                created_at: None,
                updated_at: None,
            };
            doc.embedding = Some(embedder.embed(&doc.embedding_text()).unwrap());
            doc
        })
        .collect()
}

async fn seeded() -> (LocalBackend, FakeEmbedder) {
    let embedder = FakeEmbedder::new(DIM);
    let backend = LocalBackend::new("test_index").unwrap();
    backend.ensure_index(DIM, true).await.unwrap();
    let report = backend.index_batch(&corpus(&embedder)).await.unwrap();
    assert_eq!(report.indexed, 4);
    assert_eq!(report.failed, 0);
    (backend, embedder)
}

#[tokio::test]
async fn local_full_flow() {
    let (backend, embedder) = seeded().await;

    let vector = embedder.embed("Deep learning Deep neural networks for vision and language").unwrap();
    let hits = backend
        .vector_search(&VectorQuery { vector: vector.clone(), k: 3, num_candidates: 6, filter: None })
        .await
        .unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].document.id, "doc_004");
    assert!((hits[0].score - 1.0).abs() < 1e-4, "identical text scores (1+1)/2");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(hits.iter().all(|h| h.document.embedding.is_none()), "vectors are not returned");

    let tech = Predicate::Equals { field: "category".into(), value: "technology".into() };
    let hits = backend
        .vector_search(&VectorQuery { vector, k: 10, num_candidates: 20, filter: Some(tech.clone()) })
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.document.category == "technology"));

    let hits = backend
        .text_search(&TextQuery { text: "market trends".into(), k: 10, filter: None })
        .await
        .unwrap();
    assert_eq!(hits.first().map(|h| h.document.id.as_str()), Some("doc_003"));

    let hits = backend
        .text_search(&TextQuery { text: "neural".into(), k: 10, filter: Some(tech) })
        .await
        .unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.document.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"doc_001") && ids.contains(&"doc_004"));

    let stats = backend.stats().await.unwrap();
    assert_eq!(stats.doc_count, 4);
    assert!(stats.size_bytes > 0);
    assert!(backend.health().await.unwrap().reachable);
}

#[tokio::test]
async fn hybrid_applies_weights_and_threshold() {
    let (backend, embedder) = seeded().await;
    let text = "climate";
    let vector = embedder.embed(text).unwrap();

    let all = backend
        .hybrid_search(&HybridQuery {
            text: text.into(),
            vector: vector.clone(),
            text_weight: 0.3,
            vector_weight: 0.7,
            min_score: f32::MIN,
            size: 10,
            filter: None,
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 4, "every document is a candidate");
    assert_eq!(all[0].document.id, "doc_002");
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));

    let threshold = all[1].score + 1e-3;
    let strict = backend
        .hybrid_search(&HybridQuery {
            text: text.into(),
            vector,
            text_weight: 0.3,
            vector_weight: 0.7,
            min_score: threshold,
            size: 10,
            filter: None,
        })
        .await
        .unwrap();
    assert!(strict.iter().all(|h| h.score >= threshold));
    assert_eq!(strict.len(), 1);
}

#[tokio::test]
async fn get_delete_and_dimension_guard() {
    let (backend, embedder) = seeded().await;
    let doc = backend.get("doc_002").await.unwrap().expect("stored");
    assert_eq!(doc.title, "Climate science");
    assert!(doc.embedding.is_some());

    assert!(backend.delete("doc_002").await.unwrap());
    assert!(!backend.delete("doc_002").await.unwrap());
    assert!(backend.get("doc_002").await.unwrap().is_none());
    let hits = backend
        .text_search(&TextQuery { text: "climate".into(), k: 10, filter: None })
        .await
        .unwrap();
    assert!(hits.iter().all(|h| h.document.id != "doc_002"));

    let mut wrong = corpus(&embedder).remove(0);
    wrong.id = "doc_bad".into();
    wrong.embedding = Some(vec![0.1; DIM + 1]);
    let err = backend.index(&wrong).await.unwrap_err();
    assert_eq!(err.status_code(), 422);

    backend.ensure_index(DIM, true).await.unwrap();
    assert_eq!(backend.stats().await.unwrap().doc_count, 0);
}

#[tokio::test]
async fn hybrid_penalizes_opposed_vectors() {
    let backend = LocalBackend::new("opposed").unwrap();
    backend.ensure_index(2, true).await.unwrap();
    let doc = Document {
        id: "q1".into(),
        title: "quantum computing".into(),
        content: "qubits and gates".into(),
        category: "science".into(),
        tags: vec![],
        metadata: Default::default(),
        embedding: Some(vec![-1.0, 0.0]),
        created_at: None,
        updated_at: None,
    };
    backend.index(&doc).await.unwrap();

    let query = HybridQuery {
        text: "quantum".into(),
        vector: vec![1.0, 0.0],
        text_weight: 0.3,
        vector_weight: 0.7,
        min_score: f32::MIN,
        size: 10,
        filter: None,
    };
    let all = backend.hybrid_search(&query).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].score < 0.0, "cosine of -1 pulls the fused score below zero: {}", all[0].score);
    let lexical = (all[0].score - FusionWeights::default().combine(0.0, -1.0)) / 0.3;
    assert!(lexical > 0.0, "the title still matches lexically");

    let hits = backend.hybrid_search(&HybridQuery { min_score: 0.0, ..query }).await.unwrap();
    assert!(hits.is_empty(), "{:?}", hits.iter().map(|h| h.score).collect::<Vec<_>>());
}
