mod common;

use common::*;
use portfolio_rag::ingest::Ingestor;
use std::fs;
use std::sync::Arc;

fn write_data_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("resume.md"),
        "# Alp\n\nFull-stack developer.\n\nReact, Node, Postgres.",
    )
    .unwrap();
    fs::create_dir(dir.path().join("projects")).unwrap();
    fs::write(
        dir.path().join("projects/chatbot.md"),
        "A RAG chat widget for the portfolio.",
    )
    .unwrap();
    fs::write(dir.path().join("projects/cover.png"), [0u8, 1, 2, 3]).unwrap();
    dir
}

#[tokio::test]
async fn test_ingest_dir_writes_chunks_per_source() {
    let dir = write_data_dir();
    let embedder = Arc::new(StubEmbedder::default());
    let store = Arc::new(StubStore::default());
    let ingestor = Ingestor::new(embedder.clone(), store.clone(), Some(DIM));

    let summary = ingestor.ingest_dir(dir.path()).await.unwrap();

    assert_eq!(
        summary.sources,
        vec![
            ("resume".to_string(), 1),
            ("project:chatbot".to_string(), 1)
        ]
    );
    assert_eq!(summary.total_chunks(), 2);

    let inserted = store.inserted();
    assert_eq!(inserted.len(), 2);
    assert_eq!(inserted[0].source, "resume");
    assert!(inserted[0].chunk.contains("React, Node, Postgres."));
    assert_eq!(inserted[0].embedding.len(), DIM);
    assert_eq!(inserted[1].source, "project:chatbot");
    assert_eq!(embedder.calls(), 2);
    assert_eq!(*store.prepared.lock().unwrap(), vec![DIM, DIM]);
}

#[tokio::test]
async fn test_ingest_splits_long_documents() {
    let dir = tempfile::tempdir().unwrap();
    let paragraphs: Vec<String> = (0..6).map(|i| format!("Paragraph {} {}", i, "x".repeat(40))).collect();
    fs::write(dir.path().join("resume.md"), paragraphs.join("\n\n")).unwrap();

    let embedder = Arc::new(StubEmbedder::default());
    let store = Arc::new(StubStore::default());
    let ingestor =
        Ingestor::new(embedder.clone(), store.clone(), Some(DIM)).with_max_chunk_chars(120);

    let summary = ingestor.ingest_dir(dir.path()).await.unwrap();

    let inserted = store.inserted();
    assert!(inserted.len() > 1);
    assert_eq!(summary.total_chunks(), inserted.len());
    assert_eq!(embedder.calls(), inserted.len());
    for row in &inserted {
        assert!(row.chunk.chars().count() <= 120);
        assert_eq!(row.source, "resume");
    }
}

#[tokio::test]
async fn test_dimension_mismatch_aborts_before_writing() {
    let dir = write_data_dir();
    let store = Arc::new(StubStore::default());
    let ingestor = Ingestor::new(
        Arc::new(StubEmbedder::new(vec![0.0; 4])),
        store.clone(),
        Some(DIM),
    );

    let err = ingestor.ingest_dir(dir.path()).await.unwrap_err();

    assert!(format!("{:#}", err).contains("Embedding dim mismatch: got 4, expected 3"));
    assert!(store.inserted().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_propagated() {
    let dir = write_data_dir();
    let ingestor = Ingestor::new(
        Arc::new(StubEmbedder::default()),
        Arc::new(StubStore::failing()),
        None,
    );

    let err = ingestor.ingest_dir(dir.path()).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to store chunks of resume"));
}

#[tokio::test]
async fn test_empty_directory_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(StubStore::default());
    let ingestor = Ingestor::new(Arc::new(StubEmbedder::default()), store.clone(), Some(DIM));

    let summary = ingestor.ingest_dir(dir.path()).await.unwrap();
    assert_eq!(summary.total_chunks(), 0);
    assert!(store.inserted().is_empty());
}
