// End-to-end digest of a generated textbook with the built-in models
mod common;

use booksum::storage::DigestStore;
use booksum::structure::ChapterSource;
use booksum::{Config, Pipeline, ProcessOptions};
use common::{build_pdf, font_size_book};

fn write_book(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("physics.pdf");
    std::fs::write(&path, build_pdf(&font_size_book())).unwrap();
    path
}

#[tokio::test]
async fn test_process_textbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_book(&dir);

    let mut pipeline = Pipeline::with_fallbacks(Config::default());
    let digest = pipeline.process(&path, &ProcessOptions::default()).await.unwrap();

    assert_eq!(digest.source, path);
    assert_eq!(digest.metadata.title.as_deref(), Some("Physics Basics"));
    assert_eq!(digest.detected_by, ChapterSource::FontSize);
    assert_eq!(digest.chapters.len(), 2);
    assert_eq!(digest.topic_count(), 4);

    let velocity = &digest.chapters[0].topics[0];
    assert_eq!(velocity.title, "Velocity");
    assert!(velocity.summary.contains("rate of change of position"));
    assert_eq!(velocity.examples.len(), 2);
    assert_eq!(velocity.examples[0], "a car heading north at ten meters per second has a velocity.");
}

#[tokio::test]
async fn test_process_one_chapter_and_store_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_book(&dir);

    let mut pipeline = Pipeline::with_fallbacks(Config::default());
    let options = ProcessOptions { chapter: Some(2), max_topics_per_chapter: Some(1), num_examples: 1 };
    let digest = pipeline.process(&path, &options).await.unwrap();

    assert_eq!(digest.chapters.len(), 1);
    assert_eq!(digest.chapters[0].title, "Energy");
    assert_eq!(digest.chapters[0].topics.len(), 1);
    assert_eq!(digest.chapters[0].topics[0].examples.len(), 1);

    let store = DigestStore::open(&dir.path().join("digests.db")).unwrap();
    let id = store.save_digest(&digest, 1024).unwrap();
    assert_eq!(store.load_digest(id).unwrap(), digest);
    assert_eq!(store.latest_for(&path).unwrap(), Some(digest));
}

#[tokio::test]
async fn test_missing_file_reports_path() {
    let mut pipeline = Pipeline::with_fallbacks(Config::default());
    let err = pipeline
        .process(std::path::Path::new("/nonexistent/book.pdf"), &ProcessOptions::default())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/book.pdf"));
}
