//! Persisted knowledge bases: learn, stats, clean and asking against them.

use super::support::{EchoClient, DIMENSIONS};
use crate::config::{get_default_config_path, save_config};
use crate::embeddings::EmbeddingConfig;
use crate::rag::build_pipeline;
use crate::types::{AskOptions, KnowledgeBaseConfig, LearnOptions};
use crate::{clean, learn, stats};
use drugsearch_core::AppError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn configure_base(workspace: &Path, base: &str, dimensions: usize) {
    let config = KnowledgeBaseConfig {
        name: base.to_string(),
        embedding: EmbeddingConfig::trigram(dimensions),
        ..Default::default()
    };
    save_config(workspace, &config).unwrap();
}

fn write_corpus(root: &Path) -> PathBuf {
    let corpus = root.join("corpus");
    fs::create_dir_all(corpus.join("nested")).unwrap();
    fs::write(
        corpus.join("exenatide.txt"),
        "Exenatide is administered by injection.",
    )
    .unwrap();
    fs::write(
        corpus.join("storage.md"),
        "# Storage\nKeep unopened pens refrigerated.",
    )
    .unwrap();
    fs::write(
        corpus.join("nested").join("warnings.txt"),
        "Do not use with a history of pancreatitis.",
    )
    .unwrap();
    fs::write(corpus.join("logo.png"), [0u8, 1, 2, 3]).unwrap();
    corpus
}

fn options(base: &str, paths: Vec<PathBuf>, reset: bool) -> LearnOptions {
    LearnOptions {
        base_name: base.to_string(),
        paths,
        reset,
    }
}

#[tokio::test]
async fn test_learn_directory_and_report_stats() {
    let temp = TempDir::new().unwrap();
    configure_base(temp.path(), "labels", DIMENSIONS);
    let corpus = write_corpus(temp.path());

    let learned = learn(temp.path(), options("labels", vec![corpus], false), None)
        .await
        .unwrap();

    // logo.png is not a learnable type
    assert_eq!(learned.sources_count, 3);
    assert_eq!(learned.pages_count, 3);
    assert_eq!(learned.chunks_count, 3);
    assert!(learned.skipped.is_empty());
    assert!(learned.bytes_processed > 0);

    let base = stats(temp.path(), "labels").unwrap();
    assert_eq!(base.sources_count, 3);
    assert_eq!(base.chunks_count, 3);
    assert_eq!(base.provider, "trigram");
    assert_eq!(base.dimensions, DIMENSIONS);
    assert!(base.last_learn_at.is_some());
    assert!(base.db_size_bytes > 0);
}

#[tokio::test]
async fn test_relearning_replaces_chunks() {
    let temp = TempDir::new().unwrap();
    configure_base(temp.path(), "labels", DIMENSIONS);
    let corpus = write_corpus(temp.path());

    learn(temp.path(), options("labels", vec![corpus.clone()], false), None)
        .await
        .unwrap();
    learn(temp.path(), options("labels", vec![corpus], false), None)
        .await
        .unwrap();

    assert_eq!(stats(temp.path(), "labels").unwrap().chunks_count, 3);
}

#[tokio::test]
async fn test_relearning_edited_file_drops_old_text() {
    let temp = TempDir::new().unwrap();
    configure_base(temp.path(), "labels", DIMENSIONS);
    let label = temp.path().join("exenatide.txt");

    fs::write(&label, "Exenatide is administered by oral tablet.").unwrap();
    learn(temp.path(), options("labels", vec![label.clone()], false), None)
        .await
        .unwrap();

    fs::write(&label, "Exenatide is administered by injection.").unwrap();
    learn(temp.path(), options("labels", vec![label], false), None)
        .await
        .unwrap();

    let base = stats(temp.path(), "labels").unwrap();
    assert_eq!(base.chunks_count, 1);
    assert_eq!(base.sources_count, 1);

    let (pipeline, _) = build_pipeline(
        temp.path(),
        &AskOptions {
            base_name: Some("labels".to_string()),
            top_k: Some(5),
            ..Default::default()
        },
        Arc::new(EchoClient::default()),
        "gpt-3.5-turbo",
        None,
    )
    .await
    .unwrap();

    let response = pipeline.ask("How is Exenatide administered?").await.unwrap();
    assert_eq!(response.chunks.len(), 1);
    assert_eq!(response.chunks[0].chunk.text, "Exenatide is administered by injection.");
    assert!(!response.answer.contains("oral tablet"));
}

#[tokio::test]
async fn test_same_file_name_in_two_directories_counts_both_sizes() {
    let temp = TempDir::new().unwrap();
    configure_base(temp.path(), "labels", DIMENSIONS);

    let first = temp.path().join("us").join("label.txt");
    let second = temp.path().join("eu").join("label.txt");
    fs::create_dir_all(first.parent().unwrap()).unwrap();
    fs::create_dir_all(second.parent().unwrap()).unwrap();
    fs::write(&first, "Store below 25 degrees.").unwrap();
    fs::write(&second, "Keep refrigerated between 2 and 8 degrees.").unwrap();

    let expected = fs::metadata(&first).unwrap().len() + fs::metadata(&second).unwrap().len();

    let learned = learn(
        temp.path(),
        options("labels", vec![first, second], false),
        None,
    )
    .await
    .unwrap();

    assert_eq!(learned.bytes_processed, expected);
    // Both files share the label, so they are one document with two pages
    assert_eq!(learned.sources_count, 1);
    assert_eq!(learned.pages_count, 2);
    assert_eq!(learned.chunks_count, 2);
    assert_eq!(stats(temp.path(), "labels").unwrap().chunks_count, 2);
}

#[tokio::test]
async fn test_missing_path_is_skipped() {
    let temp = TempDir::new().unwrap();
    configure_base(temp.path(), "labels", DIMENSIONS);
    let corpus = write_corpus(temp.path());

    let learned = learn(
        temp.path(),
        options(
            "labels",
            vec![corpus.join("exenatide.txt"), temp.path().join("missing.pdf")],
            false,
        ),
        None,
    )
    .await
    .unwrap();

    assert_eq!(learned.sources_count, 1);
    assert_eq!(learned.skipped.len(), 1);
    assert!(learned.skipped[0].name.ends_with("missing.pdf"));
}

#[tokio::test]
async fn test_ask_learned_base() {
    let temp = TempDir::new().unwrap();
    configure_base(temp.path(), "labels", DIMENSIONS);
    let corpus = write_corpus(temp.path());
    learn(temp.path(), options("labels", vec![corpus], false), None)
        .await
        .unwrap();

    let ask = AskOptions {
        base_name: Some("labels".to_string()),
        ..Default::default()
    };
    let (pipeline, report) = build_pipeline(
        temp.path(),
        &ask,
        Arc::new(EchoClient::default()),
        "gpt-3.5-turbo",
        None,
    )
    .await
    .unwrap();

    assert!(report.pages.is_empty());
    assert_eq!(pipeline.top_k(), 1);

    let response = pipeline.ask("How is Exenatide administered?").await.unwrap();
    assert_eq!(response.sources, vec!["exenatide.txt".to_string()]);
    assert!(response.answer.contains("injection"));
}

#[tokio::test]
async fn test_clean_empties_base() {
    let temp = TempDir::new().unwrap();
    configure_base(temp.path(), "labels", DIMENSIONS);
    let corpus = write_corpus(temp.path());
    learn(temp.path(), options("labels", vec![corpus], false), None)
        .await
        .unwrap();

    clean(temp.path(), "labels").unwrap();

    let base = stats(temp.path(), "labels").unwrap();
    assert_eq!(base.chunks_count, 0);
    assert_eq!(base.sources_count, 0);

    let (pipeline, _) = build_pipeline(
        temp.path(),
        &AskOptions {
            base_name: Some("labels".to_string()),
            ..Default::default()
        },
        Arc::new(EchoClient::default()),
        "gpt-3.5-turbo",
        None,
    )
    .await
    .unwrap();
    assert!(matches!(
        pipeline.ask("anything").await,
        Err(AppError::NoDocuments)
    ));
}

#[tokio::test]
async fn test_changed_dimensions_need_reset() {
    let temp = TempDir::new().unwrap();
    configure_base(temp.path(), "labels", DIMENSIONS);
    let corpus = write_corpus(temp.path());
    learn(temp.path(), options("labels", vec![corpus.clone()], false), None)
        .await
        .unwrap();

    configure_base(temp.path(), "labels", 64);

    let refused = learn(temp.path(), options("labels", vec![corpus.clone()], false), None).await;
    assert!(matches!(refused, Err(AppError::DimensionMismatch { .. })));

    learn(temp.path(), options("labels", vec![corpus], true), None)
        .await
        .unwrap();
    assert_eq!(stats(temp.path(), "labels").unwrap().dimensions, 64);
}

#[tokio::test]
async fn test_unknown_base_is_an_error() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(
        stats(temp.path(), "nope"),
        Err(AppError::Knowledge(_))
    ));
    assert!(clean(temp.path(), "nope").is_err());

    let result = build_pipeline(
        temp.path(),
        &AskOptions {
            base_name: Some("nope".to_string()),
            ..Default::default()
        },
        Arc::new(EchoClient::default()),
        "gpt-3.5-turbo",
        None,
    )
    .await;
    assert!(matches!(result, Err(AppError::Knowledge(_))));
}

#[tokio::test]
async fn test_file_pipeline_uses_workspace_default_config() {
    let temp = TempDir::new().unwrap();
    let default_path = get_default_config_path(temp.path());
    fs::create_dir_all(default_path.parent().unwrap()).unwrap();
    fs::write(
        &default_path,
        format!(
            "top_k: 2\nembedding:\n  provider: trigram\n  model: trigram-v1\n  dimensions: {}\n",
            DIMENSIONS
        ),
    )
    .unwrap();
    let corpus = write_corpus(temp.path());

    let ask = AskOptions {
        files: vec![
            corpus.join("exenatide.txt"),
            corpus.join("storage.md"),
            corpus.join("gone.txt"),
        ],
        ..Default::default()
    };
    let (pipeline, report) = build_pipeline(
        temp.path(),
        &ask,
        Arc::new(EchoClient::default()),
        "gpt-3.5-turbo",
        None,
    )
    .await
    .unwrap();

    assert_eq!(pipeline.top_k(), 2);
    assert_eq!(report.pages.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "gone.txt");

    let response = pipeline.ask("How is Exenatide administered?").await.unwrap();
    assert_eq!(response.sources[0], "exenatide.txt");
}
