//! Knowledge base management and retrieval-augmented answering.
//!
//! Documents are extracted page by page, split into fixed-size character
//! chunks, embedded and stored in a vector index: in memory for files given
//! on the command line, in SQLite for a learned base. Questions are answered
//! by a chat model from the top-k nearest chunks.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod memory_index;
pub mod rag;
pub mod session;
pub mod sqlite_index;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use extract::{ExtractionReport, FileDocument, InMemoryDocument, SourceDocument};
pub use memory_index::InMemoryIndex;
pub use rag::{build_pipeline, RagPipeline, RagResponse};
pub use session::{ChatSession, ChatTurn, GENERATION_FAILED_MESSAGE};
pub use sqlite_index::{IndexSignature, SqliteIndex};
pub use types::{
    AskOptions, BaseStats, Chunk, ExtractedPage, KnowledgeBaseConfig, LearnOptions, LearnStats,
    ScoredChunk, SkippedDocument,
};
pub use vector_index::{Metric, VectorIndex};

use chrono::Utc;
use drugsearch_core::{AppError, AppResult};
use extract::ContentType;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Learn from files and directories and populate the knowledge base.
///
/// Directories are walked recursively for `.txt`, `.md` and `.pdf` files.
/// Documents that cannot be extracted are skipped and reported in
/// `LearnStats::skipped`.
pub async fn learn(
    workspace: &Path,
    options: LearnOptions,
    api_key: Option<&str>,
) -> AppResult<LearnStats> {
    let start = Instant::now();

    tracing::info!("Starting learn operation for base '{}'", options.base_name);

    let config = config::load_config(workspace, &options.base_name)?;
    config.validate()?;

    let index_path = config::get_index_path(workspace, &options.base_name);
    if options.reset && index_path.exists() {
        tracing::info!("Resetting knowledge base '{}'", options.base_name);
        std::fs::remove_file(&index_path)?;
    }

    let embedder = embeddings::create_provider(&config.embedding, api_key)?;
    let mut index = SqliteIndex::open(&index_path, &IndexSignature::from_config(&config))?;

    let (files, mut skipped) = collect_files(&options.paths);

    let documents: Vec<Box<dyn SourceDocument>> = files
        .iter()
        .map(|path| Box::new(FileDocument::new(path)) as Box<dyn SourceDocument>)
        .collect();
    let report = extract::extract_documents(&documents);
    skipped.extend(report.skipped);

    // Pages grouped by the document they came from
    let mut pages_per_document: BTreeMap<&str, Vec<ExtractedPage>> = BTreeMap::new();
    for page in &report.pages {
        pages_per_document
            .entry(page.document.as_str())
            .or_default()
            .push(page.clone());
    }

    // Same-named files in different directories share one document entry
    let mut sizes: HashMap<String, u64> = HashMap::new();
    for path in &files {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        *sizes
            .entry(FileDocument::new(path).name().to_string())
            .or_insert(0) += size;
    }

    let learned_at = Utc::now();
    let mut chunks_count = 0u32;
    let mut bytes_processed = 0u64;
    for (name, pages) in &pages_per_document {
        let chunks = chunker::chunk_pages(pages, config.chunk_size, config.chunk_overlap)?;
        let vectors = embeddings::embed_chunks(embedder.as_ref(), &chunks).await?;
        chunks_count += chunks.len() as u32;

        let entries: Vec<(Chunk, Vec<f32>)> = chunks.into_iter().zip(vectors).collect();
        index.replace_document(name, &entries)?;

        let size = sizes.get(*name).copied().unwrap_or(0);
        bytes_processed += size;
        index.record_source(name, pages.len() as u32, size, learned_at)?;
    }

    config::save_config(workspace, &config)?;

    let duration = start.elapsed();

    tracing::info!(
        "Learn operation completed: {} sources, {} chunks, {} skipped, {} bytes in {:.2}s",
        pages_per_document.len(),
        chunks_count,
        skipped.len(),
        bytes_processed,
        duration.as_secs_f64()
    );

    Ok(LearnStats {
        sources_count: pages_per_document.len() as u32,
        pages_count: report.pages.len() as u32,
        chunks_count,
        bytes_processed,
        skipped,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Expand the given paths into files, walking directories for learnable types.
fn collect_files(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<SkippedDocument>) {
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && ContentType::from_path(entry_path).is_learnable() {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else {
            tracing::warn!("Skipping {:?}: no such file or directory", path);
            skipped.push(SkippedDocument {
                name: path.to_string_lossy().to_string(),
                reason: "no such file or directory".to_string(),
            });
        }
    }

    (files, skipped)
}

/// Clean (reset) a knowledge base.
pub fn clean(workspace: &Path, base_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning knowledge base '{}'", base_name);

    let index_path = config::get_index_path(workspace, base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist",
            base_name
        )));
    }

    let mut index = SqliteIndex::open_existing(&index_path)?;
    index.reset()?;

    tracing::info!("Knowledge base '{}' cleaned", base_name);
    Ok(())
}

/// Get statistics for a knowledge base.
pub fn stats(workspace: &Path, base_name: &str) -> AppResult<BaseStats> {
    tracing::info!("Getting stats for knowledge base '{}'", base_name);

    let index_path = config::get_index_path(workspace, base_name);
    if !index_path.exists() {
        return Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist",
            base_name
        )));
    }

    let index = SqliteIndex::open_existing(&index_path)?;
    let (_, chunks_count) = index.stats()?;
    let signature = index.signature().clone();

    let db_size_bytes = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

    Ok(BaseStats {
        base_name: base_name.to_string(),
        sources_count: index.document_count()?,
        chunks_count,
        db_size_bytes,
        provider: signature.provider,
        model: signature.model,
        dimensions: signature.dimensions,
        metric: signature.metric,
        last_learn_at: index.last_learned_at()?,
    })
}
