//! Fixed-size character chunking with optional overlap.

use crate::types::{Chunk, ExtractedPage};
use drugsearch_core::{AppError, AppResult};
use sha2::{Digest, Sha256};

/// Split text into windows of `chunk_size` characters.
///
/// Windows advance by `chunk_size - overlap` characters. Text is never
/// trimmed, so with zero overlap the chunks concatenate back to the input.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<&str>> {
    if chunk_size == 0 {
        return Err(AppError::Config("chunk_size must be greater than 0".to_string()));
    }
    if overlap >= chunk_size {
        return Err(AppError::Config(format!(
            "chunk overlap ({}) must be smaller than chunk size ({})",
            overlap, chunk_size
        )));
    }

    // Byte offset of every char boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let step = chunk_size - overlap;
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        pieces.push(&text[boundaries[start]..boundaries[end]]);
        if end == char_count {
            break;
        }
        start += step;
    }

    Ok(pieces)
}

/// Chunk a single page; every chunk inherits the page's source label.
pub fn chunk_page(page: &ExtractedPage, chunk_size: usize, overlap: usize) -> AppResult<Vec<Chunk>> {
    let chunks = chunk_text(&page.text, chunk_size, overlap)?
        .into_iter()
        .enumerate()
        .map(|(position, text)| {
            let position = position as u32;
            Chunk {
                id: chunk_id(&page.source, position, text),
                source: page.source.clone(),
                position,
                text: text.to_string(),
            }
        })
        .collect();

    Ok(chunks)
}

/// Chunk every page in order.
pub fn chunk_pages(
    pages: &[ExtractedPage],
    chunk_size: usize,
    overlap: usize,
) -> AppResult<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for page in pages {
        chunks.extend(chunk_page(page, chunk_size, overlap)?);
    }

    tracing::debug!(
        "Chunked {} page(s) into {} chunks (size: {}, overlap: {})",
        pages.len(),
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}

/// Content-addressed identifier: identical text at the same place upserts
/// onto the same row.
fn chunk_id(source: &str, position: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(position.to_le_bytes());
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}
