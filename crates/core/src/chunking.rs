use crate::error::IngestError;
use crate::models::{Chunk, ChunkMetadata, IngestionOptions};

/// Boundaries a chunk prefers to end on, strongest first.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl From<IngestionOptions> for ChunkingConfig {
    fn from(value: IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        IngestionOptions::default().into()
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be positive".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than max {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

/// Splits `text` into overlapping windows of at most `max_chars` characters.
///
/// Every chunk after the first starts with the last `overlap_chars` characters
/// of its predecessor, so dropping that prefix and concatenating yields the
/// input unchanged. Within each window the cut lands after the strongest
/// separator found in the back half, or at the window edge if there is none.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    if chars.is_empty() {
        return Ok(chunks);
    }

    let mut start = 0;
    loop {
        let window_end = (start + config.max_chars).min(chars.len());
        if window_end == chars.len() {
            chunks.push(chars[start..].iter().collect());
            break;
        }

        let earliest_end = (start + config.overlap_chars + 1).max(start + config.max_chars / 2);
        let end = preferred_break(&chars, earliest_end, window_end).unwrap_or(window_end);
        chunks.push(chars[start..end].iter().collect());
        start = end - config.overlap_chars;
    }

    Ok(chunks)
}

fn preferred_break(chars: &[char], earliest_end: usize, latest_end: usize) -> Option<usize> {
    SEPARATORS.iter().find_map(|separator| {
        let pattern: Vec<char> = separator.chars().collect();
        (earliest_end..=latest_end)
            .rev()
            .filter(|end| *end >= pattern.len())
            .find(|end| chars[end - pattern.len()..*end] == pattern[..])
    })
}

/// Chunks a document's text and stamps every piece with the same metadata.
pub fn build_chunks(
    text: &str,
    metadata: &ChunkMetadata,
    options: &IngestionOptions,
) -> Result<Vec<Chunk>, IngestError> {
    let config = ChunkingConfig::from(options.clone());

    Ok(split_text(text, config)?
        .into_iter()
        .map(|piece| Chunk {
            text: piece,
            metadata: metadata.clone(),
        })
        .collect())
}
