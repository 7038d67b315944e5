//! Text chunking for statute ingestion
//!
//! Splits extracted document text into sentence-aligned chunks sized for
//! embedding, with a trailing word overlap carried into the next chunk so
//! context survives the boundary.

use regex::Regex;

// ============================================================================
// Chunk Configuration
// ============================================================================

/// Chunking settings.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum chunk size in characters.
    pub max_characters: usize,
    /// Words from the end of a chunk repeated at the start of the next.
    pub overlap_words: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_characters: 800,
            overlap_words: 100,
        }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// Text chunking strategy.
pub trait Chunker: Send + Sync {
    /// Split text into chunks.
    fn chunk(&self, text: &str) -> Vec<String>;

    /// Chunker name.
    fn name(&self) -> &'static str;
}

// ============================================================================
// SentenceChunker
// ============================================================================

/// Sentence-aware chunker.
///
/// Sentences are accumulated until the next one would push the chunk past
/// the size limit; the chunk is then flushed and the next one starts with
/// the previous chunk's trailing words.
pub struct SentenceChunker {
    config: ChunkConfig,
    sentence_re: Regex,
}

impl SentenceChunker {
    pub fn new(config: ChunkConfig) -> Self {
        // A sentence: shortest run of text ending in . ! or ? followed by
        // whitespace or end of input.
        let sentence_re = Regex::new(r"(?s).*?[.!?](?:\s+|$)").expect("Invalid sentence regex");
        Self {
            config,
            sentence_re,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// Segment text into sentences. Trailing text without terminal
    /// punctuation becomes a final sentence of its own.
    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut last_end = 0;

        for m in self.sentence_re.find_iter(text) {
            let sentence = m.as_str().trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            last_end = m.end();
        }

        let rest = text[last_end..].trim();
        if !rest.is_empty() {
            sentences.push(rest);
        }

        sentences
    }

    /// Last `overlap_words` words of a chunk.
    fn trailing_words(&self, chunk: &str) -> String {
        let words: Vec<&str> = chunk.split_whitespace().collect();
        let start = words.len().saturating_sub(self.config.overlap_words);
        words[start..].join(" ")
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in self.split_sentences(text) {
            if current.len() + sentence.len() + 1 <= self.config.max_characters {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(sentence);
            } else {
                if !current.is_empty() {
                    chunks.push(current.trim().to_string());
                }

                let overlap = self.trailing_words(&current);
                current = if overlap.is_empty() {
                    sentence.to_string()
                } else {
                    format!("{} {}", overlap, sentence)
                };
            }
        }

        if !current.trim().is_empty() {
            chunks.push(current.trim().to_string());
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "SentenceChunker"
    }
}

/// Default chunker for statute ingestion.
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(SentenceChunker::with_defaults())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_empty() {
        let chunker = SentenceChunker::with_defaults();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n  ").is_empty());
    }

    #[test]
    fn test_chunk_small_text_is_single_chunk() {
        let chunker = SentenceChunker::with_defaults();
        let chunks = chunker.chunk("Theft is punishable. House-breaking too.");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("Theft is punishable."));
    }

    #[test]
    fn test_split_sentences() {
        let chunker = SentenceChunker::with_defaults();
        let sentences =
            chunker.split_sentences("First sentence. Second one! Third? trailing fragment");
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[0], "First sentence.");
        assert_eq!(sentences[2], "Third?");
        assert_eq!(sentences[3], "trailing fragment");
    }

    #[test]
    fn test_chunks_respect_max_size() {
        let config = ChunkConfig {
            max_characters: 80,
            overlap_words: 0,
        };
        let chunker = SentenceChunker::new(config);

        let text = "This is a reasonably long sentence for the test. ".repeat(10);
        let chunks = chunker.chunk(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.len() <= 80, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_overlap_carries_trailing_words() {
        let config = ChunkConfig {
            max_characters: 60,
            overlap_words: 3,
        };
        let chunker = SentenceChunker::new(config);

        let text = "Alpha beta gamma delta epsilon zeta eta theta. Iota kappa lambda mu nu xi.";
        let chunks = chunker.chunk(text);

        assert_eq!(chunks.len(), 2);
        // Second chunk starts with the last three words of the first.
        assert!(chunks[1].starts_with("zeta eta theta."));
    }

    #[test]
    fn test_chunker_name() {
        assert_eq!(SentenceChunker::with_defaults().name(), "SentenceChunker");
    }
}
