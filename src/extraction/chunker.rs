//! Text chunking with overlap and sentence-boundary respect
//!
//! External contract: an ordered sequence of `{index, text}`. PDF pages come
//! in as separate segments and never merge across page boundaries; a segment
//! that fits in one window yields exactly one chunk.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::document::ChunkText;

/// Character-window chunker with configurable size and overlap
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    min_size: usize,
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            overlap: config.chunk_overlap,
            min_size: config.min_chunk_size,
        }
    }

    /// Chunk extracted segments into retrieval units with document-wide
    /// sequential indices. Empty segments (blank pages) are dropped.
    pub fn chunk_segments(&self, segments: &[String]) -> Vec<ChunkText> {
        let mut chunks = Vec::new();

        for segment in segments {
            let text = segment.trim();
            if text.is_empty() {
                continue;
            }

            if text.len() <= self.chunk_size {
                chunks.push(ChunkText {
                    index: chunks.len() as u32,
                    text: text.to_string(),
                });
                continue;
            }

            for piece in self.split_long(text) {
                chunks.push(ChunkText {
                    index: chunks.len() as u32,
                    text: piece,
                });
            }
        }

        chunks
    }

    /// Split an oversized segment into overlapping windows at sentence
    /// boundaries. A single sentence longer than the window stays whole.
    fn split_long(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut current = String::new();

        for sentence in text.split_sentence_bounds() {
            if !current.is_empty() && current.len() + sentence.len() > self.chunk_size {
                let overlap = self.overlap_tail(&current);
                pieces.push(current.trim().to_string());
                current = overlap;
            }
            current.push_str(sentence);
        }

        let tail = current.trim().to_string();
        if !tail.is_empty() {
            match pieces.last_mut() {
                // A stub tail carries too little context on its own
                Some(last) if tail.len() < self.min_size => {
                    last.push(' ');
                    last.push_str(&tail);
                }
                _ => pieces.push(tail),
            }
        }

        pieces
    }

    /// Tail of a chunk carried into the next window as overlap, starting at
    /// a sentence or word boundary where possible
    fn overlap_tail(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        if text.len() <= self.overlap {
            return text.to_string();
        }

        let mut start = text.len() - self.overlap;
        while start > 0 && !text.is_char_boundary(start) {
            start -= 1;
        }
        let tail = &text[start..];

        if let Some(pos) = tail.find(". ") {
            return tail[pos + 2..].to_string();
        }
        if let Some(pos) = tail.find(' ') {
            return tail[pos + 1..].to_string();
        }
        tail.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize, min: usize) -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            min_chunk_size: min,
        })
    }

    #[test]
    fn short_segment_yields_exactly_one_chunk_with_exact_text() {
        let chunks = chunker(1024, 200, 100)
            .chunk_segments(&["Photosynthesis converts light to energy.".to_string()]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "Photosynthesis converts light to energy.");
    }

    #[test]
    fn empty_segments_are_dropped() {
        let chunks = chunker(1024, 200, 100).chunk_segments(&[
            String::new(),
            "Page two text.".to_string(),
            "   ".to_string(),
        ]);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Page two text.");
    }

    #[test]
    fn indices_are_sequential_across_segments() {
        let long: String = "This is a sentence. ".repeat(30);
        let chunks = chunker(100, 20, 10)
            .chunk_segments(&[long.clone(), "Short final page.".to_string()]);

        assert!(chunks.len() > 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i as u32);
        }
        assert_eq!(chunks.last().unwrap().text, "Short final page.");
    }

    #[test]
    fn long_segment_is_split_with_overlap() {
        let long: String = (0..40)
            .map(|i| format!("Sentence number {} is here. ", i))
            .collect();
        let chunks = chunker(120, 40, 10).chunk_segments(&[long]);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // Window plus at most one oversized sentence
            assert!(chunk.text.len() <= 120 + 40);
        }
        // Consecutive chunks share overlapping text
        let first_tail: String = chunks[0]
            .text
            .chars()
            .rev()
            .take(15)
            .collect::<String>()
            .chars()
            .rev()
            .collect();
        assert!(chunks[1].text.contains(first_tail.trim()));
    }

    #[test]
    fn pages_never_merge_across_boundaries() {
        let chunks = chunker(1024, 200, 100).chunk_segments(&[
            "Page one.".to_string(),
            "Page two.".to_string(),
        ]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Page one.");
        assert_eq!(chunks[1].text, "Page two.");
    }

    #[test]
    fn tiny_tail_merges_into_previous_chunk() {
        let text = format!("{} Tiny end.", "A sentence that fills the window nicely. ".repeat(5));
        let chunks = chunker(100, 0, 30).chunk_segments(&[text]);
        assert!(chunks.last().unwrap().text.len() >= 30 || chunks.len() == 1);
    }
}
