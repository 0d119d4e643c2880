//! Sentence-aware text chunking with overlap

use unicode_segmentation::UnicodeSegmentation;

use super::parser::ParsedDocument;
use crate::types::{Chunk, ChunkSource, Document};

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size / 2),
        }
    }

    /// Chunk a parsed document
    pub fn chunk_document(&self, doc: &Document, parsed: &ParsedDocument) -> Vec<Chunk> {
        let source = ChunkSource {
            filename: doc.filename.clone(),
            file_type: doc.file_type.clone(),
            page_number: None,
        };

        self.split(&parsed.content)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end, text))| {
                Chunk::new(doc.id, text, source.clone(), start, end, index as u32)
            })
            .collect()
    }

    /// Split text into `(char_start, char_end, text)` pieces.
    ///
    /// Sentences are packed until the next one would overflow `chunk_size`;
    /// a sentence longer than `chunk_size` is hard-split on char boundaries.
    pub fn split(&self, text: &str) -> Vec<(usize, usize, String)> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut current_start = 0usize;
        let mut pos = 0usize;

        for sentence in text.split_sentence_bounds() {
            for part in self.hard_split(sentence) {
                if !current.is_empty() && current.len() + part.len() > self.chunk_size {
                    push_piece(&mut pieces, current_start, pos, &current);

                    let overlap = self.overlap_text(&current);
                    current_start = pos - overlap.len();
                    current = overlap;
                }

                current.push_str(part);
                pos += part.len();
            }
        }

        push_piece(&mut pieces, current_start, pos, &current);
        pieces
    }

    /// Break an overlong sentence into `chunk_size` byte windows on char boundaries
    fn hard_split<'a>(&self, sentence: &'a str) -> Vec<&'a str> {
        let mut parts = Vec::new();
        let mut rest = sentence;

        while rest.len() > self.chunk_size {
            let mut cut = self.chunk_size;
            while cut > 0 && !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                break;
            }
            let (head, tail) = rest.split_at(cut);
            parts.push(head);
            rest = tail;
        }

        if !rest.is_empty() {
            parts.push(rest);
        }
        parts
    }

    /// Tail of a finished chunk carried into the next one, started on a word boundary
    fn overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        if text.len() <= self.overlap {
            return text.to_string();
        }

        let mut start = text.len() - self.overlap;
        while start < text.len() && !text.is_char_boundary(start) {
            start += 1;
        }
        let tail = &text[start..];

        match tail.find(' ') {
            Some(pos) => tail[pos + 1..].to_string(),
            None => tail.to_string(),
        }
    }
}

fn push_piece(pieces: &mut Vec<(usize, usize, String)>, start: usize, end: usize, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        pieces.push((start, end, trimmed.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileType;

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new(1024, 200);
        let pieces = chunker.split("The capital of France is Paris.");
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].2, "The capital of France is Paris.");
        assert_eq!(pieces[0].0, 0);
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let text = "Alpha beta gamma. ".repeat(40);
        let chunker = TextChunker::new(100, 20);
        let pieces = chunker.split(&text);

        assert!(pieces.len() > 1);
        for (_, _, piece) in &pieces {
            assert!(piece.len() <= 100 + 20, "chunk too long: {}", piece.len());
        }
        // Overlap: each chunk after the first starts before the previous one ended
        for pair in pieces.windows(2) {
            assert!(pair[1].0 < pair[0].1);
        }
    }

    #[test]
    fn test_overlong_sentence_is_hard_split() {
        let text = "x".repeat(250);
        let chunker = TextChunker::new(100, 0);
        let pieces = chunker.split(&text);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2].2.len(), 50);
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "Ça coûte cher à Zürich. ".repeat(30);
        let chunker = TextChunker::new(64, 16);
        let pieces = chunker.split(&text);
        assert!(!pieces.is_empty());
    }

    #[test]
    fn test_chunk_document_indexes() {
        let doc = Document::new("kb.txt".to_string(), FileType::Txt);
        let parsed = ParsedDocument {
            file_type: FileType::Txt,
            content: "One sentence here. ".repeat(20),
            total_pages: None,
        };

        let chunks = TextChunker::new(80, 10).chunk_document(&doc, &parsed);
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.document_id, doc.id);
            assert_eq!(chunk.source.filename, "kb.txt");
        }
    }
}
