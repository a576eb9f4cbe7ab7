/// Largest chunk stored, in characters
pub const MAX_CHUNK_CHARS: usize = 1800;

/// Represents a text chunk with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The actual text content of this chunk
    pub text: String,
    /// Citation name of the document this chunk belongs to
    pub source: String,
    /// Character offset of this chunk in the original document
    pub start_position: usize,
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Paragraphs are packed together while they fit; a paragraph longer than
/// `max_chars` is cut at character boundaries.
pub fn split_into_chunks(text: &str, source: &str, max_chars: usize) -> Vec<TextChunk> {
    let max_chars = max_chars.max(1);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;
    let mut current_start = 0;

    let mut push = |text: String, start: usize| {
        chunks.push(TextChunk {
            text,
            source: source.to_string(),
            start_position: start,
        });
    };

    for (offset, paragraph) in paragraphs(text) {
        let paragraph_chars = paragraph.chars().count();

        // Flush if the paragraph does not fit next to what we have
        if !current.is_empty() && current_chars + 2 + paragraph_chars > max_chars {
            push(std::mem::take(&mut current), current_start);
            current_chars = 0;
        }

        if paragraph_chars > max_chars {
            let chars: Vec<char> = paragraph.chars().collect();
            let mut piece_offset = offset;
            for piece in chars.chunks(max_chars) {
                let piece: String = piece.iter().collect();
                let piece_chars = piece.chars().count();
                push(piece, piece_offset);
                piece_offset += piece_chars;
            }
            continue;
        }

        if current.is_empty() {
            current_start = offset;
        } else {
            current.push_str("\n\n");
            current_chars += 2;
        }
        current.push_str(paragraph);
        current_chars += paragraph_chars;
    }

    if !current.is_empty() {
        push(current, current_start);
    }

    chunks
}

/// Non-empty trimmed paragraphs with their character offsets
fn paragraphs(text: &str) -> Vec<(usize, &str)> {
    let mut result = Vec::new();
    let mut byte_offset = 0;

    for raw in text.split("\n\n") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let leading = raw.len() - raw.trim_start().len();
            let start = byte_offset + leading;
            result.push((text[..start].chars().count(), trimmed));
        }
        byte_offset += raw.len() + 2;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = split_into_chunks("Hello.\n\nWorld.", "resume", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello.\n\nWorld.");
        assert_eq!(chunks[0].source, "resume");
        assert_eq!(chunks[0].start_position, 0);
    }

    #[test]
    fn test_paragraphs_are_packed_up_to_limit() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        let chunks = split_into_chunks(text, "doc", 10);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaa\n\nbbbb", "cccc"]);
        assert_eq!(chunks[1].start_position, 12);
    }

    #[test]
    fn test_long_paragraph_is_cut() {
        let text = "x".repeat(25);
        let chunks = split_into_chunks(&text, "doc", 10);
        let lengths: Vec<usize> = chunks.iter().map(|c| c.text.len()).collect();
        assert_eq!(lengths, vec![10, 10, 5]);
        assert_eq!(chunks[2].start_position, 20);
    }

    #[test]
    fn test_no_chunk_exceeds_limit_with_multibyte_text() {
        let text = "çé".repeat(1000) + "\n\nshort\n\n" + &"ü".repeat(50);
        for chunk in split_into_chunks(&text, "doc", MAX_CHUNK_CHARS) {
            assert!(chunk.text.chars().count() <= MAX_CHUNK_CHARS);
            assert!(!chunk.text.trim().is_empty());
        }
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        assert!(split_into_chunks(" \n\n \n\n", "doc", 100).is_empty());
    }
}
