//! Lyric chunking for length-limited vocal models
//!
//! Greedy word packing: words are appended to the current chunk while the
//! chunk plus one separator plus the word fits in `max_chars`. A word longer
//! than `max_chars` is emitted alone.

/// Default chunk size for vocal synthesis requests
pub const DEFAULT_MAX_CHARS: usize = 400;

/// Split `text` into ordered chunks of at most `max_chars` characters
///
/// Joining the result with single spaces reproduces the whitespace-normalized
/// input. Empty or whitespace-only input yields no chunks. Lengths are
/// counted in characters, not bytes.
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current.push_str(word);
            current_len = word_len;
            continue;
        }

        if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if current_len > 0 {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk("", 10).is_empty());
        assert!(chunk("  \n\t ", 10).is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(chunk("a b c", 400), vec!["a b c"]);
    }

    #[test]
    fn test_greedy_packing() {
        assert_eq!(chunk("aa bb cc dd", 5), vec!["aa bb", "cc dd"]);
        assert_eq!(chunk("aa bb cc", 4), vec!["aa", "bb", "cc"]);
    }

    #[test]
    fn test_oversized_word_emitted_alone() {
        let chunks = chunk("hi supercalifragilistic yo", 6);
        assert_eq!(chunks, vec!["hi", "supercalifragilistic", "yo"]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 5 chars each, 10 bytes each
        let chunks = chunk("ééééé ààààà", 11);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_join_reproduces_normalized_text_and_respects_limit() {
        let long = "word ".repeat(300);
        let texts = [
            "I got the beat\nand the rhyme   in my   soul",
            "one",
            "  leading and trailing  ",
            long.as_str(),
        ];

        for text in texts {
            for max in [1usize, 3, 7, 16, 50, 400] {
                let chunks = chunk(text, max);
                assert_eq!(chunks.join(" "), normalized(text), "max={}", max);
                for c in &chunks {
                    assert!(!c.is_empty());
                    let single_word = !c.contains(' ');
                    assert!(c.chars().count() <= max || single_word, "chunk {:?} > {}", c, max);
                }
            }
        }
    }
}
