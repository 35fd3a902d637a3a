//! Character-safe text helpers shared by scorers and the chunker.
//!
//! All lengths in this crate are measured in `char`s, not bytes, so that
//! truncation never splits a UTF-8 sequence.

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Truncate `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// The last `n` characters of `text`.
pub fn tail_chars(text: &str, n: usize) -> &str {
    let len = char_len(text);
    if n >= len {
        return text;
    }
    match text.char_indices().nth(len - n) {
        Some((byte_idx, _)) => &text[byte_idx..],
        None => "",
    }
}

/// Lowercase `text`, replace every non-alphanumeric character with a space
/// and collapse runs of whitespace.
///
/// The result is padded with a single leading and trailing space so that
/// whole-phrase matching can use `contains(" phrase ")`.
pub fn normalise_for_matching(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 2);
    result.push(' ');
    let mut prev_was_space = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                result.push(lower);
            }
            prev_was_space = false;
        } else if !prev_was_space {
            result.push(' ');
            prev_was_space = true;
        }
    }
    if !prev_was_space {
        result.push(' ');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_shorter_text_is_unchanged() {
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn truncate_respects_multibyte_chars() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 4), "héll");
        assert_eq!(char_len(truncate_chars(text, 7)), 7);
    }

    #[test]
    fn truncate_to_zero_is_empty() {
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn tail_returns_last_chars() {
        assert_eq!(tail_chars("abcdef", 2), "ef");
        assert_eq!(tail_chars("abc", 10), "abc");
        assert_eq!(tail_chars("abc", 0), "");
        assert_eq!(tail_chars("añb", 2), "ñb");
    }

    #[test]
    fn normalise_strips_punctuation_and_pads() {
        assert_eq!(
            normalise_for_matching("High-Blood  Pressure!"),
            " high blood pressure "
        );
        assert_eq!(normalise_for_matching(""), " ");
        assert_eq!(normalise_for_matching("..."), " ");
    }
}
