//! Paragraph splitting.

/// Split page text into paragraphs.
///
/// Blocks are separated by `"\n\n"`, trimmed, and dropped when empty. A
/// paragraph's index is its position in the returned vector.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines() {
        assert_eq!(split_paragraphs("Hello\n\nWorld"), vec!["Hello", "World"]);
    }

    #[test]
    fn single_newlines_stay_inside_a_paragraph() {
        assert_eq!(
            split_paragraphs("line one\nline two\n\nnext"),
            vec!["line one\nline two", "next"]
        );
    }

    #[test]
    fn whitespace_only_blocks_are_dropped_and_indices_compact() {
        let paras = split_paragraphs("\n\n  first  \n\n \t \n\n\n\nsecond\n\n");
        assert_eq!(paras, vec!["first", "second"]);
    }

    #[test]
    fn empty_and_blank_text_yield_nothing() {
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("   \n\n \n").is_empty());
    }

    #[test]
    fn triple_newline_leaves_no_leading_newline() {
        assert_eq!(split_paragraphs("a\n\n\nb"), vec!["a", "b"]);
    }
}
