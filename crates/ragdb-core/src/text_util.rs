/// Characters kept from `content` in search results.
pub const RESULT_CONTENT_CHARS: usize = 500;
/// Characters kept per context section of a RAG prompt.
pub const CONTEXT_CONTENT_CHARS: usize = 800;
/// Characters kept in a citation excerpt.
pub const EXCERPT_CHARS: usize = 200;

pub const ELLIPSIS: &str = "...";

/// Keeps the first `limit` characters and appends `...` only when something
/// was cut. Counts chars, not bytes.
pub fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_with_ellipsis("abc", 3), "abc");
        assert_eq!(truncate_with_ellipsis("", 3), "");
    }

    #[test]
    fn long_text_is_cut_at_char_boundary() {
        assert_eq!(truncate_with_ellipsis("abcd", 3), "abc...");
        assert_eq!(truncate_with_ellipsis("ééééé", 2), "éé...");
    }
}
