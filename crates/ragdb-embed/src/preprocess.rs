/// Longest input, in whitespace-separated words, handed to the model.
pub const MAX_WORDS: usize = 512;

/// Trims, collapses runs of whitespace to one space and keeps at most
/// [`MAX_WORDS`] words.
pub fn preprocess_text(text: &str) -> String {
    text.split_whitespace().take(MAX_WORDS).collect::<Vec<_>>().join(" ")
}
