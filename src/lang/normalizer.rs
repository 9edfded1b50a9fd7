/// Minimum Ratcliff/Obershelp ratio for a token to be replaced by a known word.
pub const SIMILARITY_CUTOFF: f32 = 0.8;

/// Split a message into word tokens, dropping punctuation.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Fixes common misspellings of trigger words so the known-word override
/// still fires for "helo" or "merhba".
pub struct SpellingNormalizer {
    known_words: Vec<&'static str>,
    cutoff: f32,
}

impl SpellingNormalizer {
    pub fn new(known_words: Vec<&'static str>) -> Self {
        Self {
            known_words,
            cutoff: SIMILARITY_CUTOFF,
        }
    }

    /// Closest known word at or above the cutoff, or the token unchanged.
    pub fn correct(&self, token: &str) -> String {
        let lowered = token.to_lowercase();
        difflib::get_close_matches(&lowered, self.known_words.clone(), 1, self.cutoff)
            .first()
            .map(|word| word.to_string())
            .unwrap_or_else(|| token.to_string())
    }

    pub fn normalize(&self, tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| self.correct(t)).collect()
    }
}
