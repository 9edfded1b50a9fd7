pub mod detector;
pub mod normalizer;

use std::fmt;

/// Languages the bot can answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    Turkish,
    English,
    German,
}

impl Language {
    /// Every supported language, in override scan order.
    pub const ALL: [Language; 3] = [Language::Turkish, Language::English, Language::German];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Turkish => "tr",
            Self::English => "en",
            Self::German => "de",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "tr" => Some(Self::Turkish),
            "en" => Some(Self::English),
            "de" => Some(Self::German),
            _ => None,
        }
    }

    /// Name used when telling the model which language to answer in.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Turkish => "Turkish",
            Self::English => "English",
            Self::German => "German",
        }
    }

    /// Greeting and common words that short-circuit statistical detection.
    pub fn known_words(&self) -> &'static [&'static str] {
        match self {
            Self::Turkish => &[
                "selam",
                "merhaba",
                "nasılsın",
                "hobilerin",
                "özledin",
                "nerelisin",
                "naber",
                "ne",
                "yapıyorsun",
            ],
            Self::English => &[
                "hello", "how", "are", "you", "old", "today", "missed", "where", "from",
            ],
            Self::German => &[
                "gutenabend",
                "gutentag",
                "abend",
                "guten",
                "wie",
                "geht",
                "heute",
                "bist",
            ],
        }
    }

    pub fn is_known_word(&self, word: &str) -> bool {
        self.known_words().contains(&word)
    }

    /// Known words of every language pooled together, in scan order.
    pub fn pooled_known_words() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .flat_map(|lang| lang.known_words().iter().copied())
            .collect()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
