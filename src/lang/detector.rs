use std::collections::HashMap;

use lingua::{Language as LinguaLanguage, LanguageDetectorBuilder};

use super::normalizer::{tokenize, SpellingNormalizer};
use super::Language;

/// Messages with at most this many tokens get the per-token known-word scan.
pub const SHORT_TEXT_TOKENS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DetectionError {
    #[error("language backend failed: {0}")]
    Backend(String),
}

/// A stretch of the message attributed to one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSpan {
    pub language: Language,
    /// Length in characters
    pub len: usize,
}

/// Accumulated character weight per language for one message.
pub type LanguageScore = HashMap<Language, usize>;

/// Statistical backend that attributes parts of a message to languages.
pub trait SpanDetector: Send + Sync {
    fn spans(&self, text: &str) -> Result<Vec<LanguageSpan>, DetectionError>;
}

/// Span detection backed by lingua, restricted to the supported languages.
pub struct LinguaSpanDetector {
    inner: lingua::LanguageDetector,
}

impl LinguaSpanDetector {
    pub fn new() -> Self {
        let inner = LanguageDetectorBuilder::from_languages(&[
            LinguaLanguage::Turkish,
            LinguaLanguage::English,
            LinguaLanguage::German,
        ])
        .build();
        Self { inner }
    }
}

impl Default for LinguaSpanDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanDetector for LinguaSpanDetector {
    fn spans(&self, text: &str) -> Result<Vec<LanguageSpan>, DetectionError> {
        self.inner
            .detect_multiple_languages_of(text)
            .into_iter()
            .filter_map(|result| {
                let language = match result.language() {
                    LinguaLanguage::Turkish => Language::Turkish,
                    LinguaLanguage::English => Language::English,
                    LinguaLanguage::German => Language::German,
                    #[allow(unreachable_patterns)]
                    _ => return None,
                };
                Some(
                    text.get(result.start_index()..result.end_index())
                        .map(|slice| LanguageSpan {
                            language,
                            len: slice.chars().count(),
                        })
                        .ok_or_else(|| {
                            DetectionError::Backend(format!(
                                "span {}..{} out of bounds",
                                result.start_index(),
                                result.end_index()
                            ))
                        }),
                )
            })
            .collect()
    }
}

/// Which known-word match wins when a short message holds triggers from
/// several languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortTextPrecedence {
    #[default]
    LastMatch,
    FirstMatch,
}

impl std::str::FromStr for ShortTextPrecedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last" | "last-match" => Ok(Self::LastMatch),
            "first" | "first-match" => Ok(Self::FirstMatch),
            other => Err(format!("expected 'first' or 'last', got '{}'", other)),
        }
    }
}

/// Why a language was picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionSource {
    /// First token is a trigger word
    FirstWord,
    /// Short message containing a trigger word
    ShortText,
    Statistical,
    /// Backend ran but attributed nothing
    Defaulted,
    DetectorFailed(DetectionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub language: Language,
    /// Spell-corrected tokens joined by single spaces
    pub normalized: String,
    pub source: DetectionSource,
}

pub struct LanguageDetector {
    backend: Box<dyn SpanDetector>,
    normalizer: SpellingNormalizer,
    precedence: ShortTextPrecedence,
    fallback: Language,
}

impl LanguageDetector {
    pub fn new(backend: Box<dyn SpanDetector>) -> Self {
        Self {
            backend,
            normalizer: SpellingNormalizer::new(Language::pooled_known_words()),
            precedence: ShortTextPrecedence::default(),
            fallback: Language::default(),
        }
    }

    pub fn with_precedence(mut self, precedence: ShortTextPrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Pick a language for `text`, surfacing a failure of the statistical
    /// backend instead of defaulting. Known-word overrides still apply when
    /// the backend is skipped.
    pub fn try_detect(&self, text: &str) -> Result<Detection, DetectionError> {
        let tokens = tokenize(text);
        let corrected = self.normalizer.normalize(&tokens);
        let normalized = corrected.join(" ");

        let first_word = corrected.first().map(|w| w.to_lowercase());
        let first_word_match = first_word
            .as_deref()
            .and_then(|word| Language::ALL.into_iter().find(|l| l.is_known_word(word)));

        let (language, source) = match first_word_match {
            Some(lang) => (lang, DetectionSource::FirstWord),
            None => {
                let score = score_spans(&self.backend.spans(&normalized)?);
                match best_language(&score) {
                    Some(lang) => (lang, DetectionSource::Statistical),
                    None => (self.fallback, DetectionSource::Defaulted),
                }
            }
        };

        Ok(self.finish(tokens.len(), corrected, language, source))
    }

    /// Pick a language for `text`. Never fails: backend errors fall back to
    /// the default language and show up as [`DetectionSource::DetectorFailed`].
    pub fn detect(&self, text: &str) -> Detection {
        match self.try_detect(text) {
            Ok(detection) => detection,
            Err(e) => {
                tracing::warn!("Language detection failed, using {}: {}", self.fallback, e);
                let tokens = tokenize(text);
                let corrected = self.normalizer.normalize(&tokens);
                self.finish(
                    tokens.len(),
                    corrected,
                    self.fallback,
                    DetectionSource::DetectorFailed(e),
                )
            }
        }
    }

    /// Apply the short-text override and assemble the result.
    fn finish(
        &self,
        token_count: usize,
        corrected: Vec<String>,
        mut language: Language,
        mut source: DetectionSource,
    ) -> Detection {
        if token_count <= SHORT_TEXT_TOKENS {
            if let Some(lang) = self.short_text_match(&corrected) {
                language = lang;
                source = DetectionSource::ShortText;
            }
        }

        tracing::debug!("Detected '{}' via {:?}", language, source);

        Detection {
            language,
            normalized: corrected.join(" "),
            source,
        }
    }

    fn short_text_match(&self, words: &[String]) -> Option<Language> {
        let mut matched = None;
        for word in words {
            let lowered = word.to_lowercase();
            if let Some(lang) = Language::ALL
                .into_iter()
                .find(|l| l.is_known_word(&lowered))
            {
                if self.precedence == ShortTextPrecedence::FirstMatch {
                    return Some(lang);
                }
                matched = Some(lang);
            }
        }
        matched
    }
}

fn score_spans(spans: &[LanguageSpan]) -> LanguageScore {
    let mut score = LanguageScore::new();
    for span in spans {
        *score.entry(span.language).or_insert(0) += span.len;
    }
    score
}

/// Heaviest language; ties go to the earlier language in scan order.
fn best_language(score: &LanguageScore) -> Option<Language> {
    let mut best: Option<(Language, usize)> = None;
    for lang in Language::ALL {
        let weight = score.get(&lang).copied().unwrap_or(0);
        if weight == 0 {
            continue;
        }
        match best {
            Some((_, w)) if w >= weight => {}
            _ => best = Some((lang, weight)),
        }
    }
    best.map(|(lang, _)| lang)
}
