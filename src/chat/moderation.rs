use crate::lang::normalizer::tokenize;
use crate::lang::Language;

const BLOCKED: &[&str] = &[
    // tr
    "amk", "aq", "siktir", "orospu", "piç", "yarrak", "göt",
    // en
    "fuck", "fucking", "shit", "bitch", "asshole", "cunt",
    // de
    "scheiße", "scheisse", "arschloch", "fotze", "wichser", "hurensohn",
];

/// Token-level profanity check on incoming messages.
#[derive(Debug, Clone, Default)]
pub struct ProfanityFilter;

impl ProfanityFilter {
    pub fn is_profane(&self, text: &str) -> bool {
        tokenize(text)
            .into_iter()
            .any(|token| BLOCKED.contains(&token.to_lowercase().as_str()))
    }

    pub fn warning(&self, lang: Language) -> &'static str {
        match lang {
            Language::Turkish => "🙏 Lütfen kibar bir dil kullanalım, o zaman sohbete devam edebiliriz.",
            Language::English => "🙏 Let's keep it polite, then I'm happy to keep talking.",
            Language::German => "🙏 Lass uns höflich bleiben, dann rede ich gerne weiter.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_whole_tokens_only() {
        let filter = ProfanityFilter;
        assert!(filter.is_profane("what the FUCK"));
        assert!(filter.is_profane("siktir git"));
        assert!(!filter.is_profane("Scunthorpe is a town"));
        assert!(!filter.is_profane("shitake mushrooms"));
        assert!(!filter.is_profane(""));
    }
}
