use crate::locale::Language;

/// What went wrong with a generation, as far as the user is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service answered but returned no image.
    NoImage,
    Safety,
    RateLimited,
    Overloaded,
    Unknown,
}

impl FailureKind {
    /// First match wins, so a safety block reported with a 429 is still a safety block.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if message.contains("SAFETY") {
            FailureKind::Safety
        } else if message.contains("429") || lower.contains("quota") || message.contains("RESOURCE_EXHAUSTED") {
            FailureKind::RateLimited
        } else if message.contains("503") || lower.contains("overloaded") || message.contains("UNAVAILABLE") {
            FailureKind::Overloaded
        } else {
            FailureKind::Unknown
        }
    }

    pub fn message(self, language: Language) -> &'static str {
        let s = language.strings();
        match self {
            FailureKind::NoImage => s.error_no_image,
            FailureKind::Safety => s.error_safety,
            FailureKind::RateLimited => s.error_rate_limit,
            FailureKind::Overloaded => s.error_overloaded,
            FailureKind::Unknown => s.error_unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(FailureKind::classify("Response blocked: SAFETY"), FailureKind::Safety);
        assert_eq!(FailureKind::classify("finish reason IMAGE_SAFETY"), FailureKind::Safety);
        assert_eq!(
            FailureKind::classify("Gemini API error (429 Too Many Requests): {}"),
            FailureKind::RateLimited
        );
        assert_eq!(FailureKind::classify("You exceeded your current Quota"), FailureKind::RateLimited);
        assert_eq!(FailureKind::classify("status RESOURCE_EXHAUSTED"), FailureKind::RateLimited);
        assert_eq!(
            FailureKind::classify("Gemini API error (503 Service Unavailable)"),
            FailureKind::Overloaded
        );
        assert_eq!(FailureKind::classify("The model is overloaded."), FailureKind::Overloaded);
        assert_eq!(FailureKind::classify("connection reset by peer"), FailureKind::Unknown);
        assert_eq!(FailureKind::classify(""), FailureKind::Unknown);
    }

    #[test]
    fn test_safety_takes_precedence() {
        assert_eq!(FailureKind::classify("429 SAFETY"), FailureKind::Safety);
    }

    #[test]
    fn test_messages_are_localized() {
        assert_ne!(
            FailureKind::Safety.message(Language::En),
            FailureKind::Safety.message(Language::Ar)
        );
        assert_eq!(
            FailureKind::Overloaded.message(Language::En),
            "The server is busy right now. Please try again."
        );
    }
}
