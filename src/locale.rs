use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

/// Every user-facing string of the interface.
#[derive(Debug)]
pub struct Strings {
    pub title: &'static str,
    pub prompt_label: &'static str,
    pub prompt_placeholder: &'static str,
    pub characters: &'static str,
    pub enhance: &'static str,
    pub enhancing: &'static str,
    pub aspect_ratio: &'static str,
    pub generate: &'static str,
    pub generating: &'static str,
    pub reference_title: &'static str,
    pub reference_hint: &'static str,
    pub reference_active: &'static str,
    pub clear_reference: &'static str,
    pub empty_title: &'static str,
    pub empty_hint: &'static str,
    pub painting: &'static str,
    pub used_prompt: &'static str,
    pub use_as_reference: &'static str,
    pub download: &'static str,
    pub copy_prompt: &'static str,
    pub saved_to: &'static str,
    pub download_failed: &'static str,
    pub history_title: &'static str,
    pub clear_history: &'static str,
    pub suggestions: &'static str,
    pub error_no_image: &'static str,
    pub error_safety: &'static str,
    pub error_rate_limit: &'static str,
    pub error_overloaded: &'static str,
    pub error_unknown: &'static str,
}

static ENGLISH: Strings = Strings {
    title: "Khayal AI",
    prompt_label: "Image description (prompt)",
    prompt_placeholder: "Describe it... e.g. an astronaut cat strolling on the moon, cinematic style",
    characters: "characters",
    enhance: "Enhance with AI",
    enhancing: "Thinking...",
    aspect_ratio: "Aspect ratio",
    generate: "Generate image",
    generating: "Generating...",
    reference_title: "Reference image",
    reference_hint: "This image will guide the style",
    reference_active: "Visual memory active",
    clear_reference: "Remove reference",
    empty_title: "The canvas is empty",
    empty_hint: "Describe an image above and press generate to begin",
    painting: "Painting your imagination...",
    used_prompt: "Prompt used:",
    use_as_reference: "Use as reference",
    download: "Download",
    copy_prompt: "Copy prompt",
    saved_to: "Saved to",
    download_failed: "Could not save the image.",
    history_title: "Previous generations",
    clear_history: "Clear history",
    suggestions: "Ideas",
    error_no_image: "We could not generate the image. The content may not be allowed or the server is under load.",
    error_safety: "Sorry, the request was blocked by safety filters. Please adjust the description.",
    error_rate_limit: "Request limit exceeded. Please wait a little.",
    error_overloaded: "The server is busy right now. Please try again.",
    error_unknown: "An unexpected error occurred during generation.",
};

static ARABIC: Strings = Strings {
    title: "خيال AI",
    prompt_label: "وصف الصورة (Prompt)",
    prompt_placeholder: "اكتب هنا... مثال: قطة رائد فضاء تتجول على سطح القمر بأسلوب سينمائي",
    characters: "حرف",
    enhance: "تحسين الوصف بالذكاء الاصطناعي",
    enhancing: "جاري التفكير...",
    aspect_ratio: "أبعاد الصورة",
    generate: "توليد الصورة الآن",
    generating: "جاري التوليد...",
    reference_title: "صورة مرجعية",
    reference_hint: "سيتم استخدام هذه الصورة كدليل للنمط",
    reference_active: "الذاكرة البصرية نشطة",
    clear_reference: "إزالة الصورة المرجعية",
    empty_title: "مساحة العمل فارغة",
    empty_hint: "أدخل وصفاً للصورة في الأعلى ثم اضغط على زر التوليد لتبدأ الرحلة",
    painting: "جاري رسم خيالك...",
    used_prompt: "الوصف المستخدم:",
    use_as_reference: "استخدام كمرجع",
    download: "تحميل الصورة",
    copy_prompt: "نسخ الوصف",
    saved_to: "تم الحفظ في",
    download_failed: "تعذر حفظ الصورة.",
    history_title: "السجل السابق",
    clear_history: "مسح السجل",
    suggestions: "أفكار",
    error_no_image: "لم نتمكن من توليد الصورة. قد يكون المحتوى غير مسموح به أو هناك ضغط على الخادم.",
    error_safety: "عذراً، تم حظر الطلب بسبب معايير السلامة. يرجى تعديل الوصف.",
    error_rate_limit: "تم تجاوز الحد المسموح من الطلبات. يرجى الانتظار قليلاً.",
    error_overloaded: "الخادم مشغول حالياً. يرجى المحاولة مرة أخرى.",
    error_unknown: "حدث خطأ غير متوقع أثناء التوليد.",
};

impl Language {
    pub fn strings(self) -> &'static Strings {
        match self {
            Language::En => &ENGLISH,
            Language::Ar => &ARABIC,
        }
    }

    pub fn is_rtl(self) -> bool {
        matches!(self, Language::Ar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_config_value() {
        #[derive(Deserialize)]
        struct Ui {
            language: Language,
        }
        let ui: Ui = toml::from_str("language = \"ar\"").unwrap();
        assert_eq!(ui.language, Language::Ar);
        assert!(ui.language.is_rtl());
        assert!(!Language::default().is_rtl());
    }

    #[test]
    fn test_both_languages_have_messages() {
        for language in [Language::En, Language::Ar] {
            let s = language.strings();
            assert!(!s.error_safety.is_empty());
            assert!(!s.error_unknown.is_empty());
            assert!(!s.clear_reference.is_empty());
            assert_ne!(s.error_safety, s.error_rate_limit);
        }
    }
}
