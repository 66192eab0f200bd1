//! Lookup tables keyed by language tag.

use scanspeak_core::LanguageTag;

const DISPLAY_LABELS: &[(LanguageTag, &str)] = &[
    // Latin script
    ("en", "EN"),
    ("es", "ES"),
    ("fr", "FR"),
    ("de", "DE"),
    ("it", "IT"),
    ("pt", "PT"),
    ("nl", "NL"),
    ("sv", "SV"),
    ("no", "NO"),
    ("da", "DA"),
    ("pl", "PL"),
    ("cs", "CS"),
    ("sk", "SK"),
    ("hr", "HR"),
    ("sl", "SI"),
    ("ro", "RO"),
    ("fi", "FI"),
    ("hu", "HU"),
    ("et", "ET"),
    ("lv", "LV"),
    ("lt", "LT"),
    // Other scripts
    ("zh", "中文"),
    ("ja", "日本語"),
    ("ko", "한국어"),
    ("ar", "عربي"),
    ("fa", "فارسی"),
    ("ur", "اردو"),
    ("he", "עברית"),
    ("hi", "हिन्दी"),
    ("bn", "বাংলা"),
    ("gu", "ગુજરાતી"),
    ("pa", "ਪੰਜਾਬੀ"),
    ("ta", "தமிழ்"),
    ("te", "తెలుగు"),
    ("kn", "ಕನ್ನಡ"),
    ("ml", "മലയാളം"),
    ("th", "ไทย"),
    ("lo", "ລາວ"),
    ("my", "မြန်မာ"),
    ("km", "ខ្មែរ"),
    ("ru", "RU"),
    ("uk", "UK"),
    ("bg", "BG"),
    ("sr", "SR"),
    ("mk", "MK"),
    ("el", "Ελ"),
    ("am", "አማ"),
    ("ka", "ქარ"),
    ("hy", "Հայ"),
];

const RECOGNITION_LOCALES: &[(LanguageTag, &str)] = &[
    ("en", "en-US"),
    ("es", "es-ES"),
    ("fr", "fr-FR"),
    ("de", "de-DE"),
    ("it", "it-IT"),
    ("pt", "pt-PT"),
    ("ru", "ru-RU"),
    ("zh", "zh-CN"),
    ("ja", "ja-JP"),
    ("ko", "ko-KR"),
    ("ar", "ar-SA"),
    ("hi", "hi-IN"),
    ("bn", "bn-BD"),
    ("pa", "pa-IN"),
    ("ta", "ta-IN"),
    ("te", "te-IN"),
    ("mr", "mr-IN"),
    ("gu", "gu-IN"),
    ("ur", "ur-PK"),
    ("fa", "fa-IR"),
    ("tr", "tr-TR"),
    ("vi", "vi-VN"),
    ("th", "th-TH"),
    ("ms", "ms-MY"),
    ("id", "id-ID"),
    ("fil", "fil-PH"),
    ("nl", "nl-NL"),
    ("pl", "pl-PL"),
    ("uk", "uk-UA"),
    ("ro", "ro-RO"),
    ("el", "el-GR"),
    ("cs", "cs-CZ"),
    ("hu", "hu-HU"),
    ("sv", "sv-SE"),
    ("no", "no-NO"),
    ("da", "da-DK"),
    ("fi", "fi-FI"),
    ("he", "he-IL"),
    ("sw", "sw-KE"),
    ("am", "am-ET"),
    ("ha", "ha-NG"),
    ("yo", "yo-NG"),
    ("ig", "ig-NG"),
    ("zu", "zu-ZA"),
    ("xh", "xh-ZA"),
    ("af", "af-ZA"),
];

fn lookup(table: &[(LanguageTag, &'static str)], tag: &str) -> Option<&'static str> {
    table.iter().find(|(t, _)| *t == tag).map(|(_, v)| *v)
}

/// Short native label for a language badge. Unknown tags show as `"EN"`.
pub fn display_label(tag: &str) -> &'static str {
    lookup(DISPLAY_LABELS, tag).unwrap_or("EN")
}

/// BCP-47 locale handed to a live-recognition facility. Unknown tags
/// fall back to `"en-US"`.
pub fn recognition_locale(tag: &str) -> &'static str {
    lookup(RECOGNITION_LOCALES, tag).unwrap_or("en-US")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_labels() {
        assert_eq!(display_label("es"), "ES");
        assert_eq!(display_label("zh"), "中文");
        assert_eq!(display_label("sl"), "SI");
        assert_eq!(display_label("xx"), "EN");
    }

    #[test]
    fn test_recognition_locales() {
        assert_eq!(recognition_locale("es"), "es-ES");
        assert_eq!(recognition_locale("pt"), "pt-PT");
        assert_eq!(recognition_locale("fil"), "fil-PH");
        assert_eq!(recognition_locale(""), "en-US");
        assert_eq!(recognition_locale("qq"), "en-US");
    }

    #[test]
    fn test_every_classifier_script_has_a_label() {
        for tag in ["zh", "ja", "ko", "ar", "he", "hi", "th", "ru", "el", "am", "ka", "hy"] {
            assert_ne!(display_label(tag), "EN", "{}", tag);
        }
    }
}
