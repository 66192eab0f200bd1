//! Script, keyword, and frequency based language guessing.
//!
//! Classification runs three stages and stops at the first hit:
//!
//! 1. **Script ranges**: any character inside a distinctive Unicode block
//!    decides the language (table order breaks ties, so Arabic-script text is
//!    `ar` and Cyrillic text is `ru`).
//! 2. **Latin keywords**: lowercased text is matched against per-language
//!    word lists and diacritic sets, English first.
//! 3. **Character frequency**: the most common script family wins, with
//!    Latin or nothing mapping to `en`.

use std::sync::LazyLock;

use regex::Regex;
use scanspeak_core::LanguageTag;

/// Tag returned when nothing more specific is found.
pub const DEFAULT_LANGUAGE: LanguageTag = "en";

// =============================================================================
// Stage 1: script ranges
// =============================================================================

type CodeRange = (u32, u32);

const SCRIPT_TABLE: &[(LanguageTag, &[CodeRange])] = &[
    // East Asian
    ("zh", &[(0x4E00, 0x9FFF)]),
    ("ja", &[(0x3040, 0x309F), (0x30A0, 0x30FF), (0x4E00, 0x9FAF)]),
    ("ko", &[(0xAC00, 0xD7AF), (0x1100, 0x11FF), (0x3130, 0x318F)]),
    // Middle Eastern
    ("ar", &[(0x0600, 0x06FF), (0x0750, 0x077F)]),
    ("fa", &[(0x0600, 0x06FF), (0x0750, 0x077F)]),
    ("ur", &[(0x0600, 0x06FF), (0x0750, 0x077F)]),
    ("he", &[(0x0590, 0x05FF)]),
    // Indian subcontinent
    ("hi", &[(0x0900, 0x097F)]),
    ("bn", &[(0x0980, 0x09FF)]),
    ("gu", &[(0x0A80, 0x0AFF)]),
    ("pa", &[(0x0A00, 0x0A7F)]),
    ("ta", &[(0x0B80, 0x0BFF)]),
    ("te", &[(0x0C00, 0x0C7F)]),
    ("kn", &[(0x0C80, 0x0CFF)]),
    ("ml", &[(0x0D00, 0x0D7F)]),
    // Southeast Asian
    ("th", &[(0x0E00, 0x0E7F)]),
    ("lo", &[(0x0E80, 0x0EFF)]),
    ("my", &[(0x1000, 0x109F)]),
    ("km", &[(0x1780, 0x17FF)]),
    // Other
    ("ru", &[(0x0400, 0x04FF)]),
    ("uk", &[(0x0400, 0x04FF)]),
    ("bg", &[(0x0400, 0x04FF)]),
    ("sr", &[(0x0400, 0x04FF)]),
    ("mk", &[(0x0400, 0x04FF)]),
    ("el", &[(0x0370, 0x03FF)]),
    ("am", &[(0x1200, 0x137F)]),
    ("ka", &[(0x10A0, 0x10FF)]),
    ("hy", &[(0x0530, 0x058F)]),
];

fn in_ranges(c: char, ranges: &[CodeRange]) -> bool {
    let code = c as u32;
    ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&code))
}

fn match_script(text: &str) -> Option<LanguageTag> {
    SCRIPT_TABLE
        .iter()
        .find(|(_, ranges)| text.chars().any(|c| in_ranges(c, ranges)))
        .map(|(tag, _)| *tag)
}

// =============================================================================
// Stage 2: Latin keyword tables
// =============================================================================

struct LexicalPattern {
    language: LanguageTag,
    words: Regex,
    /// Characters that mark the language wherever they occur.
    marks: &'static str,
}

impl LexicalPattern {
    fn matches(&self, lowered: &str) -> bool {
        self.words.is_match(lowered)
            || (!self.marks.is_empty() && lowered.chars().any(|c| self.marks.contains(c)))
    }
}

const LATIN_TABLE: &[(LanguageTag, &[&str], &str)] = &[
    (
        "en",
        &[
            "where", "the", "what", "when", "how", "which", "does", "you", "have", "and", "with",
            "price", "cost", "aisle", "please", "thank", "thanks", "hello",
        ],
        "",
    ),
    // Romance
    (
        "es",
        &[
            "dónde", "está", "cuánto", "cuesta", "precio", "ubicación", "pasillo", "el", "la",
            "los", "las", "qué", "cómo", "cuándo", "por", "para", "con", "sin", "muy", "más",
            "menos", "bien", "mal", "sí", "no", "gracias", "hola", "adiós",
        ],
        "¿¡",
    ),
    (
        "fr",
        &[
            "où", "est", "combien", "coûte", "prix", "emplacement", "allée", "le", "la", "les",
            "que", "comment", "quand", "pour", "avec", "sans", "très", "plus", "moins", "bien",
            "mal", "oui", "non", "merci", "bonjour", "au revoir",
        ],
        "çàèéê",
    ),
    (
        "pt",
        &[
            "onde", "está", "quanto", "custa", "preço", "localização", "corredor", "o", "a", "os",
            "as", "que", "como", "quando", "para", "com", "sem", "muito", "mais", "menos", "bem",
            "mal", "sim", "não", "obrigado", "olá", "tchau",
        ],
        "ãõç",
    ),
    (
        "it",
        &[
            "dove", "è", "quanto", "costa", "prezzo", "posizione", "corridoio", "il", "la", "i",
            "le", "che", "come", "quando", "per", "con", "senza", "molto", "più", "meno", "bene",
            "male", "sì", "no", "grazie", "ciao", "perché",
        ],
        "",
    ),
    (
        "ro",
        &[
            "unde", "este", "cât", "costă", "preț", "locație", "culoar", "că", "cum", "când",
            "pentru", "cu", "fără", "foarte", "mai", "puțin", "bine", "rău", "da", "nu",
            "mulțumesc", "salut", "la revedere",
        ],
        "",
    ),
    // Germanic
    (
        "de",
        &[
            "wo", "ist", "wieviel", "kostet", "preis", "standort", "gang", "der", "die", "das",
            "wie", "wann", "was", "für", "mit", "ohne", "sehr", "mehr", "weniger", "gut",
            "schlecht", "ja", "nein", "danke", "hallo", "auf wiedersehen",
        ],
        "äöüß",
    ),
    (
        "nl",
        &[
            "waar", "is", "hoeveel", "kost", "prijs", "locatie", "gang", "de", "het", "een", "hoe",
            "wanneer", "wat", "voor", "met", "zonder", "zeer", "meer", "minder", "goed", "slecht",
            "ja", "nee", "dank je", "hallo", "tot ziens",
        ],
        "",
    ),
    (
        "sv",
        &[
            "var", "är", "hur mycket", "kostar", "pris", "plats", "gång", "den", "det", "ett",
            "hur", "när", "vad", "för", "med", "utan", "mycket", "mer", "mindre", "bra", "dålig",
            "ja", "nej", "tack", "hej", "hej då",
        ],
        "åäö",
    ),
    (
        "no",
        &[
            "hvor", "er", "hvor mye", "koster", "pris", "sted", "gang", "den", "det", "en", "et",
            "hvordan", "når", "hva", "for", "med", "uten", "meget", "mer", "mindre", "bra",
            "dårlig", "ja", "nei", "takk", "hei", "ha det",
        ],
        "åø",
    ),
    (
        "da",
        &[
            "hvor", "er", "hvor meget", "koster", "pris", "sted", "gang", "den", "det", "en", "et",
            "hvordan", "hvornår", "hvad", "til", "med", "uden", "meget", "mere", "mindre", "godt",
            "dårligt", "ja", "nej", "tak", "hej", "farvel",
        ],
        "åø",
    ),
    // Slavic, Latin script
    (
        "pl",
        &[
            "gdzie", "jest", "ile", "kosztuje", "cena", "lokalizacja", "korytarz", "jak", "kiedy",
            "co", "dla", "z", "bez", "bardzo", "więcej", "mniej", "dobrze", "źle", "tak", "nie",
            "dziękuję", "cześć", "do widzenia",
        ],
        "ąćęłńóśźż",
    ),
    (
        "cs",
        &[
            "kde", "je", "kolik", "stojí", "cena", "místo", "chodba", "jak", "kdy", "co", "pro",
            "s", "bez", "velmi", "více", "méně", "dobře", "špatně", "ano", "ne", "děkuji", "ahoj",
            "na shledanou",
        ],
        "áčďéěíňóřšťúůýž",
    ),
    (
        "sk",
        &[
            "kde", "je", "koľko", "stojí", "cena", "miesto", "chodba", "ako", "kedy", "čo", "pre",
            "s", "bez", "veľmi", "viac", "menej", "dobre", "zle", "áno", "nie", "ďakujem", "ahoj",
            "dovidenia",
        ],
        "áäčďéíĺľňóôŕšťúýž",
    ),
    (
        "hr",
        &[
            "gdje", "je", "koliko", "košta", "cijena", "lokacija", "hodnik", "kako", "kada",
            "što", "za", "s", "bez", "vrlo", "više", "manje", "dobro", "loše", "da", "ne", "hvala",
            "bok", "doviđenja",
        ],
        "čćđšž",
    ),
    // Other European
    (
        "fi",
        &[
            "missä", "on", "paljonko", "maksaa", "hinta", "sijainti", "käytävä", "miten",
            "milloin", "mitä", "varten", "kanssa", "ilman", "hyvin", "enemmän", "vähemmän",
            "hyvä", "huono", "kyllä", "ei", "kiitos", "hei", "näkemiin",
        ],
        "äöå",
    ),
    (
        "hu",
        &[
            "hol", "van", "mennyibe", "kerül", "ár", "helyszín", "folyosó", "hogyan", "mikor",
            "mit", "számára", "val", "nélkül", "nagyon", "több", "kevesebb", "jó", "rossz", "igen",
            "nem", "köszönöm", "szia", "viszlát",
        ],
        "áéíóöőúüű",
    ),
    (
        "et",
        &[
            "kus", "on", "kui palju", "maksab", "hind", "asukoht", "koridor", "kuidas", "millal",
            "mida", "jaoks", "koos", "ilma", "väga", "rohkem", "vähem", "hea", "halb", "jah", "ei",
            "aitäh", "tere", "nägemist",
        ],
        "äöüõ",
    ),
    (
        "lv",
        &[
            "kur", "ir", "cik", "maksā", "cena", "atrašanās vieta", "koridors", "kā", "kad", "ko",
            "priekš", "ar", "bez", "ļoti", "vairāk", "mazāk", "labi", "slikti", "jā", "nē",
            "paldies", "sveiki", "uz redzēšanos",
        ],
        "āčēģīķļņšūž",
    ),
    (
        "lt",
        &[
            "kur", "yra", "kiek", "kainuoja", "kaina", "vieta", "koridorius", "kaip", "kada", "ką",
            "dėl", "su", "be", "labai", "daugiau", "mažiau", "gerai", "blogai", "taip", "ne",
            "ačiū", "labas", "iki",
        ],
        "ąčęėįšųūž",
    ),
    (
        "sl",
        &[
            "kje", "je", "koliko", "stane", "cena", "lokacija", "hodnik", "kako", "kdaj", "kaj",
            "za", "z", "brez", "zelo", "več", "manj", "dobro", "slabo", "da", "ne", "hvala",
            "pozdravljeni", "nasvidenje",
        ],
        "čšž",
    ),
];

static LATIN_PATTERNS: LazyLock<Vec<LexicalPattern>> = LazyLock::new(|| {
    LATIN_TABLE
        .iter()
        .map(|(language, words, marks)| {
            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            LexicalPattern {
                language: *language,
                words: Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
                    .expect("Invalid lexical regex"),
                marks: *marks,
            }
        })
        .collect()
});

fn match_latin(lowered: &str) -> Option<LanguageTag> {
    LATIN_PATTERNS
        .iter()
        .find(|p| p.matches(lowered))
        .map(|p| p.language)
}

// =============================================================================
// Stage 3: character frequency
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScriptFamily {
    Latin,
    Cyrillic,
    Arabic,
    Cjk,
    Devanagari,
}

fn family_of(c: char) -> Option<ScriptFamily> {
    match c as u32 {
        _ if c.is_ascii_alphabetic() => Some(ScriptFamily::Latin),
        0x0400..=0x04FF => Some(ScriptFamily::Cyrillic),
        0x0600..=0x06FF => Some(ScriptFamily::Arabic),
        0x4E00..=0x9FFF => Some(ScriptFamily::Cjk),
        0x0900..=0x097F => Some(ScriptFamily::Devanagari),
        _ => None,
    }
}

fn match_frequency(text: &str) -> LanguageTag {
    const FAMILIES: [ScriptFamily; 5] = [
        ScriptFamily::Latin,
        ScriptFamily::Cyrillic,
        ScriptFamily::Arabic,
        ScriptFamily::Cjk,
        ScriptFamily::Devanagari,
    ];

    let mut counts = [0usize; 5];
    for family in text.chars().filter_map(family_of) {
        if let Some(i) = FAMILIES.iter().position(|f| *f == family) {
            counts[i] += 1;
        }
    }

    // Later families win ties.
    let mut best = 0;
    for i in 1..FAMILIES.len() {
        if counts[i] >= counts[best] {
            best = i;
        }
    }

    if counts[best] == 0 {
        return DEFAULT_LANGUAGE;
    }
    match FAMILIES[best] {
        ScriptFamily::Cyrillic => "ru",
        ScriptFamily::Arabic => "ar",
        ScriptFamily::Cjk => "zh",
        ScriptFamily::Devanagari => "hi",
        ScriptFamily::Latin => DEFAULT_LANGUAGE,
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Best-guess language tag for `text`. Never fails; defaults to `"en"`.
pub fn classify(text: &str) -> LanguageTag {
    if let Some(tag) = match_script(text) {
        return tag;
    }

    let lowered = text.trim().to_lowercase();
    if let Some(tag) = match_latin(&lowered) {
        return tag;
    }

    match_frequency(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_english() {
        assert_eq!(classify(""), "en");
        assert_eq!(classify("   "), "en");
        assert_eq!(classify("12345 !?"), "en");
    }

    #[test]
    fn test_spanish_question() {
        assert_eq!(classify("¿Dónde está la leche?"), "es");
        assert_eq!(classify("cuánto cuesta"), "es");
    }

    #[test]
    fn test_chinese_with_latin_punctuation() {
        assert_eq!(classify("牛奶在哪里?"), "zh");
    }

    #[test]
    fn test_english_function_words_win_over_shared_short_words() {
        assert_eq!(classify("Where is the bread"), "en");
        assert_eq!(classify("How much does this cost?"), "en");
    }

    #[test]
    fn test_single_script_languages() {
        let cases = [
            ("こんにちは", "ja"),
            ("안녕하세요", "ko"),
            ("שלום", "he"),
            ("नमस्ते", "hi"),
            ("வணக்கம்", "ta"),
            ("สวัสดี", "th"),
            ("Γειά σου", "el"),
            ("გამარჯობა", "ka"),
            ("Բարեւ", "hy"),
        ];
        for (text, expected) in cases {
            assert_eq!(classify(text), expected, "{}", text);
        }
    }

    #[test]
    fn test_shared_scripts_resolve_by_table_order() {
        // Persian and Urdu share the Arabic block.
        assert_eq!(classify("سلام"), "ar");
        // Ukrainian shares the Cyrillic block.
        assert_eq!(classify("Привіт"), "ru");
    }

    #[test]
    fn test_script_beats_latin_keywords() {
        assert_eq!(classify("the молоко"), "ru");
    }

    #[test]
    fn test_latin_languages() {
        let cases = [
            ("où est le pain", "fr"),
            ("onde fica o pão", "pt"),
            ("wo ist die Milch", "de"),
            ("waar is de kaas", "nl"),
            ("gdzie jest mleko", "pl"),
        ];
        for (text, expected) in cases {
            assert_eq!(classify(text), expected, "{}", text);
        }
    }

    #[test]
    fn test_diacritic_marks_match_inside_words() {
        assert_eq!(classify("Straße"), "de");
    }

    #[test]
    fn test_unknown_latin_text_falls_back_to_english() {
        assert_eq!(classify("xyzzy plugh"), "en");
    }

    #[test]
    fn test_frequency_tie_prefers_later_family() {
        assert_eq!(match_frequency(""), "en");
        assert_eq!(match_frequency("ab"), "en");
        assert_eq!(match_frequency("ab牛奶"), "zh");
        assert_eq!(match_frequency("abc牛奶"), "en");
    }

    #[test]
    fn test_classify_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify("¿Dónde está la leche?"), "es");
        }
    }
}
