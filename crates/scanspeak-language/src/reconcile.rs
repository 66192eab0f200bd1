//! Reconciling a transcription service's language with the local heuristic.
//!
//! The heuristic always wins when the two disagree; the caller is told so it
//! can log and publish the discrepancy.

use scanspeak_core::LanguageTag;
use tracing::debug;

use crate::classifier::classify;

/// Outcome of comparing a service-reported language with [`classify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    /// The language to attach to the result.
    pub language: LanguageTag,
    /// What the service reported, normalized to a tag when possible.
    pub service_language: Option<String>,
    /// True when the service reported a language and it lost.
    pub overridden: bool,
}

/// Full language names some services report instead of tags.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("english", "en"),
    ("spanish", "es"),
    ("french", "fr"),
    ("portuguese", "pt"),
    ("italian", "it"),
    ("romanian", "ro"),
    ("german", "de"),
    ("dutch", "nl"),
    ("swedish", "sv"),
    ("norwegian", "no"),
    ("danish", "da"),
    ("polish", "pl"),
    ("czech", "cs"),
    ("slovak", "sk"),
    ("croatian", "hr"),
    ("finnish", "fi"),
    ("hungarian", "hu"),
    ("estonian", "et"),
    ("latvian", "lv"),
    ("lithuanian", "lt"),
    ("slovenian", "sl"),
    ("chinese", "zh"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("arabic", "ar"),
    ("persian", "fa"),
    ("urdu", "ur"),
    ("hebrew", "he"),
    ("hindi", "hi"),
    ("bengali", "bn"),
    ("gujarati", "gu"),
    ("punjabi", "pa"),
    ("tamil", "ta"),
    ("telugu", "te"),
    ("kannada", "kn"),
    ("malayalam", "ml"),
    ("thai", "th"),
    ("lao", "lo"),
    ("burmese", "my"),
    ("khmer", "km"),
    ("russian", "ru"),
    ("ukrainian", "uk"),
    ("bulgarian", "bg"),
    ("serbian", "sr"),
    ("macedonian", "mk"),
    ("greek", "el"),
    ("amharic", "am"),
    ("georgian", "ka"),
    ("armenian", "hy"),
];

/// Normalize a service-reported language (`"en-US"`, `"English"`, `" fr "`)
/// to a lowercase tag. Returns `None` for blank input.
pub fn normalize_service_language(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    if let Some((_, tag)) = LANGUAGE_NAMES.iter().find(|(name, _)| *name == lowered) {
        return Some((*tag).to_string());
    }
    let primary = lowered
        .split(['-', '_'])
        .next()
        .unwrap_or(lowered.as_str())
        .to_string();
    Some(primary)
}

/// Decide the final language for `text`.
pub fn reconcile(service_language: Option<&str>, text: &str) -> Reconciliation {
    let heuristic = classify(text);
    let service_language = service_language.and_then(normalize_service_language);
    let overridden = service_language
        .as_deref()
        .is_some_and(|service| service != heuristic);

    if overridden {
        debug!(
            service = service_language.as_deref().unwrap_or_default(),
            heuristic, "Heuristic language overrides service language"
        );
    }

    Reconciliation {
        language: heuristic,
        service_language,
        overridden,
    }
}
