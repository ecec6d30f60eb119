use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Languages tried, in order, when a localized value has no entry for the
/// requested language.
pub const FALLBACK_LANGUAGES: [&str; 2] = ["cn", "en"];

/// A piece of user-facing text that is either a single string or one string
/// per language code.
///
/// Serialized untagged: `"red"` or `{"cn": "红", "en": "red"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    Localized(IndexMap<String, String>),
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl From<&str> for LocalizedText {
    fn from(s: &str) -> Self {
        LocalizedText::Plain(s.to_string())
    }
}

impl From<String> for LocalizedText {
    fn from(s: String) -> Self {
        LocalizedText::Plain(s)
    }
}

impl LocalizedText {
    /// Build a localized value from `(lang, text)` pairs.
    pub fn localized<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        LocalizedText::Localized(
            entries
                .into_iter()
                .map(|(lang, text)| (lang.to_string(), text.to_string()))
                .collect(),
        )
    }

    /// The text for `lang`. See [`resolve_locale`].
    pub fn resolve(&self, lang: &str) -> &str {
        resolve_locale(self, lang)
    }

    /// True if no language variant carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        match self {
            LocalizedText::Plain(s) => s.trim().is_empty(),
            LocalizedText::Localized(map) => map.values().all(|s| s.trim().is_empty()),
        }
    }

    /// True if any language variant equals `s`.
    pub fn matches(&self, s: &str) -> bool {
        match self {
            LocalizedText::Plain(text) => text == s,
            LocalizedText::Localized(map) => map.values().any(|text| text == s),
        }
    }

    /// A copy with the text for `lang` replaced. Plain text is replaced
    /// wholesale since it has no per-language slots.
    pub fn with_language(&self, lang: &str, text: impl Into<String>) -> Self {
        match self {
            LocalizedText::Plain(_) => LocalizedText::Plain(text.into()),
            LocalizedText::Localized(map) => {
                let mut map = map.clone();
                map.insert(lang.to_string(), text.into());
                LocalizedText::Localized(map)
            }
        }
    }

    /// A copy with `suffix` appended to every language variant, separated by a
    /// space.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let append = |s: &str| {
            if suffix.is_empty() {
                s.to_string()
            } else {
                format!("{} {}", s, suffix)
            }
        };
        match self {
            LocalizedText::Plain(s) => LocalizedText::Plain(append(s)),
            LocalizedText::Localized(map) => LocalizedText::Localized(
                map.iter().map(|(lang, s)| (lang.clone(), append(s))).collect(),
            ),
        }
    }
}

/// Pick the display string of `text` for `lang`.
///
/// Plain text is returned as is. A localized map yields the entry for `lang`,
/// then the first non-empty entry among [`FALLBACK_LANGUAGES`], then the first
/// non-empty entry of any language, then `""`.
pub fn resolve_locale<'a>(text: &'a LocalizedText, lang: &str) -> &'a str {
    match text {
        LocalizedText::Plain(s) => s,
        LocalizedText::Localized(map) => {
            if let Some(s) = map.get(lang).filter(|s| !s.is_empty()) {
                return s;
            }
            FALLBACK_LANGUAGES
                .iter()
                .filter_map(|fallback| map.get(*fallback))
                .chain(map.values())
                .find(|s| !s.is_empty())
                .map(String::as_str)
                .unwrap_or("")
        }
    }
}
