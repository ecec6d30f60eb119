use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::text::LocalizedText;

/// Media kind a template is written for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Video,
    /// Unknown kinds read back as `image`
    #[default]
    #[serde(other)]
    Image,
}

/// Per-occurrence selected values of one template, keyed by occurrence key
/// (`"<baseKey>-<index>"`).
///
/// No validation against bank options happens here: free-text values are
/// legal. Keys that no longer match a placeholder in the content are kept
/// but never read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selections(IndexMap<String, LocalizedText>);

impl Selections {
    pub fn new() -> Self {
        Selections(IndexMap::new())
    }

    pub fn get(&self, occurrence_key: &str) -> Option<&LocalizedText> {
        self.0.get(occurrence_key)
    }

    pub fn set(&mut self, occurrence_key: impl Into<String>, value: LocalizedText) {
        self.0.insert(occurrence_key.into(), value);
    }

    pub fn remove(&mut self, occurrence_key: &str) -> Option<LocalizedText> {
        self.0.shift_remove(occurrence_key)
    }

    pub fn contains(&self, occurrence_key: &str) -> bool {
        self.0.contains_key(occurrence_key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LocalizedText)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Keep only the entries whose key satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|key, _| keep(key));
    }
}

impl FromIterator<(String, LocalizedText)> for Selections {
    fn from_iter<I: IntoIterator<Item = (String, LocalizedText)>>(iter: I) -> Self {
        Selections(iter.into_iter().collect())
    }
}

/// Fields a stored template did not carry at all. An absent field has no
/// value yet, unlike one that is present but empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsentTemplateFields {
    pub name: bool,
    pub content: bool,
    pub selections: bool,
    pub kind: bool,
}

/// A reusable text with embedded `{{baseKey}}` / `{{baseKey_groupId}}`
/// placeholders and the values picked for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TemplateRecord")]
pub struct Template {
    pub id: String,
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub content: LocalizedText,
    #[serde(default)]
    pub selections: Selections,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, rename = "type")]
    pub kind: TemplateKind,
    /// Fields this crate does not interpret (image URLs, author, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    #[serde(skip)]
    pub absent: AbsentTemplateFields,
}

/// Stored form of a [`Template`], keeping track of which fields were written.
#[derive(Deserialize)]
struct TemplateRecord {
    id: String,
    name: Option<LocalizedText>,
    content: Option<LocalizedText>,
    selections: Option<Selections>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(rename = "type")]
    kind: Option<TemplateKind>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl From<TemplateRecord> for Template {
    fn from(record: TemplateRecord) -> Self {
        let absent = AbsentTemplateFields {
            name: record.name.is_none(),
            content: record.content.is_none(),
            selections: record.selections.is_none(),
            kind: record.kind.is_none(),
        };
        Template {
            id: record.id,
            name: record.name.unwrap_or_default(),
            content: record.content.unwrap_or_default(),
            selections: record.selections.unwrap_or_default(),
            tags: record.tags,
            kind: record.kind.unwrap_or_default(),
            extra: record.extra,
            absent,
        }
    }
}

impl Template {
    pub fn new(id: impl Into<String>, name: LocalizedText, content: LocalizedText) -> Self {
        Template {
            id: id.into(),
            name,
            content,
            selections: Selections::new(),
            tags: Vec::new(),
            kind: TemplateKind::Image,
            extra: serde_json::Map::new(),
            absent: AbsentTemplateFields::default(),
        }
    }

    /// The content text edited and rendered for `lang`
    pub fn text(&self, lang: &str) -> &str {
        self.content.resolve(lang)
    }

    /// True when the entry carries no usable content at all.
    pub fn is_blank(&self) -> bool {
        self.content.is_blank()
    }

    /// Structural identity used to decide whether a stored copy was edited.
    /// Ignores `id` and `tags` (tags of built-in templates are system-owned).
    pub fn same_structure(&self, other: &Template) -> bool {
        self.name == other.name
            && self.content == other.content
            && self.selections == other.selections
            && self.kind == other.kind
            && self.extra == other.extra
    }

    /// [`Template::same_structure`] where every field this copy never carried
    /// counts as equal.
    pub fn agrees_with(&self, other: &Template) -> bool {
        let absent = &self.absent;
        (absent.name || self.name == other.name)
            && (absent.content || self.content == other.content)
            && (absent.selections || self.selections == other.selections)
            && (absent.kind || self.kind == other.kind)
            && self.extra == other.extra
    }

    /// Take every field this copy never carried from `other`.
    pub fn fill_absent(&mut self, other: &Template) {
        if self.absent.name {
            self.name = other.name.clone();
        }
        if self.absent.content {
            self.content = other.content.clone();
        }
        if self.absent.selections {
            self.selections = other.selections.clone();
        }
        if self.absent.kind {
            self.kind = other.kind;
        }
        self.absent = AbsentTemplateFields::default();
    }

    /// Like [`Template::same_structure`] but also ignores the name, so that a
    /// relabelled backup copy still matches the version it was made from.
    pub fn same_body(&self, other: &Template) -> bool {
        self.content == other.content
            && self.selections == other.selections
            && self.kind == other.kind
            && self.extra == other.extra
    }
}
