use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bank::{Bank, Category};
use super::template::Template;
use super::text::LocalizedText;

/// The plain in-memory collections the engine works on: what persistence
/// hands in and what it gets back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub banks: IndexMap<String, Bank>,
    /// Bank-level default value per base key
    #[serde(default)]
    pub defaults: IndexMap<String, LocalizedText>,
    #[serde(default)]
    pub categories: IndexMap<String, Category>,
}

impl Library {
    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn template_mut(&mut self, id: &str) -> Option<&mut Template> {
        self.templates.iter_mut().find(|t| t.id == id)
    }

    pub fn has_template(&self, id: &str) -> bool {
        self.template(id).is_some()
    }

    /// Decode a persisted collection entry by entry.
    ///
    /// Entries that fail to decode are skipped with a warning instead of
    /// failing the whole collection; a missing or mistyped section is empty.
    pub fn from_json_lenient(value: &Value) -> Library {
        let mut library = Library::default();

        if let Some(templates) = value.get("templates").and_then(Value::as_array) {
            for (idx, entry) in templates.iter().enumerate() {
                match serde_json::from_value::<Template>(entry.clone()) {
                    Ok(template) => library.templates.push(template),
                    Err(e) => tracing::warn!(index = idx, error = %e, "skipping malformed template"),
                }
            }
        }

        decode_map(value, "banks", &mut library.banks);
        decode_map(value, "defaults", &mut library.defaults);
        decode_map(value, "categories", &mut library.categories);

        library
    }
}

fn decode_map<T: serde::de::DeserializeOwned>(
    value: &Value,
    section: &str,
    out: &mut IndexMap<String, T>,
) {
    let Some(entries) = value.get(section).and_then(Value::as_object) else {
        return;
    };
    for (key, entry) in entries {
        match serde_json::from_value::<T>(entry.clone()) {
            Ok(decoded) => {
                out.insert(key.clone(), decoded);
            }
            Err(e) => tracing::warn!(section, key = %key, error = %e, "skipping malformed entry"),
        }
    }
}
