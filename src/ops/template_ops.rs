use std::collections::HashMap;

use crate::model::library::Library;
use crate::model::template::{Selections, Template};
use crate::model::text::LocalizedText;
use crate::parse::{occurrence_key, rename_base_keys, split_occurrence_key};

/// Error type for template operations
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("template ID already exists: {0}")]
    IdExists(String),
    #[error("template ID must not be empty")]
    EmptyId,
}

/// Add a new template at the end of the library.
pub fn add_template(library: &mut Library, template: Template) -> Result<(), TemplateError> {
    if template.id.trim().is_empty() {
        return Err(TemplateError::EmptyId);
    }
    if library.has_template(&template.id) {
        return Err(TemplateError::IdExists(template.id));
    }
    library.templates.push(template);
    Ok(())
}

/// Delete a template. This is the only way a template leaves the library
/// apart from reconciliation replacing a system copy.
pub fn remove_template(library: &mut Library, id: &str) -> Result<Template, TemplateError> {
    let idx = library
        .templates
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
    Ok(library.templates.remove(idx))
}

pub fn rename_template(
    library: &mut Library,
    id: &str,
    name: LocalizedText,
) -> Result<(), TemplateError> {
    let template = library
        .template_mut(id)
        .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
    template.name = name;
    Ok(())
}

/// Replace a template's tags, dropping blanks and duplicates.
pub fn set_tags(library: &mut Library, id: &str, tags: Vec<String>) -> Result<(), TemplateError> {
    let template = library
        .template_mut(id)
        .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !cleaned.contains(&tag) {
            cleaned.push(tag);
        }
    }
    template.tags = cleaned;
    Ok(())
}

/// Rewrite every reference to a renamed base key inside `template`: token
/// names in all language variants of the content (group suffixes kept) and
/// the matching selection keys, both `<key>-<n>` and bare `<key>`.
pub fn rename_keys_in_template(template: &mut Template, renames: &HashMap<String, String>) {
    if renames.is_empty() {
        return;
    }

    template.content = match &template.content {
        LocalizedText::Plain(text) => LocalizedText::Plain(rename_base_keys(text, renames)),
        LocalizedText::Localized(map) => LocalizedText::Localized(
            map.iter()
                .map(|(lang, text)| (lang.clone(), rename_base_keys(text, renames)))
                .collect(),
        ),
    };

    template.selections = template
        .selections
        .iter()
        .map(|(key, value)| (rename_selection_key(key, renames), value.clone()))
        .collect::<Selections>();
}

fn rename_selection_key(key: &str, renames: &HashMap<String, String>) -> String {
    if let Some(new_base) = renames.get(key) {
        return new_base.clone();
    }
    match split_occurrence_key(key) {
        Some((base, idx)) => match renames.get(base) {
            Some(new_base) => occurrence_key(new_base, idx),
            None => key.to_string(),
        },
        None => key.to_string(),
    }
}
