use indexmap::IndexMap;

use crate::model::bank::Bank;
use crate::model::template::Selections;
use crate::model::text::LocalizedText;
use crate::parse::{ParsedText, PlaceholderToken, join_name, parse_placeholders};

/// Outcome of rewriting one token's group suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEdit {
    /// The full text after the edit
    pub text: String,
    /// Cursor position adjusted for the length change
    pub cursor: usize,
    /// Occurrence key of the rewritten token (unchanged by the edit)
    pub occurrence_key: String,
    /// Group the token belongs to after the edit
    pub group_id: Option<String>,
}

/// Put the token under the cursor into group `group` by rewriting it to
/// `{{baseKey_group}}`. Returns `None` if the cursor is not inside a token.
pub fn assign_group(text: &str, cursor: usize, group: u32) -> Option<GroupEdit> {
    let parsed = parse_placeholders(text);
    let token = parsed.token_at(cursor)?;
    let group = group.to_string();
    let new_name = join_name(&token.base_key, Some(&group));
    Some(replace_name(text, cursor, token, &new_name, Some(group)))
}

/// Strip the group suffix from the token under the cursor. Returns `None` if
/// the cursor is not inside a token or the token has no group.
pub fn remove_group(text: &str, cursor: usize) -> Option<GroupEdit> {
    let parsed = parse_placeholders(text);
    let token = parsed.token_at(cursor)?;
    token.group_id.as_ref()?;
    let new_name = token.base_key.clone();
    Some(replace_name(text, cursor, token, &new_name, None))
}

fn replace_name(
    text: &str,
    cursor: usize,
    token: &PlaceholderToken,
    new_name: &str,
    group_id: Option<String>,
) -> GroupEdit {
    let name = &token.name_span;
    let mut out = String::with_capacity(text.len() + new_name.len());
    out.push_str(&text[..name.start()]);
    out.push_str(new_name);
    out.push_str(&text[name.end()..]);

    let cursor = if cursor <= name.start() {
        cursor
    } else if cursor < name.end() {
        name.start() + new_name.len()
    } else {
        cursor + new_name.len() - name.len()
    };

    GroupEdit {
        text: out,
        cursor,
        occurrence_key: token.occurrence_key(),
        group_id,
    }
}

/// Occurrence keys of every token linked with `token`, itself included.
/// An ungrouped token is only linked with itself.
pub fn linked_occurrences(parsed: &ParsedText, token: &PlaceholderToken) -> Vec<String> {
    match &token.group_id {
        Some(group) => parsed
            .group_members(&token.base_key, group)
            .map(PlaceholderToken::occurrence_key)
            .collect(),
        None => vec![token.occurrence_key()],
    }
}

/// Store `value` for `occurrence_key` and for every occurrence in the same
/// group. Returns the keys written.
///
/// A key that matches no token in `parsed` is still written, on its own.
pub fn propagate_selection(
    selections: &mut Selections,
    parsed: &ParsedText,
    occurrence_key: &str,
    value: LocalizedText,
) -> Vec<String> {
    let keys = match parsed.find(occurrence_key) {
        Some(token) => linked_occurrences(parsed, token),
        None => vec![occurrence_key.to_string()],
    };
    for key in &keys {
        selections.set(key.clone(), value.clone());
    }
    if keys.len() > 1 {
        tracing::debug!(occurrence_key, linked = keys.len(), "propagated selection to group");
    }
    keys
}

/// Make every member of group `(base_key, group_id)` hold the same value.
///
/// The value of the lowest-index member with an explicit selection wins,
/// skipping `joiner` (an occurrence that just entered the group). If no other
/// member has a value, the joiner's value becomes the group's. Returns the
/// value applied, if any.
pub fn sync_group(
    selections: &mut Selections,
    parsed: &ParsedText,
    base_key: &str,
    group_id: &str,
    joiner: Option<&str>,
) -> Option<LocalizedText> {
    let members: Vec<String> = parsed
        .group_members(base_key, group_id)
        .map(PlaceholderToken::occurrence_key)
        .collect();

    let value = members
        .iter()
        .filter(|key| Some(key.as_str()) != joiner)
        .find_map(|key| selections.get(key))
        .or_else(|| joiner.and_then(|key| selections.get(key)))
        .cloned()?;

    for key in members {
        selections.set(key, value.clone());
    }
    Some(value)
}

/// Run [`sync_group`] over every group present in `parsed`, in document
/// order. Used after free-form content edits that may form or reshuffle
/// groups.
pub fn sync_all_groups(selections: &mut Selections, parsed: &ParsedText) {
    let mut seen: Vec<(&str, &str)> = Vec::new();
    for token in parsed.tokens() {
        let Some(group) = token.group_id.as_deref() else {
            continue;
        };
        let id = (token.base_key.as_str(), group);
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        sync_group(selections, parsed, id.0, id.1, None);
    }
}

/// Append a typed-in value to the bank of `base_key` unless an equal option
/// exists. Returns whether the bank changed; a missing bank is left alone.
pub fn add_custom_option(
    banks: &mut IndexMap<String, Bank>,
    base_key: &str,
    value: &LocalizedText,
) -> bool {
    if value.is_blank() {
        return false;
    }
    match banks.get_mut(base_key) {
        Some(bank) => bank.push_option(value.clone()),
        None => {
            tracing::debug!(base_key, "no bank for custom value");
            false
        }
    }
}
