use indexmap::IndexMap;

use crate::model::template::Selections;
use crate::model::text::LocalizedText;
use crate::parse::{ParsedText, Segment, parse_placeholders};

/// Display value of one occurrence, or `None` when nothing is filled in.
///
/// Read order: explicit selection for the occurrence, then the bank-level
/// default for `base_key`. A value that localizes to `""` counts as missing.
pub fn resolve_occurrence(
    selections: &Selections,
    defaults: &IndexMap<String, LocalizedText>,
    occurrence_key: &str,
    base_key: &str,
    lang: &str,
) -> Option<String> {
    selections
        .get(occurrence_key)
        .into_iter()
        .chain(defaults.get(base_key))
        .map(|value| value.resolve(lang))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Flatten `content` into its final string: every placeholder is replaced by
/// its resolved value, unresolved ones keep their raw `{{...}}` text so a
/// missing fill stays visible.
pub fn resolve_text(
    content: &str,
    selections: &Selections,
    defaults: &IndexMap<String, LocalizedText>,
    lang: &str,
) -> String {
    let parsed = parse_placeholders(content);
    let mut out = String::with_capacity(content.len());
    for segment in parsed.segments() {
        match segment {
            Segment::Literal(range) => out.push_str(&content[range]),
            Segment::Placeholder(token) => {
                match resolve_occurrence(
                    selections,
                    defaults,
                    &token.occurrence_key(),
                    &token.base_key,
                    lang,
                ) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(token.span.slice(content)),
                }
            }
        }
    }
    out
}

/// Drop selections whose occurrence key no longer exists in `parsed`.
/// Returns how many entries were removed.
pub fn prune_stale(selections: &mut Selections, parsed: &ParsedText) -> usize {
    let before = selections.len();
    selections.retain(|key| parsed.find(key).is_some());
    before - selections.len()
}
