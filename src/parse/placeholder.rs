use std::collections::HashMap;
use std::ops::Range;

use super::span::ByteSpan;

/// One `{{name}}` occurrence found in a template text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    /// Trimmed name between the braces, e.g. `color_1`
    pub full_key: String,
    /// Name without the group suffix, e.g. `color`
    pub base_key: String,
    /// Numeric group suffix, e.g. `1`
    pub group_id: Option<String>,
    /// 0-based ordinal of this base key's appearance in scan order
    pub occurrence: usize,
    /// Whole token including braces
    pub span: ByteSpan,
    /// The trimmed name inside the braces
    pub name_span: ByteSpan,
}

impl PlaceholderToken {
    /// Key addressing this occurrence in a template's selections
    pub fn occurrence_key(&self) -> String {
        occurrence_key(&self.base_key, self.occurrence)
    }

    /// True if both tokens are grouped and in the same group
    pub fn is_linked_with(&self, other: &PlaceholderToken) -> bool {
        self.group_id.is_some() && self.base_key == other.base_key && self.group_id == other.group_id
    }

    /// Cursor positions counted as "inside" this token: anywhere between the
    /// opening and closing braces.
    fn cursor_range(&self) -> ByteSpan {
        ByteSpan::new(self.span.start() + 2, self.span.end() - 2)
    }
}

/// A piece of parsed text, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(Range<usize>),
    Placeholder(&'a PlaceholderToken),
}

/// Result of scanning a text for placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedText {
    tokens: Vec<PlaceholderToken>,
    len: usize,
}

impl ParsedText {
    /// Tokens in document order
    pub fn tokens(&self) -> &[PlaceholderToken] {
        &self.tokens
    }

    /// Literal runs and tokens covering the whole text, in order
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::with_capacity(self.tokens.len() * 2 + 1);
        let mut pos = 0;
        for token in &self.tokens {
            if token.span.start() > pos {
                segments.push(Segment::Literal(pos..token.span.start()));
            }
            segments.push(Segment::Placeholder(token));
            pos = token.span.end();
        }
        if pos < self.len {
            segments.push(Segment::Literal(pos..self.len));
        }
        segments
    }

    /// The token the cursor sits in, if any. Binary search over spans.
    pub fn token_at(&self, cursor: usize) -> Option<&PlaceholderToken> {
        let idx = self
            .tokens
            .partition_point(|t| t.cursor_range().end() < cursor);
        self.tokens
            .get(idx)
            .filter(|t| t.cursor_range().touches(cursor))
    }

    /// The token addressed by `occurrence_key`
    pub fn find(&self, occurrence_key: &str) -> Option<&PlaceholderToken> {
        let (base, idx) = split_occurrence_key(occurrence_key)?;
        self.tokens
            .iter()
            .find(|t| t.base_key == base && t.occurrence == idx)
    }

    /// Every token carrying `(base_key, group_id)`, in document order
    pub fn group_members<'a>(
        &'a self,
        base_key: &'a str,
        group_id: &'a str,
    ) -> impl Iterator<Item = &'a PlaceholderToken> + 'a {
        self.tokens
            .iter()
            .filter(move |t| t.base_key == base_key && t.group_id.as_deref() == Some(group_id))
    }
}

/// Scan `text` for placeholders.
///
/// A token is `{{` followed by a name containing no `{`, `}` or newline,
/// closed by `}}`. Names are trimmed; a name that is empty after trimming is
/// not a token. Anything that is not a token is literal text.
pub fn parse_placeholders(text: &str) -> ParsedText {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] != b'{' || bytes[i + 1] != b'{' {
            i += 1;
            continue;
        }

        let name_start = i + 2;
        let mut j = name_start;
        while j < bytes.len() && !matches!(bytes[j], b'{' | b'}' | b'\n') {
            j += 1;
        }

        let closed = j + 1 < bytes.len() && bytes[j] == b'}' && bytes[j + 1] == b'}';
        let raw = &text[name_start..j];
        let name = raw.trim();
        if !closed || name.is_empty() {
            i += 1;
            continue;
        }

        let lead = raw.len() - raw.trim_start().len();
        let name_begin = name_start + lead;
        let (base, group) = split_name(name);
        let counter = counters.entry(base.to_string()).or_insert(0);
        tokens.push(PlaceholderToken {
            full_key: name.to_string(),
            base_key: base.to_string(),
            group_id: group.map(str::to_string),
            occurrence: *counter,
            span: ByteSpan::new(i, j + 2),
            name_span: ByteSpan::new(name_begin, name_begin + name.len()),
        });
        *counter += 1;
        i = j + 2;
    }

    ParsedText {
        tokens,
        len: text.len(),
    }
}

/// Split a token name into base key and group suffix.
///
/// The group is the all-digit part after the last `_`, recognized only when
/// the part before it is non-empty: `color_1` is `(color, 1)`, `_1` and
/// `color_bg` have no group.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    if let Some((base, suffix)) = name.rsplit_once('_')
        && !base.is_empty()
        && !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_digit())
    {
        return (base, Some(suffix));
    }
    (name, None)
}

/// Join a base key and group id back into a token name
pub fn join_name(base_key: &str, group_id: Option<&str>) -> String {
    match group_id {
        Some(group) => format!("{}_{}", base_key, group),
        None => base_key.to_string(),
    }
}

/// `"<base>-<index>"`
pub fn occurrence_key(base_key: &str, index: usize) -> String {
    format!("{}-{}", base_key, index)
}

/// Inverse of [`occurrence_key`]: `"color-3"` is `("color", 3)`
pub fn split_occurrence_key(key: &str) -> Option<(&str, usize)> {
    let (base, idx) = key.rsplit_once('-')?;
    if base.is_empty() {
        return None;
    }
    Some((base, idx.parse().ok()?))
}

/// Rebuild `text`, replacing the name of every token for which `rename`
/// returns a new name. Literal runs and surrounding whitespace inside the
/// braces are copied verbatim.
pub fn rewrite_tokens(
    text: &str,
    parsed: &ParsedText,
    mut rename: impl FnMut(&PlaceholderToken) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for token in parsed.tokens() {
        if let Some(new_name) = rename(token) {
            out.push_str(&text[pos..token.name_span.start()]);
            out.push_str(&new_name);
            pos = token.name_span.end();
        }
    }
    out.push_str(&text[pos..]);
    out
}

/// Rename base keys throughout `text`, keeping group suffixes.
///
/// Works on the token list, so a key that prefixes another (`color` vs
/// `color_bg`) is never touched by mistake and substitution order does not
/// matter.
pub fn rename_base_keys(text: &str, renames: &HashMap<String, String>) -> String {
    let parsed = parse_placeholders(text);
    rewrite_tokens(text, &parsed, |token| {
        renames
            .get(&token.base_key)
            .map(|new_base| join_name(new_base, token.group_id.as_deref()))
    })
}
