pub mod placeholder;
pub mod span;

pub use placeholder::{
    join_name, occurrence_key, parse_placeholders, rename_base_keys, rewrite_tokens, split_name,
    split_occurrence_key, ParsedText, PlaceholderToken, Segment,
};
pub use span::ByteSpan;
