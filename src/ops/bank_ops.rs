use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::bank::Bank;
use crate::model::library::Library;
use crate::model::text::LocalizedText;
use crate::ops::template_ops::rename_keys_in_template;
use crate::parse::split_name;

/// Error type for bank operations
#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("bank not found: {0}")]
    NotFound(String),
    #[error("bank key already exists: {0}")]
    KeyExists(String),
    #[error("invalid bank key: {0:?}")]
    InvalidKey(String),
    #[error("option must not be blank")]
    BlankOption,
    #[error("option not found in bank {0}")]
    OptionNotFound(String),
}

static UNSAFE_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_]").expect("static regex"));

/// Normalize a user-typed key: anything outside `[A-Za-z0-9_]` becomes `_`,
/// then lowercase.
pub fn sanitize_key(raw: &str) -> String {
    UNSAFE_KEY_CHARS
        .replace_all(raw.trim(), "_")
        .to_lowercase()
}

/// Sanitize `raw` and reject keys no placeholder can reference: empty or
/// all-underscore keys, and keys ending in `_<digits>`, which read back as a
/// group suffix.
fn usable_key(raw: &str) -> Result<String, BankError> {
    let key = sanitize_key(raw);
    if key.bytes().all(|b| b == b'_') || split_name(&key).1.is_some() {
        return Err(BankError::InvalidKey(raw.to_string()));
    }
    Ok(key)
}

// ---------------------------------------------------------------------------
// Banks
// ---------------------------------------------------------------------------

/// Create an empty bank under the sanitized form of `raw_key` and register an
/// empty default for it. Returns the key actually used.
pub fn add_bank(
    library: &mut Library,
    raw_key: &str,
    label: LocalizedText,
    category: &str,
) -> Result<String, BankError> {
    let key = usable_key(raw_key)?;
    if library.banks.contains_key(&key) {
        return Err(BankError::KeyExists(key));
    }
    library.banks.insert(key.clone(), Bank::new(label, category));
    library.defaults.insert(key.clone(), LocalizedText::default());
    Ok(key)
}

/// Delete a bank and its default. Templates keep their placeholders, which
/// then resolve to their raw text.
pub fn remove_bank(library: &mut Library, key: &str) -> Result<Bank, BankError> {
    let bank = library
        .banks
        .shift_remove(key)
        .ok_or_else(|| BankError::NotFound(key.to_string()))?;
    library.defaults.shift_remove(key);
    Ok(bank)
}

pub fn set_bank_category(library: &mut Library, key: &str, category: &str) -> Result<(), BankError> {
    let bank = bank_mut(library, key)?;
    bank.category = category.to_string();
    Ok(())
}

/// Move a bank to a new key and rewrite every template that references it.
/// Returns the sanitized new key.
pub fn rename_bank(library: &mut Library, old_key: &str, new_raw_key: &str) -> Result<String, BankError> {
    let new_key = usable_key(new_raw_key)?;
    if !library.banks.contains_key(old_key) {
        return Err(BankError::NotFound(old_key.to_string()));
    }
    if new_key == old_key {
        return Ok(new_key);
    }
    if library.banks.contains_key(&new_key) {
        return Err(BankError::KeyExists(new_key));
    }

    if let Some(idx) = library.banks.get_index_of(old_key)
        && let Some((_, bank)) = library.banks.shift_remove_index(idx)
    {
        library.banks.shift_insert(idx, new_key.clone(), bank);
    }
    if let Some(default) = library.defaults.shift_remove(old_key) {
        library.defaults.insert(new_key.clone(), default);
    }

    let renames = HashMap::from([(old_key.to_string(), new_key.clone())]);
    for template in &mut library.templates {
        rename_keys_in_template(template, &renames);
    }
    tracing::debug!(old_key, new_key = %new_key, "renamed bank");
    Ok(new_key)
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Append an option. Returns `false` if an equal option already existed.
pub fn add_option(library: &mut Library, key: &str, option: LocalizedText) -> Result<bool, BankError> {
    if option.is_blank() {
        return Err(BankError::BlankOption);
    }
    Ok(bank_mut(library, key)?.push_option(option))
}

/// Replace `old` with `new` in place.
pub fn update_option(
    library: &mut Library,
    key: &str,
    old: &LocalizedText,
    new: LocalizedText,
) -> Result<(), BankError> {
    if new.is_blank() {
        return Err(BankError::BlankOption);
    }
    let bank = bank_mut(library, key)?;
    let slot = bank
        .options
        .iter_mut()
        .find(|opt| *opt == old)
        .ok_or_else(|| BankError::OptionNotFound(key.to_string()))?;
    *slot = new;
    Ok(())
}

/// Remove every option equal to `option`. Returns whether anything was removed.
pub fn remove_option(library: &mut Library, key: &str, option: &LocalizedText) -> Result<bool, BankError> {
    let bank = bank_mut(library, key)?;
    let before = bank.options.len();
    bank.options.retain(|opt| opt != option);
    Ok(bank.options.len() != before)
}

fn bank_mut<'a>(library: &'a mut Library, key: &str) -> Result<&'a mut Bank, BankError> {
    library
        .banks
        .get_mut(key)
        .ok_or_else(|| BankError::NotFound(key.to_string()))
}
