use serde::{Deserialize, Serialize};

use super::text::LocalizedText;

/// Category assigned to banks with no category of their own
pub const DEFAULT_CATEGORY: &str = "other";

/// The list of selectable values shared by every placeholder with the same
/// base key. Banks are stored in a map keyed by that base key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BankRecord")]
pub struct Bank {
    pub label: LocalizedText,
    pub category: String,
    pub options: Vec<LocalizedText>,
    #[serde(skip)]
    pub absent: AbsentBankFields,
}

/// Fields a stored bank did not carry at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbsentBankFields {
    pub label: bool,
    pub category: bool,
    pub options: bool,
}

#[derive(Deserialize)]
struct BankRecord {
    label: Option<LocalizedText>,
    category: Option<String>,
    options: Option<Vec<LocalizedText>>,
}

impl From<BankRecord> for Bank {
    fn from(record: BankRecord) -> Self {
        let absent = AbsentBankFields {
            label: record.label.is_none(),
            category: record.category.is_none(),
            options: record.options.is_none(),
        };
        Bank {
            label: record.label.unwrap_or_default(),
            category: record.category.unwrap_or_else(default_category),
            options: record.options.unwrap_or_default(),
            absent,
        }
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Default for Bank {
    fn default() -> Self {
        Bank {
            label: LocalizedText::default(),
            category: default_category(),
            options: Vec::new(),
            absent: AbsentBankFields::default(),
        }
    }
}

impl Bank {
    pub fn new(label: LocalizedText, category: impl Into<String>) -> Self {
        Bank {
            label,
            category: category.into(),
            options: Vec::new(),
            absent: AbsentBankFields::default(),
        }
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = LocalizedText>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    pub fn has_option(&self, value: &LocalizedText) -> bool {
        self.options.contains(value)
    }

    /// Append `value` unless an equal option already exists. Returns whether
    /// the bank changed.
    pub fn push_option(&mut self, value: LocalizedText) -> bool {
        if self.has_option(&value) {
            return false;
        }
        self.options.push(value);
        true
    }

    /// An entry with neither a label nor options counts as missing.
    pub fn is_blank(&self) -> bool {
        self.label.is_blank() && self.options.is_empty()
    }

    /// Label or category differ (options not considered). Fields this bank
    /// never carried do not count as a difference.
    pub fn header_differs(&self, other: &Bank) -> bool {
        (!self.absent.label && self.label != other.label)
            || (!self.absent.category && self.category != other.category)
    }

    /// Same label and the same set of options, ignoring order and category.
    /// Fields this bank never carried count as equal.
    pub fn same_contents(&self, other: &Bank) -> bool {
        (self.absent.label || self.label == other.label)
            && (self.absent.options
                || (self.options.len() == other.options.len()
                    && self.options.iter().all(|opt| other.has_option(opt))))
    }

    /// Take every field this bank never carried from `other`.
    pub fn fill_absent(&mut self, other: &Bank) {
        if self.absent.label {
            self.label = other.label.clone();
        }
        if self.absent.category {
            self.category = other.category.clone();
        }
        if self.absent.options {
            self.options = other.options.clone();
        }
        self.absent = AbsentBankFields::default();
    }
}

/// A named group of banks in the library sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub label: LocalizedText,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "slate".to_string()
}
