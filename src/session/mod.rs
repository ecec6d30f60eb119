pub mod undo;

pub use undo::*;

use chrono::{DateTime, Utc};

use crate::model::config::EngineConfig;
use crate::model::library::Library;
use crate::model::template::Template;
use crate::model::text::LocalizedText;
use crate::ops::linkage::{self, add_custom_option, propagate_selection, sync_all_groups, sync_group};
use crate::ops::reconcile::reconcile;
use crate::ops::selection::{resolve_occurrence, resolve_text};
use crate::parse::{ParsedText, PlaceholderToken, parse_placeholders, split_occurrence_key};

/// Error type for session commands
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),
    #[error("no active template")]
    NoActiveTemplate,
}

/// One editing session over a library: the active template, the language
/// being edited, its edit history and the last system release applied.
///
/// All state lives here and is mutated only through these methods.
#[derive(Debug, Clone)]
pub struct Session {
    library: Library,
    active: Option<String>,
    language: String,
    history: EditHistory,
    baseline: Option<Library>,
    config: EngineConfig,
    clock: fn() -> DateTime<Utc>,
}

impl Session {
    /// Start a session on the first template of `library`.
    pub fn new(library: Library, config: EngineConfig) -> Self {
        let active = library.templates.first().map(|t| t.id.clone());
        Session {
            library,
            active,
            language: config.locale.language.clone(),
            history: EditHistory::new(&config.history),
            baseline: None,
            config,
            clock: Utc::now,
        }
    }

    /// Resume with the release the library was last reconciled against.
    pub fn with_baseline(mut self, baseline: Library) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Replace the time source used for typing coalescing.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Direct access for bank and template commands. Changes made through
    /// this reference are not recorded in the edit history.
    pub fn library_mut(&mut self) -> &mut Library {
        &mut self.library
    }

    pub fn into_library(self) -> Library {
        self.library
    }

    pub fn baseline(&self) -> Option<&Library> {
        self.baseline.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, lang: &str) {
        self.language = lang.to_string();
        self.history.end_burst();
    }

    pub fn active_template_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_template(&self) -> Option<&Template> {
        self.active.as_deref().and_then(|id| self.library.template(id))
    }

    /// Switch templates. History does not carry over.
    pub fn set_active_template(&mut self, id: &str) -> Result<(), SessionError> {
        if !self.library.has_template(id) {
            return Err(SessionError::TemplateNotFound(id.to_string()));
        }
        if self.active.as_deref() != Some(id) {
            self.active = Some(id.to_string());
            self.history.reset();
        }
        Ok(())
    }

    /// Content of the active template in the session language
    pub fn content_text(&self) -> &str {
        self.active_template()
            .map_or("", |t| t.text(&self.language))
    }

    pub fn parsed(&self) -> ParsedText {
        parse_placeholders(self.content_text())
    }

    pub fn cursor_token(&self, cursor: usize) -> Option<PlaceholderToken> {
        self.parsed().token_at(cursor).cloned()
    }

    // -----------------------------------------------------------------------
    // Content commands
    // -----------------------------------------------------------------------

    /// Replace the content for the session language. Groups formed by the
    /// edit are synchronized right away.
    pub fn edit_content(&mut self, text: &str, kind: EditKind) -> Result<(), SessionError> {
        self.mutate(kind, |template, lang| {
            template.content = template.content.with_language(lang, text);
            sync_all_groups(&mut template.selections, &parse_placeholders(text));
        })
    }

    /// Insert ` {{key}} ` at `cursor` and return the cursor after it.
    pub fn insert_placeholder(&mut self, cursor: usize, key: &str) -> Result<usize, SessionError> {
        let key = key.trim();
        self.mutate(EditKind::InsertPlaceholder, |template, lang| {
            let text = template.text(lang);
            let mut at = cursor.min(text.len());
            while !text.is_char_boundary(at) {
                at -= 1;
            }
            let insert = format!(" {{{{{key}}}}} ");
            let mut updated = String::with_capacity(text.len() + insert.len());
            updated.push_str(&text[..at]);
            updated.push_str(&insert);
            updated.push_str(&text[at..]);
            template.content = template.content.with_language(lang, updated);
            at + insert.len()
        })
    }

    /// Move the token under the cursor into group `group`. The token adopts
    /// the group's existing value if it has one. Returns the adjusted cursor,
    /// or `None` if the cursor is not inside a token.
    pub fn assign_group(&mut self, cursor: usize, group: u32) -> Result<Option<usize>, SessionError> {
        let Some(edit) = linkage::assign_group(self.content_text(), cursor, group) else {
            return Ok(None);
        };
        self.mutate(EditKind::GroupChange, |template, lang| {
            template.content = template.content.with_language(lang, edit.text.as_str());
            let parsed = parse_placeholders(&edit.text);
            if let Some(group) = &edit.group_id
                && let Some(token) = parsed.find(&edit.occurrence_key)
            {
                sync_group(
                    &mut template.selections,
                    &parsed,
                    &token.base_key,
                    group,
                    Some(edit.occurrence_key.as_str()),
                );
            }
            Some(edit.cursor)
        })
    }

    /// Take the token under the cursor out of its group. Its current value
    /// stays. Returns the adjusted cursor, or `None` when there was nothing
    /// to remove.
    pub fn remove_group(&mut self, cursor: usize) -> Result<Option<usize>, SessionError> {
        let Some(edit) = linkage::remove_group(self.content_text(), cursor) else {
            return Ok(None);
        };
        self.mutate(EditKind::GroupChange, |template, lang| {
            template.content = template.content.with_language(lang, edit.text.as_str());
            Some(edit.cursor)
        })
    }

    /// Close the current typing burst.
    pub fn end_typing_burst(&mut self) {
        self.history.end_burst();
    }

    // -----------------------------------------------------------------------
    // Selection commands
    // -----------------------------------------------------------------------

    /// Pick `value` for one occurrence; every linked occurrence follows.
    /// Returns the occurrence keys written.
    pub fn select(&mut self, occurrence_key: &str, value: LocalizedText) -> Result<Vec<String>, SessionError> {
        self.mutate(EditKind::Selection, |template, lang| {
            let parsed = parse_placeholders(template.text(lang));
            propagate_selection(&mut template.selections, &parsed, occurrence_key, value)
        })
    }

    /// Like [`Session::select`] for a typed-in value, which is also added to
    /// the bank of the occurrence's base key.
    pub fn select_custom(&mut self, occurrence_key: &str, value: LocalizedText) -> Result<Vec<String>, SessionError> {
        active_in(&mut self.library, self.active.as_deref())?;
        let base_key = match self.parsed().find(occurrence_key) {
            Some(token) => Some(token.base_key.clone()),
            None => split_occurrence_key(occurrence_key).map(|(base, _)| base.to_string()),
        };
        if let Some(base_key) = base_key {
            add_custom_option(&mut self.library.banks, &base_key, &value);
        }
        self.select(occurrence_key, value)
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        let Ok(template) = active_in(&mut self.library, self.active.as_deref()) else {
            return false;
        };
        match self.history.undo(Snapshot::of(template)) {
            Some(previous) => {
                previous.restore(template);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        let Ok(template) = active_in(&mut self.library, self.active.as_deref()) else {
            return false;
        };
        match self.history.redo(Snapshot::of(template)) {
            Some(next) => {
                next.restore(template);
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// Value an occurrence displays, or `None` if it has neither a selection
    /// nor a bank default.
    pub fn resolve(&self, occurrence_key: &str, base_key: &str) -> Option<String> {
        let template = self.active_template()?;
        resolve_occurrence(
            &template.selections,
            &self.library.defaults,
            occurrence_key,
            base_key,
            &self.language,
        )
    }

    /// What the renderer shows for an occurrence: its resolved value, or the
    /// raw token text when nothing is filled in.
    pub fn display_value(&self, occurrence_key: &str, base_key: &str) -> String {
        if let Some(value) = self.resolve(occurrence_key, base_key) {
            return value;
        }
        let text = self.content_text();
        match parse_placeholders(text).find(occurrence_key) {
            Some(token) => token.span.slice(text).to_string(),
            None => format!("{{{{{base_key}}}}}"),
        }
    }

    /// The active template flattened to its final text.
    pub fn render(&self) -> String {
        match self.active_template() {
            Some(template) => resolve_text(
                template.text(&self.language),
                &template.selections,
                &self.library.defaults,
                &self.language,
            ),
            None => String::new(),
        }
    }

    // -----------------------------------------------------------------------
    // System releases
    // -----------------------------------------------------------------------

    /// Reconcile the library with `release` and remember it as the baseline
    /// for the next one. Returns the conflict notes.
    pub fn apply_release(&mut self, release: Library) -> Vec<String> {
        let merged = reconcile(
            &self.library,
            self.baseline.as_ref(),
            &release,
            &self.config.reconcile,
            &self.language,
        );
        self.library = merged.library;
        self.baseline = Some(release);

        if !self.active.as_deref().is_some_and(|id| self.library.has_template(id)) {
            self.active = self.library.templates.first().map(|t| t.id.clone());
        }
        self.history.reset();
        merged.notes
    }

    /// Run `edit` on the active template and record the prior state if
    /// anything changed.
    fn mutate<R>(
        &mut self,
        kind: EditKind,
        edit: impl FnOnce(&mut Template, &str) -> R,
    ) -> Result<R, SessionError> {
        let now = (self.clock)();
        let template = active_in(&mut self.library, self.active.as_deref())?;
        let before = Snapshot::of(template);
        let out = edit(template, &self.language);
        if !before.matches(template) {
            self.history.record(before, kind, now);
        }
        Ok(out)
    }
}

fn active_in<'a>(library: &'a mut Library, active: Option<&str>) -> Result<&'a mut Template, SessionError> {
    let id = active.ok_or(SessionError::NoActiveTemplate)?;
    library
        .template_mut(id)
        .ok_or_else(|| SessionError::TemplateNotFound(id.to_string()))
}
