use chrono::{DateTime, Utc};

use crate::model::config::HistoryConfig;
use crate::model::template::{Selections, Template};
use crate::model::text::LocalizedText;

/// Everything an undo step restores: the content in all languages and the
/// selections that belong to it, always together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub content: LocalizedText,
    pub selections: Selections,
}

impl Snapshot {
    pub fn of(template: &Template) -> Self {
        Snapshot {
            content: template.content.clone(),
            selections: template.selections.clone(),
        }
    }

    pub fn restore(self, template: &mut Template) {
        template.content = self.content;
        template.selections = self.selections;
    }

    pub fn matches(&self, template: &Template) -> bool {
        self.content == template.content && self.selections == template.selections
    }
}

/// The user action behind a recorded change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Keystroke-level edit; consecutive ones inside the coalescing window
    /// form a single step
    Typing,
    Paste,
    InsertPlaceholder,
    GroupChange,
    Selection,
}

/// Linear undo/redo over snapshots of the active template
#[derive(Debug, Clone)]
pub struct EditHistory {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    limit: usize,
    coalesce_ms: u64,
    /// Time of the last typing edit while a burst is open
    burst: Option<DateTime<Utc>>,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl EditHistory {
    pub fn new(config: &HistoryConfig) -> Self {
        EditHistory {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: config.limit.max(1),
            coalesce_ms: config.coalesce_ms,
            burst: None,
        }
    }

    /// Record a committed change. `before` is the state the change started
    /// from. Clears the redo stack. Returns `false` when the change was folded
    /// into the open typing burst instead of becoming its own step.
    pub fn record(&mut self, before: Snapshot, kind: EditKind, now: DateTime<Utc>) -> bool {
        self.redo.clear();

        if kind == EditKind::Typing {
            let in_burst = self.burst.is_some_and(|last| self.within_window(last, now));
            self.burst = Some(now);
            if in_burst && !self.undo.is_empty() {
                return false;
            }
        } else {
            self.burst = None;
        }

        self.undo.push(before);
        if self.undo.len() > self.limit {
            self.undo.drain(..self.undo.len() - self.limit);
        }
        true
    }

    fn within_window(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        u64::try_from((now - last).num_milliseconds()).is_ok_and(|elapsed| elapsed <= self.coalesce_ms)
    }

    /// Close the open typing burst (blur, cursor jump) so the next keystroke
    /// starts a new step.
    pub fn end_burst(&mut self) {
        self.burst = None;
    }

    /// Step back. `current` is pushed onto the redo stack and the previous
    /// snapshot is returned for the caller to restore.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop()?;
        self.burst = None;
        self.redo.push(current);
        tracing::debug!(undo = self.undo.len(), redo = self.redo.len(), "undo");
        Some(previous)
    }

    /// Inverse of [`EditHistory::undo`].
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        self.burst = None;
        self.undo.push(current);
        tracing::debug!(undo = self.undo.len(), redo = self.redo.len(), "redo");
        Some(next)
    }

    /// Drop both stacks, e.g. when another template becomes active.
    pub fn reset(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.burst = None;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
}
