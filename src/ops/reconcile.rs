use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::bank::{Bank, Category};
use crate::model::config::ReconcileConfig;
use crate::model::library::Library;
use crate::model::template::Template;
use crate::model::text::LocalizedText;
use crate::ops::template_ops::rename_keys_in_template;

const FALLBACK_RENAME_SUFFIX: &str = "system";

/// Output of one reconciliation pass
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub library: Library,
    /// One line per detected conflict, for direct display
    pub notes: Vec<String>,
    pub summary: ReconcileSummary,
}

/// What a pass did, by entity class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub templates_upgraded: usize,
    pub templates_added: usize,
    pub templates_kept: usize,
    pub backups_created: usize,
    pub banks_upgraded: usize,
    pub banks_merged: usize,
    pub banks_added: usize,
    pub keys_renamed: usize,
}

/// Merge the user's library with a newer system release.
///
/// `baseline` is the release the user's library was last reconciled with; it
/// is what lets an untouched copy be told apart from an edited one. Without a
/// baseline only structurally equal copies are adopted, every other copy is
/// kept, and no bank key is treated as a collision.
///
/// Never fails: conflicts are resolved in favour of the user's data and
/// reported in [`Reconciled::notes`]. Running the pass again on its own
/// output (with `release` as the baseline) changes nothing and yields no
/// notes.
pub fn reconcile(
    user: &Library,
    baseline: Option<&Library>,
    release: &Library,
    config: &ReconcileConfig,
    lang: &str,
) -> Reconciled {
    let mut pass = Pass {
        config,
        lang,
        notes: Vec::new(),
        summary: ReconcileSummary::default(),
    };

    let renames = plan_bank_renames(user, baseline, release, rename_suffix(config));
    for (old, new) in &renames {
        if !user.banks.contains_key(new) {
            pass.notes.push(format!(
                "Bank key \"{old}\" is already used by one of your banks; the system bank was imported as \"{new}\""
            ));
        }
    }
    pass.summary.keys_renamed = renames.len();

    let lookup: HashMap<String, String> = renames.into_iter().collect();
    let release = with_renamed_keys(release, &lookup);
    let baseline = baseline.map(|b| with_renamed_keys(b, &lookup));
    let baseline = baseline.as_ref();

    let templates = pass.merge_templates(user, baseline, &release);
    let banks = pass.merge_banks(user, baseline, &release);
    let defaults = merge_defaults(user, baseline, &release);
    let categories = merge_categories(user, &release);

    let Pass { notes, summary, .. } = pass;
    tracing::info!(
        templates_upgraded = summary.templates_upgraded,
        templates_added = summary.templates_added,
        backups_created = summary.backups_created,
        banks_upgraded = summary.banks_upgraded,
        banks_merged = summary.banks_merged,
        banks_added = summary.banks_added,
        keys_renamed = summary.keys_renamed,
        notes = notes.len(),
        "reconciled library with system release"
    );

    Reconciled {
        library: Library {
            templates,
            banks,
            defaults,
            categories,
        },
        notes,
        summary,
    }
}

struct Pass<'a> {
    config: &'a ReconcileConfig,
    lang: &'a str,
    notes: Vec<String>,
    summary: ReconcileSummary,
}

impl Pass<'_> {
    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    fn merge_templates(
        &mut self,
        user: &Library,
        baseline: Option<&Library>,
        release: &Library,
    ) -> Vec<Template> {
        let mut merged = Vec::with_capacity(user.templates.len() + release.templates.len());
        let mut backups: Vec<&Template> = Vec::new();

        for own in &user.templates {
            let Some(system) = release.template(&own.id) else {
                merged.push(own.clone());
                continue;
            };
            if own.is_blank() || own.agrees_with(system) {
                merged.push(system.clone());
                continue;
            }
            let prior = baseline.and_then(|b| b.template(&own.id));
            if prior.is_some_and(|p| own.agrees_with(p)) {
                tracing::debug!(id = %own.id, "upgrading unedited system template");
                self.summary.templates_upgraded += 1;
                merged.push(system.clone());
                continue;
            }

            tracing::debug!(id = %own.id, "keeping locally edited system template");
            self.summary.templates_kept += 1;
            let mut kept = own.clone();
            kept.fill_absent(system);
            kept.tags = system.tags.clone();
            merged.push(kept);
            backups.push(system);
        }

        for system in &release.templates {
            if user.has_template(&system.id) {
                continue;
            }
            if baseline.is_some_and(|b| b.has_template(&system.id)) {
                tracing::debug!(id = %system.id, "system template was deleted locally, not restoring");
                continue;
            }
            self.summary.templates_added += 1;
            merged.push(system.clone());
        }

        for system in backups {
            self.insert_backup(&mut merged, system);
        }
        merged
    }

    /// Place a copy of `system` right after the user's copy, unless an
    /// equal copy already sits in the backup family.
    fn insert_backup(&mut self, templates: &mut Vec<Template>, system: &Template) {
        let family = format!("{}{}", system.id, self.config.backup_suffix);
        if templates
            .iter()
            .any(|t| in_family(&t.id, &family) && t.same_body(system))
        {
            tracing::debug!(id = %system.id, "backup of system version already present");
            return;
        }

        let Some(backup_id) =
            numbered(&family).find(|id| !templates.iter().any(|t| &t.id == id))
        else {
            return;
        };

        let mut backup = system.clone();
        backup.id = backup_id.clone();
        backup.name = system.name.with_suffix(&self.config.backup_label);

        let at = templates
            .iter()
            .position(|t| t.id == system.id)
            .map_or(templates.len(), |idx| idx + 1);
        templates.insert(at, backup);

        self.summary.backups_created += 1;
        self.notes.push(format!(
            "Template \"{}\" ({}) has local edits; the new system version was saved as \"{}\"",
            system.name.resolve(self.lang),
            system.id,
            backup_id
        ));
    }

    // -----------------------------------------------------------------------
    // Banks
    // -----------------------------------------------------------------------

    fn merge_banks(
        &mut self,
        user: &Library,
        baseline: Option<&Library>,
        release: &Library,
    ) -> IndexMap<String, Bank> {
        let mut merged = IndexMap::with_capacity(user.banks.len() + release.banks.len());

        for (key, own) in &user.banks {
            let bank = match release.banks.get(key) {
                Some(system) => {
                    let prior = baseline.and_then(|b| b.banks.get(key));
                    self.merge_bank(key, own, prior, system)
                }
                None => own.clone(),
            };
            merged.insert(key.clone(), bank);
        }

        for (key, system) in &release.banks {
            if merged.contains_key(key) {
                continue;
            }
            if baseline.is_some_and(|b| b.banks.contains_key(key)) {
                tracing::debug!(key = %key, "system bank was deleted locally, not restoring");
                continue;
            }
            self.summary.banks_added += 1;
            merged.insert(key.clone(), system.clone());
        }
        merged
    }

    fn merge_bank(&mut self, key: &str, own: &Bank, prior: Option<&Bank>, system: &Bank) -> Bank {
        if own.is_blank() {
            return system.clone();
        }
        // Fields the user's copy never carried take the system side.
        let mut bank = own.clone();
        bank.fill_absent(system);
        if !bank.header_differs(system) && bank.options == system.options {
            return system.clone();
        }
        if let Some(prior) = prior
            && (own.absent.options || prior.options == own.options)
        {
            tracing::debug!(key, "upgrading unedited bank");
            self.summary.banks_upgraded += 1;
            return system.clone();
        }

        // Options already in the baseline were the user's to keep or drop.
        let mut added = 0;
        for option in &system.options {
            if prior.is_some_and(|p| p.has_option(option)) {
                continue;
            }
            if bank.push_option(option.clone()) {
                added += 1;
            }
        }
        self.summary.banks_merged += 1;
        tracing::debug!(key, added, "kept locally edited bank");

        // Without a baseline every divergence is new to the user.
        let header_diverged = own.header_differs(system);
        let header_moved = prior.is_none_or(|p| p.header_differs(system));
        if added > 0 || (header_diverged && header_moved) {
            let mut note = format!("Bank \"{key}\" has local edits");
            if added > 0 {
                note.push_str(&format!("; added {added} new system option(s)"));
            }
            if header_diverged {
                note.push_str("; your label and category were kept");
            }
            self.notes.push(note);
        }
        bank
    }
}

// ---------------------------------------------------------------------------
// Key collisions
// ---------------------------------------------------------------------------

/// Decide which release bank keys must be imported under another key, in
/// release order.
///
/// A key is renamed when its bank differs from the system bank and either
/// the user already has a bank in its rename family (an earlier pass
/// imported it there), or the previous release did not have the key at all.
fn plan_bank_renames(
    user: &Library,
    baseline: Option<&Library>,
    release: &Library,
    suffix: &str,
) -> Vec<(String, String)> {
    let mut renames: Vec<(String, String)> = Vec::new();

    for (key, system) in &release.banks {
        let Some(own) = user.banks.get(key) else {
            continue;
        };
        if own.is_blank() || own.same_contents(system) {
            continue;
        }
        let family = format!("{key}_{suffix}");
        if let Some(existing) = user.banks.keys().find(|k| in_family(k, &family)) {
            renames.push((key.clone(), existing.clone()));
            continue;
        }

        let Some(baseline) = baseline else {
            continue;
        };
        if baseline.banks.contains_key(key) {
            continue;
        }

        let target = numbered(&family).find(|candidate| {
            !user.banks.contains_key(candidate)
                && !release.banks.contains_key(candidate)
                && !renames.iter().any(|(_, t)| t == candidate)
        });
        if let Some(target) = target {
            tracing::debug!(key = %key, target = %target, "system bank key collides with a local bank");
            renames.push((key.clone(), target));
        }
    }
    renames
}

/// Suffixes made only of digits would read back as a group id.
fn rename_suffix(config: &ReconcileConfig) -> &str {
    let suffix = config.rename_suffix.as_str();
    if suffix.is_empty() || suffix.bytes().all(|b| b.is_ascii_digit()) {
        tracing::warn!(suffix, "unusable rename suffix, using default");
        FALLBACK_RENAME_SUFFIX
    } else {
        suffix
    }
}

fn with_renamed_keys(library: &Library, renames: &HashMap<String, String>) -> Library {
    if renames.is_empty() {
        return library.clone();
    }
    let renamed = |key: &String| renames.get(key).unwrap_or(key).clone();

    let mut out = library.clone();
    out.banks = library
        .banks
        .iter()
        .map(|(k, v)| (renamed(k), v.clone()))
        .collect();
    out.defaults = library
        .defaults
        .iter()
        .map(|(k, v)| (renamed(k), v.clone()))
        .collect();
    for template in &mut out.templates {
        rename_keys_in_template(template, renames);
    }
    out
}

/// `base`, `base2`, `base3`, ...
fn numbered(base: &str) -> impl Iterator<Item = String> {
    let base = base.to_string();
    std::iter::once(base.clone()).chain((2usize..).map(move |n| format!("{base}{n}")))
}

/// `id` is `family` itself or `family` followed by digits.
fn in_family(id: &str, family: &str) -> bool {
    id.strip_prefix(family)
        .is_some_and(|rest| rest.bytes().all(|b| b.is_ascii_digit()))
}

// ---------------------------------------------------------------------------
// Defaults and categories
// ---------------------------------------------------------------------------

fn merge_defaults(
    user: &Library,
    baseline: Option<&Library>,
    release: &Library,
) -> IndexMap<String, LocalizedText> {
    let mut merged = user.defaults.clone();
    for (key, value) in &release.defaults {
        let prior = baseline.and_then(|b| b.defaults.get(key));
        let take = match user.defaults.get(key) {
            // deleted along with its bank
            None => prior.is_none(),
            Some(current) => current.is_blank() || prior == Some(current),
        };
        if take {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn merge_categories(
    user: &Library,
    release: &Library,
) -> IndexMap<String, Category> {
    let mut merged = user.categories.clone();
    for (key, category) in &release.categories {
        merged
            .entry(key.clone())
            .or_insert_with(|| category.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bank(label: &str, options: &[&str]) -> Bank {
        Bank::new(label.into(), "other").with_options(options.iter().map(|o| LocalizedText::from(*o)))
    }

    fn template(id: &str, name: &str, content: &str) -> Template {
        Template::new(id, name.into(), content.into())
    }

    fn run(user: &Library, baseline: Option<&Library>, release: &Library) -> Reconciled {
        reconcile(user, baseline, release, &ReconcileConfig::default(), "en")
    }

    fn options(lib: &Library, key: &str) -> Vec<String> {
        lib.banks[key]
            .options
            .iter()
            .map(|o| o.resolve("en").to_string())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Banks
    // -----------------------------------------------------------------------

    #[test]
    fn unedited_bank_takes_new_options_silently() {
        let mut v1 = Library::default();
        v1.banks.insert("size".into(), bank("Size", &["S", "M"]));
        let mut v2 = Library::default();
        v2.banks.insert("size".into(), bank("Size", &["S", "M", "L"]));

        let out = run(&v1.clone(), Some(&v1), &v2);
        assert_eq!(options(&out.library, "size"), vec!["S", "M", "L"]);
        assert!(out.notes.is_empty());
        assert_eq!(out.summary.banks_upgraded, 1);
    }

    #[test]
    fn edited_bank_keeps_user_options_and_gains_new_ones() {
        let mut v1 = Library::default();
        v1.banks.insert("mood".into(), bank("Mood", &["calm"]));
        let mut user = v1.clone();
        user.banks.insert("mood".into(), bank("Mood", &["calm", "excited"]));
        let mut v2 = Library::default();
        v2.banks.insert("mood".into(), bank("Mood", &["calm", "neutral"]));

        let out = run(&user, Some(&v1), &v2);
        assert_eq!(options(&out.library, "mood"), vec!["calm", "excited", "neutral"]);
        insta::assert_snapshot!(out.notes.join("\n"), @r#"Bank "mood" has local edits; added 1 new system option(s)"#);
    }

    #[test]
    fn option_removed_by_user_is_not_readded() {
        let mut v1 = Library::default();
        v1.banks.insert("mood".into(), bank("Mood", &["calm", "angry"]));
        let mut user = v1.clone();
        user.banks.insert("mood".into(), bank("Mood", &["calm"]));
        let mut v2 = Library::default();
        v2.banks.insert("mood".into(), bank("Mood", &["calm", "angry", "neutral"]));

        let out = run(&user, Some(&v1), &v2);
        assert_eq!(options(&out.library, "mood"), vec!["calm", "neutral"]);
    }

    #[test]
    fn deleted_system_bank_stays_deleted() {
        let mut v1 = Library::default();
        v1.banks.insert("size".into(), bank("Size", &["S"]));
        let user = Library::default();

        let out = run(&user, Some(&v1), &v1);
        assert!(out.library.banks.is_empty());

        // first run: nothing proves the user removed it
        let out = run(&user, None, &v1);
        assert!(out.library.banks.contains_key("size"));
    }

    #[test]
    fn bank_without_options_field_takes_system_options() {
        let mut v1 = Library::default();
        v1.banks.insert("size".into(), bank("Size", &["S", "M"]));
        let mut v2 = Library::default();
        v2.banks.insert("size".into(), bank("Size", &["S", "M", "L"]));

        let mut user = Library::default();
        let stored: Bank = serde_json::from_str(r#"{"label":"Size","category":"other"}"#).unwrap();
        user.banks.insert("size".into(), stored);

        let out = run(&user, Some(&v1), &v2);
        assert_eq!(options(&out.library, "size"), vec!["S", "M", "L"]);
        assert!(out.notes.is_empty(), "unexpected notes: {:?}", out.notes);

        let first_run = run(&user, None, &v2);
        assert_eq!(options(&first_run.library, "size"), vec!["S", "M", "L"]);
        assert!(first_run.notes.is_empty(), "unexpected notes: {:?}", first_run.notes);
    }

    #[test]
    fn diverging_header_is_noted_on_first_run() {
        let mut user = Library::default();
        user.banks.insert("mood".into(), bank("Feelings", &["calm", "sad"]));
        let mut v2 = Library::default();
        v2.banks.insert("mood".into(), bank("Mood", &["calm"]));

        let out = run(&user, None, &v2);
        assert_eq!(out.library.banks["mood"].label, LocalizedText::from("Feelings"));
        insta::assert_snapshot!(out.notes.join("\n"), @r#"Bank "mood" has local edits; your label and category were kept"#);

        // once the release is the baseline the divergence is old news
        assert!(run(&out.library, Some(&v2), &v2).notes.is_empty());
    }

    #[test]
    fn relabelled_bank_is_noted_only_when_the_system_moves() {
        let mut v1 = Library::default();
        v1.banks.insert("mood".into(), bank("Mood", &["calm"]));
        let mut user = v1.clone();
        user.banks.insert("mood".into(), bank("Feelings", &["calm", "sad"]));

        // same release again: nothing new to report
        assert!(run(&user, Some(&v1), &v1).notes.is_empty());

        let mut v2 = Library::default();
        v2.banks.insert("mood".into(), bank("Mood & tone", &["calm"]));
        let out = run(&user, Some(&v1), &v2);
        assert_eq!(out.library.banks["mood"].label, LocalizedText::from("Feelings"));
        insta::assert_snapshot!(out.notes.join("\n"), @r#"Bank "mood" has local edits; your label and category were kept"#);
    }

    // -----------------------------------------------------------------------
    // Templates
    // -----------------------------------------------------------------------

    #[test]
    fn unedited_template_upgrades_and_edited_one_gets_backup() {
        let mut v1 = Library::default();
        v1.templates.push(template("tpl_a", "Cat", "A {{color}} cat"));
        v1.templates.push(template("tpl_b", "Dog", "A {{color}} dog"));

        let mut user = v1.clone();
        user.templates[1].content = "A big {{color}} dog".into();
        user.templates.push(template("mine", "Mine", "{{x}}"));

        let mut v2 = Library::default();
        v2.templates.push(template("tpl_a", "Cat", "A {{color}} cat on a mat"));
        v2.templates.push(template("tpl_b", "Dog", "A {{color}} dog on a rug"));

        let out = run(&user, Some(&v1), &v2);
        let ids: Vec<_> = out.library.templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tpl_a", "tpl_b", "tpl_b_backup", "mine"]);

        let lib = &out.library;
        assert_eq!(lib.template("tpl_a").unwrap().text("en"), "A {{color}} cat on a mat");
        assert_eq!(lib.template("tpl_b").unwrap(), &user.templates[1]);
        let backup = lib.template("tpl_b_backup").unwrap();
        assert_eq!(backup.text("en"), "A {{color}} dog on a rug");
        assert_eq!(backup.name.resolve("en"), "Dog (backup)");
        assert_eq!(lib.template("mine").unwrap(), &user.templates[2]);

        insta::assert_snapshot!(out.notes.join("\n"), @r#"Template "Dog" (tpl_b) has local edits; the new system version was saved as "tpl_b_backup""#);
    }

    #[test]
    fn edited_copy_takes_system_tags() {
        let mut v1 = Library::default();
        v1.templates.push(template("t", "T", "one"));
        let mut user = v1.clone();
        user.templates[0].content = "mine".into();
        user.templates[0].tags = vec!["old".into()];
        let mut v2 = v1.clone();
        v2.templates[0].content = "two".into();
        v2.templates[0].tags = vec!["new".into()];

        let out = run(&user, Some(&v1), &v2);
        let kept = out.library.template("t").unwrap();
        assert_eq!(kept.text("en"), "mine");
        assert_eq!(kept.tags, vec!["new"]);
    }

    #[test]
    fn backup_is_not_duplicated_and_ids_are_numbered() {
        let mut v1 = Library::default();
        v1.templates.push(template("t", "T", "one"));
        let mut user = v1.clone();
        user.templates[0].content = "mine".into();
        // an unrelated template already uses the plain backup id
        user.templates.push(template("t_backup", "Other", "other"));

        let mut v2 = v1.clone();
        v2.templates[0].content = "two".into();

        let first = run(&user, Some(&v1), &v2);
        assert!(first.library.has_template("t_backup2"));

        let second = run(&first.library, Some(&v1), &v2);
        assert!(second.notes.is_empty());
        assert_eq!(second.library.templates.len(), first.library.templates.len());
    }

    #[test]
    fn deleted_system_template_stays_deleted() {
        let mut v1 = Library::default();
        v1.templates.push(template("t", "T", "one"));
        let mut v2 = v1.clone();
        v2.templates.push(template("u", "U", "two"));

        let out = run(&Library::default(), Some(&v1), &v2);
        let ids: Vec<_> = out.library.templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["u"]);
        assert_eq!(out.summary.templates_added, 1);
    }

    #[test]
    fn template_without_name_field_is_not_an_edit() {
        let mut v1 = Library::default();
        v1.templates.push(template("t", "Cat", "A {{color}} cat"));
        let mut v2 = Library::default();
        v2.templates.push(template("t", "Cat", "A {{color}} cat on a mat"));

        let mut user = Library::default();
        let stored: Template = serde_json::from_str(r#"{"id":"t","content":"A {{color}} cat","selections":{}}"#).unwrap();
        user.templates.push(stored);

        let out = run(&user, Some(&v1), &v2);
        let ids: Vec<_> = out.library.templates.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t"]);
        assert_eq!(out.library.template("t").unwrap().text("en"), "A {{color}} cat on a mat");
        assert!(out.notes.is_empty(), "unexpected notes: {:?}", out.notes);
    }

    #[test]
    fn kept_template_fills_missing_fields_from_system() {
        let mut v1 = Library::default();
        v1.templates.push(template("t", "Cat", "one"));
        let mut v2 = Library::default();
        v2.templates.push(template("t", "Cat", "two"));

        let mut user = Library::default();
        let stored: Template = serde_json::from_str(r#"{"id":"t","content":"mine"}"#).unwrap();
        user.templates.push(stored);

        let out = run(&user, Some(&v1), &v2);
        let kept = out.library.template("t").unwrap();
        assert_eq!(kept.text("en"), "mine");
        assert_eq!(kept.name, LocalizedText::from("Cat"));
        assert!(out.library.has_template("t_backup"));
    }

    #[test]
    fn blank_copy_takes_system_version() {
        let mut v2 = Library::default();
        v2.templates.push(template("t", "T", "two"));
        let mut user = Library::default();
        user.templates.push(template("t", "", ""));

        let out = run(&user, None, &v2);
        assert_eq!(out.library.template("t").unwrap(), &v2.templates[0]);
        assert!(out.notes.is_empty());
    }

    // -----------------------------------------------------------------------
    // Key collisions
    // -----------------------------------------------------------------------

    fn collision_setup() -> (Library, Library, Library) {
        let v1 = Library::default();
        let mut user = Library::default();
        user.banks.insert("color".into(), bank("Paint", &["matte", "gloss"]));
        let mut tpl = template("mine", "Mine", "{{color}} finish");
        tpl.selections.set("color-0", "gloss".into());
        user.templates.push(tpl);

        let mut v2 = Library::default();
        v2.banks.insert("color".into(), bank("Color", &["red", "blue"]));
        v2.defaults.insert("color".into(), "red".into());
        let mut sys = template("tpl_cat", "Cat", "A {{color}} cat on a {{color_1}} mat");
        sys.selections.set("color-0", "blue".into());
        v2.templates.push(sys);
        (v1, user, v2)
    }

    #[test]
    fn colliding_system_key_is_imported_under_new_key() {
        let (v1, user, v2) = collision_setup();
        let out = run(&user, Some(&v1), &v2);
        let lib = &out.library;

        assert_eq!(lib.banks["color"], user.banks["color"]);
        assert_eq!(options(lib, "color_system"), vec!["red", "blue"]);
        assert_eq!(lib.defaults.get("color_system"), Some(&LocalizedText::from("red")));
        assert!(!lib.defaults.contains_key("color"));

        let cat = lib.template("tpl_cat").unwrap();
        assert_eq!(cat.text("en"), "A {{color_system}} cat on a {{color_system_1}} mat");
        assert!(cat.selections.contains("color_system-0"));
        assert_eq!(lib.template("mine").unwrap(), &user.templates[0]);

        insta::assert_snapshot!(out.notes.join("\n"), @r#"Bank key "color" is already used by one of your banks; the system bank was imported as "color_system""#);
    }

    #[test]
    fn collision_rename_is_remembered() {
        let (v1, user, v2) = collision_setup();
        let first = run(&user, Some(&v1), &v2);

        let mut v3 = v2.clone();
        v3.banks.insert("color".into(), bank("Color", &["red", "blue", "green"]));
        let second = run(&first.library, Some(&v2), &v3);

        assert!(second.notes.is_empty());
        assert_eq!(options(&second.library, "color_system"), vec!["red", "blue", "green"]);
        assert_eq!(second.library.banks["color"], user.banks["color"]);
    }

    #[test]
    fn own_bank_in_rename_family_is_left_alone() {
        let (v1, mut user, v2) = collision_setup();
        // the user's `color` matches the system and `color_system` is their own
        user.banks.insert("color".into(), bank("Color", &["red", "blue"]));
        user.banks.insert("color_system".into(), bank("System colors", &["rgb", "cmyk"]));

        let out = run(&user, Some(&v1), &v2);
        assert_eq!(options(&out.library, "color_system"), vec!["rgb", "cmyk"]);
        assert_eq!(out.summary.keys_renamed, 0);
        assert_eq!(
            out.library.template("tpl_cat").unwrap().text("en"),
            "A {{color}} cat on a {{color_1}} mat"
        );
    }

    #[test]
    fn equal_bank_or_first_run_is_not_a_collision() {
        let (v1, mut user, v2) = collision_setup();
        assert!(!run(&user, None, &v2).library.banks.contains_key("color_system"));

        user.banks.insert("color".into(), bank("Color", &["blue", "red"]));
        let out = run(&user, Some(&v1), &v2);
        assert!(!out.library.banks.contains_key("color_system"));
        assert!(out.notes.is_empty());
    }

    #[test]
    fn digit_suffix_falls_back() {
        let (v1, user, v2) = collision_setup();
        let config = ReconcileConfig {
            rename_suffix: "2".into(),
            ..ReconcileConfig::default()
        };
        let out = reconcile(&user, Some(&v1), &v2, &config, "en");
        assert!(out.library.banks.contains_key("color_system"));
    }

    // -----------------------------------------------------------------------
    // Defaults and categories
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_follow_the_system_unless_edited() {
        let mut v1 = Library::default();
        v1.defaults.insert("a".into(), "one".into());
        v1.defaults.insert("b".into(), "one".into());
        let mut user = v1.clone();
        user.defaults.insert("b".into(), "mine".into());
        user.defaults.insert("c".into(), "".into());

        let mut v2 = Library::default();
        v2.defaults.insert("a".into(), "two".into());
        v2.defaults.insert("b".into(), "two".into());
        v2.defaults.insert("c".into(), "two".into());

        let out = run(&user, Some(&v1), &v2);
        let get = |k: &str| out.library.defaults[k].resolve("en").to_string();
        assert_eq!(get("a"), "two");
        assert_eq!(get("b"), "mine");
        assert_eq!(get("c"), "two");
    }

    #[test]
    fn categories_union_with_user_winning() {
        let mut user = Library::default();
        user.categories.insert(
            "feel".into(),
            Category { label: "Mine".into(), color: "rose".into() },
        );
        let mut v2 = Library::default();
        v2.categories.insert(
            "feel".into(),
            Category { label: "Feel".into(), color: "blue".into() },
        );
        v2.categories.insert(
            "shape".into(),
            Category { label: "Shape".into(), color: "slate".into() },
        );

        let out = run(&user, None, &v2);
        assert_eq!(out.library.categories["feel"].color, "rose");
        assert!(out.library.categories.contains_key("shape"));
    }

    // -----------------------------------------------------------------------
    // Idempotence
    // -----------------------------------------------------------------------

    #[test]
    fn second_pass_is_quiet() {
        let (v1, mut user, mut v2) = collision_setup();
        v2.banks.insert("mood".into(), bank("Mood", &["calm", "neutral"]));
        user.banks.insert("mood".into(), bank("Mood", &["calm", "excited"]));
        user.templates.push(template("tpl_cat", "Cat", "my own cat"));

        let first = run(&user, Some(&v1), &v2);
        assert!(!first.notes.is_empty());

        let second = run(&first.library, Some(&v2), &v2);
        assert!(second.notes.is_empty());
        assert_eq!(second.library, first.library);

        let without_baseline = run(&first.library, None, &v2);
        assert!(without_baseline.notes.is_empty());
        assert_eq!(without_baseline.library, first.library);
    }
}
