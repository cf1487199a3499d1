//! Per-section fingerprints.
//!
//! Both sides are encoded through the same canonical forms before hashing, so
//! a freshly rendered panel always fingerprints identically to its record:
//!
//! - single-line fields collapse whitespace runs (`canonical_line`)
//! - block fields (the goal) trim trailing whitespace per line (`canonical_block`)
//! - comma-separated lists (tags, EVR refs) strip commas from items
//! - log timestamps are encoded at second precision

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use taskpanel_core::{
    Evr, EvrClass, EvrId, EvrStatus, Field, LogEntry, Plan, PlanStatus, SectionFingerprints,
    SectionKey, SectionPrint, Step, TaskRecord,
};

use crate::panel::{PanelData, PanelEvr, PanelNode};

/// Hex characters kept from the SHA-256 digest.
pub const FINGERPRINT_LEN: usize = 16;

const ITEM_SEP: &str = "\u{1f}";
const ENTRY_SEP: &str = "\u{1e}";

/// Stable hash of `text`. Change detection only; not a security boundary.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(FINGERPRINT_LEN);
    hex
}

// ---------------------------------------------------------------------------
// Canonical forms (shared with the renderer)
// ---------------------------------------------------------------------------

pub fn canonical_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn canonical_block(text: &str) -> String {
    text.replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// Canonical list items; blank items are dropped.
pub fn canonical_items(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| canonical_line(item))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Like [`canonical_items`] but safe to join with `", "`.
pub fn canonical_tokens<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items
        .iter()
        .map(|item| canonical_line(&item.as_ref().replace(',', " ")))
        .filter(|item| !item.is_empty())
        .collect()
}

pub fn canonical_opt(value: Option<&str>) -> String {
    canonical_line(value.unwrap_or_default())
}

pub fn format_log_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn encode_logs(logs: &[LogEntry]) -> String {
    logs.iter()
        .map(|entry| format!("{} {}", format_log_time(entry.at), canonical_line(&entry.message)))
        .collect::<Vec<_>>()
        .join(ENTRY_SEP)
}

fn encode_items(items: &[String]) -> String {
    canonical_items(items).join(ITEM_SEP)
}

fn encode_tokens<S: AsRef<str>>(items: &[S]) -> String {
    canonical_tokens(items).join(ITEM_SEP)
}

// ---------------------------------------------------------------------------
// Section prints
// ---------------------------------------------------------------------------

/// Borrowed view over the fields shared by record nodes and panel nodes.
pub struct NodeView<'a> {
    pub description: &'a str,
    pub status: PlanStatus,
    pub hints: &'a [String],
    pub tags: &'a [String],
    pub evidence: Option<&'a str>,
    pub notes: Option<&'a str>,
    /// `None` for plans, which carry no EVR references.
    pub evr_refs: Option<&'a [EvrId]>,
}

impl<'a> NodeView<'a> {
    pub fn plan(plan: &'a Plan) -> Self {
        NodeView {
            description: &plan.description,
            status: plan.status,
            hints: &plan.hints,
            tags: &plan.tags,
            evidence: plan.evidence.as_deref(),
            notes: plan.notes.as_deref(),
            evr_refs: None,
        }
    }

    pub fn step(step: &'a Step) -> Self {
        NodeView {
            description: &step.description,
            status: step.status,
            hints: &step.hints,
            tags: &step.tags,
            evidence: step.evidence.as_deref(),
            notes: step.notes.as_deref(),
            evr_refs: Some(&step.evr_refs),
        }
    }

    /// View over a parsed node; `is_step` decides whether EVR refs count.
    pub fn parsed(node: &'a PanelNode, is_step: bool) -> Self {
        NodeView {
            description: &node.description,
            status: node.status,
            hints: &node.hints,
            tags: &node.tags,
            evidence: node.evidence.as_deref(),
            notes: node.notes.as_deref(),
            evr_refs: is_step.then_some(node.evr_refs.as_slice()),
        }
    }
}

/// Build a print from canonical field encodings.
pub fn section_print(fields: BTreeMap<Field, String>) -> SectionPrint {
    let fields: BTreeMap<Field, String> = fields
        .into_iter()
        .map(|(field, encoded)| (field, fingerprint(&encoded)))
        .collect();
    let joined = fields
        .iter()
        .map(|(field, hash)| format!("{field}={hash}"))
        .collect::<Vec<_>>()
        .join("\n");
    SectionPrint {
        digest: fingerprint(&joined),
        fields,
    }
}

pub fn node_print(node: NodeView<'_>) -> SectionPrint {
    let mut fields = BTreeMap::new();
    fields.insert(Field::Description, canonical_line(node.description));
    fields.insert(Field::Status, node.status.as_str().to_string());
    fields.insert(Field::Hints, encode_items(node.hints));
    fields.insert(Field::Tags, encode_tokens(node.tags));
    fields.insert(Field::Evidence, canonical_opt(node.evidence));
    fields.insert(Field::Notes, canonical_opt(node.notes));
    if let Some(refs) = node.evr_refs {
        fields.insert(Field::EvrRefs, encode_tokens(refs));
    }
    section_print(fields)
}

/// Borrowed view over an expected result, from the record or a table row.
pub struct EvrView<'a> {
    pub title: &'a str,
    pub verify: &'a [String],
    pub expect: &'a [String],
    pub status: EvrStatus,
    pub class: EvrClass,
    pub last_run: Option<DateTime<Utc>>,
    pub proof: Option<&'a str>,
}

impl<'a> EvrView<'a> {
    pub fn evr(evr: &'a Evr) -> Self {
        EvrView {
            title: &evr.title,
            verify: &evr.verify,
            expect: &evr.expect,
            status: evr.status,
            class: evr.class,
            last_run: evr.last_run,
            proof: evr.proof.as_deref(),
        }
    }

    pub fn parsed(row: &'a PanelEvr) -> Self {
        EvrView {
            title: &row.title,
            verify: &row.verify,
            expect: &row.expect,
            status: row.status,
            class: row.class,
            last_run: row.last_run,
            proof: row.proof.as_deref(),
        }
    }
}

/// Fields the record API owns; the table shows them but edits are not applied.
pub const EVR_RUN_FIELDS: [Field; 4] = [Field::Status, Field::Class, Field::LastRun, Field::Proof];

pub fn evr_print(evr: EvrView<'_>) -> SectionPrint {
    let mut fields = BTreeMap::new();
    fields.insert(Field::Title, canonical_line(evr.title));
    fields.insert(Field::Verify, encode_items(evr.verify));
    fields.insert(Field::Expect, encode_items(evr.expect));
    fields.insert(Field::Status, evr.status.to_string());
    fields.insert(Field::Class, evr.class.to_string());
    fields.insert(
        Field::LastRun,
        evr.last_run.map(format_log_time).unwrap_or_default(),
    );
    fields.insert(Field::Proof, canonical_opt(evr.proof));
    section_print(fields)
}

fn single(field: Field, encoded: String) -> SectionPrint {
    section_print(BTreeMap::from([(field, encoded)]))
}

/// Fingerprints of every section of `record`.
pub fn record_prints(record: &TaskRecord) -> SectionFingerprints {
    let mut prints = SectionFingerprints::new();
    prints.insert(SectionKey::Title, single(Field::Title, canonical_line(&record.title)));
    prints.insert(SectionKey::Goal, single(Field::Goal, canonical_block(&record.goal)));
    prints.insert(SectionKey::References, single(Field::Items, encode_items(&record.references)));
    prints.insert(
        SectionKey::Requirements,
        single(Field::Items, encode_items(&record.requirements)),
    );
    prints.insert(SectionKey::Issues, single(Field::Items, encode_items(&record.issues)));
    prints.insert(SectionKey::Hints, single(Field::Items, encode_items(&record.hints)));

    for plan in &record.plans {
        prints.insert(SectionKey::Plan(plan.id.clone()), node_print(NodeView::plan(plan)));
        for step in &plan.steps {
            prints.insert(SectionKey::Step(step.id.clone()), node_print(NodeView::step(step)));
        }
    }

    for evr in &record.evrs {
        prints.insert(
            SectionKey::Evr(evr.id.clone()),
            evr_print(EvrView::evr(evr)),
        );
    }

    prints.insert(SectionKey::Logs, single(Field::Entries, encode_logs(&record.logs)));
    prints
}

/// Fingerprints of every section present in `panel`.
///
/// Sections the parser reported missing are absent from the result.
pub fn panel_prints(panel: &PanelData) -> SectionFingerprints {
    let mut prints = SectionFingerprints::new();
    if let Some(title) = &panel.title {
        prints.insert(SectionKey::Title, single(Field::Title, canonical_line(title)));
    }
    if let Some(goal) = &panel.goal {
        prints.insert(SectionKey::Goal, single(Field::Goal, canonical_block(goal)));
    }
    let lists = [
        (SectionKey::References, &panel.references),
        (SectionKey::Requirements, &panel.requirements),
        (SectionKey::Issues, &panel.issues),
        (SectionKey::Hints, &panel.hints),
    ];
    for (key, items) in lists {
        if let Some(items) = items {
            prints.insert(key, single(Field::Items, encode_items(items)));
        }
    }

    for plan in panel.plans.iter().flatten() {
        prints.insert(
            SectionKey::Plan(plan.node.id.clone()),
            node_print(NodeView::parsed(&plan.node, false)),
        );
        for step in &plan.steps {
            prints.insert(
                SectionKey::Step(step.id.clone()),
                node_print(NodeView::parsed(step, true)),
            );
        }
    }

    for evr in panel.evrs.iter().flatten() {
        prints.insert(
            SectionKey::Evr(evr.id.clone()),
            evr_print(EvrView::parsed(evr)),
        );
    }

    if let Some(logs) = &panel.logs {
        prints.insert(SectionKey::Logs, single(Field::Entries, encode_logs(logs)));
    }
    prints
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpanel_core::{NodeId, RecordId};

    fn record() -> TaskRecord {
        let mut r = TaskRecord::new(RecordId::from("fp"), "Fingerprints");
        let p1 = r.add_plan("first plan");
        r.add_plan("second plan");
        r.add_step(&p1, "a step").unwrap();
        r
    }

    #[test]
    fn fingerprint_is_deterministic_and_short() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
        assert_eq!(fingerprint("abc").len(), FINGERPRINT_LEN);
    }

    #[test]
    fn whitespace_noise_does_not_change_prints() {
        let mut a = record();
        let prints_a = record_prints(&a);
        a.title = "  Fingerprints \n".to_string();
        assert_eq!(record_prints(&a)[&SectionKey::Title], prints_a[&SectionKey::Title]);
    }

    #[test]
    fn editing_one_plan_leaves_other_sections_alone() {
        let mut r = record();
        let before = record_prints(&r);
        r.plan_mut(&NodeId::from("P1")).unwrap().description = "edited".into();
        let after = record_prints(&r);

        for (key, print) in &before {
            if key == &SectionKey::Plan(NodeId::from("P1")) {
                assert_ne!(print.digest, after[key].digest);
            } else {
                assert_eq!(print, &after[key], "{key} must be unaffected");
            }
        }
    }

    #[test]
    fn status_has_its_own_field_hash() {
        let mut r = record();
        let key = SectionKey::Plan(NodeId::from("P1"));
        let before = record_prints(&r)[&key].clone();
        r.plan_mut(&NodeId::from("P1")).unwrap().status = PlanStatus::Blocked;
        let after = record_prints(&r)[&key].clone();
        assert_ne!(before.fields[&Field::Status], after.fields[&Field::Status]);
        assert_eq!(before.fields[&Field::Description], after.fields[&Field::Description]);
    }

    #[test]
    fn tokens_drop_commas() {
        let tags = vec!["a,b".to_string(), " c ".to_string(), String::new()];
        assert_eq!(canonical_tokens(&tags), vec!["a b", "c"]);
    }

    #[test]
    fn canonical_block_keeps_interior_lines() {
        assert_eq!(canonical_block("\n line one  \n\nline two\n\n"), " line one\n\nline two");
    }
}
