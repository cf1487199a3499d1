//! Change detection: compare a parsed document against its record.
//!
//! For every section present in the document:
//!
//! 1. The baseline is the record's snapshot print, or the record's current
//!    print when the section was never rendered.
//! 2. Document digest equal to the baseline → the document did not touch it.
//! 3. Otherwise each field is compared. A field only the document changed is
//!    a content change; a field both sides changed to different values is a
//!    conflict candidate; a field both changed to the same value is dropped.
//! 4. Status never conflicts. A touched marker that differs from the record
//!    is reported as a pending status change, after the node's content.
//! 5. EVR run cells (status, class, last run, proof) belong to the record
//!    API. Editing one yields a `ReadOnlyCell` warning and nothing else.

use taskpanel_core::{EvrId, Field, LogEntry, NodeId, SectionKey, TaskRecord};
use taskpanel_renderer::fingerprint::{
    canonical_block, canonical_items, canonical_line, canonical_opt, canonical_tokens,
    format_log_time, EvrView, NodeView, EVR_RUN_FIELDS,
};
use taskpanel_renderer::{panel_prints, record_prints, PanelData, ParseWarning, WarningKind};

use crate::change::{Change, ContentChange, Detection, FieldConflict, FieldValue, StatusChange};

pub fn detect(panel: &PanelData, record: &TaskRecord) -> Detection {
    let mut warnings = panel.warnings.clone();
    let mut changes = Vec::new();
    let current = record_prints(record);
    let document = panel_prints(panel);

    for (key, doc_print) in &document {
        let Some(now) = current.get(key) else {
            warnings.push(unresolved(panel, key));
            continue;
        };
        let base = record.fingerprints.get(key).unwrap_or(now);
        if doc_print.digest == base.digest {
            continue;
        }

        let mut status = None;
        for (field, doc_hash) in &doc_print.fields {
            let now_hash = now.fields.get(field);
            let base_hash = base.fields.get(field).or(now_hash);
            if base_hash == Some(doc_hash) {
                continue;
            }
            if let SectionKey::Evr(id) = key {
                if EVR_RUN_FIELDS.contains(field) {
                    if now_hash != Some(doc_hash) {
                        warnings.extend(run_cell_edited(panel, record, id, *field));
                    }
                    continue;
                }
            }
            if *field == Field::Status {
                status = status_change(panel, record, key);
                continue;
            }
            if now_hash == Some(doc_hash) {
                continue;
            }
            let (Some(ours), Some(theirs)) = (
                record_value(record, key, *field),
                panel_value(panel, key, *field),
            ) else {
                continue;
            };
            if now_hash == base_hash {
                changes.push(Change::Content(ContentChange {
                    section: key.clone(),
                    field: *field,
                    old_value: ours,
                    new_value: theirs,
                }));
            } else {
                changes.push(Change::Conflict(FieldConflict {
                    section: key.clone(),
                    field: *field,
                    ours,
                    theirs,
                }));
            }
        }
        if let Some(status) = status {
            changes.push(Change::Status(status));
        }
    }

    if panel.plans.is_some() {
        for key in current.keys() {
            if matches!(key, SectionKey::Plan(_) | SectionKey::Step(_)) && !document.contains_key(key) {
                warnings.push(ParseWarning::general(
                    WarningKind::MissingAnchor,
                    format!("{key} is missing from the document; record left unchanged"),
                ));
            }
        }
    }
    if panel.evrs.is_some() {
        for key in current.keys() {
            if matches!(key, SectionKey::Evr(_)) && !document.contains_key(key) {
                warnings.push(ParseWarning::general(
                    WarningKind::MissingAnchor,
                    format!("{key} is missing from the document; record left unchanged"),
                ));
            }
        }
    }

    Detection { changes, warnings }
}

fn status_change(panel: &PanelData, record: &TaskRecord, key: &SectionKey) -> Option<StatusChange> {
    let id = node_id(key)?;
    let new_status = panel.node(id)?.status;
    let old_status = record.node_status(id)?;
    (new_status != old_status).then(|| StatusChange {
        node: id.clone(),
        old_status,
        new_status,
    })
}

/// Edits to an EVR's status, class, last run or proof cell are reported,
/// never applied; the next render restores the record's value.
fn run_cell_edited(panel: &PanelData, record: &TaskRecord, id: &EvrId, field: Field) -> Option<ParseWarning> {
    let row = panel.evr(id)?;
    let theirs = run_cell(&EvrView::parsed(row), field);
    let ours = run_cell(&EvrView::evr(record.evr(id)?), field);
    Some(ParseWarning::at(
        WarningKind::ReadOnlyCell,
        row.line,
        format!(
            "{id} {field} edited to '{theirs}'; record keeps '{ours}' (set it through the record API)"
        ),
    ))
}

fn run_cell(evr: &EvrView<'_>, field: Field) -> String {
    match field {
        Field::Status => evr.status.to_string(),
        Field::Class => evr.class.to_string(),
        Field::LastRun => evr.last_run.map(format_log_time).unwrap_or_default(),
        _ => canonical_opt(evr.proof),
    }
}

fn node_id(key: &SectionKey) -> Option<&NodeId> {
    match key {
        SectionKey::Plan(id) | SectionKey::Step(id) => Some(id),
        _ => None,
    }
}

fn unresolved(panel: &PanelData, key: &SectionKey) -> ParseWarning {
    let line = match key {
        SectionKey::Plan(id) | SectionKey::Step(id) => panel.node(id).map(|n| n.line),
        SectionKey::Evr(id) => panel.evr(id).map(|e| e.line),
        _ => None,
    };
    let message = format!("{key} does not exist in the record; ignored");
    match line {
        Some(line) => ParseWarning::at(WarningKind::UnresolvedAnchor, line, message),
        None => ParseWarning::general(WarningKind::UnresolvedAnchor, message),
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// Canonical record value of `field` in `section`.
pub fn record_value(record: &TaskRecord, section: &SectionKey, field: Field) -> Option<FieldValue> {
    match section {
        SectionKey::Title => Some(FieldValue::Text(canonical_line(&record.title))),
        SectionKey::Goal => Some(FieldValue::Text(canonical_block(&record.goal))),
        SectionKey::References => Some(FieldValue::List(canonical_items(&record.references))),
        SectionKey::Requirements => Some(FieldValue::List(canonical_items(&record.requirements))),
        SectionKey::Issues => Some(FieldValue::List(canonical_items(&record.issues))),
        SectionKey::Hints => Some(FieldValue::List(canonical_items(&record.hints))),
        SectionKey::Plan(id) => node_value(&NodeView::plan(record.plan(id)?), field),
        SectionKey::Step(id) => node_value(&NodeView::step(record.step(id)?), field),
        SectionKey::Evr(id) => {
            let evr = record.evr(id)?;
            evr_value(&evr.title, &evr.verify, &evr.expect, field)
        }
        SectionKey::Logs => Some(FieldValue::Logs(canonical_logs(&record.logs))),
    }
}

/// Canonical document value of `field` in `section`.
pub fn panel_value(panel: &PanelData, section: &SectionKey, field: Field) -> Option<FieldValue> {
    match section {
        SectionKey::Title => panel.title.as_deref().map(|t| FieldValue::Text(canonical_line(t))),
        SectionKey::Goal => panel.goal.as_deref().map(|g| FieldValue::Text(canonical_block(g))),
        SectionKey::References => list_value(panel.references.as_deref()),
        SectionKey::Requirements => list_value(panel.requirements.as_deref()),
        SectionKey::Issues => list_value(panel.issues.as_deref()),
        SectionKey::Hints => list_value(panel.hints.as_deref()),
        SectionKey::Plan(id) => node_value(&NodeView::parsed(panel.node(id)?, false), field),
        SectionKey::Step(id) => node_value(&NodeView::parsed(panel.node(id)?, true), field),
        SectionKey::Evr(id) => {
            let evr = panel.evr(id)?;
            evr_value(&evr.title, &evr.verify, &evr.expect, field)
        }
        SectionKey::Logs => panel.logs.as_deref().map(|l| FieldValue::Logs(canonical_logs(l))),
    }
}

fn list_value(items: Option<&[String]>) -> Option<FieldValue> {
    items.map(|items| FieldValue::List(canonical_items(items)))
}

fn node_value(node: &NodeView<'_>, field: Field) -> Option<FieldValue> {
    match field {
        Field::Description => Some(FieldValue::Text(canonical_line(node.description))),
        Field::Hints => Some(FieldValue::List(canonical_items(node.hints))),
        Field::Tags => Some(FieldValue::List(canonical_tokens(node.tags))),
        Field::Evidence => Some(FieldValue::Text(canonical_opt(node.evidence))),
        Field::Notes => Some(FieldValue::Text(canonical_opt(node.notes))),
        Field::EvrRefs => node
            .evr_refs
            .map(|refs: &[EvrId]| FieldValue::List(canonical_tokens(refs))),
        _ => None,
    }
}

fn evr_value(title: &str, verify: &[String], expect: &[String], field: Field) -> Option<FieldValue> {
    match field {
        Field::Title => Some(FieldValue::Text(canonical_line(title))),
        Field::Verify => Some(FieldValue::List(canonical_items(verify))),
        Field::Expect => Some(FieldValue::List(canonical_items(expect))),
        _ => None,
    }
}

fn canonical_logs(logs: &[LogEntry]) -> Vec<LogEntry> {
    logs.iter()
        .map(|entry| LogEntry {
            at: taskpanel_core::types::truncate_to_seconds(entry.at),
            message: canonical_line(&entry.message),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpanel_core::{EvrClass, EvrStatus, PlanStatus, RecordId};
    use taskpanel_renderer::{parse, PanelRenderer};

    fn rendered() -> (TaskRecord, String) {
        let mut record = TaskRecord::new(RecordId::from("detect"), "Original");
        let p1 = record.add_plan("write parser");
        record.add_step(&p1, "tokenize").unwrap();
        record.fingerprints = record_prints(&record);
        let text = PanelRenderer::new().unwrap().render(&record).unwrap();
        (record, text)
    }

    #[test]
    fn unedited_document_has_no_changes() {
        let (record, text) = rendered();
        let detection = detect(&parse(&text), &record);
        assert!(detection.changes.is_empty());
        assert!(detection.warnings.is_empty(), "{:?}", detection.warnings);
    }

    #[test]
    fn title_edit_is_a_content_change() {
        let (record, text) = rendered();
        let detection = detect(&parse(&text.replace("# Original", "# Edited")), &record);
        assert_eq!(
            detection.changes,
            vec![Change::Content(ContentChange {
                section: SectionKey::Title,
                field: Field::Title,
                old_value: FieldValue::Text("Original".into()),
                new_value: FieldValue::Text("Edited".into()),
            })]
        );
    }

    #[test]
    fn marker_edit_is_a_status_change() {
        let (record, text) = rendered();
        let detection = detect(&parse(&text.replace("- [ ] write parser", "- [x] write parser")), &record);
        assert_eq!(
            detection.changes,
            vec![Change::Status(StatusChange {
                node: NodeId::from("P1"),
                old_status: PlanStatus::ToDo,
                new_status: PlanStatus::Completed,
            })]
        );
    }

    #[test]
    fn content_is_reported_before_status_on_one_line() {
        let (record, text) = rendered();
        let edited = text.replace("- [ ] tokenize", "- [-] tokenize input");
        let detection = detect(&parse(&edited), &record);
        assert_eq!(detection.changes.len(), 2);
        assert!(matches!(detection.changes[0], Change::Content(_)));
        assert!(matches!(detection.changes[1], Change::Status(_)));
    }

    #[test]
    fn both_sides_changing_a_field_is_a_conflict() {
        let (mut record, text) = rendered();
        record.title = "Record side".into();
        let detection = detect(&parse(&text.replace("# Original", "# Document side")), &record);
        let conflicts: Vec<_> = detection.conflicts().collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].ours, FieldValue::Text("Record side".into()));
        assert_eq!(conflicts[0].theirs, FieldValue::Text("Document side".into()));
    }

    #[test]
    fn converging_edits_are_dropped() {
        let (mut record, text) = rendered();
        record.title = "Same".into();
        let detection = detect(&parse(&text.replace("# Original", "# Same")), &record);
        assert!(detection.changes.is_empty());
    }

    #[test]
    fn record_side_status_change_is_not_pending() {
        let (mut record, text) = rendered();
        record.set_status(&NodeId::from("P1"), PlanStatus::Blocked).unwrap();
        let detection = detect(&parse(&text), &record);
        assert!(detection.changes.is_empty());
    }

    #[test]
    fn unknown_anchor_is_only_a_warning() {
        let (record, text) = rendered();
        let edited = text.replace(
            "\n## Expected Results",
            "- [ ] invented <!-- id:P9 -->\n\n## Expected Results",
        );
        let detection = detect(&parse(&edited), &record);
        assert!(detection.changes.is_empty());
        assert!(detection
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::UnresolvedAnchor && w.message.contains("P9")));
    }

    #[test]
    fn evr_run_cell_edit_is_a_warning_not_a_change() {
        let mut record = TaskRecord::new(RecordId::from("detect"), "Original");
        record.add_evr("parser accepts fixtures", EvrClass::Runtime);
        record.fingerprints = record_prints(&record);
        let text = PanelRenderer::new().unwrap().render(&record).unwrap();
        let edited = text.replace("| unknown | runtime |", "| passing | runtime |");
        assert_ne!(edited, text);

        let detection = detect(&parse(&edited), &record);
        assert!(detection.changes.is_empty());
        let warning = detection
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::ReadOnlyCell)
            .expect("read-only warning");
        assert!(warning.message.contains("E1 status edited to 'passing'"), "{warning}");
        assert!(warning.line.is_some());
    }

    #[test]
    fn record_side_evr_run_is_not_reported() {
        let mut record = TaskRecord::new(RecordId::from("detect"), "Original");
        let e1 = record.add_evr("parser accepts fixtures", EvrClass::Static);
        record.fingerprints = record_prints(&record);
        let text = PanelRenderer::new().unwrap().render(&record).unwrap();
        record
            .set_evr_status(&e1, EvrStatus::Failing, Some("ci log".into()))
            .unwrap();

        let detection = detect(&parse(&text), &record);
        assert!(detection.changes.is_empty());
        assert!(detection.warnings.is_empty(), "{:?}", detection.warnings);
    }

    #[test]
    fn never_rendered_record_uses_current_state_as_baseline() {
        let (mut record, text) = rendered();
        record.fingerprints.clear();
        let detection = detect(&parse(&text.replace("# Original", "# Edited")), &record);
        assert_eq!(detection.changes.len(), 1);
        assert!(matches!(detection.changes[0], Change::Content(_)));
    }
}
