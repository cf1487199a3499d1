//! Write accepted document values back into the record.
//!
//! Values arrive in canonical form. Optional text fields map `""` to `None`.
//! Status is never written here.

use taskpanel_core::{EvrId, Field, NodeId, SectionKey, TaskRecord};

use crate::change::FieldValue;

/// Set `field` of `section` to `value`. Returns `false` when the target
/// node is gone or the value does not fit the field.
pub fn apply_value(record: &mut TaskRecord, section: &SectionKey, field: Field, value: &FieldValue) -> bool {
    match (section, value) {
        (SectionKey::Title, FieldValue::Text(text)) => record.title = text.clone(),
        (SectionKey::Goal, FieldValue::Text(text)) => record.goal = text.clone(),
        (SectionKey::References, FieldValue::List(items)) => record.references = items.clone(),
        (SectionKey::Requirements, FieldValue::List(items)) => record.requirements = items.clone(),
        (SectionKey::Issues, FieldValue::List(items)) => record.issues = items.clone(),
        (SectionKey::Hints, FieldValue::List(items)) => record.hints = items.clone(),
        (SectionKey::Logs, FieldValue::Logs(entries)) => record.logs = entries.clone(),
        (SectionKey::Plan(id), _) => {
            let Some(plan) = record.plan_mut(id) else {
                return false;
            };
            return apply_node(
                NodeFields {
                    description: &mut plan.description,
                    hints: &mut plan.hints,
                    tags: &mut plan.tags,
                    evidence: &mut plan.evidence,
                    notes: &mut plan.notes,
                    evr_refs: None,
                },
                field,
                value,
            );
        }
        (SectionKey::Step(id), _) => return apply_step(record, id, field, value),
        (SectionKey::Evr(id), _) => return apply_evr(record, id, field, value),
        _ => return false,
    }
    true
}

struct NodeFields<'a> {
    description: &'a mut String,
    hints: &'a mut Vec<String>,
    tags: &'a mut Vec<String>,
    evidence: &'a mut Option<String>,
    notes: &'a mut Option<String>,
    evr_refs: Option<&'a mut Vec<EvrId>>,
}

fn apply_node(node: NodeFields<'_>, field: Field, value: &FieldValue) -> bool {
    match (field, value) {
        (Field::Description, FieldValue::Text(text)) => *node.description = text.clone(),
        (Field::Hints, FieldValue::List(items)) => *node.hints = items.clone(),
        (Field::Tags, FieldValue::List(items)) => *node.tags = items.clone(),
        (Field::Evidence, FieldValue::Text(text)) => *node.evidence = optional(text),
        (Field::Notes, FieldValue::Text(text)) => *node.notes = optional(text),
        (Field::EvrRefs, FieldValue::List(items)) => match node.evr_refs {
            Some(refs) => *refs = items.iter().map(|s| EvrId::from(s.as_str())).collect(),
            None => return false,
        },
        _ => return false,
    }
    true
}

fn apply_step(record: &mut TaskRecord, id: &NodeId, field: Field, value: &FieldValue) -> bool {
    let Some(step) = record.step_mut(id) else {
        return false;
    };
    let applied = apply_node(
        NodeFields {
            description: &mut step.description,
            hints: &mut step.hints,
            tags: &mut step.tags,
            evidence: &mut step.evidence,
            notes: &mut step.notes,
            evr_refs: Some(&mut step.evr_refs),
        },
        field,
        value,
    );
    if applied && field == Field::EvrRefs {
        record.relink_evrs();
    }
    applied
}

fn apply_evr(record: &mut TaskRecord, id: &EvrId, field: Field, value: &FieldValue) -> bool {
    let Some(evr) = record.evr_mut(id) else {
        return false;
    };
    match (field, value) {
        (Field::Title, FieldValue::Text(text)) => evr.title = text.clone(),
        (Field::Verify, FieldValue::List(items)) => evr.verify = items.clone(),
        (Field::Expect, FieldValue::List(items)) => evr.expect = items.clone(),
        _ => return false,
    }
    true
}

fn optional(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpanel_core::{EvrClass, RecordId};

    fn record() -> TaskRecord {
        let mut r = TaskRecord::new(RecordId::from("apply"), "Apply");
        let p1 = r.add_plan("plan");
        r.add_step(&p1, "step").unwrap();
        r.add_evr("works", EvrClass::Runtime);
        r
    }

    #[test]
    fn text_fields_are_replaced() {
        let mut r = record();
        assert!(apply_value(&mut r, &SectionKey::Title, Field::Title, &FieldValue::Text("New".into())));
        assert_eq!(r.title, "New");
    }

    #[test]
    fn empty_optional_text_clears_the_field() {
        let mut r = record();
        let step = NodeId::from("P1.S1");
        r.step_mut(&step).unwrap().notes = Some("old".into());
        let section = SectionKey::Step(step.clone());
        assert!(apply_value(&mut r, &section, Field::Notes, &FieldValue::Text(String::new())));
        assert_eq!(r.step(&step).unwrap().notes, None);
    }

    #[test]
    fn step_evr_refs_relink_the_evr() {
        let mut r = record();
        let section = SectionKey::Step(NodeId::from("P1.S1"));
        assert!(apply_value(&mut r, &section, Field::EvrRefs, &FieldValue::List(vec!["E1".into()])));
        assert_eq!(r.evrs[0].referenced_by, vec![NodeId::from("P1.S1")]);
    }

    #[test]
    fn plans_have_no_evr_refs() {
        let mut r = record();
        let section = SectionKey::Plan(NodeId::from("P1"));
        assert!(!apply_value(&mut r, &section, Field::EvrRefs, &FieldValue::List(vec!["E1".into()])));
    }

    #[test]
    fn vanished_node_is_reported() {
        let mut r = record();
        let section = SectionKey::Plan(NodeId::from("P7"));
        assert!(!apply_value(&mut r, &section, Field::Description, &FieldValue::Text("x".into())));
    }
}
