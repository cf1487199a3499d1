//! Template context: serializable rendering payload built from a [`TaskRecord`].
//!
//! All text is canonicalized here, before it reaches the template, so the
//! template only concatenates. Table cells are escaped and pre-joined.

use std::collections::BTreeMap;

use serde::Serialize;

use taskpanel_core::{NodeId, PlanStatus, TaskRecord};

use crate::error::RenderError;
use crate::fingerprint::{
    canonical_block, canonical_items, canonical_line, canonical_opt, canonical_tokens,
    format_log_time,
};
use crate::marker::marker_for;

/// Marker overrides keyed by plan/step id.
///
/// Used to keep a document marker the record has not (yet) accepted.
pub type PendingMarkers = BTreeMap<NodeId, PlanStatus>;

/// Flat rendering payload for `panel.md.tera`.
#[derive(Debug, Clone, Serialize)]
pub struct PanelContext {
    pub meta: MetaCtx,
    pub title: String,
    pub goal: String,
    pub references: Vec<String>,
    pub requirements: Vec<String>,
    pub issues: Vec<String>,
    pub hints: Vec<String>,
    pub plans: Vec<PlanCtx>,
    pub evrs: Vec<EvrCtx>,
    pub logs: Vec<LogCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaCtx {
    pub record_id: String,
    pub version: Option<String>,
    pub updated_at: String,
}

/// A plan or step line.
#[derive(Debug, Clone, Serialize)]
pub struct NodeCtx {
    pub id: String,
    pub marker: String,
    pub description: String,
    pub hints: Vec<String>,
    /// `", "`-joined; empty when there are none.
    pub tags: String,
    pub evidence: String,
    pub notes: String,
    pub evr_refs: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanCtx {
    #[serde(flatten)]
    pub node: NodeCtx,
    pub steps: Vec<NodeCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvrCtx {
    pub id: String,
    pub title: String,
    pub verify: String,
    pub expect: String,
    pub status: String,
    pub class: String,
    pub last_run: String,
    pub proof: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogCtx {
    pub at: String,
    pub message: String,
}

/// Escape a table cell: `|` becomes `\|`.
pub fn escape_cell(text: &str) -> String {
    canonical_line(text).replace('|', "\\|")
}

/// Escape goal lines the parser would read as structure: a leading `#`
/// or `\` gets a `\` prefix, which the parser strips again.
pub fn escape_block(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.starts_with('#') || line.starts_with('\\') {
                format!("\\{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join list items into one cell with `<br>`.
pub fn join_cell(items: &[String]) -> String {
    canonical_items(items)
        .iter()
        .map(|item| escape_cell(item))
        .collect::<Vec<_>>()
        .join("<br>")
}

impl PanelContext {
    /// Build the context for `record`, substituting markers from `pending`.
    pub fn from_record(record: &TaskRecord, pending: &PendingMarkers) -> Self {
        let marker = |id: &NodeId, status: PlanStatus| {
            let status = pending.get(id).copied().unwrap_or(status);
            marker_for(status).to_string()
        };

        let plans = record
            .plans
            .iter()
            .map(|plan| PlanCtx {
                node: NodeCtx {
                    id: plan.id.to_string(),
                    marker: marker(&plan.id, plan.status),
                    description: canonical_line(&plan.description),
                    hints: canonical_items(&plan.hints),
                    tags: canonical_tokens(&plan.tags).join(", "),
                    evidence: canonical_opt(plan.evidence.as_deref()),
                    notes: canonical_opt(plan.notes.as_deref()),
                    evr_refs: String::new(),
                },
                steps: plan
                    .steps
                    .iter()
                    .map(|step| NodeCtx {
                        id: step.id.to_string(),
                        marker: marker(&step.id, step.status),
                        description: canonical_line(&step.description),
                        hints: canonical_items(&step.hints),
                        tags: canonical_tokens(&step.tags).join(", "),
                        evidence: canonical_opt(step.evidence.as_deref()),
                        notes: canonical_opt(step.notes.as_deref()),
                        evr_refs: canonical_tokens(&step.evr_refs).join(", "),
                    })
                    .collect(),
            })
            .collect();

        let evrs = record
            .evrs
            .iter()
            .map(|evr| EvrCtx {
                id: escape_cell(evr.id.as_str()),
                title: escape_cell(&evr.title),
                verify: join_cell(&evr.verify),
                expect: join_cell(&evr.expect),
                status: evr.status.to_string(),
                class: evr.class.to_string(),
                last_run: evr.last_run.map(format_log_time).unwrap_or_default(),
                proof: escape_cell(evr.proof.as_deref().unwrap_or_default()),
            })
            .collect();

        let logs = record
            .logs
            .iter()
            .map(|entry| LogCtx {
                at: format_log_time(entry.at),
                message: canonical_line(&entry.message),
            })
            .collect();

        PanelContext {
            meta: MetaCtx {
                record_id: record.id.to_string(),
                version: record.version.as_ref().map(|v| v.to_string()),
                updated_at: format_log_time(record.updated_at),
            },
            title: canonical_line(&record.title),
            goal: escape_block(&canonical_block(&record.goal)),
            references: canonical_items(&record.references),
            requirements: canonical_items(&record.requirements),
            issues: canonical_items(&record.issues),
            hints: canonical_items(&record.hints),
            plans,
            evrs,
            logs,
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        let value = serde_json::to_value(self)?;
        Ok(tera::Context::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpanel_core::{EvrClass, RecordId};

    fn record() -> TaskRecord {
        let mut r = TaskRecord::new(RecordId::from("ctx"), "Context  test");
        let p1 = r.add_plan("plan one");
        let s1 = r.add_step(&p1, "step one").unwrap();
        let e1 = r.add_evr("a | b", EvrClass::Runtime);
        r.evr_mut(&e1).unwrap().verify = vec!["cargo test".into(), "cargo clippy".into()];
        r.link_evr(&s1, &e1).unwrap();
        r
    }

    #[test]
    fn context_fields_populated() {
        let ctx = PanelContext::from_record(&record(), &PendingMarkers::new());
        assert_eq!(ctx.title, "Context test");
        assert_eq!(ctx.meta.record_id, "ctx");
        assert!(ctx.meta.version.is_some());
        assert_eq!(ctx.plans.len(), 1);
        assert_eq!(ctx.plans[0].steps[0].evr_refs, "E1");
        assert_eq!(ctx.evrs[0].title, "a \\| b");
        assert_eq!(ctx.evrs[0].verify, "cargo test<br>cargo clippy");
    }

    #[test]
    fn heading_like_goal_lines_are_escaped() {
        let mut r = record();
        r.goal = "Intro\n## Notes\n\\path\nplain # text".into();
        let ctx = PanelContext::from_record(&r, &PendingMarkers::new());
        assert_eq!(ctx.goal, "Intro\n\\## Notes\n\\\\path\nplain # text");
    }

    #[test]
    fn pending_marker_overrides_record_status() {
        let pending = PendingMarkers::from([(NodeId::from("P1.S1"), PlanStatus::Completed)]);
        let ctx = PanelContext::from_record(&record(), &pending);
        assert_eq!(ctx.plans[0].node.marker, " ");
        assert_eq!(ctx.plans[0].steps[0].marker, "x");
    }

    #[test]
    fn to_tera_context_succeeds() {
        let ctx = PanelContext::from_record(&record(), &PendingMarkers::new());
        ctx.to_tera_context().expect("context conversion");
    }
}
