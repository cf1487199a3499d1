//! Structured-record API.
//!
//! These methods are the only path that changes plan/step status. Every
//! mutation ends in [`TaskRecord::touch`], which replaces the version tag.

use std::collections::HashSet;

use chrono::Utc;

use crate::error::RecordError;
use crate::types::{
    truncate_to_seconds, Evr, EvrClass, EvrId, EvrStatus, LogEntry, NodeId, Plan, PlanStatus,
    RecordId, SectionFingerprints, Step, TaskRecord, VersionTag,
};

impl TaskRecord {
    /// A fresh record with a version tag and no plans.
    pub fn new(id: RecordId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        TaskRecord {
            id,
            title: title.into(),
            goal: String::new(),
            references: vec![],
            requirements: vec![],
            issues: vec![],
            hints: vec![],
            plans: vec![],
            evrs: vec![],
            logs: vec![],
            version: Some(VersionTag::generate()),
            created_at: now,
            updated_at: now,
            fingerprints: SectionFingerprints::new(),
            rendered_version: None,
            panel_digest: None,
            panel_path: None,
        }
    }

    /// Record a structured mutation: new version tag, `updated_at` = now.
    pub fn touch(&mut self) {
        self.version = Some(VersionTag::generate());
        self.updated_at = Utc::now();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn set_goal(&mut self, goal: impl Into<String>) {
        self.goal = goal.into();
        self.touch();
    }

    /// Append a log entry stamped now.
    pub fn append_log(&mut self, message: impl Into<String>) {
        self.logs.push(LogEntry::now(message));
        self.touch();
    }

    // -----------------------------------------------------------------------
    // Plans and steps
    // -----------------------------------------------------------------------

    /// Add a plan in `to_do` state and return its id.
    pub fn add_plan(&mut self, description: impl Into<String>) -> NodeId {
        let next = self
            .plans
            .iter()
            .filter_map(|p| p.id.0.strip_prefix('P')?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = NodeId::from(format!("P{next}"));
        self.plans.push(Plan {
            id: id.clone(),
            description: description.into(),
            status: PlanStatus::ToDo,
            steps: vec![],
            hints: vec![],
            tags: vec![],
            evidence: None,
            notes: None,
            created_at: Utc::now(),
            completed_at: None,
        });
        self.touch();
        id
    }

    /// Add a step under `plan` and return its id.
    pub fn add_step(
        &mut self,
        plan: &NodeId,
        description: impl Into<String>,
    ) -> Result<NodeId, RecordError> {
        let target = self.plan_mut(plan).ok_or_else(|| unknown(plan.as_str()))?;
        let prefix = format!("{}.S", target.id);
        let next = target
            .steps
            .iter()
            .filter_map(|s| s.id.0.strip_prefix(&prefix)?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = NodeId::from(format!("{prefix}{next}"));
        target.steps.push(Step {
            id: id.clone(),
            description: description.into(),
            status: PlanStatus::ToDo,
            hints: vec![],
            tags: vec![],
            evidence: None,
            notes: None,
            evr_refs: vec![],
            created_at: Utc::now(),
            completed_at: None,
        });
        self.touch();
        Ok(id)
    }

    pub fn plan(&self, id: &NodeId) -> Option<&Plan> {
        self.plans.iter().find(|p| &p.id == id)
    }

    pub fn plan_mut(&mut self, id: &NodeId) -> Option<&mut Plan> {
        self.plans.iter_mut().find(|p| &p.id == id)
    }

    pub fn step(&self, id: &NodeId) -> Option<&Step> {
        self.plans
            .iter()
            .flat_map(|p| p.steps.iter())
            .find(|s| &s.id == id)
    }

    pub fn step_mut(&mut self, id: &NodeId) -> Option<&mut Step> {
        self.plans
            .iter_mut()
            .flat_map(|p| p.steps.iter_mut())
            .find(|s| &s.id == id)
    }

    /// Current status of a plan or step.
    pub fn node_status(&self, id: &NodeId) -> Option<PlanStatus> {
        self.plan(id)
            .map(|p| p.status)
            .or_else(|| self.step(id).map(|s| s.status))
    }

    /// Explicit status update for a plan or step. Returns the previous status.
    pub fn set_status(
        &mut self,
        id: &NodeId,
        status: PlanStatus,
    ) -> Result<PlanStatus, RecordError> {
        let completed_at = (status == PlanStatus::Completed).then(Utc::now);
        let previous = if let Some(plan) = self.plan_mut(id) {
            let previous = plan.status;
            plan.status = status;
            plan.completed_at = completed_at;
            previous
        } else if let Some(step) = self.step_mut(id) {
            let previous = step.status;
            step.status = status;
            step.completed_at = completed_at;
            previous
        } else {
            return Err(unknown(id.as_str()));
        };
        self.touch();
        Ok(previous)
    }

    /// Like [`set_status`](Self::set_status) but rejects step ids.
    pub fn set_plan_status(
        &mut self,
        id: &NodeId,
        status: PlanStatus,
    ) -> Result<PlanStatus, RecordError> {
        if self.plan(id).is_none() {
            return Err(unknown(id.as_str()));
        }
        self.set_status(id, status)
    }

    /// Like [`set_status`](Self::set_status) but rejects plan ids.
    pub fn set_step_status(
        &mut self,
        id: &NodeId,
        status: PlanStatus,
    ) -> Result<PlanStatus, RecordError> {
        if self.step(id).is_none() {
            return Err(unknown(id.as_str()));
        }
        self.set_status(id, status)
    }

    /// Plan or step by id.
    pub fn find_node(&self, id: &NodeId) -> Option<NodeRef<'_>> {
        self.plan(id)
            .map(NodeRef::Plan)
            .or_else(|| self.step(id).map(NodeRef::Step))
    }

    // -----------------------------------------------------------------------
    // Expected results
    // -----------------------------------------------------------------------

    /// Add an expected result and return its id.
    pub fn add_evr(&mut self, title: impl Into<String>, class: EvrClass) -> EvrId {
        let next = self
            .evrs
            .iter()
            .filter_map(|e| e.id.0.strip_prefix('E')?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = EvrId::from(format!("E{next}"));
        self.evrs.push(Evr {
            id: id.clone(),
            title: title.into(),
            verify: vec![],
            expect: vec![],
            status: EvrStatus::Unknown,
            class,
            last_run: None,
            proof: None,
            referenced_by: vec![],
        });
        self.touch();
        id
    }

    pub fn evr(&self, id: &EvrId) -> Option<&Evr> {
        self.evrs.iter().find(|e| &e.id == id)
    }

    pub fn evr_mut(&mut self, id: &EvrId) -> Option<&mut Evr> {
        self.evrs.iter_mut().find(|e| &e.id == id)
    }

    /// Make `step` exercise `evr`.
    pub fn link_evr(&mut self, step: &NodeId, evr: &EvrId) -> Result<(), RecordError> {
        if self.evr(evr).is_none() {
            return Err(unknown(evr.as_str()));
        }
        let target = self.step_mut(step).ok_or_else(|| unknown(step.as_str()))?;
        if !target.evr_refs.contains(evr) {
            target.evr_refs.push(evr.clone());
        }
        self.relink_evrs();
        self.touch();
        Ok(())
    }

    /// Record a verification run.
    pub fn set_evr_status(
        &mut self,
        id: &EvrId,
        status: EvrStatus,
        proof: Option<String>,
    ) -> Result<(), RecordError> {
        let evr = self.evr_mut(id).ok_or_else(|| unknown(id.as_str()))?;
        evr.status = status;
        evr.last_run = Some(truncate_to_seconds(Utc::now()));
        if proof.is_some() {
            evr.proof = proof;
        }
        self.touch();
        Ok(())
    }

    /// Rebuild every `Evr::referenced_by` from step `evr_refs`.
    pub fn relink_evrs(&mut self) {
        for evr in &mut self.evrs {
            evr.referenced_by.clear();
        }
        let links: Vec<(NodeId, EvrId)> = self
            .plans
            .iter()
            .flat_map(|p| p.steps.iter())
            .flat_map(|s| s.evr_refs.iter().map(move |e| (s.id.clone(), e.clone())))
            .collect();
        for (step, evr) in links {
            if let Some(target) = self.evr_mut(&evr) {
                if !target.referenced_by.contains(&step) {
                    target.referenced_by.push(step);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check structural invariants: non-empty id and title, unique ids,
    /// steps named after their plan, EVR references resolvable.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.id.0.trim().is_empty() {
            return Err(invalid("id", "record id is empty"));
        }
        if self.id.0.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(invalid("id", "record id must not contain whitespace or path separators"));
        }
        if self.title.trim().is_empty() {
            return Err(invalid("title", "title is empty"));
        }

        let mut nodes = HashSet::new();
        for plan in &self.plans {
            if plan.id.is_step() || !nodes.insert(plan.id.clone()) {
                return Err(invalid(
                    &format!("plan:{}", plan.id),
                    "plan id is malformed or duplicated",
                ));
            }
            for step in &plan.steps {
                if step.id.parent().as_ref() != Some(&plan.id) || !nodes.insert(step.id.clone()) {
                    return Err(invalid(
                        &format!("step:{}", step.id),
                        "step id is malformed or duplicated",
                    ));
                }
            }
        }

        let mut evrs = HashSet::new();
        for evr in &self.evrs {
            if !evrs.insert(evr.id.clone()) {
                return Err(invalid(&format!("evr:{}", evr.id), "duplicated EVR id"));
            }
        }
        for step in self.plans.iter().flat_map(|p| p.steps.iter()) {
            if let Some(missing) = step.evr_refs.iter().find(|e| !evrs.contains(*e)) {
                return Err(invalid(
                    &format!("step:{}", step.id),
                    &format!("references unknown EVR '{missing}'"),
                ));
            }
        }
        Ok(())
    }
}

/// Borrowed plan or step, as returned by [`TaskRecord::find_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Plan(&'a Plan),
    Step(&'a Step),
}

impl NodeRef<'_> {
    pub fn status(&self) -> PlanStatus {
        match self {
            NodeRef::Plan(plan) => plan.status,
            NodeRef::Step(step) => step.status,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            NodeRef::Plan(plan) => &plan.description,
            NodeRef::Step(step) => &step.description,
        }
    }
}

fn unknown(id: &str) -> RecordError {
    RecordError::UnknownNode { id: id.to_string() }
}

fn invalid(field: &str, reason: &str) -> RecordError {
    RecordError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TaskRecord {
        TaskRecord::new(RecordId::from("task-1"), "Ship parser")
    }

    #[test]
    fn ids_are_allocated_sequentially() {
        let mut r = record();
        let p1 = r.add_plan("first");
        let p2 = r.add_plan("second");
        assert_eq!(p1, NodeId::from("P1"));
        assert_eq!(p2, NodeId::from("P2"));
        let s1 = r.add_step(&p2, "step").unwrap();
        let s2 = r.add_step(&p2, "step").unwrap();
        assert_eq!(s1, NodeId::from("P2.S1"));
        assert_eq!(s2, NodeId::from("P2.S2"));
        assert_eq!(r.add_evr("works", EvrClass::Runtime), EvrId::from("E1"));
    }

    #[test]
    fn every_mutation_bumps_version() {
        let mut r = record();
        let v0 = r.version.clone();
        let plan = r.add_plan("p");
        let v1 = r.version.clone();
        assert_ne!(v0, v1);
        r.set_status(&plan, PlanStatus::InProgress).unwrap();
        assert_ne!(r.version, v1);
    }

    #[test]
    fn set_status_stamps_completion() {
        let mut r = record();
        let plan = r.add_plan("p");
        let step = r.add_step(&plan, "s").unwrap();
        let previous = r.set_status(&step, PlanStatus::Completed).unwrap();
        assert_eq!(previous, PlanStatus::ToDo);
        assert!(r.step(&step).unwrap().completed_at.is_some());
        r.set_status(&step, PlanStatus::Blocked).unwrap();
        assert!(r.step(&step).unwrap().completed_at.is_none());
    }

    #[test]
    fn set_status_unknown_node_fails() {
        let mut r = record();
        let err = r.set_status(&NodeId::from("P9"), PlanStatus::Completed).unwrap_err();
        assert_eq!(err, RecordError::UnknownNode { id: "P9".to_string() });
    }

    #[test]
    fn typed_status_setters_reject_the_other_kind() {
        let mut r = record();
        let plan = r.add_plan("p");
        let step = r.add_step(&plan, "s").unwrap();
        assert!(r.set_plan_status(&step, PlanStatus::Completed).is_err());
        assert!(r.set_step_status(&plan, PlanStatus::Completed).is_err());
        r.set_step_status(&step, PlanStatus::InProgress).unwrap();
        assert!(matches!(r.find_node(&step), Some(NodeRef::Step(_))));
        assert_eq!(r.find_node(&step).unwrap().status(), PlanStatus::InProgress);
        assert!(r.find_node(&NodeId::from("P7")).is_none());
    }

    #[test]
    fn link_evr_maintains_reverse_refs() {
        let mut r = record();
        let plan = r.add_plan("p");
        let step = r.add_step(&plan, "s").unwrap();
        let evr = r.add_evr("tests pass", EvrClass::Runtime);
        r.link_evr(&step, &evr).unwrap();
        r.link_evr(&step, &evr).unwrap();
        assert_eq!(r.step(&step).unwrap().evr_refs, vec![evr.clone()]);
        assert_eq!(r.evr(&evr).unwrap().referenced_by, vec![step]);
    }

    #[test]
    fn validate_rejects_empty_id_and_dangling_refs() {
        let mut r = TaskRecord::new(RecordId::from(""), "t");
        assert!(matches!(r.validate(), Err(RecordError::Invalid { .. })));

        r.id = RecordId::from("ok");
        let plan = r.add_plan("p");
        let step = r.add_step(&plan, "s").unwrap();
        r.step_mut(&step).unwrap().evr_refs.push(EvrId::from("E7"));
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("E7"));
    }

    #[test]
    fn evr_status_records_last_run() {
        let mut r = record();
        let evr = r.add_evr("lint clean", EvrClass::Static);
        r.set_evr_status(&evr, EvrStatus::Passing, Some("ci#12".into()))
            .unwrap();
        let e = r.evr(&evr).unwrap();
        assert_eq!(e.status, EvrStatus::Passing);
        assert!(e.last_run.is_some());
        assert_eq!(e.proof.as_deref(), Some("ci#12"));
    }
}
