//! Panel document parser.
//!
//! Never fails. Lines that cannot be understood are skipped and reported as
//! [`ParseWarning`]s; sections that are absent come back as `None`.
//!
//! Plan and step nesting is decided by relative indentation: the first list
//! item fixes the plan column, a deeper checklist item opens a step, and
//! anything deeper than the step column belongs to that step.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use taskpanel_core::{EvrClass, EvrId, EvrStatus, LogEntry, NodeId, RecordId, VersionTag};

use crate::fingerprint::{canonical_block, canonical_line};
use crate::marker::{parse_checkbox, MarkerError};
use crate::panel::{
    PanelData, PanelEvr, PanelMeta, PanelNode, PanelPlan, ParseWarning, WarningKind,
};

const META_PREFIX: &str = "<!-- taskpanel";
const ANCHOR_PREFIX: &str = "<!-- id:";
const EVR_COLUMNS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Section {
    Goal,
    References,
    Requirements,
    Issues,
    Hints,
    Plans,
    ExpectedResults,
    Logs,
}

impl Section {
    const ALL: [Section; 8] = [
        Section::Goal,
        Section::References,
        Section::Requirements,
        Section::Issues,
        Section::Hints,
        Section::Plans,
        Section::ExpectedResults,
        Section::Logs,
    ];

    fn from_heading(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "goal" => Some(Section::Goal),
            "references" => Some(Section::References),
            "requirements" => Some(Section::Requirements),
            "issues" => Some(Section::Issues),
            "hints" => Some(Section::Hints),
            "plans" => Some(Section::Plans),
            "expected results" => Some(Section::ExpectedResults),
            "logs" => Some(Section::Logs),
            _ => None,
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Section::Goal => "Goal",
            Section::References => "References",
            Section::Requirements => "Requirements",
            Section::Issues => "Issues",
            Section::Hints => "Hints",
            Section::Plans => "Plans",
            Section::ExpectedResults => "Expected Results",
            Section::Logs => "Logs",
        }
    }
}

#[derive(Clone, Copy)]
enum Target {
    Preamble,
    AfterTitle,
    Body(Section),
    Skip,
}

type Lines<'a> = Vec<(usize, &'a str)>;

/// Parse a panel document.
pub fn parse(text: &str) -> PanelData {
    let text = text.replace("\r\n", "\n");
    let mut data = PanelData::default();
    let mut warnings = Vec::new();
    let mut bodies: HashMap<Section, Lines<'_>> = HashMap::new();
    let mut meta_seen = false;
    let mut target = Target::Preamble;

    for (idx, line) in text.lines().enumerate() {
        let n = idx + 1;

        if let Some(name) = line.strip_prefix("## ") {
            target = match Section::from_heading(name) {
                Some(section) if bodies.contains_key(&section) => {
                    warnings.push(ParseWarning::at(
                        WarningKind::DuplicateSection,
                        n,
                        format!("section '{}' repeated; later copy ignored", section.heading()),
                    ));
                    Target::Skip
                }
                Some(section) => {
                    bodies.insert(section, Vec::new());
                    Target::Body(section)
                }
                None => {
                    warnings.push(ParseWarning::at(
                        WarningKind::UnknownSection,
                        n,
                        format!("unknown section '{}'", name.trim()),
                    ));
                    Target::Skip
                }
            };
            continue;
        }

        match target {
            Target::Preamble => {
                if let Some(title) = line.strip_prefix("# ") {
                    data.title = Some(canonical_line(title));
                    target = Target::AfterTitle;
                } else if !meta_seen && line.trim_start().starts_with(META_PREFIX) {
                    meta_seen = true;
                    data.meta = parse_meta(n, line, &mut warnings);
                } else if !line.trim().is_empty() {
                    warnings.push(unrecognized(n, line, "before the title"));
                }
            }
            Target::AfterTitle => {
                if !line.trim().is_empty() {
                    warnings.push(unrecognized(n, line, "between title and first section"));
                }
            }
            Target::Body(section) => {
                if let Some(lines) = bodies.get_mut(&section) {
                    lines.push((n, line));
                }
            }
            Target::Skip => {}
        }
    }

    if !meta_seen {
        warnings.push(ParseWarning::general(
            WarningKind::MissingMeta,
            "no taskpanel header comment; version and timestamp unknown",
        ));
    }
    if data.title.is_none() {
        warnings.push(ParseWarning::general(WarningKind::MissingSection, "missing title heading"));
    }

    for section in Section::ALL {
        let Some(lines) = bodies.remove(&section) else {
            warnings.push(ParseWarning::general(
                WarningKind::MissingSection,
                format!("missing section '{}'", section.heading()),
            ));
            continue;
        };
        match section {
            Section::Goal => {
                let joined = lines
                    .iter()
                    .map(|&(_, l)| unescape_block_line(l))
                    .collect::<Vec<_>>()
                    .join("\n");
                data.goal = Some(canonical_block(&joined));
            }
            Section::References => data.references = Some(parse_list(&lines, &mut warnings)),
            Section::Requirements => data.requirements = Some(parse_list(&lines, &mut warnings)),
            Section::Issues => data.issues = Some(parse_list(&lines, &mut warnings)),
            Section::Hints => data.hints = Some(parse_list(&lines, &mut warnings)),
            Section::Plans => data.plans = Some(parse_plans(&lines, &mut warnings)),
            Section::ExpectedResults => data.evrs = Some(parse_evrs(&lines, &mut warnings)),
            Section::Logs => data.logs = Some(parse_logs(&lines, &mut warnings)),
        }
    }

    data.warnings = warnings;
    data
}

// ---------------------------------------------------------------------------
// Header and plain lists
// ---------------------------------------------------------------------------

fn parse_meta(n: usize, line: &str, warnings: &mut Vec<ParseWarning>) -> PanelMeta {
    let inner = line
        .trim()
        .trim_start_matches(META_PREFIX)
        .trim_end_matches("-->");
    let mut meta = PanelMeta::default();
    for token in inner.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        match key {
            "record" => meta.record = Some(RecordId::from(value)),
            "version" if !value.is_empty() => meta.version = Some(VersionTag::from(value)),
            "updated_at" => match parse_time(value) {
                Some(ts) => meta.updated_at = Some(ts),
                None => warnings.push(ParseWarning::at(
                    WarningKind::MissingMeta,
                    n,
                    format!("header updated_at '{value}' is not RFC 3339"),
                )),
            },
            _ => {}
        }
    }
    meta
}

fn parse_list(lines: &[(usize, &str)], warnings: &mut Vec<ParseWarning>) -> Vec<String> {
    let mut items = Vec::new();
    for &(n, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        match list_item(line) {
            Some(item) => {
                let item = canonical_line(item);
                if !item.is_empty() {
                    items.push(item);
                }
            }
            None => warnings.push(unrecognized(n, line, "expected a '- ' list item")),
        }
    }
    items
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

fn parse_plans(lines: &[(usize, &str)], warnings: &mut Vec<ParseWarning>) -> Vec<PanelPlan> {
    let mut plans: Vec<PanelPlan> = Vec::new();
    let mut plan_indent: Option<usize> = None;
    let mut step_indent: Option<usize> = None;
    // Whether the most recent plan/step line was accepted.
    let mut plan_open = false;
    let mut step_open = false;

    for &(n, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let Some(body) = list_item(line) else {
            warnings.push(unrecognized(n, line, "expected a checklist item or detail"));
            continue;
        };
        let indent = indent_width(line);

        if plan_indent.map_or(true, |p| indent <= p) {
            plan_indent = Some(indent);
            step_indent = None;
            step_open = false;
            plan_open = false;
            if !body.starts_with('[') {
                warnings.push(orphaned(n, "detail line outside any plan"));
                continue;
            }
            if let Some(node) = checklist_node(n, body, warnings) {
                plans.push(PanelPlan {
                    node,
                    steps: Vec::new(),
                });
                plan_open = true;
            }
            continue;
        }

        if step_indent.is_some_and(|s| indent > s) {
            if body.starts_with('[') {
                warnings.push(unrecognized(n, line, "nested checklist items are not supported"));
                continue;
            }
            match plans.last_mut().and_then(|p| p.steps.last_mut()) {
                Some(step) if step_open => apply_detail(step, n, body, true, warnings),
                _ => warnings.push(orphaned(n, "detail of a skipped step")),
            }
            continue;
        }

        if body.starts_with('[') {
            step_indent = Some(indent);
            step_open = false;
            if !plan_open {
                warnings.push(orphaned(n, "step of a skipped plan"));
                continue;
            }
            if let (Some(node), Some(plan)) = (checklist_node(n, body, warnings), plans.last_mut()) {
                plan.steps.push(node);
                step_open = true;
            }
        } else {
            match plans.last_mut() {
                Some(plan) if plan_open => apply_detail(&mut plan.node, n, body, false, warnings),
                _ => warnings.push(orphaned(n, "detail of a skipped plan")),
            }
        }
    }

    drop_duplicate_nodes(plans, warnings)
}

/// Parse `"[m] description <!-- id:X -->"`.
fn checklist_node(n: usize, body: &str, warnings: &mut Vec<ParseWarning>) -> Option<PanelNode> {
    let (status, rest) = match parse_checkbox(body) {
        Ok(parsed) => parsed,
        Err(MarkerError::MissingCheckbox) => {
            warnings.push(ParseWarning::at(
                WarningKind::MalformedMarker,
                n,
                "checklist item has no closing ']'",
            ));
            return None;
        }
        Err(MarkerError::Unknown(marker)) => {
            warnings.push(ParseWarning::at(
                WarningKind::MalformedMarker,
                n,
                format!("unknown checklist marker '[{marker}]'"),
            ));
            return None;
        }
    };
    let Some((description, id)) = split_anchor(rest) else {
        warnings.push(ParseWarning::at(
            WarningKind::MissingAnchor,
            n,
            "checklist item has no '<!-- id:... -->' anchor",
        ));
        return None;
    };
    Some(PanelNode {
        id: NodeId::from(id),
        description: canonical_line(description),
        status,
        hints: Vec::new(),
        tags: Vec::new(),
        evidence: None,
        notes: None,
        evr_refs: Vec::new(),
        line: n,
    })
}

fn split_anchor(rest: &str) -> Option<(&str, &str)> {
    let rest = rest.trim_end().strip_suffix("-->")?;
    let start = rest.rfind(ANCHOR_PREFIX)?;
    let id = rest[start + ANCHOR_PREFIX.len()..].trim();
    if id.is_empty() || id.contains(char::is_whitespace) {
        return None;
    }
    Some((&rest[..start], id))
}

fn apply_detail(
    node: &mut PanelNode,
    n: usize,
    body: &str,
    is_step: bool,
    warnings: &mut Vec<ParseWarning>,
) {
    let Some((key, value)) = body.split_once(':') else {
        warnings.push(ParseWarning::at(
            WarningKind::UnknownDetail,
            n,
            format!("detail '{}' is not 'key: value'", body.trim()),
        ));
        return;
    };
    let value = canonical_line(value);
    match key.trim().to_ascii_lowercase().as_str() {
        "hint" => {
            if !value.is_empty() {
                node.hints.push(value);
            }
        }
        "tags" => node.tags.extend(split_tokens(&value)),
        "evidence" => node.evidence = (!value.is_empty()).then_some(value),
        "notes" => node.notes = (!value.is_empty()).then_some(value),
        "evr" if is_step => node.evr_refs.extend(split_tokens(&value).map(EvrId::from)),
        other => warnings.push(ParseWarning::at(
            WarningKind::UnknownDetail,
            n,
            format!("unknown detail key '{other}' on {}", node.id),
        )),
    }
}

fn split_tokens(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(canonical_line)
        .filter(|token| !token.is_empty())
}

/// Exclude every occurrence of an id that appears more than once.
fn drop_duplicate_nodes(plans: Vec<PanelPlan>, warnings: &mut Vec<ParseWarning>) -> Vec<PanelPlan> {
    let mut seen: BTreeMap<NodeId, Vec<usize>> = BTreeMap::new();
    for plan in &plans {
        seen.entry(plan.node.id.clone()).or_default().push(plan.node.line);
        for step in &plan.steps {
            seen.entry(step.id.clone()).or_default().push(step.line);
        }
    }
    let duplicated: Vec<&NodeId> = seen
        .iter()
        .filter(|(_, lines)| lines.len() > 1)
        .map(|(id, _)| id)
        .collect();
    if duplicated.is_empty() {
        return plans;
    }
    for id in &duplicated {
        warnings.push(ParseWarning::at(
            WarningKind::DuplicateAnchor,
            seen[*id][0],
            format!("anchor '{id}' appears on lines {:?}; all copies ignored", seen[*id]),
        ));
    }
    plans
        .into_iter()
        .filter(|plan| !duplicated.contains(&&plan.node.id))
        .map(|mut plan| {
            plan.steps.retain(|step| !duplicated.contains(&&step.id));
            plan
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Expected results table
// ---------------------------------------------------------------------------

fn parse_evrs(lines: &[(usize, &str)], warnings: &mut Vec<ParseWarning>) -> Vec<PanelEvr> {
    let mut evrs: Vec<PanelEvr> = Vec::new();
    for &(n, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let Some(cells) = split_row(line) else {
            warnings.push(unrecognized(n, line, "expected a table row"));
            continue;
        };
        if is_separator(&cells) || cells[0].eq_ignore_ascii_case("id") {
            continue;
        }
        if cells.len() != EVR_COLUMNS || cells[0].is_empty() {
            warnings.push(ParseWarning::at(
                WarningKind::BadTableRow,
                n,
                format!("expected {EVR_COLUMNS} cells with an id, found {}", cells.len()),
            ));
            continue;
        }
        evrs.push(evr_row(n, &cells, warnings));
    }

    let mut counts: HashMap<EvrId, usize> = HashMap::new();
    for evr in &evrs {
        *counts.entry(evr.id.clone()).or_default() += 1;
    }
    let mut reported = Vec::new();
    evrs.retain(|evr| {
        if counts[&evr.id] == 1 {
            return true;
        }
        if !reported.contains(&evr.id) {
            reported.push(evr.id.clone());
            warnings.push(ParseWarning::at(
                WarningKind::DuplicateAnchor,
                evr.line,
                format!("expected result '{}' listed more than once; all rows ignored", evr.id),
            ));
        }
        false
    });
    evrs
}

fn evr_row(n: usize, cells: &[String], warnings: &mut Vec<ParseWarning>) -> PanelEvr {
    let mut bad_cell = |column: &str, value: &str, reason: String| {
        warnings.push(ParseWarning::at(
            WarningKind::BadCell,
            n,
            format!("{column} '{value}': {reason}"),
        ));
    };

    let status: EvrStatus = cells[4].parse().unwrap_or_else(|e: String| {
        bad_cell("status", &cells[4], e);
        Default::default()
    });
    let class: EvrClass = cells[5].parse().unwrap_or_else(|e: String| {
        bad_cell("class", &cells[5], e);
        Default::default()
    });
    let last_run = if cells[6].is_empty() {
        None
    } else {
        let parsed = parse_time(&cells[6]);
        if parsed.is_none() {
            bad_cell("last run", &cells[6], "not RFC 3339".to_string());
        }
        parsed
    };

    PanelEvr {
        id: EvrId::from(cells[0].as_str()),
        title: canonical_line(&cells[1]),
        verify: split_cell_list(&cells[2]),
        expect: split_cell_list(&cells[3]),
        status,
        class,
        last_run,
        proof: (!cells[7].is_empty()).then(|| canonical_line(&cells[7])),
        line: n,
    }
}

/// Cells of a `| a | b |` row with `\|` unescaped, or `None` if not a row.
fn split_row(line: &str) -> Option<Vec<String>> {
    let inner = line.trim().strip_prefix('|')?;
    let inner = match inner.strip_suffix('|') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => inner,
    };
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }
    cells.push(cell);
    Some(cells.into_iter().map(|c| c.trim().to_string()).collect())
}

fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
}

fn split_cell_list(cell: &str) -> Vec<String> {
    cell.split("<br>")
        .map(canonical_line)
        .filter(|item| !item.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

fn parse_logs(lines: &[(usize, &str)], warnings: &mut Vec<ParseWarning>) -> Vec<LogEntry> {
    let mut logs = Vec::new();
    for &(n, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let Some(body) = list_item(line) else {
            warnings.push(unrecognized(n, line, "expected '- <timestamp> <message>'"));
            continue;
        };
        let (stamp, message) = body.trim().split_once(' ').unwrap_or((body.trim(), ""));
        match parse_time(stamp) {
            Some(at) => logs.push(LogEntry {
                at,
                message: canonical_line(message),
            }),
            None => warnings.push(ParseWarning::at(
                WarningKind::BadLogEntry,
                n,
                format!("log timestamp '{stamp}' is not RFC 3339"),
            )),
        }
    }
    logs
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Drop the `\` the renderer puts before goal lines starting with `#` or `\`.
fn unescape_block_line(line: &str) -> &str {
    match line.strip_prefix('\\') {
        Some(rest) if rest.starts_with('#') || rest.starts_with('\\') => rest,
        _ => line,
    }
}

/// Text after a `- ` bullet.
fn list_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix("- ")
        .or_else(|| (trimmed.trim_end() == "-").then_some(""))
}

/// Leading whitespace width; tabs count as four columns.
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

fn unrecognized(n: usize, line: &str, context: &str) -> ParseWarning {
    ParseWarning::at(
        WarningKind::UnrecognizedLine,
        n,
        format!("{context}: '{}'", line.trim()),
    )
}

fn orphaned(n: usize, message: &str) -> ParseWarning {
    ParseWarning::at(WarningKind::OrphanedLine, n, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpanel_core::PlanStatus;

    const DOC: &str = "\
<!-- taskpanel record=demo version=abc123 updated_at=2024-05-01T10:00:00Z -->
# Demo task

## Goal
Make the demo work.

## References
- docs/a.md

## Requirements

## Issues

## Hints
- be careful

## Plans
- [x] First plan <!-- id:P1 -->
  - hint: start small
  - tags: core, parser
  - [-] First step <!-- id:P1.S1 -->
    - evr: E1
    - notes: half way
- [ ] Second plan <!-- id:P2 -->

## Expected Results
| id | title | verify | expect | status | class | last run | proof |
| --- | --- | --- | --- | --- | --- | --- | --- |
| E1 | Tests a \\| b | cargo test<br>cargo clippy | green | passing | runtime | 2024-05-01T09:00:00Z | ci#1 |

## Logs
- 2024-05-01T10:00:00Z kicked off
";

    #[test]
    fn parses_every_section() {
        let panel = parse(DOC);
        assert!(panel.warnings.is_empty(), "{:?}", panel.warnings);
        assert_eq!(panel.meta.record, Some(RecordId::from("demo")));
        assert_eq!(panel.meta.version, Some(VersionTag::from("abc123")));
        assert!(panel.meta.updated_at.is_some());
        assert_eq!(panel.title.as_deref(), Some("Demo task"));
        assert_eq!(panel.goal.as_deref(), Some("Make the demo work."));
        assert_eq!(panel.references, Some(vec!["docs/a.md".to_string()]));
        assert_eq!(panel.requirements, Some(vec![]));
        assert_eq!(panel.hints, Some(vec!["be careful".to_string()]));

        let plans = panel.plans.as_ref().unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].node.status, PlanStatus::Completed);
        assert_eq!(plans[0].node.hints, vec!["start small"]);
        assert_eq!(plans[0].node.tags, vec!["core", "parser"]);
        let step = &plans[0].steps[0];
        assert_eq!(step.id, NodeId::from("P1.S1"));
        assert_eq!(step.status, PlanStatus::InProgress);
        assert_eq!(step.evr_refs, vec![EvrId::from("E1")]);
        assert_eq!(step.notes.as_deref(), Some("half way"));

        let evr = &panel.evrs.as_ref().unwrap()[0];
        assert_eq!(evr.title, "Tests a | b");
        assert_eq!(evr.verify, vec!["cargo test", "cargo clippy"]);
        assert_eq!(evr.status, EvrStatus::Passing);
        assert_eq!(evr.class, EvrClass::Runtime);
        assert_eq!(evr.proof.as_deref(), Some("ci#1"));

        let logs = panel.logs.as_ref().unwrap();
        assert_eq!(logs[0].message, "kicked off");
    }

    #[test]
    fn malformed_marker_skips_plan_and_children() {
        let doc = DOC.replace("- [x] First plan", "- [?] First plan");
        let panel = parse(&doc);
        let plans = panel.plans.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].node.id, NodeId::from("P2"));
        assert!(panel.warnings.iter().any(|w| w.kind == WarningKind::MalformedMarker));
        assert!(panel.warnings.iter().any(|w| w.kind == WarningKind::OrphanedLine));
    }

    #[test]
    fn missing_anchor_is_reported() {
        let doc = DOC.replace(" <!-- id:P2 -->", "");
        let panel = parse(&doc);
        assert_eq!(panel.plans.unwrap().len(), 1);
        assert!(panel.warnings.iter().any(|w| w.kind == WarningKind::MissingAnchor && w.line == Some(24)));
    }

    #[test]
    fn duplicate_anchor_excludes_every_copy() {
        let doc = DOC.replace("<!-- id:P2 -->", "<!-- id:P1 -->");
        let panel = parse(&doc);
        assert!(panel.plans.unwrap().is_empty());
        assert!(panel.warnings.iter().any(|w| w.kind == WarningKind::DuplicateAnchor));
    }

    #[test]
    fn missing_section_is_none_with_warning() {
        let doc = DOC.replace("## Hints\n- be careful\n", "");
        let panel = parse(&doc);
        assert!(panel.hints.is_none());
        assert!(panel
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::MissingSection && w.message.contains("Hints")));
    }

    #[test]
    fn bad_log_and_unknown_heading_are_warnings() {
        let doc = format!("{DOC}- yesterday something\n\n## Scratch\nfree text\n");
        let panel = parse(&doc);
        assert_eq!(panel.logs.unwrap().len(), 1);
        let kinds: Vec<WarningKind> = panel.warnings.iter().map(|w| w.kind).collect();
        assert!(kinds.contains(&WarningKind::BadLogEntry));
        assert!(kinds.contains(&WarningKind::UnknownSection));
        assert!(!kinds.contains(&WarningKind::UnrecognizedLine));
    }

    #[test]
    fn indentation_is_relative() {
        let doc = DOC
            .replace("  - hint: start small", "    - hint: start small")
            .replace("  - tags: core, parser", "    - tags: core, parser")
            .replace("  - [-] First step", "    - [-] First step")
            .replace("    - evr: E1", "        - evr: E1")
            .replace("    - notes: half way", "        - notes: half way");
        let panel = parse(&doc);
        assert!(panel.warnings.is_empty(), "{:?}", panel.warnings);
        let plans = panel.plans.unwrap();
        assert_eq!(plans[0].steps[0].evr_refs, vec![EvrId::from("E1")]);
        assert_eq!(plans[0].node.tags, vec!["core", "parser"]);
    }

    #[test]
    fn empty_input_never_panics() {
        let panel = parse("");
        assert!(panel.title.is_none());
        assert!(panel.warnings.iter().any(|w| w.kind == WarningKind::MissingMeta));
    }

    #[test]
    fn crlf_is_accepted() {
        let panel = parse(&DOC.replace('\n', "\r\n"));
        assert!(panel.warnings.is_empty(), "{:?}", panel.warnings);
    }
}
