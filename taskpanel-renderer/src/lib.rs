//! # taskpanel-renderer
//!
//! Panel transcoder: renders a [`TaskRecord`](taskpanel_core::TaskRecord)
//! into the human-editable panel document, parses a document back into
//! [`PanelData`], and fingerprints both sides over the same canonical form.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use taskpanel_core::{RecordId, TaskRecord};
//! use taskpanel_renderer::{parse, panel_prints, record_prints, PanelRenderer};
//!
//! fn check(record: &TaskRecord) {
//!     if let Ok(renderer) = PanelRenderer::new() {
//!         if let Ok(text) = renderer.render(record) {
//!             let panel = parse(&text);
//!             assert_eq!(panel_prints(&panel), record_prints(record));
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod marker;
pub mod panel;
pub mod parser;

pub use context::{PanelContext, PendingMarkers};
pub use engine::PanelRenderer;
pub use error::RenderError;
pub use fingerprint::{fingerprint, panel_prints, record_prints};
pub use panel::{PanelData, PanelEvr, PanelMeta, PanelNode, PanelPlan, ParseWarning, WarningKind};
pub use parser::parse;
