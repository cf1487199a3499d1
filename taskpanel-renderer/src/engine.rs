//! Tera rendering engine for the panel document.
//!
//! The single template is baked into the binary at compile time. Output is
//! LF-only and ends in exactly one newline.

use tera::Tera;

use taskpanel_core::TaskRecord;

use crate::context::{PanelContext, PendingMarkers};
use crate::error::RenderError;

const PANEL_TEMPLATE: &str = "panel.md.tera";

fn build_tera() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_template(PANEL_TEMPLATE, include_str!("templates/panel.md.tera"))?;
    Ok(tera)
}

/// Renders task records into panel documents.
///
/// Create once with [`PanelRenderer::new`] and reuse.
pub struct PanelRenderer {
    tera: Tera,
}

impl PanelRenderer {
    pub fn new() -> Result<Self, RenderError> {
        Ok(PanelRenderer { tera: build_tera()? })
    }

    /// Render `record` with its own statuses.
    pub fn render(&self, record: &TaskRecord) -> Result<String, RenderError> {
        self.render_with_pending(record, &PendingMarkers::new())
    }

    /// Render `record`, keeping the markers in `pending` instead of the
    /// record's statuses for those nodes.
    pub fn render_with_pending(
        &self,
        record: &TaskRecord,
        pending: &PendingMarkers,
    ) -> Result<String, RenderError> {
        let ctx = PanelContext::from_record(record, pending);
        self.render_with_context(&ctx)
    }

    /// Render a caller-provided [`PanelContext`].
    pub fn render_with_context(&self, ctx: &PanelContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let out = self.tera.render(PANEL_TEMPLATE, &tera_ctx)?;
        Ok(normalize(&out))
    }
}

fn normalize(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n");
    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}
