//! Harvest turns through the host's per-turn copy controls.
//!
//! Each control puts its turn on the clipboard as Markdown. Reading the
//! clipboard needs page focus, so a read waits (with a visible prompt) when
//! focus is gone instead of failing.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ExtractSettings;
use crate::host::{Clipboard, ClipboardError, FocusPrompt, HostPage};
use crate::parse::Document;
use crate::profile::ProfileSelectors;
use crate::render::PrerenderedRenderer;
use crate::strategy::{
    AttemptContext, ExtractionStrategy, IdleTracker, StrategyKind, await_stable_height, scroll_step, settle,
};
use crate::turn::{Role, Turn, fingerprint, merge_adjacent};
use crate::Result;

/// Written before each click so a read that returns it is known to be stale.
const SENTINEL: &str = "\u{2063}threadmark-clipboard-sentinel\u{2063}";

const FOCUS_MESSAGE: &str = "Click anywhere on the page to let the export read the clipboard.";

#[derive(Debug, Clone)]
pub struct CopyAffordance {
    selectors: ProfileSelectors,
    settings: ExtractSettings,
}

/// One copy control found in a snapshot.
#[derive(Debug)]
struct Control {
    role: Role,
    /// Index among the controls matching the role's selector.
    nth: usize,
    /// Fingerprint of the enclosing block, when there is one.
    block: Option<String>,
}

impl CopyAffordance {
    pub fn new(selectors: ProfileSelectors, settings: ExtractSettings) -> Self {
        Self { selectors, settings }
    }

    async fn scan(&self, ctx: &mut AttemptContext<'_, '_>, turns: &mut Vec<Turn>) -> Result<()> {
        let AttemptContext { host, registry, sources, options } = ctx;
        let renderer = PrerenderedRenderer::new(*options);
        let mut seen: HashSet<String> = HashSet::new();

        host.page.scroll_to(0.0).await?;
        settle(&self.settings).await;
        await_stable_height(&mut *host.page, &self.settings).await?;

        let mut idle = IdleTracker::new(self.settings.idle_steps);
        for step in 0..self.settings.max_steps {
            let snapshot = host.page.snapshot().await?;
            let mut added = 0;

            for control in self.controls(&snapshot.html) {
                if control.block.as_ref().is_some_and(|block| seen.contains(block)) {
                    continue;
                }
                let Some(text) = self
                    .read_control(&mut *host.page, &mut *host.clipboard, &mut *host.prompt, &control)
                    .await?
                else {
                    continue;
                };

                let key = format!("{}:{}", control.role, fingerprint(&text));
                if let Some(block) = control.block {
                    seen.insert(block);
                }
                if !seen.insert(key) {
                    continue;
                }

                turns.push(Turn::new(control.role, renderer.render(&text, registry, sources)));
                added += 1;
            }
            debug!(step, added, top = snapshot.scroll.top, "copy step");

            if idle.record(snapshot.scroll.at_bottom(), added) {
                return Ok(());
            }
            if snapshot.scroll.at_bottom() {
                await_stable_height(&mut *host.page, &self.settings).await?;
            } else {
                scroll_step(&mut *host.page, snapshot.scroll, &self.settings).await?;
            }
        }

        warn!("copy scan stopped at the step cap of {}", self.settings.max_steps);
        Ok(())
    }

    /// Copy controls in document order, minus those inside code blocks.
    fn controls(&self, html: &str) -> Vec<Control> {
        let doc = Document::parse(html);
        let queries: Vec<_> = doc.select(&self.selectors.copy_query_control);
        let answers: Vec<_> = doc.select(&self.selectors.copy_response_control);

        doc.select(&self.selectors.any_copy_control)
            .into_iter()
            .filter(|control| control.closest(&self.selectors.code_scope).is_none())
            .filter_map(|control| {
                let id = control.element_ref().id();
                let (role, list) = if control.matches(&self.selectors.copy_query_control) {
                    (Role::User, &queries)
                } else {
                    (Role::Assistant, &answers)
                };
                let nth = list.iter().position(|c| c.element_ref().id() == id)?;
                let block = control
                    .closest(&self.selectors.any_block)
                    .map(|block| block.text())
                    .filter(|text| !text.trim().is_empty())
                    .map(|text| format!("{}:{}", role, fingerprint(&text)));
                Some(Control { role, nth, block })
            })
            .collect()
    }

    /// Click a control and read what it copied. `None` when the clipboard is
    /// unreadable or never changes.
    async fn read_control(
        &self, page: &mut dyn HostPage, clipboard: &mut dyn Clipboard, prompt: &mut dyn FocusPrompt,
        control: &Control,
    ) -> Result<Option<String>> {
        let profile = &self.selectors.profile;
        let selector = match control.role {
            Role::User => &profile.copy_query_control,
            Role::Assistant => &profile.copy_response_control,
        };

        self.ensure_focus(page, prompt).await;
        if let Err(ClipboardError::PermissionDenied) = clipboard.write_text(SENTINEL).await {
            debug!("clipboard not writable");
            return Ok(None);
        }
        if !page.click(selector, control.nth).await? {
            return Ok(None);
        }
        settle(&self.settings).await;

        for attempt in 0..=self.settings.stale_retries {
            self.ensure_focus(page, prompt).await;
            match clipboard.read_text().await {
                Ok(text) if text != SENTINEL && !text.trim().is_empty() => return Ok(Some(text)),
                Ok(_) => debug!(attempt, "clipboard unchanged"),
                Err(ClipboardError::FocusLost) => warn!("focus lost during clipboard read"),
                Err(ClipboardError::PermissionDenied) => {
                    warn!("clipboard read denied");
                    return Ok(None);
                }
            }
            settle(&self.settings).await;
        }

        debug!(nth = control.nth, role = %control.role, "skipping control with stale clipboard");
        Ok(None)
    }

    /// Wait for page focus, showing the prompt meanwhile. Gives up after the
    /// retry budget and lets the read proceed.
    async fn ensure_focus(&self, page: &mut dyn HostPage, prompt: &mut dyn FocusPrompt) {
        if page.has_focus().await {
            return;
        }

        warn!("page lost focus; waiting before reading the clipboard");
        prompt.show(FOCUS_MESSAGE);
        for _ in 0..self.settings.focus_retry_budget {
            tokio::time::sleep(self.settings.focus_poll_interval).await;
            if page.has_focus().await {
                break;
            }
        }
        prompt.dismiss();
    }
}

#[async_trait(?Send)]
impl ExtractionStrategy for CopyAffordance {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Copy
    }

    async fn extract(&self, ctx: &mut AttemptContext<'_, '_>) -> Vec<Turn> {
        let mut turns: Vec<Turn> = Vec::new();
        if let Err(e) = self.scan(ctx, &mut turns).await {
            warn!("copy scan ended early: {}", e);
        }
        merge_adjacent(turns)
    }
}
