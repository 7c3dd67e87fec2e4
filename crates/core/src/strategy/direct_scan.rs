//! Scroll the conversation and render mounted blocks as they appear.
//!
//! The host virtualizes long threads, so blocks mount and unmount as the
//! container scrolls. Each snapshot is matched against what was already seen
//! by fingerprint, and new blocks are placed relative to their mounted
//! neighbours so the result keeps document order.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::annotate::annotate_markers;
use crate::config::ExtractSettings;
use crate::host::CitationUrlResolver;
use crate::lookup::SourceLookup;
use crate::parse::Document;
use crate::profile::ProfileSelectors;
use crate::registry::CitationRegistry;
use crate::render::StructuredRenderer;
use crate::strategy::{
    AttemptContext, ExtractionStrategy, IdleTracker, StrategyKind, await_stable_height, scroll_step, settle,
};
use crate::turn::{Role, Turn, fingerprint, merge_adjacent};
use crate::Result;

#[derive(Debug, Clone)]
pub struct DirectScan {
    selectors: ProfileSelectors,
    settings: ExtractSettings,
}

/// Blocks seen so far, in document order, keyed by role and fingerprint.
#[derive(Debug, Default)]
struct SeenBlocks {
    blocks: Vec<(String, Turn)>,
}

impl SeenBlocks {
    fn position(&self, key: &str) -> Option<usize> {
        self.blocks.iter().position(|(k, _)| k == key)
    }

    fn into_turns(self) -> Vec<Turn> {
        self.blocks.into_iter().map(|(_, turn)| turn).collect()
    }
}

impl DirectScan {
    pub fn new(selectors: ProfileSelectors, settings: ExtractSettings) -> Self {
        Self { selectors, settings }
    }

    async fn scan(&self, ctx: &mut AttemptContext<'_, '_>, seen: &mut SeenBlocks) -> Result<()> {
        let AttemptContext { host, registry, sources, options } = ctx;
        let renderer = StructuredRenderer::new(self.selectors.clone(), *options);
        let page = &mut *host.page;
        let resolver = host.resolver;

        page.scroll_to(0.0).await?;
        settle(&self.settings).await;
        await_stable_height(page, &self.settings).await?;

        let mut idle = IdleTracker::new(self.settings.idle_steps);
        for step in 0..self.settings.max_steps {
            let snapshot = page.snapshot().await?;
            let added = self.collect(&snapshot.html, &renderer, resolver, registry, sources, seen);
            debug!(step, added, top = snapshot.scroll.top, height = snapshot.scroll.height, "scan step");

            if idle.record(snapshot.scroll.at_bottom(), added) {
                return Ok(());
            }
            if snapshot.scroll.at_bottom() {
                await_stable_height(page, &self.settings).await?;
            } else {
                scroll_step(page, snapshot.scroll, &self.settings).await?;
            }
        }

        warn!("scan stopped at the step cap of {}", self.settings.max_steps);
        Ok(())
    }

    /// Render every block in `html` not seen before. Returns how many were new.
    fn collect(
        &self, html: &str, renderer: &StructuredRenderer, resolver: &dyn CitationUrlResolver,
        registry: &mut CitationRegistry, sources: &SourceLookup, seen: &mut SeenBlocks,
    ) -> usize {
        let doc = Document::parse(html);
        let profile = &self.selectors.profile;

        let mounted: Vec<_> = doc
            .select(&self.selectors.any_block)
            .into_iter()
            .enumerate()
            .filter_map(|(index, block)| {
                let text = block.text();
                if text.trim().is_empty() {
                    return None;
                }
                let role =
                    if block.matches(&self.selectors.user_block) { Role::User } else { Role::Assistant };
                let key = format!("{}:{}", role, fingerprint(&text));
                Some((index, key, role, block))
            })
            .collect();

        // New blocks above the first known one go before it.
        let mut cursor = mounted
            .iter()
            .find_map(|(_, key, _, _)| seen.position(key))
            .unwrap_or(seen.blocks.len());
        let mut added = 0;

        for (index, key, role, block) in mounted {
            if let Some(position) = seen.position(&key) {
                cursor = position + 1;
                continue;
            }

            let annotated = annotate_markers(
                &block.inner_html(),
                &profile.citation_markers,
                index,
                block.attr(&profile.block_key_attr),
                resolver,
            );
            let content = renderer.render(&annotated, registry, sources);

            seen.blocks.insert(cursor, (key, Turn::new(role, content)));
            cursor += 1;
            added += 1;
        }

        added
    }
}

#[async_trait(?Send)]
impl ExtractionStrategy for DirectScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectScan
    }

    async fn extract(&self, ctx: &mut AttemptContext<'_, '_>) -> Vec<Turn> {
        let mut seen = SeenBlocks::default();
        if let Err(e) = self.scan(ctx, &mut seen).await {
            warn!("direct scan ended early: {}", e);
        }
        merge_adjacent(seen.into_turns())
    }
}
