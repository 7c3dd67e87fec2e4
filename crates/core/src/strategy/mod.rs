//! Extraction strategies.
//!
//! Each strategy harvests the conversation from the host page its own way and
//! returns turns in conversation order. A strategy never fails outright: any
//! problem ends it early with whatever it has, and the orchestrator judges
//! whether that is enough.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ExtractSettings;
use crate::host::{HostEnv, HostPage, ScrollMetrics};
use crate::lookup::SourceLookup;
use crate::registry::CitationRegistry;
use crate::render::RenderOptions;
use crate::turn::Turn;
use crate::{Result, ThreadmarkError};

pub mod copy;
pub mod direct_scan;
pub mod export;

pub use copy::CopyAffordance;
pub use direct_scan::DirectScan;
pub use export::{ExportInterception, parse_export, render_export};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "direct")]
    DirectScan,
    #[serde(rename = "export")]
    Export,
    #[serde(rename = "copy")]
    Copy,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [StrategyKind::DirectScan, StrategyKind::Export, StrategyKind::Copy];
}

impl FromStr for StrategyKind {
    type Err = ThreadmarkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "direct" | "direct-scan" | "scan" => Ok(Self::DirectScan),
            "export" => Ok(Self::Export),
            "copy" => Ok(Self::Copy),
            _ => Err(ThreadmarkError::InvalidPriority(format!(
                "unknown strategy: {}. Valid options: direct, export, copy",
                s
            ))),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::DirectScan => "direct",
            StrategyKind::Export => "export",
            StrategyKind::Copy => "copy",
        };
        f.write_str(name)
    }
}

/// State one extraction attempt works against.
pub struct AttemptContext<'h, 'e> {
    pub host: &'h mut HostEnv<'e>,
    /// Fresh for every attempt.
    pub registry: &'h mut CitationRegistry,
    /// Shared across attempts of one run.
    pub sources: &'h mut SourceLookup,
    pub options: RenderOptions,
}

#[async_trait(?Send)]
pub trait ExtractionStrategy {
    fn kind(&self) -> StrategyKind;

    /// Harvest turns. Short or empty on failure.
    async fn extract(&self, ctx: &mut AttemptContext<'_, '_>) -> Vec<Turn>;
}

/// Pause for the host to re-render after an interaction.
pub(crate) async fn settle(settings: &ExtractSettings) {
    tokio::time::sleep(settings.settle_delay).await;
}

/// Wait for the scroll height to stop changing, polling a bounded number of
/// times.
pub(crate) async fn await_stable_height(page: &mut dyn HostPage, settings: &ExtractSettings) -> Result<ScrollMetrics> {
    let mut metrics = page.scroll_metrics().await?;
    for _ in 0..settings.height_poll_attempts {
        settle(settings).await;
        let next = page.scroll_metrics().await?;
        if next.height == metrics.height {
            return Ok(next);
        }
        metrics = next;
    }
    Ok(metrics)
}

/// Scroll one step towards the bottom and let the page settle.
pub(crate) async fn scroll_step(
    page: &mut dyn HostPage, scroll: ScrollMetrics, settings: &ExtractSettings,
) -> Result<ScrollMetrics> {
    let next = (scroll.top + scroll.viewport * settings.scroll_step_ratio).min(scroll.max_top());
    page.scroll_to(next).await?;
    settle(settings).await;
    await_stable_height(page, settings).await
}

/// Stop condition shared by the scrolling strategies: a run of steps at the
/// bottom that found nothing new.
#[derive(Debug)]
pub(crate) struct IdleTracker {
    idle: usize,
    limit: usize,
}

impl IdleTracker {
    pub(crate) fn new(limit: usize) -> Self {
        Self { idle: 0, limit: limit.max(1) }
    }

    /// Record one step. Returns `true` once the scan should stop.
    pub(crate) fn record(&mut self, at_bottom: bool, added: usize) -> bool {
        if at_bottom && added == 0 {
            self.idle += 1;
        } else {
            self.idle = 0;
        }
        self.idle >= self.limit
    }
}
