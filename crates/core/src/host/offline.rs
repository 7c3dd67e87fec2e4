//! Host implementations backed by saved files instead of a live page.

use std::time::Duration;

use async_trait::async_trait;

use crate::host::{CaptureBridge, Clipboard, ClipboardError, FocusPrompt, HostPage, PageSnapshot, ScrollMetrics};
use crate::parse::Document;
use crate::{Result, ThreadmarkError};

/// A saved page snapshot. Everything is mounted, so it never scrolls.
#[derive(Debug, Clone)]
pub struct StaticPage {
    html: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

#[async_trait(?Send)]
impl HostPage for StaticPage {
    async fn snapshot(&mut self) -> Result<PageSnapshot> {
        Ok(PageSnapshot { html: self.html.clone(), scroll: self.scroll_metrics().await? })
    }

    async fn scroll_metrics(&mut self) -> Result<ScrollMetrics> {
        Ok(ScrollMetrics::new(0.0, 1.0, 1.0))
    }

    async fn scroll_to(&mut self, _top: f64) -> Result<()> {
        Ok(())
    }

    /// Reports whether the control exists; a snapshot has nothing to trigger.
    async fn click(&mut self, selector: &str, nth: usize) -> Result<bool> {
        let doc = Document::parse(&self.html);
        Ok(doc.select_str(selector)?.len() > nth)
    }

    async fn has_focus(&mut self) -> bool {
        true
    }
}

/// Capture bridge that hands back a payload saved from an earlier export.
#[derive(Debug, Clone, Default)]
pub struct ReplayCapture {
    payload: Option<String>,
    installed: bool,
}

impl ReplayCapture {
    pub fn new(payload: Option<String>) -> Self {
        Self { payload, installed: false }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

#[async_trait(?Send)]
impl CaptureBridge for ReplayCapture {
    /// Fails while the hooks from an earlier install are still in place.
    fn install(&mut self) -> Result<()> {
        if self.installed {
            return Err(ThreadmarkError::CaptureBridge("download hooks already installed".to_string()));
        }
        self.installed = true;
        Ok(())
    }

    async fn await_capture(&mut self, _timeout: Duration) -> Option<String> {
        if self.installed { self.payload.clone() } else { None }
    }

    fn uninstall(&mut self) {
        self.installed = false;
    }
}

/// No clipboard access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

#[async_trait(?Send)]
impl Clipboard for NoClipboard {
    async fn read_text(&mut self) -> std::result::Result<String, ClipboardError> {
        Err(ClipboardError::PermissionDenied)
    }

    async fn write_text(&mut self, _text: &str) -> std::result::Result<(), ClipboardError> {
        Err(ClipboardError::PermissionDenied)
    }
}

/// Focus prompt that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPrompt;

impl FocusPrompt for SilentPrompt {
    fn show(&mut self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn dismiss(&mut self) {}
}
