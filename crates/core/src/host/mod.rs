//! The live page the strategies drive.
//!
//! Everything the core needs from its environment is a trait here: markup
//! snapshots and simulated interaction ([`HostPage`]), host-internal citation
//! state ([`CitationUrlResolver`]), the focus-gated [`Clipboard`], the
//! page-context [`CaptureBridge`] for export downloads, and a recoverable
//! [`FocusPrompt`]. [`offline`] has implementations that serve a saved
//! snapshot.

use std::time::Duration;

use async_trait::async_trait;

use crate::Result;

pub mod offline;

pub use offline::{NoClipboard, ReplayCapture, SilentPrompt, StaticPage};

/// Scroll position of the conversation container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub top: f64,
    pub height: f64,
    pub viewport: f64,
}

impl ScrollMetrics {
    pub fn new(top: f64, height: f64, viewport: f64) -> Self {
        Self { top, height, viewport }
    }

    /// Largest meaningful scroll offset.
    pub fn max_top(&self) -> f64 {
        (self.height - self.viewport).max(0.0)
    }

    pub fn at_bottom(&self) -> bool {
        self.top + 1.0 >= self.max_top()
    }
}

/// Markup mounted at one moment, with the scroll position it was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub html: String,
    pub scroll: ScrollMetrics,
}

#[async_trait(?Send)]
pub trait HostPage {
    /// Markup currently mounted in the conversation container.
    async fn snapshot(&mut self) -> Result<PageSnapshot>;

    /// Current scroll position, without serializing markup.
    async fn scroll_metrics(&mut self) -> Result<ScrollMetrics>;

    /// Scroll the container to `top`. The page clamps out-of-range offsets.
    async fn scroll_to(&mut self, top: f64) -> Result<()>;

    /// Click the `nth` element matching `selector`. `false` if there is none.
    async fn click(&mut self, selector: &str, nth: usize) -> Result<bool>;

    async fn has_focus(&mut self) -> bool;
}

/// Identifies one citation marker inside one mounted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerContext<'a> {
    /// Position of the block among mounted blocks.
    pub block_index: usize,
    /// Value of the profile's block key attribute, when present.
    pub block_key: Option<&'a str>,
    /// Position of the marker among the block's markers, in document order.
    pub ordinal: usize,
}

/// Best-effort read of citation URLs that only exist in host component
/// state. `None` means the marker is left to its visible markup.
pub trait CitationUrlResolver {
    fn resolve(&self, marker: &MarkerContext<'_>) -> Option<Vec<String>>;
}

/// Resolver for hosts that expose no internal state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInternalState;

impl CitationUrlResolver for NoInternalState {
    fn resolve(&self, _marker: &MarkerContext<'_>) -> Option<Vec<String>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    #[error("page does not have focus")]
    FocusLost,
    #[error("clipboard permission denied")]
    PermissionDenied,
}

#[async_trait(?Send)]
pub trait Clipboard {
    async fn read_text(&mut self) -> std::result::Result<String, ClipboardError>;
    async fn write_text(&mut self, text: &str) -> std::result::Result<(), ClipboardError>;
}

/// Page-context patch that intercepts export downloads.
///
/// Use it through [`crate::capture::CaptureScope`], which uninstalls on every
/// exit path.
#[async_trait(?Send)]
pub trait CaptureBridge {
    fn install(&mut self) -> Result<()>;

    /// Raw captured payload, or `None` if nothing arrived within `timeout`.
    async fn await_capture(&mut self, timeout: Duration) -> Option<String>;

    fn uninstall(&mut self);
}

/// User-visible, dismissible notice shown while a strategy waits for focus.
pub trait FocusPrompt {
    fn show(&mut self, message: &str);
    fn dismiss(&mut self);
}

/// Everything one extraction run borrows from the environment.
pub struct HostEnv<'a> {
    pub page: &'a mut dyn HostPage,
    pub resolver: &'a dyn CitationUrlResolver,
    pub clipboard: &'a mut dyn Clipboard,
    pub capture: &'a mut dyn CaptureBridge,
    pub prompt: &'a mut dyn FocusPrompt,
}
