//! Scripted hosts for the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use threadmark_core::host::ReplayCapture;
use threadmark_core::*;

pub fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

pub fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

/// Settings with every pause removed.
pub fn fast_settings() -> ExtractSettings {
    ExtractSettings::builder()
        .settle_delay(Duration::ZERO)
        .focus_poll_interval(Duration::ZERO)
        .capture_timeout(Duration::ZERO)
        .idle_steps(2)
        .max_steps(100)
        .build()
}

pub fn selectors() -> ProfileSelectors {
    ProfileSelectors::compile(&MarkupProfile::default()).unwrap()
}

/// A virtualized conversation: fixed-height blocks, only those overlapping
/// the viewport are mounted.
pub struct VirtualPage {
    blocks: Vec<String>,
    block_height: f64,
    viewport: f64,
    top: f64,
    pub snapshots: usize,
}

impl VirtualPage {
    pub fn new(blocks: Vec<String>, block_height: f64, viewport: f64) -> Self {
        Self { blocks, block_height, viewport, top: 0.0, snapshots: 0 }
    }

    fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics::new(self.top, self.blocks.len() as f64 * self.block_height, self.viewport)
    }
}

#[async_trait(?Send)]
impl HostPage for VirtualPage {
    async fn snapshot(&mut self) -> Result<PageSnapshot> {
        self.snapshots += 1;
        let (top, bottom) = (self.top, self.top + self.viewport);
        let mounted: Vec<&str> = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let start = *i as f64 * self.block_height;
                start < bottom && start + self.block_height > top
            })
            .map(|(_, block)| block.as_str())
            .collect();
        Ok(PageSnapshot { html: format!("<main>{}</main>", mounted.join("\n")), scroll: self.metrics() })
    }

    async fn scroll_metrics(&mut self) -> Result<ScrollMetrics> {
        Ok(self.metrics())
    }

    async fn scroll_to(&mut self, top: f64) -> Result<()> {
        self.top = top.clamp(0.0, self.metrics().max_top());
        Ok(())
    }

    async fn click(&mut self, _selector: &str, _nth: usize) -> Result<bool> {
        Ok(false)
    }

    async fn has_focus(&mut self) -> bool {
        true
    }
}

/// Clipboard contents shared between a [`CopyPage`] and a [`FakeClipboard`].
#[derive(Debug, Default)]
pub struct ClipboardState {
    pub text: String,
    /// Reads that fail with `FocusLost` before the clipboard answers.
    pub focus_losses: usize,
}

pub type SharedClipboard = Rc<RefCell<ClipboardState>>;

/// A fully mounted page whose copy controls write scripted Markdown to the
/// clipboard.
pub struct CopyPage {
    html: String,
    queries: Vec<String>,
    answers: Vec<String>,
    clipboard: SharedClipboard,
    focus: VecDeque<bool>,
    pub clicks: Vec<(String, usize)>,
}

impl CopyPage {
    pub fn new(html: String, queries: Vec<&str>, answers: Vec<&str>, clipboard: SharedClipboard) -> Self {
        Self {
            html,
            queries: queries.into_iter().map(String::from).collect(),
            answers: answers.into_iter().map(String::from).collect(),
            clipboard,
            focus: VecDeque::new(),
            clicks: Vec::new(),
        }
    }

    /// Answers for successive focus checks; afterwards the page has focus.
    pub fn with_focus_script(mut self, script: &[bool]) -> Self {
        self.focus = script.iter().copied().collect();
        self
    }
}

#[async_trait(?Send)]
impl HostPage for CopyPage {
    async fn snapshot(&mut self) -> Result<PageSnapshot> {
        Ok(PageSnapshot { html: self.html.clone(), scroll: ScrollMetrics::new(0.0, 1.0, 1.0) })
    }

    async fn scroll_metrics(&mut self) -> Result<ScrollMetrics> {
        Ok(ScrollMetrics::new(0.0, 1.0, 1.0))
    }

    async fn scroll_to(&mut self, _top: f64) -> Result<()> {
        Ok(())
    }

    async fn click(&mut self, selector: &str, nth: usize) -> Result<bool> {
        self.clicks.push((selector.to_string(), nth));
        let payloads = if selector.contains("query") { &self.queries } else { &self.answers };
        match payloads.get(nth) {
            Some(text) => {
                self.clipboard.borrow_mut().text = text.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn has_focus(&mut self) -> bool {
        self.focus.pop_front().unwrap_or(true)
    }
}

pub struct FakeClipboard {
    state: SharedClipboard,
}

impl FakeClipboard {
    pub fn new(state: SharedClipboard) -> Self {
        Self { state }
    }
}

#[async_trait(?Send)]
impl Clipboard for FakeClipboard {
    async fn read_text(&mut self) -> std::result::Result<String, ClipboardError> {
        let mut state = self.state.borrow_mut();
        if state.focus_losses > 0 {
            state.focus_losses -= 1;
            return Err(ClipboardError::FocusLost);
        }
        Ok(state.text.clone())
    }

    async fn write_text(&mut self, text: &str) -> std::result::Result<(), ClipboardError> {
        self.state.borrow_mut().text = text.to_string();
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingPrompt {
    pub shown: Vec<String>,
    pub dismissed: usize,
}

impl FocusPrompt for RecordingPrompt {
    fn show(&mut self, message: &str) {
        self.shown.push(message.to_string());
    }

    fn dismiss(&mut self) {
        self.dismissed += 1;
    }
}

/// Strategy that registers fixed URLs and returns fixed turns.
pub struct FixedStrategy {
    pub kind: StrategyKind,
    pub turns: Vec<Turn>,
    pub urls: Vec<&'static str>,
}

#[async_trait(?Send)]
impl ExtractionStrategy for FixedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn extract(&self, ctx: &mut AttemptContext<'_, '_>) -> Vec<Turn> {
        for url in &self.urls {
            ctx.registry.add_citation(url, None);
        }
        self.turns.clone()
    }
}

/// The non-page half of a host environment.
pub struct Peripherals<C: Clipboard> {
    pub clipboard: C,
    pub capture: ReplayCapture,
    pub prompt: RecordingPrompt,
}

impl<C: Clipboard> Peripherals<C> {
    pub fn new(clipboard: C, capture: ReplayCapture) -> Self {
        Self { clipboard, capture, prompt: RecordingPrompt::default() }
    }

    pub fn env<'a>(&'a mut self, page: &'a mut dyn HostPage) -> HostEnv<'a> {
        HostEnv {
            page,
            resolver: &NoInternalState,
            clipboard: &mut self.clipboard,
            capture: &mut self.capture,
            prompt: &mut self.prompt,
        }
    }
}
