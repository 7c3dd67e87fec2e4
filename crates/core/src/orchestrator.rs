//! Fallback chain over the extraction strategies.
//!
//! # Example
//!
//! ```rust,no_run
//! use threadmark_core::host::{HostEnv, NoClipboard, NoInternalState, ReplayCapture, SilentPrompt, StaticPage};
//! use threadmark_core::{AssembleOptions, Orchestrator, Preferences};
//!
//! # async fn run() -> threadmark_core::Result<()> {
//! let mut page = StaticPage::new(std::fs::read_to_string("thread.html")?);
//! let (mut clipboard, mut capture, mut prompt) = (NoClipboard, ReplayCapture::default(), SilentPrompt);
//! let mut host = HostEnv {
//!     page: &mut page,
//!     resolver: &NoInternalState,
//!     clipboard: &mut clipboard,
//!     capture: &mut capture,
//!     prompt: &mut prompt,
//! };
//!
//! let mut orchestrator = Orchestrator::from_preferences(&Preferences::default())?;
//! let markdown = orchestrator.export(&mut host, &AssembleOptions::default()).await?;
//! println!("{}", markdown);
//! # Ok(())
//! # }
//! ```

use tracing::{info, warn};

use crate::assemble::{AssembleOptions, assemble};
use crate::config::{ExtractSettings, Preferences, StrategyPriority};
use crate::host::HostEnv;
use crate::lookup::SourceLookup;
use crate::profile::{MarkupProfile, ProfileSelectors};
use crate::registry::CitationRegistry;
use crate::render::RenderOptions;
use crate::strategy::{
    AttemptContext, CopyAffordance, DirectScan, ExportInterception, ExtractionStrategy, StrategyKind,
};
use crate::turn::{Turn, is_sufficient};
use crate::{Result, ThreadmarkError};

/// Runs strategies in priority order until one yields a complete exchange.
pub struct Orchestrator {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    registry: CitationRegistry,
    sources: SourceLookup,
    options: RenderOptions,
}

impl Orchestrator {
    /// Build the three standard strategies in `priority` order.
    pub fn new(
        priority: StrategyPriority, profile: &MarkupProfile, settings: ExtractSettings, options: RenderOptions,
    ) -> Result<Self> {
        let selectors = ProfileSelectors::compile(profile)?;
        let strategies = priority
            .kinds()
            .iter()
            .map(|kind| -> Box<dyn ExtractionStrategy> {
                match kind {
                    StrategyKind::DirectScan => Box::new(DirectScan::new(selectors.clone(), settings.clone())),
                    StrategyKind::Export => Box::new(ExportInterception::new(selectors.clone(), settings.clone())),
                    StrategyKind::Copy => Box::new(CopyAffordance::new(selectors.clone(), settings.clone())),
                }
            })
            .collect();
        Ok(Self::with_strategies(strategies, options))
    }

    /// Default profile and settings, style and order from `preferences`.
    pub fn from_preferences(preferences: &Preferences) -> Result<Self> {
        Self::new(
            preferences.strategy_priority,
            &MarkupProfile::default(),
            ExtractSettings::default(),
            RenderOptions::new(preferences.citation_style, preferences.spacing),
        )
    }

    /// Use an explicit strategy list, tried in order.
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>, options: RenderOptions) -> Self {
        Self { strategies, registry: CitationRegistry::new(), sources: SourceLookup::new(), options }
    }

    /// Seed the multi-source lookup, e.g. from a saved export.
    pub fn with_sources(mut self, sources: SourceLookup) -> Self {
        self.sources = sources;
        self
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Citations of the last accepted attempt.
    pub fn registry(&self) -> &CitationRegistry {
        &self.registry
    }

    pub fn sources(&self) -> &SourceLookup {
        &self.sources
    }

    /// Try each strategy in turn. Empty when none produced a complete
    /// exchange.
    pub async fn run(&mut self, host: &mut HostEnv<'_>) -> Vec<Turn> {
        for strategy in &self.strategies {
            let kind = strategy.kind();
            self.registry.reset();
            info!(strategy = %kind, "starting extraction attempt");

            let mut ctx = AttemptContext {
                host: &mut *host,
                registry: &mut self.registry,
                sources: &mut self.sources,
                options: self.options,
            };
            let turns = strategy.extract(&mut ctx).await;

            if is_sufficient(&turns) {
                info!(strategy = %kind, turns = turns.len(), citations = self.registry.len(), "extraction accepted");
                return turns;
            }
            warn!(strategy = %kind, turns = turns.len(), "insufficient result, falling back");
        }

        self.registry.reset();
        warn!("all strategies exhausted");
        Vec::new()
    }

    /// Run the chain and assemble the document.
    ///
    /// # Errors
    ///
    /// [`ThreadmarkError::NoContent`] when every strategy came up short.
    pub async fn export(&mut self, host: &mut HostEnv<'_>, options: &AssembleOptions) -> Result<String> {
        let turns = self.run(host).await;
        if turns.is_empty() {
            return Err(ThreadmarkError::NoContent);
        }
        Ok(assemble(&turns, &self.registry, self.options.style, options))
    }
}
