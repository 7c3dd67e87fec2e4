pub mod annotate;
pub mod assemble;
pub mod capture;
pub mod config;
pub mod error;
pub mod host;
pub mod lookup;
pub mod orchestrator;
pub mod parse;
pub mod profile;
pub mod registry;
pub mod render;
pub mod strategy;
pub mod style;
pub mod turn;

pub use annotate::annotate_markers;
pub use assemble::{AssembleOptions, assemble};
pub use capture::{CaptureScope, decode_payload};
pub use config::{
    ExtractSettings, ExtractSettingsBuilder, OutputMethod, Preferences, StrategyPriority, default_preferences_path,
    load_preferences,
};
pub use error::{Result, ThreadmarkError};
pub use host::{
    CaptureBridge, CitationUrlResolver, Clipboard, ClipboardError, FocusPrompt, HostEnv, HostPage, MarkerContext,
    NoInternalState, PageSnapshot, ScrollMetrics,
};
pub use lookup::SourceLookup;
pub use orchestrator::Orchestrator;
pub use parse::Document;
pub use profile::{MarkupProfile, ProfileSelectors};
pub use registry::{Citation, CitationRegistry, canonicalize};
pub use render::{PrerenderedRenderer, RenderOptions, StructuredRenderer, apply_spacing, reindent_list_continuations};
pub use strategy::{
    AttemptContext, CopyAffordance, DirectScan, ExportInterception, ExtractionStrategy, StrategyKind, parse_export,
    render_export,
};
pub use style::{CitationStyle, CitedSource, Spacing, domain_label};
pub use turn::{Role, Turn, fingerprint, is_sufficient, merge_adjacent};
