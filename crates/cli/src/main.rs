use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use threadmark_core::host::{NoClipboard, NoInternalState, ReplayCapture, SilentPrompt, StaticPage};
use threadmark_core::{
    AssembleOptions, CitationRegistry, CitationStyle, ExtractSettings, HostEnv, MarkupProfile, Orchestrator,
    OutputMethod, Preferences, RenderOptions, SourceLookup, Spacing, StrategyPriority, ThreadmarkError,
    default_preferences_path, load_preferences, parse_export, render_export,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod echo;
mod sink;

use echo::{format_size, print_banner, print_detail, print_info, print_step, print_success, print_timing, print_warning};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Turn a saved conversation page or export into citation-consistent Markdown
#[derive(Parser, Debug)]
#[command(name = "threadmark")]
#[command(author = "Threadmark Contributors")]
#[command(version)]
#[command(about = "Export conversation threads to Markdown with consistent citations", long_about = None)]
struct Args {
    /// Saved page snapshot (HTML), exported Markdown with --export, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Treat INPUT as a Markdown export payload instead of a page snapshot
    #[arg(long)]
    export: bool,

    /// The export payload is a deep-research report
    #[arg(long, requires = "export")]
    research: bool,

    /// Saved export payload served to the export strategy
    #[arg(long, value_name = "FILE", conflicts_with = "export")]
    capture: Option<PathBuf>,

    /// Citation style (endnotes, footnotes, inline, parenthesized, named, none)
    #[arg(short, long, value_name = "STYLE")]
    style: Option<CitationStyle>,

    /// Blank-line policy (standard, compact)
    #[arg(long, value_name = "SPACING")]
    spacing: Option<Spacing>,

    /// Strategy order, e.g. "direct,export,copy"
    #[arg(long, value_name = "ORDER")]
    priority: Option<StrategyPriority>,

    /// Document title, written as an H1 heading
    #[arg(long)]
    title: Option<String>,

    /// Include TOML frontmatter
    #[arg(long)]
    frontmatter: bool,

    /// Write turns without User/Assistant headings
    #[arg(long)]
    no_role_headings: bool,

    /// Output file (default: stdout, or the stored preference)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Preferences file (default: <config dir>/threadmark/preferences.json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Markup profile JSON overriding the default selectors
    #[arg(long, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("threadmark=debug,threadmark_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Preferences from `--config`, else the default location, else built-in
/// defaults writing to stdout.
fn resolve_preferences(config: Option<&Path>) -> anyhow::Result<Preferences> {
    if let Some(path) = config {
        return load_preferences(path).with_context(|| format!("Failed to load preferences: {}", path.display()));
    }

    let fallback = Preferences { output: OutputMethod::Stdout, ..Default::default() };
    let Some(path) = default_preferences_path() else {
        debug!("no config directory; using built-in preferences");
        return Ok(fallback);
    };
    match load_preferences(&path) {
        Ok(preferences) => {
            debug!(path = %path.display(), "loaded preferences");
            Ok(preferences)
        }
        Err(ThreadmarkError::FileNotFound(_)) => {
            debug!(path = %path.display(), "no preferences file; using built-in preferences");
            Ok(fallback)
        }
        Err(e) => {
            print_warning(&format!("Ignoring {}: {}", path.display(), e));
            Ok(fallback)
        }
    }
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read file: {}", input))
    }
}

/// A saved snapshot is fully mounted, so no pause is needed anywhere.
fn offline_settings() -> ExtractSettings {
    ExtractSettings::builder()
        .settle_delay(Duration::ZERO)
        .focus_poll_interval(Duration::ZERO)
        .capture_timeout(Duration::ZERO)
        .idle_steps(1)
        .build()
}

async fn extract_snapshot(
    html: String, args: &Args, preferences: &Preferences, options: RenderOptions, assemble_options: &AssembleOptions,
) -> anyhow::Result<String> {
    let profile = match &args.profile {
        Some(path) => {
            let json =
                fs::read_to_string(path).with_context(|| format!("Failed to read profile: {}", path.display()))?;
            MarkupProfile::from_json(&json).context("Invalid markup profile")?
        }
        None => MarkupProfile::default(),
    };

    let payload = args
        .capture
        .as_ref()
        .map(|path| fs::read_to_string(path).with_context(|| format!("Failed to read capture: {}", path.display())))
        .transpose()?;

    let mut sources = SourceLookup::new();
    if let Some(payload) = &payload {
        parse_export(payload, args.research, options, &mut CitationRegistry::new(), &mut sources);
    }

    let mut orchestrator = Orchestrator::new(preferences.strategy_priority, &profile, offline_settings(), options)
        .context("Failed to build extraction strategies")?
        .with_sources(sources);

    let mut page = StaticPage::new(html);
    let mut clipboard = NoClipboard;
    let mut capture = ReplayCapture::new(payload);
    let mut prompt = SilentPrompt;
    let mut host = HostEnv {
        page: &mut page,
        resolver: &NoInternalState,
        clipboard: &mut clipboard,
        capture: &mut capture,
        prompt: &mut prompt,
    };

    let document = orchestrator
        .export(&mut host, assemble_options)
        .await
        .context("no content found")?;

    if args.verbose {
        print_detail("Citations", &orchestrator.registry().len().to_string());
    }
    Ok(document)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let mut preferences = resolve_preferences(args.config.as_deref())?;
    if let Some(style) = args.style {
        preferences.citation_style = style;
    }
    if let Some(spacing) = args.spacing {
        preferences.spacing = spacing;
    }
    if let Some(priority) = args.priority {
        preferences.strategy_priority = priority;
    }
    if args.no_role_headings {
        preferences.role_headings = false;
    }

    if args.verbose {
        let source = if args.input == "-" { "stdin".to_string() } else { args.input.bright_white().to_string() };
        print_step(1, 3, &format!("Reading from {}", source));
    }
    let input = read_input(&args.input)?;
    if args.verbose {
        print_detail("Size", &format_size(input.len()));
        eprintln!();
    }

    let options = RenderOptions::new(preferences.citation_style, preferences.spacing);
    let assemble_options = AssembleOptions {
        title: args.title.clone(),
        role_headings: preferences.role_headings,
        frontmatter: args.frontmatter,
    };

    let started = Instant::now();
    let document = if args.export {
        if args.verbose {
            print_step(2, 3, "Rendering export payload");
        }
        render_export(&input, args.research, options, &assemble_options).context("no content found")?
    } else {
        if args.verbose {
            print_step(2, 3, &format!("Extracting with priority {}", preferences.strategy_priority));
        }
        extract_snapshot(input, &args, &preferences, options, &assemble_options).await?
    };

    if args.verbose {
        print_detail("Style", &preferences.citation_style.to_string());
        print_timing("Render", started.elapsed());
        eprintln!();
        print_step(3, 3, "Writing output");
    }

    let mut sink = sink::open_sink(preferences.output, args.output.clone(), args.title.as_deref());
    debug!(sink = %sink.describe(), bytes = document.len(), "writing document");
    sink.write(&document)?;

    if args.output.is_some() || preferences.output == OutputMethod::File {
        print_success(&format!("Output written to {}", sink.describe().bright_white()));
    }

    Ok(())
}
