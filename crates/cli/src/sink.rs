//! Where the finished document goes.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use threadmark_core::OutputMethod;

pub trait OutputSink {
    fn write(&mut self, document: &str) -> anyhow::Result<()>;

    /// Human-readable destination for status messages.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl OutputSink for FileSink {
    fn write(&mut self, document: &str) -> anyhow::Result<()> {
        fs::write(&self.path, document).with_context(|| format!("Failed to write to file: {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write(&mut self, document: &str) -> anyhow::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(document.as_bytes()).context("Failed to write to stdout")?;
        stdout.flush().context("Failed to write to stdout")
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

/// An explicit path always wins; otherwise the stored output method decides,
/// naming the file after the title.
pub fn open_sink(method: OutputMethod, path: Option<PathBuf>, title: Option<&str>) -> Box<dyn OutputSink> {
    match (path, method) {
        (Some(path), _) => Box::new(FileSink::new(path)),
        (None, OutputMethod::File) => Box::new(FileSink::new(PathBuf::from(default_file_name(title)))),
        (None, OutputMethod::Stdout) => Box::new(StdoutSink),
    }
}

/// `My Thread: Part 2` → `my-thread-part-2.md`
pub fn default_file_name(title: Option<&str>) -> String {
    let slug = title
        .unwrap_or_default()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() { "thread.md".to_string() } else { format!("{}.md", slug) }
}
