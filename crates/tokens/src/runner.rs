use crate::discover::discover_templates;
use crate::error::{Error, Result};
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokens_match::{MatchReport, TemplateMatcher, Tokenizer};

/// One text to extract from.
#[derive(Debug, Clone)]
pub struct Input {
    /// File path, or "<stdin>".
    pub label: String,
    pub content: String,
}

#[derive(Debug)]
pub struct InputResult {
    pub label: String,
    /// The matcher error message when a template failed the run.
    pub report: std::result::Result<MatchReport, String>,
    pub elapsed: Duration,
}

impl InputResult {
    pub fn matched(&self) -> bool {
        matches!(&self.report, Ok(report) if report.best().is_some())
    }
}

/// Compiles every template under `root` into a matcher.
pub fn load_templates(root: &Path, tokenizer: &Tokenizer) -> Result<TemplateMatcher> {
    let mut matcher = TemplateMatcher::new();
    for path in discover_templates(root)? {
        let template = tokenizer
            .compile_file(&path)
            .map_err(|source| Error::LoadTemplate {
                path: path.clone(),
                source,
            })?;
        log::info!(
            "loaded template {} from {}",
            template.name.as_deref().unwrap_or("<unnamed>"),
            path.display()
        );
        matcher.add(template);
    }
    Ok(matcher)
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Reads `paths`, or stdin when there are none.
pub fn read_inputs(paths: &[PathBuf], strip_ansi: bool) -> Result<Vec<Input>> {
    let stdin = [PathBuf::from("-")];
    let paths = if paths.is_empty() { &stdin[..] } else { paths };

    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        let (label, content) = if is_stdin(path) {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            ("<stdin>".to_string(), content)
        } else {
            let content = std::fs::read_to_string(path).map_err(|source| Error::ReadInput {
                path: path.clone(),
                source,
            })?;
            (path.display().to_string(), content)
        };
        let content = if strip_ansi {
            String::from_utf8_lossy(&strip_ansi_escapes::strip(content.as_bytes())).into_owned()
        } else {
            content
        };
        inputs.push(Input { label, content });
    }
    Ok(inputs)
}

pub fn run_input(matcher: &TemplateMatcher, input: &Input, tags: &[String]) -> InputResult {
    let start = Instant::now();
    let report = matcher
        .match_input(&input.content, tags)
        .map_err(|e| e.to_string());
    if let Err(message) = &report {
        log::warn!("{}: {}", input.label, message);
    }
    InputResult {
        label: input.label.clone(),
        report,
        elapsed: start.elapsed(),
    }
}

/// Runs every input through the matcher, in parallel unless `sequential`.
/// Results keep the input order.
pub fn run_inputs(
    matcher: &TemplateMatcher,
    inputs: &[Input],
    tags: &[String],
    sequential: bool,
) -> Vec<InputResult> {
    if sequential || inputs.len() == 1 {
        inputs
            .iter()
            .map(|input| run_input(matcher, input, tags))
            .collect()
    } else {
        inputs
            .par_iter()
            .map(|input| run_input(matcher, input, tags))
            .collect()
    }
}
