pub mod logging;
pub mod parser;
pub mod tui;

pub use parser::{
    parse, Parsed, RenderSection, SectionKind, Span, SpanKind, Step, StepContainer, StepKind,
};
pub use tui::{render_to_buffer, App, CollapseState, Settings};

use anyhow::{bail, Context, Result};
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

/// Read a transcript from a file, or from stdin when the path is `-`.
pub fn read_transcript(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read transcript from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript at {}", path.display()))
}

/// First line of `text`, cut to `max` characters.
fn preview(text: &str, max: usize) -> String {
    let first = text.lines().next().unwrap_or("");
    let mut out: String = first.chars().take(max).collect();
    if first.chars().count() > max || text.lines().nth(1).is_some() {
        out.push('…');
    }
    out
}

pub fn normalize_report(text: &str, streaming: bool) -> String {
    parser::normalize(text, streaming).into_owned()
}

/// One line per span: kind, completeness, preview.
pub fn spans_report(text: &str, streaming: bool) -> String {
    let normalized = parser::normalize(text, streaming);
    let mut out = String::new();
    for (i, span) in parser::segment(&normalized, streaming).iter().enumerate() {
        let kind = format!("{:?}", span.kind).to_lowercase();
        let flag = if span.complete { "" } else { " (incomplete)" };
        let _ = writeln!(out, "{i:>3}  {kind:<11}{flag}  {}", preview(&span.text, 60));
    }
    out
}

/// Containers then sections, as indented text or as JSON.
pub fn parse_report(text: &str, streaming: bool, json: bool) -> Result<String> {
    let parsed = parse(text, streaming);
    if json {
        return serde_json::to_string_pretty(&parsed).context("Failed to encode parse result");
    }
    if parsed.is_empty() {
        return Ok("No content available\n".to_string());
    }
    let mut out = String::new();
    for container in &parsed.containers {
        let _ = writeln!(out, "[{}]", container.id);
        for step in &container.steps {
            let flag = if step.complete { "" } else { " (incomplete)" };
            let _ = writeln!(out, "  {} {}{flag}", step.id, step.kind.as_str());
            for line in step.text.lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    for (i, section) in parsed.sections.iter().enumerate() {
        let kind = format!("{:?}", section.kind).to_lowercase();
        let _ = writeln!(out, "<{kind} {i}> {}", preview(&section.content, 60));
    }
    Ok(out)
}

/// Per-tag delimiter counts, plus a note when no tag opens at all.
/// Unbalanced tags are an error unless the transcript is a stream still in
/// progress.
pub fn check(text: &str, streaming: bool) -> Result<String> {
    let balance = parser::tag_balance(text);
    let mut out = String::new();
    for b in &balance {
        let mark = if b.is_balanced() { "ok" } else { "UNBALANCED" };
        let _ = writeln!(out, "{:<12} open {:>3}  close {:>3}  {mark}", b.name(), b.opens, b.closes);
    }
    if !parser::has_agent_tags(text) {
        out.push_str("no agent tags: the whole transcript renders as one reasoning step\n");
    }
    let unbalanced: Vec<&str> = balance.iter().filter(|b| !b.is_balanced()).map(|b| b.name()).collect();
    if !unbalanced.is_empty() && !streaming {
        bail!("{out}Unbalanced tags: {}", unbalanced.join(", "));
    }
    Ok(out)
}

/// Every CSV table found in observations, as aligned text.
pub fn tables_report(text: &str, streaming: bool) -> String {
    let parsed = parse(text, streaming);
    let mut out = String::new();
    for (i, table) in parsed.sections.iter().filter_map(RenderSection::table).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "table {} ({} rows)", i + 1, table.rows.len());
        for row in table.to_aligned_lines() {
            let _ = writeln!(out, "{row}");
        }
    }
    if out.is_empty() {
        out.push_str("No tables found\n");
    }
    out
}
