use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::parser::{RenderSection, SectionKind};

// ── Embedded content detectors ────────────────────────────────────────────────

fn image_re() -> &'static Regex {
    static IMAGE_RE: OnceLock<Regex> = OnceLock::new();
    IMAGE_RE.get_or_init(|| Regex::new(r"!\[.*?\]\((.*?)\)").expect("image regex"))
}

fn csv_re() -> &'static Regex {
    static CSV_RE: OnceLock<Regex> = OnceLock::new();
    CSV_RE.get_or_init(|| Regex::new(r"(?s)```csv\n(.*?)\n```").expect("csv fence regex"))
}

/// Pull markdown images and fenced CSV blocks out of an observation body.
///
/// Sections come back in the order they appear in `observation`.
pub fn extract_sections(observation: &str) -> Vec<RenderSection> {
    let images = image_re().captures_iter(observation).filter_map(|caps| {
        let (whole, url) = (caps.get(0)?, caps.get(1)?);
        Some((whole.start(), SectionKind::Image, url.as_str()))
    });
    let tables = csv_re().captures_iter(observation).filter_map(|caps| {
        let (whole, body) = (caps.get(0)?, caps.get(1)?);
        Some((whole.start(), SectionKind::Table, body.as_str()))
    });

    let mut found: Vec<_> = images.chain(tables).collect();
    found.sort_by_key(|(at, _, _)| *at);
    found
        .into_iter()
        .map(|(_, kind, content)| RenderSection { kind, content: content.to_string() })
        .collect()
}

// ── CSV tables ────────────────────────────────────────────────────────────────

/// A fenced CSV block split into cells. No quoting rules: cells are split on
/// every comma and trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn parse(csv: &str) -> Self {
        let split = |line: &str| line.split(',').map(|c| c.trim().to_string()).collect::<Vec<_>>();
        let mut lines = csv.trim().lines();
        let headers = lines.next().map(split).unwrap_or_default();
        let rows = lines.map(split).collect();
        Self { headers, rows }
    }

    /// Width of the widest row, header included.
    pub fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).chain([self.headers.len()]).max().unwrap_or(0)
    }

    /// Render as aligned plain-text rows separated by ` │ `.
    pub fn to_aligned_lines(&self) -> Vec<String> {
        let mut widths = vec![0usize; self.columns()];
        for row in std::iter::once(&self.headers).chain(&self.rows) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        let fmt_row = |row: &Vec<String>| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| format!("{cell:<w$}", w = widths[i]))
                .collect::<Vec<_>>()
                .join(" │ ")
                .trim_end()
                .to_string()
        };
        let mut out = vec![fmt_row(&self.headers)];
        out.push(widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("─┼─"));
        out.extend(self.rows.iter().map(fmt_row));
        out
    }
}
