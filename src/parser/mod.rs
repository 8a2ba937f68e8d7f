pub mod assemble;
pub mod embedded;
pub mod normalize;
pub mod segment;

use serde::Serialize;

pub use assemble::{assemble, Assembly};
pub use embedded::{extract_sections, CsvTable};
pub use normalize::{has_agent_tags, normalize, tag_balance, TagBalance};
pub use segment::segment;

// ── Tag vocabulary ────────────────────────────────────────────────────────────

/// The four delimiters an agent wraps its output in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Think,
    Execute,
    Observation,
    Solution,
}

impl Tag {
    pub const ALL: [Tag; 4] = [Tag::Think, Tag::Execute, Tag::Observation, Tag::Solution];

    pub fn open(self) -> &'static str {
        match self {
            Tag::Think       => "<think>",
            Tag::Execute     => "<execute>",
            Tag::Observation => "<observation>",
            Tag::Solution    => "<solution>",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Tag::Think       => "</think>",
            Tag::Execute     => "</execute>",
            Tag::Observation => "</observation>",
            Tag::Solution    => "</solution>",
        }
    }

    pub fn span_kind(self) -> SpanKind {
        match self {
            Tag::Think       => SpanKind::Reasoning,
            Tag::Execute     => SpanKind::Executing,
            Tag::Observation => SpanKind::Observation,
            Tag::Solution    => SpanKind::Answer,
        }
    }
}

/// Marker the agent prints when it shows a generated picture.
pub const PICTURE_MARKER: &str = "picture showing:";
/// Optional icon in front of [`PICTURE_MARKER`].
pub const PICTURE_ICON: &str = "📷";
/// Body of the synthetic step inserted after every observation.
pub const PLANNING_TEXT: &str = "Planning the next step...";

// ── Spans ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    Reasoning,
    Executing,
    Observation,
    Answer,
    Picture,
    Untagged,
}

/// One classified slice of the transcript, in narrative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub kind: SpanKind,
    pub text: String,
    /// False only for a streamed tag whose close delimiter has not arrived.
    pub complete: bool,
}

impl Span {
    pub fn new(kind: SpanKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into(), complete: true }
    }

    pub fn incomplete(kind: SpanKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into(), complete: false }
    }
}

// ── Steps and containers ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Reasoning,
    Executing,
    Observation,
    Answer,
    Planning,
    Picture,
}

impl StepKind {
    /// Suffix used in step ids, e.g. `step-3-observation`.
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Reasoning   => "reasoning",
            StepKind::Executing   => "executing",
            StepKind::Observation => "observation",
            StepKind::Answer      => "answer",
            StepKind::Planning    => "planning",
            StepKind::Picture     => "picture",
        }
    }
}

impl From<SpanKind> for StepKind {
    fn from(kind: SpanKind) -> Self {
        match kind {
            SpanKind::Reasoning | SpanKind::Untagged => StepKind::Reasoning,
            SpanKind::Executing   => StepKind::Executing,
            SpanKind::Observation => StepKind::Observation,
            SpanKind::Answer      => StepKind::Answer,
            SpanKind::Picture     => StepKind::Picture,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: String,
    pub kind: StepKind,
    pub text: String,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepContainer {
    pub id: String,
    pub steps: Vec<Step>,
    pub collapsed_by_default: bool,
}

impl StepContainer {
    /// Kind of the first step; drives the container's header label.
    pub fn lead_kind(&self) -> Option<StepKind> {
        self.steps.first().map(|s| s.kind)
    }
}

// ── Render sections ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Image,
    Table,
}

/// Image or table lifted out of an observation and shown after the containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderSection {
    pub kind: SectionKind,
    pub content: String,
}

impl RenderSection {
    /// Parsed rows for a table section; `None` for images.
    pub fn table(&self) -> Option<CsvTable> {
        match self.kind {
            SectionKind::Table => Some(CsvTable::parse(&self.content)),
            SectionKind::Image => None,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Everything one parse call produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Parsed {
    pub containers: Vec<StepContainer>,
    pub sections: Vec<RenderSection>,
}

impl Parsed {
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.sections.is_empty()
    }

    pub fn step_count(&self) -> usize {
        self.containers.iter().map(|c| c.steps.len()).sum()
    }
}

/// Normalize, segment and assemble `text`.
///
/// Pure and total: the same input always yields the same containers, ids
/// included, so callers can key UI state by container id across re-parses of
/// a growing stream.
pub fn parse(text: &str, is_streaming: bool) -> Parsed {
    let normalized = normalize(text, is_streaming);
    let spans = segment(&normalized, is_streaming);
    let Assembly { mut containers, sections } = assemble(&spans);

    if containers.is_empty() && !text.trim().is_empty() {
        // Nothing recognisable survived segmentation; show the raw text.
        containers.push(assemble::reasoning_fallback(text.trim()));
    }

    tracing::debug!(
        spans = spans.len(),
        containers = containers.len(),
        sections = sections.len(),
        is_streaming,
        "parsed transcript"
    );
    Parsed { containers, sections }
}
