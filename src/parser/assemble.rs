use std::collections::HashMap;

use crate::parser::{
    extract_sections, RenderSection, Span, SpanKind, Step, StepContainer, StepKind, PLANNING_TEXT,
};

// ── Step assembler ────────────────────────────────────────────────────────────

/// Containers plus the side-channel render sections.
#[derive(Debug, Default)]
pub struct Assembly {
    pub containers: Vec<StepContainer>,
    pub sections: Vec<RenderSection>,
}

/// Group spans into step containers in one pass.
///
/// Pending steps are flushed into a container at a picture (before it), at an
/// observation (after it, followed by a planning container) and at the end.
pub fn assemble(spans: &[Span]) -> Assembly {
    let mut builder = Builder::default();
    for span in spans {
        match span.kind {
            SpanKind::Picture => {
                builder.flush();
                builder.push(StepKind::Picture, &span.text, true);
                builder.flush();
            }
            SpanKind::Observation => {
                builder.sections.extend(extract_sections(&span.text));
                builder.push(StepKind::Observation, &span.text, span.complete);
                builder.flush();
                builder.push(StepKind::Planning, PLANNING_TEXT, true);
                builder.flush();
            }
            SpanKind::Reasoning | SpanKind::Executing | SpanKind::Answer | SpanKind::Untagged => {
                builder.push(span.kind.into(), &span.text, span.complete);
            }
        }
    }
    builder.flush();
    Assembly { containers: builder.containers, sections: builder.sections }
}

/// Single reasoning container for text nothing else could classify.
pub fn reasoning_fallback(text: &str) -> StepContainer {
    StepContainer {
        id: container_id(0),
        steps: vec![Step {
            id: step_id(0, StepKind::Reasoning, 1),
            kind: StepKind::Reasoning,
            text: text.to_string(),
            complete: true,
        }],
        collapsed_by_default: true,
    }
}

#[derive(Default)]
struct Builder {
    containers: Vec<StepContainer>,
    sections: Vec<RenderSection>,
    pending: Vec<Step>,
    /// Occurrences of each kind in `pending`, for id suffixes.
    seen: HashMap<StepKind, usize>,
}

impl Builder {
    fn index(&self) -> usize {
        self.containers.len()
    }

    fn push(&mut self, kind: StepKind, text: &str, complete: bool) {
        let n = self.seen.entry(kind).or_insert(0);
        *n += 1;
        let occurrence = *n;
        self.pending.push(Step {
            id: step_id(self.index(), kind, occurrence),
            kind,
            text: text.to_string(),
            complete,
        });
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let id = container_id(self.index());
        self.containers.push(StepContainer {
            id,
            steps: std::mem::take(&mut self.pending),
            collapsed_by_default: true,
        });
        self.seen.clear();
    }
}

// ── Ids ───────────────────────────────────────────────────────────────────────

pub fn container_id(index: usize) -> String {
    format!("step-{index}")
}

/// `step-{index}-{kind}`, with `-{n}` appended for the n-th repeat of a kind.
pub fn step_id(index: usize, kind: StepKind, occurrence: usize) -> String {
    if occurrence <= 1 {
        format!("step-{index}-{}", kind.as_str())
    } else {
        format!("step-{index}-{}-{occurrence}", kind.as_str())
    }
}
