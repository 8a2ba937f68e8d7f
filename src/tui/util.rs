use crate::parser::{SectionKind, StepContainer, StepKind};

// ── Labels ────────────────────────────────────────────────────────────────────

/// Icon and header label for a step kind.
pub fn step_label(kind: StepKind) -> (&'static str, &'static str) {
    match kind {
        StepKind::Reasoning   => ("🤔", "Reasoning..."),
        StepKind::Executing   => ("🛠", "Executing code..."),
        StepKind::Observation => ("📊", "Observation"),
        StepKind::Answer      => ("✅", "Answer"),
        StepKind::Planning    => ("⏳", "Planning the next step..."),
        StepKind::Picture     => ("📷", "Picture showing"),
    }
}

pub fn section_label(kind: SectionKind) -> (&'static str, &'static str) {
    match kind {
        SectionKind::Image => ("🖼", "Image Preview"),
        SectionKind::Table => ("📈", "Table Preview"),
    }
}

/// A container is labelled after its first step.
pub fn container_label(container: &StepContainer) -> (&'static str, &'static str) {
    container.lead_kind().map(step_label).unwrap_or(("", ""))
}

/// Body lines for a step as the viewer shows them; code gets a python fence.
pub fn step_body(kind: StepKind, text: &str) -> Vec<String> {
    match kind {
        StepKind::Executing => std::iter::once("```python".to_string())
            .chain(text.lines().map(str::to_string))
            .chain(std::iter::once("```".to_string()))
            .collect(),
        _ => text.lines().map(str::to_string).collect(),
    }
}
