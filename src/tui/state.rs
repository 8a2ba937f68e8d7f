use ratatui::layout::Rect;
use std::collections::HashSet;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::parser::{parse, Parsed, StepContainer, StepKind};
use crate::tui::settings::Settings;

// ── Collapse state ────────────────────────────────────────────────────────────

/// Which containers the user has opened or closed, keyed by container id.
///
/// Lives outside the parser: re-parsing a growing transcript yields the same
/// ids for unchanged containers, so the state carries over untouched.
#[derive(Debug, Default, Clone)]
pub struct CollapseState {
    /// Containers whose state differs from the current default.
    flipped: HashSet<String>,
    all_expanded: bool,
}

impl CollapseState {
    pub fn is_collapsed(&self, container: &StepContainer) -> bool {
        let default = container.collapsed_by_default && !self.all_expanded;
        default != self.flipped.contains(&container.id)
    }

    pub fn toggle(&mut self, id: &str) {
        if !self.flipped.remove(id) {
            self.flipped.insert(id.to_string());
        }
    }

    pub fn expand_all(&mut self) {
        self.all_expanded = true;
        self.flipped.clear();
    }

    pub fn collapse_all(&mut self) {
        self.all_expanded = false;
        self.flipped.clear();
    }
}

// ── App state ─────────────────────────────────────────────────────────────────

pub struct App {
    /// Shown in the header; usually the transcript path.
    pub title: String,
    /// The complete transcript; replay re-delivers it chunk by chunk.
    pub transcript: String,
    /// Text delivered so far and fed to the parser.
    pub shown: String,
    pub streaming: bool,
    pub parsed: Parsed,
    pub collapse: CollapseState,
    pub selected: usize,
    pub settings: Settings,
    pub status: String,
    pub status_at: Option<Instant>,
    /// Bumped on every replay start so chunks from a cancelled run are ignored.
    pub replay_generation: u64,
    pub cancel_token: CancellationToken,
    pub scroll: u16,
    /// Stick to the bottom while a replay is streaming in.
    pub follow_tail: bool,
    /// Geometry of the transcript panel, updated every draw.
    pub view_rect: Rect,
    /// Last computed max scroll for the transcript panel.
    pub max_scroll: u16,
    /// Rendered row of each container header, updated every draw.
    pub header_rows: Vec<usize>,
}

impl App {
    pub fn new(title: impl Into<String>, transcript: String, settings: Settings) -> Self {
        let mut collapse = CollapseState::default();
        if settings.expand_all {
            collapse.expand_all();
        }
        let mut app = App {
            title: title.into(),
            shown: transcript.clone(),
            transcript,
            streaming: false,
            parsed: Parsed::default(),
            collapse,
            selected: 0,
            settings,
            status: String::new(),
            status_at: None,
            replay_generation: 0,
            cancel_token: CancellationToken::new(),
            scroll: 0,
            follow_tail: false,
            view_rect: Rect::default(),
            max_scroll: 0,
            header_rows: Vec::new(),
        };
        app.reparse();
        app
    }

    pub fn reparse(&mut self) {
        self.parsed = parse(&self.shown, self.streaming);
        let last = self.parsed.containers.len().saturating_sub(1);
        self.selected = self.selected.min(last);
    }

    /// Clear the view and start streaming the transcript back in.
    /// Returns the generation the replay task must tag its chunks with.
    pub fn start_replay(&mut self) -> u64 {
        self.cancel_token.cancel();
        self.cancel_token = CancellationToken::new();
        self.replay_generation += 1;
        self.shown.clear();
        self.streaming = true;
        self.follow_tail = true;
        self.selected = 0;
        self.reparse();
        self.replay_generation
    }

    pub fn push_chunk(&mut self, generation: u64, chunk: &str) {
        if generation != self.replay_generation || !self.streaming {
            return;
        }
        self.shown.push_str(chunk);
        self.reparse();
        if self.follow_tail {
            self.selected = self.parsed.containers.len().saturating_sub(1);
        }
    }

    pub fn finish_replay(&mut self, generation: u64) {
        if generation != self.replay_generation {
            return;
        }
        self.streaming = false;
        self.reparse();
        self.set_status("Replay finished");
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.status_at = Some(Instant::now());
    }

    pub fn selected_container(&self) -> Option<&StepContainer> {
        self.parsed.containers.get(self.selected)
    }

    pub fn select_next(&mut self) {
        let last = self.parsed.containers.len().saturating_sub(1);
        self.selected = (self.selected + 1).min(last);
        self.follow_tail = false;
        self.ensure_selected_visible();
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.follow_tail = false;
        self.ensure_selected_visible();
    }

    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_container().map(|c| c.id.clone()) {
            self.collapse.toggle(&id);
        }
    }

    /// Text of the selected container, steps separated by blank lines.
    /// Planning placeholders are skipped.
    pub fn selected_text(&self) -> Option<String> {
        let container = self.selected_container()?;
        let parts: Vec<&str> = container
            .steps
            .iter()
            .filter(|s| s.kind != StepKind::Planning)
            .map(|s| s.text.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.follow_tail = false;
        let next = (self.scroll as i32 + delta).clamp(0, self.max_scroll as i32);
        self.scroll = next as u16;
    }

    /// Move the scroll offset so the selected header row is on screen.
    pub fn ensure_selected_visible(&mut self) {
        let Some(&row) = self.header_rows.get(self.selected) else {
            return;
        };
        let height = self.view_rect.height.saturating_sub(2) as usize;
        if height == 0 {
            return;
        }
        let top = self.scroll as usize;
        if row < top {
            self.scroll = row as u16;
        } else if row >= top + height {
            self.scroll = (row + 1 - height) as u16;
        }
    }
}
