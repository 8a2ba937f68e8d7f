use anyhow::{Context, Result};
use arboard::Clipboard;
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::Duration};
use tokio::sync::mpsc;

use crate::tui::draw::draw;
use crate::tui::replay::{replay, ReplayEvent, ReplayRequest};
use crate::tui::state::App;

/// What the event loop must do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    Copy,
    Replay,
}

// ── Entry point ───────────────────────────────────────────────────────────────

pub async fn run(mut app: App, start_replay: bool) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, start_replay).await;
    app.cancel_token.cancel();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    result
}

fn spawn_replay(app: &mut App, tx: &mpsc::UnboundedSender<ReplayEvent>) {
    let generation = app.start_replay();
    let req = ReplayRequest {
        generation,
        transcript: app.transcript.clone(),
        chunk_chars: app.settings.replay_chunk_chars,
        interval: Duration::from_millis(app.settings.replay_interval_ms),
        tx: tx.clone(),
        cancel: app.cancel_token.clone(),
    };
    tokio::spawn(async move {
        if let Err(e) = replay(req).await {
            tracing::warn!(error = %e, "replay task failed");
        }
    });
}

// ── Event loop ────────────────────────────────────────────────────────────────

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    start_replay: bool,
) -> Result<()> {
    let mut event_stream = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(50));
    let (replay_tx, mut replay_rx) = mpsc::unbounded_channel::<ReplayEvent>();

    if start_replay {
        spawn_replay(app, &replay_tx);
    }

    loop {
        terminal.draw(|f| draw(f, app))?;

        tokio::select! {
            // 50 ms tick — redraws and clears timed status messages
            _ = tick.tick() => {
                if let Some(at) = app.status_at {
                    if at.elapsed() >= Duration::from_secs(3) {
                        app.status.clear();
                        app.status_at = None;
                    }
                }
            }

            Some(event) = replay_rx.recv() => {
                match event {
                    ReplayEvent::Chunk { generation, text } => app.push_chunk(generation, &text),
                    ReplayEvent::Done { generation } => app.finish_replay(generation),
                }
            }

            Some(Ok(event)) = event_stream.next() => {
                match event {
                    Event::Mouse(mouse) => match mouse.kind {
                        MouseEventKind::ScrollUp => app.scroll_by(-3),
                        MouseEventKind::ScrollDown => app.scroll_by(3),
                        _ => {}
                    },
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match handle_key(app, key) {
                            KeyAction::Quit => return Ok(()),
                            KeyAction::Copy => copy_selected(app),
                            KeyAction::Replay => spawn_replay(app, &replay_tx),
                            KeyAction::None => {}
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Apply a key press to the viewer state.
pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyAction {
    let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
    if ctrl_c {
        return KeyAction::Quit;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Char('e') => app.collapse.expand_all(),
        KeyCode::Char('c') => app.collapse.collapse_all(),
        KeyCode::PageUp => app.scroll_by(-(app.view_rect.height as i32)),
        KeyCode::PageDown => app.scroll_by(app.view_rect.height as i32),
        KeyCode::End | KeyCode::Char('G') => {
            app.follow_tail = true;
            app.selected = app.parsed.containers.len().saturating_sub(1);
        }
        KeyCode::Char('y') => return KeyAction::Copy,
        KeyCode::Char('r') => return KeyAction::Replay,
        _ => {}
    }
    KeyAction::None
}

fn copy_selected(app: &mut App) {
    let Some(text) = app.selected_text() else {
        app.set_status("Nothing to copy");
        return;
    };
    match Clipboard::new().and_then(|mut cb| cb.set_text(text)) {
        Ok(()) => app.set_status("📋 Copied to clipboard"),
        Err(e) => {
            tracing::warn!(error = %e, "clipboard unavailable");
            app.set_status(format!("Clipboard unavailable: {e}"));
        }
    }
}
