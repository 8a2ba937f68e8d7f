use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use stepview::parser::StepKind;
use stepview::tui::{chunk_transcript, handle_key, render_to_buffer, App, KeyAction, ReplayEvent, Settings};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const TRANSCRIPT: &str = "<think>Check the file</think>
<execute>print(open('a.txt').read())</execute>
<observation>hello
![chart](https://example.com/chart.png)</observation>
<solution>The file says hello</solution>";

// ── helpers ───────────────────────────────────────────────────────────────────

fn app(text: &str) -> App {
    App::new("test.txt", text.to_string(), Settings::default())
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// Collect all visible characters from a buffer row into a String.
fn buffer_row(buf: &ratatui::buffer::Buffer, row: u16) -> String {
    let width = buf.area().width;
    (0..width).map(|col| buf[(col, row)].symbol().chars().next().unwrap_or(' ')).collect()
}

fn buffer_text(buf: &ratatui::buffer::Buffer) -> String {
    let height = buf.area().height;
    (0..height).map(|r| buffer_row(buf, r)).collect::<Vec<_>>().join("\n")
}

fn replay_all(app: &mut App) {
    let generation = app.start_replay();
    for chunk in chunk_transcript(&app.transcript.clone(), 5) {
        app.push_chunk(generation, &chunk);
    }
    app.finish_replay(generation);
}

// ── rendering ─────────────────────────────────────────────────────────────────

#[test]
fn empty_transcript_shows_placeholder() {
    let mut app = app("");
    let text = buffer_text(&render_to_buffer(&mut app, 80, 20));
    assert!(text.contains("No content available"));
}

#[test]
fn collapsed_containers_show_only_headers() {
    let mut app = app(TRANSCRIPT);
    let text = buffer_text(&render_to_buffer(&mut app, 100, 30));
    assert!(text.contains("Reasoning..."));
    assert!(text.contains("Planning the next step..."));
    assert!(text.contains("Answer"));
    assert!(!text.contains("Check the file"));
    // sections render after the containers even when everything is collapsed
    assert!(text.contains("Image Preview"));
    assert!(text.contains("https://example.com/chart.png"));
}

#[test]
fn expanding_shows_step_bodies_and_code_fence() {
    let mut app = app(TRANSCRIPT);
    app.toggle_selected();
    let text = buffer_text(&render_to_buffer(&mut app, 100, 30));
    assert!(text.contains("Check the file"));
    assert!(text.contains("```python"));
    assert!(text.contains("print(open('a.txt').read())"));
}

#[test]
fn table_section_renders_cells() {
    let mut app = app("<observation>```csv\nName,Age,City\nJohn,25,New York\n```</observation>");
    let text = buffer_text(&render_to_buffer(&mut app, 100, 20));
    assert!(text.contains("Table Preview"));
    assert!(text.contains("Name │ Age │ City"));
    assert!(text.contains("John │ 25  │ New York"));
}

#[test]
fn header_rows_are_recorded_per_container() {
    let mut app = app(TRANSCRIPT);
    render_to_buffer(&mut app, 100, 30);
    assert_eq!(app.header_rows.len(), app.parsed.containers.len());
    assert!(app.header_rows.windows(2).all(|w| w[0] < w[1]));
}

// ── keys ──────────────────────────────────────────────────────────────────────

#[test]
fn arrow_keys_move_selection_within_bounds() {
    let mut app = app(TRANSCRIPT);
    assert_eq!(handle_key(&mut app, key(KeyCode::Up)), KeyAction::None);
    assert_eq!(app.selected, 0);
    for _ in 0..10 {
        handle_key(&mut app, key(KeyCode::Char('j')));
    }
    assert_eq!(app.selected, app.parsed.containers.len() - 1);
    handle_key(&mut app, key(KeyCode::Char('k')));
    assert_eq!(app.selected, app.parsed.containers.len() - 2);
}

#[test]
fn enter_toggles_selected_container() {
    let mut app = app(TRANSCRIPT);
    let first = app.parsed.containers[0].clone();
    assert!(app.collapse.is_collapsed(&first));
    handle_key(&mut app, key(KeyCode::Enter));
    assert!(!app.collapse.is_collapsed(&first));
    handle_key(&mut app, key(KeyCode::Char(' ')));
    assert!(app.collapse.is_collapsed(&first));
}

#[test]
fn expand_and_collapse_all() {
    let mut app = app(TRANSCRIPT);
    handle_key(&mut app, key(KeyCode::Char('e')));
    assert!(app.parsed.containers.iter().all(|c| !app.collapse.is_collapsed(c)));
    handle_key(&mut app, key(KeyCode::Enter));
    assert!(app.collapse.is_collapsed(&app.parsed.containers[0]));
    handle_key(&mut app, key(KeyCode::Char('c')));
    assert!(app.parsed.containers.iter().all(|c| app.collapse.is_collapsed(c)));
}

#[test]
fn action_keys() {
    let mut app = app(TRANSCRIPT);
    assert_eq!(handle_key(&mut app, key(KeyCode::Char('q'))), KeyAction::Quit);
    assert_eq!(handle_key(&mut app, key(KeyCode::Esc)), KeyAction::Quit);
    assert_eq!(
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        KeyAction::Quit
    );
    assert_eq!(handle_key(&mut app, key(KeyCode::Char('y'))), KeyAction::Copy);
    assert_eq!(handle_key(&mut app, key(KeyCode::Char('r'))), KeyAction::Replay);
}

#[test]
fn expand_all_setting_opens_everything() {
    let settings = Settings { expand_all: true, ..Settings::default() };
    let app = App::new("t", TRANSCRIPT.to_string(), settings);
    assert!(app.parsed.containers.iter().all(|c| !app.collapse.is_collapsed(c)));
}

// ── selection text ────────────────────────────────────────────────────────────

#[test]
fn selected_text_joins_steps() {
    let app = app(TRANSCRIPT);
    let text = app.selected_text().unwrap();
    assert!(text.starts_with("Check the file\n\nprint("));
}

#[test]
fn planning_container_has_nothing_to_copy() {
    let mut app = app(TRANSCRIPT);
    app.select_next();
    assert_eq!(app.selected_container().unwrap().steps[0].kind, StepKind::Planning);
    assert_eq!(app.selected_text(), None);
}

// ── replay ────────────────────────────────────────────────────────────────────

#[test]
fn replay_ends_with_the_same_parse() {
    let mut app = app(TRANSCRIPT);
    let before = app.parsed.clone();
    replay_all(&mut app);
    assert!(!app.streaming);
    assert_eq!(app.parsed, before);
}

#[test]
fn collapse_state_survives_replay_chunks() {
    let mut app = app(TRANSCRIPT);
    let generation = app.start_replay();
    let chunks = chunk_transcript(TRANSCRIPT, 8);
    let (head, tail) = chunks.split_at(6);
    for chunk in head {
        app.push_chunk(generation, chunk);
    }
    app.selected = 0;
    app.toggle_selected();
    for chunk in tail {
        app.push_chunk(generation, chunk);
    }
    app.finish_replay(generation);
    assert!(!app.collapse.is_collapsed(&app.parsed.containers[0]));
    assert!(app.collapse.is_collapsed(&app.parsed.containers[1]));
}

#[test]
fn stale_generation_chunks_are_ignored() {
    let mut app = app(TRANSCRIPT);
    let old = app.start_replay();
    let new = app.start_replay();
    app.push_chunk(old, "<think>stale</think>");
    assert!(app.shown.is_empty());
    app.push_chunk(new, "<think>fresh");
    assert_eq!(app.parsed.containers[0].steps[0].text, "fresh");
    assert!(app.streaming);
}

#[test]
fn chunking_respects_utf8() {
    let chunks = chunk_transcript("📷 ab", 2);
    assert_eq!(chunks, ["📷 ", "ab"]);
    assert!(chunk_transcript("", 4).is_empty());
}

#[tokio::test]
async fn replay_task_streams_chunks_then_done() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let req = stepview::tui::replay::ReplayRequest {
        generation: 3,
        transcript: "abcdef".to_string(),
        chunk_chars: 4,
        interval: Duration::from_millis(0),
        tx,
        cancel: CancellationToken::new(),
    };
    stepview::tui::replay::replay(req).await.unwrap();
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    assert_eq!(
        events,
        vec![
            ReplayEvent::Chunk { generation: 3, text: "abcd".to_string() },
            ReplayEvent::Chunk { generation: 3, text: "ef".to_string() },
            ReplayEvent::Done { generation: 3 },
        ]
    );
}

#[tokio::test]
async fn cancelled_replay_sends_nothing() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let req = stepview::tui::replay::ReplayRequest {
        generation: 1,
        transcript: "abc".to_string(),
        chunk_chars: 1,
        interval: Duration::from_secs(5),
        tx,
        cancel,
    };
    stepview::tui::replay::replay(req).await.unwrap();
    assert!(rx.try_recv().is_err());
}
