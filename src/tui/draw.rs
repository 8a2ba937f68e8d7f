use ratatui::{
    backend::TestBackend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame, Terminal,
};

use crate::parser::{SectionKind, StepKind};
use crate::tui::state::App;
use crate::tui::util::{container_label, section_label, step_body, step_label};

const BG: Color = Color::Rgb(15, 15, 25);
const BORDER: Color = Color::Rgb(50, 50, 80);

// ── Drawing ───────────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, app: &mut App) {
    let area = f.area();

    f.render_widget(Block::default().style(Style::default().bg(BG)), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    draw_header(f, chunks[0], app);
    draw_transcript(f, chunks[1], app);
    draw_footer(f, chunks[2], app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let mode = if app.streaming {
        Span::styled(" ● streaming ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::styled(" done ", Style::default().fg(Color::Black).bg(Color::Green))
    };
    let stats = format!(
        "  {} containers · {} steps · {} sections",
        app.parsed.containers.len(),
        app.parsed.step_count(),
        app.parsed.sections.len(),
    );
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" stepview ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(app.title.clone(), Style::default().fg(Color::White)),
        Span::raw("  "),
        mode,
        Span::styled(stats, Style::default().fg(Color::DarkGray)),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(BORDER)),
    );
    f.render_widget(header, area);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let hint = if app.status.is_empty() {
        " ↑↓/j/k Select   Enter Toggle   e/c Expand/Collapse all   y Copy   r Replay   q Quit ".to_string()
    } else {
        format!(" {} ", app.status)
    };
    let color = if app.status.is_empty() { Color::DarkGray } else { Color::Yellow };
    let footer = Paragraph::new(hint)
        .style(Style::default().fg(color).bg(BG))
        .alignment(Alignment::Center);
    f.render_widget(footer, area);
}

/// Logical lines for the transcript panel plus the line index of each
/// container header.
pub fn transcript_lines(app: &App) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut headers = Vec::with_capacity(app.parsed.containers.len());

    if app.parsed.is_empty() {
        lines.push(Line::from(Span::styled(
            " No content available",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
        return (lines, headers);
    }

    for (i, container) in app.parsed.containers.iter().enumerate() {
        let collapsed = app.collapse.is_collapsed(container);
        let (icon, label) = container_label(container);
        let pending = container.steps.iter().any(|s| !s.complete);

        let header_style = if i == app.selected {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        };
        let mut header = vec![
            Span::styled(format!(" {} ", if collapsed { "▶" } else { "▼" }), header_style),
            Span::styled(format!("{icon} {label}"), header_style),
        ];
        if container.steps.len() > 1 {
            header.push(Span::styled(
                format!("  ({} steps)", container.steps.len()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        if pending {
            header.push(Span::styled("  …", Style::default().fg(Color::Yellow)));
        }
        headers.push(lines.len());
        lines.push(Line::from(header));

        if collapsed {
            continue;
        }
        for step in &container.steps {
            if container.steps.len() > 1 {
                let (icon, label) = step_label(step.kind);
                lines.push(Line::from(Span::styled(
                    format!("   {icon} {label}"),
                    Style::default().fg(Color::Cyan),
                )));
            }
            let body_style = match step.kind {
                StepKind::Executing => Style::default().fg(Color::Yellow),
                StepKind::Picture => Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
                StepKind::Planning => Style::default().fg(Color::DarkGray),
                _ => Style::default().fg(Color::Gray),
            };
            for line in step_body(step.kind, &step.text) {
                lines.push(Line::from(Span::styled(format!("     {line}"), body_style)));
            }
        }
        lines.push(Line::from(""));
    }

    for section in &app.parsed.sections {
        let (icon, label) = section_label(section.kind);
        lines.push(Line::from(Span::styled(
            format!(" {icon} {label}"),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        match section.kind {
            SectionKind::Image => lines.push(Line::from(Span::styled(
                format!("     {}", section.content),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            ))),
            SectionKind::Table => {
                for row in section.table().unwrap_or_default().to_aligned_lines() {
                    lines.push(Line::from(Span::styled(
                        format!("     {row}"),
                        Style::default().fg(Color::White),
                    )));
                }
            }
        }
        lines.push(Line::from(""));
    }

    (lines, headers)
}

fn wrapped_rows(line: &Line, inner_width: usize) -> usize {
    let text_width: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
    if inner_width == 0 || text_width == 0 {
        1
    } else {
        text_width.div_ceil(inner_width)
    }
}

fn draw_transcript(f: &mut Frame, area: Rect, app: &mut App) {
    let (lines, header_lines) = transcript_lines(app);

    let view_height = area.height.saturating_sub(2) as usize;
    // -2 borders -1 scrollbar
    let inner_width = area.width.saturating_sub(3) as usize;

    // Map logical header lines onto rendered rows, accounting for wrap.
    let mut rows_before = Vec::with_capacity(lines.len());
    let mut total_rows = 0usize;
    for line in &lines {
        rows_before.push(total_rows);
        total_rows += wrapped_rows(line, inner_width);
    }
    app.header_rows = header_lines.iter().map(|&i| rows_before[i]).collect();

    let max_scroll = total_rows.saturating_sub(view_height) as u16;
    app.max_scroll = max_scroll;
    app.view_rect = area;
    if app.follow_tail {
        app.scroll = max_scroll;
    } else {
        app.scroll = app.scroll.min(max_scroll);
    }

    let title = if app.streaming {
        " Transcript  [replaying] "
    } else {
        " Transcript "
    };
    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title)
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BORDER)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(panel, area);

    if total_rows > view_height {
        let mut scrollbar_state = ScrollbarState::new(max_scroll as usize).position(app.scroll as usize);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"))
            .track_symbol(Some("│"))
            .thumb_symbol("█");
        f.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

/// Render the full UI to an off-screen buffer (for tests and snapshots).
pub fn render_to_buffer(app: &mut App, width: u16, height: u16) -> Buffer {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).expect("TestBackend terminal");
    terminal.draw(|f| draw(f, app)).expect("draw");
    terminal.backend().buffer().clone()
}
