use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use formassist_core::{language, MessageKind};
use crate::app::{App, InputMode};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let status_lines = status_lines(app);
    let status_height = status_lines.len() as u16;

    // Main layout: header, transcript, input, status, footer
    let [header_area, chat_area, input_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(status_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area);
    frame.render_widget(Paragraph::new(status_lines), status_area);
    render_footer(app, frame, footer_area);

    if matches!(app.input_mode, InputMode::FilePath | InputMode::Language) {
        render_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Form Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}] ", language::display_name(app.session.language())),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders, for scroll calculations
    app.view_height = area.height.saturating_sub(2);
    app.view_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Conversation ");

    let chat = Paragraph::new(transcript_text(app))
        .block(block)
        .wrap(TRANSCRIPT_WRAP)
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

pub const TRANSCRIPT_WRAP: Wrap = Wrap { trim: true };

/// Transcript pane contents. Also measured by `App::transcript_lines`, so
/// scrolling sees the same wrapped height as the screen.
pub fn transcript_text(app: &App) -> Text<'static> {
    if app.session.transcript().is_empty() && !app.is_waiting_for_reply() {
        return Text::from(Span::styled(
            "Say hello, or press Esc then 'u' to upload a form...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let label = || {
        Span::styled(
            "Assistant:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )
    };
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.session.transcript() {
        match msg.kind {
            MessageKind::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.extend(msg.text.lines().map(|line| Line::from(line.to_string())));
            }
            MessageKind::Assistant => {
                lines.push(Line::from(label()));
                lines.extend(msg.text.lines().map(|line| Line::from(line.to_string())));
            }
            MessageKind::AssistantPending => {
                lines.push(Line::from(label()));
                lines.push(Line::from(Span::styled(
                    msg.text.clone(),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
            }
        }
        lines.push(Line::default());
    }

    if app.is_waiting_for_reply() {
        lines.push(Line::from(label()));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Message (Enter to send) ");

    let (visible, cursor_x) = visible_slice(&app.session.draft, app.input_cursor, area.width);
    frame.render_widget(
        Paragraph::new(visible)
            .style(Style::default().fg(Color::Cyan))
            .block(block),
        area,
    );

    if editing {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn status_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if !app.session.upload_status().is_empty() {
        lines.push(Line::from(Span::styled(
            format!(" {}", app.session.upload_status()),
            Style::default().fg(Color::Green),
        )));
    }

    if let Some(link) = app.session.download_link() {
        lines.push(Line::from(vec![
            Span::styled(" Download Questions and Answers: ", Style::default().bold()),
            Span::styled(
                app.client.download_url(link),
                Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
            ),
            Span::styled("  (d to save)", Style::default().fg(Color::DarkGray)),
        ]));
    }

    if let Some(status) = &app.download_status {
        lines.push(Line::from(Span::styled(
            format!(" {}", status),
            Style::default().fg(Color::DarkGray),
        )));
    }

    if let Some(notice) = app.session.notice() {
        lines.push(Line::from(Span::styled(
            format!(" {}", notice),
            Style::default().fg(Color::Red),
        )));
    }

    lines
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let label = |l: &'static str| Span::styled(l, Style::default().fg(Color::DarkGray));

    let hints = match app.input_mode {
        InputMode::Editing => vec![
            key(" Enter"), label(" send  "),
            key("Esc"), label(" commands"),
        ],
        InputMode::FilePath | InputMode::Language => vec![
            key(" Enter"), label(" confirm  "),
            key("Esc"), label(" cancel"),
        ],
        InputMode::Normal => {
            let rephrase = if app.session.in_flight().rephrase {
                Span::styled(" rephrasing...  ", Style::default().fg(Color::DarkGray).italic())
            } else {
                label(" explain  ")
            };
            vec![
                key(" i"), label(" type  "),
                key("r"), rephrase,
                key("u"), label(" upload  "),
                key("l/L"), label(" language  "),
                key("d"), label(" download  "),
                key("j/k"), label(" scroll  "),
                key("q"), label(" quit"),
            ]
        }
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let title = match app.input_mode {
        InputMode::FilePath => " Upload file (path; empty for none) ",
        _ => " Language ",
    };

    let popup = centered_rect(60, 3, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);

    let (visible, cursor_x) = visible_slice(&app.prompt_input, app.prompt_cursor, popup.width);
    frame.render_widget(Paragraph::new(visible).block(block), popup);
    frame.set_cursor_position((popup.x + cursor_x + 1, popup.y + 1));
}

/// The part of a single-line input that fits in a bordered box of
/// `width`, scrolled horizontally to keep the cursor visible, plus the
/// cursor column inside the box.
fn visible_slice(text: &str, cursor: usize, width: u16) -> (String, u16) {
    let inner_width = width.saturating_sub(2) as usize;
    let offset = if inner_width > 0 && cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    };

    let visible = text.chars().skip(offset).take(inner_width).collect();
    (visible, (cursor - offset) as u16)
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height: height.min(area.height),
    }
}
