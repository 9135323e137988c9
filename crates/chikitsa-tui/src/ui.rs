use chikitsa_core::{ConversationSnapshot, DiagnosisResult, Labels};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let snapshot = app.controller.snapshot();

    // Main layout: header, disclaimer, body, input, footer
    let [header_area, banner_area, body_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(&snapshot, frame, header_area);
    render_banner(&snapshot.labels, frame, banner_area);

    if app.show_history {
        let [chat_area, history_area] = Layout::horizontal([
            Constraint::Percentage(65),
            Constraint::Percentage(35),
        ])
        .areas(body_area);
        render_chat(app, &snapshot, frame, chat_area);
        render_history(app, &snapshot.labels, frame, history_area);
    } else {
        render_chat(app, &snapshot, frame, body_area);
    }

    render_input(app, &snapshot, frame, input_area);
    render_footer(&snapshot, frame, footer_area);
}

fn render_header(snapshot: &ConversationSnapshot, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", snapshot.labels.title), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", snapshot.active_language.display_name()),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_banner(labels: &Labels, frame: &mut Frame, area: Rect) {
    let banner = Paragraph::new(Line::from(Span::styled(
        format!(" ⚠ {}", labels.disclaimer_banner),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
    )));
    frame.render_widget(banner, area);
}

fn render_footer(snapshot: &ConversationSnapshot, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let next_language = snapshot.active_language.next().display_name();
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(" Enter ", key_style),
        Span::styled(format!(" {} ", snapshot.labels.send), label_style),
        Span::styled(" ^L ", key_style),
        Span::styled(format!(" {} ", next_language), label_style),
        Span::styled(" ^N ", key_style),
        Span::styled(format!(" {} ", snapshot.labels.new_chat), label_style),
        Span::styled(" Tab ", key_style),
        Span::styled(format!(" {} ", snapshot.labels.history), label_style),
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(format!(" {} ", snapshot.labels.scroll), label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(format!(" {} ", snapshot.labels.quit), label_style),
    ]))
    .style(Style::default().bg(Color::Black));

    frame.render_widget(footer, area);
}

fn bot_heading(labels: &Labels) -> Line<'static> {
    Line::from(Span::styled(
        format!("{}:", labels.title),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

fn user_turn(labels: &Labels, text: &str, lines: &mut Vec<Line<'static>>) {
    lines.push(Line::from(Span::styled(
        format!("{}:", labels.user),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    for line in text.lines() {
        lines.push(Line::from(line.to_string()));
    }
    lines.push(Line::default());
}

fn result_card(labels: &Labels, result: &DiagnosisResult, lines: &mut Vec<Line<'static>>) {
    let heading = Style::default().add_modifier(Modifier::BOLD);

    lines.push(Line::from(Span::styled(
        labels.diagnosis_result.clone(),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(vec![
        Span::styled(format!("{} ", labels.condition), heading),
        Span::raw(result.predicted_disease().to_string()),
    ]));
    lines.push(Line::from(vec![
        Span::styled(format!("{} ", labels.confidence), heading),
        Span::raw(result.confidence_display()),
    ]));

    let symptoms = result.symptoms_display();
    if !symptoms.is_empty() {
        lines.push(Line::from(Span::styled(labels.matched_symptoms.clone(), heading)));
        for symptom in symptoms {
            lines.push(Line::from(format!("  • {}", symptom)));
        }
    }

    lines.push(Line::from(vec![
        Span::styled(format!("{} ", labels.recommendation), heading),
        Span::raw(result.recommendation().to_string()),
    ]));
    if !result.disclaimer().is_empty() {
        lines.push(Line::from(Span::styled(
            result.disclaimer().to_string(),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }
}

/// Chat transcript for the current turn: welcome, user message, then the
/// pending indicator or the bot's answer.
fn chat_lines(
    snapshot: &ConversationSnapshot,
    submitting_text: Option<&str>,
    animation_frame: u8,
) -> Vec<Line<'static>> {
    let labels = &snapshot.labels;
    let mut lines = vec![bot_heading(labels), Line::from(labels.welcome.clone()), Line::default()];

    if let Some(text) = submitting_text {
        user_turn(labels, text, &mut lines);
        lines.push(bot_heading(labels));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", labels.analyzing, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else if let Some(result) = &snapshot.last_result {
        if let Some(message) = &snapshot.last_message {
            user_turn(labels, message, &mut lines);
        }
        lines.push(bot_heading(labels));
        if result.is_error() {
            lines.push(Line::from(Span::styled(
                labels.service_unavailable.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            result_card(labels, result, &mut lines);
        }
    }

    lines
}

/// Split text into alternating runs of whitespace and non-whitespace.
fn split_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            runs.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        runs.push(&text[start..]);
    }
    runs
}

/// Wrap one styled line into rows of at most `width` columns, breaking at
/// word boundaries. Words wider than a row are split by character.
fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows: Vec<Vec<Span<'static>>> = vec![Vec::new()];
    let mut row_width = 0;

    for span in &line.spans {
        for run in split_runs(&span.content) {
            let run_width = Span::raw(run).width();
            let is_space = run.chars().all(char::is_whitespace);

            if row_width > 0 && row_width + run_width > width {
                rows.push(Vec::new());
                row_width = 0;
                // Wrapped rows never start with whitespace
                if is_space {
                    continue;
                }
            }

            if run_width <= width {
                if let Some(row) = rows.last_mut() {
                    row.push(Span::styled(run.to_string(), span.style));
                }
                row_width += run_width;
                continue;
            }

            for c in run.chars() {
                let piece = c.to_string();
                let piece_width = Span::raw(piece.as_str()).width();
                if row_width > 0 && row_width + piece_width > width {
                    rows.push(Vec::new());
                    row_width = 0;
                }
                if let Some(row) = rows.last_mut() {
                    row.push(Span::styled(piece, span.style));
                }
                row_width += piece_width;
            }
        }
    }

    // Spaces left at a break would only pad the row
    let last = rows.len() - 1;
    for row in &mut rows[..last] {
        while row
            .last()
            .is_some_and(|span| span.content.chars().all(char::is_whitespace))
        {
            row.pop();
        }
    }

    rows.into_iter().map(Line::from).collect()
}

/// Pre-wrapped rows, so the row count used for scrolling matches what is drawn.
fn wrap_lines(lines: &[Line<'static>], width: u16) -> Vec<Line<'static>> {
    lines
        .iter()
        .flat_map(|line| wrap_line(line, width as usize))
        .collect()
}

fn render_chat(app: &mut App, snapshot: &ConversationSnapshot, frame: &mut Frame, area: Rect) {
    let submitting_text = app.controller.state().submitting_text().map(str::to_string);
    let lines = chat_lines(snapshot, submitting_text.as_deref(), app.animation_frame);

    // Inner size minus borders
    app.chat_height = area.height.saturating_sub(2);
    let rows = wrap_lines(&lines, area.width.saturating_sub(2));
    let total = rows.len().min(u16::MAX as usize) as u16;
    app.fit_chat_scroll(total);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", snapshot.labels.title));

    let chat = Paragraph::new(Text::from(rows))
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_history(app: &mut App, labels: &Labels, frame: &mut Frame, area: Rect) {
    let history = app.controller.state().history();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" {} ({}) ", labels.history, history.len()));

    let items: Vec<ListItem> = history
        .iter()
        .enumerate()
        .map(|(i, message)| ListItem::new(format!(" {}. {} ", i + 1, message)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.history_state);
}

fn render_input(app: &App, snapshot: &ConversationSnapshot, frame: &mut Frame, area: Rect) {
    let border_color = if snapshot.is_submitting { Color::DarkGray } else { Color::Yellow };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", snapshot.labels.send));

    if snapshot.pending_input.is_empty() {
        let placeholder = Paragraph::new(snapshot.labels.placeholder.as_str())
            .style(Style::default().fg(Color::DarkGray))
            .block(input_block);
        frame.render_widget(placeholder, area);
    } else {
        // Horizontal scrolling keeps the cursor visible
        let inner_width = area.width.saturating_sub(2) as usize;
        let scroll_offset = if inner_width == 0 || app.input_cursor < inner_width {
            0
        } else {
            app.input_cursor - inner_width + 1
        };

        let visible_text: String = snapshot
            .pending_input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();

        let text_color = if snapshot.is_submitting { Color::DarkGray } else { Color::Cyan };
        let input = Paragraph::new(visible_text)
            .style(Style::default().fg(text_color))
            .block(input_block);
        frame.render_widget(input, area);

        if !snapshot.is_submitting {
            let cursor_x = (app.input_cursor - scroll_offset) as u16;
            frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
        }
        return;
    }

    if !snapshot.is_submitting {
        frame.set_cursor_position((area.x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chikitsa_core::{
        normalize, ConversationController, DiagnosisClient, Language, LocaleTable, RequestDispatcher,
    };
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn snapshot(last_result: Option<DiagnosisResult>, last_message: Option<&str>) -> ConversationSnapshot {
        ConversationSnapshot {
            pending_input: String::new(),
            is_submitting: false,
            last_result,
            last_message: last_message.map(str::to_string),
            history_len: usize::from(last_message.is_some()),
            active_language: Language::English,
            labels: Labels::english(),
        }
    }

    fn text_of(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_welcome_only() {
        let lines = text_of(&chat_lines(&snapshot(None, None), None, 0));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Hello! I am ChikitsaAI"));
    }

    #[test]
    fn test_analyzing_indicator() {
        let lines = text_of(&chat_lines(&snapshot(None, None), Some("fever"), 2));
        assert!(lines.contains(&"fever".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Analyzing..."));
    }

    #[test]
    fn test_result_card() {
        let result = normalize(&json!({
            "confidence_score": 0.82,
            "disclaimer": "Not a diagnosis",
            "predicted_disease": "Common Cold",
            "recommendation": "Rest and fluids",
            "symptoms_matched": ["runny_nose"]
        }))
        .unwrap();
        let lines = text_of(&chat_lines(&snapshot(Some(result), Some("cold")), None, 0));

        assert!(lines.contains(&"Condition: Common Cold".to_string()));
        assert!(lines.contains(&"Confidence: 82.0%".to_string()));
        assert!(lines.contains(&"  • Runny Nose".to_string()));
        assert!(lines.contains(&"Recommendation: Rest and fluids".to_string()));
    }

    #[test]
    fn test_error_turn_shows_apology() {
        let labels = Labels::english();
        let result = DiagnosisResult::fallback(&labels);
        let lines = text_of(&chat_lines(&snapshot(Some(result), Some("cold")), None, 0));

        assert_eq!(lines.last(), Some(&labels.service_unavailable));
        assert!(!lines.iter().any(|l| l.starts_with("Confidence:")));
    }

    #[test]
    fn test_wrap_breaks_at_word_boundaries() {
        let rows = text_of(&wrap_line(&Line::from("aaaaaa bbbbbb cccccc"), 10));
        assert_eq!(rows, vec!["aaaaaa", "bbbbbb", "cccccc"]);

        let rows = text_of(&wrap_line(&Line::from("  • Runny Nose"), 40));
        assert_eq!(rows, vec!["  • Runny Nose"]);

        assert_eq!(wrap_line(&Line::default(), 10).len(), 1);
    }

    #[test]
    fn test_wrap_splits_long_words_and_keeps_style() {
        let line = Line::from(vec![
            Span::styled("Condition: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("Pneumonoultramicroscopic"),
        ]);
        let rows = wrap_line(&line, 10);
        let text = text_of(&rows);
        assert_eq!(text[0], "Condition:");
        assert!(text.iter().all(|row| Line::from(row.as_str()).width() <= 10));
        assert_eq!(text.concat().replace(' ', ""), "Condition:Pneumonoultramicroscopic");
        assert!(rows[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    fn screen(app: &mut App, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer.content[(y * width + x) as usize].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    fn failed_turn_app() -> App {
        let locales = LocaleTable::builtin();
        let dispatcher = RequestDispatcher::new(
            Arc::new(DiagnosisClient::new()),
            "http://127.0.0.1:9",
            &locales,
            Duration::from_secs(1),
        )
        .unwrap();
        let mut controller =
            ConversationController::new(Arc::new(dispatcher), locales, Language::English).unwrap();
        controller.edit_input("fever");
        controller.begin_submit().unwrap();
        controller.fail_submit();
        App::new(controller, false)
    }

    #[test]
    fn test_end_of_apology_reachable_in_narrow_terminal() {
        let mut app = failed_turn_app();
        let rows = screen(&mut app, 24, 16);
        assert!(rows.iter().any(|row| row.contains("later.")), "{:#?}", rows);

        // Scrolling past the end stays clamped to the last rows
        for _ in 0..250 {
            app.scroll_down();
        }
        let rows = screen(&mut app, 24, 16);
        assert!(rows.iter().any(|row| row.contains("later.")), "{:#?}", rows);

        app.chat_scroll = 0;
        app.follow_tail = false;
        let rows = screen(&mut app, 24, 16);
        assert!(rows.iter().any(|row| row.contains("ChikitsaAI:")), "{:#?}", rows);
    }
}
