use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Padding, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthChar;
use uet_assistant_core::{Message, MAX_QUESTION_CHARS};
use crate::app::{App, InputMode, Screen, EXAMPLE_QUESTIONS};

const PROSPECTUS: &str = "UET Prospectus";
const MAX_INPUT_ROWS: usize = 3;

/// Split a line into spans, rendering `**bold**` runs in bold. An unclosed
/// `**` is kept as literal text.
fn parse_markdown_line(text: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if open > 0 {
            spans.push(Span::styled(rest[..open].to_string(), base));
        }
        let bold = &after_open[..close];
        if !bold.is_empty() {
            spans.push(Span::styled(bold.to_string(), base.add_modifier(Modifier::BOLD)));
        }
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), base));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Home => render_home_screen(frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
        Screen::About => render_about_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" UET Department Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if app.screen == Screen::Chat {
        let badge = if app.is_pending() {
            Span::styled(" Processing... ", Style::default().bg(Color::Yellow).fg(Color::Black))
        } else {
            Span::styled(" Online ", Style::default().bg(Color::Green).fg(Color::Black))
        };
        spans.push(badge);
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Home => " HOME ",
        Screen::Chat => " CHAT ",
        Screen::About => " ABOUT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let hints: Vec<Span> = match (app.screen, app.input_mode) {
        (Screen::Home, _) => [hint(" c ", " chat "), hint(" a ", " about "), hint(" q ", " quit ")]
            .concat(),
        (Screen::About, _) => [hint(" c ", " chat "), hint(" Esc ", " home "), hint(" q ", " quit ")]
            .concat(),
        (Screen::Chat, InputMode::Editing) => [
            hint(" Enter ", " send "),
            hint(" Alt+Enter ", " new line "),
            hint(" Esc ", " stop typing "),
        ]
        .concat(),
        (Screen::Chat, InputMode::Normal) => {
            let mut hints = [hint(" i ", " type "), hint(" j/k ", " scroll ")].concat();
            if app.show_examples {
                hints.extend(hint(" 1-5 ", " example "));
            }
            hints.extend(
                [
                    hint(" x ", if app.show_examples { " hide examples " } else { " examples " }),
                    hint(" d ", if app.show_agent_details { " hide agent " } else { " agent " }),
                    hint(" r ", " reset "),
                    hint(" Esc ", " home "),
                    hint(" q ", " quit "),
                ]
                .concat(),
            );
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_home_screen(frame: &mut Frame, area: Rect) {
    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);
    let bullet = |text: &'static str| {
        Line::from(vec![Span::styled("  • ", Style::default().fg(Color::Green)), Span::raw(text)])
    };

    let lines = vec![
        Line::from(Span::styled("UET Department Information Chatbot", heading)),
        Line::from(Span::styled(
            "Your AI Assistant for University of Engineering & Technology",
            dim,
        )),
        Line::default(),
        Line::from("An MCP-based AI agent that extracts knowledge directly from the UET Prospectus."),
        Line::from("Get accurate information about departments, courses, and programs."),
        Line::default(),
        bullet("Answers only department-related questions"),
        bullet("Designed for students, faculty, and prospective applicants"),
        bullet("Cites the prospectus pages behind each answer"),
        Line::default(),
        Line::from(Span::styled("Sample questions you can ask:", Style::default().bold())),
        Line::from("  1. What programs does the Computer Science department offer?"),
        Line::from("  2. Tell me about the Electrical Engineering faculty."),
        Line::from("  3. What are the admission requirements for Mechanical Engineering?"),
        Line::from("  4. Which departments offer PhD programs?"),
        Line::default(),
        Line::from(vec![
            Span::raw("Press "),
            Span::styled(" c ", Style::default().bg(Color::Blue).fg(Color::White)),
            Span::raw(" to start chatting or "),
            Span::styled(" a ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" to learn about the project"),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .padding(Padding::uniform(1));

    let home = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    frame.render_widget(home, area);
}

fn render_about_screen(app: &App, frame: &mut Frame, area: Rect) {
    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let label = Style::default().fg(Color::Yellow);
    let row = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(format!("  {name:<20}"), label), Span::raw(value)])
    };

    let lines = vec![
        Line::from(Span::styled("About the UET Department Chatbot", heading)),
        Line::default(),
        Line::from("An NLP-powered assistant that answers department questions from the"),
        Line::from("University of Engineering & Technology prospectus."),
        Line::default(),
        Line::from(Span::styled("Features", Style::default().bold())),
        row("Context guardrails", "only department-related questions are answered".to_string()),
        row("PDF-based knowledge", "answers come from official UET documents".to_string()),
        row("Student-focused", "built for prospective and current students".to_string()),
        Line::default(),
        Line::from(Span::styled("Project", Style::default().bold())),
        row("Project type", "NLP class project".to_string()),
        row("Institution", "University of Engineering & Technology".to_string()),
        row("Data source", format!("{PROSPECTUS} PDF")),
        row("Backend", "FastAPI + LLaMA over MCP".to_string()),
        row("Answer endpoint", app.endpoint.clone()),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .padding(Padding::horizontal(2));

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let input_rows = app
        .session
        .draft()
        .split('\n')
        .count()
        .clamp(1, MAX_INPUT_ROWS) as u16;
    let examples_height = if app.show_examples {
        EXAMPLE_QUESTIONS.len() as u16 + 2
    } else {
        0
    };

    let [chat_area, examples_area, input_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(examples_height),
        Constraint::Length(input_rows + 2),
    ])
    .areas(area);

    render_transcript(app, frame, chat_area);
    if app.show_examples {
        render_examples(frame, examples_area);
    }
    render_input(app, frame, input_area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let focused = app.input_mode == InputMode::Normal;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Conversation ");

    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let lines: Vec<Line<'static>> = transcript_lines(app)
        .iter()
        .flat_map(|line| wrap_line(line, inner_width))
        .collect();

    // Rows are pre-wrapped, so the count is exact and the view can follow
    // the newest message
    app.chat_height = area.height.saturating_sub(2);
    app.chat_total_lines = lines.len().min(u16::MAX as usize) as u16;
    if app.follow_output {
        app.chat_scroll = app.max_chat_scroll();
    } else {
        app.chat_scroll = app.chat_scroll.min(app.max_chat_scroll());
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// A run of whitespace or non-whitespace chars, each keeping its span style.
struct Token {
    chars: Vec<(char, Style)>,
    width: usize,
    space: bool,
}

fn tokenize(line: &Line<'_>) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for span in &line.spans {
        for c in span.content.chars() {
            let space = c.is_whitespace();
            match tokens.last_mut() {
                Some(token) if token.space == space => {
                    token.chars.push((c, span.style));
                    token.width += char_width(c);
                }
                _ => tokens.push(Token {
                    chars: vec![(c, span.style)],
                    width: char_width(c),
                    space,
                }),
            }
        }
    }

    tokens
}

/// Take the finished row, minus whitespace left before the break.
fn break_row(row: &mut Vec<(char, Style)>) -> Vec<(char, Style)> {
    while row.last().is_some_and(|(c, _)| c.is_whitespace()) {
        row.pop();
    }
    std::mem::take(row)
}

/// Wrap a styled line into rows at most `width` columns wide.
/// Breaks at whitespace, which is dropped at the break. Words wider than a
/// row are split across rows.
fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows: Vec<Vec<(char, Style)>> = Vec::new();
    let mut row: Vec<(char, Style)> = Vec::new();
    let mut row_width = 0;

    for token in tokenize(line) {
        if row_width + token.width <= width {
            row.extend(token.chars);
            row_width += token.width;
            continue;
        }

        if token.space {
            if row_width > 0 {
                rows.push(break_row(&mut row));
                row_width = 0;
            }
            continue;
        }

        // Word doesn't fit, start a new row
        if row_width > 0 {
            rows.push(break_row(&mut row));
            row_width = 0;
        }
        for (c, style) in token.chars {
            let w = char_width(c);
            if row_width > 0 && row_width + w > width {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push((c, style));
            row_width += w;
        }
    }

    if !row.is_empty() || rows.is_empty() {
        rows.push(row);
    }

    rows.into_iter()
        .map(|row| {
            let mut spans: Vec<Span<'static>> = Vec::new();
            for (c, style) in row {
                match spans.last_mut() {
                    Some(span) if span.style == style => span.content.to_mut().push(c),
                    _ => spans.push(Span::styled(c.to_string(), style)),
                }
            }
            let mut wrapped = Line::from(spans);
            wrapped.style = line.style;
            wrapped.alignment = line.alignment;
            wrapped
        })
        .collect()
}

fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.session.messages() {
        push_message(&mut lines, msg, app.show_agent_details);
    }

    if app.is_pending() {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat(app.animation_frame as usize + 1);
        lines.push(Line::from(Span::styled(
            format!("Processing your question{dots}"),
            Style::default().fg(Color::Blue).add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(Span::styled(
            format!("Searching through {PROSPECTUS} data"),
            Style::default().fg(Color::DarkGray),
        )));
    }

    lines
}

fn push_message(lines: &mut Vec<Line<'static>>, msg: &Message, show_agent: bool) {
    let time = msg.timestamp.with_timezone(&chrono::Local).format("%H:%M").to_string();
    let time_span = Span::styled(format!(" {time}"), Style::default().fg(Color::DarkGray));

    if msg.is_user() {
        lines.push(Line::from(vec![
            Span::styled("You:", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            time_span,
        ]));
        lines.extend(msg.content.lines().map(|l| Line::from(l.to_string())));
        lines.push(Line::default());
        return;
    }

    let (label_color, body) = if msg.is_error {
        (Color::Red, Style::default().fg(Color::Red))
    } else {
        (Color::Yellow, Style::default())
    };
    lines.push(Line::from(vec![
        Span::styled("Assistant:", Style::default().fg(label_color).add_modifier(Modifier::BOLD)),
        time_span,
    ]));
    lines.extend(msg.content.lines().map(|l| parse_markdown_line(l, body)));

    if !msg.citations().is_empty() {
        let dim = Style::default().fg(Color::DarkGray);
        lines.push(Line::from(Span::styled("Sources:", dim.add_modifier(Modifier::BOLD))));
        for citation in msg.citations() {
            lines.push(Line::from(Span::styled(
                format!("  • Page {} – {PROSPECTUS}", citation.page),
                dim,
            )));
        }
    }

    if let Some(agent) = &msg.agent {
        let dim = Style::default().fg(Color::DarkGray);
        if show_agent {
            lines.push(Line::from(Span::styled("▾ Agent Reasoning", dim)));
            lines.push(Line::from(Span::styled(format!("  Tool Used: {}", agent.tool), dim)));
            lines.push(Line::from(Span::styled(format!("  Action: {}", agent.action), dim)));
        } else {
            lines.push(Line::from(Span::styled("▸ Agent Reasoning (d)", dim)));
        }
    }

    lines.push(Line::default());
}

fn render_examples(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(" Try asking about: (1-5 to use, x to hide) ");

    let items: Vec<Line> = EXAMPLE_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, question)| {
            Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().fg(Color::Blue).bold()),
                Span::raw(*question),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(items).block(block), area);
}

/// Row and display column of a cursor within multi-line text. `cursor` counts
/// chars, the column counts terminal cells.
fn cursor_line_col(text: &str, cursor: usize) -> (usize, usize) {
    text.chars().take(cursor).fold((0, 0), |(line, col), c| {
        if c == '\n' {
            (line + 1, 0)
        } else {
            (line, col + char_width(c))
        }
    })
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let count = app.draft_chars();
    let count_style = if count >= MAX_QUESTION_CHARS {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Ask about UET departments, programs, or faculty ")
        .title_bottom(
            Line::from(Span::styled(format!(" {count}/{MAX_QUESTION_CHARS} "), count_style))
                .right_aligned(),
        );

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (line, col) = cursor_line_col(app.session.draft(), app.cursor);

    // Scroll so the cursor stays inside the box
    let row_offset = if inner_height > 0 && line >= inner_height { line + 1 - inner_height } else { 0 };
    let col_offset = if inner_width > 0 && col >= inner_width { col + 1 - inner_width } else { 0 };

    let input = Paragraph::new(app.session.draft().to_string())
        .style(Style::default().fg(Color::Cyan))
        .block(block)
        .scroll((row_offset as u16, col_offset as u16));
    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((
            area.x + 1 + (col - col_offset) as u16,
            area.y + 1 + (line - row_offset) as u16,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, Terminal};
    use uet_assistant_core::{AnswerService, AskError, AskResponse, ChatSession};

    struct LongAnswer;

    #[async_trait]
    impl AnswerService for LongAnswer {
        async fn ask(&self, _question: &str) -> Result<AskResponse, AskError> {
            Ok(AskResponse::text("aaaaaaaaaaaaaaa ".repeat(30) + "TAILMARK"))
        }
    }

    fn row_texts(rows: &[Line<'_>]) -> Vec<String> {
        rows.iter()
            .map(|row| row.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn bold_runs_are_styled() {
        let line = parse_markdown_line("The **CS** department", Style::default());
        let texts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, vec!["The ", "CS", " department"]);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn unclosed_bold_is_literal() {
        let line = parse_markdown_line("5 ** 2", Style::default());
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "5 ** 2");
    }

    #[test]
    fn cursor_position_tracks_newlines() {
        assert_eq!(cursor_line_col("ab\ncd", 0), (0, 0));
        assert_eq!(cursor_line_col("ab\ncd", 2), (0, 2));
        assert_eq!(cursor_line_col("ab\ncd", 3), (1, 0));
        assert_eq!(cursor_line_col("ab\ncd", 5), (1, 2));
    }

    #[test]
    fn cursor_column_counts_display_width() {
        assert_eq!(cursor_line_col("日本", 2), (0, 4));
        assert_eq!(cursor_line_col("a日\nb😀c", 5), (1, 3));
    }

    #[test]
    fn wrap_breaks_at_word_boundaries() {
        let line = Line::from("the quick brown fox");
        assert_eq!(row_texts(&wrap_line(&line, 10)), vec!["the quick", "brown fox"]);
    }

    #[test]
    fn wrap_splits_words_longer_than_a_row() {
        let line = Line::from("abcdefghij xy");
        assert_eq!(row_texts(&wrap_line(&line, 4)), vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn wrap_keeps_styles_and_indent() {
        let line = parse_markdown_line("  **bold** tail", Style::default());
        let rows = wrap_line(&line, 8);
        assert_eq!(row_texts(&rows), vec!["  bold", "tail"]);
        assert!(rows[0].spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(wrap_line(&Line::default(), 8).len(), 1);
    }

    #[test]
    fn wrap_counts_wide_chars_as_two_columns() {
        let line = Line::from("日本語です");
        assert_eq!(row_texts(&wrap_line(&line, 4)), vec!["日本", "語で", "す"]);
    }

    #[tokio::test]
    async fn long_answer_tail_is_visible_when_following() {
        let session = ChatSession::new(Arc::new(LongAnswer), Duration::from_secs(5));
        let mut app = App::new(session, "http://localhost:8000/ask");
        app.open_chat();
        app.session.update_draft("Tell me everything");
        app.cursor = app.draft_chars();
        app.submit();
        assert!(app.session.wait_for_response().await.is_some());
        app.show_examples = false;
        assert!(app.follow_output);

        let mut terminal = Terminal::new(TestBackend::new(30, 20)).unwrap();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("TAILMARK"));
        assert_eq!(app.chat_scroll, app.max_chat_scroll());
    }
}
