//! TUI views and rendering
//!
//! All rendering logic is contained here. The views module draws the UI
//! from AppState but never modifies it.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use tracing::trace;

use super::state::{AppState, Field, InteractionMode, Pane, SettingsForm, TextInput};
use crate::session::{ActionKind, ChatRole, Screen, Severity, Template, build_input};

mod colors {
    use ratatui::style::Color;

    pub const HEADER: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const KEYBIND: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const FOCUS: Color = Color::Rgb(255, 215, 0); // Gold
    pub const EDITING: Color = Color::Rgb(0, 255, 127); // Spring green
    pub const OK: Color = Color::Rgb(50, 205, 50); // Lime green
    pub const ERROR: Color = Color::Rgb(220, 20, 60); // Crimson
    pub const SELECTED_BG: Color = Color::Rgb(40, 40, 40);
    pub const DIM: Color = Color::DarkGray;

    pub const CHAT_USER: Color = Color::Rgb(0, 255, 127); // Green
    pub const CHAT_ASSISTANT: Color = Color::Rgb(100, 149, 237); // Cornflower blue
}

/// Cursor glyph drawn inside edited text
const CURSOR: char = '\u{258F}';

/// Main render function
pub fn render(state: &AppState, frame: &mut Frame) {
    trace!(screen = ?state.screen(), mode = ?state.mode, "render: called");
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    render_header(state, frame, chunks[0]);

    match state.screen() {
        Screen::Input => render_input_screen(state, frame, chunks[1]),
        Screen::Execution => render_execution_screen(state, frame, chunks[1]),
    }

    render_footer(state, frame, chunks[2]);

    match state.mode {
        InteractionMode::Settings => render_settings_overlay(&state.settings, frame, frame.area()),
        InteractionMode::Help => render_help_overlay(frame, frame.area()),
        _ => {}
    }
}

fn render_header(state: &AppState, frame: &mut Frame, area: Rect) {
    let (indicator, indicator_color, credential_label) = match state.session.credentials() {
        Some(_) => ("●", colors::OK, "credentials ok"),
        None => ("●", colors::ERROR, "no credentials [s]"),
    };
    let screen_label = match state.screen() {
        Screen::Input => "New Document",
        Screen::Execution => "Execution",
    };

    let mut spans = vec![
        Span::styled(
            " DocuBoss ",
            Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("› {} ", screen_label), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(indicator, Style::default().fg(indicator_color)),
        Span::styled(format!(" {}", credential_label), Style::default().fg(colors::DIM)),
    ];

    let busy: Vec<String> = ActionKind::ALL
        .into_iter()
        .filter(|a| state.session.is_busy(*a))
        .map(|a| a.to_string())
        .collect();
    if !busy.is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} {}…", state.spinner(), busy.join(", ")),
            Style::default().fg(colors::FOCUS),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_input_screen(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_input_screen: called");
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(36), Constraint::Min(0)])
        .split(area);

    // Template picker: "(none)" first, then every template
    let entries: Vec<(Option<Template>, &str)> = std::iter::once((None, "(none) custom text only"))
        .chain(Template::ALL.into_iter().map(|t| (Some(t), t.label())))
        .collect();
    let items: Vec<ListItem> = entries
        .into_iter()
        .map(|(template, label)| {
            let selected = template == state.template;
            let marker = if selected { "▶ " } else { "  " };
            let style = if selected {
                Style::default()
                    .fg(colors::FOCUS)
                    .bg(colors::SELECTED_BG)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(Span::styled(format!("{}{}", marker, label), style)))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Template (↑/↓) "),
    );
    frame.render_widget(list, columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(5)])
        .split(columns[1]);

    let editing = state.mode == InteractionMode::Editing(Field::Custom);
    let input = Paragraph::new(text_lines(&state.custom_input, editing))
        .wrap(Wrap { trim: false })
        .block(pane_block(" What should the document cover? ", editing, editing));
    frame.render_widget(input, rows[0]);

    let preview_text = build_input(state.template, state.custom_input.text());
    let preview = if preview_text.trim().is_empty() {
        Paragraph::new(Span::styled(
            "Select a template or enter text, then press Enter",
            Style::default().fg(colors::DIM),
        ))
    } else {
        Paragraph::new(preview_text).wrap(Wrap { trim: false })
    };
    frame.render_widget(
        preview.block(Block::default().borders(Borders::ALL).title(" Sent to planning agent ")),
        rows[1],
    );
}

fn render_execution_screen(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!(focus = ?state.focus, "render_execution_screen: called");
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(columns[1]);

    render_plan_pane(state, frame, columns[0]);
    render_document_pane(state, frame, right[0]);
    render_chat_pane(state, frame, right[1]);
}

fn render_plan_pane(state: &AppState, frame: &mut Frame, area: Rect) {
    let editing = state.mode == InteractionMode::Editing(Field::Plan);
    let title = if state.session.is_editing_plan() {
        " Execution Plan [editing] ".to_string()
    } else {
        " Execution Plan [read-only] ".to_string()
    };
    let plan = Paragraph::new(text_lines(&state.plan_input, editing))
        .wrap(Wrap { trim: false })
        .scroll((scroll_for(&state.plan_input, editing, area), 0))
        .block(pane_block(&title, state.focus == Pane::Plan, editing));
    frame.render_widget(plan, area);
}

fn render_document_pane(state: &AppState, frame: &mut Frame, area: Rect) {
    let editing = state.mode == InteractionMode::Editing(Field::Document);
    let title = format!(
        " Document · {} chars · refine: {} ",
        state.session.char_count(),
        state.refine_role.label()
    );
    let body = if state.document_input.text().is_empty() && !editing {
        Paragraph::new(Span::styled(
            "Empty. Press [e] to write, or [c] on the plan to copy it here.",
            Style::default().fg(colors::DIM),
        ))
    } else {
        Paragraph::new(text_lines(&state.document_input, editing))
            .wrap(Wrap { trim: false })
            .scroll((scroll_for(&state.document_input, editing, area), 0))
    };
    frame.render_widget(body.block(pane_block(&title, state.focus == Pane::Document, editing)), area);

    if state.mode == InteractionMode::Editing(Field::ExportPath) {
        let popup = centered_rect(60, 20, area);
        frame.render_widget(Clear, popup);
        let prompt = Paragraph::new(text_lines(&state.export_path, true))
            .block(pane_block(" Export to (Enter to write, Esc to cancel) ", true, true));
        frame.render_widget(prompt, popup);
    }
}

fn render_chat_pane(state: &AppState, frame: &mut Frame, area: Rect) {
    let focused = state.focus == Pane::Chat;
    let editing = state.mode == InteractionMode::Editing(Field::Question);
    let title = format!(" Chat · {} ", state.ask_role.label());
    let block = pane_block(&title, focused, editing);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(inner);

    let mut lines: Vec<Line> = Vec::new();
    for message in state.session.chat() {
        let (label, color) = match message.role {
            ChatRole::User => ("you", colors::CHAT_USER),
            ChatRole::Assistant => ("agent", colors::CHAT_ASSISTANT),
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{} ", label),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                message.timestamp.format("%H:%M").to_string(),
                Style::default().fg(colors::DIM),
            ),
        ]));
        lines.extend(message.content.lines().map(|l| Line::from(l.to_string())));
        lines.push(Line::from(""));
    }
    if state.session.is_busy(ActionKind::Ask) {
        lines.push(Line::from(Span::styled(
            format!("{} waiting for reply", state.spinner()),
            Style::default().fg(colors::DIM),
        )));
    }

    let height = rows[0].height as usize;
    let wrapped: usize = lines
        .iter()
        .map(|l| wrapped_height(l.width(), rows[0].width as usize))
        .sum();
    let scroll = wrapped.saturating_sub(height) as u16;
    let history = Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((scroll, 0));
    frame.render_widget(history, rows[0]);

    let mut prompt = vec![Span::styled("› ", Style::default().fg(colors::KEYBIND))];
    prompt.extend(text_lines(&state.question_input, editing).remove(0).spans);
    let input = Paragraph::new(Line::from(prompt)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(input, rows[1]);
}

fn render_footer(state: &AppState, frame: &mut Frame, area: Rect) {
    trace!("render_footer: called");
    if let Some(notice) = &state.notice {
        let color = match notice.severity {
            Severity::Info => colors::OK,
            Severity::Error => colors::ERROR,
        };
        let content = Line::from(vec![
            Span::styled(
                format!(" {}: ", notice.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(notice.description.as_str()),
        ]);
        let footer = Paragraph::new(content).block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, area);
        return;
    }

    let keybinds: Vec<(&str, &str)> = match (state.mode, state.screen()) {
        (InteractionMode::Editing(field), _) if field.is_multiline() => vec![("[Esc]", "Done")],
        (InteractionMode::Editing(_), _) => vec![("[Enter]", "Submit"), ("[Esc]", "Cancel")],
        (InteractionMode::Settings, _) => vec![("[Tab]", "Next field"), ("[Enter]", "Save"), ("[Esc]", "Close")],
        (InteractionMode::Help, _) => vec![("[Esc]", "Close")],
        (InteractionMode::Normal, Screen::Input) => vec![
            ("[↑/↓]", "Template"),
            ("[i]", "Type"),
            ("[Enter]", "Generate plan"),
            ("[o]", "Open plan"),
        ],
        (InteractionMode::Normal, Screen::Execution) => match state.focus {
            Pane::Plan => vec![("[e]", "Edit"), ("[r]", "Regenerate"), ("[c]", "Copy to editor"), ("[b]", "Back")],
            Pane::Document => vec![("[e]", "Edit"), ("[f]", "Refine"), ("[m]", "Agent"), ("[x]", "Export")],
            Pane::Chat => vec![("[e]", "Ask"), ("[a]", "Apply reply"), ("[m]", "Agent")],
        },
    };

    let mut left_spans = vec![Span::raw(" ")];
    for (key, action) in keybinds {
        left_spans.push(Span::styled(
            key,
            Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD),
        ));
        left_spans.push(Span::raw(format!(" {} ", action)));
    }

    let right_line = Line::from(vec![
        Span::styled("[Tab]", Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD)),
        Span::raw(" Pane "),
        Span::styled("[s]", Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD)),
        Span::raw(" Settings "),
        Span::styled("[?]", Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD)),
        Span::raw(" Help "),
        Span::styled("[q]", Style::default().fg(colors::KEYBIND).add_modifier(Modifier::BOLD)),
        Span::raw(" Quit "),
    ]);

    let footer_block = Block::default().borders(Borders::ALL);
    let inner = footer_block.inner(area);
    frame.render_widget(footer_block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(right_line.width() as u16)])
        .split(inner);

    frame.render_widget(Paragraph::new(Line::from(left_spans)), chunks[0]);
    frame.render_widget(Paragraph::new(right_line), chunks[1]);
}

fn render_settings_overlay(form: &SettingsForm, frame: &mut Frame, area: Rect) {
    trace!(selected = form.selected, "render_settings_overlay: called");
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled(
            "Dust API Credentials",
            Style::default()
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                .fg(colors::HEADER),
        )),
        Line::from(""),
    ];

    for (i, (label, field)) in SettingsForm::LABELS.iter().zip(form.fields.iter()).enumerate() {
        let selected = i == form.selected;
        let value = if i == SettingsForm::API_KEY && !selected {
            "•".repeat(field.text().chars().count())
        } else if selected {
            with_cursor(field)
        } else {
            field.text().to_string()
        };
        let label_style = if selected {
            Style::default().fg(colors::FOCUS).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors::DIM)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<20}", label), label_style),
            Span::raw(value),
        ]));
    }

    lines.push(Line::from(""));
    let missing = form.missing_count();
    lines.push(if missing == 0 {
        Line::from(Span::styled("  Complete", Style::default().fg(colors::OK)))
    } else {
        Line::from(Span::styled(
            format!("  Incomplete: {} field(s) empty", missing),
            Style::default().fg(colors::ERROR),
        ))
    });

    let settings = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Settings ")
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(settings, popup_area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    trace!("render_help_overlay: called");
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)))
    };
    let help_text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default()
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
                .fg(colors::HEADER),
        )),
        Line::from(""),
        section("Global"),
        key_line("s", "Credentials settings"),
        key_line("?", "Toggle help"),
        key_line("q / Ctrl+C", "Quit"),
        Line::from(""),
        section("New Document"),
        key_line("↑/↓ j/k", "Choose template"),
        key_line("i", "Type custom text"),
        key_line("Enter", "Generate plan"),
        key_line("o", "Return to the current plan"),
        Line::from(""),
        section("Execution"),
        key_line("Tab", "Cycle plan / document / chat"),
        key_line("e", "Edit focused pane (Esc when done)"),
        key_line("r", "Regenerate plan from the original input"),
        key_line("c", "Copy plan into the document"),
        key_line("f", "Refine document"),
        key_line("a", "Append last chat reply to the document"),
        key_line("m", "Switch agent for refine or chat"),
        key_line("x", "Export document"),
        key_line("b / Esc", "Back to new document"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help (? to close) ")
                .style(Style::default().bg(Color::Black)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help, popup_area);
}

/// Helper to create a key binding line
fn key_line<'a>(key: &'a str, desc: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{:<12}", key), Style::default().fg(colors::KEYBIND)),
        Span::raw(desc),
    ])
}

fn pane_block(title: &str, focused: bool, editing: bool) -> Block<'static> {
    let color = if editing {
        colors::EDITING
    } else if focused {
        colors::FOCUS
    } else {
        colors::DIM
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title.to_string())
}

/// Text as owned lines, with a cursor glyph while editing
fn text_lines(input: &TextInput, editing: bool) -> Vec<Line<'static>> {
    let text = if editing {
        with_cursor(input)
    } else {
        input.text().to_string()
    };
    let lines: Vec<Line<'static>> = text.split('\n').map(|l| Line::from(l.to_string())).collect();
    if lines.is_empty() { vec![Line::from("")] } else { lines }
}

fn with_cursor(input: &TextInput) -> String {
    let mut text = input.text().to_string();
    text.insert(input.cursor(), CURSOR);
    text
}

/// Keep the cursor line visible while editing long text
fn scroll_for(input: &TextInput, editing: bool, area: Rect) -> u16 {
    if !editing {
        return 0;
    }
    let visible = area.height.saturating_sub(2) as usize;
    let cursor_line = input.text()[..input.cursor()].matches('\n').count();
    cursor_line.saturating_sub(visible.saturating_sub(1)) as u16
}

/// Rows a line of `width` columns occupies when wrapped to `columns`
fn wrapped_height(width: usize, columns: usize) -> usize {
    if columns == 0 || width == 0 {
        1
    } else {
        width.div_ceil(columns)
    }
}

/// Helper to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
