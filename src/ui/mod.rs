mod chat;
mod editor;

use std::sync::OnceLock;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, Popup};
use crate::gemini::CompletionClient;
use crate::theme::Theme;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Install the theme; only the first call has any effect
pub fn set_theme(theme: Theme) {
    let _ = THEME.set(theme);
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

fn accent() -> Color { theme().accent }
fn danger() -> Color { theme().danger }
fn warning() -> Color { theme().warning }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn code_bg() -> Color { theme().code_bg }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }
fn line_number() -> Color { theme().line_number }

/// Below this width the panels stack instead of sitting side by side
const SIDE_BY_SIDE_MIN_WIDTH: u16 = 90;

const TAB_WIDTH: usize = 4;

/// Replace tabs with spaces up to the next tab stop.
///
/// The terminal buffer takes tabs as zero-width symbols, so text has to be
/// expanded before it is handed to a widget.
fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut width = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - width % TAB_WIDTH;
            out.extend(std::iter::repeat(' ').take(pad));
            width += pad;
        } else {
            out.push(c);
            width += c.width().unwrap_or(0);
        }
    }
    out
}

/// `expand_tabs` for multi-line text
fn expand_tabs_text(text: &str) -> String {
    text.split('\n').map(expand_tabs).collect::<Vec<_>>().join("\n")
}

/// Terminal columns taken by the first `chars` chars of `line`
fn display_col(line: &str, chars: usize) -> usize {
    let prefix: String = line.chars().take(chars).collect();
    expand_tabs(&prefix).width()
}

pub fn draw<C: CompletionClient>(f: &mut Frame, app: &mut App<C>) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Navbar
            Constraint::Min(6),    // Panels
            Constraint::Length(1), // Status / key hints
        ])
        .split(area);

    let panels = if area.width >= SIDE_BY_SIDE_MIN_WIDTH {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(2, 3), Constraint::Ratio(1, 3)])
            .split(chunks[1])
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1])
    };

    draw_navbar(f, app, chunks[0]);
    editor::draw(f, app, panels[0]);
    chat::draw(f, app, panels[1]);
    draw_footer(f, app, chunks[2]);

    if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

/// Border and title styles for a panel
fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border_color = if focused { accent() } else { inactive() };
    let title_style = if focused {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    Block::default()
        .title(Span::styled(title, title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
}

fn draw_navbar<C: CompletionClient>(f: &mut Frame, app: &App<C>, area: Rect) {
    let file = app
        .editor
        .path()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "untitled".to_string());

    let mut spans = vec![
        Span::styled(" codechat ", Style::default().fg(header()).add_modifier(Modifier::BOLD)),
        Span::styled("│ ", Style::default().fg(inactive())),
        Span::styled(file, Style::default().fg(text())),
    ];
    if app.editor.is_dirty() {
        spans.push(Span::styled(" ●", Style::default().fg(warning())));
    }
    spans.push(Span::styled(" │ ", Style::default().fg(inactive())));
    spans.push(Span::styled(app.model.clone(), Style::default().fg(text_dim())));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_footer<C: CompletionClient>(f: &mut Frame, app: &App<C>, area: Rect) {
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status.as_str(), Style::default().fg(warning())))
    } else {
        let hints: &[(&str, &str)] = match app.focus {
            Focus::Chat if app.exchange.is_code() => &[
                ("Enter", "send"),
                ("Ctrl+Y", "copy code"),
                ("Ctrl+E", "insert"),
                ("Tab", "editor"),
                ("F1", "help"),
            ],
            Focus::Chat => &[("Enter", "send"), ("Tab", "editor"), ("F1", "help"), ("Ctrl+Q", "quit")],
            Focus::Editor => &[("Ctrl+S", "save"), ("Tab", "chat"), ("F1", "help"), ("Ctrl+Q", "quit")],
        };

        let mut spans = Vec::new();
        for (i, (key, action)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" │ ", Style::default().fg(inactive())));
            }
            spans.push(Span::styled(*key, Style::default().fg(accent())));
            spans.push(Span::styled(format!(" {}", action), Style::default().fg(text_dim())));
        }
        Line::from(spans)
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            format!("═══ {} ═══", title),
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        ))
    };
    let binding = |key: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<11}", key), Style::default().fg(accent())),
            Span::raw(action),
        ])
    };

    let help_text = vec![
        section("General"),
        binding("Tab", "Switch between editor and chat"),
        binding("F1", "Show this help"),
        binding("Ctrl+Q", "Quit"),
        Line::from(""),
        section("Chat"),
        binding("Enter", "Send the prompt"),
        binding("Ctrl+Y", "Copy code reply to clipboard"),
        binding("Ctrl+E", "Insert code reply into editor"),
        Line::from(""),
        section("Editor"),
        binding("Arrows", "Move cursor"),
        binding("Home/End", "Start/end of line"),
        binding("Ctrl+S", "Save file"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" codechat Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
