use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use unicode_width::UnicodeWidthStr;

use super::*;

pub(super) fn draw<C: CompletionClient>(f: &mut Frame, app: &App<C>, area: Rect) {
    let focused = app.focus == Focus::Chat;
    let block = panel_block(" AI Chatbot ".to_string(), focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let exchange = &app.exchange;
    let show_copy = exchange.is_code() && !exchange.response().is_empty();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                                 // Greeting
            Constraint::Min(3),                                    // Response
            Constraint::Length(if show_copy { 1 } else { 0 }),     // Copy hint
            Constraint::Length(3),                                 // Prompt input
        ])
        .split(inner);

    let greeting = Paragraph::new(vec![
        Line::from(Span::styled(
            "Hey, How can I help you today?",
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("Ask me anything!", Style::default().fg(text_dim()))),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(greeting, chunks[0]);

    draw_response(f, app, chunks[1]);

    if show_copy {
        let hint = Paragraph::new(Line::from(vec![
            Span::styled("[ ", Style::default().fg(text_dim())),
            Span::styled("Ctrl+Y", Style::default().fg(accent()).add_modifier(Modifier::BOLD)),
            Span::styled(" Copy Code ]", Style::default().fg(text_dim())),
        ]));
        f.render_widget(hint, chunks[2]);
    }

    draw_prompt(f, app, chunks[3], focused);
}

fn draw_response<C: CompletionClient>(f: &mut Frame, app: &App<C>, area: Rect) {
    let exchange = &app.exchange;
    if exchange.response().is_empty() {
        return;
    }

    let (title, style) = if exchange.is_code() {
        let title = match exchange.language() {
            Some(lang) => format!(" code: {} ", lang),
            None => " code ".to_string(),
        };
        (title, Style::default().fg(text()).bg(code_bg()))
    } else if exchange.is_failed() {
        (String::new(), Style::default().fg(danger()))
    } else {
        (String::new(), Style::default().fg(text_dim()))
    };

    let response = Paragraph::new(expand_tabs_text(exchange.response()))
        .style(style)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(Span::styled(title, Style::default().fg(header())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(inactive())),
        );
    f.render_widget(response, area);
}

fn draw_prompt<C: CompletionClient>(f: &mut Frame, app: &App<C>, area: Rect, focused: bool) {
    let exchange = &app.exchange;

    let send_hint = if exchange.is_loading() {
        Span::styled(" Loading... ", Style::default().fg(warning()))
    } else {
        Span::styled(" ⏎ send ", Style::default().fg(if focused { accent() } else { inactive() }))
    };

    let block = Block::default()
        .title_bottom(Line::from(send_hint).alignment(Alignment::Right))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { accent() } else { inactive() }));

    let content = if exchange.prompt().is_empty() {
        Line::from(Span::styled(
            "Enter your prompt",
            Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC),
        ))
    } else {
        Line::from(Span::styled(exchange.prompt(), Style::default().fg(text())))
    };

    // Keep the tail of a long prompt in view
    let inner_width = area.width.saturating_sub(2);
    let prompt_width = u16::try_from(exchange.prompt().width()).unwrap_or(u16::MAX);
    let scroll = prompt_width.saturating_sub(inner_width.saturating_sub(1));

    let input = Paragraph::new(content).scroll((0, scroll)).block(block);
    f.render_widget(input, area);

    if focused {
        let x = area.x.saturating_add(1).saturating_add(prompt_width - scroll);
        f.set_cursor_position(Position::new(x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}
