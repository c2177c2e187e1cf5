use ratatui::{
    layout::{Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::*;

pub(super) fn draw<C: CompletionClient>(f: &mut Frame, app: &mut App<C>, area: Rect) {
    let focused = app.focus == Focus::Editor;

    let name = app
        .editor
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "untitled".to_string());
    let title = if app.editor.is_dirty() {
        format!(" Editor: {} [+] ", name)
    } else {
        format!(" Editor: {} ", name)
    };

    let block = panel_block(title, focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    app.editor.scroll_to_cursor(inner.height as usize);
    let editor = &app.editor;

    let gutter = editor.lines().len().to_string().len().max(3);
    let lines: Vec<Line> = editor
        .lines()
        .iter()
        .enumerate()
        .skip(editor.scroll())
        .take(inner.height as usize)
        .map(|(i, line)| {
            Line::from(vec![
                Span::styled(format!("{:>width$} ", i + 1, width = gutter), Style::default().fg(line_number())),
                Span::styled(expand_tabs(line), Style::default().fg(text())),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);

    if focused && inner.height > 0 {
        let (row, col) = editor.cursor();
        let col = editor.lines().get(row).map_or(0, |line| display_col(line, col));
        let x = inner.x as usize + gutter + 1 + col;
        let y = inner.y as usize + row.saturating_sub(editor.scroll());
        let max_x = inner.right().saturating_sub(1) as usize;
        f.set_cursor_position(Position::new(x.min(max_x) as u16, y as u16));
    }
}
