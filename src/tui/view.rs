use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::app::App;

const C_ACCENT: Color = Color::Green;
const C_MUTED: Color = Color::DarkGray;
const C_ERROR: Color = Color::Red;

pub fn draw(frame: &mut Frame, app: &App) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .title(format!(" VOD Sync Spotify Watcher v{} ", env!("CARGO_PKG_VERSION")));
    let area = outer.inner(frame.area());
    frame.render_widget(outer, frame.area());

    let login_height = if app.pending().is_some() { 9 } else { 0 };
    let rows = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Length(login_height),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .split(area);

    let status = Paragraph::new(Line::from(vec![
        Span::styled("Status: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(app.status()),
    ]));
    frame.render_widget(status, rows[0]);

    let song = Paragraph::new(Line::from(vec![
        Span::styled("Now playing: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(app.song(), Style::default().fg(C_ACCENT)),
    ]));
    frame.render_widget(song, rows[1]);

    if app.pending().is_some() {
        draw_login(frame, app, rows[2]);
    }

    let footer_text = if app.pending().is_some() {
        format!("Esc quit · writing {}", app.status_file().display())
    } else {
        format!("q/Esc quit · writing {}", app.status_file().display())
    };
    let footer = Paragraph::new(Span::styled(footer_text, Style::default().fg(C_MUTED)));
    frame.render_widget(footer, rows[4]);
}

fn draw_login(frame: &mut Frame, app: &App, area: Rect) {
    let Some(pending) = app.pending() else {
        return;
    };

    let rows = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Length(2),
    ])
    .split(area);

    let url = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("[ Ctrl+O ]", Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)),
            Span::raw(" open the Spotify login page, or visit:"),
        ]),
        Line::from(Span::styled(
            pending.authorize_url.as_str(),
            Style::default().fg(C_MUTED),
        )),
    ])
    .wrap(Wrap { trim: false });
    frame.render_widget(url, rows[0]);

    let title = if app.is_submitting() {
        " Checking... "
    } else {
        " Paste the redirected URL and press Enter "
    };
    let input_block = Block::default().borders(Borders::ALL).title(title);
    let inner = input_block.inner(rows[1]);
    let width = inner.width.max(1) as usize;
    let scroll = app.input().visual_scroll(width);
    let input = Paragraph::new(app.input().value())
        .scroll((0, scroll as u16))
        .block(input_block);
    frame.render_widget(input, rows[1]);

    if !app.is_submitting() {
        let cursor_x = inner.x + (app.input().visual_cursor().saturating_sub(scroll)) as u16;
        frame.set_cursor_position((cursor_x.min(inner.x + inner.width.saturating_sub(1)), inner.y));
    }

    if let Some(error) = app.auth_error() {
        let error = Paragraph::new(Span::styled(error, Style::default().fg(C_ERROR)))
            .wrap(Wrap { trim: true });
        frame.render_widget(error, rows[2]);
    }
}
