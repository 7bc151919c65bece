use crate::app::{App, FrameParts, Notice};
use crate::keymap::InputMode;
use crate::logging::LogBuffer;
use crate::mux::{Multiplexer, ESCAPE_PROMPT, TERMINAL_FOOTER_TEXT};
use crate::pages::{Page, PageView, TextView};
use crate::session::TermSize;
use crate::store::SelectionSet;
use crate::theme;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Frame,
};

/// Rows taken by the tab bar and the status line in terminal mode.
const TERMINAL_CHROME_ROWS: u16 = 2;

pub fn render(f: &mut Frame, app: &mut App) {
    let area = f.size();
    let parts = app.frame_parts();
    match parts.mode {
        InputMode::Dashboard => render_dashboard(f, parts, area),
        InputMode::Terminal => render_terminal(f, parts.mux, area),
    }
}

/// PTY size for a terminal of `cols` x `rows`, leaving room for the chrome.
pub fn terminal_content_size(cols: u16, rows: u16) -> TermSize {
    TermSize::new(cols, rows.saturating_sub(TERMINAL_CHROME_ROWS))
}

fn render_dashboard(f: &mut Frame, parts: FrameParts<'_>, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(6, 9),
            Constraint::Ratio(2, 9),
            Constraint::Ratio(1, 9),
        ])
        .split(area);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(rows[1]);

    render_page(f, parts.front, parts.selection, rows[0]);
    render_secondary(
        f,
        &parts.secondary,
        parts.secondary_is_prompt,
        parts.notice,
        bottom[0],
    );
    render_logs(f, parts.logs, bottom[1]);
    render_footer(f, parts.footer, rows[2]);

    if let Some(message) = parts.loading {
        render_loading(f, message, area);
    }
}

fn bordered(title: &str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_COLOR))
        .title(Span::styled(format!(" {title} "), theme::TITLE_STYLE))
}

fn render_page(f: &mut Frame, front: Option<&mut Page>, selection: &SelectionSet, area: Rect) {
    let Some(page) = front else {
        f.render_widget(bordered(""), area);
        return;
    };
    match &mut page.view {
        PageView::Table(view) => {
            let widget = view.widget(selection);
            f.render_stateful_widget(widget, area, view.state_mut());
        }
        PageView::Text(view) => render_text_page(f, view, area),
    }
}

fn render_text_page(f: &mut Frame, view: &TextView, area: Rect) {
    let lines: Vec<Line> = view
        .entries
        .iter()
        .map(|(key, value)| {
            Line::from(vec![
                Span::styled(format!("{key}: "), theme::HEADER_STYLE),
                Span::raw(value.clone()),
            ])
        })
        .collect();
    let paragraph = Paragraph::new(lines)
        .block(bordered(&view.title))
        .wrap(Wrap { trim: false })
        .scroll((view.scroll, 0));
    f.render_widget(paragraph, area);
}

fn render_secondary(
    f: &mut Frame,
    text: &str,
    is_prompt: bool,
    notice: Option<&Notice>,
    area: Rect,
) {
    let mut lines = Vec::new();
    match notice {
        Some(Notice::Error(message)) => {
            lines.push(Line::from(Span::styled(
                message.clone(),
                Style::default()
                    .fg(theme::ERROR_TEXT_COLOR)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
        }
        Some(Notice::Info(message)) => {
            lines.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(theme::PROMPT_TEXT_COLOR),
            )));
            lines.push(Line::from(""));
        }
        None => {}
    }
    let color = if is_prompt {
        theme::PROMPT_TEXT_COLOR
    } else {
        theme::INFO_TEXT_COLOR
    };
    lines.extend(
        text.lines()
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(color)))),
    );
    let paragraph = Paragraph::new(lines)
        .block(bordered("INFO"))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn render_logs(f: &mut Frame, logs: &LogBuffer, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = logs
        .tail(height)
        .into_iter()
        .map(|line| Line::from(Span::styled(line, Style::default().fg(theme::LOGGER_TEXT_COLOR))))
        .collect();
    f.render_widget(Paragraph::new(lines).block(bordered("LOGS")), area);
}

fn render_footer(f: &mut Frame, footer: &str, area: Rect) {
    let lines: Vec<Line> = footer
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(theme::FOOTER_TEXT_COLOR))))
        .collect();
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

fn render_loading(f: &mut Frame, message: &str, area: Rect) {
    let popup = centered_rect(50, 20, area);
    f.render_widget(Clear, popup);
    let paragraph = Paragraph::new(Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(theme::PROMPT_TEXT_COLOR),
    )))
    .block(bordered("LOADING"))
    .wrap(Wrap { trim: true });
    f.render_widget(paragraph, popup);
}

fn render_terminal(f: &mut Frame, mux: &Multiplexer, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let titles: Vec<Line> = mux
        .tabs()
        .iter()
        .enumerate()
        .map(|(idx, tab)| Line::from(format!("{}:{}", idx + 1, tab.display_label())))
        .collect();
    let mut tabs = Tabs::new(titles)
        .style(Style::default().fg(theme::TERMINAL_FOOTER_COLOR))
        .highlight_style(theme::ACTIVE_TAB_STYLE)
        .divider("|");
    if let Some(idx) = mux.current_index() {
        tabs = tabs.select(idx);
    }
    f.render_widget(tabs, rows[0]);

    let screen_area = rows[1];
    if let Some(tab) = mux.current_tab() {
        let height = screen_area.height as usize;
        let lines: Vec<Line> = tab
            .screen()
            .visible_lines(height)
            .into_iter()
            .map(Line::from)
            .collect();
        f.render_widget(Paragraph::new(lines), screen_area);
        if !tab.has_exited() && screen_area.width > 0 && screen_area.height > 0 {
            let (row, col) = tab.screen().cursor(height);
            let x = screen_area.x + (col as u16).min(screen_area.width - 1);
            let y = screen_area.y + (row as u16).min(screen_area.height - 1);
            f.set_cursor(x, y);
        }
    }

    let escape = mux.escape();
    let status = if escape.is_active() {
        Span::styled(
            format!("{ESCAPE_PROMPT}{}", escape.digits()),
            Style::default()
                .fg(theme::TERMINAL_ESCAPE_COLOR)
                .add_modifier(Modifier::BOLD),
        )
    } else if let Some(message) = mux.status() {
        Span::styled(message.to_string(), Style::default().fg(theme::ERROR_TEXT_COLOR))
    } else {
        Span::styled(
            TERMINAL_FOOTER_TEXT,
            Style::default().fg(theme::TERMINAL_FOOTER_COLOR),
        )
    };
    f.render_widget(Paragraph::new(Line::from(status)), rows[2]);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppConfig;
    use crate::session::testing::FakeSpawner;
    use kite_core::columns::{DEFAULT_ALERT_COLUMNS, DEFAULT_INCIDENT_COLUMNS};
    use kite_core::filter::{Assignment, IncidentFilter};
    use kite_core::source::{Snapshot, SnapshotSource};
    use kite_core::{Alert, User};
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    fn buffer_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    fn app() -> App {
        let user = User {
            id: "PME".to_string(),
            name: "Ada Operator".to_string(),
            role: "responder".to_string(),
        };
        let config = AppConfig {
            filter: IncidentFilter::for_assignment(Assignment::Me),
            alert_columns: DEFAULT_ALERT_COLUMNS.to_string(),
            incident_columns: DEFAULT_INCIDENT_COLUMNS.to_string(),
        };
        let mut app = App::new(
            Box::new(SnapshotSource::in_memory(Snapshot::default())),
            Box::new(FakeSpawner::default()),
            config,
            user,
            LogBuffer::default(),
        )
        .expect("app");
        app.open_alerts(vec![Alert {
            incident_id: "Q1".to_string(),
            alert_id: "A1".to_string(),
            name: "KubeAPIDown".to_string(),
            cluster_name: "prod-east".to_string(),
            cluster_id: "c-1".to_string(),
            summary: "API unreachable".to_string(),
            status: "acknowledged".to_string(),
            severity: "critical".to_string(),
            details: Vec::new(),
        }]);
        app
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal.draw(|f| render(f, app)).expect("draw");
        buffer_text(terminal.backend().buffer())
    }

    #[test]
    fn dashboard_shows_table_info_and_footer() {
        let mut app = app();
        let text = draw(&mut app, 120, 40);
        assert!(text.contains("[ ALERTS ]"));
        assert!(text.contains("prod-east"));
        assert!(text.contains("Logged in user: Ada Operator"));
        assert!(text.contains("[R] Refresh Alerts"));
    }

    #[test]
    fn loading_popup_is_drawn_over_the_page() {
        let mut app = app();
        app.apply(crate::keymap::Action::Refresh);
        let text = draw(&mut app, 120, 40);
        assert!(text.contains("Refreshing alerts..."));
    }

    #[test]
    fn terminal_mode_shows_tabs_and_trigger_footer() {
        let mut app = app();
        app.apply(crate::keymap::Action::OpenRow);
        app.apply(crate::keymap::Action::ClusterLogin);
        assert_eq!(app.mode(), InputMode::Terminal);
        let text = draw(&mut app, 200, 20);
        assert!(text.contains("1:prod-east"));
        assert!(text.contains("[CTRL + N] Next Slide"));
    }

    #[test]
    fn content_size_leaves_room_for_chrome() {
        assert_eq!(terminal_content_size(100, 30), TermSize::new(100, 28));
        assert_eq!(terminal_content_size(100, 1), TermSize::new(100, 1));
    }
}
